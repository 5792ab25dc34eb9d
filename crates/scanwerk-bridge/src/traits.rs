// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for native capabilities.

use std::path::Path;

use scanwerk_core::error::Result;

/// MIME type of every exported artifact.
pub const PDF_MIME: &str = "application/pdf";

/// Everything the scanner needs from the host platform.
pub trait PlatformBridge: NativeCamera + NativeShare + Send + Sync {
    /// Human-readable platform name (e.g. "iOS 17", "Android 14").
    fn platform_name(&self) -> &str;
}

/// Source of captured page photos.
pub trait NativeCamera {
    /// Capture one photo and return its encoded bytes (JPEG or PNG),
    /// orientation already applied. `Ok(None)` means the user cancelled.
    fn capture_image(&self) -> Result<Option<Vec<u8>>>;
}

/// Hand a finished file to another app or location.
pub trait NativeShare {
    fn share_file(&self, path: &Path, mime_type: &str) -> Result<()>;
}
