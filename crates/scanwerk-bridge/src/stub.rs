// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for builds without a native camera or share sheet.

use std::path::Path;

use scanwerk_core::error::{Result, ScanwerkError};

use crate::traits::*;

/// Bridge whose every capability is unavailable.
pub struct StubBridge;

impl PlatformBridge for StubBridge {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }
}

impl NativeCamera for StubBridge {
    fn capture_image(&self) -> Result<Option<Vec<u8>>> {
        tracing::warn!("NativeCamera::capture_image called on stub bridge");
        Err(ScanwerkError::PlatformUnavailable)
    }
}

impl NativeShare for StubBridge {
    fn share_file(&self, _path: &Path, _mime_type: &str) -> Result<()> {
        tracing::warn!("NativeShare::share_file called on stub bridge");
        Err(ScanwerkError::PlatformUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_capability_is_unavailable() {
        let bridge = crate::platform_bridge();
        assert_eq!(bridge.platform_name(), "Desktop (stub)");
        assert!(matches!(
            bridge.capture_image(),
            Err(ScanwerkError::PlatformUnavailable)
        ));
        assert!(matches!(
            bridge.share_file(Path::new("/tmp/x.pdf"), PDF_MIME),
            Err(ScanwerkError::PlatformUnavailable)
        ));
    }
}
