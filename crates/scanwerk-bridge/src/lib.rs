// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanwerk-bridge: platform capability traits for capture and sharing.
//
// The pipeline only ever sees encoded image bytes coming in and a finished
// file going out; how a platform produces or delivers them stays behind
// these traits.

pub mod desktop;
pub mod stub;
pub mod traits;

pub use desktop::{FolderShare, ImageFileSource};
pub use traits::{NativeCamera, NativeShare, PlatformBridge};

/// The bridge for the platform this binary was built for.
///
/// Desktop builds have no camera or share sheet of their own, so every call
/// reports `PlatformUnavailable`; callers substitute the `desktop` adapters.
pub fn platform_bridge() -> Box<dyn PlatformBridge> {
    Box::new(stub::StubBridge)
}
