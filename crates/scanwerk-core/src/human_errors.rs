// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Pipeline fallbacks are reported as notices; only storage failures ask the
// user to do something.

use crate::error::ScanwerkError;
use crate::types::{Degradation, DegradationKind};

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The scan went ahead with a fallback; informational only.
    Notice,
    /// Temporary problem: trying again may work.
    Transient,
    /// User must do something (free space, pick another file).
    ActionRequired,
    /// Cannot be fixed by retrying: damaged file, unsupported device.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether retrying the same action can help.
    pub retriable: bool,
    /// Severity level (drives icon/colour in UI).
    pub severity: Severity,
}

/// Convert a `ScanwerkError` into a `HumanError`.
pub fn humanize_error(err: &ScanwerkError) -> HumanError {
    match err {
        // -- Reconstruction pipeline --
        ScanwerkError::DetectionFailure(_) => HumanError {
            message: "We couldn't find the page edges.".into(),
            suggestion: "Drag the corner handles onto the corners of your page.".into(),
            retriable: false,
            severity: Severity::Notice,
        },

        ScanwerkError::DegenerateGeometry(_) => HumanError {
            message: "The corners don't outline a page.".into(),
            suggestion: "The photo was kept as-is. Move the corners apart and try again for a straightened page.".into(),
            retriable: false,
            severity: Severity::Notice,
        },

        ScanwerkError::RuntimeUnavailable(_) => HumanError {
            message: "Some enhancements aren't available right now.".into(),
            suggestion: "Your scan is still saved; filters use a simpler method and text search may be missing.".into(),
            retriable: true,
            severity: Severity::Notice,
        },

        ScanwerkError::Persistence(_) => HumanError {
            message: "Your document couldn't be saved.".into(),
            suggestion: "Check that your device has free space, then tap Save again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        // -- Document errors --
        ScanwerkError::ImageError(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try taking the photo again.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanwerkError::PdfError(_) => HumanError {
            message: "The PDF couldn't be created.".into(),
            suggestion: "Try saving again. If this keeps happening, try a different page size in Settings.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanwerkError::OcrError(_) => HumanError {
            message: "Text recognition didn't work on this scan.".into(),
            suggestion: "Try scanning the document again with better lighting, making sure the text is clear and in focus.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanwerkError::InvalidInput(detail) => HumanError {
            message: "That value isn't valid.".into(),
            suggestion: format!("Please check the value and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        // -- Storage --
        ScanwerkError::Database(_) => HumanError {
            message: "The document library had a problem.".into(),
            suggestion: "Try closing and reopening the app. Your saved documents should still be there.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanwerkError::DocumentNotFound(_) => HumanError {
            message: "That document no longer exists.".into(),
            suggestion: "It may have been deleted. Refresh your document list.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanwerkError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "The app doesn't have permission to use that file.".into(),
                    suggestion: "Check the file permissions, or choose a different folder.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Check that your device has free space, then try again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            }
        }

        ScanwerkError::Serialization(_) => HumanError {
            message: "The app had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Platform --
        ScanwerkError::Bridge(_) => HumanError {
            message: "A device-specific feature didn't work.".into(),
            suggestion: "Try restarting the app. Some features may not be available on all devices.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanwerkError::PlatformUnavailable => HumanError {
            message: "This feature isn't available on your device.".into(),
            suggestion: "Sharing and the camera need a phone or tablet.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

/// Describe a fallback taken during review in plain English.
pub fn humanize_degradation(degradation: &Degradation) -> HumanError {
    let (message, suggestion) = match degradation.kind {
        DegradationKind::DetectionFailed => (
            "We couldn't find the page edges, so the whole photo is selected.",
            "Drag the corner handles onto the corners of your page.",
        ),
        DegradationKind::DegenerateGeometry => (
            "The page couldn't be straightened.",
            "Move the corner handles apart so they outline the page.",
        ),
        DegradationKind::VisionUnavailable => (
            "Advanced image processing isn't available.",
            "Black-and-white uses a simpler method; edges may look rougher.",
        ),
        DegradationKind::OcrUnavailable => (
            "Text recognition isn't available.",
            "Your scan will be saved without searchable text.",
        ),
        DegradationKind::OcrFailed => (
            "Text recognition didn't work on this scan.",
            "Your scan will be saved without searchable text.",
        ),
    };
    HumanError {
        message: message.into(),
        suggestion: suggestion.into(),
        retriable: false,
        severity: Severity::Notice,
    }
}
