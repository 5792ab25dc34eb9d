// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Scanwerk.

use thiserror::Error;

/// Top-level error type for all Scanwerk operations.
///
/// The first four variants form the reconstruction-pipeline taxonomy. Only
/// [`ScanwerkError::Persistence`] (and the storage errors that feed it) is
/// meant to reach the user as an actionable failure; the rest degrade to a
/// fallback inside the review session.
#[derive(Debug, Error)]
pub enum ScanwerkError {
    // -- Reconstruction pipeline --
    #[error("no document outline found: {0}")]
    DetectionFailure(String),

    #[error("degenerate corner geometry: {0}")]
    DegenerateGeometry(String),

    #[error("runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("could not save document: {0}")]
    Persistence(String),

    // -- Document errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("OCR failed: {0}")]
    OcrError(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // -- Storage --
    #[error("database error: {0}")]
    Database(String),

    #[error("document {0} not found")]
    DocumentNotFound(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

impl ScanwerkError {
    /// Whether the error should be surfaced to the user as something they
    /// can act on, rather than silently degraded.
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            Self::Persistence(_) | Self::Database(_) | Self::Io(_) | Self::DocumentNotFound(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanwerkError>;
