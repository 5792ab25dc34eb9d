// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline: corner detection, interactive refinement, perspective
// rectification, and text extraction.

pub mod detect;
pub mod editor;
pub mod rectify;
pub mod text;

#[cfg(feature = "ocr")]
pub mod ocr;

pub use detect::{DetectionParams, EdgeDetector, detect, detect_or_full_frame};
pub use editor::{CornerEditor, DrawCommand, HandleState};
pub use rectify::{Rectification, rectify};
pub use text::{OcrWorker, TextExtractor};

#[cfg(feature = "ocr")]
pub use ocr::{OcrConfig, OcrEngine};
