// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanwerk-document: the document reconstruction pipeline.
//
// Corner detection and refinement, perspective rectification, colour and
// tone adjustments, signature overlay, PDF page assembly, and text
// extraction. Heavy backends (vision, OCR) load lazily through `runtime`.

pub mod image;
pub mod pdf;
pub mod runtime;
pub mod scan;
pub mod vision;

pub use self::image::{AdjustedPage, AdjustmentPipeline, SignaturePlacement};
pub use pdf::{DocumentArtifact, DocumentMetadata, PageAssembler, PdfInspector, TextBlock};
pub use runtime::{RuntimeLoader, SingleFlight};
pub use scan::{CornerEditor, EdgeDetector, OcrWorker, Rectification, TextExtractor};
pub use vision::{ImageprocVision, VisionLoader, VisionRuntime};

#[cfg(feature = "ocr")]
pub use scan::ocr::OcrEngine;
