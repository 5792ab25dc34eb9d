// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: page assembly and artifact inspection.

pub mod reader;
pub mod writer;

pub use reader::PdfInspector;
pub use writer::{DocumentArtifact, DocumentMetadata, PageAssembler, PageRaster, TextBlock};
