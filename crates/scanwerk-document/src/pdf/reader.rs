// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Artifact inspection with `lopdf`: re-open an assembled or stored PDF and
// check its page tree before trusting it.

use std::path::Path;

use lopdf::Document;
use scanwerk_core::error::{Result, ScanwerkError};
use tracing::{debug, instrument, warn};

/// Read-only view of a PDF.
pub struct PdfInspector {
    document: Document,
}

impl PdfInspector {
    /// Open a PDF from disk.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = Document::load(path).map_err(|err| {
            ScanwerkError::PdfError(format!("failed to open {}: {err}", path.display()))
        })?;
        debug!(pages = document.get_pages().len(), "PDF loaded");
        Ok(Self { document })
    }

    /// Parse PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            ScanwerkError::PdfError(format!("failed to load PDF from memory: {err}"))
        })?;
        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// `Ok` when `data` parses and has exactly `expected_pages` pages.
    pub fn verify(data: &[u8], expected_pages: usize) -> Result<()> {
        let found = Self::from_bytes(data)?.page_count();
        if found != expected_pages {
            warn!(expected_pages, found, "page count mismatch");
            return Err(ScanwerkError::PdfError(format!(
                "expected {expected_pages} pages, found {found}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::writer::{DocumentMetadata, PageAssembler};
    use image::{Rgba, RgbaImage};

    fn three_page_pdf() -> Vec<u8> {
        let page = RgbaImage::from_pixel(30, 40, Rgba([200, 200, 200, 255]));
        PageAssembler::a4()
            .assemble(
                &[page.clone(), page.clone(), page],
                &DocumentMetadata::titled("Receipts"),
            )
            .expect("assemble")
            .bytes
    }

    #[test]
    fn counts_pages() {
        let inspector = PdfInspector::from_bytes(&three_page_pdf()).expect("parse");
        assert_eq!(inspector.page_count(), 3);
    }

    #[test]
    fn verify_checks_page_count() {
        let bytes = three_page_pdf();
        assert!(PdfInspector::verify(&bytes, 3).is_ok());
        assert!(matches!(
            PdfInspector::verify(&bytes, 2),
            Err(ScanwerkError::PdfError(_))
        ));
    }

    #[test]
    fn garbage_is_a_pdf_error() {
        assert!(matches!(
            PdfInspector::from_bytes(b"not a pdf"),
            Err(ScanwerkError::PdfError(_))
        ));
    }

    #[test]
    fn open_reads_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("three.pdf");
        std::fs::write(&path, three_page_pdf()).expect("write");

        let inspector = PdfInspector::open(&path).expect("open");
        assert_eq!(inspector.page_count(), 3);
    }
}
