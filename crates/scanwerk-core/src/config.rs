// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Persistent application settings.
///
/// Missing fields in a stored `config.json` fall back to their defaults, so
/// older config files keep loading after new settings are added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Page size used when assembling PDFs.
    pub paper_size: crate::PaperSize,
    /// Scale factor applied before edge detection (0 < s <= 1).
    pub detection_downscale: f32,
    /// Width in pixels of the rectified page.
    pub rectify_width: u32,
    /// Height in pixels of the rectified page.
    pub rectify_height: u32,
    /// JPEG quality (1-100) of the review preview encoding.
    pub preview_jpeg_quality: u8,
    /// Pages are shrunk to fit within this box before export.
    pub export_max_width: u32,
    pub export_max_height: u32,
    /// Neighbourhood radius for adaptive black-and-white thresholding
    /// (radius 5 gives an 11x11 block).
    pub bw_block_radius: u32,
    /// Offset subtracted from the local mean before thresholding.
    pub bw_offset: i32,
    /// Run text recognition on saved pages.
    pub ocr_enabled: bool,
    /// Directory holding the OCR models; `None` uses the default cache.
    pub ocr_model_dir: Option<PathBuf>,
    /// Embed recognised text as an invisible, searchable layer.
    pub embed_text_layer: bool,
    /// Author recorded in exported PDF metadata.
    pub default_author: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paper_size: crate::PaperSize::A4,
            detection_downscale: 0.5,
            rectify_width: 2000,
            rectify_height: 2800,
            preview_jpeg_quality: 92,
            export_max_width: 2000,
            export_max_height: 2800,
            bw_block_radius: 5,
            bw_offset: 2,
            ocr_enabled: true,
            ocr_model_dir: None,
            embed_text_layer: true,
            default_author: "Scanwerk".into(),
        }
    }
}
