// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Scanwerk document scanner.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::Quad;

/// Unique identifier for a stored document. Assigned by the store, never
/// changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A document outline proposed by the edge detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedDocument {
    pub corners: Quad,
    /// Outline area as a fraction of the (downscaled) frame, capped at 1.0.
    pub confidence: f32,
}

/// Colour treatment applied to the rectified page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorFilter {
    #[default]
    Color,
    Grayscale,
    BlackAndWhite,
}

impl std::str::FromStr for ColorFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "color" | "colour" => Ok(Self::Color),
            "grayscale" | "greyscale" | "gray" | "grey" => Ok(Self::Grayscale),
            "bw" | "black-and-white" | "blackandwhite" => Ok(Self::BlackAndWhite),
            other => Err(format!("unknown filter '{other}'")),
        }
    }
}

/// Clockwise page rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Map any whole number of degrees onto the nearest lower quarter turn.
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90..=179 => Self::Deg90,
            180..=269 => Self::Deg180,
            270..=359 => Self::Deg270,
            _ => Self::Deg0,
        }
    }

    pub fn degrees(&self) -> i32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Rotate a further 90 degrees clockwise (the "rotate" button).
    pub fn turned(&self) -> Self {
        Self::from_degrees(self.degrees() + 90)
    }

    /// Whether this rotation swaps width and height.
    pub fn swaps_axes(&self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// Adjustments the user applies during review.
///
/// Always applied to the original rectified page, never to a previous
/// output, so changing one field never compounds lossy operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdjustmentState {
    pub filter: ColorFilter,
    pub rotation: Rotation,
    brightness: i32,
    contrast: i32,
}

impl AdjustmentState {
    pub const MIN_LEVEL: i32 = -100;
    pub const MAX_LEVEL: i32 = 100;

    pub fn new(filter: ColorFilter, rotation: Rotation, brightness: i32, contrast: i32) -> Self {
        let mut state = Self {
            filter,
            rotation,
            ..Default::default()
        };
        state.set_brightness(brightness);
        state.set_contrast(contrast);
        state
    }

    pub fn brightness(&self) -> i32 {
        self.brightness
    }

    pub fn contrast(&self) -> i32 {
        self.contrast
    }

    /// Set brightness, clamped to [-100, 100].
    pub fn set_brightness(&mut self, value: i32) {
        self.brightness = value.clamp(Self::MIN_LEVEL, Self::MAX_LEVEL);
    }

    /// Set contrast, clamped to [-100, 100].
    pub fn set_contrast(&mut self, value: i32) {
        self.contrast = value.clamp(Self::MIN_LEVEL, Self::MAX_LEVEL);
    }
}

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaperSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A3 => (297, 420),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }

    /// Dimensions in PDF points (1/72 inch).
    pub fn dimensions_pt(&self) -> (f32, f32) {
        match self {
            Self::A4 => (595.0, 842.0),
            Self::Letter => (612.0, 792.0),
            Self::Legal => (612.0, 1008.0),
            other => {
                let (w, h) = other.dimensions_mm();
                (
                    (w as f32 * 72.0 / 25.4).round(),
                    (h as f32 * 72.0 / 25.4).round(),
                )
            }
        }
    }
}

/// A scanned document as recorded in the local library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub page_count: u32,
    /// Size of the exported artifact in bytes, measured at save time.
    pub byte_size: u64,
    pub tags: BTreeSet<String>,
    pub folder: Option<String>,
    pub favorite: bool,
    pub ocr_text: Option<String>,
    pub file_path: PathBuf,
    pub thumbnail_path: Option<PathBuf>,
}

impl StoredDocument {
    pub fn new(name: String, file_path: PathBuf, page_count: u32, byte_size: u64) -> Self {
        let now = Utc::now();
        Self {
            id: DocumentId::new(),
            name,
            created_at: now,
            updated_at: now,
            page_count,
            byte_size,
            tags: BTreeSet::new(),
            folder: None,
            favorite: false,
            ocr_text: None,
            file_path,
            thumbnail_path: None,
        }
    }
}

/// Why a review step fell back to reduced fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegradationKind {
    /// No outline found; the full frame was used instead.
    DetectionFailed,
    /// Corners could not be rectified; the unrectified photo was kept.
    DegenerateGeometry,
    /// Vision runtime missing; software fallbacks were used.
    VisionUnavailable,
    /// OCR runtime missing; text extraction skipped.
    OcrUnavailable,
    /// OCR ran but failed; no text attached.
    OcrFailed,
}

/// A silent fallback taken during a review session, kept for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degradation {
    pub kind: DegradationKind,
    pub detail: String,
}

impl Degradation {
    pub fn new(kind: DegradationKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// Default document name from the local clock: `Scan_YYYY-MM-DD_HH-MM`.
pub fn default_document_name() -> String {
    document_name_at(Local::now())
}

/// Document name for a given moment, in the timezone it carries.
pub fn document_name_at<Tz: chrono::TimeZone>(at: DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("Scan_{}", at.format("%Y-%m-%d_%H-%M"))
}

/// Human-readable byte size (`B`, `KB`, `MB`; up to two decimals).
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["B", "KB", "MB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn adjustment_levels_are_clamped() {
        let state = AdjustmentState::new(ColorFilter::Color, Rotation::Deg0, 250, -300);
        assert_eq!(state.brightness(), 100);
        assert_eq!(state.contrast(), -100);
    }

    #[test]
    fn rotation_cycles_in_quarter_turns() {
        let mut r = Rotation::Deg0;
        let mut seen = Vec::new();
        for _ in 0..4 {
            r = r.turned();
            seen.push(r.degrees());
        }
        assert_eq!(seen, vec![90, 180, 270, 0]);
        assert!(Rotation::Deg90.swaps_axes());
        assert!(!Rotation::Deg180.swaps_axes());
        assert_eq!(Rotation::from_degrees(-90), Rotation::Deg270);
    }

    #[test]
    fn filter_parses_cli_spellings() {
        assert_eq!("bw".parse::<ColorFilter>(), Ok(ColorFilter::BlackAndWhite));
        assert_eq!("Greyscale".parse::<ColorFilter>(), Ok(ColorFilter::Grayscale));
        assert!("sepia".parse::<ColorFilter>().is_err());
    }

    #[test]
    fn a4_is_595_by_842_points() {
        assert_eq!(PaperSize::A4.dimensions_pt(), (595.0, 842.0));
    }

    #[test]
    fn document_name_format() {
        let at = Utc.with_ymd_and_hms(2026, 3, 7, 9, 5, 0).unwrap();
        assert_eq!(document_name_at(at), "Scan_2026-03-07_09-05");
    }

    #[test]
    fn file_size_formatting() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(3 * 1024 * 1024), "3 MB");
    }

    #[test]
    fn new_document_defaults() {
        let doc = StoredDocument::new("Scan".into(), PathBuf::from("/tmp/a.pdf"), 1, 1234);
        assert!(!doc.favorite);
        assert!(doc.tags.is_empty());
        assert_eq!(doc.created_at, doc.updated_at);
    }
}
