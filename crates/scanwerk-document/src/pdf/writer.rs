// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page assembler: one full-bleed image per page, with an optional invisible
// text layer, using `printpdf` 0.8.
//
// printpdf 0.8 is data-oriented: each page is a `PdfPage` holding a `Vec<Op>`
// and the whole document is serialised by `PdfDocument::save()`.

use image::RgbaImage;
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, RawImage,
    RawImageData, RawImageFormat, TextItem, TextRenderingMode, XObjectTransform,
};
use scanwerk_core::PaperSize;
use scanwerk_core::error::{Result, ScanwerkError};
use tracing::{debug, info, instrument, warn};

/// Font size of the invisible text layer, in points.
pub const TEXT_LAYER_FONT_SIZE: f32 = 10.0;

const TEXT_LAYER_FONT: BuiltinFont = BuiltinFont::Helvetica;

/// Document-level metadata.
#[derive(Debug, Clone, Default)]
pub struct DocumentMetadata {
    pub title: String,
    pub author: Option<String>,
    pub keywords: Vec<String>,
}

impl DocumentMetadata {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Searchable text for one page.
///
/// The box is in page points measured from the top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl TextBlock {
    /// A block spanning a whole `page_width x page_height` page.
    pub fn full_page(text: impl Into<String>, page_width: f32, page_height: f32) -> Self {
        Self {
            text: text.into(),
            x: 0.0,
            y: 0.0,
            width: page_width,
            height: page_height,
        }
    }

    /// A block whose first line sits along the top edge, so recognised
    /// lines run down the page.
    pub fn top_band(text: impl Into<String>, page_width: f32) -> Self {
        Self {
            text: text.into(),
            x: 0.0,
            y: 0.0,
            width: page_width,
            height: TEXT_LAYER_FONT_SIZE,
        }
    }

    /// Baseline of the first line, from the bottom-left page origin.
    pub fn baseline(&self, page_height: f32) -> f32 {
        page_height - self.y - self.height
    }
}

/// Pixel size of one embedded page image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRaster {
    pub width_px: u32,
    pub height_px: u32,
}

/// A serialised PDF ready for the document store.
#[derive(Debug, Clone)]
pub struct DocumentArtifact {
    pub bytes: Vec<u8>,
    pub page_count: u32,
    pub byte_size: u64,
    pub pages: Vec<PageRaster>,
}

/// Builds multi-page PDFs from page rasters.
pub struct PageAssembler {
    paper_size: PaperSize,
}

impl PageAssembler {
    pub fn new(paper_size: PaperSize) -> Self {
        Self { paper_size }
    }

    pub fn a4() -> Self {
        Self::new(PaperSize::A4)
    }

    pub fn paper_size(&self) -> PaperSize {
        self.paper_size
    }

    /// Page size in points.
    pub fn page_size_pt(&self) -> (f32, f32) {
        self.paper_size.dimensions_pt()
    }

    pub fn assemble(
        &self,
        pages: &[RgbaImage],
        metadata: &DocumentMetadata,
    ) -> Result<DocumentArtifact> {
        self.assemble_with_text(pages, &[], metadata)
    }

    /// One page per raster, stretched to fill the page. `text_layers[i]`,
    /// when present, is drawn invisibly on page `i`.
    #[instrument(skip_all, fields(pages = pages.len(), paper = ?self.paper_size))]
    pub fn assemble_with_text(
        &self,
        pages: &[RgbaImage],
        text_layers: &[Option<TextBlock>],
        metadata: &DocumentMetadata,
    ) -> Result<DocumentArtifact> {
        if pages.is_empty() {
            return Err(ScanwerkError::PdfError("cannot assemble zero pages".into()));
        }
        if let Some(empty) = pages.iter().position(|p| p.width() == 0 || p.height() == 0) {
            return Err(ScanwerkError::PdfError(format!("page {} has no pixels", empty + 1)));
        }

        let (page_w_pt, page_h_pt) = self.page_size_pt();
        let (page_w, page_h) = (Mm(page_w_pt * 25.4 / 72.0), Mm(page_h_pt * 25.4 / 72.0));

        let mut doc = PdfDocument::new(&metadata.title);
        if let Some(author) = &metadata.author {
            doc.metadata.info.author = author.clone();
        }
        doc.metadata.info.keywords = metadata.keywords.clone();

        let mut pdf_pages = Vec::with_capacity(pages.len());
        let mut rasters = Vec::with_capacity(pages.len());

        for (index, page) in pages.iter().enumerate() {
            let (width_px, height_px) = page.dimensions();
            let rgb = image::DynamicImage::ImageRgba8(page.clone()).to_rgb8();
            let raw = RawImage {
                pixels: RawImageData::U8(rgb.into_raw()),
                width: width_px as usize,
                height: height_px as usize,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            };
            let xobject_id = doc.add_image(&raw);

            // At 72 dpi one pixel is one point, so the scale is points per pixel.
            let mut ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(0.0)),
                    translate_y: Some(Pt(0.0)),
                    scale_x: Some(page_w_pt / width_px as f32),
                    scale_y: Some(page_h_pt / height_px as f32),
                    dpi: Some(72.0),
                    rotate: None,
                },
            }];

            if let Some(Some(block)) = text_layers.get(index) {
                ops.extend(text_layer_ops(block, page_h_pt));
            }

            pdf_pages.push(PdfPage::new(page_w, page_h, ops));
            rasters.push(PageRaster {
                width_px,
                height_px,
            });
            debug!(page = index + 1, width_px, height_px, "page laid out");
        }

        doc.with_pages(pdf_pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "printpdf reported warnings");
        }

        let artifact = DocumentArtifact {
            byte_size: bytes.len() as u64,
            page_count: rasters.len() as u32,
            pages: rasters,
            bytes,
        };
        info!(
            page_count = artifact.page_count,
            byte_size = artifact.byte_size,
            "document assembled"
        );
        Ok(artifact)
    }
}

/// Invisible text with its first baseline at the block's baseline; later
/// lines step down by 1.2x the font size.
fn text_layer_ops(block: &TextBlock, page_h_pt: f32) -> Vec<Op> {
    let line_height = TEXT_LAYER_FONT_SIZE * 1.2;
    let first_baseline = block.baseline(page_h_pt);

    let mut ops = Vec::new();
    let lines = block
        .text
        .lines()
        .map(printable)
        .filter(|l| !l.trim().is_empty());
    for (i, line) in lines.enumerate() {
        ops.extend([
            Op::StartTextSection,
            Op::SetTextRenderingMode {
                mode: TextRenderingMode::Invisible,
            },
            Op::SetTextCursor {
                pos: Point {
                    x: Pt(block.x),
                    y: Pt(first_baseline - i as f32 * line_height),
                },
            },
            Op::SetFontSizeBuiltinFont {
                size: Pt(TEXT_LAYER_FONT_SIZE),
                font: TEXT_LAYER_FONT,
            },
            Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(line)],
                font: TEXT_LAYER_FONT,
            },
            Op::EndTextSection,
        ]);
    }
    ops
}

/// Drop control characters the builtin font cannot encode.
fn printable(line: &str) -> String {
    line.chars().filter(|c| !c.is_control()).collect()
}
