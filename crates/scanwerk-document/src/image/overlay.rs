// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Signature overlay: flattens a signature raster onto an adjusted page.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use tracing::{debug, instrument};

/// Signature width as a fraction of page width.
pub const SIGNATURE_WIDTH_FRACTION: f32 = 0.30;

/// A signature and where its centre sits on the page.
///
/// Anchors are percentages of the page size, clamped to `[0, 100]`.
#[derive(Debug, Clone)]
pub struct SignaturePlacement {
    image: DynamicImage,
    anchor_x: f32,
    anchor_y: f32,
}

impl SignaturePlacement {
    pub fn new(image: DynamicImage, anchor_x: f32, anchor_y: f32) -> Self {
        Self {
            image,
            anchor_x: clamp_percent(anchor_x),
            anchor_y: clamp_percent(anchor_y),
        }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn anchor(&self) -> (f32, f32) {
        (self.anchor_x, self.anchor_y)
    }

    pub fn move_to(&mut self, anchor_x: f32, anchor_y: f32) {
        self.anchor_x = clamp_percent(anchor_x);
        self.anchor_y = clamp_percent(anchor_y);
    }

    /// Pixel size of the signature on a page `page_width` wide.
    pub fn scaled_size(&self, page_width: u32) -> (u32, u32) {
        let (sw, sh) = (self.image.width().max(1), self.image.height().max(1));
        let width = ((page_width as f32 * SIGNATURE_WIDTH_FRACTION).round() as u32).max(1);
        let height = ((width as f32 * sh as f32 / sw as f32).round() as u32).max(1);
        (width, height)
    }
}

fn clamp_percent(value: f32) -> f32 {
    if value.is_nan() {
        50.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Draw the signature onto a copy of `page`.
///
/// The result is flat: removing the signature later means compositing the
/// pre-overlay page again. Parts of the signature past the page edge are
/// clipped; transparent signature pixels leave the page visible.
#[instrument(skip_all, fields(page_w = page.width(), page_h = page.height()))]
pub fn composite(page: &RgbaImage, placement: &SignaturePlacement) -> RgbaImage {
    let (page_w, page_h) = page.dimensions();
    let (sig_w, sig_h) = placement.scaled_size(page_w);
    let signature = imageops::resize(&placement.image.to_rgba8(), sig_w, sig_h, FilterType::Triangle);

    let centre_x = placement.anchor_x / 100.0 * page_w as f32;
    let centre_y = placement.anchor_y / 100.0 * page_h as f32;
    let left = (centre_x - sig_w as f32 / 2.0).round() as i64;
    let top = (centre_y - sig_h as f32 / 2.0).round() as i64;
    debug!(sig_w, sig_h, left, top, "placing signature");

    let mut out = page.clone();
    imageops::overlay(&mut out, &signature, left, top);
    out
}
