// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Adjustment pipeline: colour filter, quarter-turn rotation, and
// brightness/contrast, always applied in that order to the rectified
// original.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage, imageops};
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::{AdjustmentState, ColorFilter, Rotation};
use tracing::{debug, instrument};

use super::threshold::{GLOBAL_THRESHOLD, global_threshold};
use crate::vision::VisionRuntime;

/// Default lossy quality of the preview encoding.
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// Rec. 601 luma, rounded to the nearest integer.
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let l = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    l.round().clamp(0.0, 255.0) as u8
}

/// Single-channel luma of an RGBA raster (alpha ignored).
pub fn to_luma(image: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgba([r, g, b, _]) = *image.get_pixel(x, y);
        Luma([luma(r, g, b)])
    })
}

/// The multiplier for a contrast level in `[-100, 100]`.
///
/// `259 * (c + 255) / (255 * (259 - c))`, which is exactly 1 at `c = 0`.
pub fn contrast_factor(contrast: i32) -> f32 {
    let c = contrast as f32;
    (259.0 * (c + 255.0)) / (255.0 * (259.0 - c))
}

/// The output of one pipeline run.
#[derive(Debug, Clone)]
pub struct AdjustedPage {
    pub image: RgbaImage,
    jpeg_quality: u8,
}

impl AdjustedPage {
    /// JPEG encoding of the page for preview, made on request.
    pub fn jpeg(&self) -> Result<Vec<u8>> {
        encode_jpeg(&self.image, self.jpeg_quality)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Applies an [`AdjustmentState`] to a rectified page.
///
/// The pipeline never keeps its own output: every call starts again from the
/// raster it is given, so callers pass the rectified original each time.
pub struct AdjustmentPipeline<'a> {
    vision: Option<&'a dyn VisionRuntime>,
    bw_block_radius: u32,
    bw_offset: i32,
    jpeg_quality: u8,
}

impl<'a> AdjustmentPipeline<'a> {
    /// A pipeline using `vision` for adaptive thresholding, or the fixed
    /// global threshold when `None`.
    pub fn new(vision: Option<&'a dyn VisionRuntime>) -> Self {
        Self {
            vision,
            bw_block_radius: 5,
            bw_offset: 2,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn with_threshold(mut self, block_radius: u32, offset: i32) -> Self {
        self.bw_block_radius = block_radius;
        self.bw_offset = offset;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Whether black-and-white uses the adaptive threshold.
    pub fn is_adaptive(&self) -> bool {
        self.vision.is_some()
    }

    /// Filter, then rotate, then brightness/contrast.
    #[instrument(skip_all, fields(
        width = original.width(),
        height = original.height(),
        filter = ?state.filter,
        rotation = state.rotation.degrees(),
    ))]
    pub fn render(&self, original: &DynamicImage, state: &AdjustmentState) -> RgbaImage {
        let filtered = self.apply_filter(original.to_rgba8(), state.filter);
        let rotated = rotate(filtered, state.rotation);
        let adjusted = brightness_contrast(rotated, state.brightness(), state.contrast());
        debug!(
            out_w = adjusted.width(),
            out_h = adjusted.height(),
            "adjustments applied"
        );
        adjusted
    }

    /// [`render`](Self::render), remembering the preview quality.
    pub fn apply(&self, original: &DynamicImage, state: &AdjustmentState) -> AdjustedPage {
        AdjustedPage {
            image: self.render(original, state),
            jpeg_quality: self.jpeg_quality,
        }
    }

    fn apply_filter(&self, image: RgbaImage, filter: ColorFilter) -> RgbaImage {
        match filter {
            ColorFilter::Color => image,
            ColorFilter::Grayscale => {
                let gray = to_luma(&image);
                with_gray_channels(image, &gray)
            }
            ColorFilter::BlackAndWhite => {
                let gray = to_luma(&image);
                let binary = match self.vision {
                    Some(vision) => {
                        vision.adaptive_threshold(&gray, self.bw_block_radius, self.bw_offset)
                    }
                    None => global_threshold(&gray, GLOBAL_THRESHOLD),
                };
                with_gray_channels(image, &binary)
            }
        }
    }
}

/// Write `gray` into the colour channels of `image`, keeping alpha.
fn with_gray_channels(mut image: RgbaImage, gray: &GrayImage) -> RgbaImage {
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let v = gray.get_pixel(x, y).0[0];
        pixel.0[0] = v;
        pixel.0[1] = v;
        pixel.0[2] = v;
    }
    image
}

/// Rotate clockwise by a quarter-turn multiple.
pub fn rotate(image: RgbaImage, rotation: Rotation) -> RgbaImage {
    match rotation {
        Rotation::Deg0 => image,
        Rotation::Deg90 => imageops::rotate90(&image),
        Rotation::Deg180 => imageops::rotate180(&image),
        Rotation::Deg270 => imageops::rotate270(&image),
    }
}

/// `v' = v + brightness`, then `v'' = factor * (v' - 128) + 128`, clamped.
///
/// Alpha is left alone. With both levels at zero the raster is returned
/// untouched.
pub fn brightness_contrast(mut image: RgbaImage, brightness: i32, contrast: i32) -> RgbaImage {
    if brightness == 0 && contrast == 0 {
        return image;
    }
    let factor = contrast_factor(contrast);
    let adjust = |channel: u8| -> u8 {
        let shifted = channel as f32 + brightness as f32;
        let stretched = factor * (shifted - 128.0) + 128.0;
        stretched.round().clamp(0.0, 255.0) as u8
    };
    for pixel in image.pixels_mut() {
        let Rgba([r, g, b, a]) = *pixel;
        *pixel = Rgba([adjust(r), adjust(g), adjust(b), a]);
    }
    image
}

/// Encode as baseline JPEG at `quality` (1-100). Alpha is dropped.
pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)
        .map_err(|err| ScanwerkError::ImageError(format!("JPEG encoding failed: {err}")))?;
    Ok(buffer)
}

/// Shrink to fit inside `max_width x max_height`, keeping aspect ratio.
/// Rasters that already fit are returned as-is.
pub fn fit_within(image: RgbaImage, max_width: u32, max_height: u32) -> RgbaImage {
    let (w, h) = image.dimensions();
    if max_width == 0 || max_height == 0 || (w <= max_width && h <= max_height) {
        return image;
    }
    let scale = (max_width as f32 / w as f32).min(max_height as f32 / h as f32);
    let new_w = ((w as f32 * scale).round() as u32).clamp(1, max_width);
    let new_h = ((h as f32 * scale).round() as u32).clamp(1, max_height);
    debug!(from_w = w, from_h = h, new_w, new_h, "downscaling for export");
    imageops::resize(&image, new_w, new_h, FilterType::Lanczos3)
}
