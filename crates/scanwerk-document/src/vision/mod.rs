// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Vision capability layer.
//
// Detection, rectification, and black-and-white thresholding all go through
// the `VisionRuntime` trait so the raster backend can be swapped, loaded
// lazily, or absent altogether.

pub mod imageproc_vision;
pub mod simplify;

use std::sync::Arc;

use image::{DynamicImage, GrayImage, RgbaImage};
use scanwerk_core::{Point, Quad};

use crate::runtime::RuntimeLoader;

pub use imageproc::geometric_transformations::Projection;
pub use imageproc_vision::ImageprocVision;

/// Raster primitives the reconstruction pipeline needs.
pub trait VisionRuntime: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Resample to exactly `width x height`.
    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage;

    fn to_gray(&self, image: &DynamicImage) -> GrayImage;

    /// Gaussian blur with an odd square kernel (`kernel_size` of 5 is 5x5).
    fn blur(&self, gray: &GrayImage, kernel_size: u32) -> GrayImage;

    /// Binary edge map via hysteresis thresholds `low` / `high`.
    fn edges(&self, gray: &GrayImage, low: f32, high: f32) -> GrayImage;

    /// Outermost contours of an edge map. Holes and nested borders are
    /// omitted.
    fn contours(&self, edges: &GrayImage) -> Vec<Vec<Point>>;

    /// Polygon approximation of a closed contour within `epsilon` pixels.
    fn simplify(&self, contour: &[Point], epsilon: f32) -> Vec<Point>;

    /// Projective transform taking each corner of `from` to the matching
    /// corner of `to`.
    fn homography(&self, from: &Quad, to: &Quad) -> Option<Projection>;

    /// Warp `image` through `homography` into a `width x height` raster.
    fn warp(
        &self,
        image: &DynamicImage,
        homography: &Projection,
        width: u32,
        height: u32,
    ) -> Option<RgbaImage>;

    /// Local-mean threshold over a `(2r+1) x (2r+1)` block, minus `offset`.
    fn adaptive_threshold(&self, gray: &GrayImage, block_radius: u32, offset: i32) -> GrayImage;
}

/// Process-wide lazy holder for the vision runtime.
pub type VisionLoader = RuntimeLoader<dyn VisionRuntime>;

/// A loader that builds the imageproc backend on first use.
pub fn imageproc_loader() -> VisionLoader {
    VisionLoader::new(
        "vision",
        Arc::new(|| Ok(Arc::new(ImageprocVision::new()) as Arc<dyn VisionRuntime>)),
    )
}

/// The projection taking each corner of `from` onto the same corner of `to`.
/// `None` when the correspondence is singular.
pub fn projection_between(from: &Quad, to: &Quad) -> Option<Projection> {
    let control = |quad: &Quad| quad.corners().map(|p| (p.x, p.y));
    Projection::from_control_points(control(from), control(to))
}

/// Sigma matching a `kernel_size` square Gaussian (the usual
/// `0.3 * ((k - 1) / 2 - 1) + 0.8` rule).
pub fn kernel_sigma(kernel_size: u32) -> f32 {
    let k = kernel_size.max(1) as f32;
    0.3 * ((k - 1.0) * 0.5 - 1.0) + 0.8
}
