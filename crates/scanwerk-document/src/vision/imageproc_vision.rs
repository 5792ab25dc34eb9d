// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `VisionRuntime` backed by `image` + `imageproc`.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Rgba, RgbaImage};
use imageproc::contours::{BorderType, find_contours};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use scanwerk_core::{Point, Quad};
use tracing::debug;

use super::simplify::simplify_closed;
use super::{VisionRuntime, kernel_sigma, projection_between};
use crate::image::adjust::to_luma;
use crate::image::threshold::adaptive_mean_threshold;

/// Pixels outside the source quad are filled with white paper.
const WARP_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Pure-Rust vision backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageprocVision;

impl ImageprocVision {
    pub fn new() -> Self {
        Self
    }
}

impl VisionRuntime for ImageprocVision {
    fn name(&self) -> &str {
        "imageproc"
    }

    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        image.resize_exact(width.max(1), height.max(1), FilterType::Triangle)
    }

    fn to_gray(&self, image: &DynamicImage) -> GrayImage {
        to_luma(&image.to_rgba8())
    }

    fn blur(&self, gray: &GrayImage, kernel_size: u32) -> GrayImage {
        gaussian_blur_f32(gray, kernel_sigma(kernel_size))
    }

    fn edges(&self, gray: &GrayImage, low: f32, high: f32) -> GrayImage {
        canny(gray, low, high)
    }

    fn contours(&self, edges: &GrayImage) -> Vec<Vec<Point>> {
        let outer: Vec<Vec<Point>> = find_contours::<i32>(edges)
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .map(|c| {
                c.points
                    .iter()
                    .map(|p| Point::new(p.x as f32, p.y as f32))
                    .collect()
            })
            .collect();
        debug!(count = outer.len(), "external contours traced");
        outer
    }

    fn simplify(&self, contour: &[Point], epsilon: f32) -> Vec<Point> {
        simplify_closed(contour, epsilon)
    }

    fn homography(&self, from: &Quad, to: &Quad) -> Option<Projection> {
        projection_between(from, to)
    }

    fn warp(
        &self,
        image: &DynamicImage,
        homography: &Projection,
        width: u32,
        height: u32,
    ) -> Option<RgbaImage> {
        if width == 0 || height == 0 {
            return None;
        }
        let source = image.to_rgba8();
        let mut output = RgbaImage::new(width, height);
        warp_into(
            &source,
            homography,
            Interpolation::Bilinear,
            WARP_FILL,
            &mut output,
        );
        Some(output)
    }

    fn adaptive_threshold(&self, gray: &GrayImage, block_radius: u32, offset: i32) -> GrayImage {
        adaptive_mean_threshold(gray, block_radius, offset)
    }
}
