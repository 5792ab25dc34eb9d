// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective rectifier. Warps the outlined page onto an upright rectangle.

use image::DynamicImage;
use scanwerk_core::error::ScanwerkError;
use scanwerk_core::Quad;
use tracing::{info, instrument, warn};

use crate::vision::VisionRuntime;

/// Result of [`rectify`].
///
/// `fallback` is set when the warp could not be done; `image` is then the
/// unrectified source. The caller never receives a partial warp.
#[derive(Debug)]
pub struct Rectification {
    pub image: DynamicImage,
    pub fallback: Option<ScanwerkError>,
}

impl Rectification {
    pub fn is_rectified(&self) -> bool {
        self.fallback.is_none()
    }
}

/// Warp the region bounded by `corners` (TL, TR, BR, BL) onto a
/// `target_width x target_height` rectangle.
///
/// Degenerate corners, a singular transform, or an empty target size all
/// fail closed to the source image with a [`ScanwerkError::DegenerateGeometry`].
#[instrument(skip(vision, image), fields(
    src_w = image.width(),
    src_h = image.height(),
))]
pub fn rectify(
    vision: &dyn VisionRuntime,
    image: &DynamicImage,
    corners: &Quad,
    target_width: u32,
    target_height: u32,
) -> Rectification {
    let fail = |reason: String| {
        warn!(%reason, "rectification skipped; keeping source image");
        Rectification {
            image: image.clone(),
            fallback: Some(ScanwerkError::DegenerateGeometry(reason)),
        }
    };

    if target_width == 0 || target_height == 0 {
        return fail(format!("target size {target_width}x{target_height}"));
    }
    if corners.is_degenerate() {
        return fail(format!("corners {:?}", corners.corners()));
    }

    let target = Quad::rect(target_width as f32, target_height as f32);
    let Some(homography) = vision.homography(corners, &target) else {
        return fail("no homography for these corners".into());
    };
    let Some(warped) = vision.warp(image, &homography, target_width, target_height) else {
        return fail("homography is not invertible".into());
    };

    info!("page rectified");
    Rectification {
        image: DynamicImage::ImageRgba8(warped),
        fallback: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::ImageprocVision;
    use image::{Rgba, RgbaImage};
    use scanwerk_core::Point;

    fn p(x: f32, y: f32) -> Point {
        Point::new(x, y)
    }

    fn checker(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
            if (x / 8 + y / 8) % 2 == 0 {
                Rgba([20, 20, 20, 255])
            } else {
                Rgba([220, 220, 220, 255])
            }
        }))
    }

    #[test]
    fn output_has_target_dimensions() {
        let vision = ImageprocVision::new();
        let photo = checker(1000, 1000);
        let corners = Quad::new([p(100.0, 100.0), p(900.0, 120.0), p(880.0, 900.0), p(80.0, 880.0)]);
        let out = rectify(&vision, &photo, &corners, 500, 700);
        assert!(out.is_rectified());
        assert_eq!((out.image.width(), out.image.height()), (500, 700));
    }

    #[test]
    fn identity_rectangle_is_a_near_identity_warp() {
        let vision = ImageprocVision::new();
        let photo = checker(64, 48);
        let out = rectify(&vision, &photo, &Quad::full_frame(64, 48), 64, 48);
        assert!(out.is_rectified());

        let (src, dst) = (photo.to_rgba8(), out.image.to_rgba8());
        for y in 1..47 {
            for x in 1..63 {
                let a = src.get_pixel(x, y).0[0] as i32;
                let b = dst.get_pixel(x, y).0[0] as i32;
                assert!((a - b).abs() <= 1, "({x},{y}): {a} vs {b}");
            }
        }
    }

    #[test]
    fn collinear_corners_return_the_original() {
        let vision = ImageprocVision::new();
        let photo = checker(100, 80);
        let corners = Quad::new([p(0.0, 0.0), p(50.0, 0.0), p(100.0, 0.0), p(0.0, 80.0)]);
        let out = rectify(&vision, &photo, &corners, 50, 50);
        assert!(matches!(out.fallback, Some(ScanwerkError::DegenerateGeometry(_))));
        assert_eq!(out.image, photo);
    }

    #[test]
    fn duplicate_corners_return_the_original() {
        let vision = ImageprocVision::new();
        let photo = checker(100, 80);
        let corners = Quad::new([p(10.0, 10.0), p(10.0, 10.0), p(90.0, 70.0), p(10.0, 70.0)]);
        let out = rectify(&vision, &photo, &corners, 50, 50);
        assert!(!out.is_rectified());
        assert_eq!(out.image, photo);
    }

    #[test]
    fn zero_target_returns_the_original() {
        let vision = ImageprocVision::new();
        let photo = checker(20, 20);
        let out = rectify(&vision, &photo, &Quad::full_frame(20, 20), 0, 20);
        assert!(!out.is_rectified());
        assert_eq!(out.image, photo);
    }

    #[test]
    fn self_intersecting_quad_still_warps() {
        // Swapped TR/BR: legal from the editor, and not collinear.
        let vision = ImageprocVision::new();
        let photo = checker(200, 200);
        let corners = Quad::new([p(10.0, 10.0), p(190.0, 190.0), p(190.0, 10.0), p(10.0, 190.0)]);
        let out = rectify(&vision, &photo, &corners, 100, 100);
        assert_eq!((out.image.width(), out.image.height()), (100, 100));
    }
}
