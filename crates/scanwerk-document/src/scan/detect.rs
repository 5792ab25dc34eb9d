// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Edge detector: proposes the four corners of a photographed page.
//
// Pipeline: downscale, luma, 5x5 blur, Canny (50/150), external contours,
// pick the single largest contour by area, simplify to within 2% of its
// perimeter, and accept it only if it has exactly four vertices and covers
// more than 10% of the frame. Nothing else is tried when the largest
// contour fails those checks.

use image::DynamicImage;
use scanwerk_core::error::ScanwerkError;
use scanwerk_core::geometry::polygon_area;
use scanwerk_core::{DetectedDocument, Degradation, DegradationKind, Point, Quad};
use tracing::{debug, info, instrument, warn};

use crate::vision::VisionRuntime;
use crate::vision::simplify::closed_perimeter;

/// Tunables for [`EdgeDetector`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    /// Scale applied before processing, in `(0, 1]`.
    pub downscale: f32,
    pub blur_kernel: u32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Simplification tolerance as a fraction of the contour perimeter.
    pub epsilon_fraction: f32,
    /// Minimum contour area as a fraction of the downscaled frame.
    pub min_area_fraction: f32,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            downscale: 0.5,
            blur_kernel: 5,
            canny_low: 50.0,
            canny_high: 150.0,
            epsilon_fraction: 0.02,
            min_area_fraction: 0.10,
        }
    }
}

impl DetectionParams {
    pub fn with_downscale(mut self, downscale: f32) -> Self {
        self.downscale = downscale;
        self
    }
}

/// Finds the page outline in a photo.
pub struct EdgeDetector<'a> {
    vision: &'a dyn VisionRuntime,
    params: DetectionParams,
}

impl<'a> EdgeDetector<'a> {
    pub fn new(vision: &'a dyn VisionRuntime) -> Self {
        Self {
            vision,
            params: DetectionParams::default(),
        }
    }

    pub fn with_params(vision: &'a dyn VisionRuntime, params: DetectionParams) -> Self {
        Self { vision, params }
    }

    pub fn params(&self) -> &DetectionParams {
        &self.params
    }

    /// Corners in source-image coordinates, canonically ordered, or `None`
    /// when no qualifying outline exists.
    pub fn detect(&self, image: &DynamicImage) -> Option<DetectedDocument> {
        self.try_detect(image).ok()
    }

    /// As [`detect`](Self::detect), but says why nothing was found.
    #[instrument(skip_all, fields(
        width = image.width(),
        height = image.height(),
        downscale = self.params.downscale,
        runtime = self.vision.name(),
    ))]
    pub fn try_detect(&self, image: &DynamicImage) -> Result<DetectedDocument, ScanwerkError> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(ScanwerkError::DetectionFailure("empty image".into()));
        }
        let scale = self.params.downscale;
        if !(scale.is_finite() && scale > 0.0 && scale <= 1.0) {
            return Err(ScanwerkError::DetectionFailure(format!(
                "downscale {scale} outside (0, 1]"
            )));
        }

        let small_w = ((width as f32 * scale).round() as u32).max(1);
        let small_h = ((height as f32 * scale).round() as u32).max(1);

        // Intermediate rasters are dropped at the end of this block.
        let contours = {
            let gray = if (small_w, small_h) == (width, height) {
                self.vision.to_gray(image)
            } else {
                let small = self.vision.resize(image, small_w, small_h);
                self.vision.to_gray(&small)
            };
            let blurred = self.vision.blur(&gray, self.params.blur_kernel);
            let edges = self
                .vision
                .edges(&blurred, self.params.canny_low, self.params.canny_high);
            self.vision.contours(&edges)
        };
        debug!(contours = contours.len(), small_w, small_h, "contours extracted");

        let Some((largest, area)) = largest_contour(&contours) else {
            return Err(ScanwerkError::DetectionFailure("no contours".into()));
        };

        let frame_area = small_w as f32 * small_h as f32;
        if area <= self.params.min_area_fraction * frame_area {
            debug!(area, frame_area, "largest contour too small");
            return Err(ScanwerkError::DetectionFailure(format!(
                "largest outline covers {:.1}% of the frame",
                100.0 * area / frame_area
            )));
        }

        let epsilon = self.params.epsilon_fraction * closed_perimeter(largest);
        let polygon = self.vision.simplify(largest, epsilon);
        if polygon.len() != 4 {
            debug!(vertices = polygon.len(), "largest contour is not a quadrilateral");
            return Err(ScanwerkError::DetectionFailure(format!(
                "largest outline has {} vertices",
                polygon.len()
            )));
        }

        let inv = 1.0 / scale;
        let (w, h) = (width as f32, height as f32);
        let corners = [polygon[0], polygon[1], polygon[2], polygon[3]]
            .map(|p| Point::new(p.x * inv, p.y * inv).clamped(w, h));
        let quad = Quad::canonicalize(corners);
        let confidence = (area / frame_area).min(1.0);

        info!(confidence, corners = ?quad.corners(), "document outline detected");
        Ok(DetectedDocument {
            corners: quad,
            confidence,
        })
    }
}

/// Single largest contour by enclosed area; the first one wins ties.
fn largest_contour(contours: &[Vec<Point>]) -> Option<(&[Point], f32)> {
    let mut best: Option<(&[Point], f32)> = None;
    for contour in contours {
        let area = polygon_area(contour);
        if best.is_none_or(|(_, best_area)| area > best_area) {
            best = Some((contour.as_slice(), area));
        }
    }
    best.filter(|(_, area)| *area > 0.0)
}

/// `detect(image, downscale)`: the detector with default params at the
/// given scale.
pub fn detect(
    vision: &dyn VisionRuntime,
    image: &DynamicImage,
    downscale: f32,
) -> Option<DetectedDocument> {
    EdgeDetector::with_params(vision, DetectionParams::default().with_downscale(downscale))
        .detect(image)
}

/// Starting corners for review: the detected outline, or the full frame
/// together with the reason detection fell back.
pub fn detect_or_full_frame(
    vision: Option<&dyn VisionRuntime>,
    image: &DynamicImage,
    downscale: f32,
) -> (Quad, Option<Degradation>) {
    let full_frame = || Quad::full_frame(image.width(), image.height());
    let Some(vision) = vision else {
        warn!("vision runtime unavailable; using full frame");
        return (
            full_frame(),
            Some(Degradation::new(
                DegradationKind::VisionUnavailable,
                "edge detection skipped",
            )),
        );
    };

    let detector =
        EdgeDetector::with_params(vision, DetectionParams::default().with_downscale(downscale));
    match detector.try_detect(image) {
        Ok(found) => (found.corners, None),
        Err(err) => {
            info!(error = %err, "falling back to full-frame corners");
            (
                full_frame(),
                Some(Degradation::new(DegradationKind::DetectionFailed, err.to_string())),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::ImageprocVision;
    use image::{GrayImage, Luma, Rgba, RgbaImage};
    use crate::vision::{Projection, projection_between};

    fn p(x: f32, y: f32) -> Point {
        Point::new(x, y)
    }

    /// A bright page on a dark table.
    fn page_photo(w: u32, h: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
            if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
                Rgba([235, 235, 230, 255])
            } else {
                Rgba([30, 30, 30, 255])
            }
        }))
    }

    fn assert_near(actual: Point, expected: Point, tolerance: f32) {
        assert!(
            actual.distance(&expected) <= tolerance,
            "{actual:?} not within {tolerance}px of {expected:?}"
        );
    }

    #[test]
    fn finds_high_contrast_rectangle() {
        let vision = ImageprocVision::new();
        let photo = page_photo(400, 500, 50, 60, 350, 440);
        let found = detect(&vision, &photo, 0.5).expect("rectangle should be detected");

        let tol = 6.0;
        assert_near(found.corners.top_left(), p(50.0, 60.0), tol);
        assert_near(found.corners.top_right(), p(350.0, 60.0), tol);
        assert_near(found.corners.bottom_right(), p(350.0, 440.0), tol);
        assert_near(found.corners.bottom_left(), p(50.0, 440.0), tol);
        assert!(found.confidence > 0.10 && found.confidence <= 1.0);
    }

    #[test]
    fn detection_at_full_resolution() {
        let vision = ImageprocVision::new();
        let photo = page_photo(200, 160, 30, 20, 170, 140);
        let found = detect(&vision, &photo, 1.0).expect("detected");
        assert_near(found.corners.top_left(), p(30.0, 20.0), 4.0);
        assert_near(found.corners.bottom_right(), p(170.0, 140.0), 4.0);
    }

    #[test]
    fn blank_image_has_no_outline() {
        let vision = ImageprocVision::new();
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(120, 90, Luma([128])));
        assert!(detect(&vision, &blank, 0.5).is_none());
    }

    #[test]
    fn small_rectangle_is_rejected() {
        let vision = ImageprocVision::new();
        // 40x40 on 400x400 is 1% of the frame.
        let photo = page_photo(400, 400, 180, 180, 220, 220);
        assert!(detect(&vision, &photo, 0.5).is_none());
    }

    #[test]
    fn invalid_downscale_is_a_detection_failure() {
        let vision = ImageprocVision::new();
        let photo = page_photo(100, 100, 10, 10, 90, 90);
        for scale in [0.0, -1.0, 1.5, f32::NAN] {
            let detector =
                EdgeDetector::with_params(&vision, DetectionParams::default().with_downscale(scale));
            assert!(matches!(
                detector.try_detect(&photo),
                Err(ScanwerkError::DetectionFailure(_))
            ));
        }
    }

    #[test]
    fn fallback_is_full_frame() {
        let vision = ImageprocVision::new();
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 48, Luma([10])));
        let (quad, degradation) = detect_or_full_frame(Some(&vision), &blank, 0.5);
        assert_eq!(quad, Quad::full_frame(64, 48));
        assert_eq!(
            degradation.map(|d| d.kind),
            Some(DegradationKind::DetectionFailed)
        );

        let (quad, degradation) = detect_or_full_frame(None, &blank, 0.5);
        assert_eq!(quad, Quad::full_frame(64, 48));
        assert_eq!(
            degradation.map(|d| d.kind),
            Some(DegradationKind::VisionUnavailable)
        );
    }

    /// Software fake returning scripted contours, so selection logic can be
    /// checked without any raster work.
    struct ScriptedVision {
        contours: Vec<Vec<Point>>,
    }

    impl VisionRuntime for ScriptedVision {
        fn name(&self) -> &str {
            "scripted"
        }
        fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
            image.resize_exact(width, height, image::imageops::FilterType::Nearest)
        }
        fn to_gray(&self, image: &DynamicImage) -> GrayImage {
            image.to_luma8()
        }
        fn blur(&self, gray: &GrayImage, _kernel_size: u32) -> GrayImage {
            gray.clone()
        }
        fn edges(&self, gray: &GrayImage, _low: f32, _high: f32) -> GrayImage {
            gray.clone()
        }
        fn contours(&self, _edges: &GrayImage) -> Vec<Vec<Point>> {
            self.contours.clone()
        }
        fn simplify(&self, contour: &[Point], _epsilon: f32) -> Vec<Point> {
            contour.to_vec()
        }
        fn homography(&self, from: &Quad, to: &Quad) -> Option<Projection> {
            projection_between(from, to)
        }
        fn warp(
            &self,
            _image: &DynamicImage,
            _homography: &Projection,
            width: u32,
            height: u32,
        ) -> Option<RgbaImage> {
            Some(RgbaImage::new(width, height))
        }
        fn adaptive_threshold(&self, gray: &GrayImage, _r: u32, _c: i32) -> GrayImage {
            gray.clone()
        }
    }

    #[test]
    fn only_the_largest_contour_is_considered() {
        // Largest is a pentagon; a valid quad is also present but smaller.
        let pentagon = vec![p(0.0, 0.0), p(90.0, 0.0), p(99.0, 50.0), p(90.0, 99.0), p(0.0, 99.0)];
        let quad = vec![p(10.0, 10.0), p(60.0, 10.0), p(60.0, 60.0), p(10.0, 60.0)];
        let vision = ScriptedVision {
            contours: vec![quad, pentagon],
        };
        let photo = DynamicImage::ImageLuma8(GrayImage::new(100, 100));
        let detector =
            EdgeDetector::with_params(&vision, DetectionParams::default().with_downscale(1.0));
        assert!(detector.detect(&photo).is_none());
    }

    #[test]
    fn corners_are_rescaled_and_canonicalised() {
        // A ring starting at the bottom-right, in downscaled (x0.5) coordinates.
        let contour = vec![p(90.0, 90.0), p(10.0, 90.0), p(10.0, 10.0), p(90.0, 10.0)];
        let vision = ScriptedVision {
            contours: vec![contour],
        };
        let photo = DynamicImage::ImageLuma8(GrayImage::new(200, 200));
        let found = detect(&vision, &photo, 0.5).expect("quad");
        assert_eq!(
            found.corners.corners(),
            &[p(20.0, 20.0), p(180.0, 20.0), p(180.0, 180.0), p(20.0, 180.0)]
        );
        assert!((found.confidence - 0.64).abs() < 1e-4);
    }
}
