// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Binarization: locally adaptive (integral image) and fixed global threshold.

use image::{GrayImage, Luma};

/// Global threshold used when no vision runtime is available.
pub const GLOBAL_THRESHOLD: u8 = 128;

/// Adaptive thresholding against the local mean.
///
/// For each pixel the threshold is the mean intensity of the
/// `(2 * block_radius + 1)` square around it, minus `offset`. Pixels brighter
/// than the threshold become white; the rest become black. The window is
/// clipped at the image border.
pub fn adaptive_mean_threshold(gray: &GrayImage, block_radius: u32, offset: i32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let integral = integral_image(gray);

    GrayImage::from_fn(width, height, |x, y| {
        let local_mean = region_mean(&integral, width, height, x, y, block_radius);
        let threshold = local_mean - offset as f64;
        let value = gray.get_pixel(x, y).0[0] as f64;
        Luma([if value > threshold { 255 } else { 0 }])
    })
}

/// Fixed global threshold: `value >= threshold` is white.
pub fn global_threshold(gray: &GrayImage, threshold: u8) -> GrayImage {
    let (width, height) = gray.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let value = gray.get_pixel(x, y).0[0];
        Luma([if value >= threshold { 255 } else { 0 }])
    })
}

/// Summed-area table with a zero row and column prepended.
///
/// `table[y * (width + 1) + x]` holds the sum over `[0, x) x [0, y)`.
fn integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];

    for y in 0..h {
        let mut row_sum: u64 = 0;
        for x in 0..w {
            row_sum += gray.get_pixel(x, y).0[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            let above = y as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[above];
        }
    }

    table
}

fn region_mean(integral: &[u64], width: u32, height: u32, cx: u32, cy: u32, radius: u32) -> f64 {
    let stride = (width + 1) as usize;

    let x1 = cx.saturating_sub(radius) as usize;
    let y1 = cy.saturating_sub(radius) as usize;
    let x2 = (cx as usize + radius as usize + 1).min(width as usize);
    let y2 = (cy as usize + radius as usize + 1).min(height as usize);

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    if area == 0.0 {
        return GLOBAL_THRESHOLD as f64;
    }

    let sum = integral[y2 * stride + x2] as f64 - integral[y1 * stride + x2] as f64
        - integral[y2 * stride + x1] as f64
        + integral[y1 * stride + x1] as f64;

    sum / area
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_is_strictly_binary() {
        let gray = GrayImage::from_fn(64, 48, |x, y| Luma([((x * 7 + y * 13) % 256) as u8]));
        for img in [adaptive_mean_threshold(&gray, 5, 2), global_threshold(&gray, 128)] {
            assert!(img.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        }
    }

    #[test]
    fn flat_region_is_white_under_positive_offset() {
        // Mean equals the value, so value > mean - 2 everywhere.
        let gray = GrayImage::from_pixel(20, 20, Luma([90]));
        let bw = adaptive_mean_threshold(&gray, 5, 2);
        assert!(bw.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn dark_stroke_on_paper_becomes_black() {
        let gray = GrayImage::from_fn(40, 40, |x, _| {
            if (18..22).contains(&x) { Luma([40]) } else { Luma([200]) }
        });
        let bw = adaptive_mean_threshold(&gray, 5, 2);
        assert_eq!(bw.get_pixel(20, 20).0[0], 0);
        assert_eq!(bw.get_pixel(5, 20).0[0], 255);
    }

    #[test]
    fn global_threshold_boundary() {
        let gray = GrayImage::from_fn(3, 1, |x, _| Luma([[127, 128, 129][x as usize]]));
        let bw = global_threshold(&gray, GLOBAL_THRESHOLD);
        assert_eq!(bw.get_pixel(0, 0).0[0], 0);
        assert_eq!(bw.get_pixel(1, 0).0[0], 255);
        assert_eq!(bw.get_pixel(2, 0).0[0], 255);
    }
}
