// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry primitives: image-space points and document quadrilaterals.

use serde::{Deserialize, Serialize};

/// Index of each corner inside a canonical [`Quad`].
pub const TOP_LEFT: usize = 0;
pub const TOP_RIGHT: usize = 1;
pub const BOTTOM_RIGHT: usize = 2;
pub const BOTTOM_LEFT: usize = 3;

/// Two corners closer than this (in pixels) are treated as duplicates.
const DUPLICATE_EPSILON: f32 = 1.0;

/// Three corners spanning a triangle smaller than this (in square pixels)
/// are treated as collinear.
const COLLINEAR_AREA_EPSILON: f32 = 1.0;

/// A point in image space, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Clamp both coordinates into `[0, width] x [0, height]`.
    pub fn clamped(&self, width: f32, height: f32) -> Self {
        Self {
            x: self.x.clamp(0.0, width.max(0.0)),
            y: self.y.clamp(0.0, height.max(0.0)),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A document outline: exactly four corners stored in the order
/// `[top-left, top-right, bottom-right, bottom-left]`.
///
/// The order is established once, by [`Quad::canonicalize`] or by a caller
/// that already knows which corner is which. Moving a corner afterwards
/// (see [`Quad::set_corner`]) never reorders the quad, so a user dragging
/// handles around can legally produce a self-intersecting outline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    corners: [Point; 4],
}

impl Quad {
    /// Wrap four corners whose order is already known to be TL, TR, BR, BL.
    pub const fn new(corners: [Point; 4]) -> Self {
        Self { corners }
    }

    /// Order four unordered points as TL, TR, BR, BL.
    ///
    /// The smallest `x + y` is top-left and the largest is bottom-right. Of
    /// the two that remain, the smaller `y - x` is top-right. This holds for
    /// near-axis-aligned convex outlines (a photographed page) and is known
    /// to misorder heavily rotated captures.
    pub fn canonicalize(points: [Point; 4]) -> Self {
        let mut by_sum = points;
        by_sum.sort_by(|a, b| (a.x + a.y).total_cmp(&(b.x + b.y)));

        let top_left = by_sum[0];
        let bottom_right = by_sum[3];

        let mut rest = [by_sum[1], by_sum[2]];
        rest.sort_by(|a, b| (a.y - a.x).total_cmp(&(b.y - b.x)));

        Self {
            corners: [top_left, rest[0], bottom_right, rest[1]],
        }
    }

    /// The whole frame of a `width x height` image, used when detection
    /// finds nothing.
    pub fn full_frame(width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self::new([
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(w, h),
            Point::new(0.0, h),
        ])
    }

    /// An axis-aligned rectangle with its top-left corner at the origin.
    pub fn rect(width: f32, height: f32) -> Self {
        Self::new([
            Point::new(0.0, 0.0),
            Point::new(width, 0.0),
            Point::new(width, height),
            Point::new(0.0, height),
        ])
    }

    pub fn corners(&self) -> &[Point; 4] {
        &self.corners
    }

    pub fn corner(&self, index: usize) -> Option<Point> {
        self.corners.get(index).copied()
    }

    /// Move one corner. Order is never re-derived.
    pub fn set_corner(&mut self, index: usize, point: Point) {
        if let Some(slot) = self.corners.get_mut(index) {
            *slot = point;
        }
    }

    pub fn top_left(&self) -> Point {
        self.corners[TOP_LEFT]
    }

    pub fn top_right(&self) -> Point {
        self.corners[TOP_RIGHT]
    }

    pub fn bottom_right(&self) -> Point {
        self.corners[BOTTOM_RIGHT]
    }

    pub fn bottom_left(&self) -> Point {
        self.corners[BOTTOM_LEFT]
    }

    /// Enclosed area (shoelace formula, absolute value).
    pub fn area(&self) -> f32 {
        polygon_area(&self.corners)
    }

    /// Closed perimeter length.
    pub fn perimeter(&self) -> f32 {
        (0..4)
            .map(|i| self.corners[i].distance(&self.corners[(i + 1) % 4]))
            .sum()
    }

    /// Multiply every coordinate by `factor`.
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            corners: self
                .corners
                .map(|p| Point::new(p.x * factor, p.y * factor)),
        }
    }

    /// Whether the quad cannot define a perspective transform: non-finite coordinates,
    /// two coincident corners, or any three corners on one line.
    pub fn is_degenerate(&self) -> bool {
        if self.corners.iter().any(|p| !p.is_finite()) {
            return true;
        }

        for i in 0..4 {
            for j in (i + 1)..4 {
                if self.corners[i].distance(&self.corners[j]) < DUPLICATE_EPSILON {
                    return true;
                }
            }
        }

        // Every triple of a quad omits exactly one corner.
        (0..4).any(|skip| {
            let tri: Vec<Point> = (0..4)
                .filter(|&i| i != skip)
                .map(|i| self.corners[i])
                .collect();
            polygon_area(&tri) < COLLINEAR_AREA_EPSILON
        })
    }
}

/// Shoelace area of a closed polygon (absolute value).
pub fn polygon_area(points: &[Point]) -> f32 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0f64;
    for i in 0..n {
        let j = (i + 1) % n;
        twice_area += points[i].x as f64 * points[j].y as f64;
        twice_area -= points[j].x as f64 * points[i].y as f64;
    }
    (twice_area.abs() / 2.0) as f32
}
