// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Closed-contour simplification (Ramer-Douglas-Peucker).
//
// A traced contour has no natural endpoints, so it is split at the point
// farthest from its first point and each half is simplified as an open
// chain. A final pass drops vertices that ended up nearly collinear with
// their neighbours across the seam.

use scanwerk_core::Point;

/// Simplify a closed polygon so no removed point lies farther than
/// `epsilon` from the simplified outline.
///
/// Polygons with fewer than four points are returned unchanged.
pub fn simplify_closed(points: &[Point], epsilon: f32) -> Vec<Point> {
    let n = points.len();
    if n < 4 {
        return points.to_vec();
    }

    let anchor = points[0];
    let (far, _) = points
        .iter()
        .enumerate()
        .skip(1)
        .fold((0, 0.0f32), |(best, best_d), (i, p)| {
            let d = p.distance(&anchor);
            if d > best_d { (i, d) } else { (best, best_d) }
        });
    if far == 0 {
        // Every point coincides with the anchor.
        return vec![anchor];
    }

    let mut kept = vec![false; n];
    kept[0] = true;
    kept[far] = true;

    rdp_recurse(points, 0, far, epsilon, &mut kept);

    // Second half wraps back to the anchor.
    let mut tail: Vec<Point> = points[far..].to_vec();
    tail.push(anchor);
    let mut tail_kept = vec![false; tail.len()];
    let last = tail.len() - 1;
    rdp_recurse(&tail, 0, last, epsilon, &mut tail_kept);
    for (offset, keep) in tail_kept.iter().enumerate().take(last) {
        if *keep {
            kept[far + offset] = true;
        }
    }

    let mut simplified: Vec<Point> = points
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect();

    drop_collinear(&mut simplified, epsilon);
    simplified
}

fn rdp_recurse(points: &[Point], start: usize, end: usize, epsilon: f32, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;
    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > epsilon {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, epsilon, kept);
        rdp_recurse(points, max_idx, end, epsilon, kept);
    }
}

/// Remove vertices lying within `epsilon` of the line through their
/// neighbours, until none remain or only a triangle is left.
fn drop_collinear(polygon: &mut Vec<Point>, epsilon: f32) {
    let mut changed = true;
    while changed && polygon.len() > 3 {
        changed = false;
        let n = polygon.len();
        for i in 0..n {
            let prev = polygon[(i + n - 1) % n];
            let next = polygon[(i + 1) % n];
            if perpendicular_distance(polygon[i], prev, next) <= epsilon {
                polygon.remove(i);
                changed = true;
                break;
            }
        }
    }
}

/// Distance from `p` to the infinite line through `a` and `b`.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx * dx + dy * dy;
    if length_sq == 0.0 {
        return p.distance(&a);
    }
    let cross = dx * (a.y - p.y) - dy * (a.x - p.x);
    cross.abs() / length_sq.sqrt()
}

/// Closed perimeter of a polygon.
pub fn closed_perimeter(points: &[Point]) -> f32 {
    let n = points.len();
    if n < 2 {
        return 0.0;
    }
    (0..n)
        .map(|i| points[i].distance(&points[(i + 1) % n]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> Point {
        Point::new(x, y)
    }

    /// Walk the border of an axis-aligned rectangle one pixel at a time.
    fn traced_rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Vec<Point> {
        let mut pts = Vec::new();
        let mut x = x0;
        while x < x1 {
            pts.push(p(x, y0));
            x += 1.0;
        }
        let mut y = y0;
        while y < y1 {
            pts.push(p(x1, y));
            y += 1.0;
        }
        let mut x = x1;
        while x > x0 {
            pts.push(p(x, y1));
            x -= 1.0;
        }
        let mut y = y1;
        while y > y0 {
            pts.push(p(x0, y));
            y -= 1.0;
        }
        pts
    }

    #[test]
    fn traced_rectangle_collapses_to_four_corners() {
        let contour = traced_rect(10.0, 20.0, 110.0, 80.0);
        let eps = 0.02 * closed_perimeter(&contour);
        let simplified = simplify_closed(&contour, eps);
        assert_eq!(simplified.len(), 4, "{simplified:?}");
        for corner in [p(10.0, 20.0), p(110.0, 20.0), p(110.0, 80.0), p(10.0, 80.0)] {
            assert!(simplified.contains(&corner), "missing {corner:?}");
        }
    }

    #[test]
    fn rectangle_starting_mid_edge_still_gives_four_corners() {
        let mut contour = traced_rect(0.0, 0.0, 60.0, 40.0);
        contour.rotate_left(25);
        let eps = 0.02 * closed_perimeter(&contour);
        let simplified = simplify_closed(&contour, eps);
        assert_eq!(simplified.len(), 4, "{simplified:?}");
    }

    #[test]
    fn jagged_triangle_stays_a_triangle() {
        let contour = vec![
            p(0.0, 0.0),
            p(50.0, 0.5),
            p(100.0, 0.0),
            p(75.0, 40.0),
            p(50.0, 80.0),
            p(25.0, 40.0),
        ];
        let simplified = simplify_closed(&contour, 2.0);
        assert_eq!(simplified.len(), 3, "{simplified:?}");
    }

    #[test]
    fn short_polygons_unchanged() {
        let tri = vec![p(0.0, 0.0), p(1.0, 0.0), p(0.0, 1.0)];
        assert_eq!(simplify_closed(&tri, 5.0), tri);
    }

    #[test]
    fn perimeter_of_unit_square() {
        let square = vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)];
        assert!((closed_perimeter(&square) - 4.0).abs() < 1e-6);
    }
}
