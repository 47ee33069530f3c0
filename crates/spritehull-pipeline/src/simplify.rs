//! Path simplification using the Ramer-Douglas-Peucker algorithm.
//!
//! Reduces point count by removing points that lie within a tolerance
//! of the segment between their retained neighbours. Distances are
//! compared squared against `tolerance²`.
//!
//! Used twice in the pipeline: to compress the raw traced contour
//! (phase 1) and, at a reduced tolerance, to compress each convex piece
//! after decomposition (phase 3).

use crate::types::{Point, Polygon, Polyline};

/// Simplify an open polyline using the Ramer-Douglas-Peucker algorithm.
///
/// Points within `tolerance` pixels of the segment between their
/// retained neighbours are removed. The first and last points are
/// always kept. When several points share the maximum distance, the
/// earliest one is kept.
///
/// Polylines with fewer than 3 points are returned unchanged.
#[must_use = "returns the simplified polyline"]
pub fn simplify(polyline: &Polyline, tolerance: f64) -> Polyline {
    Polyline::new(simplify_points(polyline.points(), tolerance))
}

/// Simplify a closed ring.
///
/// The ring is treated as the open chain `p0 .. pn-1, p0`, so the vertex
/// just before `p0` can be removed like any other. Only `p0` is
/// guaranteed to survive.
#[must_use = "returns the simplified polygon"]
pub fn simplify_polygon(polygon: &Polygon, tolerance: f64) -> Polygon {
    let points = polygon.points();
    if points.len() < 3 {
        return polygon.clone();
    }

    let mut chain = Vec::with_capacity(points.len() + 1);
    chain.extend_from_slice(points);
    chain.push(points[0]);

    let mut simplified = simplify_points(&chain, tolerance);
    simplified.pop();
    Polygon::new(simplified)
}

fn simplify_points(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[points.len() - 1] = true;

    let tolerance_sq = tolerance * tolerance;
    rdp_recurse(points, 0, points.len() - 1, tolerance_sq, &mut kept);

    points
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect()
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// segment between them. If its squared distance exceeds
/// `tolerance_sq`, the point is kept and both sub-ranges are processed
/// recursively.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance_sq: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = segment_distance_squared(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance_sq {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance_sq, kept);
        rdp_recurse(points, max_idx, end, tolerance_sq, kept);
    }
}

/// Squared distance from `p` to the segment `a`-`b`.
///
/// Projects `p` onto the segment and clamps the projection to its
/// endpoints. When `a` and `b` coincide, returns the squared distance
/// from `p` to `a`.
pub(crate) fn segment_distance_squared(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance_squared(a);
    }

    let t = ((p.x - a.x).mul_add(dx, (p.y - a.y) * dy) / length_sq).clamp(0.0, 1.0);
    let projection = Point::new(t.mul_add(dx, a.x), t.mul_add(dy, a.y));
    p.distance_squared(projection)
}
