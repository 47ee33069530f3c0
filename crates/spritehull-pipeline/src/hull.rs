//! Convex hull of an unordered point set (Andrew's monotone chain).
//!
//! A coarser alternative to decomposition: one convex polygon enclosing
//! every solid pixel of the sprite.

use std::cmp::Ordering;

use crate::convexity::cross;
use crate::types::{Point, Polygon};

/// Compute the convex hull of `points`.
///
/// Fewer than 3 points are returned unchanged. Otherwise points are
/// sorted by `(y, x)` and a lower and an upper chain are built, each
/// popping its last point while the turn to the candidate is not
/// strictly left. Collinear and duplicate points are therefore dropped.
///
/// The result turns left at every vertex under the
/// [`cross`](crate::convexity::cross) convention.
#[must_use = "returns the hull polygon"]
pub fn convex_hull(points: &[Point]) -> Polygon {
    if points.len() < 3 {
        return Polygon::new(points.to_vec());
    }

    let mut sorted = points.to_vec();
    sorted.sort_by(compare_y_then_x);

    let lower = half_hull(sorted.iter());
    let upper = half_hull(sorted.iter().rev());

    // Each chain's last point is the other chain's first.
    let mut hull = Vec::with_capacity(lower.len() + upper.len());
    hull.extend_from_slice(&lower[..lower.len() - 1]);
    hull.extend_from_slice(&upper[..upper.len() - 1]);

    Polygon::new(hull).without_closing_duplicate()
}

fn half_hull<'a>(points: impl Iterator<Item = &'a Point>) -> Vec<Point> {
    let mut chain: Vec<Point> = Vec::new();
    for &p in points {
        while let [.., a, b] = chain[..] {
            if cross(a, b, p) > 0.0 {
                break;
            }
            chain.pop();
        }
        chain.push(p);
    }
    chain
}

fn compare_y_then_x(a: &Point, b: &Point) -> Ordering {
    a.y.total_cmp(&b.y).then_with(|| a.x.total_cmp(&b.x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convexity::is_convex;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn fewer_than_three_points_unchanged() {
        let two = pts(&[(5.0, 1.0), (0.0, 0.0)]);
        assert_eq!(convex_hull(&two).points(), two.as_slice());
        assert!(convex_hull(&[]).is_empty());
    }

    #[test]
    fn interior_and_edge_points_are_dropped() {
        let points = pts(&[
            (0.0, 0.0),
            (2.0, 0.0),
            (4.0, 0.0),
            (4.0, 4.0),
            (2.0, 2.0),
            (1.0, 3.0),
            (0.0, 4.0),
            (0.0, 2.0),
        ]);
        let hull = convex_hull(&points);
        assert_eq!(
            hull.points(),
            &pts(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)])[..]
        );
    }

    #[test]
    fn hull_turns_left_and_is_convex() {
        let points = pts(&[
            (3.0, 7.0),
            (9.0, 1.0),
            (0.0, 0.0),
            (5.0, 5.0),
            (8.0, 8.0),
            (1.0, 9.0),
            (4.0, 2.0),
        ]);
        let hull = convex_hull(&points);
        assert!(is_convex(hull.points()));
        assert!(hull.signed_area_doubled() > 0.0);
        for p in &points {
            // Every input point is on or inside the hull.
            let n = hull.len();
            for i in 0..n {
                let a = hull.points()[i];
                let b = hull.points()[(i + 1) % n];
                assert!(cross(a, b, *p) >= 0.0, "{p:?} outside edge {a:?}->{b:?}");
            }
        }
    }

    #[test]
    fn duplicate_points_collapse() {
        let points = pts(&[(1.0, 1.0), (1.0, 1.0), (1.0, 1.0)]);
        assert_eq!(convex_hull(&points).points(), &pts(&[(1.0, 1.0)])[..]);
    }

    #[test]
    fn collinear_points_reduce_to_segment() {
        let points = pts(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
        let hull = convex_hull(&points);
        assert_eq!(hull.points(), &pts(&[(0.0, 0.0), (3.0, 3.0)])[..]);
    }
}
