//! Orientation predicates and the convexity test.
//!
//! Every turn decision in the crate (hull chain popping, reflex vertex
//! detection, cut validation, convexity) goes through [`cross`], so the
//! components agree on what "left", "right" and "collinear" mean even
//! for points with floating-point noise.
//!
//! Sign convention: `cross(a, b, c) > 0` is a *left* turn in a y-up
//! frame. Sprite coordinates are y-down, so a left turn here appears
//! clockwise on screen. Nothing depends on the on-screen direction; only
//! on using one convention consistently.

use crate::types::Point;

/// Turn direction of the corner `a -> b -> c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// `c` lies left of the directed line `a -> b`.
    Left,
    /// `c` lies right of the directed line `a -> b`.
    Right,
    /// The three points are collinear.
    Collinear,
}

/// Cross product of `b - a` and `c - a` (twice the signed triangle area).
#[must_use]
pub fn cross(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x).mul_add(c.y - a.y, -((c.x - a.x) * (b.y - a.y)))
}

/// Classify the corner `a -> b -> c`.
#[must_use]
pub fn orientation(a: Point, b: Point, c: Point) -> Orientation {
    let area = cross(a, b, c);
    if area > 0.0 {
        Orientation::Left
    } else if area < 0.0 {
        Orientation::Right
    } else {
        Orientation::Collinear
    }
}

/// `c` strictly left of `a -> b`.
#[must_use]
pub fn is_left(a: Point, b: Point, c: Point) -> bool {
    cross(a, b, c) > 0.0
}

/// `c` left of or on `a -> b`.
#[must_use]
pub fn is_left_on(a: Point, b: Point, c: Point) -> bool {
    cross(a, b, c) >= 0.0
}

/// `c` strictly right of `a -> b`.
#[must_use]
pub fn is_right(a: Point, b: Point, c: Point) -> bool {
    cross(a, b, c) < 0.0
}

/// `c` right of or on `a -> b`.
#[must_use]
pub fn is_right_on(a: Point, b: Point, c: Point) -> bool {
    cross(a, b, c) <= 0.0
}

/// Whether the closed ring `points` is convex.
///
/// Rings with fewer than 3 points are trivially convex. Otherwise every
/// corner (cyclically) must turn the same way as the first non-collinear
/// corner; collinear corners do not affect the verdict. Either winding
/// direction is accepted.
#[must_use]
pub fn is_convex(points: &[Point]) -> bool {
    let n = points.len();
    if n < 3 {
        return true;
    }

    let mut expected: Option<Orientation> = None;
    for i in 0..n {
        let turn = orientation(points[i], points[(i + 1) % n], points[(i + 2) % n]);
        if turn == Orientation::Collinear {
            continue;
        }
        match expected {
            None => expected = Some(turn),
            Some(first) if first != turn => return false,
            Some(_) => {}
        }
    }
    true
}
