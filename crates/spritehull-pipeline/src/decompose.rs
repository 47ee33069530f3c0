//! Convex decomposition of a simple polygon (Bayazit's algorithm).
//!
//! Splits a possibly concave polygon into few convex pieces by cutting at
//! reflex vertices. For each cut, the two rays that extend the edges
//! meeting at the reflex vertex are intersected with the rest of the
//! polygon:
//!
//! - if both rays land on the same edge, a Steiner point is placed at the
//!   midpoint of the two hits and the polygon is cut through it;
//! - otherwise the cut goes to the closest vertex between the two hits
//!   that the reflex vertex can see.
//!
//! Pieces are rings of indices into one shared vertex arena. The arena
//! holds the input vertices followed by any Steiner points, so splitting
//! never copies coordinates and pieces never alias mutable state.
//!
//! Recursion is driven by an explicit work stack with a depth cap. A
//! piece that is still concave at the cap is emitted unresolved rather
//! than split further.

use serde::{Deserialize, Serialize};

use crate::convexity::{is_convex, is_left, is_left_on, is_right, is_right_on};
use crate::types::{Point, Polygon};

/// Counters describing one decomposition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecompositionStats {
    /// Number of cuts performed.
    pub splits: usize,
    /// Number of Steiner points introduced.
    pub steiner_points: usize,
    /// Deepest recursion level reached (the input is level 0).
    pub max_depth: usize,
    /// Pieces emitted while still concave, because they hit the depth
    /// cap or no valid cut was found.
    pub unresolved: usize,
}

/// Output of [`decompose`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Decomposition {
    /// Pieces in output order (smaller half of every cut first).
    pub polygons: Vec<Polygon>,
    /// Run counters.
    pub stats: DecompositionStats,
}

/// Split `polygon` into convex pieces.
///
/// The input may repeat its first vertex at the end and may wind either
/// way; it is normalized to a positive signed area first, so every piece
/// turns left under the [`cross`](crate::convexity::cross) convention.
/// Inputs with fewer than 3 distinct vertices produce no pieces.
///
/// Pieces still concave at `max_depth` levels of recursion are emitted
/// as-is and counted in [`DecompositionStats::unresolved`].
#[must_use = "returns the convex pieces"]
pub fn decompose(polygon: &Polygon, max_depth: usize) -> Decomposition {
    let mut normalized = polygon.without_closing_duplicate();
    if normalized.len() < 3 {
        return Decomposition::default();
    }
    if normalized.signed_area_doubled() < 0.0 {
        normalized = normalized.reversed();
    }

    let mut arena = normalized.into_points();
    let mut stats = DecompositionStats::default();
    let mut pieces: Vec<Vec<usize>> = Vec::new();
    let mut work: Vec<(Vec<usize>, usize)> = vec![((0..arena.len()).collect(), 0)];

    while let Some((indices, depth)) = work.pop() {
        stats.max_depth = stats.max_depth.max(depth);
        let ring = Ring::new(&arena, &indices);

        if is_convex(&ring.points()) {
            pieces.push(indices);
            continue;
        }

        if depth >= max_depth {
            log::warn!(
                "decomposition depth cap ({max_depth}) reached; keeping concave piece with {} vertices",
                indices.len()
            );
            stats.unresolved += 1;
            pieces.push(indices);
            continue;
        }

        let Some(cut) = ring.find_cut() else {
            log::warn!(
                "no valid cut found for concave piece with {} vertices; keeping it",
                indices.len()
            );
            stats.unresolved += 1;
            pieces.push(indices);
            continue;
        };

        log::trace!("depth {depth}: {cut:?}");
        stats.splits += 1;
        if matches!(cut, Cut::Steiner { .. }) {
            stats.steiner_points += 1;
        }

        let (first, second) = split(&indices, cut, &mut arena);
        // Pushed last is popped first: solve the smaller half first.
        let (small, large) = if first.len() < second.len() {
            (first, second)
        } else {
            (second, first)
        };
        work.push((large, depth + 1));
        work.push((small, depth + 1));
    }

    let polygons = pieces
        .into_iter()
        .map(|indices| Polygon::new(indices.iter().map(|&i| arena[i]).collect()))
        .collect();

    Decomposition { polygons, stats }
}

/// A cut chosen for one reflex vertex. Positions are ring positions.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Cut {
    /// Diagonal between two existing vertices.
    Diagonal { from: usize, to: usize },
    /// Cut from a vertex to a new point on edge `(edge, edge + 1)`.
    Steiner {
        from: usize,
        edge: usize,
        point: Point,
    },
}

/// Closest intersection of a ray with a polygon edge.
#[derive(Debug, Clone, Copy)]
struct Hit {
    distance_sq: f64,
    point: Point,
    index: usize,
}

impl Hit {
    fn closer(current: Option<Self>, candidate: Self) -> Option<Self> {
        match current {
            Some(hit) if hit.distance_sq <= candidate.distance_sq => Some(hit),
            _ => Some(candidate),
        }
    }
}

/// Cyclic view of one piece: ring positions map to arena vertices.
struct Ring<'a> {
    arena: &'a [Point],
    indices: &'a [usize],
}

impl<'a> Ring<'a> {
    const fn new(arena: &'a [Point], indices: &'a [usize]) -> Self {
        Self { arena, indices }
    }

    const fn len(&self) -> usize {
        self.indices.len()
    }

    fn at(&self, position: usize) -> Point {
        self.arena[self.indices[position % self.len()]]
    }

    const fn prev(&self, position: usize) -> usize {
        (position + self.len() - 1) % self.len()
    }

    const fn next(&self, position: usize) -> usize {
        (position + 1) % self.len()
    }

    fn points(&self) -> Vec<Point> {
        self.indices.iter().map(|&i| self.arena[i]).collect()
    }

    fn is_reflex(&self, i: usize) -> bool {
        is_right(self.at(self.prev(i)), self.at(i), self.at(self.next(i)))
    }

    /// Find a cut for the first reflex vertex that admits one.
    fn find_cut(&self) -> Option<Cut> {
        (0..self.len())
            .filter(|&i| self.is_reflex(i))
            .find_map(|i| self.cut_at(i))
    }

    /// Choose the cut for reflex vertex `i`.
    fn cut_at(&self, i: usize) -> Option<Cut> {
        let (lower, upper) = self.ray_hits(i);

        match (lower, upper) {
            // Both rays land on edge (upper.index, lower.index).
            (Some(lo), Some(up)) if lo.index == self.next(up.index) => Some(Cut::Steiner {
                from: i,
                edge: up.index,
                point: lo.point.midpoint(up.point),
            }),
            (Some(lo), Some(up)) => Some(
                self.closest_visible(i, lo.index, up.index)
                    .map_or_else(|| self.steiner_on_lower(i, lo), |to| Cut::Diagonal { from: i, to }),
            ),
            (Some(lo), None) => Some(self.steiner_on_lower(i, lo)),
            (None, Some(up)) => Some(Cut::Steiner {
                from: i,
                edge: up.index,
                point: up.point,
            }),
            (None, None) => None,
        }
    }

    /// Extend the edge `(i-1, i)` past `i` and the edge `(i+1, i)` past
    /// `i`, returning the closest valid hit of each ray.
    ///
    /// A lower hit records the end vertex of the edge it crosses; an
    /// upper hit records the start vertex.
    fn ray_hits(&self, i: usize) -> (Option<Hit>, Option<Hit>) {
        let prev = self.at(self.prev(i));
        let cur = self.at(i);
        let next = self.at(self.next(i));

        let mut lower: Option<Hit> = None;
        let mut upper: Option<Hit> = None;

        for j in 0..self.len() {
            let pj = self.at(j);
            let pj_prev = self.at(self.prev(j));
            let pj_next = self.at(self.next(j));

            if is_left(prev, cur, pj) && is_right_on(prev, cur, pj_prev) {
                if let Some(p) = line_intersection(prev, cur, pj, pj_prev) {
                    if is_right(next, cur, p) {
                        let hit = Hit {
                            distance_sq: cur.distance_squared(p),
                            point: p,
                            index: j,
                        };
                        lower = Hit::closer(lower, hit);
                    }
                }
            }

            if is_left(next, cur, pj_next) && is_right_on(next, cur, pj) {
                if let Some(p) = line_intersection(next, cur, pj, pj_next) {
                    if is_left(prev, cur, p) {
                        let hit = Hit {
                            distance_sq: cur.distance_squared(p),
                            point: p,
                            index: j,
                        };
                        upper = Hit::closer(upper, hit);
                    }
                }
            }
        }

        (lower, upper)
    }

    /// The closest vertex from `lower` forward to `upper` that lies in
    /// the wedge at `i` and that `i` can see.
    fn closest_visible(&self, i: usize, lower: usize, upper: usize) -> Option<usize> {
        let n = self.len();
        let prev = self.at(self.prev(i));
        let cur = self.at(i);
        let next = self.at(self.next(i));

        let end = if lower > upper { upper + n } else { upper };
        let mut best: Option<(f64, usize)> = None;

        for j in (lower..=end).map(|j| j % n) {
            if j == i || j == self.prev(i) || j == self.next(i) {
                continue;
            }
            let pj = self.at(j);
            if !(is_left_on(prev, cur, pj) && is_right_on(next, cur, pj)) {
                continue;
            }
            let d = cur.distance_squared(pj);
            if best.is_none_or(|(best_d, _)| d < best_d) && self.can_see(i, j) {
                best = Some((d, j));
            }
        }

        best.map(|(_, j)| j)
    }

    /// Cut along the lower ray to its first hit, on edge
    /// `(lo.index - 1, lo.index)`.
    ///
    /// Used when no visible vertex lies between the two hits. The
    /// segment from `i` to the nearest exit of the ray is always
    /// interior, and the cut straightens the angle at `i`.
    const fn steiner_on_lower(&self, i: usize, lo: Hit) -> Cut {
        Cut::Steiner {
            from: i,
            edge: self.prev(lo.index),
            point: lo.point,
        }
    }

    /// Whether segment `a`-`b` crosses no edge other than those incident
    /// to `a` or `b`.
    fn can_see(&self, a: usize, b: usize) -> bool {
        let pa = self.at(a);
        let pb = self.at(b);
        (0..self.len()).all(|k| {
            let k_next = self.next(k);
            k == a
                || k == b
                || k_next == a
                || k_next == b
                || !segments_intersect(pa, pb, self.at(k), self.at(k_next))
        })
    }
}

/// Split `ring` along `cut`, appending a Steiner point to `arena` when
/// the cut needs one.
fn split(ring: &[usize], cut: Cut, arena: &mut Vec<Point>) -> (Vec<usize>, Vec<usize>) {
    match cut {
        Cut::Diagonal { from, to } => (cyclic_range(ring, from, to), cyclic_range(ring, to, from)),
        Cut::Steiner { from, edge, point } => {
            let steiner = arena.len();
            arena.push(point);

            let mut first = cyclic_range(ring, from, edge);
            first.push(steiner);

            let mut second = vec![steiner];
            second.extend(cyclic_range(ring, (edge + 1) % ring.len(), from));
            (first, second)
        }
    }
}

/// Ring entries from position `from` forward to `to`, inclusive.
fn cyclic_range(ring: &[usize], from: usize, to: usize) -> Vec<usize> {
    let n = ring.len();
    let count = (to + n - from) % n + 1;
    (0..count).map(|k| ring[(from + k) % n]).collect()
}

/// Intersection of the infinite lines through `p1`-`p2` and `q1`-`q2`.
///
/// Returns `None` for parallel lines.
fn line_intersection(p1: Point, p2: Point, q1: Point, q2: Point) -> Option<Point> {
    let a1 = p2.y - p1.y;
    let b1 = p1.x - p2.x;
    let c1 = a1.mul_add(p1.x, b1 * p1.y);
    let a2 = q2.y - q1.y;
    let b2 = q1.x - q2.x;
    let c2 = a2.mul_add(q1.x, b2 * q1.y);

    let det = a1.mul_add(b2, -(a2 * b1));
    if det == 0.0 {
        return None;
    }
    Some(Point::new(
        b2.mul_add(c1, -(b1 * c2)) / det,
        a1.mul_add(c2, -(a2 * c1)) / det,
    ))
}

/// Whether closed segments `p1`-`p2` and `q1`-`q2` intersect.
///
/// Parallel segments (including collinear overlaps) never count.
fn segments_intersect(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    let da = q2.x - q1.x;
    let db = q2.y - q1.y;

    let denom = da.mul_add(dy, -(db * dx));
    if denom == 0.0 {
        return false;
    }

    let s = dx.mul_add(q1.y - p1.y, dy * (p1.x - q1.x)) / denom;
    let t = da.mul_add(p1.y - q1.y, db * (q1.x - p1.x)) / -denom;
    (0.0..=1.0).contains(&s) && (0.0..=1.0).contains(&t)
}

/// Twice the total signed area of a set of pieces.
#[cfg(test)]
fn total_area_doubled(polygons: &[Polygon]) -> f64 {
    polygons.iter().map(Polygon::signed_area_doubled).sum()
}
