//! Contour tracing: walk the silhouette boundary of an alpha mask.
//!
//! Uses Moore-neighbourhood boundary following. The walk starts at the
//! first solid pixel in row-major order and keeps the background on one
//! side, producing one closed ring of boundary pixel coordinates. A
//! pixel where the boundary touches itself (such as a one-pixel neck
//! between two lobes) appears once per visit.
//!
//! Only the component containing the start pixel is traced; sprites are
//! assumed to be a single connected silhouette.

use crate::mask::AlphaMask;
use crate::types::{Point, Polygon, TraceConfidence};

/// Moore neighbourhood offsets, clockwise on screen starting at east.
///
/// Sprite coordinates are y-down, so index order runs E, SE, S, SW, W,
/// NW, N, NE.
const DIRECTIONS: [(i64, i64); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Direction index of the west neighbour: the backtrack of the start
/// pixel, which row-major scanning guarantees is background.
const WEST: usize = 4;

/// Output of a boundary walk.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    /// Boundary pixels in walk order. The start pixel is not repeated.
    pub contour: Polygon,
    /// [`TraceConfidence::Unstable`] if the step cap was hit before the
    /// walk closed.
    pub confidence: TraceConfidence,
    /// Number of moves taken.
    pub steps: usize,
}

/// Step cap for a mask of `area` pixels: `factor` moves per pixel plus
/// a small constant for tiny masks.
#[must_use]
pub const fn step_cap(area: usize, factor: usize) -> usize {
    area.saturating_mul(factor).saturating_add(8)
}

/// Trace the silhouette boundary of `mask`.
///
/// Pixels with `alpha >= threshold` are solid. Returns an empty contour
/// (with [`TraceConfidence::Stable`]) when no pixel is solid, and a
/// single point for an isolated pixel.
#[must_use = "returns the traced contour"]
pub fn trace(mask: &AlphaMask<'_>, threshold: u8, step_factor: usize) -> Trace {
    trace_capped(mask, threshold, step_cap(mask.area(), step_factor))
}

/// Trace with an explicit step cap.
///
/// When the cap is reached the partial contour walked so far is returned,
/// flagged [`TraceConfidence::Unstable`].
#[must_use = "returns the traced contour"]
pub fn trace_capped(mask: &AlphaMask<'_>, threshold: u8, max_steps: usize) -> Trace {
    let Some(start) = find_start(mask, threshold) else {
        return Trace {
            contour: Polygon::default(),
            confidence: TraceConfidence::Stable,
            steps: 0,
        };
    };

    let solid = |(x, y): (i64, i64)| mask.is_solid(x, y, threshold);

    let mut contour = vec![to_point(start)];
    let mut current = start;
    let mut backtrack = WEST;
    let mut first_move: Option<usize> = None;
    let mut steps = 0;

    loop {
        // Scan clockwise, starting one step past the backtrack neighbour.
        let found = (1..=8)
            .map(|k| (backtrack + k) % 8)
            .map(|dir| (dir, offset(current, dir)))
            .find(|&(_, pixel)| solid(pixel));

        let Some((dir, next)) = found else {
            // Isolated pixel: nothing to walk to.
            return Trace {
                contour: Polygon::new(contour),
                confidence: TraceConfidence::Stable,
                steps,
            };
        };

        // Jacob's criterion: closed once the start pixel is about to be
        // left in the same direction as the first move.
        if current == start && first_move == Some(dir) {
            contour.pop();
            return Trace {
                contour: Polygon::new(contour),
                confidence: TraceConfidence::Stable,
                steps,
            };
        }

        if steps >= max_steps {
            break;
        }

        first_move.get_or_insert(dir);
        steps += 1;
        contour.push(to_point(next));
        current = next;
        backtrack = backtrack_after(dir);
    }

    log::warn!(
        "contour walk hit its {max_steps}-step cap after {} points without closing",
        contour.len()
    );
    Trace {
        contour: Polygon::new(contour),
        confidence: TraceConfidence::Unstable,
        steps,
    }
}

/// First solid pixel in row-major order.
fn find_start(mask: &AlphaMask<'_>, threshold: u8) -> Option<(i64, i64)> {
    (0..i64::from(mask.height()))
        .flat_map(|y| (0..i64::from(mask.width())).map(move |x| (x, y)))
        .find(|&(x, y)| mask.is_solid(x, y, threshold))
}

/// Backtrack direction, relative to the pixel just entered by moving in
/// direction `dir`.
///
/// The backtrack is the background neighbour examined just before the
/// move. After an axis move it sits two steps counter-clockwise of the
/// reverse direction; after a diagonal move, three.
const fn backtrack_after(dir: usize) -> usize {
    (dir + 6 - dir % 2) % 8
}

const fn offset((x, y): (i64, i64), dir: usize) -> (i64, i64) {
    let (dx, dy) = DIRECTIONS[dir];
    (x + dx, y + dy)
}

#[allow(clippy::cast_precision_loss)]
fn to_point((x, y): (i64, i64)) -> Point {
    Point::new(x as f64, y as f64)
}
