//! Decomposition optimization: re-simplify each convex piece and drop
//! degenerate results.
//!
//! Runs after decomposition with a tolerance well below the one used on
//! the raw contour (see [`PipelineConfig::optimize_tolerance`]), so thin
//! but real pieces survive while redundant near-collinear vertices left
//! by the cuts are removed.
//!
//! [`PipelineConfig::optimize_tolerance`]: crate::types::PipelineConfig::optimize_tolerance

use crate::convexity::is_convex;
use crate::simplify::simplify_polygon;
use crate::types::{ConvexPolygonSet, Polygon};

/// Re-simplify `polygons` at `tolerance` and discard degenerate pieces.
///
/// For each piece the simplified ring is kept only if it is still
/// convex; otherwise the piece is kept as it was. Afterwards any piece
/// with fewer than 3 points is removed, whatever the tolerance.
///
/// Output order follows input order.
#[must_use = "returns the optimized polygon set"]
pub fn optimize(polygons: &[Polygon], tolerance: f64) -> ConvexPolygonSet {
    let optimized: Vec<Polygon> = polygons
        .iter()
        .map(|polygon| {
            let simplified = simplify_polygon(polygon, tolerance);
            if is_convex(simplified.points()) {
                simplified
            } else {
                polygon.clone()
            }
        })
        .map(|polygon| polygon.without_closing_duplicate())
        .filter(|polygon| polygon.len() >= 3)
        .collect();

    let dropped = polygons.len() - optimized.len();
    if dropped > 0 {
        log::debug!("optimizer dropped {dropped} degenerate piece(s)");
    }

    ConvexPolygonSet::new(optimized)
}
