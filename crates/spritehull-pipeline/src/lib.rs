//! spritehull-pipeline: Pure sprite-to-collision-geometry pipeline (sans-IO).
//!
//! Converts a sprite's alpha mask into collision shapes through:
//! contour tracing -> simplification -> convex decomposition ->
//! optimization, at one of several accuracy tiers.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! pixel buffers and returns structured data. Reading sprite sheets and
//! writing hitbox files lives in the bench CLI and the export crate.

pub mod batch;
pub mod contour;
pub mod convexity;
pub mod decompose;
pub mod diagnostics;
pub mod hull;
pub mod mask;
pub mod optimize;
pub mod pipeline;
pub mod raster;
pub mod simplify;
pub mod types;

pub use batch::{SpriteResult, process_sheet};
pub use decompose::DecompositionStats;
pub use mask::{AlphaMask, SpriteSheet};
pub use pipeline::Pipeline;
pub use types::{
    AccuracyTier, ConvexPolygonSet, Dimensions, PipelineConfig, PipelineError, Point, Polygon,
    Polyline, ProcessResult, Shape, ShapeKind, TraceConfidence,
};

/// Run the pipeline on one sprite for the configured shape kind.
///
/// # Steps
///
/// 1. Validate the configuration
/// 2. Trace the silhouette boundary (Moore neighbourhood)
/// 3. Simplify the contour (Ramer-Douglas-Peucker)
/// 4. Decompose into convex pieces (Bayazit)
/// 5. Re-simplify pieces and drop degenerates
///
/// [`ShapeKind::Silhouette`] stops after step 3.
/// [`ShapeKind::Hull`] replaces steps 2-5 with a simplified convex hull
/// of every solid pixel.
///
/// A mask with no solid pixel yields an empty shape, not an error.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if the configuration
/// violates its parameter contracts.
pub fn process(
    mask: AlphaMask<'_>,
    config: &PipelineConfig,
) -> Result<ProcessResult, PipelineError> {
    let pending = Pipeline::new(mask, config.clone());
    let result = match config.shape {
        ShapeKind::Hull => pending.hull()?.into_result(),
        ShapeKind::Silhouette => pending.trace()?.simplify().into_result(),
        ShapeKind::Decomposed => pending
            .trace()?
            .simplify()
            .decompose()
            .optimize()
            .into_result(),
    };
    Ok(result)
}
