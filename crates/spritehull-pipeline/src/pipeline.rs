//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::process`] which runs the whole flow in one call,
//! [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use spritehull_pipeline::{AlphaMask, Pipeline, PipelineConfig, PipelineError};
//! # fn run(alpha: &[u8]) -> Result<(), PipelineError> {
//! let mask = AlphaMask::from_alpha(alpha, 16, 16)?;
//! let optimized = Pipeline::new(mask, PipelineConfig::default())
//!     .trace()?
//!     .simplify()
//!     .decompose()
//!     .optimize();
//!
//! println!("{} convex pieces", optimized.optimized().polygon_count());
//! let _result = optimized.into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next stage,
//! carrying forward what later stages and the final result need. The
//! only fallible step is [`Pending::trace`] (and [`Pending::hull`]),
//! which validates the configuration before touching the mask.
//!
//! The chain branches once per [`ShapeKind`](crate::types::ShapeKind):
//!
//! - `Decomposed`: trace → simplify → decompose → optimize
//! - `Silhouette`: trace → simplify, finished with
//!   [`Simplified::into_result`]
//! - `Hull`: [`Pending::hull`], finished with [`Hulled::into_result`]

use crate::contour::{Trace, step_cap};
use crate::decompose::{Decomposition, DecompositionStats};
use crate::diagnostics::StageMetrics;
use crate::mask::AlphaMask;
use crate::types::{
    ConvexPolygonSet, Dimensions, PipelineConfig, PipelineError, Polygon, ProcessResult, Shape,
    TraceConfidence,
};

/// Entry point of the stage chain. See the [module docs](self).
pub type Pipeline<'a> = Pending<'a>;

/// Trait implemented by every stage that has done work, giving uniform
/// access to its name, position and metrics.
pub trait PipelineStage {
    /// Human-readable stage name (e.g. `"trace"`).
    const NAME: &str;

    /// Zero-based position in the decomposition chain.
    const INDEX: usize;

    /// Metrics describing the work done to reach this stage.
    fn metrics(&self) -> StageMetrics;
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// Call [`trace`](Self::trace) (or [`hull`](Self::hull)) to advance.
#[must_use = "pipeline stages are consumed by advancing; call .trace() to continue"]
#[derive(Debug, Clone)]
pub struct Pending<'a> {
    mask: AlphaMask<'a>,
    config: PipelineConfig,
}

impl<'a> Pending<'a> {
    /// Start a pipeline over `mask`.
    pub const fn new(mask: AlphaMask<'a>, config: PipelineConfig) -> Self {
        Self { mask, config }
    }

    /// The mask being processed.
    #[must_use]
    pub const fn mask(&self) -> &AlphaMask<'a> {
        &self.mask
    }

    /// The configuration this run uses.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Walk the silhouette boundary and advance to [`Traced`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the configuration
    /// violates its parameter contracts.
    pub fn trace(self) -> Result<Traced, PipelineError> {
        self.config.validate()?;
        let step_cap = step_cap(self.mask.area(), self.config.trace_step_factor);
        let trace =
            crate::contour::trace_capped(&self.mask, self.config.alpha_threshold, step_cap);
        log::debug!(
            "traced {} boundary points in {} steps ({:?})",
            trace.contour.len(),
            trace.steps,
            trace.confidence
        );
        Ok(Traced {
            config: self.config,
            dimensions: self.mask.dimensions(),
            trace,
            step_cap,
        })
    }

    /// Build the simplified convex hull of every solid pixel and advance
    /// to [`Hulled`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the configuration
    /// violates its parameter contracts.
    pub fn hull(self) -> Result<Hulled, PipelineError> {
        self.config.validate()?;
        let solid: Vec<_> = self.mask.solid_pixels(self.config.alpha_threshold).collect();
        let hull = crate::hull::convex_hull(&solid);
        let tolerance = self.config.effective_tolerance();
        let simplified = crate::simplify::simplify_polygon(&hull, tolerance);
        log::debug!(
            "hull of {} solid pixels: {} -> {} points",
            solid.len(),
            hull.len(),
            simplified.len()
        );
        Ok(Hulled {
            dimensions: self.mask.dimensions(),
            solid_pixels: solid.len(),
            hull_points: hull.len(),
            tolerance,
            hull: simplified,
        })
    }
}

// ───────────────────────── Stage 1: Traced ───────────────────────────

/// Pipeline state after contour tracing.
///
/// Call [`simplify`](Self::simplify) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .simplify() to continue"]
#[derive(Debug, Clone)]
pub struct Traced {
    config: PipelineConfig,
    dimensions: Dimensions,
    trace: Trace,
    step_cap: usize,
}

impl Traced {
    /// The raw boundary contour, in walk order.
    #[must_use]
    pub const fn contour(&self) -> &Polygon {
        &self.trace.contour
    }

    /// Whether the walk closed before its step cap.
    #[must_use]
    pub const fn confidence(&self) -> TraceConfidence {
        self.trace.confidence
    }

    /// Advance to the simplification stage (phase 1).
    pub fn simplify(self) -> Simplified {
        let tolerance = self.config.effective_tolerance();
        let outline = crate::simplify::simplify_polygon(&self.trace.contour, tolerance);
        Simplified {
            config: self.config,
            dimensions: self.dimensions,
            confidence: self.trace.confidence,
            contour_points: self.trace.contour.len(),
            tolerance,
            outline,
        }
    }
}

impl PipelineStage for Traced {
    const NAME: &str = "trace";
    const INDEX: usize = 1;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Trace {
            width: self.dimensions.width,
            height: self.dimensions.height,
            contour_points: self.trace.contour.len(),
            steps: self.trace.steps,
            step_cap: self.step_cap,
            confidence: self.trace.confidence,
        }
    }
}

// ───────────────────────── Stage 2: Simplified ───────────────────────

/// Pipeline state after simplifying the contour.
///
/// Call [`decompose`](Self::decompose) to continue towards convex
/// pieces, or [`into_result`](Self::into_result) to finish with the
/// outline as a [`Shape::Silhouette`].
#[must_use = "pipeline stages are consumed by advancing; call .decompose() to continue"]
#[derive(Debug, Clone)]
pub struct Simplified {
    config: PipelineConfig,
    dimensions: Dimensions,
    confidence: TraceConfidence,
    contour_points: usize,
    tolerance: f64,
    outline: Polygon,
}

impl Simplified {
    /// The simplified outline.
    #[must_use]
    pub const fn outline(&self) -> &Polygon {
        &self.outline
    }

    /// Advance to the decomposition stage (phase 2).
    pub fn decompose(self) -> Decomposed {
        let decomposition =
            crate::decompose::decompose(&self.outline, self.config.max_decomposition_depth);
        log::debug!(
            "decomposed {} points into {} pieces ({:?})",
            self.outline.len(),
            decomposition.polygons.len(),
            decomposition.stats
        );
        Decomposed {
            config: self.config,
            dimensions: self.dimensions,
            confidence: self.confidence,
            input_points: self.outline.len(),
            decomposition,
        }
    }

    /// Finish with the outline as a whole-silhouette shape.
    #[must_use]
    pub fn into_result(self) -> ProcessResult {
        ProcessResult {
            shape: Shape::Silhouette(self.outline),
            confidence: self.confidence,
            dimensions: self.dimensions,
        }
    }
}

impl PipelineStage for Simplified {
    const NAME: &str = "simplify";
    const INDEX: usize = 2;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::simplify(self.tolerance, self.contour_points, self.outline.len())
    }
}

// ───────────────────────── Stage 3: Decomposed ───────────────────────

/// Pipeline state after convex decomposition.
///
/// Call [`optimize`](Self::optimize) to advance to the final stage.
#[must_use = "pipeline stages are consumed by advancing; call .optimize() to continue"]
#[derive(Debug, Clone)]
pub struct Decomposed {
    config: PipelineConfig,
    dimensions: Dimensions,
    confidence: TraceConfidence,
    input_points: usize,
    decomposition: Decomposition,
}

impl Decomposed {
    /// The raw decomposition pieces.
    #[must_use]
    pub fn pieces(&self) -> &[Polygon] {
        &self.decomposition.polygons
    }

    /// Counters from the decomposition run.
    #[must_use]
    pub const fn stats(&self) -> DecompositionStats {
        self.decomposition.stats
    }

    /// Advance to the optimization stage (phase 3).
    pub fn optimize(self) -> Optimized {
        let tolerance = self.config.optimize_tolerance();
        let optimized = crate::optimize::optimize(&self.decomposition.polygons, tolerance);
        Optimized {
            dimensions: self.dimensions,
            confidence: self.confidence,
            tolerance,
            pieces_before: self.decomposition.polygons.len(),
            points_before: self.decomposition.polygons.iter().map(Polygon::len).sum(),
            optimized,
        }
    }
}

impl PipelineStage for Decomposed {
    const NAME: &str = "decompose";
    const INDEX: usize = 3;

    fn metrics(&self) -> StageMetrics {
        let stats = self.decomposition.stats;
        StageMetrics::Decompose {
            input_points: self.input_points,
            pieces: self.decomposition.polygons.len(),
            splits: stats.splits,
            steiner_points: stats.steiner_points,
            max_depth: stats.max_depth,
            unresolved: stats.unresolved,
        }
    }
}

// ───────────────────────── Stage 4: Optimized ────────────────────────

/// Pipeline state after optimization: the final stage of the
/// decomposition chain.
///
/// Call [`into_result`](Self::into_result) to extract the
/// [`ProcessResult`].
#[must_use = "call .into_result() to extract the ProcessResult"]
#[derive(Debug, Clone)]
pub struct Optimized {
    dimensions: Dimensions,
    confidence: TraceConfidence,
    tolerance: f64,
    pieces_before: usize,
    points_before: usize,
    optimized: ConvexPolygonSet,
}

impl Optimized {
    /// The final convex pieces.
    #[must_use]
    pub const fn optimized(&self) -> &ConvexPolygonSet {
        &self.optimized
    }

    /// Consume the pipeline and return the decomposed shape.
    #[must_use]
    pub fn into_result(self) -> ProcessResult {
        ProcessResult {
            shape: Shape::Decomposed(self.optimized),
            confidence: self.confidence,
            dimensions: self.dimensions,
        }
    }
}

impl PipelineStage for Optimized {
    const NAME: &str = "optimize";
    const INDEX: usize = 4;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Optimize {
            tolerance: self.tolerance,
            pieces_before: self.pieces_before,
            pieces_after: self.optimized.polygon_count(),
            points_before: self.points_before,
            points_after: self.optimized.total_points(),
        }
    }
}

// ───────────────────────── Hull branch ───────────────────────────────

/// Pipeline state after building the convex hull outline.
#[must_use = "call .into_result() to extract the ProcessResult"]
#[derive(Debug, Clone)]
pub struct Hulled {
    dimensions: Dimensions,
    solid_pixels: usize,
    hull_points: usize,
    tolerance: f64,
    hull: Polygon,
}

impl Hulled {
    /// The simplified hull outline.
    #[must_use]
    pub const fn hull(&self) -> &Polygon {
        &self.hull
    }

    /// Consume the pipeline and return the hull shape.
    #[must_use]
    pub fn into_result(self) -> ProcessResult {
        ProcessResult {
            shape: Shape::Hull(self.hull),
            confidence: TraceConfidence::Stable,
            dimensions: self.dimensions,
        }
    }
}

impl PipelineStage for Hulled {
    const NAME: &str = "hull";
    const INDEX: usize = 1;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Hull {
            solid_pixels: self.solid_pixels,
            hull_points: self.hull_points,
            simplified_points: self.hull.len(),
            tolerance: self.tolerance,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::convexity::is_convex;
    use crate::types::{AccuracyTier, ShapeKind};

    /// A 24×24 mask holding an L-shaped sprite.
    fn l_sprite() -> Vec<u8> {
        let mut data = vec![0u8; 24 * 24];
        for y in 2..22 {
            for x in 2..22 {
                if x < 10 || y >= 14 {
                    data[y * 24 + x] = 255;
                }
            }
        }
        data
    }

    #[test]
    fn decomposition_chain_yields_convex_pieces() {
        let data = l_sprite();
        let mask = AlphaMask::from_alpha(&data, 24, 24).unwrap();
        let traced = Pipeline::new(mask, PipelineConfig::default())
            .trace()
            .unwrap();
        assert_eq!(traced.confidence(), TraceConfidence::Stable);
        assert!(traced.contour().len() > 10);

        let simplified = traced.simplify();
        assert!(simplified.outline().len() < 20);

        let decomposed = simplified.decompose();
        assert!(decomposed.pieces().len() >= 2);
        assert_eq!(decomposed.stats().unresolved, 0);

        let optimized = decomposed.optimize();
        let set = optimized.optimized();
        assert!(set.polygon_count() >= 2);
        for piece in set.polygons() {
            assert!(piece.len() >= 3);
            assert!(is_convex(piece.points()));
        }

        let result = optimized.into_result();
        assert_eq!(result.shape.kind(), ShapeKind::Decomposed);
        assert_eq!(result.dimensions, Dimensions { width: 24, height: 24 });
    }

    #[test]
    fn invalid_config_fails_before_tracing() {
        let data = l_sprite();
        let mask = AlphaMask::from_alpha(&data, 24, 24).unwrap();
        let config = PipelineConfig {
            tolerance: Some(-1.0),
            ..PipelineConfig::default()
        };
        let err = Pipeline::new(mask, config.clone()).trace().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
        let err = Pipeline::new(mask, config).hull().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn silhouette_finishes_after_simplify() {
        let data = l_sprite();
        let mask = AlphaMask::from_alpha(&data, 24, 24).unwrap();
        let result = Pipeline::new(mask, PipelineConfig::default())
            .trace()
            .unwrap()
            .simplify()
            .into_result();
        assert_eq!(result.shape.kind(), ShapeKind::Silhouette);
        // The L outline keeps its reflex corner.
        let outline = result.shape.polygons();
        assert_eq!(outline.len(), 1);
        assert!(!is_convex(outline[0].points()));
    }

    #[test]
    fn hull_covers_the_sprite() {
        let data = l_sprite();
        let mask = AlphaMask::from_alpha(&data, 24, 24).unwrap();
        let hulled = Pipeline::new(mask, PipelineConfig::default())
            .hull()
            .unwrap();
        assert!(is_convex(hulled.hull().points()));
        assert!(matches!(
            hulled.metrics(),
            StageMetrics::Hull { solid_pixels, .. } if solid_pixels == 8 * 12 + 20 * 8
        ));
        let result = hulled.into_result();
        assert_eq!(result.shape.kind(), ShapeKind::Hull);
        assert_eq!(result.shape.polygons().len(), 1);
    }

    #[test]
    fn transparent_mask_yields_empty_shapes() {
        let data = vec![0u8; 100];
        let mask = AlphaMask::from_alpha(&data, 10, 10).unwrap();
        let result = Pipeline::new(mask, PipelineConfig::default())
            .trace()
            .unwrap()
            .simplify()
            .decompose()
            .optimize()
            .into_result();
        assert!(result.shape.is_empty());
        assert_eq!(result.confidence, TraceConfidence::Stable);

        let hull = Pipeline::new(mask, PipelineConfig::default())
            .hull()
            .unwrap()
            .into_result();
        assert!(hull.shape.is_empty());
    }

    #[test]
    fn stage_metrics_track_point_counts() {
        let data = l_sprite();
        let mask = AlphaMask::from_alpha(&data, 24, 24).unwrap();
        let config = PipelineConfig {
            tier: AccuracyTier::High,
            ..PipelineConfig::default()
        };
        let traced = Pipeline::new(mask, config).trace().unwrap();
        let contour_len = traced.contour().len();
        assert!(matches!(
            traced.metrics(),
            StageMetrics::Trace { contour_points, steps, step_cap, .. }
                if contour_points == contour_len && steps <= step_cap
        ));

        let simplified = traced.simplify();
        let outline_len = simplified.outline().len();
        assert!(matches!(
            simplified.metrics(),
            StageMetrics::Simplify { points_before, points_after, .. }
                if points_before == contour_len && points_after == outline_len
        ));

        let optimized = simplified.decompose().optimize();
        let piece_count = optimized.optimized().polygon_count();
        assert!(matches!(
            optimized.metrics(),
            StageMetrics::Optimize { pieces_after, .. } if pieces_after == piece_count
        ));
    }
}
