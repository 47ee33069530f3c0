//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! These diagnostics are permanent instrumentation intended for
//! tolerance tuning and for spotting sprites that decompose badly.
//! [`process_with_diagnostics`] runs the same flow as
//! [`process`](crate::process) while recording every stage.
//!
//! The crate stays free of platform clocks: timing goes through the
//! [`Clock`] trait, implemented by the caller (the bench CLI uses
//! `std::time::Instant`).
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::mask::AlphaMask;
use crate::pipeline::{Pipeline, PipelineStage};
use crate::types::{
    AccuracyTier, PipelineConfig, PipelineError, ProcessResult, ShapeKind, TraceConfidence,
};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// Current timestamp.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stages in execution order. Which stages appear depends on the
    /// configured [`ShapeKind`].
    pub stages: Vec<StageDiagnostics>,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary of the run's output.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Stage name (`"trace"`, `"simplify"`, ...).
    pub name: String,
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics (counts, sizes, etc.).
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Contour tracing metrics.
    Trace {
        /// Mask width in pixels.
        width: u32,
        /// Mask height in pixels.
        height: u32,
        /// Boundary points in the traced contour.
        contour_points: usize,
        /// Moves taken by the walk.
        steps: usize,
        /// Step cap the walk ran under.
        step_cap: usize,
        /// Whether the walk closed.
        confidence: TraceConfidence,
    },
    /// Convex hull metrics.
    Hull {
        /// Solid pixels fed to the hull builder.
        solid_pixels: usize,
        /// Hull vertices before simplification.
        hull_points: usize,
        /// Hull vertices after simplification.
        simplified_points: usize,
        /// Simplification tolerance in pixels.
        tolerance: f64,
    },
    /// Contour simplification metrics.
    Simplify {
        /// RDP tolerance in pixels.
        tolerance: f64,
        /// Points before simplification.
        points_before: usize,
        /// Points after simplification.
        points_after: usize,
        /// Reduction ratio: `1.0 - (after / before)`.
        reduction_ratio: f64,
    },
    /// Convex decomposition metrics.
    Decompose {
        /// Vertices of the decomposed outline.
        input_points: usize,
        /// Pieces produced.
        pieces: usize,
        /// Cuts performed.
        splits: usize,
        /// Steiner points introduced.
        steiner_points: usize,
        /// Deepest recursion level reached.
        max_depth: usize,
        /// Pieces emitted non-convex at the depth cap.
        unresolved: usize,
    },
    /// Piece optimization metrics.
    Optimize {
        /// Reduced RDP tolerance in pixels.
        tolerance: f64,
        /// Pieces before optimization.
        pieces_before: usize,
        /// Pieces after dropping degenerates.
        pieces_after: usize,
        /// Total points before optimization.
        points_before: usize,
        /// Total points after optimization.
        points_after: usize,
    },
}

impl StageMetrics {
    /// Simplification metrics with the reduction ratio filled in.
    #[must_use]
    pub fn simplify(tolerance: f64, points_before: usize, points_after: usize) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let reduction_ratio = if points_before > 0 {
            1.0 - points_after as f64 / points_before as f64
        } else {
            0.0
        };
        Self::Simplify {
            tolerance,
            points_before,
            points_after,
            reduction_ratio,
        }
    }
}

/// High-level summary of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Sprite width in pixels.
    pub sprite_width: u32,
    /// Sprite height in pixels.
    pub sprite_height: u32,
    /// Shape kind produced.
    pub shape: ShapeKind,
    /// Accuracy tier used.
    pub tier: AccuracyTier,
    /// Effective simplification tolerance in pixels.
    pub tolerance: f64,
    /// Polygons in the output shape.
    pub polygon_count: usize,
    /// Points across all output polygons.
    pub total_points: usize,
    /// Whether the contour walk closed.
    pub confidence: TraceConfidence,
}

/// Run the pipeline for the configured shape kind, timing every stage.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if the configuration
/// violates its parameter contracts.
pub fn process_with_diagnostics<C: Clock>(
    mask: AlphaMask<'_>,
    config: &PipelineConfig,
    clock: &C,
) -> Result<(ProcessResult, PipelineDiagnostics), PipelineError> {
    let run_start = clock.now();
    let mut stages = Vec::new();
    let pending = Pipeline::new(mask, config.clone());

    let result = match config.shape {
        ShapeKind::Hull => {
            let hulled = timed(clock, &mut stages, || pending.hull())?;
            hulled.into_result()
        }
        ShapeKind::Silhouette => {
            let traced = timed(clock, &mut stages, || pending.trace())?;
            let simplified = timed_infallible(clock, &mut stages, || traced.simplify());
            simplified.into_result()
        }
        ShapeKind::Decomposed => {
            let traced = timed(clock, &mut stages, || pending.trace())?;
            let simplified = timed_infallible(clock, &mut stages, || traced.simplify());
            let decomposed = timed_infallible(clock, &mut stages, || simplified.decompose());
            let optimized = timed_infallible(clock, &mut stages, || decomposed.optimize());
            optimized.into_result()
        }
    };

    let total_duration = clock.elapsed(&run_start);
    let polygons = result.shape.polygons();
    let summary = PipelineSummary {
        sprite_width: result.dimensions.width,
        sprite_height: result.dimensions.height,
        shape: config.shape,
        tier: config.tier,
        tolerance: config.effective_tolerance(),
        polygon_count: polygons.len(),
        total_points: polygons.iter().map(|p| p.len()).sum(),
        confidence: result.confidence,
    };

    Ok((
        result,
        PipelineDiagnostics {
            stages,
            total_duration,
            summary,
        },
    ))
}

/// Run a fallible stage transition and record its diagnostics.
fn timed<C, S, F>(
    clock: &C,
    stages: &mut Vec<StageDiagnostics>,
    advance: F,
) -> Result<S, PipelineError>
where
    C: Clock,
    S: PipelineStage,
    F: FnOnce() -> Result<S, PipelineError>,
{
    let start = clock.now();
    let stage = advance()?;
    stages.push(StageDiagnostics {
        name: S::NAME.to_string(),
        duration: clock.elapsed(&start),
        metrics: stage.metrics(),
    });
    Ok(stage)
}

fn timed_infallible<C, S, F>(clock: &C, stages: &mut Vec<StageDiagnostics>, advance: F) -> S
where
    C: Clock,
    S: PipelineStage,
    F: FnOnce() -> S,
{
    let start = clock.now();
    let stage = advance();
    stages.push(StageDiagnostics {
        name: S::NAME.to_string(),
        duration: clock.elapsed(&start),
        metrics: stage.metrics(),
    });
    stage
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Sprite: {}x{}  shape={:?}  tier={}  tolerance={:.2}",
            self.summary.sprite_width,
            self.summary.sprite_height,
            self.summary.shape,
            self.summary.tier.name(),
            self.summary.tolerance,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for stage in &self.stages {
            let ms = duration_ms(stage.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&stage.metrics);
            lines.push(format!("{:<24} {ms:>8.3}ms {pct:>9.1}%  {details}", stage.name));
        }

        lines.push(String::new());
        lines.push(format!(
            "Polygons: {}  |  Total points: {}  |  Trace: {:?}",
            self.summary.polygon_count, self.summary.total_points, self.summary.confidence,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Trace {
            width,
            height,
            contour_points,
            steps,
            step_cap,
            confidence,
        } => {
            format!("{width}x{height} {contour_points} pts, {steps}/{step_cap} steps ({confidence:?})")
        }
        StageMetrics::Hull {
            solid_pixels,
            hull_points,
            simplified_points,
            tolerance,
        } => {
            format!("{solid_pixels} px -> {hull_points} pts -> {simplified_points} pts (tol={tolerance:.2})")
        }
        StageMetrics::Simplify {
            tolerance,
            points_before,
            points_after,
            reduction_ratio,
        } => {
            format!(
                "tol={tolerance:.2} {points_before}->{points_after} pts ({:.1}% reduction)",
                reduction_ratio * 100.0,
            )
        }
        StageMetrics::Decompose {
            input_points,
            pieces,
            splits,
            steiner_points,
            max_depth,
            unresolved,
        } => {
            format!(
                "{input_points} pts -> {pieces} pieces ({splits} splits, {steiner_points} steiner, depth {max_depth}, {unresolved} unresolved)",
            )
        }
        StageMetrics::Optimize {
            tolerance,
            pieces_before,
            pieces_after,
            points_before,
            points_after,
        } => {
            format!(
                "tol={tolerance:.2} pieces={pieces_before}->{pieces_after} pts={points_before}->{points_after}",
            )
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;

    /// Clock that advances one millisecond per reading.
    struct TickClock {
        ticks: Cell<u64>,
    }

    impl TickClock {
        const fn new() -> Self {
            Self {
                ticks: Cell::new(0),
            }
        }
    }

    impl Clock for TickClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.ticks.get();
            self.ticks.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.now() - since)
        }
    }

    fn plus_sprite() -> Vec<u8> {
        let mut data = vec![0u8; 20 * 20];
        for y in 2..18 {
            for x in 2..18 {
                if (7..13).contains(&x) || (7..13).contains(&y) {
                    data[y * 20 + x] = 255;
                }
            }
        }
        data
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        let ms = duration_ms(d);
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn simplify_metrics_reduction_ratio() {
        let metrics = StageMetrics::simplify(2.0, 200, 50);
        assert!(matches!(
            metrics,
            StageMetrics::Simplify { reduction_ratio, .. } if (reduction_ratio - 0.75).abs() < 1e-12
        ));
        let empty = StageMetrics::simplify(2.0, 0, 0);
        assert!(matches!(
            empty,
            StageMetrics::Simplify { reduction_ratio, .. } if reduction_ratio == 0.0
        ));
    }

    #[test]
    fn decomposed_run_records_four_stages() {
        let data = plus_sprite();
        let mask = AlphaMask::from_alpha(&data, 20, 20).unwrap();
        let (result, diagnostics) =
            process_with_diagnostics(mask, &PipelineConfig::default(), &TickClock::new()).unwrap();

        let names: Vec<&str> = diagnostics.stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["trace", "simplify", "decompose", "optimize"]);
        assert!(diagnostics.stages.iter().all(|s| s.duration.as_millis() == 1));
        assert!(diagnostics.total_duration >= Duration::from_millis(4));
        assert_eq!(
            diagnostics.summary.polygon_count,
            result.shape.polygons().len()
        );
        assert!(diagnostics.summary.polygon_count >= 2);
    }

    #[test]
    fn hull_and_silhouette_runs_record_their_stages() {
        let data = plus_sprite();
        let mask = AlphaMask::from_alpha(&data, 20, 20).unwrap();

        let hull = PipelineConfig {
            shape: ShapeKind::Hull,
            ..PipelineConfig::default()
        };
        let (_, diagnostics) = process_with_diagnostics(mask, &hull, &TickClock::new()).unwrap();
        assert_eq!(diagnostics.stages.len(), 1);
        assert_eq!(diagnostics.stages[0].name, "hull");

        let silhouette = PipelineConfig {
            shape: ShapeKind::Silhouette,
            ..PipelineConfig::default()
        };
        let (_, diagnostics) =
            process_with_diagnostics(mask, &silhouette, &TickClock::new()).unwrap();
        let names: Vec<&str> = diagnostics.stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["trace", "simplify"]);
        assert_eq!(diagnostics.summary.polygon_count, 1);
    }

    #[test]
    fn invalid_config_is_reported() {
        let data = plus_sprite();
        let mask = AlphaMask::from_alpha(&data, 20, 20).unwrap();
        let config = PipelineConfig {
            max_decomposition_depth: 0,
            ..PipelineConfig::default()
        };
        let err = process_with_diagnostics(mask, &config, &TickClock::new()).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn report_lists_every_stage() {
        let data = plus_sprite();
        let mask = AlphaMask::from_alpha(&data, 20, 20).unwrap();
        let (_, diagnostics) =
            process_with_diagnostics(mask, &PipelineConfig::default(), &TickClock::new()).unwrap();

        let report = diagnostics.report();
        assert!(report.contains("Pipeline Diagnostics Report"));
        for name in ["trace", "simplify", "decompose", "optimize"] {
            assert!(report.contains(name), "missing {name} in report");
        }
        assert!(report.contains("tier=mid"));
    }

    #[test]
    fn diagnostics_serialize_durations_as_seconds() {
        let data = plus_sprite();
        let mask = AlphaMask::from_alpha(&data, 20, 20).unwrap();
        let (_, diagnostics) =
            process_with_diagnostics(mask, &PipelineConfig::default(), &TickClock::new()).unwrap();

        let json = serde_json::to_value(&diagnostics).unwrap();
        assert!((json["stages"][0]["duration"].as_f64().unwrap() - 0.001).abs() < 1e-12);
        let back: PipelineDiagnostics = serde_json::from_value(json).unwrap();
        assert_eq!(back.stages.len(), diagnostics.stages.len());
        assert_eq!(back.stages[2].metrics, diagnostics.stages[2].metrics);
    }
}
