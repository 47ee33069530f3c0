//! Batch processing across every sprite of a sheet and every requested
//! accuracy tier.
//!
//! Each (sprite, tier) pair is an independent task with its own
//! [`Result`]: a bad frame or an invalid configuration fails that task
//! only. With the `parallel` feature the tasks run on the rayon thread
//! pool; without it they run sequentially. Output order is the same
//! either way.

use serde::{Deserialize, Serialize};

use crate::mask::{AlphaMask, SpriteSheet};
use crate::types::{AccuracyTier, PipelineConfig, PipelineError, ProcessResult};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Outcome of one (sprite, tier) task.
#[derive(Debug, Serialize, Deserialize)]
pub struct SpriteResult {
    /// Row-major sprite index within the sheet.
    pub index: usize,
    /// Tier the task ran at.
    pub tier: AccuracyTier,
    /// The task's result.
    pub result: Result<ProcessResult, PipelineError>,
}

/// Process every frame of `sheet` within `raster` at every tier in
/// `tiers`.
///
/// Each task uses `config` with its `tier` replaced by the task's tier
/// and any explicit `tolerance` cleared, so tiers stay distinct. Results
/// are sorted by `(index, tier)`. Duplicate tiers are processed once.
#[must_use = "returns one result per sprite and tier"]
pub fn process_sheet(
    raster: &AlphaMask<'_>,
    sheet: &SpriteSheet,
    config: &PipelineConfig,
    tiers: &[AccuracyTier],
) -> Vec<SpriteResult> {
    let mut tiers = tiers.to_vec();
    tiers.sort_unstable();
    tiers.dedup();

    let tasks: Vec<(usize, AccuracyTier)> = (0..sheet.frame_count())
        .flat_map(|index| tiers.iter().map(move |&tier| (index, tier)))
        .collect();
    log::debug!(
        "processing {} sprites x {} tiers = {} tasks",
        sheet.frame_count(),
        tiers.len(),
        tasks.len()
    );

    let run = |&(index, tier): &(usize, AccuracyTier)| SpriteResult {
        index,
        tier,
        result: process_frame(raster, sheet, config, index, tier),
    };

    #[cfg(feature = "parallel")]
    let mut results: Vec<SpriteResult> = tasks.par_iter().map(run).collect();
    #[cfg(not(feature = "parallel"))]
    let mut results: Vec<SpriteResult> = tasks.iter().map(run).collect();

    results.sort_by_key(|r| (r.index, r.tier));

    let failed = results.iter().filter(|r| r.result.is_err()).count();
    if failed > 0 {
        log::warn!("{failed} of {} sprite tasks failed", results.len());
    }
    results
}

fn process_frame(
    raster: &AlphaMask<'_>,
    sheet: &SpriteSheet,
    config: &PipelineConfig,
    index: usize,
    tier: AccuracyTier,
) -> Result<ProcessResult, PipelineError> {
    let frame = raster.frame(sheet, index)?;
    let config = PipelineConfig {
        tier,
        tolerance: None,
        ..config.clone()
    };
    crate::process(frame, &config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::convexity::is_convex;
    use crate::types::{ShapeKind, TraceConfidence};

    /// A 3×2 sheet of 16×16 frames; frame `i` holds a square of side
    /// `8 + i`, and frame 5 is left empty.
    fn sheet_pixels() -> (Vec<u8>, u32, u32) {
        let (w, h) = (48u32, 32u32);
        let mut data = vec![0u8; (w * h) as usize];
        for index in 0..5u32 {
            let (ox, oy) = ((index % 3) * 16, (index / 3) * 16);
            let side = 8 + index;
            for y in 1..=side {
                for x in 1..=side {
                    data[((oy + y) * w + ox + x) as usize] = 255;
                }
            }
        }
        (data, w, h)
    }

    #[test]
    fn every_sprite_and_tier_is_processed_in_order() {
        let (data, w, h) = sheet_pixels();
        let raster = AlphaMask::from_alpha(&data, w, h).unwrap();
        let sheet = SpriteSheet::from_raster(w, h, 16, 16).unwrap();

        let tiers = [AccuracyTier::High, AccuracyTier::Low, AccuracyTier::High];
        let results = process_sheet(&raster, &sheet, &PipelineConfig::default(), &tiers);

        assert_eq!(results.len(), 6 * 2);
        let keys: Vec<(usize, AccuracyTier)> = results.iter().map(|r| (r.index, r.tier)).collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
        assert_eq!(keys[0], (0, AccuracyTier::Low));
        assert_eq!(keys[1], (0, AccuracyTier::High));
    }

    #[test]
    fn squares_become_single_convex_pieces() {
        let (data, w, h) = sheet_pixels();
        let raster = AlphaMask::from_alpha(&data, w, h).unwrap();
        let sheet = SpriteSheet::from_raster(w, h, 16, 16).unwrap();
        let results = process_sheet(
            &raster,
            &sheet,
            &PipelineConfig::default(),
            &AccuracyTier::ALL,
        );

        for sprite in &results {
            let result = sprite.result.as_ref().unwrap();
            assert_eq!(result.shape.kind(), ShapeKind::Decomposed);
            assert_eq!(result.confidence, TraceConfidence::Stable);
            let polygons = result.shape.polygons();
            if sprite.index == 5 {
                assert!(polygons.is_empty());
            } else {
                assert_eq!(polygons.len(), 1, "sprite {}", sprite.index);
                assert!(is_convex(polygons[0].points()));
            }
        }
    }

    #[test]
    fn invalid_config_fails_every_task_independently() {
        let (data, w, h) = sheet_pixels();
        let raster = AlphaMask::from_alpha(&data, w, h).unwrap();
        let sheet = SpriteSheet::from_raster(w, h, 16, 16).unwrap();
        let config = PipelineConfig {
            trace_step_factor: 0,
            ..PipelineConfig::default()
        };
        let results = process_sheet(&raster, &sheet, &config, &[AccuracyTier::Mid]);
        assert_eq!(results.len(), 6);
        assert!(
            results
                .iter()
                .all(|r| matches!(r.result, Err(PipelineError::InvalidConfig(_))))
        );
    }

    #[test]
    fn oversized_sheet_fails_only_missing_frames() {
        let (data, w, h) = sheet_pixels();
        let raster = AlphaMask::from_alpha(&data, w, h).unwrap();
        // One column more than the raster holds.
        let sheet = SpriteSheet {
            frame_width: 16,
            frame_height: 16,
            columns: 4,
            rows: 2,
        };
        let results = process_sheet(&raster, &sheet, &PipelineConfig::default(), &[AccuracyTier::Mid]);
        assert_eq!(results.len(), 8);
        for r in &results {
            let missing = r.index % 4 == 3;
            assert_eq!(r.result.is_err(), missing, "sprite {}", r.index);
        }
    }

    #[test]
    fn explicit_tolerance_is_replaced_by_tier_preset() {
        let (data, w, h) = sheet_pixels();
        let raster = AlphaMask::from_alpha(&data, w, h).unwrap();
        let sheet = SpriteSheet::from_raster(w, h, 16, 16).unwrap();
        let config = PipelineConfig {
            tolerance: Some(-5.0),
            ..PipelineConfig::default()
        };
        let results = process_sheet(&raster, &sheet, &config, &[AccuracyTier::Low]);
        assert!(results.iter().all(|r| r.result.is_ok()));
    }
}
