//! JSON hitbox document serializer.
//!
//! The document is what the game runtime loads at startup:
//!
//! ```json
//! {
//!   "sprite_width": 64,
//!   "sprite_height": 64,
//!   "sprites": [
//!     {
//!       "index": 0,
//!       "tiers": {
//!         "mid": {
//!           "kind": "decomposed",
//!           "polygons": [[[2.0, 2.0], [12.0, 2.0], [12.0, 9.0]]],
//!           "polygonCount": 1,
//!           "totalPoints": 3,
//!           "confidence": "stable"
//!         }
//!       }
//!     }
//!   ]
//! }
//! ```
//!
//! Points are `[x, y]` pairs in sprite-local pixels. `polygonCount` and
//! `totalPoints` are written from the polygons at serialization time
//! and checked against them on parse. A task that failed is written as
//! `{ "error": "<message>" }` in its tier slot.

use serde::{Deserialize, Serialize};

use spritehull_pipeline::{
    AccuracyTier, Point, Polygon, ProcessResult, ShapeKind, SpriteResult, TraceConfidence,
};

/// Errors from building or parsing a hitbox document.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// JSON encoding or decoding failed.
    #[error("hitbox JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The same sprite and tier appear more than once.
    #[error("sprite {index} has more than one {tier} entry")]
    DuplicateTier {
        /// Sprite index.
        index: usize,
        /// The repeated tier.
        tier: &'static str,
    },

    /// A stored counter disagrees with the polygons it describes.
    #[error("sprite {index} {tier}: {field} is {stored} but the polygons give {actual}")]
    CounterMismatch {
        /// Sprite index.
        index: usize,
        /// Tier whose entry is inconsistent.
        tier: &'static str,
        /// Which counter, `polygonCount` or `totalPoints`.
        field: &'static str,
        /// Value found in the document.
        stored: usize,
        /// Value computed from the polygons.
        actual: usize,
    },
}

/// The whole hitbox document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitboxDocument {
    /// Sprite frame width in pixels.
    pub sprite_width: u32,
    /// Sprite frame height in pixels.
    pub sprite_height: u32,
    /// One entry per sprite, ordered by index.
    pub sprites: Vec<SpriteHitboxes>,
}

/// All tiers recorded for one sprite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteHitboxes {
    /// Row-major sprite index within the sheet.
    pub index: usize,
    /// Per-tier entries.
    pub tiers: TierEntries,
}

/// Tier slots of one sprite. Tiers that were not requested are absent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TierEntries {
    /// Entry for the `low` tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<TierEntry>,
    /// Entry for the `mid` tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid: Option<TierEntry>,
    /// Entry for the `high` tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<TierEntry>,
}

impl TierEntries {
    /// The slot for `tier`.
    #[must_use]
    pub const fn get(&self, tier: AccuracyTier) -> Option<&TierEntry> {
        match tier {
            AccuracyTier::Low => self.low.as_ref(),
            AccuracyTier::Mid => self.mid.as_ref(),
            AccuracyTier::High => self.high.as_ref(),
        }
    }

    const fn slot_mut(&mut self, tier: AccuracyTier) -> &mut Option<TierEntry> {
        match tier {
            AccuracyTier::Low => &mut self.low,
            AccuracyTier::Mid => &mut self.mid,
            AccuracyTier::High => &mut self.high,
        }
    }

    fn iter(&self) -> impl Iterator<Item = (AccuracyTier, &TierEntry)> {
        AccuracyTier::ALL
            .into_iter()
            .filter_map(|tier| self.get(tier).map(|entry| (tier, entry)))
    }
}

/// One tier slot: either the produced hitbox or the task's error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TierEntry {
    /// The task succeeded.
    Hitbox(Hitbox),
    /// The task failed.
    Failed {
        /// Display text of the pipeline error.
        error: String,
    },
}

/// Collision polygons for one sprite at one tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hitbox {
    /// Which shape kind produced the polygons.
    pub kind: ShapeKind,
    /// Polygons as rings of `[x, y]` points.
    pub polygons: Vec<Vec<[f64; 2]>>,
    /// Number of polygons.
    pub polygon_count: usize,
    /// Sum of vertex counts over every polygon.
    pub total_points: usize,
    /// Whether the contour trace closed normally.
    pub confidence: TraceConfidence,
}

impl Hitbox {
    /// Build a hitbox from a pipeline result, deriving the counters.
    #[must_use]
    pub fn from_result(result: &ProcessResult) -> Self {
        let polygons: Vec<Vec<[f64; 2]>> = result
            .shape
            .polygons()
            .into_iter()
            .map(|polygon| polygon.points().iter().map(|p| [p.x, p.y]).collect())
            .collect();
        let total_points = polygons.iter().map(Vec::len).sum();
        Self {
            kind: result.shape.kind(),
            polygon_count: polygons.len(),
            total_points,
            polygons,
            confidence: result.confidence,
        }
    }

    /// The polygons as pipeline types.
    #[must_use]
    pub fn to_polygons(&self) -> Vec<Polygon> {
        self.polygons
            .iter()
            .map(|ring| ring.iter().map(|&[x, y]| Point::new(x, y)).collect())
            .map(Polygon::new)
            .collect()
    }

    fn check_counters(&self, index: usize, tier: AccuracyTier) -> Result<(), ExportError> {
        let actual_polygons = self.polygons.len();
        let actual_points = self.polygons.iter().map(Vec::len).sum();
        for (field, stored, actual) in [
            ("polygonCount", self.polygon_count, actual_polygons),
            ("totalPoints", self.total_points, actual_points),
        ] {
            if stored != actual {
                return Err(ExportError::CounterMismatch {
                    index,
                    tier: tier.name(),
                    field,
                    stored,
                    actual,
                });
            }
        }
        Ok(())
    }
}

impl HitboxDocument {
    /// Group batch results into a document, one entry per sprite.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::DuplicateTier`] if a (sprite, tier) pair
    /// appears twice in `results`.
    pub fn from_results(
        sprite_width: u32,
        sprite_height: u32,
        results: &[SpriteResult],
    ) -> Result<Self, ExportError> {
        let mut sprites: Vec<SpriteHitboxes> = Vec::new();
        for sprite in results {
            let position = match sprites.binary_search_by_key(&sprite.index, |s| s.index) {
                Ok(position) => position,
                Err(position) => {
                    sprites.insert(
                        position,
                        SpriteHitboxes {
                            index: sprite.index,
                            tiers: TierEntries::default(),
                        },
                    );
                    position
                }
            };
            let slot = sprites[position].tiers.slot_mut(sprite.tier);
            if slot.is_some() {
                return Err(ExportError::DuplicateTier {
                    index: sprite.index,
                    tier: sprite.tier.name(),
                });
            }
            *slot = Some(match &sprite.result {
                Ok(result) => TierEntry::Hitbox(Hitbox::from_result(result)),
                Err(e) => TierEntry::Failed {
                    error: e.to_string(),
                },
            });
        }
        Ok(Self {
            sprite_width,
            sprite_height,
            sprites,
        })
    }

    /// Verify every stored counter against its polygons.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::CounterMismatch`] for the first
    /// inconsistent entry.
    pub fn validate(&self) -> Result<(), ExportError> {
        for sprite in &self.sprites {
            for (tier, entry) in sprite.tiers.iter() {
                if let TierEntry::Hitbox(hitbox) = entry {
                    hitbox.check_counters(sprite.index, tier)?;
                }
            }
        }
        Ok(())
    }
}

/// Serialize batch results into a pretty-printed hitbox document.
///
/// # Errors
///
/// Returns [`ExportError::DuplicateTier`] for repeated (sprite, tier)
/// pairs, or [`ExportError::Json`] if encoding fails.
pub fn to_json(
    sprite_width: u32,
    sprite_height: u32,
    results: &[SpriteResult],
) -> Result<String, ExportError> {
    let document = HitboxDocument::from_results(sprite_width, sprite_height, results)?;
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Parse a hitbox document and check its counters.
///
/// # Errors
///
/// Returns [`ExportError::Json`] for malformed input, or
/// [`ExportError::CounterMismatch`] if a counter disagrees with its
/// polygons.
pub fn from_json(json: &str) -> Result<HitboxDocument, ExportError> {
    let document: HitboxDocument = serde_json::from_str(json)?;
    document.validate()?;
    Ok(document)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use spritehull_pipeline::{ConvexPolygonSet, Dimensions, PipelineError, Shape};

    use super::*;

    fn triangle() -> Polygon {
        Polygon::new(vec![
            Point::new(2.0, 2.0),
            Point::new(12.0, 2.0),
            Point::new(12.0, 9.0),
        ])
    }

    fn ok(index: usize, tier: AccuracyTier, shape: Shape) -> SpriteResult {
        SpriteResult {
            index,
            tier,
            result: Ok(ProcessResult {
                shape,
                confidence: TraceConfidence::Stable,
                dimensions: Dimensions {
                    width: 16,
                    height: 16,
                },
            }),
        }
    }

    #[test]
    fn counters_are_derived_from_polygons() {
        let set = ConvexPolygonSet::new(vec![triangle(), triangle()]);
        let results = [ok(0, AccuracyTier::Mid, Shape::Decomposed(set))];
        let json = to_json(16, 16, &results).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let mid = &value["sprites"][0]["tiers"]["mid"];
        assert_eq!(mid["kind"], "decomposed");
        assert_eq!(mid["polygonCount"], 2);
        assert_eq!(mid["totalPoints"], 6);
        assert_eq!(mid["confidence"], "stable");
        assert_eq!(mid["polygons"][0][1], serde_json::json!([12.0, 2.0]));
        assert!(value["sprites"][0]["tiers"].get("low").is_none());
    }

    #[test]
    fn sprites_are_grouped_and_ordered_by_index() {
        let results = [
            ok(3, AccuracyTier::Low, Shape::Hull(triangle())),
            ok(1, AccuracyTier::High, Shape::Hull(triangle())),
            ok(3, AccuracyTier::High, Shape::Hull(triangle())),
        ];
        let document = HitboxDocument::from_results(16, 16, &results).unwrap();
        let indices: Vec<usize> = document.sprites.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![1, 3]);
        assert!(document.sprites[1].tiers.low.is_some());
        assert!(document.sprites[1].tiers.high.is_some());
        assert!(document.sprites[1].tiers.mid.is_none());
    }

    #[test]
    fn duplicate_tier_is_rejected() {
        let results = [
            ok(0, AccuracyTier::Mid, Shape::Hull(triangle())),
            ok(0, AccuracyTier::Mid, Shape::Hull(triangle())),
        ];
        assert!(matches!(
            to_json(16, 16, &results),
            Err(ExportError::DuplicateTier { index: 0, tier: "mid" })
        ));
    }

    #[test]
    fn failed_task_is_written_as_error() {
        let results = [SpriteResult {
            index: 2,
            tier: AccuracyTier::Low,
            result: Err(PipelineError::FrameOutOfRange {
                index: 2,
                frame_count: 2,
            }),
        }];
        let json = to_json(16, 16, &results).unwrap();
        let document = from_json(&json).unwrap();
        let entry = document.sprites[0].tiers.get(AccuracyTier::Low).unwrap();
        assert!(matches!(entry, TierEntry::Failed { error } if error.contains("out of range")));
    }

    #[test]
    fn tampered_counter_is_rejected() {
        let results = [ok(0, AccuracyTier::High, Shape::Silhouette(triangle()))];
        let json = to_json(16, 16, &results)
            .unwrap()
            .replace("\"totalPoints\": 3", "\"totalPoints\": 4");
        assert!(matches!(
            from_json(&json),
            Err(ExportError::CounterMismatch {
                field: "totalPoints",
                stored: 4,
                actual: 3,
                ..
            })
        ));
    }

    #[test]
    fn empty_shape_has_zero_counters() {
        let results = [ok(0, AccuracyTier::Mid, Shape::Hull(Polygon::default()))];
        let document = from_json(&to_json(8, 8, &results).unwrap()).unwrap();
        let Some(TierEntry::Hitbox(hitbox)) = document.sprites[0].tiers.get(AccuracyTier::Mid)
        else {
            unreachable!("entry was written as a hitbox");
        };
        assert_eq!(hitbox.polygon_count, 0);
        assert_eq!(hitbox.total_points, 0);
        assert!(hitbox.to_polygons().is_empty());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(from_json("{"), Err(ExportError::Json(_))));
    }
}
