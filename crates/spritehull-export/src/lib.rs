//! spritehull-export: Pure format serializers (sans-IO)
//!
//! Converts pipeline results into output formats: the JSON hitbox
//! document consumed by the game runtime, and an SVG overlay for
//! eyeballing a sprite's collision shape.

pub mod json;
pub mod svg;

pub use json::{
    ExportError, Hitbox, HitboxDocument, SpriteHitboxes, TierEntries, TierEntry, from_json,
    to_json,
};
pub use svg::{PIECE_COLORS, SvgMetadata, build_path_data, to_svg};
