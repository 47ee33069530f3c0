//! End-to-end: sprite sheet -> batch pipeline -> hitbox JSON / SVG.

#![allow(clippy::unwrap_used)]

use spritehull_export::{SvgMetadata, TierEntry, from_json, to_json, to_svg};
use spritehull_pipeline::{
    AccuracyTier, AlphaMask, PipelineConfig, Polygon, ShapeKind, SpriteSheet, process_sheet,
};

/// A 2×1 sheet of 24×24 frames: an L in frame 0, nothing in frame 1.
fn sheet() -> (Vec<u8>, u32, u32) {
    let (w, h) = (48u32, 24u32);
    let data = (0..h)
        .flat_map(|y| (0..w).map(move |x| (x, y)))
        .map(|(x, y)| {
            let inside = (2..22).contains(&x) && (2..22).contains(&y);
            if inside && (x < 10 || y >= 14) { 255 } else { 0 }
        })
        .collect();
    (data, w, h)
}

#[test]
fn hitbox_document_round_trips_pipeline_output() {
    let (data, w, h) = sheet();
    let raster = AlphaMask::from_alpha(&data, w, h).unwrap();
    let sheet = SpriteSheet::from_raster(w, h, 24, 24).unwrap();
    let results = process_sheet(&raster, &sheet, &PipelineConfig::default(), &AccuracyTier::ALL);
    assert_eq!(results.len(), 6);

    let json = to_json(24, 24, &results).unwrap();
    let document = from_json(&json).unwrap();
    assert_eq!(document.sprite_width, 24);
    assert_eq!(document.sprites.len(), 2);

    for sprite in &results {
        let produced = sprite.result.as_ref().unwrap();
        let entry = document.sprites[sprite.index]
            .tiers
            .get(sprite.tier)
            .unwrap();
        let TierEntry::Hitbox(hitbox) = entry else {
            unreachable!("every task succeeded");
        };
        assert_eq!(hitbox.kind, ShapeKind::Decomposed);
        assert_eq!(hitbox.confidence, produced.confidence);

        let expected: Vec<_> = produced.shape.polygons().into_iter().cloned().collect();
        assert_eq!(hitbox.to_polygons(), expected);
        assert_eq!(hitbox.polygon_count, expected.len());
        assert_eq!(
            hitbox.total_points,
            expected.iter().map(Polygon::len).sum::<usize>()
        );
    }

    // The L needs more than one convex piece; the empty frame has none.
    let TierEntry::Hitbox(l_shape) = document.sprites[0].tiers.get(AccuracyTier::High).unwrap()
    else {
        unreachable!("every task succeeded");
    };
    assert!(l_shape.polygon_count >= 2);
    let TierEntry::Hitbox(empty) = document.sprites[1].tiers.get(AccuracyTier::High).unwrap()
    else {
        unreachable!("every task succeeded");
    };
    assert_eq!(empty.polygon_count, 0);
}

#[test]
fn svg_overlay_draws_every_piece() {
    let (data, w, h) = sheet();
    let raster = AlphaMask::from_alpha(&data, w, h).unwrap();
    let sheet = SpriteSheet::from_raster(w, h, 24, 24).unwrap();
    let results = process_sheet(&raster, &sheet, &PipelineConfig::default(), &[AccuracyTier::Mid]);
    let result = results[0].result.as_ref().unwrap();

    let config_json = serde_json::to_string(&PipelineConfig::default()).unwrap();
    let meta = SvgMetadata {
        title: Some("sheet.png #0"),
        description: Some("tier mid"),
        config_json: Some(&config_json),
    };
    let svg = to_svg(result, &meta);
    assert_eq!(svg.matches("<path").count(), result.shape.polygons().len());
    assert!(svg.contains(r#"viewBox="0 0 24 24""#));
    assert!(svg.contains("<title>sheet.png #0</title>"));
}
