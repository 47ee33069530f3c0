//! SVG overlay serializer.
//!
//! Draws a sprite's collision polygons over its frame box using the
//! [`svg`] crate for document construction, XML escaping, and path
//! data formatting. The document's user units are sprite pixels, so the
//! overlay lines up with the frame when both are drawn at the same
//! scale.
//!
//! Each polygon becomes a closed `<path>` (`M`, `L`..., `z`). Pieces of
//! a decomposition cycle through [`PIECE_COLORS`] so neighbouring pieces
//! are told apart.
//!
//! Optional [`SvgMetadata`] embeds `<title>` and `<desc>` elements and
//! the pipeline configuration that produced the shape.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Description, Element, Group, Path, Rectangle, Title};
use svg::node::{Node, Text, Value};

use spritehull_pipeline::{Polygon, ProcessResult, ShapeKind};

/// Fill colours assigned to decomposition pieces, in order.
pub const PIECE_COLORS: [&str; 6] = [
    "#e6194b", "#3cb44b", "#4363d8", "#f58231", "#911eb4", "#42d4f4",
];

/// Outline colour for whole-sprite shapes (silhouette and hull).
const OUTLINE_COLOR: &str = "#e6194b";

/// Namespace URI for the embedded pipeline configuration element.
const METADATA_NS: &str = "https://spritehull.dev/ns/1";

/// Metadata to embed in the SVG document.
///
/// All fields are optional. Text values are XML-escaped by the `svg`
/// crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the sheet filename and sprite index.
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized `PipelineConfig` JSON, emitted inside `<metadata>` as
    /// a namespaced `<spritehull:pipeline>` element.
    pub config_json: Option<&'a str>,
}

/// Build a closed SVG path `d` attribute string from a polygon.
///
/// Returns an empty string for polygons with fewer than 3 points.
///
/// # Examples
///
/// ```
/// use spritehull_pipeline::{Point, Polygon};
/// use spritehull_export::build_path_data;
///
/// let triangle = Polygon::new(vec![
///     Point::new(0.0, 0.0),
///     Point::new(10.0, 0.0),
///     Point::new(10.0, 10.0),
/// ]);
/// assert_eq!(build_path_data(&triangle), "M0,0 L10,0 L10,10 z");
/// ```
#[must_use]
pub fn build_path_data(polygon: &Polygon) -> String {
    let points = polygon.points();
    if points.len() < 3 {
        return String::new();
    }

    let first = &points[0];
    let mut data = Data::new().move_to((first.x, first.y));
    for p in &points[1..] {
        data = data.line_to((p.x, p.y));
    }
    String::from(Value::from(data.close()))
}

/// Serialize one sprite's collision shape into an SVG overlay string.
///
/// The document is `width × height` sprite pixels. A dashed rectangle
/// marks the frame box; the polygons sit in a `<g id="shape">` group
/// tagged with the shape kind.
#[must_use]
pub fn to_svg(result: &ProcessResult, metadata: &SvgMetadata<'_>) -> String {
    let w = result.dimensions.width;
    let h = result.dimensions.height;
    let mut doc = Document::new()
        .set("width", w)
        .set("height", h)
        .set("viewBox", (0, 0, w, h));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    if let Some(config_json) = metadata.config_json {
        let mut pipeline_el = Element::new("spritehull:pipeline");
        pipeline_el.assign("xmlns:spritehull", METADATA_NS);
        pipeline_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(pipeline_el);
        doc = doc.add(metadata_el);
    }

    let frame = Rectangle::new()
        .set("id", "frame")
        .set("x", 0)
        .set("y", 0)
        .set("width", w)
        .set("height", h)
        .set("fill", "none")
        .set("stroke", "gray")
        .set("stroke-width", 0.25)
        .set("stroke-dasharray", "1 1");
    doc = doc.add(frame);

    let kind = result.shape.kind();
    let mut group = Group::new()
        .set("id", "shape")
        .set("data-kind", kind_name(kind));

    for (i, polygon) in result.shape.polygons().into_iter().enumerate() {
        let d = build_path_data(polygon);
        if d.is_empty() {
            continue;
        }
        let color = match kind {
            ShapeKind::Decomposed => PIECE_COLORS[i % PIECE_COLORS.len()],
            ShapeKind::Silhouette | ShapeKind::Hull => OUTLINE_COLOR,
        };
        let path = Path::new()
            .set("d", d)
            .set("fill", color)
            .set("fill-opacity", 0.35)
            .set("stroke", color)
            .set("stroke-width", 0.5)
            .set("stroke-linejoin", "round");
        group = group.add(path);
    }
    doc = doc.add(group);

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}

const fn kind_name(kind: ShapeKind) -> &'static str {
    match kind {
        ShapeKind::Silhouette => "silhouette",
        ShapeKind::Hull => "hull",
        ShapeKind::Decomposed => "decomposed",
    }
}
