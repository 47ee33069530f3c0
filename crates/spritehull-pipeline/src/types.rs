//! Shared types for the spritehull geometry pipeline.

use serde::{Deserialize, Serialize};

/// A 2D point in sprite-local pixel coordinates.
///
/// Traced points sit on integer pixel coordinates. Points synthesized by
/// the decomposer (Steiner points) may be fractional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from the left edge of the sprite).
    pub x: f64,
    /// Vertical position (pixels from the top edge of the sprite).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Midpoint of the segment between `self` and `other`.
    #[must_use]
    pub fn midpoint(self, other: Self) -> Self {
        Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// An open, order-significant sequence of points.
///
/// Used for intermediate results where the first and last points are
/// meaningful endpoints (e.g. the input of the simplifier).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Point> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Point> {
        self.0.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polyline and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }
}

/// A closed ring of points: the last point implicitly connects back to
/// the first.
///
/// Traced contours, hulls and decomposition pieces are all polygons. A
/// polygon does not repeat its first point at the end; use
/// [`without_closing_duplicate`](Self::without_closing_duplicate) to
/// normalize input that does.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polygon(Vec<Point>);

impl Polygon {
    /// Create a new polygon from its vertices in ring order.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polygon has no vertices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of vertices.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all vertices in ring order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polygon and returns its vertices.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    /// Vertex at a cyclic index: `-1` is the last vertex, `len` the first.
    ///
    /// # Panics
    ///
    /// Panics if the polygon is empty.
    #[must_use]
    pub fn at(&self, index: isize) -> Point {
        #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
        let i = index.rem_euclid(self.0.len() as isize) as usize;
        self.0[i]
    }

    /// Twice the signed area (shoelace formula).
    ///
    /// Positive when the ring turns left under the
    /// [`cross`](crate::convexity::cross) convention, negative when it
    /// turns right, zero for degenerate rings.
    #[must_use]
    pub fn signed_area_doubled(&self) -> f64 {
        let n = self.0.len();
        if n < 3 {
            return 0.0;
        }
        (0..n)
            .map(|i| {
                let a = self.0[i];
                let b = self.0[(i + 1) % n];
                a.x.mul_add(b.y, -(b.x * a.y))
            })
            .sum()
    }

    /// Drop consecutive duplicate vertices, including a trailing copy of
    /// the first vertex.
    #[must_use]
    pub fn without_closing_duplicate(&self) -> Self {
        let mut points: Vec<Point> = Vec::with_capacity(self.0.len());
        for &p in &self.0 {
            if points.last() != Some(&p) {
                points.push(p);
            }
        }
        while points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        Self(points)
    }

    /// The same ring traversed in the opposite direction.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self(self.0.iter().rev().copied().collect())
    }
}

impl From<Polyline> for Polygon {
    fn from(polyline: Polyline) -> Self {
        Self(polyline.into_points())
    }
}

/// An ordered set of convex polygons covering one sprite silhouette.
///
/// Convexity of each piece is guaranteed only for fully resolved
/// decompositions; depth-capped or uncuttable pieces are kept as-is.
///
/// The derived counters ([`polygon_count`](Self::polygon_count) and
/// [`total_points`](Self::total_points)) are always computed from the
/// contained polygons, never stored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConvexPolygonSet(Vec<Polygon>);

impl ConvexPolygonSet {
    /// Create a set from already-validated polygons.
    #[must_use]
    pub const fn new(polygons: Vec<Polygon>) -> Self {
        Self(polygons)
    }

    /// Returns `true` if the set holds no polygons.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of polygons in the set.
    #[must_use]
    pub const fn polygon_count(&self) -> usize {
        self.0.len()
    }

    /// Sum of vertex counts over every polygon in the set.
    #[must_use]
    pub fn total_points(&self) -> usize {
        self.0.iter().map(Polygon::len).sum()
    }

    /// The polygons in output order.
    #[must_use]
    pub fn polygons(&self) -> &[Polygon] {
        &self.0
    }

    /// Consumes the set and returns its polygons.
    #[must_use]
    pub fn into_polygons(self) -> Vec<Polygon> {
        self.0
    }
}

/// Sprite dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Accuracy tier: a named simplification tolerance preset.
///
/// Every [`ShapeKind`] maps tiers onto the same tolerance scale so
/// point density stays comparable between shape kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyTier {
    /// Coarse outline, fewest points.
    Low,
    /// Balanced default.
    #[default]
    Mid,
    /// Tight outline, most points.
    High,
}

impl AccuracyTier {
    /// Every tier, coarsest first.
    pub const ALL: [Self; 3] = [Self::Low, Self::Mid, Self::High];

    /// Simplification tolerance in pixels for this tier.
    #[must_use]
    pub const fn tolerance(self) -> f64 {
        match self {
            Self::Low => 4.0,
            Self::Mid => 2.0,
            Self::High => 1.0,
        }
    }

    /// Lowercase name, as used in exported documents and on the CLI.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Mid => "mid",
            Self::High => "high",
        }
    }
}

/// Which kind of collision shape the pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// One simplified outline of the whole silhouette (may be concave).
    Silhouette,
    /// Convex hull of every solid pixel, simplified.
    Hull,
    /// Minimal set of convex pieces (extract, decompose, optimize).
    #[default]
    Decomposed,
}

/// How much the traced contour can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceConfidence {
    /// The boundary walk closed on its start pixel.
    #[default]
    Stable,
    /// The walk hit its step cap before closing; the contour is partial.
    Unstable,
}

/// Configuration for one pipeline invocation (one sprite × one tier).
///
/// Call [`validate`](Self::validate) before use; every pipeline entry
/// point does so and reports [`PipelineError::InvalidConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Alpha cutoff: pixels with `alpha >= alpha_threshold` are solid.
    pub alpha_threshold: u8,

    /// Which collision shape to produce.
    pub shape: ShapeKind,

    /// Accuracy tier selecting the simplification tolerance.
    pub tier: AccuracyTier,

    /// Explicit simplification tolerance in pixels. Overrides the
    /// tier preset when set.
    pub tolerance: Option<f64>,

    /// Factor applied to the tolerance when re-simplifying decomposed
    /// pieces. Must lie in `(0, 1]`.
    pub optimize_ratio: f64,

    /// Lower bound of the re-simplification tolerance in pixels.
    pub optimize_floor: f64,

    /// Maximum decomposition recursion depth. Pieces still non-convex
    /// at this depth are emitted unresolved.
    pub max_decomposition_depth: usize,

    /// Contour walk cap, in steps per mask pixel.
    pub trace_step_factor: usize,
}

impl PipelineConfig {
    /// Default alpha cutoff.
    pub const DEFAULT_ALPHA_THRESHOLD: u8 = 128;
    /// Default optimizer tolerance ratio.
    pub const DEFAULT_OPTIMIZE_RATIO: f64 = 0.3;
    /// Default optimizer tolerance floor in pixels.
    pub const DEFAULT_OPTIMIZE_FLOOR: f64 = 0.5;
    /// Default decomposition depth cap.
    pub const DEFAULT_MAX_DECOMPOSITION_DEPTH: usize = 100;
    /// Default contour walk cap factor.
    pub const DEFAULT_TRACE_STEP_FACTOR: usize = 4;

    /// Simplification tolerance in pixels: the explicit override, or the
    /// tier preset.
    #[must_use]
    pub fn effective_tolerance(&self) -> f64 {
        self.tolerance.unwrap_or_else(|| self.tier.tolerance())
    }

    /// Reduced tolerance used to re-simplify decomposed pieces.
    #[must_use]
    pub fn optimize_tolerance(&self) -> f64 {
        (self.effective_tolerance() * self.optimize_ratio).max(self.optimize_floor)
    }

    /// Check parameter contracts.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the tolerance is not a
    /// positive finite number, `optimize_ratio` is outside `(0, 1]`,
    /// `optimize_floor` is negative or non-finite, or either cap is zero.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let tolerance = self.effective_tolerance();
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "tolerance must be a positive number, got {tolerance}"
            )));
        }
        if !self.optimize_ratio.is_finite()
            || self.optimize_ratio <= 0.0
            || self.optimize_ratio > 1.0
        {
            return Err(PipelineError::InvalidConfig(format!(
                "optimize_ratio must lie in (0, 1], got {}",
                self.optimize_ratio
            )));
        }
        if !self.optimize_floor.is_finite() || self.optimize_floor < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "optimize_floor must be non-negative, got {}",
                self.optimize_floor
            )));
        }
        if self.max_decomposition_depth == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_decomposition_depth must be at least 1".to_string(),
            ));
        }
        if self.trace_step_factor == 0 {
            return Err(PipelineError::InvalidConfig(
                "trace_step_factor must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            alpha_threshold: Self::DEFAULT_ALPHA_THRESHOLD,
            shape: ShapeKind::default(),
            tier: AccuracyTier::default(),
            tolerance: None,
            optimize_ratio: Self::DEFAULT_OPTIMIZE_RATIO,
            optimize_floor: Self::DEFAULT_OPTIMIZE_FLOOR,
            max_decomposition_depth: Self::DEFAULT_MAX_DECOMPOSITION_DEPTH,
            trace_step_factor: Self::DEFAULT_TRACE_STEP_FACTOR,
        }
    }
}

/// The collision shape produced for one sprite and tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "geometry", rename_all = "lowercase")]
pub enum Shape {
    /// Whole-silhouette outline.
    Silhouette(Polygon),
    /// Convex hull outline.
    Hull(Polygon),
    /// Convex decomposition.
    ///
    /// Every piece is convex only when the decomposition left no piece
    /// unresolved (see [`DecompositionStats::unresolved`]). Contours that
    /// touch themselves, such as those of one-pixel spurs, can leave
    /// concave pieces in the set.
    ///
    /// [`DecompositionStats::unresolved`]: crate::decompose::DecompositionStats::unresolved
    Decomposed(ConvexPolygonSet),
}

impl Shape {
    /// The shape as a list of polygons (one for outlines).
    ///
    /// Empty outlines yield an empty list.
    #[must_use]
    pub fn polygons(&self) -> Vec<&Polygon> {
        match self {
            Self::Silhouette(p) | Self::Hull(p) => {
                if p.is_empty() {
                    Vec::new()
                } else {
                    vec![p]
                }
            }
            Self::Decomposed(set) => set.polygons().iter().collect(),
        }
    }

    /// Which kind of shape this is.
    #[must_use]
    pub const fn kind(&self) -> ShapeKind {
        match self {
            Self::Silhouette(_) => ShapeKind::Silhouette,
            Self::Hull(_) => ShapeKind::Hull,
            Self::Decomposed(_) => ShapeKind::Decomposed,
        }
    }

    /// Returns `true` if the shape carries no geometry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Silhouette(p) | Self::Hull(p) => p.is_empty(),
            Self::Decomposed(set) => set.is_empty(),
        }
    }
}

/// Result of running the pipeline on one sprite at one tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    /// The produced collision shape.
    pub shape: Shape,

    /// Whether the contour walk closed normally.
    pub confidence: TraceConfidence,

    /// Dimensions of the sprite region in pixels.
    pub dimensions: Dimensions,
}

/// Errors that can occur during pipeline processing.
///
/// Only parameter-contract violations are errors. Geometric edge cases
/// (empty masks, unstable traces, depth-capped decomposition) resolve
/// locally with a documented fallback.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `ImageDecode` variant is
/// serialized as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// The mask region has zero area.
    #[error("mask region has zero area ({width}x{height})")]
    EmptyRegion {
        /// Region width in pixels.
        width: u32,
        /// Region height in pixels.
        height: u32,
    },

    /// The mask buffer does not match its declared geometry.
    #[error("invalid alpha mask: {0}")]
    InvalidMask(String),

    /// A sprite index lies past the end of the sheet.
    #[error("sprite index {index} is out of range (sheet has {frame_count} frames)")]
    FrameOutOfRange {
        /// Requested sprite index.
        index: usize,
        /// Number of frames in the sheet.
        frame_count: usize,
    },
}

/// Serde-compatible proxy for `PipelineError`.
///
/// `image::ImageError` does not implement serde, so the `ImageDecode`
/// variant stores its `Display` string instead.
#[derive(Serialize, Deserialize)]
enum PipelineErrorProxy {
    ImageDecode(String),
    EmptyInput,
    InvalidConfig(String),
    EmptyRegion { width: u32, height: u32 },
    InvalidMask(String),
    FrameOutOfRange { index: usize, frame_count: usize },
}

impl Serialize for PipelineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::ImageDecode(e) => PipelineErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => PipelineErrorProxy::EmptyInput,
            Self::InvalidConfig(s) => PipelineErrorProxy::InvalidConfig(s.clone()),
            Self::EmptyRegion { width, height } => PipelineErrorProxy::EmptyRegion {
                width: *width,
                height: *height,
            },
            Self::InvalidMask(s) => PipelineErrorProxy::InvalidMask(s.clone()),
            Self::FrameOutOfRange { index, frame_count } => PipelineErrorProxy::FrameOutOfRange {
                index: *index,
                frame_count: *frame_count,
            },
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PipelineError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = PipelineErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            // The original image::ImageError cannot be reconstructed.
            PipelineErrorProxy::ImageDecode(msg) => {
                Self::InvalidMask(format!("image decode error: {msg}"))
            }
            PipelineErrorProxy::EmptyInput => Self::EmptyInput,
            PipelineErrorProxy::InvalidConfig(s) => Self::InvalidConfig(s),
            PipelineErrorProxy::EmptyRegion { width, height } => {
                Self::EmptyRegion { width, height }
            }
            PipelineErrorProxy::InvalidMask(s) => Self::InvalidMask(s),
            PipelineErrorProxy::FrameOutOfRange { index, frame_count } => {
                Self::FrameOutOfRange { index, frame_count }
            }
        })
    }
}
