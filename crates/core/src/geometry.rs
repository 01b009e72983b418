//! Viewer-space geometry helpers
//!
//! All coordinates are viewer-local pixels: origin at the top-left of the
//! viewer element, X to the right, Y downward. Conversion to source-image
//! pixels goes through [`crate::viewer::ViewerState::to_source`].

use serde::{Deserialize, Serialize};

/// A point in viewer-local pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned rectangle with its origin at the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Zero-size rectangle anchored at `point`
    pub fn at(point: Point) -> Self {
        Self { x: point.x, y: point.y, width: 0.0, height: 0.0 }
    }

    /// Rectangle spanning two arbitrary corners.
    ///
    /// The result always has non-negative width and height, whichever
    /// direction the corners were dragged in.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    /// Scale every component by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            width: self.width * factor,
            height: self.height * factor,
        }
    }
}

/// Angle in degrees at `p2` formed by the rays towards `p1` and `p3`.
///
/// Returns 0 when either ray has zero length.
pub fn angle_between(p1: Point, p2: Point, p3: Point) -> f64 {
    let (v1x, v1y) = (p1.x - p2.x, p1.y - p2.y);
    let (v2x, v2y) = (p3.x - p2.x, p3.y - p2.y);

    let dot = v1x * v2x + v1y * v2y;
    let m1 = v1x.hypot(v1y);
    let m2 = v2x.hypot(v2y);

    if m1 == 0.0 || m2 == 0.0 {
        return 0.0;
    }

    // Rounding can push the cosine just past ±1, which acos rejects with NaN.
    let cos = (dot / (m1 * m2)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Render points as `"x,y x,y ..."` (the SVG `points` attribute format)
pub fn format_points(points: &[Point]) -> String {
    points.iter().map(|p| format!("{},{}", p.x, p.y)).collect::<Vec<_>>().join(" ")
}

/// Pointer position relative to a scrolled viewer element.
///
/// `client` is the pointer in window coordinates, `origin` the viewer's
/// bounding-box corner and `scroll` its current scroll offset.
pub fn viewer_local_position(client: Point, origin: Point, scroll: Point) -> Point {
    Point { x: client.x - origin.x + scroll.x, y: client.y - origin.y + scroll.y }
}

/// Pointer position relative to an element, ignoring scroll
pub fn relative_position(client: Point, origin: Point) -> Point {
    Point { x: client.x - origin.x, y: client.y - origin.y }
}
