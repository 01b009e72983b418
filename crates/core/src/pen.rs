//! Calligraphy pen tracing
//!
//! A pen is selected by its nib angle, which fixes the stroke profile. At
//! most one stroke is active at a time; committing hands it to the caller.

use crate::geometry::{format_points, Point};
use crate::palette::{Color, ColorRotation};
use serde::{Deserialize, Serialize};

/// Nib angles offered by the pen picker, in degrees
pub const PEN_ANGLES: [u32; 5] = [0, 25, 30, 50, 80];

/// Nib footprint in viewer pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenProfile {
    pub width: f64,
    pub height: f64,
}

impl Default for PenProfile {
    fn default() -> Self {
        Self { width: 3.0, height: 6.0 }
    }
}

impl PenProfile {
    /// Profile for a nib angle; unknown angles get the default profile
    pub fn for_angle(angle: u32) -> Self {
        let (width, height) = match angle {
            0 => (2.0, 2.0),
            25 => (3.0, 6.0),
            30 => (4.0, 7.0),
            50 => (5.0, 8.0),
            80 => (6.0, 10.0),
            _ => return Self::default(),
        };
        Self { width, height }
    }
}

/// A traced pen stroke. Color and profile are fixed when the stroke starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub points: Vec<Point>,
    pub color: Color,
    pub pen: PenProfile,
}

impl Stroke {
    /// Points in SVG polyline form
    pub fn svg_points(&self) -> String {
        format_points(&self.points)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PenTool {
    profile: PenProfile,
    selected_angle: Option<u32>,
    active: Option<Stroke>,
    test_trace: Option<Vec<Point>>,
    colors: ColorRotation,
}

impl PenTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_colors(colors: ColorRotation) -> Self {
        Self { colors, ..Self::default() }
    }

    pub fn profile(&self) -> PenProfile {
        self.profile
    }

    pub fn selected_angle(&self) -> Option<u32> {
        self.selected_angle
    }

    pub fn select_pen(&mut self, angle: u32) {
        self.selected_angle = Some(angle);
        self.profile = PenProfile::for_angle(angle);
    }

    pub fn active_stroke(&self) -> Option<&Stroke> {
        self.active.as_ref()
    }

    pub fn is_drawing(&self) -> bool {
        self.active.is_some()
    }

    /// Open a new stroke at `pos`, replacing any stroke still in progress
    pub fn start_stroke(&mut self, pos: Point) {
        if let Some(previous) = &self.active {
            tracing::warn!(
                points = previous.points.len(),
                "starting a new stroke while one is active; discarding the active stroke"
            );
        }

        self.active =
            Some(Stroke { points: vec![pos], color: self.colors.next_color(), pen: self.profile });
    }

    pub fn continue_stroke(&mut self, pos: Point) {
        if let Some(stroke) = self.active.as_mut() {
            stroke.points.push(pos);
        }
    }

    /// Close the active stroke; it is returned only when `commit` is set
    pub fn end_stroke(&mut self, commit: bool) -> Option<Stroke> {
        let stroke = self.active.take()?;
        commit.then_some(stroke)
    }

    /// Start a scratch trace used to preview the selected pen
    pub fn begin_test_trace(&mut self, pos: Point) {
        self.test_trace = Some(vec![pos]);
    }

    pub fn extend_test_trace(&mut self, pos: Point) {
        if let Some(points) = self.test_trace.as_mut() {
            points.push(pos);
        }
    }

    pub fn test_trace(&self) -> &[Point] {
        self.test_trace.as_deref().unwrap_or(&[])
    }

    pub fn end_test_trace(&mut self) {
        self.test_trace = None;
    }
}
