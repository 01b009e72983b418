//! Three-point angle measurement tool
//!
//! The tool collects up to three points. Once the third lands, the angle at
//! the middle point is computed and kept in sync while points are dragged.

use crate::geometry::{angle_between, round_to, Point};
use serde::{Deserialize, Serialize};

/// Pick radius for grabbing an existing point, in viewer pixels
pub const DEFAULT_NEAREST_THRESHOLD: f64 = 10.0;

const POINTS_PER_ANGLE: usize = 3;

/// A finished angle measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleMeasurement {
    pub points: [Point; 3],
    /// Angle at `points[1]`, rounded to two decimals
    pub angle_degrees: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnglePhase {
    Empty,
    /// One or two points placed
    Collecting,
    /// All three points placed, angle available
    Ready,
}

/// In-progress angle measurement
#[derive(Debug, Clone, Default)]
pub struct AngleTool {
    points: Vec<Point>,
    angle_degrees: f64,
    dragging: Option<usize>,
}

impl AngleTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> AnglePhase {
        match self.points.len() {
            0 => AnglePhase::Empty,
            POINTS_PER_ANGLE => AnglePhase::Ready,
            _ => AnglePhase::Collecting,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Current angle in degrees; 0 until three points are placed
    pub fn angle_degrees(&self) -> f64 {
        self.angle_degrees
    }

    /// Index of the point currently being dragged
    pub fn dragging(&self) -> Option<usize> {
        self.dragging
    }

    /// Place the next point. Returns `false` once three points exist.
    pub fn add_point(&mut self, point: Point) -> bool {
        if self.points.len() >= POINTS_PER_ANGLE {
            return false;
        }

        self.points.push(point);
        self.recompute();
        true
    }

    /// Move point `index`. Returns `false` if no such point exists.
    pub fn update_point(&mut self, index: usize, point: Point) -> bool {
        let Some(slot) = self.points.get_mut(index) else {
            return false;
        };

        *slot = point;
        self.recompute();
        true
    }

    /// Grab the point under the cursor for dragging
    pub fn begin_drag(&mut self, x: f64, y: f64, threshold: f64) -> Option<usize> {
        self.dragging = Self::find_nearest(&self.points, x, y, threshold);
        self.dragging
    }

    /// Move the grabbed point, if any
    pub fn drag_to(&mut self, point: Point) -> bool {
        match self.dragging {
            Some(index) => self.update_point(index, point),
            None => false,
        }
    }

    pub fn end_drag(&mut self) {
        self.dragging = None;
    }

    /// Snapshot of the measurement once all three points are placed
    pub fn measurement(&self) -> Option<AngleMeasurement> {
        let points: [Point; 3] = self.points.as_slice().try_into().ok()?;
        Some(AngleMeasurement { points, angle_degrees: self.angle_degrees })
    }

    /// Discard all points and the computed angle
    pub fn reset(&mut self) {
        self.points.clear();
        self.angle_degrees = 0.0;
        self.dragging = None;
    }

    /// Index of the point closest to `(x, y)` strictly within `threshold`.
    ///
    /// On equal distances the earlier point wins.
    pub fn find_nearest(points: &[Point], x: f64, y: f64, threshold: f64) -> Option<usize> {
        let target = Point::new(x, y);
        let mut best: Option<(usize, f64)> = None;

        for (index, point) in points.iter().enumerate() {
            let distance = target.distance_to(point);
            if distance >= threshold {
                continue;
            }
            if best.map_or(true, |(_, closest)| distance < closest) {
                best = Some((index, distance));
            }
        }

        best.map(|(index, _)| index)
    }

    fn recompute(&mut self) {
        if let [p1, p2, p3] = self.points[..] {
            self.angle_degrees = round_to(angle_between(p1, p2, p3), 2);
        }
    }
}
