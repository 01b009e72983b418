//! Rubber-band crop selection

use crate::geometry::{Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropPhase {
    Idle,
    /// Crop mode entered, waiting for the first corner
    Started,
    /// First corner placed, rectangle follows the pointer
    Dragging,
    /// The region has been rasterized
    Captured,
}

#[derive(Debug, Clone, Default)]
pub struct CropTool {
    started: bool,
    start: Option<Point>,
    region: Option<Rect>,
    captured: Option<Vec<u8>>,
}

impl CropTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> CropPhase {
        if self.captured.is_some() {
            CropPhase::Captured
        } else if self.start.is_some() {
            CropPhase::Dragging
        } else if self.started {
            CropPhase::Started
        } else {
            CropPhase::Idle
        }
    }

    /// Enter crop mode, forgetting any previous corners
    pub fn start(&mut self) {
        self.started = true;
        self.start = None;
        self.region = None;
    }

    /// Anchor the first corner, producing a zero-size region
    pub fn begin(&mut self, pos: Point) {
        self.started = true;
        self.start = Some(pos);
        self.region = Some(Rect::at(pos));
    }

    /// Stretch the region from the anchored corner to `pos`
    pub fn update_to(&mut self, pos: Point) {
        let Some(start) = self.start else {
            return;
        };
        self.region = Some(Rect::from_corners(start, pos));
    }

    pub fn region(&self) -> Option<Rect> {
        self.region
    }

    /// Store the rasterized crop (PNG bytes)
    pub fn capture(&mut self, png: Vec<u8>) {
        self.captured = Some(png);
    }

    pub fn captured(&self) -> Option<&[u8]> {
        self.captured.as_deref()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_creates_zero_size_region() {
        let mut crop = CropTool::new();
        crop.start();
        assert_eq!(crop.phase(), CropPhase::Started);

        crop.begin(Point::new(40.0, 60.0));
        assert_eq!(crop.phase(), CropPhase::Dragging);
        assert_eq!(crop.region(), Some(Rect::new(40.0, 60.0, 0.0, 0.0)));
    }

    #[test]
    fn dragging_up_and_left_normalizes_region() {
        let mut crop = CropTool::new();
        crop.begin(Point::new(100.0, 100.0));
        crop.update_to(Point::new(30.0, 45.0));

        let region = crop.region().expect("region while dragging");
        assert_eq!(region.x, 30.0);
        assert_eq!(region.y, 45.0);
        assert_eq!(region.width, 70.0);
        assert_eq!(region.height, 55.0);
    }

    #[test]
    fn update_without_anchor_is_ignored() {
        let mut crop = CropTool::new();
        crop.start();
        crop.update_to(Point::new(10.0, 10.0));
        assert_eq!(crop.region(), None);
    }

    #[test]
    fn reset_clears_captured_raster() {
        let mut crop = CropTool::new();
        crop.begin(Point::new(0.0, 0.0));
        crop.update_to(Point::new(5.0, 5.0));
        crop.capture(vec![0x89, b'P', b'N', b'G']);
        assert_eq!(crop.phase(), CropPhase::Captured);

        crop.reset();
        assert_eq!(crop.phase(), CropPhase::Idle);
        assert!(crop.captured().is_none());
        assert!(crop.region().is_none());
    }
}
