use crate::{CaptureError, RgbaImage};
use scriptorium_core::ViewerState;
use std::time::Duration;

/// Delay that lets the viewer repaint after a page change
pub const DEFAULT_RENDER_DELAY: Duration = Duration::from_millis(50);

/// Visual layers a surface can be asked to leave out of a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceLayer {
    /// The page image itself
    Page,
    /// Annotations, measurements, and comments drawn over the page
    Overlay,
    Toolbar,
    Navigation,
}

impl SurfaceLayer {
    /// Toolbar and navigation are hidden while exporting
    pub fn is_chrome(self) -> bool {
        matches!(self, SurfaceLayer::Toolbar | SurfaceLayer::Navigation)
    }
}

/// Something that can show a given page
pub trait PageNavigator {
    fn go_to_page(&mut self, index: usize);
}

impl PageNavigator for ViewerState {
    fn go_to_page(&mut self, index: usize) {
        ViewerState::go_to_page(self, index);
    }
}

/// Rasterizes whatever the viewer currently displays
pub trait CaptureSurface {
    /// Capture the current page, leaving out every layer `ignore` accepts
    fn capture(&mut self, ignore: &dyn Fn(SurfaceLayer) -> bool)
        -> Result<RgbaImage, CaptureError>;

    /// Show or hide toolbar and navigation chrome
    fn set_chrome_visible(&mut self, _visible: bool) {}
}

/// Readiness hook between navigating to a page and capturing it
pub trait RenderWait {
    fn wait_for_render(&self, page: usize);
}

/// Sleeps a fixed time after each page change.
///
/// This only approximates "render complete"; surfaces with a real signal
/// should implement [`RenderWait`] themselves.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl Default for FixedDelay {
    fn default() -> Self {
        Self(DEFAULT_RENDER_DELAY)
    }
}

impl RenderWait for FixedDelay {
    fn wait_for_render(&self, _page: usize) {
        std::thread::sleep(self.0);
    }
}

/// No wait; for surfaces that render synchronously
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl RenderWait for Immediate {
    fn wait_for_render(&self, _page: usize) {}
}
