//! Page navigation and display scale

use crate::geometry::Point;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerState {
    images: Vec<String>,
    current_page: usize,
    page_input: usize,
    scaling_factor: f64,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self { images: Vec::new(), current_page: 0, page_input: 1, scaling_factor: 1.0 }
    }
}

impl ViewerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_images(images: Vec<String>) -> Self {
        let mut viewer = Self::new();
        viewer.set_images(images);
        viewer
    }

    /// Replace the page images and jump back to the first page
    pub fn set_images(&mut self, images: Vec<String>) {
        self.images = images;
        self.current_page = 0;
        self.page_input = 1;
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn total_pages(&self) -> usize {
        self.images.len()
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// One-based page number shown in the page field
    pub fn page_input(&self) -> usize {
        self.page_input
    }

    pub fn current_image(&self) -> Option<&str> {
        self.images.get(self.current_page).map(String::as_str)
    }

    /// Displayed width over natural width of the current image
    pub fn scaling_factor(&self) -> f64 {
        self.scaling_factor
    }

    /// Derive the scale from the rendered image.
    ///
    /// A zero natural width falls back to the displayed width, and a zero
    /// displayed width to 1.
    pub fn set_scaling_from_image(&mut self, displayed_width: f64, natural_width: f64) {
        let natural = [natural_width, displayed_width]
            .into_iter()
            .find(|width| *width > 0.0)
            .unwrap_or(1.0);
        self.scaling_factor = displayed_width / natural;
    }

    /// Jump to `page`, clamped into the document
    pub fn go_to_page(&mut self, page: usize) {
        let index = page.min(self.total_pages().saturating_sub(1));
        self.current_page = index;
        self.page_input = index + 1;
    }

    /// Jump to a one-based page number as typed by the user
    pub fn go_to_page_input(&mut self, page_number: usize) {
        self.go_to_page(page_number.saturating_sub(1));
    }

    pub fn next_page(&mut self) {
        if self.current_page + 1 < self.total_pages() {
            self.go_to_page(self.current_page + 1);
        }
    }

    pub fn prev_page(&mut self) {
        if self.current_page > 0 {
            self.go_to_page(self.current_page - 1);
        }
    }

    /// Convert a viewer position into natural image pixels
    pub fn to_source(&self, point: Point) -> Point {
        if self.scaling_factor > 0.0 {
            Point::new(point.x / self.scaling_factor, point.y / self.scaling_factor)
        } else {
            point
        }
    }
}
