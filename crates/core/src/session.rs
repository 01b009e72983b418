//! Annotation session
//!
//! [`AnnotationSession`] owns the viewer and every per-document tool and
//! store. Loading a new image list rebuilds the whole tree so no state leaks
//! from one document into the next.

use crate::angle::{AngleMeasurement, AngleTool, DEFAULT_NEAREST_THRESHOLD};
use crate::annotation::{Comment, Comments, PageAnnotation, PageAnnotations};
use crate::crop::CropTool;
use crate::geometry::{Point, Rect};
use crate::length::{LengthMeasurements, MeasurementKind, MeasurementStats};
use crate::palette::Color;
use crate::pen::PenTool;
use crate::viewer::ViewerState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Settings that survive a document reload
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Pick radius for grabbing angle points
    pub nearest_threshold: f64,
    /// Per-kind color overrides applied on top of the defaults
    pub measurement_colors: BTreeMap<MeasurementKind, Color>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { nearest_threshold: DEFAULT_NEAREST_THRESHOLD, measurement_colors: BTreeMap::new() }
    }
}

/// Persistable state of a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub images: Vec<String>,
    #[serde(default)]
    pub annotations: PageAnnotations,
    #[serde(default)]
    pub comments: Comments,
    #[serde(default)]
    pub lengths: LengthMeasurements,
}

#[derive(Debug, Clone, Default)]
pub struct AnnotationSession {
    settings: SessionSettings,
    pub viewer: ViewerState,
    pub angle: AngleTool,
    pub pen: PenTool,
    pub crop: CropTool,
    pub lengths: LengthMeasurements,
    pub annotations: PageAnnotations,
    pub comments: Comments,
}

impl AnnotationSession {
    pub fn new(settings: SessionSettings) -> Self {
        let lengths = LengthMeasurements::with_colors(&settings.measurement_colors);
        Self { settings, lengths, ..Self::default() }
    }

    /// Restore a saved session, re-applying `settings`' color overrides
    pub fn from_snapshot(snapshot: SessionSnapshot, settings: SessionSettings) -> Self {
        let mut session = Self::new(settings);
        session.viewer.set_images(snapshot.images);
        session.annotations = snapshot.annotations;
        session.comments = snapshot.comments;
        session.lengths = snapshot.lengths;
        for (kind, color) in &session.settings.measurement_colors {
            session.lengths.set_color(*kind, *color);
        }
        session
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            images: self.viewer.images().to_vec(),
            annotations: self.annotations.clone(),
            comments: self.comments.clone(),
            lengths: self.lengths.clone(),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Open a new document, discarding every annotation of the previous one
    pub fn load_images(&mut self, images: Vec<String>) {
        tracing::debug!(pages = images.len(), "loading document images");
        let settings = std::mem::take(&mut self.settings);
        *self = Self::new(settings);
        self.viewer.set_images(images);
    }

    pub fn total_pages(&self) -> usize {
        self.viewer.total_pages()
    }

    pub fn current_page(&self) -> usize {
        self.viewer.current_page()
    }

    /// Grab the angle point under the cursor using the configured radius
    pub fn grab_angle_point(&mut self, at: Point) -> Option<usize> {
        self.angle.begin_drag(at.x, at.y, self.settings.nearest_threshold)
    }

    /// Move a finished angle onto the current page and clear the tool
    pub fn commit_angle(&mut self) -> Option<AngleMeasurement> {
        let measurement = self.angle.measurement()?;
        let (page, total) = (self.current_page(), self.total_pages());
        self.annotations.add(page, PageAnnotation::Measure(measurement.clone()), total);
        self.angle.reset();
        Some(measurement)
    }

    /// Close the active pen stroke, keeping it as a trace when `commit` is set
    pub fn finish_stroke(&mut self, commit: bool) -> bool {
        let Some(stroke) = self.pen.end_stroke(commit) else {
            return false;
        };
        let (page, total) = (self.current_page(), self.total_pages());
        self.annotations.add(page, PageAnnotation::Trace(stroke), total);
        true
    }

    pub fn add_comment(&mut self, text: impl Into<String>, at: Point) {
        let (page, total) = (self.current_page(), self.total_pages());
        self.comments.add(page, Comment::new(text, at), total);
    }

    /// Record a rectangle of the selected measurement kind on the current page
    pub fn add_length(&mut self, rect: Rect) -> String {
        let kind = self.lengths.selected();
        self.lengths.add_measurement(kind, self.current_page(), rect)
    }

    pub fn page_stats(&self, page: usize) -> BTreeMap<MeasurementKind, MeasurementStats> {
        self.lengths.stats_for_page(page)
    }

    pub fn document_stats(&self) -> BTreeMap<MeasurementKind, MeasurementStats> {
        self.lengths.stats_for_document(self.total_pages())
    }

    /// Whether anything was drawn or written on `page`
    pub fn page_has_content(&self, page: usize) -> bool {
        !self.annotations.page(page).is_empty()
            || !self.comments.page(page).is_empty()
            || self.lengths.has_page_content(page)
    }
}
