//! Page annotations and comments
//!
//! Everything the user leaves on a page other than length measurements:
//! highlights, underlines, committed pen strokes, committed angles, and
//! free-text comments pinned to a position.

use crate::angle::AngleMeasurement;
use crate::geometry::{Point, Rect};
use crate::page_store::PageStore;
use crate::palette::Color;
use crate::pen::Stroke;
use serde::{Deserialize, Serialize};

/// Discriminant of a [`PageAnnotation`], used for bulk removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnotationKind {
    Highlight,
    Underline,
    Trace,
    Measure,
}

/// One mark on a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PageAnnotation {
    Highlight { rect: Rect, color: Color },
    Underline { start: Point, end: Point, color: Color },
    Trace(Stroke),
    Measure(AngleMeasurement),
}

impl PageAnnotation {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            PageAnnotation::Highlight { .. } => AnnotationKind::Highlight,
            PageAnnotation::Underline { .. } => AnnotationKind::Underline,
            PageAnnotation::Trace(_) => AnnotationKind::Trace,
            PageAnnotation::Measure(_) => AnnotationKind::Measure,
        }
    }
}

/// Free-text note pinned to a page position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    pub x: f64,
    pub y: f64,
}

impl Comment {
    pub fn new(text: impl Into<String>, at: Point) -> Self {
        Self { text: text.into(), x: at.x, y: at.y }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Committed annotations per page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageAnnotations {
    store: PageStore<PageAnnotation>,
}

impl PageAnnotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, page: usize, annotation: PageAnnotation, total_pages: usize) {
        self.store.append(page, annotation, total_pages);
    }

    /// Overwrite the annotation at `index`; stale indices are ignored
    pub fn replace_at(&mut self, page: usize, index: usize, annotation: PageAnnotation) -> bool {
        self.store.replace(page, index, annotation)
    }

    pub fn remove_kind(&mut self, page: usize, kind: AnnotationKind) {
        self.store.remove_where(page, |annotation| annotation.kind() == kind);
    }

    pub fn clear_page(&mut self, page: usize) {
        self.store.clear(page);
    }

    pub fn page(&self, page: usize) -> &[PageAnnotation] {
        self.store.page(page)
    }

    pub fn len(&self) -> usize {
        self.store.item_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Comments per page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Comments {
    store: PageStore<Comment>,
}

impl Comments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, page: usize, comment: Comment, total_pages: usize) {
        self.store.append(page, comment, total_pages);
    }

    pub fn clear(&mut self, page: usize) {
        self.store.clear(page);
    }

    pub fn page(&self, page: usize) -> &[Comment] {
        self.store.page(page)
    }
}
