//! Scriptorium Core Library
//!
//! Per-page annotation state for a manuscript image viewer: measurement
//! tools, page-indexed stores, statistics, and viewer navigation.

pub mod angle;
pub mod annotation;
pub mod crop;
pub mod geometry;
pub mod length;
pub mod page_store;
pub mod palette;
pub mod pen;
pub mod report;
pub mod session;
pub mod stats;
pub mod viewer;

pub use angle::{AngleMeasurement, AnglePhase, AngleTool, DEFAULT_NEAREST_THRESHOLD};
pub use annotation::{AnnotationKind, Comment, Comments, PageAnnotation, PageAnnotations};
pub use crop::{CropPhase, CropTool};
pub use geometry::{angle_between, Point, Rect};
pub use length::{
    LengthMeasurements, LengthRect, MeasurementKind, MeasurementStats, Orientation,
    UnknownMeasurementKind,
};
pub use page_store::PageStore;
pub use palette::{Color, ColorRotation, ParseColorError, STROKE_PALETTE};
pub use pen::{PenProfile, PenTool, Stroke, PEN_ANGLES};
pub use report::{export_stats_csv, CsvExportConfig, CsvExportError, CsvExportResult};
pub use session::{AnnotationSession, SessionSettings, SessionSnapshot};
pub use stats::Mode;
pub use viewer::ViewerState;
