//! Annotated page export
//!
//! Walks every page of a document through a [`CaptureSurface`], rasterizes
//! what is on screen, and assembles the rasters into a single PDF.

mod crop;
mod file_surface;
mod orchestrator;
mod overlay;
mod pdf;
mod surface;

pub use crop::crop_raster;
pub use file_surface::{FileSurface, DEFAULT_CAPTURE_SCALE};
pub use orchestrator::{ExportedDocument, PdfExporter, DEFAULT_EXPORT_FILE_NAME};
pub use pdf::assemble_pdf;
pub use surface::{
    CaptureSurface, FixedDelay, Immediate, PageNavigator, RenderWait, SurfaceLayer,
    DEFAULT_RENDER_DELAY,
};

pub type RgbaImage = image::RgbaImage;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("page {page} has no image")]
    NoImage { page: usize },
    #[error("failed to load page image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to fetch page image {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: scriptorium_iiif::ManifestError,
    },
    #[error("surface error: {0}")]
    Surface(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("capture of page {page} failed: {source}")]
    Capture {
        page: usize,
        #[source]
        source: CaptureError,
    },
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("image encoding error: {0}")]
    Encode(#[from] image::ImageError),
    #[error("crop region is empty")]
    EmptyCrop,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;
