use crate::crop::crop_raster;
use crate::overlay::draw_page;
use crate::surface::{CaptureSurface, PageNavigator, SurfaceLayer};
use crate::{CaptureError, ExportError, RgbaImage};
use image::imageops::{self, FilterType};
use image::Rgba;
use scriptorium_core::AnnotationSession;
use scriptorium_iiif::{is_remote, HttpFetcher, ImageFetcher};
use std::fmt;
use std::path::{Path, PathBuf};

/// Capture scale applied to the natural image size
pub const DEFAULT_CAPTURE_SCALE: f64 = 1.0;

/// Capture surface over page image files and URLs.
///
/// Local images are read from disk (relative paths resolve against the base
/// directory), `http(s)` images are downloaded through the fetcher. The
/// session's annotations are painted on top.
pub struct FileSurface {
    session: AnnotationSession,
    base_dir: PathBuf,
    capture_scale: f64,
    chrome_visible: bool,
    fetcher: Box<dyn ImageFetcher>,
}

impl fmt::Debug for FileSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSurface")
            .field("base_dir", &self.base_dir)
            .field("capture_scale", &self.capture_scale)
            .field("chrome_visible", &self.chrome_visible)
            .finish_non_exhaustive()
    }
}

impl FileSurface {
    pub fn new(session: AnnotationSession, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            session,
            base_dir: base_dir.into(),
            capture_scale: DEFAULT_CAPTURE_SCALE,
            chrome_visible: true,
            fetcher: Box::new(HttpFetcher::default()),
        }
    }

    pub fn with_fetcher(mut self, fetcher: impl ImageFetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    pub fn with_capture_scale(mut self, scale: f64) -> Self {
        self.capture_scale = scale;
        self
    }

    pub fn session(&self) -> &AnnotationSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut AnnotationSession {
        &mut self.session
    }

    pub fn into_session(self) -> AnnotationSession {
        self.session
    }

    pub fn chrome_visible(&self) -> bool {
        self.chrome_visible
    }

    /// Rasterize the session's crop region on the current page.
    ///
    /// The PNG is stored on the crop tool and returned.
    pub fn capture_crop(&mut self) -> crate::Result<Vec<u8>> {
        let region = self.session.crop.region().ok_or(ExportError::EmptyCrop)?;
        let page = self.session.current_page();
        let raster = self
            .capture(&|layer| layer.is_chrome())
            .map_err(|source| ExportError::Capture { page, source })?;

        let png = crop_raster(&raster, region, self.viewer_to_raster())?;
        self.session.crop.capture(png.clone());
        Ok(png)
    }

    /// Factor from viewer coordinates to captured raster pixels
    fn viewer_to_raster(&self) -> f64 {
        let viewer_scale = self.session.viewer.scaling_factor();
        let to_natural = if viewer_scale > 0.0 { 1.0 / viewer_scale } else { 1.0 };
        let scale = if self.capture_scale > 0.0 { self.capture_scale } else { 1.0 };
        to_natural * scale
    }

    fn resolve(&self, image: &str) -> PathBuf {
        let path = Path::new(image);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    fn decode(&self, location: &str) -> Result<RgbaImage, CaptureError> {
        if is_remote(location) {
            let bytes = self
                .fetcher
                .fetch_image(location)
                .map_err(|source| CaptureError::Fetch { url: location.to_string(), source })?;
            let decoded = image::load_from_memory(&bytes)
                .map_err(|source| CaptureError::Image { path: location.to_string(), source })?;
            return Ok(decoded.into_rgba8());
        }

        let path = self.resolve(location);
        let decoded = image::open(&path)
            .map_err(|source| CaptureError::Image { path: path.display().to_string(), source })?;
        Ok(decoded.into_rgba8())
    }

    fn load_current(&self) -> Result<RgbaImage, CaptureError> {
        let page = self.session.current_page();
        let location = self.session.viewer.current_image().ok_or(CaptureError::NoImage { page })?;
        let decoded = self.decode(location)?;

        if (self.capture_scale - 1.0).abs() < f64::EPSILON || self.capture_scale <= 0.0 {
            return Ok(decoded);
        }
        let width = ((decoded.width() as f64) * self.capture_scale).round().max(1.0) as u32;
        let height = ((decoded.height() as f64) * self.capture_scale).round().max(1.0) as u32;
        Ok(imageops::resize(&decoded, width, height, FilterType::Triangle))
    }
}

impl PageNavigator for FileSurface {
    fn go_to_page(&mut self, index: usize) {
        self.session.viewer.go_to_page(index);
    }
}

impl CaptureSurface for FileSurface {
    fn capture(&mut self, ignore: &dyn Fn(SurfaceLayer) -> bool) -> Result<RgbaImage, CaptureError> {
        let mut image = self.load_current()?;
        if ignore(SurfaceLayer::Page) {
            image = RgbaImage::from_pixel(image.width(), image.height(), Rgba([255, 255, 255, 255]));
        }

        if !ignore(SurfaceLayer::Overlay) {
            let factor = self.viewer_to_raster();
            draw_page(&mut image, &self.session, self.session.current_page(), factor);
        }

        Ok(image)
    }

    fn set_chrome_visible(&mut self, visible: bool) {
        self.chrome_visible = visible;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::PdfExporter;
    use crate::surface::Immediate;
    use scriptorium_core::{Rect, SessionSettings};
    use scriptorium_iiif::ManifestError;
    use std::collections::HashMap;
    use std::io::Cursor;

    /// Serves encoded pages from memory, keyed by URL
    struct StubImages(HashMap<String, Vec<u8>>);

    impl ImageFetcher for StubImages {
        fn fetch_image(&self, url: &str) -> scriptorium_iiif::Result<Vec<u8>> {
            self.0.get(url).cloned().ok_or(ManifestError::Status { status: 404 })
        }
    }

    fn encoded_page(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        let page = RgbaImage::from_pixel(width, height, Rgba([200, 190, 170, 255]));
        image::DynamicImage::ImageRgba8(page)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("page should encode");
        bytes
    }

    fn write_page(dir: &Path, name: &str, width: u32, height: u32) {
        RgbaImage::from_pixel(width, height, Rgba([240, 230, 210, 255]))
            .save(dir.join(name))
            .expect("page image should be written");
    }

    fn session(images: &[&str]) -> AnnotationSession {
        let mut session = AnnotationSession::new(SessionSettings::default());
        session.load_images(images.iter().map(|s| s.to_string()).collect());
        session
    }

    #[test]
    fn capture_paints_annotations_over_page() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        write_page(dir.path(), "f1r.png", 20, 20);

        let mut session = session(&["f1r.png"]);
        session.add_length(Rect::new(0.0, 0.0, 10.0, 10.0));
        let mut surface = FileSurface::new(session, dir.path());

        let image = surface.capture(&|layer| layer.is_chrome()).expect("capture should succeed");
        assert_eq!(image.dimensions(), (20, 20));
        assert_ne!(image.get_pixel(5, 5), &Rgba([240, 230, 210, 255]));
        assert_eq!(image.get_pixel(15, 15), &Rgba([240, 230, 210, 255]));
    }

    #[test]
    fn ignoring_page_layer_gives_white_canvas() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        write_page(dir.path(), "f1v.png", 8, 6);
        let mut surface = FileSurface::new(session(&["f1v.png"]), dir.path());

        let image = surface
            .capture(&|layer| layer != SurfaceLayer::Overlay)
            .expect("capture should succeed");
        assert_eq!(image.dimensions(), (8, 6));
        assert!(image.pixels().all(|p| *p == Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn capture_scale_resizes_output() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        write_page(dir.path(), "f2r.png", 10, 4);
        let mut surface = FileSurface::new(session(&["f2r.png"]), dir.path()).with_capture_scale(2.0);

        let image = surface.capture(&|_| false).expect("capture should succeed");
        assert_eq!(image.dimensions(), (20, 8));
    }

    #[test]
    fn export_over_files_skips_empty_pages() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        for name in ["p1.png", "p2.png", "p3.png"] {
            write_page(dir.path(), name, 16, 12);
        }

        let mut session = session(&["p1.png", "p2.png", "p3.png"]);
        session.viewer.go_to_page(2);
        session.add_comment("erasure", scriptorium_core::Point::new(4.0, 4.0));
        let mut surface = FileSurface::new(session, dir.path());

        let exporter = PdfExporter::with_wait(Immediate);
        let skip_empty = {
            let annotated: Vec<bool> =
                (0..3).map(|page| surface.session().page_has_content(page)).collect();
            move |page: usize| !annotated[page]
        };
        let document = exporter.export(&mut surface, 3, skip_empty).expect("export should succeed");

        let pdf = lopdf::Document::load_mem(&document.bytes).expect("output should parse");
        assert_eq!(pdf.get_pages().len(), 1);
        assert!(surface.chrome_visible());
    }

    #[test]
    fn crop_is_stored_on_the_session() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        write_page(dir.path(), "f3r.png", 40, 30);
        let mut surface = FileSurface::new(session(&["f3r.png"]), dir.path());
        surface.session_mut().viewer.set_scaling_from_image(20.0, 40.0);

        {
            let crop = &mut surface.session_mut().crop;
            crop.start();
            crop.begin(scriptorium_core::Point::new(10.0, 10.0));
            crop.update_to(scriptorium_core::Point::new(2.0, 4.0));
        }

        let png = surface.capture_crop().expect("crop should succeed");
        let decoded = image::load_from_memory(&png).expect("PNG should decode");
        assert_eq!((decoded.width(), decoded.height()), (16, 12));
        assert_eq!(surface.session().crop.captured(), Some(png.as_slice()));
    }

    #[test]
    fn crop_without_region_fails() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        write_page(dir.path(), "f3v.png", 4, 4);
        let mut surface = FileSurface::new(session(&["f3v.png"]), dir.path());
        assert!(matches!(surface.capture_crop(), Err(ExportError::EmptyCrop)));
    }

    #[test]
    fn remote_pages_are_fetched() {
        let url = "https://iiif.example.org/f1r/full/full/0/default.jpg";
        let images = StubImages(HashMap::from([(url.to_string(), encoded_page(12, 9))]));
        let mut session = session(&[url]);
        session.add_length(Rect::new(0.0, 0.0, 4.0, 4.0));

        let dir = tempfile::tempdir().expect("tempdir should be created");
        let mut surface = FileSurface::new(session, dir.path()).with_fetcher(images);

        let image = surface.capture(&|layer| layer.is_chrome()).expect("capture should succeed");
        assert_eq!(image.dimensions(), (12, 9));
        assert_ne!(image.get_pixel(1, 1), &Rgba([200, 190, 170, 255]));
    }

    #[test]
    fn failed_download_aborts_export() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let session = session(&["https://iiif.example.org/gone/full/full/0/default.jpg"]);
        let mut surface =
            FileSurface::new(session, dir.path()).with_fetcher(StubImages(HashMap::new()));

        let error = PdfExporter::with_wait(Immediate)
            .export(&mut surface, 1, |_| false)
            .unwrap_err();
        assert!(matches!(
            error,
            ExportError::Capture {
                page: 0,
                source: CaptureError::Fetch { source: ManifestError::Status { status: 404 }, .. }
            }
        ));
    }

    #[test]
    fn missing_image_aborts_export() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        write_page(dir.path(), "present.png", 4, 4);
        let mut surface = FileSurface::new(session(&["present.png", "absent.png"]), dir.path());

        let error = PdfExporter::with_wait(Immediate)
            .export(&mut surface, 2, |_| false)
            .unwrap_err();
        assert!(matches!(
            error,
            ExportError::Capture { page: 1, source: CaptureError::Image { .. } }
        ));
    }
}
