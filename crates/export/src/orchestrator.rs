use crate::pdf::assemble_pdf;
use crate::surface::{CaptureSurface, FixedDelay, PageNavigator, RenderWait};
use crate::{ExportError, Result, RgbaImage};
use std::path::{Path, PathBuf};

pub const DEFAULT_EXPORT_FILE_NAME: &str = "annotated-document.pdf";

/// A finished PDF and the name it should be saved under
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ExportedDocument {
    /// Save into `dir` under the document's file name
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Captures pages one by one and assembles them into a PDF
#[derive(Debug, Clone)]
pub struct PdfExporter<W = FixedDelay> {
    wait: W,
    file_name: String,
}

impl Default for PdfExporter<FixedDelay> {
    fn default() -> Self {
        Self::with_wait(FixedDelay::default())
    }
}

impl PdfExporter<FixedDelay> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<W: RenderWait> PdfExporter<W> {
    pub fn with_wait(wait: W) -> Self {
        Self { wait, file_name: DEFAULT_EXPORT_FILE_NAME.to_string() }
    }

    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Capture pages `0..page_count` in order, skipping pages `skip` accepts.
    ///
    /// Chrome is hidden for the duration and shown again whether or not the
    /// capture succeeded. The first failed capture aborts the run.
    pub fn capture_pages<S, F>(
        &self,
        surface: &mut S,
        page_count: usize,
        mut skip: F,
    ) -> Result<Vec<RgbaImage>>
    where
        S: PageNavigator + CaptureSurface,
        F: FnMut(usize) -> bool,
    {
        surface.set_chrome_visible(false);
        let result = self.capture_each(surface, page_count, &mut skip);
        surface.set_chrome_visible(true);
        result
    }

    fn capture_each<S, F>(
        &self,
        surface: &mut S,
        page_count: usize,
        skip: &mut F,
    ) -> Result<Vec<RgbaImage>>
    where
        S: PageNavigator + CaptureSurface,
        F: FnMut(usize) -> bool,
    {
        let mut shots = Vec::with_capacity(page_count);
        for page in 0..page_count {
            surface.go_to_page(page);
            self.wait.wait_for_render(page);

            if skip(page) {
                tracing::debug!(page, "skipping page");
                continue;
            }

            let shot = surface
                .capture(&|layer| layer.is_chrome())
                .map_err(|source| ExportError::Capture { page, source })?;
            tracing::debug!(page, width = shot.width(), height = shot.height(), "captured page");
            shots.push(shot);
        }
        Ok(shots)
    }

    /// Capture every page and return the assembled PDF
    pub fn export<S, F>(&self, surface: &mut S, page_count: usize, skip: F) -> Result<ExportedDocument>
    where
        S: PageNavigator + CaptureSurface,
        F: FnMut(usize) -> bool,
    {
        let shots = self.capture_pages(surface, page_count, skip)?;
        let bytes = assemble_pdf(&shots)?;
        tracing::info!(pages = shots.len(), bytes = bytes.len(), "assembled annotated PDF");
        Ok(ExportedDocument { file_name: self.file_name.clone(), bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{Immediate, SurfaceLayer};
    use crate::CaptureError;
    use image::Rgba;

    /// Surface that logs every call and can be told to fail on one page
    #[derive(Default)]
    struct RecordingSurface {
        page: usize,
        events: Vec<String>,
        fail_on: Option<usize>,
        chrome_visible: bool,
    }

    impl PageNavigator for RecordingSurface {
        fn go_to_page(&mut self, index: usize) {
            self.page = index;
            self.events.push(format!("goto {index}"));
        }
    }

    impl CaptureSurface for RecordingSurface {
        fn capture(
            &mut self,
            ignore: &dyn Fn(SurfaceLayer) -> bool,
        ) -> std::result::Result<RgbaImage, CaptureError> {
            assert!(ignore(SurfaceLayer::Toolbar));
            assert!(ignore(SurfaceLayer::Navigation));
            assert!(!ignore(SurfaceLayer::Page));
            assert!(!ignore(SurfaceLayer::Overlay));

            self.events.push(format!("capture {}", self.page));
            if self.fail_on == Some(self.page) {
                return Err(CaptureError::Surface("canvas lost".into()));
            }
            let width = 10 + self.page as u32;
            Ok(RgbaImage::from_pixel(width, 8, Rgba([200, 10, 10, 255])))
        }

        fn set_chrome_visible(&mut self, visible: bool) {
            self.chrome_visible = visible;
            self.events.push(format!("chrome {visible}"));
        }
    }

    #[test]
    fn pages_are_captured_in_order_with_chrome_hidden() {
        let mut surface = RecordingSurface::default();
        let shots = PdfExporter::with_wait(Immediate)
            .capture_pages(&mut surface, 3, |_| false)
            .expect("capture should succeed");

        assert_eq!(shots.len(), 3);
        assert_eq!(shots[2].width(), 12);
        assert_eq!(
            surface.events,
            vec![
                "chrome false",
                "goto 0",
                "capture 0",
                "goto 1",
                "capture 1",
                "goto 2",
                "capture 2",
                "chrome true",
            ]
        );
    }

    #[test]
    fn skipped_pages_are_visited_but_not_captured() {
        let mut surface = RecordingSurface::default();
        let shots = PdfExporter::with_wait(Immediate)
            .capture_pages(&mut surface, 3, |page| page == 1)
            .expect("capture should succeed");

        assert_eq!(shots.len(), 2);
        assert!(surface.events.contains(&"goto 1".to_string()));
        assert!(!surface.events.contains(&"capture 1".to_string()));
    }

    #[test]
    fn failed_capture_aborts_and_restores_chrome() {
        let mut surface = RecordingSurface { fail_on: Some(1), ..Default::default() };
        let error = PdfExporter::with_wait(Immediate)
            .export(&mut surface, 3, |_| false)
            .unwrap_err();

        assert!(matches!(error, ExportError::Capture { page: 1, .. }));
        assert!(surface.chrome_visible);
        assert!(!surface.events.contains(&"goto 2".to_string()));
        assert_eq!(surface.events.last().map(String::as_str), Some("chrome true"));
    }

    #[test]
    fn export_produces_named_pdf() {
        let mut surface = RecordingSurface::default();
        let document = PdfExporter::with_wait(Immediate)
            .export(&mut surface, 2, |_| false)
            .expect("export should succeed");

        assert_eq!(document.file_name, DEFAULT_EXPORT_FILE_NAME);
        let pdf = lopdf::Document::load_mem(&document.bytes).expect("output should parse");
        assert_eq!(pdf.get_pages().len(), 2);
    }

    #[test]
    fn write_to_uses_file_name() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let document =
            ExportedDocument { file_name: "folio-12r.pdf".into(), bytes: b"%PDF-1.5".to_vec() };

        let path = document.write_to(dir.path()).expect("write should succeed");
        assert_eq!(path, dir.path().join("folio-12r.pdf"));
        assert_eq!(std::fs::read(path).expect("file should exist"), b"%PDF-1.5");
    }
}
