//! Text line segmentation of manuscript pages
//!
//! A page is binarized with Otsu's threshold and split into text columns by
//! smoothed ink density. Inside every column, ink is closed horizontally so
//! letters of one line merge, then eroded slightly in height so neighbouring
//! lines come apart. Each remaining connected component of plausible size is
//! a text line.

mod morph;
mod render;

use image::{DynamicImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use morph::{moving_average, InkMask};
use serde::Serialize;

pub use render::{crop_lines, draw_overlay, LineCrop, MAX_LINE_HEIGHT, MIN_LINE_WIDTH};

/// Width of the moving average used to find text columns
const COLUMN_SMOOTHING: usize = 31;
/// Narrowest ink block accepted as a text column
const MIN_COLUMN_WIDTH: usize = 40;
/// Margin added around every detected line
const LINE_PADDING: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum SegmentError {
    #[error("image has no pixels")]
    EmptyImage,
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SegmentError>;

/// One text line, in pixel coordinates of the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextLine {
    pub id: String,
    /// Corners clockwise from top left
    pub boundary: Vec<[u32; 2]>,
    /// Inclusive `[left, top, right, bottom]`
    pub bbox: [u32; 4],
}

impl TextLine {
    pub fn new(index: usize, left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            id: format!("line_{index}"),
            boundary: vec![[left, top], [right, top], [right, bottom], [left, bottom]],
            bbox: [left, top, right, bottom],
        }
    }

    pub fn top(&self) -> u32 {
        self.bbox[1]
    }
}

/// Detect the text lines of a page, sorted top to bottom.
///
/// A page where no line survives the size filters comes back as a single
/// line covering the whole page.
pub fn segment_lines(image: &DynamicImage) -> Result<Vec<TextLine>> {
    let gray = image.to_luma8();
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Err(SegmentError::EmptyImage);
    }

    let level = imageproc::contrast::otsu_level(&gray);
    tracing::debug!(level, width, height, "binarizing page");
    let ink = InkMask::from_gray(&gray, level);

    let mut lines = Vec::new();
    for (x0, x1) in column_regions(&ink) {
        let region = ink.columns(x0, x1);
        for [left, top, right, bottom] in segment_region(&region) {
            let right = (right + x0).min(width as usize - 1);
            let bottom = bottom.min(height as usize - 1);
            lines.push(TextLine::new(
                lines.len(),
                (left + x0) as u32,
                top as u32,
                right as u32,
                bottom as u32,
            ));
        }
    }

    if lines.is_empty() {
        tracing::debug!("no text lines found, using the whole page");
        lines.push(TextLine::new(0, 0, 0, width - 1, height - 1));
    }
    lines.sort_by_key(TextLine::top);
    tracing::info!(lines = lines.len(), "segmented page");
    Ok(lines)
}

/// Horizontal spans `[x0, x1)` of text columns; the full width when no
/// column stands out
fn column_regions(ink: &InkMask) -> Vec<(usize, usize)> {
    let width = ink.width();
    let smooth = moving_average(&ink.column_counts(), COLUMN_SMOOTHING);
    let peak = smooth.iter().copied().fold(0.0f32, f32::max);
    let threshold = (0.08 * peak).max(8.0);

    let mut blocks = Vec::new();
    let mut start = None;
    for (x, &value) in smooth.iter().enumerate() {
        match start {
            None if value > threshold => start = Some(x),
            Some(s) if value <= threshold => {
                if x - s >= MIN_COLUMN_WIDTH {
                    blocks.push((s, x));
                }
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        if width - s >= MIN_COLUMN_WIDTH {
            blocks.push((s, width));
        }
    }

    if blocks.is_empty() {
        blocks.push((0, width));
    }
    tracing::debug!(?blocks, "text columns");
    blocks
}

/// Line boxes `[left, top, right, bottom]` of one column, in column
/// coordinates
fn segment_region(ink: &InkMask) -> Vec<[usize; 4]> {
    let (width, height) = (ink.width(), ink.height());
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let kx = (width / 40).max(25);
    let ky = (height / 120).max(3);
    let separated = ink.dilate_rows(kx).erode_rows(kx).erode_columns(ky);

    let labels = connected_components(&separated.to_luma(), Connectivity::Eight, Luma([0u8]));
    let mut extents: Vec<Option<[usize; 4]>> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label.0[0] as usize;
        if label == 0 {
            continue;
        }
        if extents.len() < label {
            extents.resize(label, None);
        }
        let (x, y) = (x as usize, y as usize);
        let extent = extents[label - 1].get_or_insert([x, y, x, y]);
        extent[0] = extent[0].min(x);
        extent[1] = extent[1].min(y);
        extent[2] = extent[2].max(x);
        extent[3] = extent[3].max(y);
    }

    let min_h = (height / 200).max(8);
    let max_h = (height / 6).min(180).max(min_h);
    let min_w = (width / 8).max(40);

    let mut boxes: Vec<[usize; 4]> = extents
        .into_iter()
        .flatten()
        .filter_map(|[x0, y0, x1, y1]| {
            let (w, h) = (x1 - x0 + 1, y1 - y0 + 1);
            if h < min_h || h > max_h || w < min_w {
                return None;
            }
            Some([
                x0.saturating_sub(LINE_PADDING),
                y0.saturating_sub(LINE_PADDING),
                (x0 + w + LINE_PADDING).min(width - 1),
                (y0 + h + LINE_PADDING).min(height - 1),
            ])
        })
        .collect();
    boxes.sort_by_key(|b| b[1]);
    boxes
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// Light page with dark bars `bar_height` tall at every `(x0, x1, top)`
    pub(crate) fn page(
        width: u32,
        height: u32,
        bars: &[(u32, u32, u32)],
        bar_height: u32,
    ) -> DynamicImage {
        let mut image = RgbImage::from_pixel(width, height, Rgb([250, 246, 236]));
        for &(x0, x1, top) in bars {
            for y in top..top + bar_height {
                for x in x0..x1 {
                    image.put_pixel(x, y, Rgb([20, 20, 30]));
                }
            }
        }
        DynamicImage::ImageRgb8(image)
    }

    #[test]
    fn separate_bars_become_separate_lines() {
        let image = page(400, 300, &[(40, 360, 50), (40, 360, 120), (40, 360, 190)], 12);

        let lines = segment_lines(&image).expect("segmentation should succeed");

        assert_eq!(lines.len(), 3);
        for (line, top) in lines.iter().zip([50, 120, 190]) {
            let [left, upper, right, lower] = line.bbox;
            assert!(upper <= top && lower >= top + 11, "{line:?} should cover bar at {top}");
            assert!(left <= 40 && right >= 359, "{line:?} should span the bar");
            assert!(lower - upper < 30, "{line:?} should not swallow a neighbour");
        }
        assert_eq!(lines[0].boundary[2], [lines[0].bbox[2], lines[0].bbox[3]]);
    }

    #[test]
    fn blank_page_is_one_line() {
        let image = page(200, 100, &[(10, 12, 10), (150, 151, 80)], 2);

        let lines = segment_lines(&image).expect("segmentation should succeed");

        assert_eq!(lines, vec![TextLine::new(0, 0, 0, 199, 99)]);
    }

    #[test]
    fn two_columns_are_segmented_independently() {
        let bars: Vec<_> = [50, 120, 190]
            .into_iter()
            .flat_map(|top| [(40, 360, top), (440, 760, top)])
            .collect();
        let image = page(800, 300, &bars, 12);

        let lines = segment_lines(&image).expect("segmentation should succeed");

        assert_eq!(lines.len(), 6);
        assert!(lines.windows(2).all(|pair| pair[0].top() <= pair[1].top()));
        let left_column = lines.iter().filter(|line| line.bbox[2] < 400).count();
        assert_eq!(left_column, 3);

        let mut ids: Vec<_> = lines.iter().map(|line| line.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 6);
    }

    #[test]
    fn empty_image_is_rejected() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        assert!(matches!(segment_lines(&image), Err(SegmentError::EmptyImage)));
    }

    #[test]
    fn line_serializes_with_boundary_and_bbox() {
        let value =
            serde_json::to_value(TextLine::new(4, 1, 2, 30, 12)).expect("line should serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "id": "line_4",
                "boundary": [[1, 2], [30, 2], [30, 12], [1, 12]],
                "bbox": [1, 2, 30, 12],
            })
        );
    }
}
