use crate::{Result, TextLine};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Narrower crops are dropped as noise
pub const MIN_LINE_WIDTH: u32 = 150;
/// Taller crops are dropped as blocks of several lines
pub const MAX_LINE_HEIGHT: u32 = 800;

const OVERLAY_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const OVERLAY_OPACITY: f32 = 0.65;

/// A line crop written to disk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineCrop {
    pub id: String,
    pub path: PathBuf,
    /// Line boundary clamped to the page
    pub polygon: Vec<[u32; 2]>,
}

/// Write every acceptable line of `image` to `out_dir` as `line_<n>.jpg`,
/// numbered from 1 in reading order.
pub fn crop_lines(
    image: &DynamicImage,
    lines: &[TextLine],
    out_dir: &Path,
) -> Result<Vec<LineCrop>> {
    std::fs::create_dir_all(out_dir)?;
    let (width, height) = (image.width(), image.height());
    let mut crops = Vec::new();

    for line in lines {
        let Some((x0, y0, x1, y1)) = boundary_extent(&line.boundary, width, height) else {
            tracing::debug!(id = %line.id, "skipping line without boundary");
            continue;
        };
        let (w, h) = (x1 - x0, y1 - y0);
        if w < MIN_LINE_WIDTH || h > MAX_LINE_HEIGHT {
            tracing::debug!(id = %line.id, w, h, "skipping line outside crop limits");
            continue;
        }

        let path = out_dir.join(format!("line_{}.jpg", crops.len() + 1));
        image.crop_imm(x0, y0, w, h).to_rgb8().save(&path)?;
        let polygon = line
            .boundary
            .iter()
            .map(|&[x, y]| [x.min(width - 1), y.min(height - 1)])
            .collect();
        crops.push(LineCrop { id: line.id.clone(), path, polygon });
    }

    tracing::info!(written = crops.len(), of = lines.len(), "wrote line crops");
    Ok(crops)
}

/// `image` with every line box outlined, blended over the original
pub fn draw_overlay(image: &DynamicImage, lines: &[TextLine]) -> RgbImage {
    let original = image.to_rgb8();
    let mut overlay = original.clone();

    for line in lines {
        let [left, top, right, bottom] = line.bbox;
        if right < left || bottom < top {
            continue;
        }
        let (w, h) = (right - left + 1, bottom - top + 1);
        let outer = Rect::at(left as i32, top as i32).of_size(w, h);
        draw_hollow_rect_mut(&mut overlay, outer, OVERLAY_COLOR);
        if w > 2 && h > 2 {
            let inner = Rect::at(left as i32 + 1, top as i32 + 1).of_size(w - 2, h - 2);
            draw_hollow_rect_mut(&mut overlay, inner, OVERLAY_COLOR);
        }
    }

    for (drawn, base) in overlay.pixels_mut().zip(original.pixels()) {
        for (channel, &under) in drawn.0.iter_mut().zip(&base.0) {
            let blended =
                OVERLAY_OPACITY * f32::from(*channel) + (1.0 - OVERLAY_OPACITY) * f32::from(under);
            *channel = blended.round().clamp(0.0, 255.0) as u8;
        }
    }
    overlay
}

/// Clamped `(x0, y0, x1, y1)` of a boundary with `x1`/`y1` exclusive,
/// at least one pixel each way
fn boundary_extent(
    boundary: &[[u32; 2]],
    width: u32,
    height: u32,
) -> Option<(u32, u32, u32, u32)> {
    if boundary.len() < 2 || width == 0 || height == 0 {
        return None;
    }
    let xs = boundary.iter().map(|p| p[0]);
    let ys = boundary.iter().map(|p| p[1]);
    let (min_x, max_x) = (xs.clone().min()?, xs.max()?);
    let (min_y, max_y) = (ys.clone().min()?, ys.max()?);

    let x0 = min_x.min(width - 1);
    let y0 = min_y.min(height - 1);
    let mut x1 = max_x.min(width);
    let mut y1 = max_y.min(height);
    if x1 <= x0 {
        x1 = (x0 + 1).min(width);
    }
    if y1 <= y0 {
        y1 = (y0 + 1).min(height);
    }
    Some((x0, y0, x1, y1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment_lines;
    use crate::tests::page;

    #[test]
    fn crops_are_numbered_in_reading_order() {
        let image = page(400, 300, &[(40, 360, 50), (40, 360, 120), (40, 360, 190)], 12);
        let lines = segment_lines(&image).expect("segmentation should succeed");
        let dir = tempfile::tempdir().expect("temp dir should be created");

        let crops = crop_lines(&image, &lines, dir.path()).expect("crops should be written");

        assert_eq!(crops.len(), 3);
        for (index, crop) in crops.iter().enumerate() {
            assert_eq!(crop.path, dir.path().join(format!("line_{}.jpg", index + 1)));
            let written = image::open(&crop.path).expect("crop should be readable");
            let [left, top, right, bottom] = lines[index].bbox;
            assert_eq!((written.width(), written.height()), (right - left, bottom - top));
        }
    }

    #[test]
    fn narrow_and_degenerate_lines_are_skipped() {
        let image = page(400, 300, &[], 0);
        let lines = vec![
            TextLine::new(0, 10, 10, 100, 30),
            TextLine { id: "line_1".into(), boundary: vec![[5, 5]], bbox: [5, 5, 5, 5] },
            TextLine::new(2, 0, 200, 399, 230),
        ];
        let dir = tempfile::tempdir().expect("temp dir should be created");

        let crops = crop_lines(&image, &lines, dir.path()).expect("crops should be written");

        assert_eq!(crops.len(), 1);
        assert_eq!(crops[0].id, "line_2");
        assert_eq!(crops[0].path, dir.path().join("line_1.jpg"));
    }

    #[test]
    fn boundary_extent_is_clamped_to_the_page() {
        assert_eq!(boundary_extent(&[[10, 10], [500, 40]], 400, 300), Some((10, 10, 400, 40)));
        assert_eq!(boundary_extent(&[[450, 20], [460, 20]], 400, 300), Some((399, 20, 400, 21)));
        assert_eq!(boundary_extent(&[[1, 1]], 400, 300), None);
    }

    #[test]
    fn overlay_outlines_lines_in_translucent_blue() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(60, 40, Rgb([255, 255, 255])));
        let lines = vec![TextLine::new(0, 10, 10, 50, 30)];

        let overlay = draw_overlay(&image, &lines);

        assert_eq!(overlay.get_pixel(10, 20), &Rgb([89, 89, 255]));
        assert_eq!(overlay.get_pixel(11, 20), &Rgb([89, 89, 255]));
        assert_eq!(overlay.get_pixel(30, 20), &Rgb([255, 255, 255]));
        assert_eq!(overlay.get_pixel(5, 5), &Rgb([255, 255, 255]));
    }
}
