use crate::{ExportError, Result, RgbaImage};
use image::{imageops, DynamicImage, ImageFormat};
use scriptorium_core::Rect;
use std::io::Cursor;

/// Cut `region` out of a captured page and encode it as PNG.
///
/// `region` is in viewer coordinates; `scale` maps them to raster pixels.
/// The region is clipped to the raster.
pub fn crop_raster(raster: &RgbaImage, region: Rect, scale: f64) -> Result<Vec<u8>> {
    let region = region.scaled(scale);
    let x0 = region.x.max(0.0).floor() as u32;
    let y0 = region.y.max(0.0).floor() as u32;
    let x1 = ((region.x + region.width).ceil().max(0.0) as u32).min(raster.width());
    let y1 = ((region.y + region.height).ceil().max(0.0) as u32).min(raster.height());

    if x1 <= x0 || y1 <= y0 {
        return Err(ExportError::EmptyCrop);
    }

    let cropped = imageops::crop_imm(raster, x0, y0, x1 - x0, y1 - y0).to_image();
    let mut png = Vec::new();
    DynamicImage::ImageRgba8(cropped).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}
