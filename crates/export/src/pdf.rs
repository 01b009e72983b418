use crate::{Result, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

const IMAGE_NAME: &str = "Im0";

/// Build a PDF with one page per raster.
///
/// Each page is exactly as large as its raster (one pixel per point) and
/// carries the raster as an RGB image, plus a soft mask when any pixel is
/// translucent.
pub fn assemble_pdf(rasters: &[RgbaImage]) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(rasters.len());
    for raster in rasters {
        let page_id = add_raster_page(&mut doc, pages_id, raster)?;
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.set_object(
        pages_id,
        dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        },
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let info_id = doc.add_object(dictionary! {
        "Producer" => Object::string_literal(concat!("Scriptorium ", env!("CARGO_PKG_VERSION"))),
    });
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

fn add_raster_page(doc: &mut Document, pages_id: ObjectId, raster: &RgbaImage) -> Result<ObjectId> {
    let (width, height) = (raster.width() as i64, raster.height() as i64);

    let mut rgb = Vec::with_capacity(raster.as_raw().len() / 4 * 3);
    let mut alpha = Vec::with_capacity(raster.as_raw().len() / 4);
    for pixel in raster.pixels() {
        let [r, g, b, a] = pixel.0;
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    let mut image_dict = image_dictionary(width, height, "DeviceRGB");
    if alpha.iter().any(|a| *a < u8::MAX) {
        let mask_id = doc.add_object(Stream::new(image_dictionary(width, height, "DeviceGray"), alpha));
        image_dict.set("SMask", mask_id);
    }
    let image_id = doc.add_object(Stream::new(image_dict, rgb));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![width.into(), 0.into(), 0.into(), height.into(), 0.into(), 0.into()],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                IMAGE_NAME => image_id,
            },
        },
    }))
}

fn image_dictionary(width: i64, height: i64, color_space: &str) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width,
        "Height" => height,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
    }
}
