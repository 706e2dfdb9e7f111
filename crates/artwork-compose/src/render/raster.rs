//! Image XObjects for raster artwork
//!
//! PNG data is decoded and re-encoded with Flate, keeping grayscale images
//! in DeviceGray and splitting alpha into a soft mask. JPEG data is copied
//! through untouched with `DCTDecode`; only its headers are read, for the
//! size and the color space, so CMYK JPEGs stay CMYK.

use crate::types::{ComposeError, MimeKind, Result, SourceColorSpace};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{ColorType, DynamicImage, GenericImageView};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::{Cursor, Write};
use zune_jpeg::zune_core::colorspace::ColorSpace;
use zune_jpeg::JpegDecoder;

/// An image added to the output document
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageXObject {
    pub id: ObjectId,
    pub width: u32,
    pub height: u32,
    pub color_space: SourceColorSpace,
}

/// Add raster bytes of `kind` as an image XObject.
pub fn add_raster_image(doc: &mut Document, bytes: &[u8], kind: MimeKind) -> Result<ImageXObject> {
    match kind {
        MimeKind::RasterJpeg => add_jpeg(doc, bytes),
        MimeKind::RasterPng => add_png(doc, bytes),
        other => Err(ComposeError::Config(format!("{:?} is not a raster format", other))),
    }
}

/// Color space declared by raster bytes, `Unknown` when it cannot be read
pub fn detect_color_space(bytes: &[u8], kind: MimeKind) -> SourceColorSpace {
    match kind {
        MimeKind::RasterJpeg => match jpeg_metadata(bytes) {
            Ok(metadata) => metadata.source_space(),
            Err(_) => SourceColorSpace::Unknown,
        },
        MimeKind::RasterPng => match image::load_from_memory_with_format(bytes, image::ImageFormat::Png) {
            Ok(decoded) if is_gray(decoded.color()) => SourceColorSpace::Grayscale,
            Ok(_) => SourceColorSpace::Rgb,
            Err(_) => SourceColorSpace::Unknown,
        },
        MimeKind::VectorPdf | MimeKind::VectorSvg => SourceColorSpace::Unknown,
    }
}

fn is_gray(color: ColorType) -> bool {
    matches!(
        color,
        ColorType::L8 | ColorType::La8 | ColorType::L16 | ColorType::La16
    )
}

fn add_png(doc: &mut Document, bytes: &[u8]) -> Result<ImageXObject> {
    let decoded = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)?;
    let (width, height) = decoded.dimensions();
    let gray = is_gray(decoded.color());
    let has_alpha = decoded.color().has_alpha();

    let (samples, color_space, detected) = if gray {
        (decoded.to_luma8().into_raw(), "DeviceGray", SourceColorSpace::Grayscale)
    } else {
        (decoded.to_rgb8().into_raw(), "DeviceRGB", SourceColorSpace::Rgb)
    };

    let mut dict = image_dict(width, height, color_space);
    dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    if let Some(alpha) = alpha_channel(&decoded, has_alpha) {
        let mut mask = image_dict(width, height, "DeviceGray");
        mask.set("Filter", Object::Name(b"FlateDecode".to_vec()));
        let mask_id = doc.add_object(Stream::new(mask, flate_compress(&alpha)?).with_compression(false));
        dict.set("SMask", Object::Reference(mask_id));
    }

    let id = doc.add_object(Stream::new(dict, flate_compress(&samples)?).with_compression(false));
    Ok(ImageXObject {
        id,
        width,
        height,
        color_space: detected,
    })
}

/// Alpha samples, or `None` when the image is fully opaque
fn alpha_channel(decoded: &DynamicImage, has_alpha: bool) -> Option<Vec<u8>> {
    if !has_alpha {
        return None;
    }
    let alpha: Vec<u8> = decoded.to_rgba8().pixels().map(|p| p.0[3]).collect();
    alpha.iter().any(|a| *a != 255).then_some(alpha)
}

fn add_jpeg(doc: &mut Document, bytes: &[u8]) -> Result<ImageXObject> {
    let metadata = jpeg_metadata(bytes)?;
    let color_space = metadata.pdf_space().ok_or_else(|| {
        ComposeError::tool("jpeg", format!("unsupported color space {:?}", metadata.color_space))
    })?;

    let mut dict = image_dict(metadata.width, metadata.height, color_space);
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    // CMYK and YCCK JPEGs store inverted samples
    if metadata.inverted() {
        dict.set(
            "Decode",
            Object::Array([1, 0, 1, 0, 1, 0, 1, 0].iter().map(|v| Object::Integer(*v)).collect()),
        );
    }

    let id = doc.add_object(Stream::new(dict, bytes.to_vec()).with_compression(false));
    Ok(ImageXObject {
        id,
        width: metadata.width,
        height: metadata.height,
        color_space: metadata.source_space(),
    })
}

fn image_dict(width: u32, height: u32, color_space: &str) -> Dictionary {
    Dictionary::from_iter(vec![
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(width as i64)),
        ("Height", Object::Integer(height as i64)),
        ("ColorSpace", Object::Name(color_space.as_bytes().to_vec())),
        ("BitsPerComponent", Object::Integer(8)),
    ])
}

fn flate_compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

// =============================================================================
// JPEG Metadata
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
struct JpegMetadata {
    width: u32,
    height: u32,
    color_space: ColorSpace,
}

impl JpegMetadata {
    fn pdf_space(&self) -> Option<&'static str> {
        match self.color_space {
            ColorSpace::Luma => Some("DeviceGray"),
            ColorSpace::YCbCr | ColorSpace::RGB => Some("DeviceRGB"),
            ColorSpace::CMYK | ColorSpace::YCCK => Some("DeviceCMYK"),
            _ => None,
        }
    }

    fn inverted(&self) -> bool {
        matches!(self.color_space, ColorSpace::CMYK | ColorSpace::YCCK)
    }

    fn source_space(&self) -> SourceColorSpace {
        match self.pdf_space() {
            Some("DeviceGray") => SourceColorSpace::Grayscale,
            Some("DeviceRGB") => SourceColorSpace::Rgb,
            Some("DeviceCMYK") => SourceColorSpace::Cmyk,
            _ => SourceColorSpace::Unknown,
        }
    }
}

/// Frame size and color space from the JPEG headers, without decoding
fn jpeg_metadata(bytes: &[u8]) -> Result<JpegMetadata> {
    let mut decoder = JpegDecoder::new(Cursor::new(bytes));
    decoder
        .decode_headers()
        .map_err(|e| ComposeError::tool("jpeg", e.to_string().to_ascii_lowercase()))?;

    let (width, height) = decoder
        .dimensions()
        .ok_or_else(|| ComposeError::tool("jpeg", "failed to read image dimensions"))?;
    let color_space = decoder
        .input_colorspace()
        .ok_or_else(|| ComposeError::tool("jpeg", "failed to read image colorspace"))?;

    Ok(JpegMetadata {
        width: width as u32,
        height: height as u32,
        color_space,
    })
}
