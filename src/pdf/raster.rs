//! Raster image XObjects for image watermarks

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::GenericImageView;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};

/// Decoded watermark image, ready to be written as an XObject
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Flate-compressed RGB samples
    rgb: Vec<u8>,
    /// Flate-compressed alpha samples, when the source has transparency
    alpha: Option<Vec<u8>>,
}

impl PreparedImage {
    /// Decode PNG or JPEG bytes
    pub fn decode(data: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(data)
            .map_err(|e| Error::InvalidImage(e.to_string()))?;

        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::InvalidImage("image has no pixels".to_string()));
        }

        let rgb = deflate(decoded.to_rgb8().as_raw())?;

        let alpha = if decoded.color().has_alpha() {
            let rgba = decoded.to_rgba8();
            let samples: Vec<u8> = rgba.pixels().map(|p| p[3]).collect();
            if samples.iter().all(|&a| a == u8::MAX) {
                None
            } else {
                Some(deflate(&samples)?)
            }
        } else {
            None
        };

        Ok(Self { width, height, rgb, alpha })
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha.is_some()
    }

    /// Write the image (and its soft mask) into `doc`
    pub fn add_to(&self, doc: &mut Document) -> ObjectId {
        let mut image_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => self.width as i64,
            "Height" => self.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8_i64,
            "Filter" => "FlateDecode",
        };

        if let Some(ref alpha) = self.alpha {
            let mask_dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => self.width as i64,
                "Height" => self.height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8_i64,
                "Filter" => "FlateDecode",
            };
            let mask_id = doc.add_object(Stream::new(mask_dict, alpha.clone()));
            image_dict.set("SMask", Object::Reference(mask_id));
        }

        doc.add_object(Stream::new(image_dict, self.rgb.clone()))
    }
}

fn deflate(raw: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    /// Encode a solid-colour PNG of the given size
    pub(crate) fn png_bytes(width: u32, height: u32, alpha: u8) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, alpha]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decode_png_dimensions() {
        let prepared = PreparedImage::decode(&png_bytes(40, 20, 255)).unwrap();
        assert_eq!((prepared.width, prepared.height), (40, 20));
        // Fully opaque RGBA needs no soft mask
        assert!(!prepared.has_alpha());
    }

    #[test]
    fn test_translucent_png_gets_soft_mask() {
        let prepared = PreparedImage::decode(&png_bytes(8, 8, 128)).unwrap();
        assert!(prepared.has_alpha());

        let mut doc = Document::with_version("1.5");
        let id = prepared.add_to(&mut doc);
        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        let mask = stream.dict.get(b"SMask").unwrap().as_reference().unwrap();
        assert!(doc.get_object(mask).is_ok());
        assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 8);
    }

    #[test]
    fn test_garbage_is_rejected() {
        let result = PreparedImage::decode(b"definitely not an image");
        assert!(matches!(result, Err(Error::InvalidImage(_))));
    }
}
