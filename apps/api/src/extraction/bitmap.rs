//! Image résumés: decoded to a bitmap and handed to the model as-is (no OCR).

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};

use crate::extraction::{ExtractionError, MediaType};

/// A decoded résumé image, plus its re-encoding in the upload format for
/// transport to the model.
#[derive(Debug, Clone)]
pub struct ResumeImage {
    bitmap: DynamicImage,
    format: ImageFormat,
    encoded: Vec<u8>,
}

impl ResumeImage {
    pub fn decode(bytes: &[u8], media_type: MediaType) -> Result<Self, ExtractionError> {
        let format = match media_type {
            MediaType::Png => ImageFormat::Png,
            MediaType::Jpeg => ImageFormat::Jpeg,
            other => {
                return Err(ExtractionError::Image(format!(
                    "{} is not an image type",
                    other.mime()
                )))
            }
        };
        let bitmap = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| ExtractionError::Image(e.to_string()))?;
        let encoded = encode(&bitmap, format)?;
        Ok(Self {
            bitmap,
            format,
            encoded,
        })
    }

    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }

    pub fn mime_type(&self) -> &'static str {
        match self.format {
            ImageFormat::Jpeg => MediaType::Jpeg.mime(),
            _ => MediaType::Png.mime(),
        }
    }

    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }
}

fn encode(bitmap: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, ExtractionError> {
    let mut out = Cursor::new(Vec::new());
    let written = match format {
        // The JPEG encoder rejects alpha channels.
        ImageFormat::Jpeg => {
            DynamicImage::ImageRgb8(bitmap.to_rgb8()).write_to(&mut out, ImageFormat::Jpeg)
        }
        _ => bitmap.write_to(&mut out, ImageFormat::Png),
    };
    written.map_err(|e| ExtractionError::Image(e.to_string()))?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::fixtures::image_bytes;

    #[test]
    fn test_png_decodes_with_dimensions() {
        let img = ResumeImage::decode(&image_bytes(ImageFormat::Png, 4, 3), MediaType::Png).unwrap();
        assert_eq!((img.width(), img.height()), (4, 3));
        assert_eq!(img.mime_type(), "image/png");
        assert_eq!(&img.encoded()[..4], b"\x89PNG");
    }

    #[test]
    fn test_jpeg_is_reencoded_as_jpeg() {
        let img =
            ResumeImage::decode(&image_bytes(ImageFormat::Jpeg, 8, 8), MediaType::Jpeg).unwrap();
        assert_eq!(&img.encoded()[..2], &[0xFF, 0xD8]);
        assert_eq!(img.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_png_declared_but_jpeg_bytes_fails() {
        let err = ResumeImage::decode(&image_bytes(ImageFormat::Jpeg, 2, 2), MediaType::Png)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Image(_)));
    }

    #[test]
    fn test_non_image_media_type_is_rejected() {
        let err = ResumeImage::decode(b"whatever", MediaType::Pdf).unwrap_err();
        assert!(err.to_string().contains("application/pdf"));
    }
}
