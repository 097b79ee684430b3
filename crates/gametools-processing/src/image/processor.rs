//! Image processor - decoding checks and WebP re-encoding

use bytes::Bytes;
use gametools_core::{AppError, AppResult};
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::io::Cursor;

/// Basic facts about a decoded image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: String,
}

pub struct ImageProcessor;

impl ImageProcessor {
    /// Decode bytes of any supported format
    pub fn decode(data: &[u8]) -> AppResult<DynamicImage> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| AppError::InvalidImageData(format!("Unreadable image: {}", e)))?;

        if reader.format().is_none() {
            return Err(AppError::InvalidImageData(
                "Unrecognised image format".to_string(),
            ));
        }

        reader
            .decode()
            .map_err(|e| AppError::InvalidImageData(format!("Failed to decode image: {}", e)))
    }

    /// Decode and report dimensions and format
    pub fn inspect(data: &[u8]) -> AppResult<ImageInfo> {
        let format = image::guess_format(data)
            .map(|f| format!("{:?}", f))
            .map_err(|e| AppError::InvalidImageData(e.to_string()))?;
        let img = Self::decode(data)?;
        let (width, height) = img.dimensions();

        Ok(ImageInfo {
            width,
            height,
            format,
        })
    }

    /// Re-encode an image as WebP in memory.
    ///
    /// The WebP encoder only takes 8-bit RGB(A), so other colour types are
    /// converted first.
    pub fn to_webp(data: &[u8]) -> AppResult<Bytes> {
        let img = Self::decode(data)?;
        let img = if img.color().has_alpha() {
            DynamicImage::ImageRgba8(img.to_rgba8())
        } else {
            DynamicImage::ImageRgb8(img.to_rgb8())
        };

        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::WebP)
            .map_err(|e| AppError::InvalidImageData(format!("Failed to encode WebP: {}", e)))?;

        Ok(Bytes::from(buffer))
    }

    pub fn is_webp(data: &[u8]) -> bool {
        matches!(image::guess_format(data), Ok(ImageFormat::WebP))
    }
}
