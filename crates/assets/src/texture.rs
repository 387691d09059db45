use crate::{AssetError, AssetId};
use std::path::Path;

/// Decoded RGBA8 pixels, rows top to bottom.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub id: AssetId,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ImageData {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let image = Self::from_bytes(&bytes)?;
        tracing::info!(
            "loaded image {}x{} from {}",
            image.width,
            image.height,
            path.display()
        );
        Ok(image)
    }

    /// Decode an encoded image (PNG) held in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            id: AssetId::of(bytes),
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }

    /// A `width` x `height` image of one colour.
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixels = color.repeat((width * height) as usize);
        Self {
            id: AssetId::of(&pixels),
            width,
            height,
            pixels,
        }
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_color_fills_pixels() {
        let img = ImageData::solid_color(2, 3, [1, 2, 3, 4]);
        assert_eq!(img.byte_len(), 2 * 3 * 4);
        assert_eq!(&img.pixels[4..8], &[1, 2, 3, 4]);
    }

    #[test]
    fn png_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let img = ImageData::from_file(&path).unwrap();
        assert_eq!((img.width, img.height), (2, 2));
        assert_eq!(&img.pixels[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let err = ImageData::from_bytes(b"not a png").unwrap_err();
        assert!(matches!(err, AssetError::Image(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ImageData::from_file("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, AssetError::Io(_)));
    }
}
