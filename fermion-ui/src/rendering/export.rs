//! PNG export of a finished render.

use fermion_core::{PixelBuffer, RenderError};
use image::{ImageFormat, RgbaImage};
use log::info;
use std::io::Cursor;
use std::path::Path;

pub fn encode_png(pixels: &PixelBuffer) -> Result<Vec<u8>, RenderError> {
    let (width, height) = pixels.dimensions();
    let image = RgbaImage::from_raw(width, height, pixels.data.clone()).ok_or_else(|| {
        RenderError::Export(format!("pixel data does not fill {width}x{height}"))
    })?;

    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .map_err(|e| RenderError::Export(e.to_string()))?;
    Ok(bytes.into_inner())
}

pub fn save_png(pixels: &PixelBuffer, path: &Path) -> Result<(), RenderError> {
    let bytes = encode_png(pixels)?;
    std::fs::write(path, bytes)
        .map_err(|e| RenderError::Export(format!("{}: {e}", path.display())))?;

    info!("Saved {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_a_decodable_png() {
        let mut pixels = PixelBuffer::new(3, 2);
        pixels.set_pixel(2, 1, [10, 20, 30, 255]);

        let bytes = encode_png(&pixels).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png)
            .unwrap()
            .to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(2, 1).0, [10, 20, 30, 255]);
    }

    #[test]
    fn malformed_buffer_is_an_export_error() {
        let mut pixels = PixelBuffer::new(2, 2);
        pixels.data.truncate(3);
        assert!(matches!(encode_png(&pixels), Err(RenderError::Export(_))));
    }

    #[test]
    fn save_writes_the_file() {
        let path = std::env::temp_dir().join(format!("fermion-export-{}.png", std::process::id()));
        save_png(&PixelBuffer::new(4, 4), &path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
        std::fs::remove_file(&path).unwrap();
    }
}
