use serde::{Deserialize, Serialize};
use std::fmt;

/// RGBA8 image, row-major, 4 bytes per pixel.
///
/// Crosses the channel with its bytes base64-encoded rather than as a JSON
/// number array.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    #[serde(with = "rgba_base64")]
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub const BYTES_PER_PIXEL: usize = 4;

    /// Fully transparent buffer.
    ///
    /// Dimensions whose byte size overflows `usize` yield an empty, malformed
    /// buffer; callers bound dimensions before allocating.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; Self::byte_len(width, height).unwrap_or(0)],
        }
    }

    /// Wrap raw RGBA bytes. Returns `None` if the length does not match.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let buffer = Self {
            width,
            height,
            data,
        };
        buffer.is_well_formed().then_some(buffer)
    }

    /// `None` when the size does not fit in `usize`.
    pub fn byte_len(width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(Self::BYTES_PER_PIXEL)
    }

    pub fn is_well_formed(&self) -> bool {
        Self::byte_len(self.width, self.height) == Some(self.data.len())
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * Self::BYTES_PER_PIXEL
    }

    /// RGBA at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        let px = self.data.get(i..i + Self::BYTES_PER_PIXEL)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.offset(x, y);
        self.data[i..i + Self::BYTES_PER_PIXEL].copy_from_slice(&rgba);
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

mod rgba_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_transparent_and_sized() {
        let buffer = PixelBuffer::new(3, 2);
        assert_eq!(buffer.data.len(), 24);
        assert_eq!(buffer.pixel(2, 1), Some([0, 0, 0, 0]));
        assert_eq!(buffer.pixel(3, 0), None);
    }

    #[test]
    fn byte_len_overflow_is_reported() {
        assert_eq!(PixelBuffer::byte_len(3, 2), Some(24));
        assert_eq!(PixelBuffer::byte_len(u32::MAX, u32::MAX), None);
        assert!(!PixelBuffer::new(u32::MAX, u32::MAX).is_well_formed());
    }

    #[test]
    fn from_rgba_rejects_wrong_length() {
        assert!(PixelBuffer::from_rgba(2, 2, vec![0; 15]).is_none());
        assert!(PixelBuffer::from_rgba(2, 2, vec![0; 16]).is_some());
    }

    #[test]
    fn set_pixel_writes_row_major() {
        let mut buffer = PixelBuffer::new(4, 4);
        buffer.set_pixel(1, 2, [10, 20, 30, 255]);
        let offset = (2 * 4 + 1) * 4;
        assert_eq!(&buffer.data[offset..offset + 4], &[10, 20, 30, 255]);
    }

    #[test]
    fn pixel_bytes_serialize_as_base64_string() {
        let buffer = PixelBuffer::from_rgba(1, 1, vec![255, 0, 0, 255]).unwrap();
        let json = serde_json::to_string(&buffer).unwrap();
        assert_eq!(json, r#"{"width":1,"height":1,"data":"/wAA/w=="}"#);

        let parsed: PixelBuffer = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, buffer);
    }

    #[test]
    fn invalid_base64_fails_to_parse() {
        let json = r#"{"width":1,"height":1,"data":"not base64!"}"#;
        assert!(serde_json::from_str::<PixelBuffer>(json).is_err());
    }
}
