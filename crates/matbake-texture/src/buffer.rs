//! RGBA pixel buffer.

use crate::color::Color;

/// A 2D texture buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureBuffer {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel data (RGBA, row-major).
    pub data: Vec<Color>,
}

impl TextureBuffer {
    /// Create a new texture buffer filled with a color.
    pub fn new(width: u32, height: u32, fill: Color) -> Self {
        let size = (width as usize) * (height as usize);
        Self {
            width,
            height,
            data: vec![fill; size],
        }
    }

    /// Build a buffer from tightly packed 8-bit RGBA bytes.
    ///
    /// Returns `None` when the byte count does not match the dimensions.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Option<Self> {
        if bytes.len() != (width as usize) * (height as usize) * 4 {
            return None;
        }
        let data = bytes
            .chunks_exact(4)
            .map(|px| Color::from_rgba8([px[0], px[1], px[2], px[3]]))
            .collect();
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// Get a pixel at the given coordinates.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Color {
        let idx = (y as usize) * (self.width as usize) + x as usize;
        self.data[idx]
    }

    /// Set a pixel at the given coordinates.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        let idx = (y as usize) * (self.width as usize) + x as usize;
        self.data[idx] = color;
    }

    /// Copy `src` into this buffer with its top-left corner at (`x`, `y`).
    ///
    /// Pixels falling outside the destination are dropped.
    pub fn blit(&mut self, src: &TextureBuffer, x: u32, y: u32) {
        for sy in 0..src.height {
            let dy = y + sy;
            if dy >= self.height {
                break;
            }
            for sx in 0..src.width {
                let dx = x + sx;
                if dx >= self.width {
                    break;
                }
                self.set(dx, dy, src.get(sx, sy));
            }
        }
    }

    /// Convert to 8-bit RGBA bytes.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.data.len() * 4);
        for color in &self.data {
            bytes.extend_from_slice(&color.to_rgba8());
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba8_rejects_wrong_length() {
        assert!(TextureBuffer::from_rgba8(2, 2, &[0u8; 15]).is_none());
        assert!(TextureBuffer::from_rgba8(2, 2, &[0u8; 16]).is_some());
    }

    #[test]
    fn test_blit_clips_to_destination() {
        let mut dst = TextureBuffer::new(4, 4, Color::transparent());
        let src = TextureBuffer::new(3, 3, Color::rgb(1.0, 0.0, 0.0));
        dst.blit(&src, 2, 2);

        assert_eq!(dst.get(3, 3), Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(dst.get(1, 1), Color::transparent());
    }
}
