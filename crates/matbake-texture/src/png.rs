//! Deterministic PNG writer and tolerant PNG reader.
//!
//! Baked textures are always 8-bit RGBA. The writer uses fixed compression
//! settings so the same pixels produce byte-identical files; the reader goes
//! through the `image` crate and accepts whatever layout the file has.

use std::io::Write;
use std::path::Path;

use png::{BitDepth, ColorType, Compression, Encoder, FilterType};
use thiserror::Error;

use crate::buffer::TextureBuffer;

/// Errors from PNG operations.
#[derive(Debug, Error)]
pub enum PngError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PNG encoding error: {0}")]
    Encoding(#[from] png::EncodingError),

    #[error("PNG decoding error: {0}")]
    Decoding(#[from] image::ImageError),

    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),
}

/// PNG export configuration for deterministic output.
#[derive(Debug, Clone)]
pub struct PngConfig {
    /// Compression level. Use a fixed value for determinism.
    pub compression: Compression,
    /// Filter type. Use a fixed value for determinism.
    pub filter: FilterType,
}

impl Default for PngConfig {
    fn default() -> Self {
        Self {
            compression: Compression::Default,
            filter: FilterType::NoFilter,
        }
    }
}

/// Write an RGBA texture buffer to a PNG file.
pub fn write_rgba(buffer: &TextureBuffer, path: &Path, config: &PngConfig) -> Result<(), PngError> {
    if buffer.width == 0 || buffer.height == 0 {
        return Err(PngError::InvalidDimensions(format!(
            "{}x{} image cannot be encoded",
            buffer.width, buffer.height
        )));
    }
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);

    write_rgba_to_writer(buffer, writer, config)
}

/// Write an RGBA texture buffer to any writer.
pub fn write_rgba_to_writer<W: Write>(
    buffer: &TextureBuffer,
    writer: W,
    config: &PngConfig,
) -> Result<(), PngError> {
    let mut encoder = Encoder::new(writer, buffer.width, buffer.height);
    encoder.set_color(ColorType::Rgba);
    encoder.set_depth(BitDepth::Eight);
    encoder.set_compression(config.compression);
    encoder.set_filter(config.filter);

    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(&buffer.to_rgba8())?;

    Ok(())
}

/// Read a PNG file into an RGBA buffer.
pub fn read_rgba(path: &Path) -> Result<TextureBuffer, PngError> {
    let decoded = image::open(path)?.to_rgba8();
    let (width, height) = decoded.dimensions();
    TextureBuffer::from_rgba8(width, height, decoded.as_raw()).ok_or_else(|| {
        PngError::InvalidDimensions(format!("decoded {}x{} buffer has wrong length", width, height))
    })
}

/// Read only the pixel dimensions of an image file.
pub fn dimensions(path: &Path) -> Result<(u32, u32), PngError> {
    Ok(image::image_dimensions(path)?)
}

/// Compute the BLAKE3 hash of PNG data.
pub fn hash_png(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// BLAKE3 hash of the file at `path`.
pub fn hash_file(path: &Path) -> Result<String, PngError> {
    let data = std::fs::read(path)?;
    Ok(hash_png(&data))
}
