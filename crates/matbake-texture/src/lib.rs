//! matbake texture support
//!
//! Pixel-level helpers shared by the baking pipeline and its reference host:
//!
//! - **Buffers**: [`TextureBuffer`] stores RGBA pixels as [`Color`] values
//! - **PNG I/O**: 8-bit RGBA output with fixed encoder settings, so the same
//!   pixels always produce the same bytes; decoding accepts any PNG layout
//! - **Atlas**: deterministic shelf packing of per-material bakes into a
//!   single image per mesh
//!
//! # Example
//!
//! ```no_run
//! use matbake_texture::{Color, TextureBuffer};
//! use matbake_texture::png::{write_rgba, PngConfig};
//! use std::path::Path;
//!
//! let buffer = TextureBuffer::new(64, 64, Color::rgba(1.0, 0.0, 0.0, 1.0));
//! write_rgba(&buffer, Path::new("red.png"), &PngConfig::default()).unwrap();
//! ```

pub mod atlas;
pub mod buffer;
pub mod color;
pub mod png;

pub use atlas::{compose, pack_shelf, AtlasError, AtlasLayout, AtlasTile, TilePlacement};
pub use buffer::TextureBuffer;
pub use color::Color;
pub use png::{PngConfig, PngError};
