//! Error types for scene hosts.

use std::path::PathBuf;

use matbake_texture::{AtlasError, PngError};
use thiserror::Error;

use crate::ids::{CollectionId, ImageId, MaterialId, ObjectId, TextureGroupId};

/// Result type for scene host operations.
pub type HostResult<T> = Result<T, HostError>;

/// Stable, machine-readable identification of an error.
pub trait ErrorCode {
    /// Returns the error code (e.g. `HOST_001`).
    fn code(&self) -> &'static str;

    /// Returns the coarse area the error comes from.
    fn category(&self) -> &'static str;
}

/// Errors raised by a scene host.
#[derive(Debug, Error)]
pub enum HostError {
    /// A data-block name exceeds the host limit.
    #[error("Name '{name}' exceeds {max} bytes")]
    NameTooLong { name: String, max: usize },

    #[error("No such object: {0}")]
    MissingObject(ObjectId),

    #[error("No such material: {0}")]
    MissingMaterial(MaterialId),

    #[error("No such texture group: {0}")]
    MissingTextureGroup(TextureGroupId),

    #[error("No such image: {0}")]
    MissingImage(ImageId),

    #[error("No such collection: {0}")]
    MissingCollection(CollectionId),

    /// A lookup by name failed.
    #[error("No {kind} named '{name}'")]
    NotFound { kind: &'static str, name: String },

    /// A render was requested with no scene camera set.
    #[error("Scene has no camera")]
    NoCamera,

    /// The render engine failed to produce an image.
    #[error("Render to {path} failed: {message}")]
    RenderFailed { path: PathBuf, message: String },

    /// An image file could not be loaded.
    #[error("Could not load image {path}: {message}")]
    LoadImage { path: PathBuf, message: String },

    #[error("Material template '{0}' is not in the library")]
    MissingTemplate(String),

    #[error("Asset '{0}' is not in the library")]
    MissingAsset(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Png(#[from] PngError),

    #[error(transparent)]
    Atlas(#[from] AtlasError),

    #[error("Scene document error: {0}")]
    Document(#[from] serde_json::Error),
}

impl HostError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn render_failed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::RenderFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn load_image(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::LoadImage {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether the error concerns a single file and can be skipped.
    pub fn is_per_file(&self) -> bool {
        matches!(self, HostError::NameTooLong { .. } | HostError::LoadImage { .. })
    }
}

impl ErrorCode for HostError {
    fn code(&self) -> &'static str {
        match self {
            HostError::NameTooLong { .. } => "HOST_001",
            HostError::MissingObject(_) => "HOST_002",
            HostError::MissingMaterial(_) => "HOST_003",
            HostError::MissingTextureGroup(_) => "HOST_004",
            HostError::MissingImage(_) => "HOST_005",
            HostError::MissingCollection(_) => "HOST_006",
            HostError::NotFound { .. } => "HOST_007",
            HostError::NoCamera => "HOST_008",
            HostError::RenderFailed { .. } => "HOST_009",
            HostError::LoadImage { .. } => "HOST_010",
            HostError::MissingTemplate(_) => "HOST_011",
            HostError::MissingAsset(_) => "HOST_012",
            HostError::Io(_) => "HOST_013",
            HostError::Png(_) => "HOST_014",
            HostError::Atlas(_) => "HOST_015",
            HostError::Document(_) => "HOST_016",
        }
    }

    fn category(&self) -> &'static str {
        match self {
            HostError::Png(_) | HostError::Atlas(_) => "texture",
            HostError::Io(_) => "io",
            HostError::RenderFailed { .. } | HostError::NoCamera => "render",
            _ => "host",
        }
    }
}
