//! Error types for the bake pipeline.

use std::fmt;
use std::path::PathBuf;

use matbake_scene::{ErrorCode, HostError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for pipeline operations.
pub type BakeResult<T> = Result<T, BakeError>;

/// Pipeline driver states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    #[default]
    Idle,
    /// Rig, bake passes and teardown, one object at a time.
    PerObjectBake,
    /// Rendered images bound back into materials.
    GlobalRebind,
    AtlasGenerate,
    ExportReady,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Idle => "idle",
            PipelineStage::PerObjectBake => "per_object_bake",
            PipelineStage::GlobalRebind => "global_rebind",
            PipelineStage::AtlasGenerate => "atlas_generate",
            PipelineStage::ExportReady => "export_ready",
            PipelineStage::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while baking.
#[derive(Debug, Error)]
pub enum BakeError {
    /// The configuration is unusable.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Failed to read a configuration file.
    #[error("Failed to read config {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a configuration file.
    #[error("Failed to parse config: {0}")]
    ParseConfig(#[source] serde_json::Error),

    /// The model collection does not exist.
    #[error("Model collection '{0}' not found")]
    ModelNotFound(String),

    /// The scene host rejected an operation.
    #[error(transparent)]
    Host(#[from] HostError),

    /// A file rename failed even after removing the target.
    #[error("Could not rename {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The pipeline aborted.
    #[error("Bake pipeline failed during {stage}: {source}")]
    Failed {
        stage: PipelineStage,
        #[source]
        source: Box<BakeError>,
    },
}

impl BakeError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Wraps `self` as the terminal failure of `stage`.
    pub fn failed_at(self, stage: PipelineStage) -> Self {
        match self {
            failed @ BakeError::Failed { .. } => failed,
            other => BakeError::Failed {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage a pipeline failure happened in.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            BakeError::Failed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The underlying error of a pipeline failure, or `self`.
    pub fn root(&self) -> &BakeError {
        match self {
            BakeError::Failed { source, .. } => source.root(),
            other => other,
        }
    }
}

impl ErrorCode for BakeError {
    fn code(&self) -> &'static str {
        match self {
            BakeError::InvalidConfig { .. } => "BAKE_001",
            BakeError::ReadConfig { .. } => "BAKE_002",
            BakeError::ParseConfig(_) => "BAKE_003",
            BakeError::ModelNotFound(_) => "BAKE_004",
            BakeError::Host(_) => "BAKE_005",
            BakeError::Rename { .. } => "BAKE_006",
            BakeError::Io(_) => "BAKE_007",
            BakeError::Failed { .. } => "BAKE_008",
        }
    }

    fn category(&self) -> &'static str {
        match self {
            BakeError::InvalidConfig { .. }
            | BakeError::ReadConfig { .. }
            | BakeError::ParseConfig(_) => "config",
            BakeError::Host(e) => e.category(),
            BakeError::Failed { source, .. } => source.category(),
            _ => "bake",
        }
    }
}
