//! Collections and the exporter settings they carry.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ids::{CollectionId, ObjectId};

/// A named group of objects with child collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<ObjectId>,
    #[serde(default)]
    pub children: Vec<CollectionId>,
    /// Excluded from the view layer.
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub exporter: Option<ExportSettings>,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: Vec::new(),
            children: Vec::new(),
            hidden: false,
            exporter: None,
        }
    }
}

/// How the interchange exporter treats mesh scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplyScale {
    FbxScaleNone,
    FbxScaleUnits,
    FbxScaleCustom,
    FbxScaleAll,
}

/// How the exporter references texture files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PathMode {
    Auto,
    Absolute,
    Relative,
    Copy,
}

/// Smoothing data written by the exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SmoothType {
    Off,
    Face,
    Edge,
}

/// Object types the exporter includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportObjectType {
    Empty,
    Camera,
    Light,
    Armature,
    Mesh,
    Other,
}

/// Per-collection interchange exporter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    pub filepath: PathBuf,
    pub object_types: Vec<ExportObjectType>,
    pub use_mesh_modifiers: bool,
    pub add_leaf_bones: bool,
    pub bake_anim: bool,
    pub apply_scale_options: ApplyScale,
    pub path_mode: PathMode,
    pub embed_textures: bool,
    pub mesh_smooth_type: SmoothType,
    /// `(forward, up)` axis override, e.g. `("-Y", "Z")`.
    #[serde(default)]
    pub axis: Option<(String, String)>,
}
