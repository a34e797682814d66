//! Render and view state.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ids::{MaterialId, ObjectId};

/// Render engine selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RenderEngine {
    #[default]
    Eevee,
    Cycles,
    Workbench,
}

/// Viewport shading mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ViewportShading {
    #[default]
    Solid,
    Material,
    Rendered,
}

/// Light-level input of the shared colour-combine group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum LightLevel {
    /// Driven by the scene lighting.
    #[default]
    Driven,
    /// Detached and pinned to a constant (1.0 lit, 0.0 shadowed).
    Constant(f64),
}

/// Output pixel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    Rgb,
    #[default]
    Rgba,
}

/// Scene render settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    pub engine: RenderEngine,
    pub resolution_x: u32,
    pub resolution_y: u32,
    pub pixel_aspect: [f64; 2],
    pub film_transparent: bool,
    pub filter_size: f64,
    pub color_mode: ColorMode,
    pub color_depth: u8,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            engine: RenderEngine::Eevee,
            resolution_x: 1920,
            resolution_y: 1080,
            pixel_aspect: [1.0, 1.0],
            film_transparent: false,
            filter_size: 1.5,
            color_mode: ColorMode::Rgba,
            color_depth: 8,
        }
    }
}

/// What was on screen for one still render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRecord {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub light_level: LightLevel,
    /// Slot assignments of every render-visible mesh at render time.
    pub visible: Vec<(ObjectId, Vec<Option<MaterialId>>)>,
    /// Material whose colour ended up on the canvas.
    pub painted: Option<MaterialId>,
}
