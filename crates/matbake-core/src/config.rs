//! Bake configuration.

use std::path::{Path, PathBuf};

use matbake_scene::{PassType, SIMPLE_TEMPLATE, SIMPLE_TEMPLATE_EEVEE_MOD};
use serde::{Deserialize, Serialize};

use crate::error::{BakeError, BakeResult};

/// Directory under the import dir that receives per-material bakes.
pub const BAKED_DIR_NAME: &str = "baked_files";
/// Directory under the import dir that receives atlases and exports.
pub const ATLAS_DIR_NAME: &str = "atlas_files";

/// Which simplified shader replaces baked materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShadingVariant {
    #[default]
    Standard,
    EeveeMod,
}

impl ShadingVariant {
    /// Name of the material template for this variant.
    pub fn template(&self) -> &'static str {
        match self {
            ShadingVariant::Standard => SIMPLE_TEMPLATE,
            ShadingVariant::EeveeMod => SIMPLE_TEMPLATE_EEVEE_MOD,
        }
    }
}

/// Configuration for a bake run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeConfig {
    /// Directory the model was imported from; outputs go below it.
    pub import_dir: PathBuf,
    /// Name of the model collection.
    pub model_name: String,
    /// Scale applied to each material's largest input image.
    pub resolution_multiplier: f64,
    pub bake_light: bool,
    pub bake_dark: bool,
    pub bake_normal: bool,
    pub use_atlas: bool,
    /// Keep the target hidden from render while baking.
    pub legacy_bake: bool,
    pub shading_variant: ShadingVariant,
    /// Use `-Y` forward / `Z` up in exporter settings.
    pub ue_fix_axis: bool,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            import_dir: PathBuf::from("."),
            model_name: String::new(),
            resolution_multiplier: 1.0,
            bake_light: true,
            bake_dark: true,
            bake_normal: false,
            use_atlas: false,
            legacy_bake: false,
            shading_variant: ShadingVariant::Standard,
            ue_fix_axis: false,
        }
    }
}

impl BakeConfig {
    /// Creates a config for `model_name` imported from `import_dir`.
    pub fn new(import_dir: impl Into<PathBuf>, model_name: impl Into<String>) -> Self {
        Self {
            import_dir: import_dir.into(),
            model_name: model_name.into(),
            ..Default::default()
        }
    }

    /// Loads a JSON config file.
    pub fn from_file(path: &Path) -> BakeResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| BakeError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(BakeError::ParseConfig)
    }

    /// Sets the resolution multiplier.
    pub fn resolution_multiplier(mut self, multiplier: f64) -> Self {
        self.resolution_multiplier = multiplier;
        self
    }

    /// Selects which passes are baked.
    pub fn passes(mut self, light: bool, dark: bool, normal: bool) -> Self {
        self.bake_light = light;
        self.bake_dark = dark;
        self.bake_normal = normal;
        self
    }

    pub fn use_atlas(mut self, enabled: bool) -> Self {
        self.use_atlas = enabled;
        self
    }

    pub fn legacy_bake(mut self, enabled: bool) -> Self {
        self.legacy_bake = enabled;
        self
    }

    pub fn shading_variant(mut self, variant: ShadingVariant) -> Self {
        self.shading_variant = variant;
        self
    }

    pub fn ue_fix_axis(mut self, enabled: bool) -> Self {
        self.ue_fix_axis = enabled;
        self
    }

    /// Enabled passes in bake order.
    pub fn enabled_passes(&self) -> Vec<PassType> {
        PassType::ALL
            .into_iter()
            .filter(|pass| match pass {
                PassType::Light => self.bake_light,
                PassType::Dark => self.bake_dark,
                PassType::Normal => self.bake_normal,
            })
            .collect()
    }

    pub fn baked_dir(&self) -> PathBuf {
        self.import_dir.join(BAKED_DIR_NAME)
    }

    pub fn atlas_dir(&self) -> PathBuf {
        self.import_dir.join(ATLAS_DIR_NAME)
    }

    /// Checks the config before anything in the scene is touched.
    pub fn validate(&self) -> BakeResult<()> {
        if !self.resolution_multiplier.is_finite() || self.resolution_multiplier < 1.0 {
            return Err(BakeError::invalid_config(format!(
                "resolution multiplier must be a finite number of at least 1, got {}",
                self.resolution_multiplier
            )));
        }
        if self.model_name.trim().is_empty() {
            return Err(BakeError::invalid_config("model name is empty"));
        }
        if self.enabled_passes().is_empty() {
            return Err(BakeError::invalid_config("no bake pass is enabled"));
        }
        Ok(())
    }
}
