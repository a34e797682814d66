//! Template library a host imports shared data blocks from.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::material::{BlendMethod, Material, MaterialKind, TextureGroup};

/// Simplified-material template for the standard shader.
pub const SIMPLE_TEMPLATE: &str = "KK Simple";
/// Simplified-material template for the Eevee Mod shader.
pub const SIMPLE_TEMPLATE_EEVEE_MOD: &str = ".Simple Shader (Eevee Mod)";
/// Node asset holding the UV flattening transform.
pub const FLATTENER_ASSET: &str = ".Geometry Nodes";

/// A material template and the texture group it ships with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialTemplate {
    pub material: Material,
    pub textures: TextureGroup,
}

/// Named templates and node assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TemplateLibrary {
    #[serde(default)]
    pub materials: BTreeMap<String, MaterialTemplate>,
    #[serde(default)]
    pub assets: BTreeSet<String>,
}

impl TemplateLibrary {
    /// Library with both simplified-material templates and the flattener.
    pub fn standard() -> Self {
        let mut library = Self::default();
        for name in [SIMPLE_TEMPLATE, SIMPLE_TEMPLATE_EEVEE_MOD] {
            let material = Material::new(name, MaterialKind::Simplified).with_blend(BlendMethod::Clip);
            library.materials.insert(
                name.to_string(),
                MaterialTemplate {
                    material,
                    textures: TextureGroup::simplified(name),
                },
            );
        }
        library.assets.insert(FLATTENER_ASSET.to_string());
        library
    }

    pub fn material(&self, name: &str) -> Option<&MaterialTemplate> {
        self.materials.get(name)
    }

    pub fn has_asset(&self, name: &str) -> bool {
        self.assets.contains(name)
    }
}
