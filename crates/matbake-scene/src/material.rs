//! Materials, their image-bearing sub-graphs, and images.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ids::{ImageId, TextureGroupId};

/// Where a material sits in the bake lifecycle.
///
/// `RawEligible → Simplified → Atlased`; the `RawEligible` original is kept
/// (renamed with `-ORG`) so it can be baked again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    /// Procedural material tagged for baking.
    RawEligible,
    /// Procedural material that must not be baked.
    #[default]
    RawIneligible,
    /// Reduced material that only samples baked images.
    Simplified,
    /// Simplified material rewired to a packed atlas image.
    Atlased,
}

impl MaterialKind {
    pub fn is_bake_eligible(&self) -> bool {
        matches!(self, MaterialKind::RawEligible)
    }
}

/// Surface blend mode as configured on the material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlendMethod {
    #[default]
    Opaque,
    Clip,
    Hashed,
    Blend,
}

/// Transparency configuration carried across material swaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlendSettings {
    pub method: BlendMethod,
    #[serde(default)]
    pub transparency_overlap: bool,
    #[serde(default)]
    pub show_backface: bool,
}

/// Which socket feeds the material output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputRoute {
    /// The combined light/dark colour output.
    #[default]
    Combined,
    /// The normal-data passthrough, the designated final output of the
    /// texture sub-graph.
    NormalPassthrough,
}

/// The parts of a material's node graph the pipeline touches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadingGraph {
    /// The image-bearing sub-graph, if the material has one.
    #[serde(default)]
    pub textures: Option<TextureGroupId>,
    #[serde(default)]
    pub output: OutputRoute,
    /// Temporary emissive wiring exposing an image to the texture packer.
    #[serde(default)]
    pub emission_preview: Option<ImageId>,
    /// Flat colour the reference host renders for this material.
    #[serde(default = "default_base_color")]
    pub base_color: [f64; 4],
}

fn default_base_color() -> [f64; 4] {
    [1.0, 1.0, 1.0, 1.0]
}

impl Default for ShadingGraph {
    fn default() -> Self {
        Self {
            textures: None,
            output: OutputRoute::Combined,
            emission_preview: None,
            base_color: default_base_color(),
        }
    }
}

/// A named shading graph assigned to material slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    #[serde(default)]
    pub kind: MaterialKind,
    #[serde(default)]
    pub shading: ShadingGraph,
    #[serde(default)]
    pub blend: BlendSettings,
    /// Keeps the material alive even with no users.
    #[serde(default)]
    pub fake_user: bool,
}

impl Material {
    pub fn new(name: impl Into<String>, kind: MaterialKind) -> Self {
        Self {
            name: name.into(),
            kind,
            shading: ShadingGraph::default(),
            blend: BlendSettings::default(),
            fake_user: false,
        }
    }

    pub fn with_textures(mut self, group: TextureGroupId) -> Self {
        self.shading.textures = Some(group);
        self
    }

    pub fn with_base_color(mut self, rgba: [f64; 4]) -> Self {
        self.shading.base_color = rgba;
        self
    }

    pub fn with_blend(mut self, method: BlendMethod) -> Self {
        self.blend.method = method;
        self
    }
}

/// An image texture node inside a texture group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageNode {
    pub name: String,
    #[serde(default)]
    pub image: Option<ImageId>,
}

/// The toon shading node; its normal strength is muted for colour passes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadeNode {
    pub normal_strength: f64,
}

/// Image-bearing sub-graph of a material.
///
/// Procedural materials hold their source textures here; simplified and
/// atlas materials hold one node per pass type, named `light`, `dark` and
/// `normal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureGroup {
    pub name: String,
    #[serde(default)]
    pub image_nodes: Vec<ImageNode>,
    #[serde(default)]
    pub shade: Option<ShadeNode>,
    /// Whether the group exposes a normal passthrough output.
    #[serde(default)]
    pub normal_output: bool,
}

impl TextureGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image_nodes: Vec::new(),
            shade: None,
            normal_output: false,
        }
    }

    /// Group with empty `light`, `dark` and `normal` nodes.
    pub fn simplified(name: impl Into<String>) -> Self {
        let mut group = Self::new(name);
        for node in ["light", "dark", "normal"] {
            group.image_nodes.push(ImageNode {
                name: node.to_string(),
                image: None,
            });
        }
        group
    }

    pub fn with_node(mut self, name: impl Into<String>, image: Option<ImageId>) -> Self {
        self.image_nodes.push(ImageNode {
            name: name.into(),
            image,
        });
        self
    }

    pub fn with_shade(mut self, normal_strength: f64) -> Self {
        self.shade = Some(ShadeNode { normal_strength });
        self
    }

    pub fn with_normal_output(mut self) -> Self {
        self.normal_output = true;
        self
    }

    /// The image bound to the node called `node`.
    pub fn image(&self, node: &str) -> Option<ImageId> {
        self.image_nodes
            .iter()
            .find(|n| n.name == node)
            .and_then(|n| n.image)
    }

    /// Binds `image` to the node called `node`. Returns `false` if there is
    /// no such node.
    pub fn set_image(&mut self, node: &str, image: Option<ImageId>) -> bool {
        match self.image_nodes.iter_mut().find(|n| n.name == node) {
            Some(n) => {
                n.image = image;
                true
            }
            None => false,
        }
    }

    /// Every bound image, in node order.
    pub fn images(&self) -> impl Iterator<Item = ImageId> + '_ {
        self.image_nodes.iter().filter_map(|n| n.image)
    }
}

/// A 2D pixel buffer known to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// File the pixels came from, if any.
    #[serde(default)]
    pub filepath: Option<PathBuf>,
    /// Whether the pixels are embedded in the scene document.
    #[serde(default)]
    pub packed: bool,
}

impl Image {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            filepath: None,
            packed: false,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}
