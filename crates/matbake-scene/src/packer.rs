//! Texture packing: merging per-material bakes into one image per mesh.
//!
//! The packer is an external collaborator of the pipeline. Its contract:
//!
//! - **Precondition**: every material that should be packed carries an
//!   `emission_preview` pointing at its lit image.
//! - **Postcondition**: for mesh index `i` (position among the meshes of
//!   [`Scene::meshes_in`]) and pass `p`, `<out_dir>/<i>_<p>.png` exists and
//!   is loaded into the scene as image `<i>_<p>.png`, unless the mesh had
//!   nothing to pack for that pass.

use std::path::{Path, PathBuf};

use matbake_texture::png::{self, PngConfig};
use matbake_texture::{compose, pack_shelf, AtlasTile};
use serde::{Deserialize, Serialize};

use crate::error::HostResult;
use crate::host::Scene;
use crate::ids::{CollectionId, ImageId, MaterialId, ObjectId};
use crate::pass::PassType;

/// One packed image produced by a [`TexturePacker`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedImage {
    pub mesh_index: usize,
    pub object: ObjectId,
    pub pass: PassType,
    pub path: PathBuf,
    pub image: ImageId,
    pub width: u32,
    pub height: u32,
}

/// Everything a packing run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackReport {
    pub images: Vec<PackedImage>,
}

impl PackReport {
    /// The image packed for mesh `index` and `pass`, if any.
    pub fn get(&self, index: usize, pass: PassType) -> Option<&PackedImage> {
        self.images
            .iter()
            .find(|p| p.mesh_index == index && p.pass == pass)
    }
}

/// Packs the emissive-wired materials of a collection into per-mesh images.
pub trait TexturePacker {
    fn pack(
        &self,
        scene: &mut dyn Scene,
        collection: CollectionId,
        passes: &[PassType],
        out_dir: &Path,
    ) -> HostResult<PackReport>;
}

/// Deterministic shelf packer.
#[derive(Debug, Clone)]
pub struct ShelfPacker {
    /// Gutter around each tile, in pixels.
    pub padding: u32,
}

impl Default for ShelfPacker {
    fn default() -> Self {
        Self { padding: 2 }
    }
}

impl ShelfPacker {
    pub fn new(padding: u32) -> Self {
        Self { padding }
    }

    fn source_image(
        scene: &dyn Scene,
        material: MaterialId,
        pass: PassType,
    ) -> HostResult<Option<ImageId>> {
        let material = scene.material(material)?;
        if pass == PassType::Light {
            return Ok(material.shading.emission_preview);
        }
        let Some(group) = material.shading.textures else {
            return Ok(None);
        };
        let group = scene.texture_group(group)?;
        let image = match pass {
            PassType::Dark => group.image("dark").or_else(|| group.image("light")),
            _ => group.image(pass.as_str()),
        };
        Ok(image)
    }

    fn tiles_for(
        scene: &dyn Scene,
        materials: &[MaterialId],
        pass: PassType,
    ) -> HostResult<Vec<AtlasTile>> {
        let mut tiles = Vec::new();
        for &material in materials {
            let Some(image) = Self::source_image(scene, material, pass)? else {
                continue;
            };
            let image = scene.image(image)?;
            let Some(path) = &image.filepath else {
                tracing::debug!(image = %image.name, "image has no backing file, not packed");
                continue;
            };
            match png::read_rgba(path) {
                Ok(pixels) => {
                    let name = scene.material(material)?.name.clone();
                    tiles.push(AtlasTile::new(name, pixels));
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "could not read image for packing");
                }
            }
        }
        Ok(tiles)
    }
}

impl TexturePacker for ShelfPacker {
    fn pack(
        &self,
        scene: &mut dyn Scene,
        collection: CollectionId,
        passes: &[PassType],
        out_dir: &Path,
    ) -> HostResult<PackReport> {
        std::fs::create_dir_all(out_dir)?;
        let mut report = PackReport::default();

        for (index, object) in scene.meshes_in(collection)?.into_iter().enumerate() {
            let mut materials: Vec<MaterialId> = Vec::new();
            for material in scene.object(object)?.materials() {
                if materials.contains(&material) {
                    continue;
                }
                if scene.material(material)?.shading.emission_preview.is_some() {
                    materials.push(material);
                }
            }
            if materials.is_empty() {
                continue;
            }

            for &pass in passes {
                let tiles = Self::tiles_for(&*scene, &materials, pass)?;
                if tiles.is_empty() {
                    continue;
                }
                let layout = pack_shelf(&tiles, self.padding)?;
                let atlas = compose(&tiles, &layout);
                let path = out_dir.join(format!("{}_{}.png", index, pass));
                png::write_rgba(&atlas, &path, &PngConfig::default())?;
                let image = scene.load_image(&path)?;

                tracing::debug!(
                    index,
                    pass = %pass,
                    tiles = tiles.len(),
                    width = layout.width,
                    height = layout.height,
                    "packed atlas"
                );
                report.images.push(PackedImage {
                    mesh_index: index,
                    object,
                    pass,
                    path,
                    image,
                    width: layout.width,
                    height: layout.height,
                });
            }
        }
        Ok(report)
    }
}
