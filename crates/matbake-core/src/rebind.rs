//! Binding baked images back into materials.
//!
//! Each slot on a bake object is dispatched on its material's kind:
//!
//! - `Simplified`: bind the image into the existing simplified material.
//! - `RawEligible` named `<name>-ORG` with a simplified `<name>` sibling:
//!   the user swapped the original back in to re-bake it, so the sibling is
//!   reinstated and rebound.
//! - `RawEligible` otherwise: the original is renamed `<name>-ORG` and kept,
//!   and a new simplified `<name>` is created from the shader template.
//! - Anything else is left alone.

use std::path::{Path, PathBuf};

use matbake_scene::naming::split_numeric_suffix;
use matbake_scene::{
    BlendSettings, HostError, HostResult, ImageId, MaterialId, MaterialKind, ObjectId, PassType,
    Scene, TextureGroupId,
};
use walkdir::WalkDir;

use crate::error::BakeResult;
use crate::naming::{bake_file_name, is_org, org_name, strip_org};

/// Simplified eye-white materials draw with transparency overlap so the
/// eyes layer correctly over them.
pub const EYEWHITES_PREFIX: &str = "KK Eyewhites (sirome)";

/// What a rebind did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebindOutcome {
    /// Image names loaded from the bake directory.
    pub loaded: Vec<String>,
    /// Files that could not be loaded.
    pub skipped_files: Vec<PathBuf>,
    /// Simplified materials created.
    pub created: Vec<String>,
    /// Simplified materials put back in place of their `-ORG` original.
    pub reinstated: Vec<String>,
    /// Image bindings made.
    pub bound: usize,
}

fn png_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        })
        .collect()
}

/// Loads every PNG in `dir` into the image registry and packs it. An image
/// that lands on `<name>.NNN` because `<name>` was loaded before takes over
/// the old image's users and then its name.
pub fn load_baked_images(
    scene: &mut dyn Scene,
    dir: &Path,
    outcome: &mut RebindOutcome,
) -> BakeResult<()> {
    for path in png_files(dir) {
        let image = match scene.load_image(&path) {
            Ok(image) => image,
            Err(e) if e.is_per_file() => {
                tracing::warn!(path = %path.display(), error = %e, "Could not load baked image, skipping");
                outcome.skipped_files.push(path);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        scene.image_mut(image)?.packed = true;
        let name = replace_stale_image(scene, image)?;
        outcome.loaded.push(name);
    }
    Ok(())
}

fn replace_stale_image(scene: &mut dyn Scene, image: ImageId) -> HostResult<String> {
    let name = scene.image(image)?.name.clone();
    let (stem, counter) = split_numeric_suffix(&name);
    if counter.is_none() {
        return Ok(name);
    }
    let Some(stale) = scene.find_image(stem) else {
        return Ok(name);
    };
    scene.remap_image_users(stale, image)?;
    scene.remove_image(stale)?;
    scene.rename_image(image, stem)
}

fn textures_of(scene: &dyn Scene, material: MaterialId) -> HostResult<Option<TextureGroupId>> {
    Ok(scene.material(material)?.shading.textures)
}

/// Binds `image` to the `pass` node of `group`, and to `dark` as well when
/// `mirror_dark` is set.
pub(crate) fn bind_pass_image(
    scene: &mut dyn Scene,
    group: TextureGroupId,
    pass: PassType,
    image: ImageId,
    mirror_dark: bool,
) -> HostResult<usize> {
    let group = scene.texture_group_mut(group)?;
    let mut bound = 0;
    if group.set_image(pass.as_str(), Some(image)) {
        bound += 1;
    } else {
        tracing::warn!(group = %group.name, node = pass.as_str(), "texture group has no node for pass");
    }
    if mirror_dark && group.set_image(PassType::Dark.as_str(), Some(image)) {
        bound += 1;
    }
    Ok(bound)
}

/// Loads the bakes in `dir` and rebinds every slot of `object` to them.
///
/// Running it again over the same directory changes nothing: images are
/// replaced rather than duplicated, and a material is only simplified once.
pub fn replace_all_baked_materials(
    scene: &mut dyn Scene,
    dir: &Path,
    object: ObjectId,
    template: &str,
) -> BakeResult<RebindOutcome> {
    let mut outcome = RebindOutcome::default();
    load_baked_images(scene, dir, &mut outcome)?;

    for pass in PassType::ALL {
        let slot_count = scene.object(object)?.material_slots.len();
        for index in 0..slot_count {
            let Some(material) = scene.object(object)?.material_slots[index] else {
                continue;
            };
            let (name, kind) = {
                let m = scene.material(material)?;
                (m.name.clone(), m.kind)
            };
            let Some(image) = scene.find_image(&bake_file_name(&name, pass)) else {
                continue;
            };

            match kind {
                MaterialKind::Simplified => {
                    let Some(group) = textures_of(&*scene, material)? else {
                        tracing::warn!(material = %name, "simplified material has no texture group");
                        continue;
                    };
                    outcome.bound += bind_pass_image(scene, group, pass, image, false)?;
                }
                MaterialKind::RawEligible => {
                    let sibling = if is_org(&name) {
                        scene.find_material(strip_org(&name))
                    } else {
                        None
                    };
                    let sibling = match sibling {
                        Some(id) if scene.material(id)?.kind == MaterialKind::Simplified => Some(id),
                        _ => None,
                    };
                    match sibling {
                        Some(simple) => {
                            scene.object_mut(object)?.material_slots[index] = Some(simple);
                            let Some(group) = textures_of(&*scene, simple)? else {
                                continue;
                            };
                            outcome.bound += bind_pass_image(scene, group, pass, image, false)?;
                            tracing::info!(material = %name, "Reinstated simplified material");
                            outcome.reinstated.push(strip_org(&name).to_string());
                        }
                        None => {
                            let created =
                                create_simplified(scene, object, index, material, pass, image, template)?;
                            outcome.bound += created.1;
                            outcome.created.push(created.0);
                        }
                    }
                }
                MaterialKind::RawIneligible | MaterialKind::Atlased => {}
            }
        }
    }
    Ok(outcome)
}

/// Replaces the original material in slot `index` with a new simplified
/// material built from `template`. Returns the new name and the number of
/// bindings made.
fn create_simplified(
    scene: &mut dyn Scene,
    object: ObjectId,
    index: usize,
    original: MaterialId,
    pass: PassType,
    image: ImageId,
    template: &str,
) -> HostResult<(String, usize)> {
    let original_name = scene.material(original)?.name.clone();
    let base = strip_org(&original_name).to_string();
    scene.rename_material(original, &org_name(&original_name))?;

    let simple = scene.import_material_template(template)?;
    let simple_name = scene.rename_material(simple, &base)?;
    let template_group = textures_of(&*scene, simple)?
        .ok_or_else(|| HostError::MissingTemplate(template.to_string()))?;
    let group = scene.copy_texture_group(template_group, &simple_name)?;

    // A lone light bake also fills the dark node so the pair matches; a
    // later dark bake overwrites it.
    let bound = bind_pass_image(scene, group, pass, image, pass == PassType::Light)?;

    let method = scene.material(original)?.blend.method;
    scene.material_mut(original)?.fake_user = true;
    {
        let simplified = scene.material_mut(simple)?;
        simplified.kind = MaterialKind::Simplified;
        simplified.shading.textures = Some(group);
        simplified.blend = BlendSettings {
            method,
            transparency_overlap: base.starts_with(EYEWHITES_PREFIX),
            show_backface: false,
        };
        simplified.fake_user = true;
    }
    scene.object_mut(object)?.material_slots[index] = Some(simple);

    tracing::info!(material = %simple_name, "Created simplified material");
    Ok((simple_name, bound))
}
