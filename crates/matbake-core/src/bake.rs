//! Per-material bake pass.
//!
//! For one pass type, every bake-eligible material on the rig's target is
//! exposed alone: the other slots get the transparent placeholder, the
//! backdrop gets the material, and the camera view is rendered to
//! `<dir>/<name> <pass>.png`. Material state and slot order are restored
//! after each material whether or not the render succeeded.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use matbake_scene::{
    ColorMode, HostResult, LightLevel, MaterialId, OutputRoute, PassType, Scene, TextureGroupId,
};

use crate::error::BakeResult;
use crate::naming::bake_file_path;
use crate::rig::ProjectionRig;

/// Resolution used when a material has no image inputs.
pub const FAILSAFE_RESOLUTION: u32 = 64;

/// What one bake pass produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassOutcome {
    pub rendered: Vec<PathBuf>,
    /// Materials skipped because they are not bake-eligible.
    pub skipped: Vec<String>,
}

/// Render size for a material: its largest input image scaled by
/// `multiplier` and rounded up, or the 64x64 failsafe.
pub fn material_resolution(
    scene: &dyn Scene,
    material: MaterialId,
    multiplier: f64,
) -> HostResult<(u32, u32)> {
    let failsafe = (FAILSAFE_RESOLUTION, FAILSAFE_RESOLUTION);
    let Some(group) = scene.material(material)?.shading.textures else {
        return Ok(failsafe);
    };

    let mut largest: Option<(u32, u32)> = None;
    let mut largest_area = 0;
    for image in scene.texture_group(group)?.images() {
        let image = scene.image(image)?;
        if image.area() > largest_area {
            largest_area = image.area();
            largest = Some((image.width, image.height));
        }
    }

    Ok(match largest {
        Some((w, h)) => (scale_dimension(w, multiplier), scale_dimension(h, multiplier)),
        None => failsafe,
    })
}

fn scale_dimension(dimension: u32, multiplier: f64) -> u32 {
    (dimension as f64 * multiplier).ceil() as u32
}

/// Per-material graph state changed for the duration of one render.
struct SavedMaterial {
    material: MaterialId,
    output: OutputRoute,
    shade: Option<(TextureGroupId, f64)>,
}

fn prepare_material(
    scene: &mut dyn Scene,
    material: MaterialId,
    pass: PassType,
) -> HostResult<SavedMaterial> {
    let shading = &scene.material(material)?.shading;
    let mut saved = SavedMaterial {
        material,
        output: shading.output,
        shade: None,
    };
    let Some(group) = shading.textures else {
        return Ok(saved);
    };

    if pass == PassType::Normal {
        if scene.texture_group(group)?.normal_output {
            scene.material_mut(material)?.shading.output = OutputRoute::NormalPassthrough;
        }
    } else if let Some(shade) = scene.texture_group_mut(group)?.shade.as_mut() {
        saved.shade = Some((group, shade.normal_strength));
        shade.normal_strength = 0.0;
    }
    Ok(saved)
}

fn restore_material(scene: &mut dyn Scene, saved: &SavedMaterial) -> HostResult<()> {
    scene.material_mut(saved.material)?.shading.output = saved.output;
    if let Some((group, strength)) = saved.shade {
        if let Some(shade) = scene.texture_group_mut(group)?.shade.as_mut() {
            shade.normal_strength = strength;
        }
    }
    Ok(())
}

fn expose_and_render(
    scene: &mut dyn Scene,
    rig: &ProjectionRig,
    material: MaterialId,
    path: &Path,
    multiplier: f64,
) -> HostResult<()> {
    let (width, height) = material_resolution(&*scene, material, multiplier)?;
    let settings = scene.render_settings_mut();
    settings.resolution_x = width;
    settings.resolution_y = height;
    settings.color_mode = ColorMode::Rgba;
    settings.color_depth = 8;

    for slot in &mut scene.object_mut(rig.target)?.material_slots {
        if *slot != Some(material) {
            *slot = Some(rig.placeholder);
        }
    }
    let backdrop = scene.object_mut(rig.backdrop)?;
    match backdrop.material_slots.first_mut() {
        Some(slot) => *slot = Some(material),
        None => backdrop.material_slots.push(Some(material)),
    }

    scene.render_still(path)
}

/// Bakes every eligible material on the rig's target for `pass`.
///
/// A render failure stops the pass and is returned after the current
/// material, the slots and the light level have been restored.
pub fn bake_pass(
    scene: &mut dyn Scene,
    rig: &ProjectionRig,
    output_dir: &Path,
    pass: PassType,
    multiplier: f64,
) -> BakeResult<PassOutcome> {
    let previous_level = scene.light_level();
    match pass {
        PassType::Light => scene.set_light_level(LightLevel::Constant(1.0)),
        PassType::Dark => scene.set_light_level(LightLevel::Constant(0.0)),
        PassType::Normal => {}
    }
    let result = bake_materials(scene, rig, output_dir, pass, multiplier);
    scene.set_light_level(previous_level);
    result
}

fn bake_materials(
    scene: &mut dyn Scene,
    rig: &ProjectionRig,
    output_dir: &Path,
    pass: PassType,
    multiplier: f64,
) -> BakeResult<PassOutcome> {
    let original_slots = scene.object(rig.target)?.material_slots.clone();
    let total = original_slots.len();
    let mut outcome = PassOutcome::default();
    let mut seen = HashSet::new();

    for (index, material) in original_slots.iter().enumerate() {
        let Some(material) = *material else {
            continue;
        };
        if !seen.insert(material) {
            continue;
        }
        let (name, eligible) = {
            let m = scene.material(material)?;
            (m.name.clone(), m.kind.is_bake_eligible())
        };
        if !eligible {
            tracing::info!(material = %name, "Skipping material that cannot be baked");
            outcome.skipped.push(name);
            continue;
        }

        let path = bake_file_path(output_dir, &name, pass);
        tracing::info!(pass = %pass, "Rendering {} / {}: {}", index + 1, total, name);

        let saved = prepare_material(scene, material, pass)?;
        let rendered = expose_and_render(scene, rig, material, &path, multiplier);
        let restored = restore_material(scene, &saved);
        scene.object_mut(rig.target)?.material_slots = original_slots.clone();
        rendered?;
        restored?;

        outcome.rendered.push(path);
    }
    Ok(outcome)
}
