//! Pipeline driver.
//!
//! `Idle → PerObjectBake → GlobalRebind → [AtlasGenerate] → ExportReady`,
//! with any error moving to `Failed`. Objects are baked strictly one at a
//! time: rig, passes, teardown, then visibility restored before the next.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use matbake_scene::naming::split_numeric_suffix;
use matbake_scene::{
    CollectionId, HostError, ObjectId, RenderEngine, Scene, TexturePacker, ViewportShading,
};
use matbake_texture::png::hash_file;
use serde::Serialize;

use crate::atlas::create_material_atlas;
use crate::bake::bake_pass;
use crate::config::BakeConfig;
use crate::error::{BakeError, BakeResult, PipelineStage};
use crate::export::{attach_exporter, export_path, export_settings};
use crate::rebind::replace_all_baked_materials;
use crate::rig::{setup_camera, setup_rig, BACKDROP_NAME};
use crate::teardown::cleanup;

/// Filter size while baking; keeps UV island edges crisp.
pub const BAKE_FILTER_SIZE: f64 = 0.5;
pub const DEFAULT_FILTER_SIZE: f64 = 1.5;

/// Summary of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineReport {
    pub stage: PipelineStage,
    pub objects_baked: Vec<String>,
    /// Objects with no bake-eligible material.
    pub objects_skipped: Vec<String>,
    pub rendered_files: Vec<PathBuf>,
    /// BLAKE3 digest of each rendered file, by file name. Identical inputs
    /// render identical files, so reruns can be compared.
    pub file_digests: BTreeMap<String, String>,
    pub skipped_materials: Vec<String>,
    pub skipped_files: Vec<PathBuf>,
    pub created_materials: Vec<String>,
    pub reinstated_materials: Vec<String>,
    pub atlas_images: Vec<String>,
    pub elapsed_ms: u64,
}

/// Runs the whole pipeline for `config.model_name`.
///
/// Configuration and model lookup errors are returned as is. Anything that
/// fails after that comes back as [`BakeError::Failed`] carrying the stage,
/// with the viewport reset to solid shading.
pub fn run_pipeline(
    scene: &mut dyn Scene,
    packer: &dyn TexturePacker,
    config: &BakeConfig,
) -> BakeResult<PipelineReport> {
    config.validate()?;
    let model = scene
        .find_collection(&config.model_name)
        .ok_or_else(|| BakeError::ModelNotFound(config.model_name.clone()))?;

    let started = Instant::now();
    let mut report = PipelineReport::default();
    match drive(scene, packer, config, model, &mut report) {
        Ok(()) => {
            report.elapsed_ms = started.elapsed().as_millis() as u64;
            tracing::info!(
                model = %config.model_name,
                objects = report.objects_baked.len(),
                files = report.rendered_files.len(),
                elapsed_ms = report.elapsed_ms,
                "Bake finished"
            );
            Ok(report)
        }
        Err(e) => {
            tracing::error!(stage = %report.stage, error = %e, "Bake pipeline failed");
            scene.set_viewport_shading(ViewportShading::Solid);
            Err(e.failed_at(report.stage))
        }
    }
}

fn drive(
    scene: &mut dyn Scene,
    packer: &dyn TexturePacker,
    config: &BakeConfig,
    model: CollectionId,
    report: &mut PipelineReport,
) -> BakeResult<()> {
    {
        let settings = scene.render_settings_mut();
        settings.engine = RenderEngine::Eevee;
        settings.film_transparent = true;
        settings.filter_size = BAKE_FILTER_SIZE;
    }
    scene.set_viewport_shading(ViewportShading::Solid);

    let objects = bakeable_objects(&*scene, model)?;
    let baked_dir = config.baked_dir();
    std::fs::create_dir_all(&baked_dir)?;

    report.stage = PipelineStage::PerObjectBake;
    for &object in &objects {
        bake_object(scene, config, model, object, report)?;
    }

    {
        let settings = scene.render_settings_mut();
        settings.film_transparent = false;
        settings.filter_size = DEFAULT_FILTER_SIZE;
    }

    report.stage = PipelineStage::GlobalRebind;
    let template = config.shading_variant.template();
    for &object in &objects {
        let outcome = replace_all_baked_materials(scene, &baked_dir, object, template)?;
        report.created_materials.extend(outcome.created);
        report.reinstated_materials.extend(outcome.reinstated);
        for file in outcome.skipped_files {
            if !report.skipped_files.contains(&file) {
                report.skipped_files.push(file);
            }
        }
    }

    if config.use_atlas {
        report.stage = PipelineStage::AtlasGenerate;
        let outcome = create_material_atlas(scene, packer, config)?;
        report.atlas_images = outcome.images;
    }

    let settings = export_settings(
        export_path(&config.atlas_dir(), &config.model_name, false),
        config.ue_fix_axis,
    );
    attach_exporter(scene, model, settings, false)?;

    scene.set_viewport_shading(ViewportShading::Solid);
    report.stage = PipelineStage::ExportReady;
    Ok(())
}

/// Meshes of the model that have material slots, backdrops excluded.
fn bakeable_objects(scene: &dyn Scene, model: CollectionId) -> BakeResult<Vec<ObjectId>> {
    let mut objects = Vec::new();
    for id in scene.meshes_in(model)? {
        let object = scene.object(id)?;
        if object.material_slots.is_empty()
            || split_numeric_suffix(&object.name).0 == BACKDROP_NAME
        {
            continue;
        }
        objects.push(id);
    }
    Ok(objects)
}

fn has_eligible_material(scene: &dyn Scene, object: ObjectId) -> BakeResult<bool> {
    for material in scene.object(object)?.materials() {
        if scene.material(material)?.kind.is_bake_eligible() {
            return Ok(true);
        }
    }
    Ok(false)
}

fn bake_object(
    scene: &mut dyn Scene,
    config: &BakeConfig,
    model: CollectionId,
    object: ObjectId,
    report: &mut PipelineReport,
) -> BakeResult<()> {
    let (name, is_body) = {
        let o = scene.object(object)?;
        (o.name.clone(), o.is_body)
    };
    if !has_eligible_material(&*scene, object)? {
        tracing::info!(object = %name, "No bakeable materials, skipping object");
        report.objects_skipped.push(name);
        return Ok(());
    }
    tracing::info!(object = %name, "Baking object");

    let collection = scene.collection_of(object).unwrap_or(model);
    let collection_hidden = scene.collection(collection)?.hidden;
    if !is_body {
        scene.collection_mut(collection)?.hidden = false;
    }
    let visibility = isolate(scene, object, config.legacy_bake)?;

    let result = bake_isolated(scene, config, collection, object, report);
    let torn_down = cleanup(scene);

    restore_visibility(scene, &visibility)?;
    if !is_body {
        scene.collection_mut(collection)?.hidden = collection_hidden;
    }
    result?;
    torn_down?;

    report.objects_baked.push(name);
    Ok(())
}

fn bake_isolated(
    scene: &mut dyn Scene,
    config: &BakeConfig,
    collection: CollectionId,
    object: ObjectId,
    report: &mut PipelineReport,
) -> BakeResult<()> {
    let camera = setup_camera(scene, collection)?;
    let rig = setup_rig(scene, object, camera)?;
    let baked_dir = config.baked_dir();
    for pass in config.enabled_passes() {
        let outcome = bake_pass(scene, &rig, &baked_dir, pass, config.resolution_multiplier)?;
        for path in outcome.rendered {
            let digest = hash_file(&path).map_err(HostError::from)?;
            if let Some(name) = path.file_name() {
                report
                    .file_digests
                    .insert(name.to_string_lossy().into_owned(), digest);
            }
            report.rendered_files.push(path);
        }
        for material in outcome.skipped {
            if !report.skipped_materials.contains(&material) {
                report.skipped_materials.push(material);
            }
        }
    }
    Ok(())
}

/// Hides every mesh from render except `target` (which stays hidden too in
/// legacy mode). Returns the previous flags.
fn isolate(
    scene: &mut dyn Scene,
    target: ObjectId,
    legacy: bool,
) -> BakeResult<Vec<(ObjectId, bool)>> {
    let mut saved = Vec::new();
    for id in scene.object_ids() {
        let object = scene.object_mut(id)?;
        if !object.is_mesh() {
            continue;
        }
        saved.push((id, object.hide_render));
        object.hide_render = id != target || legacy;
    }
    Ok(saved)
}

fn restore_visibility(scene: &mut dyn Scene, saved: &[(ObjectId, bool)]) -> BakeResult<()> {
    for &(id, hidden) in saved {
        scene.object_mut(id)?.hide_render = hidden;
    }
    Ok(())
}
