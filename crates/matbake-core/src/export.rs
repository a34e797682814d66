//! Interchange export settings attached to collections.

use std::path::{Path, PathBuf};

use matbake_scene::{
    ApplyScale, CollectionId, ExportObjectType, ExportSettings, HostResult, PathMode, Scene,
    SmoothType,
};

use crate::naming::export_file_name;

/// Export path for the model (or its atlas duplicate) under `atlas_dir`.
pub fn export_path(atlas_dir: &Path, model_name: &str, atlas: bool) -> PathBuf {
    atlas_dir.join(export_file_name(model_name, atlas))
}

/// Exporter configuration for engine targets. `ue_fix_axis` switches to a
/// `-Y` forward, `Z` up convention.
pub fn export_settings(filepath: PathBuf, ue_fix_axis: bool) -> ExportSettings {
    ExportSettings {
        filepath,
        object_types: vec![
            ExportObjectType::Empty,
            ExportObjectType::Armature,
            ExportObjectType::Mesh,
            ExportObjectType::Other,
        ],
        use_mesh_modifiers: false,
        add_leaf_bones: false,
        bake_anim: false,
        apply_scale_options: ApplyScale::FbxScaleAll,
        path_mode: PathMode::Copy,
        embed_textures: false,
        mesh_smooth_type: SmoothType::Off,
        axis: ue_fix_axis.then(|| ("-Y".to_string(), "Z".to_string())),
    }
}

/// Attaches `settings` to `collection`. An existing exporter is kept unless
/// `replace` is set. Returns whether anything changed.
pub fn attach_exporter(
    scene: &mut dyn Scene,
    collection: CollectionId,
    settings: ExportSettings,
    replace: bool,
) -> HostResult<bool> {
    let coll = scene.collection_mut(collection)?;
    if coll.exporter.is_some() && !replace {
        return Ok(false);
    }
    tracing::debug!(collection = %coll.name, path = %settings.filepath.display(), "exporter attached");
    coll.exporter = Some(settings);
    Ok(true)
}
