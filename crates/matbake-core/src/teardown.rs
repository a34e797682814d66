//! Rig teardown.

use matbake_scene::naming::split_numeric_suffix;
use matbake_scene::{DataKind, HostResult, Scene, FLATTENER_ASSET};

use crate::rig::{BACKDROP_NAME, FLATTENER_MODIFIER, PLACEHOLDER_MATERIAL};

/// Removes every camera and backdrop, purges unlinked objects, strips the
/// flattener and its scale drivers from meshes, resets their scale and
/// drops the flattener asset and the transparent placeholder.
///
/// Safe to call on a scene that holds no rig.
pub fn cleanup(scene: &mut dyn Scene) -> HostResult<()> {
    let mut removed = 0;
    for id in scene.object_ids() {
        let object = scene.object(id)?;
        let is_backdrop = split_numeric_suffix(&object.name).0 == BACKDROP_NAME;
        if object.is_camera() || is_backdrop {
            scene.remove_object(id)?;
            removed += 1;
        }
    }
    let purged = scene.purge_orphans(&[DataKind::Objects]);

    let mut flattened = 0;
    for id in scene.object_ids() {
        let object = scene.object_mut(id)?;
        if !object.is_mesh() || object.modifier(FLATTENER_MODIFIER).is_none() {
            continue;
        }
        object.modifiers.retain(|m| m.name != FLATTENER_MODIFIER);
        object.drivers.clear();
        object.scale = [1.0, 1.0, 1.0];
        flattened += 1;
    }

    scene.remove_asset(FLATTENER_ASSET);
    if let Some(placeholder) = scene.find_material(PLACEHOLDER_MATERIAL) {
        scene.remove_material(placeholder)?;
    }

    tracing::debug!(removed, purged, flattened, "rig torn down");
    Ok(())
}
