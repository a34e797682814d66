//! Projection rig: orthographic camera, filler backdrop and UV flattener.
//!
//! The target mesh is flattened onto its UV layout in front of an
//! orthographic camera. A backdrop plane sits just behind it and carries
//! the material being baked, so the parts of the canvas outside the UV
//! islands take that material's colour too. Both are scaled by drivers that
//! keep a 1:1 aspect against the render resolution.

use matbake_scene::{
    Axis, CollectionId, HostError, HostResult, Material, MaterialId, MaterialKind, Modifier,
    ModifierKind, Object, ObjectId, ObjectKind, ScaleDriver, Scene, FLATTENER_ASSET,
};

pub const CAMERA_NAME: &str = "Camera";
pub const CAMERA_ORTHO_SCALE: f64 = 6.0;
pub const CAMERA_LOCATION: [f64; 3] = [0.0, 0.0, 1.0];

pub const BACKDROP_NAME: &str = "fillerplane";
/// Just behind the flattened mesh.
pub const BACKDROP_Z: f64 = -0.0001;

/// UV channel the flattener unwraps along.
pub const UV_CHANNEL: &str = "uv_main";
pub const FLATTENER_MODIFIER: &str = "Flattener";

/// Fully transparent material swapped into every slot not being baked.
pub const PLACEHOLDER_MATERIAL: &str = "Bake Transparent Placeholder";

/// Handles to the live rig for one bake object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionRig {
    pub target: ObjectId,
    pub camera: ObjectId,
    pub backdrop: ObjectId,
    pub placeholder: MaterialId,
}

/// Replaces every camera in the scene with a fresh orthographic one linked
/// into `collection`, and makes it the scene camera.
pub fn setup_camera(scene: &mut dyn Scene, collection: CollectionId) -> HostResult<ObjectId> {
    for id in scene.object_ids() {
        if scene.object(id)?.is_camera() {
            scene.remove_object(id)?;
        }
    }

    let mut camera = Object::new(
        CAMERA_NAME,
        ObjectKind::Camera {
            ortho_scale: CAMERA_ORTHO_SCALE,
        },
    );
    camera.location = CAMERA_LOCATION;
    let camera = scene.add_object(camera)?;
    scene.link_object(camera, collection)?;
    scene.set_scene_camera(Some(camera));
    scene.render_settings_mut().pixel_aspect = [1.0, 1.0];
    Ok(camera)
}

fn aspect_drivers(camera: ObjectId) -> [ScaleDriver; 2] {
    [
        ScaleDriver {
            axis: Axis::X,
            camera,
        },
        ScaleDriver {
            axis: Axis::Y,
            camera,
        },
    ]
}

/// Builds the backdrop, attaches the aspect drivers and the flattener to
/// `target`, and makes `target` the active object.
pub fn setup_rig(
    scene: &mut dyn Scene,
    target: ObjectId,
    camera: ObjectId,
) -> HostResult<ProjectionRig> {
    let Some(collection) = scene.collection_of(target) else {
        return Err(HostError::not_found(
            "collection for object",
            scene_name(&*scene, target),
        ));
    };

    let mut backdrop = Object::mesh(BACKDROP_NAME);
    backdrop.material_slots = vec![None];
    backdrop.uv_layers = vec![UV_CHANNEL.to_string()];
    backdrop.location = [0.0, 0.0, BACKDROP_Z];
    backdrop.drivers = aspect_drivers(camera).to_vec();
    let backdrop = scene.add_object(backdrop)?;
    scene.link_object(backdrop, collection)?;

    scene.import_asset(FLATTENER_ASSET)?;
    {
        let object = scene.object_mut(target)?;
        object.drivers.extend(aspect_drivers(camera));
        object.modifiers.push(Modifier::new(
            FLATTENER_MODIFIER,
            ModifierKind::Flatten {
                uv_channel: UV_CHANNEL.to_string(),
            },
        ));
    }

    let placeholder = match scene.find_material(PLACEHOLDER_MATERIAL) {
        Some(existing) => existing,
        None => scene.add_material(
            Material::new(PLACEHOLDER_MATERIAL, MaterialKind::RawIneligible)
                .with_base_color([0.0, 0.0, 0.0, 0.0]),
        )?,
    };

    scene.set_active_object(Some(target));
    tracing::debug!(object = %target, camera = %camera, backdrop = %backdrop, "projection rig ready");

    Ok(ProjectionRig {
        target,
        camera,
        backdrop,
        placeholder,
    })
}

fn scene_name(scene: &dyn Scene, id: ObjectId) -> String {
    scene
        .object(id)
        .map(|o| o.name.clone())
        .unwrap_or_else(|_| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use matbake_scene::MemoryScene;

    #[test]
    fn test_setup_camera_replaces_existing_cameras() {
        let mut scene = MemoryScene::new();
        let model = scene.add_collection("Rin", None).unwrap();
        let old = scene
            .add_linked_object(Object::new("Old cam", ObjectKind::Camera { ortho_scale: 1.0 }), model)
            .unwrap();

        let camera = setup_camera(&mut scene, model).unwrap();
        assert!(scene.object(old).is_err());
        assert_eq!(scene.scene_camera(), Some(camera));
        let camera = scene.object(camera).unwrap();
        assert_eq!(camera.kind, ObjectKind::Camera { ortho_scale: 6.0 });
        assert_eq!(camera.location, [0.0, 0.0, 1.0]);
        assert_eq!(scene.render_settings().pixel_aspect, [1.0, 1.0]);
    }

    #[test]
    fn test_setup_rig() {
        let mut scene = MemoryScene::new();
        let model = scene.add_collection("Rin", None).unwrap();
        let body = scene.add_linked_object(Object::mesh("Body").body(), model).unwrap();
        let camera = setup_camera(&mut scene, model).unwrap();

        let rig = setup_rig(&mut scene, body, camera).unwrap();
        assert_eq!(scene.active_object(), Some(body));
        assert!(scene.has_asset(FLATTENER_ASSET));

        let backdrop = scene.object(rig.backdrop).unwrap();
        assert_eq!(backdrop.name, "fillerplane");
        assert_eq!(backdrop.material_slots, vec![None]);
        assert_eq!(backdrop.uv_layers, vec!["uv_main".to_string()]);
        assert_eq!(backdrop.location[2], BACKDROP_Z);
        assert_eq!(backdrop.drivers.len(), 2);

        let body = scene.object(body).unwrap();
        assert_eq!(body.drivers.len(), 2);
        assert_eq!(
            body.modifier(FLATTENER_MODIFIER).map(|m| &m.kind),
            Some(&ModifierKind::Flatten {
                uv_channel: "uv_main".to_string()
            })
        );
        let placeholder = scene.material(rig.placeholder).unwrap();
        assert_eq!(placeholder.shading.base_color[3], 0.0);
    }

    #[test]
    fn test_setup_rig_needs_linked_target() {
        let mut scene = MemoryScene::new();
        let model = scene.add_collection("Rin", None).unwrap();
        let loose = scene.add_object(Object::mesh("Loose")).unwrap();
        let camera = setup_camera(&mut scene, model).unwrap();
        assert!(matches!(
            setup_rig(&mut scene, loose, camera),
            Err(HostError::NotFound { .. })
        ));
    }
}
