//! Atlas generation on a duplicate of the model.
//!
//! The model collection is deep-copied into `<model> atlas`. Simplified
//! materials on the copy expose their lit image through an emission
//! preview, the [`TexturePacker`] merges them into one image per mesh, and
//! every copied mesh is switched to `<material> Atlas` materials bound to
//! those images. The source hierarchy keeps its simplified materials.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use matbake_scene::{
    CollectionId, DataKind, HostResult, ImageId, MaterialId, MaterialKind, ModifierKind, ObjectId,
    PackReport, PassType, Scene, TexturePacker,
};

use crate::config::BakeConfig;
use crate::error::{BakeError, BakeResult};
use crate::export::{attach_exporter, export_path, export_settings};
use crate::naming::{
    atlas_collection_name, atlas_image_name, atlas_material_name, bake_file_name,
    packed_image_name,
};
use crate::rebind::bind_pass_image;

/// Images with this name are pattern placeholders and never atlassed.
pub const PLACEHOLDER_IMAGE: &str = "Template: Pattern Placeholder";

/// What an atlas run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasOutcome {
    pub collection: CollectionId,
    /// Installed atlas image names, in mesh then pass order.
    pub images: Vec<String>,
    /// Atlas materials created or extended.
    pub materials: Vec<String>,
    /// Copied meshes with nothing to atlas.
    pub skipped_meshes: Vec<String>,
    /// Whether a previous atlas collection was replaced.
    pub replaced_previous: bool,
}

/// Builds (or rebuilds) the atlas duplicate of `config.model_name`.
pub fn create_material_atlas(
    scene: &mut dyn Scene,
    packer: &dyn TexturePacker,
    config: &BakeConfig,
) -> BakeResult<AtlasOutcome> {
    let model = scene
        .find_collection(&config.model_name)
        .ok_or_else(|| BakeError::ModelNotFound(config.model_name.clone()))?;
    let atlas_name = atlas_collection_name(&config.model_name);
    let passes = config.enabled_passes();
    let atlas_dir = config.atlas_dir();

    let replaced_previous = match scene.find_collection(&atlas_name) {
        Some(previous) => {
            tracing::info!(collection = %atlas_name, "Removing previous atlas");
            scene.remove_collection(previous)?;
            remove_orphan_data(scene)?;
            scene.collection_mut(model)?.hidden = false;
            true
        }
        None => false,
    };

    let duplicate = duplicate_collection(scene, model, &atlas_name)?;
    let meshes = scene.meshes_in(duplicate)?;
    wire_emission_previews(scene, &meshes)?;

    fs::create_dir_all(&atlas_dir)?;
    let report = packer.pack(scene, duplicate, &passes, &atlas_dir)?;

    let armature = scene
        .all_objects(duplicate)?
        .into_iter()
        .find(|&id| scene.object(id).is_ok_and(|o| o.is_armature()));

    let mut outcome = AtlasOutcome {
        collection: duplicate,
        images: Vec::new(),
        materials: Vec::new(),
        skipped_meshes: Vec::new(),
        replaced_previous,
    };

    for (index, mesh) in meshes.into_iter().enumerate() {
        fix_modifiers(scene, mesh, armature)?;

        let object_name = scene.object(mesh)?.name.clone();
        let simple = simplified_materials(&*scene, mesh)?;
        if simple.is_empty() {
            tracing::debug!(object = %object_name, "no simplified materials, skipping");
            outcome.skipped_meshes.push(object_name);
            continue;
        }

        for &pass in &passes {
            let Some(image) =
                install_atlas_image(scene, &atlas_dir, index, &object_name, pass, &report)?
            else {
                continue;
            };
            outcome.images.push(scene.image(image)?.name.clone());
            for &material in &simple {
                if let Some(name) = bind_atlas_material(scene, material, pass, image)? {
                    if !outcome.materials.contains(&name) {
                        outcome.materials.push(name);
                    }
                }
            }
        }

        swap_to_atlas_materials(scene, mesh)?;
    }

    for id in scene.material_ids() {
        scene.material_mut(id)?.shading.emission_preview = None;
    }

    let settings = export_settings(
        export_path(&atlas_dir, &config.model_name, true),
        config.ue_fix_axis,
    );
    attach_exporter(scene, duplicate, settings, true)?;
    scene.collection_mut(duplicate)?.hidden = true;

    remove_orphan_data(scene)?;

    tracing::info!(
        collection = %atlas_name,
        images = outcome.images.len(),
        materials = outcome.materials.len(),
        "Atlas generated"
    );
    Ok(outcome)
}

/// Deep-copies `source` into a new root collection named `name`. Objects
/// are copied once each; parents pointing inside the copy are remapped.
/// Materials are shared with the source.
pub fn duplicate_collection(
    scene: &mut dyn Scene,
    source: CollectionId,
    name: &str,
) -> HostResult<CollectionId> {
    let root = scene.add_collection(name, None)?;
    let mut copies: HashMap<ObjectId, ObjectId> = HashMap::new();
    let mut stack = vec![(source, root)];

    while let Some((from, to)) = stack.pop() {
        let (objects, children) = {
            let coll = scene.collection(from)?;
            (coll.objects.clone(), coll.children.clone())
        };
        for object in objects {
            let copy = match copies.get(&object) {
                Some(&copy) => copy,
                None => {
                    let copy = scene.copy_object(object)?;
                    copies.insert(object, copy);
                    copy
                }
            };
            scene.link_object(copy, to)?;
        }
        // Reversed so children are copied in their original order.
        for child in children.into_iter().rev() {
            let (child_name, hidden) = {
                let coll = scene.collection(child)?;
                (coll.name.clone(), coll.hidden)
            };
            let child_copy = scene.add_collection(&child_name, Some(to))?;
            scene.collection_mut(child_copy)?.hidden = hidden;
            stack.push((child, child_copy));
        }
    }

    for &copy in copies.values() {
        let object = scene.object_mut(copy)?;
        if let Some(parent) = object.parent {
            if let Some(&parent_copy) = copies.get(&parent) {
                object.parent = Some(parent_copy);
            }
        }
    }

    tracing::debug!(collection = name, objects = copies.len(), "collection duplicated");
    Ok(root)
}

/// Points each simplified material on `meshes` at a baked image so the
/// packer can pick it up: the lit image, or the first other pass image the
/// group holds when no light pass was baked.
fn wire_emission_previews(scene: &mut dyn Scene, meshes: &[ObjectId]) -> HostResult<()> {
    for &mesh in meshes {
        for material in simplified_materials(&*scene, mesh)? {
            let Some(group) = scene.material(material)?.shading.textures else {
                continue;
            };
            let preview = {
                let group = scene.texture_group(group)?;
                PassType::ALL.iter().find_map(|pass| group.image(pass.as_str()))
            };
            if preview.is_none() {
                let name = scene.material(material)?.name.clone();
                tracing::info!(material = %name, "Simplified material has no baked image, not atlassed");
            }
            scene.material_mut(material)?.shading.emission_preview = preview;
        }
    }
    Ok(())
}

fn simplified_materials(scene: &dyn Scene, object: ObjectId) -> HostResult<Vec<MaterialId>> {
    let mut materials = Vec::new();
    for material in scene.object(object)?.materials() {
        if materials.contains(&material) {
            continue;
        }
        if scene.material(material)?.kind == MaterialKind::Simplified {
            materials.push(material);
        }
    }
    Ok(materials)
}

/// Retargets armature and UV warp modifiers at the copied armature and
/// disables outlines, which the atlas cannot reproduce.
fn fix_modifiers(
    scene: &mut dyn Scene,
    mesh: ObjectId,
    armature: Option<ObjectId>,
) -> HostResult<()> {
    for modifier in &mut scene.object_mut(mesh)?.modifiers {
        match &mut modifier.kind {
            ModifierKind::Armature { object } => {
                if armature.is_some() {
                    *object = armature;
                }
            }
            ModifierKind::Solidify {
                show_render,
                show_viewport,
            } => {
                *show_render = false;
                *show_viewport = false;
            }
            ModifierKind::UvWarp {
                object_from,
                object_to,
            } => {
                if armature.is_some() {
                    *object_from = armature;
                    *object_to = armature;
                }
            }
            ModifierKind::Flatten { .. } => {}
        }
    }
    Ok(())
}

/// Moves the packer's `<index>_<pass>.png` to the stable per-object name
/// and loads it, replacing any earlier image of that name.
fn install_atlas_image(
    scene: &mut dyn Scene,
    atlas_dir: &Path,
    index: usize,
    object_name: &str,
    pass: PassType,
    report: &PackReport,
) -> BakeResult<Option<ImageId>> {
    let target_name = atlas_image_name(object_name, pass);
    if let Some(stale) = scene.find_image(&target_name) {
        scene.remove_image(stale)?;
    }

    let Some(packed) = report.get(index, pass) else {
        tracing::debug!(object = %object_name, pass = %pass, "packer produced no image");
        return Ok(None);
    };

    let source = atlas_dir.join(packed_image_name(index, pass));
    let target = atlas_dir.join(&target_name);
    if source.exists() {
        rename_replacing(&source, &target)?;
    }
    if !target.exists() {
        tracing::warn!(path = %target.display(), "atlas image missing, skipping");
        return Ok(None);
    }

    let image = match scene.load_image(&target) {
        Ok(image) => image,
        Err(e) if e.is_per_file() => {
            tracing::warn!(path = %target.display(), error = %e, "Could not load atlas image, skipping");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    if scene.image(packed.image).is_ok() {
        scene.remove_image(packed.image)?;
    }
    Ok(Some(image))
}

/// Renames `from` to `to`. If that fails, an existing `to` is deleted and
/// the rename is tried once more.
pub fn rename_replacing(from: &Path, to: &Path) -> BakeResult<()> {
    let first = match fs::rename(from, to) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    if !to.exists() {
        return Err(BakeError::Rename {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source: first,
        });
    }
    tracing::debug!(path = %to.display(), "removing stale file before rename");
    if to.is_dir() {
        fs::remove_dir_all(to)?;
    } else {
        fs::remove_file(to)?;
    }
    fs::rename(from, to).map_err(|source| BakeError::Rename {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

/// Binds `image` into `<material> Atlas`, creating it from the simplified
/// material on first use. Returns the atlas material name, or `None` if the
/// material has nothing to atlas for `pass`.
fn bind_atlas_material(
    scene: &mut dyn Scene,
    simple: MaterialId,
    pass: PassType,
    image: ImageId,
) -> HostResult<Option<String>> {
    let (name, group) = {
        let material = scene.material(simple)?;
        (material.name.clone(), material.shading.textures)
    };
    let Some(group) = group else {
        tracing::info!(material = %name, "simplified material has no texture group, not atlassed");
        return Ok(None);
    };
    let source = {
        let group = scene.texture_group(group)?;
        match pass {
            PassType::Dark => group.image("dark").or_else(|| group.image("light")),
            _ => group.image(pass.as_str()),
        }
    };
    let Some(source) = source else {
        return Ok(None);
    };
    if scene.image(source)?.name == PLACEHOLDER_IMAGE {
        return Ok(None);
    }

    let atlas_name = atlas_material_name(&name);
    let atlas_group = match scene.find_material(&atlas_name) {
        Some(existing) => {
            let fallback = scene.material(existing)?.shading.textures;
            match scene.find_texture_group(&atlas_name).or(fallback) {
                Some(g) => g,
                None => {
                    tracing::info!(material = %atlas_name, "atlas material has no texture group");
                    return Ok(None);
                }
            }
        }
        None => {
            let atlas = scene.copy_material(simple)?;
            scene.rename_material(atlas, &atlas_name)?;
            let atlas_group = scene.copy_texture_group(group, &atlas_name)?;
            let material = scene.material_mut(atlas)?;
            material.kind = MaterialKind::Atlased;
            material.shading.textures = Some(atlas_group);
            material.shading.emission_preview = None;
            atlas_group
        }
    };

    bind_pass_image(scene, atlas_group, pass, image, pass == PassType::Light)?;
    Ok(Some(atlas_name))
}

fn swap_to_atlas_materials(scene: &mut dyn Scene, mesh: ObjectId) -> HostResult<()> {
    let slots = scene.object(mesh)?.material_slots.clone();
    for (index, slot) in slots.into_iter().enumerate() {
        let Some(material) = slot else {
            continue;
        };
        let material = scene.material(material)?;
        if material.kind != MaterialKind::Simplified {
            continue;
        }
        let atlas_name = atlas_material_name(&material.name);
        match scene.find_material(&atlas_name) {
            Some(atlas) => scene.object_mut(mesh)?.material_slots[index] = Some(atlas),
            None => tracing::info!(material = %atlas_name, "no atlas material for slot, left as is"),
        }
    }
    Ok(())
}

/// Rebinds every simplified material to its per-material bakes (mirroring
/// light into dark when no dark bake was loaded) and purges unreferenced
/// data.
pub fn remove_orphan_data(scene: &mut dyn Scene) -> HostResult<usize> {
    for id in scene.material_ids() {
        let material = scene.material(id)?;
        if material.kind != MaterialKind::Simplified {
            continue;
        }
        let Some(group) = material.shading.textures else {
            continue;
        };
        let name = material.name.clone();
        let light = scene.find_image(&bake_file_name(&name, PassType::Light));
        let dark = scene.find_image(&bake_file_name(&name, PassType::Dark));
        let normal = scene.find_image(&bake_file_name(&name, PassType::Normal));

        let group = scene.texture_group_mut(group)?;
        if let Some(light) = light {
            group.set_image(PassType::Light.as_str(), Some(light));
        }
        if let Some(dark) = dark.or(light) {
            group.set_image(PassType::Dark.as_str(), Some(dark));
        }
        if let Some(normal) = normal {
            group.set_image(PassType::Normal.as_str(), Some(normal));
        }
    }

    let purged = scene.purge_orphans(&DataKind::ALL);
    tracing::debug!(purged, "orphan data purged");
    Ok(purged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use matbake_scene::{
        ErrorCode, Image, Material, MemoryScene, Modifier, Object, ObjectKind, ShelfPacker, TextureGroup,
    };
    use matbake_texture::png::{write_rgba, PngConfig};
    use matbake_texture::{Color, TextureBuffer};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    struct Fixture {
        scene: MemoryScene,
        config: BakeConfig,
        body: ObjectId,
        armature: ObjectId,
        skin: MaterialId,
    }

    fn write_png(path: &Path, w: u32, h: u32) {
        write_rgba(&TextureBuffer::new(w, h, Color::rgb(0.9, 0.7, 0.6)), path, &PngConfig::default())
            .unwrap();
    }

    fn simplified(scene: &mut MemoryScene, baked: &Path, name: &str) -> MaterialId {
        let mut group = TextureGroup::simplified(name);
        for pass in [PassType::Light, PassType::Dark] {
            let path = baked.join(bake_file_name(name, pass));
            write_png(&path, 16, 16);
            let image = scene.load_image(&path).unwrap();
            group.set_image(pass.as_str(), Some(image));
        }
        let group = scene.add_texture_group(group);
        let mut material = Material::new(name, MaterialKind::Simplified).with_textures(group);
        material.fake_user = true;
        scene.add_material(material).unwrap()
    }

    fn fixture(import_dir: &Path) -> Fixture {
        let config = BakeConfig::new(import_dir, "Rin").use_atlas(true);
        let baked = config.baked_dir();
        fs::create_dir_all(&baked).unwrap();

        let mut scene = MemoryScene::new();
        let model = scene.add_collection("Rin", None).unwrap();
        let skin = simplified(&mut scene, &baked, "Skin");
        let hair = simplified(&mut scene, &baked, "Hair");
        let eyes = scene
            .add_material(Material::new("Eyes", MaterialKind::RawIneligible))
            .unwrap();

        let armature = scene
            .add_linked_object(Object::new("Armature", ObjectKind::Armature), model)
            .unwrap();
        let mut body = Object::mesh("Body")
            .with_slots([skin, hair, eyes])
            .body()
            .with_modifier(Modifier::new(
                "Armature",
                ModifierKind::Armature {
                    object: Some(armature),
                },
            ))
            .with_modifier(Modifier::new(
                "Outline",
                ModifierKind::Solidify {
                    show_render: true,
                    show_viewport: true,
                },
            ));
        body.parent = Some(armature);
        let body = scene.add_linked_object(body, model).unwrap();
        scene
            .add_linked_object(Object::mesh("Eyeballs").with_slots([eyes]), model)
            .unwrap();

        Fixture {
            scene,
            config,
            body,
            armature,
            skin,
        }
    }

    fn atlas_body(scene: &MemoryScene, atlas: CollectionId) -> ObjectId {
        scene
            .meshes_in(atlas)
            .unwrap()
            .into_iter()
            .find(|&id| scene.object(id).unwrap().name == "Body.001")
            .unwrap()
    }

    fn bound_image(scene: &MemoryScene, material: MaterialId, node: &str) -> Option<String> {
        let group = scene.material(material).unwrap().shading.textures?;
        let image = scene.texture_group(group).unwrap().image(node)?;
        Some(scene.image(image).unwrap().name.clone())
    }

    #[test]
    fn test_atlas_rewires_duplicate_only() {
        let dir = tempdir().unwrap();
        let Fixture {
            mut scene,
            config,
            body,
            armature,
            skin,
        } = fixture(dir.path());
        let source_before = scene.object(body).unwrap().clone();

        let outcome = create_material_atlas(&mut scene, &ShelfPacker::default(), &config).unwrap();
        assert!(!outcome.replaced_previous);
        assert_eq!(
            outcome.images,
            vec!["Body_light.png".to_string(), "Body_dark.png".to_string()]
        );
        assert_eq!(outcome.materials, vec!["Skin Atlas".to_string(), "Hair Atlas".to_string()]);
        assert_eq!(outcome.skipped_meshes, vec!["Eyeballs.001".to_string()]);

        // Source untouched.
        assert_eq!(scene.object(body).unwrap(), &source_before);
        assert_eq!(bound_image(&scene, skin, "light").as_deref(), Some("Skin light.png"));

        let atlas = outcome.collection;
        let coll = scene.collection(atlas).unwrap();
        assert_eq!(coll.name, "Rin atlas");
        assert!(coll.hidden);
        assert_eq!(
            coll.exporter.as_ref().map(|e| e.filepath.clone()),
            Some(config.atlas_dir().join("Rin exported model atlas.fbx"))
        );

        let copy = atlas_body(&scene, atlas);
        let copy_object = scene.object(copy).unwrap();
        let skin_atlas = copy_object.material_slots[0].unwrap();
        assert_eq!(scene.material(skin_atlas).unwrap().name, "Skin Atlas");
        assert_eq!(scene.material(skin_atlas).unwrap().kind, MaterialKind::Atlased);
        assert_eq!(bound_image(&scene, skin_atlas, "light").as_deref(), Some("Body_light.png"));
        assert_eq!(bound_image(&scene, skin_atlas, "dark").as_deref(), Some("Body_dark.png"));
        assert_eq!(
            scene.material(copy_object.material_slots[2].unwrap()).unwrap().name,
            "Eyes"
        );

        let armature_copy = copy_object.parent.unwrap();
        assert_ne!(armature_copy, armature);
        assert_eq!(
            copy_object.modifier("Armature").map(|m| m.kind.clone()),
            Some(ModifierKind::Armature {
                object: Some(armature_copy)
            })
        );
        assert_eq!(
            copy_object.modifier("Outline").map(|m| m.kind.clone()),
            Some(ModifierKind::Solidify {
                show_render: false,
                show_viewport: false
            })
        );

        let atlas_dir = config.atlas_dir();
        assert!(atlas_dir.join("Body_light.png").exists());
        assert!(!atlas_dir.join("0_light.png").exists());
        assert!(scene.find_image("0_light.png").is_none());
        assert!(scene
            .material_ids()
            .iter()
            .all(|&m| scene.material(m).unwrap().shading.emission_preview.is_none()));
    }

    #[test]
    fn test_atlas_regeneration_converges() {
        let dir = tempdir().unwrap();
        let Fixture {
            mut scene, config, ..
        } = fixture(dir.path());
        let packer = ShelfPacker::default();

        let first = create_material_atlas(&mut scene, &packer, &config).unwrap();
        let objects_first = scene.all_objects(first.collection).unwrap().len();
        let materials_first = scene.material_ids().len();
        let images_first = scene.image_ids().len();

        let second = create_material_atlas(&mut scene, &packer, &config).unwrap();
        assert!(second.replaced_previous);
        assert!(scene.collection(first.collection).is_err());
        assert_eq!(scene.all_objects(second.collection).unwrap().len(), objects_first);
        assert_eq!(scene.material_ids().len(), materials_first);
        assert_eq!(scene.image_ids().len(), images_first);
        assert!(scene.find_image("Body_light.png.001").is_none());
        assert!(scene.find_material("Skin Atlas.001").is_none());

        let copy = atlas_body(&scene, second.collection);
        let skin_atlas = scene.object(copy).unwrap().material_slots[0].unwrap();
        assert_eq!(bound_image(&scene, skin_atlas, "light").as_deref(), Some("Body_light.png"));
    }

    #[test]
    fn test_placeholder_images_not_atlassed() {
        let dir = tempdir().unwrap();
        let Fixture {
            mut scene,
            config,
            skin,
            ..
        } = fixture(dir.path());
        let group = scene.material(skin).unwrap().shading.textures.unwrap();
        let placeholder = scene.add_image(Image::new(PLACEHOLDER_IMAGE, 8, 8));
        let group = scene.texture_group_mut(group).unwrap();
        group.set_image("light", Some(placeholder));
        group.set_image("dark", Some(placeholder));

        let outcome = create_material_atlas(&mut scene, &ShelfPacker::default(), &config).unwrap();
        assert_eq!(outcome.materials, vec!["Hair Atlas".to_string()]);
        assert!(scene.find_material("Skin Atlas").is_none());
    }

    #[test]
    fn test_missing_model_is_reported() {
        let dir = tempdir().unwrap();
        let mut scene = MemoryScene::new();
        let config = BakeConfig::new(dir.path(), "Nobody");
        let err = create_material_atlas(&mut scene, &ShelfPacker::default(), &config).unwrap_err();
        assert!(matches!(err, BakeError::ModelNotFound(name) if name == "Nobody"));
    }

    #[test]
    fn test_rename_replacing_overwrites_stale_target() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("0_light.png");
        let to = dir.path().join("Body_light.png");
        fs::write(&from, b"new").unwrap();
        fs::write(&to, b"old").unwrap();
        rename_replacing(&from, &to).unwrap();
        assert_eq!(fs::read(&to).unwrap(), b"new");
        assert!(!from.exists());
    }

    #[test]
    fn test_rename_replacing_clears_blocking_directory() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("0_light.png");
        let to = dir.path().join("Body_light.png");
        fs::write(&from, b"new").unwrap();
        // A non-empty directory makes the first rename fail everywhere.
        fs::create_dir(&to).unwrap();
        fs::write(to.join("stale.png"), b"old").unwrap();

        rename_replacing(&from, &to).unwrap();
        assert!(to.is_file());
        assert_eq!(fs::read(&to).unwrap(), b"new");
        assert!(!from.exists());
    }

    #[test]
    fn test_rename_replacing_fails_after_one_retry() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("0_light.png");
        let to = dir.path().join("Body_light.png");
        fs::create_dir(&to).unwrap();
        fs::write(to.join("stale.png"), b"old").unwrap();

        let err = rename_replacing(&from, &to).unwrap_err();
        assert_eq!(err.code(), "BAKE_006");
        assert!(matches!(&err, BakeError::Rename { from: f, to: t, .. } if f == &from && t == &to));
        // The stale target was cleared before the retry.
        assert!(!to.exists());
    }

    #[test]
    fn test_rename_replacing_missing_source() {
        let dir = tempdir().unwrap();
        let err = rename_replacing(&dir.path().join("nope.png"), &dir.path().join("x.png")).unwrap_err();
        assert!(matches!(err, BakeError::Rename { .. }));
    }
}
