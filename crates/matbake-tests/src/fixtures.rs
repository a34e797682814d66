//! Model fixtures backed by a temporary import directory.

use std::fs;
use std::path::{Path, PathBuf};

use matbake_core::naming::atlas_collection_name;
use matbake_core::BakeConfig;
use matbake_scene::{
    CollectionId, Material, MaterialId, MaterialKind, MemoryScene, Modifier, ModifierKind, Object,
    ObjectId, ObjectKind, Scene, TextureGroup,
};
use matbake_texture::png::{self, PngConfig};
use matbake_texture::{Color, TextureBuffer};
use tempfile::TempDir;

/// A character model in a fresh scene, imported from a scratch directory.
pub struct ModelFixture {
    pub root: TempDir,
    pub scene: MemoryScene,
    pub model: CollectionId,
    pub name: String,
}

impl ModelFixture {
    /// Create an empty model collection called `name`.
    pub fn new(name: &str) -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        let mut scene = MemoryScene::new();
        let model = scene
            .add_collection(name, None)
            .expect("Failed to add model collection");
        Self {
            root,
            scene,
            model,
            name: name.to_string(),
        }
    }

    /// The import directory.
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Default config for this model.
    pub fn config(&self) -> BakeConfig {
        BakeConfig::new(self.path(), &self.name)
    }

    /// Add a procedural, bake-eligible material with no image inputs.
    pub fn add_raw_material(&mut self, name: &str) -> MaterialId {
        self.scene
            .add_material(Material::new(name, MaterialKind::RawEligible))
            .expect("Failed to add material")
    }

    /// Add a material that must never be baked.
    pub fn add_ineligible_material(&mut self, name: &str) -> MaterialId {
        self.scene
            .add_material(Material::new(name, MaterialKind::RawIneligible))
            .expect("Failed to add material")
    }

    /// Add a bake-eligible material whose texture group samples a
    /// `width` x `height` source image written under `textures/`.
    pub fn add_textured_material(&mut self, name: &str, width: u32, height: u32) -> MaterialId {
        let path = self.write_texture(&format!("{}_diffuse.png", name), width, height);
        let image = self.scene.load_image(&path).expect("Failed to load texture");
        let group = self.scene.add_texture_group(
            TextureGroup::new(name)
                .with_node("diffuse", Some(image))
                .with_shade(0.8)
                .with_normal_output(),
        );
        self.scene
            .add_material(
                Material::new(name, MaterialKind::RawEligible)
                    .with_textures(group)
                    .with_base_color([0.9, 0.6, 0.5, 1.0]),
            )
            .expect("Failed to add material")
    }

    /// Write a solid source texture and return its path.
    pub fn write_texture(&self, file_name: &str, width: u32, height: u32) -> PathBuf {
        let dir = self.path().join("textures");
        fs::create_dir_all(&dir).expect("Failed to create textures dir");
        let path = dir.join(file_name);
        let buffer = TextureBuffer::new(width, height, Color::rgb(0.5, 0.5, 0.5));
        png::write_rgba(&buffer, &path, &PngConfig::default()).expect("Failed to write texture");
        path
    }

    /// Add the body mesh to the model collection.
    pub fn add_body(&mut self, name: &str, slots: &[MaterialId]) -> ObjectId {
        let object = Object::mesh(name).with_slots(slots.iter().copied()).body();
        self.scene
            .add_linked_object(object, self.model)
            .expect("Failed to add body")
    }

    /// Add a clothing mesh in a child collection that starts hidden.
    pub fn add_clothing(&mut self, collection: &str, name: &str, slots: &[MaterialId]) -> ObjectId {
        let coll = match self.scene.find_collection(collection) {
            Some(existing) => existing,
            None => {
                let coll = self
                    .scene
                    .add_collection(collection, Some(self.model))
                    .expect("Failed to add collection");
                self.scene.collection_mut(coll).expect("collection").hidden = true;
                coll
            }
        };
        let object = Object::mesh(name).with_slots(slots.iter().copied());
        self.scene
            .add_linked_object(object, coll)
            .expect("Failed to add clothing")
    }

    /// Add an armature and rig `meshes` to it with armature and outline
    /// modifiers.
    pub fn add_armature(&mut self, meshes: &[ObjectId]) -> ObjectId {
        let armature = self
            .scene
            .add_linked_object(Object::new("Armature", ObjectKind::Armature), self.model)
            .expect("Failed to add armature");
        for &mesh in meshes {
            let object = self.scene.object_mut(mesh).expect("mesh");
            object.parent = Some(armature);
            object.modifiers.push(Modifier::new(
                "Armature",
                ModifierKind::Armature {
                    object: Some(armature),
                },
            ));
            object.modifiers.push(Modifier::new(
                "Outline",
                ModifierKind::Solidify {
                    show_render: true,
                    show_viewport: true,
                },
            ));
        }
        armature
    }

    /// Sorted file names in `dir`.
    pub fn files_in(dir: &Path) -> Vec<String> {
        let mut files: Vec<String> = walkdir::WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        files
    }

    /// Collection holding the atlas duplicate, if one was built.
    pub fn atlas_collection(&self) -> Option<CollectionId> {
        self.scene.find_collection(&atlas_collection_name(&self.name))
    }
}

/// Material name, kind and `(node, image)` bindings.
pub type SlotSummary = (String, MaterialKind, Vec<(String, String)>);

fn bindings(scene: &dyn Scene, material: MaterialId) -> SlotSummary {
    let material = scene.material(material).expect("material");
    let mut images = Vec::new();
    if let Some(group) = material.shading.textures {
        let group = scene.texture_group(group).expect("texture group");
        for node in &group.image_nodes {
            if let Some(image) = node.image {
                let image = scene.image(image).expect("image");
                images.push((node.name.clone(), image.name.clone()));
            }
        }
    }
    (material.name.clone(), material.kind, images)
}

/// Slot-by-slot material name, kind and image bindings of `object`.
pub fn material_summary(
    scene: &dyn Scene,
    object: ObjectId,
) -> Vec<Option<SlotSummary>> {
    scene
        .object(object)
        .expect("object")
        .material_slots
        .iter()
        .map(|slot| slot.map(|m| bindings(scene, m)))
        .collect()
}

/// Every object of an atlas collection with its slot summary, by name.
pub fn atlas_summary(
    scene: &dyn Scene,
    atlas: CollectionId,
) -> Vec<(String, Vec<Option<SlotSummary>>)> {
    let mut summary: Vec<_> = scene
        .all_objects(atlas)
        .expect("atlas objects")
        .into_iter()
        .map(|id| {
            let name = scene.object(id).expect("object").name.clone();
            (name, material_summary(scene, id))
        })
        .collect();
    summary.sort_by(|a, b| a.0.cmp(&b.0));
    summary
}
