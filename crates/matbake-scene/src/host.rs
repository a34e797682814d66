//! The capability interface the bake pipeline drives.
//!
//! Every mutation the pipeline performs on the host goes through [`Scene`].
//! Data blocks are addressed by typed ids; lookups by name exist because
//! the bake conventions are name-based (`-ORG`, `<name> Atlas`,
//! `<name> light.png`).

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::error::HostResult;
use crate::ids::{CollectionId, ImageId, MaterialId, ObjectId, TextureGroupId};
use crate::material::{Image, Material, TextureGroup};
use crate::object::Object;
use crate::render::{LightLevel, RenderSettings, ViewportShading};

/// Registries that [`Scene::purge_orphans`] can sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// Objects not linked into any collection.
    Objects,
    /// Materials with no slot users and no fake user.
    Materials,
    /// Texture groups no material references.
    TextureGroups,
    /// Images no texture group or emission preview references.
    Images,
}

impl DataKind {
    pub const ALL: [DataKind; 4] = [
        DataKind::Objects,
        DataKind::Materials,
        DataKind::TextureGroups,
        DataKind::Images,
    ];
}

/// A mutable 3D scene with a render engine attached.
///
/// Names are unique per registry. Adding, copying, renaming or loading
/// something under a taken name yields `<name>.NNN`, and the methods that do
/// so return the name actually assigned.
pub trait Scene {
    // Objects

    /// Every object id, in creation order.
    fn object_ids(&self) -> Vec<ObjectId>;
    fn object(&self, id: ObjectId) -> HostResult<&Object>;
    fn object_mut(&mut self, id: ObjectId) -> HostResult<&mut Object>;
    fn find_object(&self, name: &str) -> Option<ObjectId>;
    /// Registers an unlinked object.
    fn add_object(&mut self, object: Object) -> HostResult<ObjectId>;
    /// Duplicates an object together with its own data (slots, modifiers).
    /// The copy is unlinked and keeps pointing at the same materials.
    fn copy_object(&mut self, id: ObjectId) -> HostResult<ObjectId>;
    /// Deletes an object, unlinking it everywhere and clearing references
    /// other objects hold to it.
    fn remove_object(&mut self, id: ObjectId) -> HostResult<()>;

    // Materials

    fn material_ids(&self) -> Vec<MaterialId>;
    fn material(&self, id: MaterialId) -> HostResult<&Material>;
    fn material_mut(&mut self, id: MaterialId) -> HostResult<&mut Material>;
    fn find_material(&self, name: &str) -> Option<MaterialId>;
    fn add_material(&mut self, material: Material) -> HostResult<MaterialId>;
    /// Duplicates a material. The copy shares the texture group and does not
    /// inherit the fake user.
    fn copy_material(&mut self, id: MaterialId) -> HostResult<MaterialId>;
    fn rename_material(&mut self, id: MaterialId, name: &str) -> HostResult<String>;
    /// Deletes a material and empties every slot that held it.
    fn remove_material(&mut self, id: MaterialId) -> HostResult<()>;
    /// Instantiates a material from the host's template library, importing
    /// the template first if needed.
    fn import_material_template(&mut self, name: &str) -> HostResult<MaterialId>;

    // Texture groups

    fn texture_group(&self, id: TextureGroupId) -> HostResult<&TextureGroup>;
    fn texture_group_mut(&mut self, id: TextureGroupId) -> HostResult<&mut TextureGroup>;
    fn find_texture_group(&self, name: &str) -> Option<TextureGroupId>;
    fn copy_texture_group(&mut self, id: TextureGroupId, name: &str)
        -> HostResult<TextureGroupId>;

    // Images

    fn image_ids(&self) -> Vec<ImageId>;
    fn image(&self, id: ImageId) -> HostResult<&Image>;
    fn image_mut(&mut self, id: ImageId) -> HostResult<&mut Image>;
    fn find_image(&self, name: &str) -> Option<ImageId>;
    /// Loads an image file, naming it after the file.
    fn load_image(&mut self, path: &Path) -> HostResult<ImageId>;
    /// Deletes an image and unbinds it from every node.
    fn remove_image(&mut self, id: ImageId) -> HostResult<()>;
    fn rename_image(&mut self, id: ImageId, name: &str) -> HostResult<String>;
    /// Rebinds every user of `from` to `to`. Returns the number of bindings
    /// changed.
    fn remap_image_users(&mut self, from: ImageId, to: ImageId) -> HostResult<usize>;

    // Collections

    fn collection(&self, id: CollectionId) -> HostResult<&Collection>;
    fn collection_mut(&mut self, id: CollectionId) -> HostResult<&mut Collection>;
    fn find_collection(&self, name: &str) -> Option<CollectionId>;
    /// Creates a collection under `parent`, or at the scene root.
    fn add_collection(&mut self, name: &str, parent: Option<CollectionId>)
        -> HostResult<CollectionId>;
    /// Deletes a collection and all of its children. Objects are unlinked,
    /// not deleted.
    fn remove_collection(&mut self, id: CollectionId) -> HostResult<()>;
    fn link_object(&mut self, object: ObjectId, collection: CollectionId) -> HostResult<()>;
    /// First collection the object is linked into.
    fn collection_of(&self, object: ObjectId) -> Option<CollectionId>;

    /// Objects of `collection` and, depth first, of its children. Each
    /// object appears once.
    fn all_objects(&self, collection: CollectionId) -> HostResult<Vec<ObjectId>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut stack = vec![collection];
        while let Some(id) = stack.pop() {
            let coll = self.collection(id)?;
            for &object in &coll.objects {
                if seen.insert(object) {
                    out.push(object);
                }
            }
            stack.extend(coll.children.iter().rev().copied());
        }
        Ok(out)
    }

    /// Mesh objects of [`Scene::all_objects`], in the same order.
    fn meshes_in(&self, collection: CollectionId) -> HostResult<Vec<ObjectId>> {
        let mut meshes = Vec::new();
        for id in self.all_objects(collection)? {
            if self.object(id)?.is_mesh() {
                meshes.push(id);
            }
        }
        Ok(meshes)
    }

    // Scene state

    fn render_settings(&self) -> &RenderSettings;
    fn render_settings_mut(&mut self) -> &mut RenderSettings;
    /// Light-level input of the shared colour-combine group.
    fn light_level(&self) -> LightLevel;
    fn set_light_level(&mut self, level: LightLevel);
    fn scene_camera(&self) -> Option<ObjectId>;
    fn set_scene_camera(&mut self, camera: Option<ObjectId>);
    fn active_object(&self) -> Option<ObjectId>;
    fn set_active_object(&mut self, object: Option<ObjectId>);
    fn viewport_shading(&self) -> ViewportShading;
    fn set_viewport_shading(&mut self, shading: ViewportShading);

    /// Renders the scene camera's view to `path` and blocks until the file
    /// is written.
    fn render_still(&mut self, path: &Path) -> HostResult<()>;

    // Assets

    /// Imports a node asset (e.g. the UV flattener) from the library.
    fn import_asset(&mut self, name: &str) -> HostResult<()>;
    fn remove_asset(&mut self, name: &str) -> bool;
    fn has_asset(&self, name: &str) -> bool;

    /// Deletes zero-user data of the given kinds until nothing more is
    /// freed. Returns the number of data blocks removed.
    fn purge_orphans(&mut self, kinds: &[DataKind]) -> usize;
}
