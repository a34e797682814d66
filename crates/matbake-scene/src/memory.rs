//! In-memory reference host.
//!
//! [`MemoryScene`] keeps every registry in ordered maps and serializes to a
//! JSON scene document. Its renderer is flat: the canvas takes the colour of
//! the front-most non-transparent material on a render-visible mesh, which
//! is enough to observe which material the pipeline exposed for each shot.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use matbake_texture::png::{self, PngConfig};
use matbake_texture::{Color, TextureBuffer};
use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::error::{HostError, HostResult};
use crate::host::{DataKind, Scene};
use crate::ids::{CollectionId, ImageId, MaterialId, ObjectId, TextureGroupId};
use crate::library::TemplateLibrary;
use crate::material::{Image, Material, OutputRoute, TextureGroup};
use crate::naming::{unique_name, MAX_NAME_LEN};
use crate::object::{Axis, ModifierKind, Object, ObjectKind};
use crate::render::{LightLevel, RenderRecord, RenderSettings, ViewportShading};

fn free_name<K: Ord + Copy, T>(
    map: &BTreeMap<K, T>,
    name_of: impl Fn(&T) -> &str,
    base: &str,
    except: Option<K>,
) -> String {
    unique_name(base, |candidate| {
        map.iter()
            .any(|(k, v)| Some(*k) != except && name_of(v) == candidate)
    })
}

fn find_by_name<K: Copy, T>(map: &BTreeMap<K, T>, name_of: impl Fn(&T) -> &str, name: &str) -> Option<K> {
    map.iter().find(|(_, v)| name_of(v) == name).map(|(k, _)| *k)
}

/// A scene document held entirely in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryScene {
    #[serde(default)]
    objects: BTreeMap<ObjectId, Object>,
    #[serde(default)]
    materials: BTreeMap<MaterialId, Material>,
    #[serde(default)]
    texture_groups: BTreeMap<TextureGroupId, TextureGroup>,
    #[serde(default)]
    images: BTreeMap<ImageId, Image>,
    #[serde(default)]
    collections: BTreeMap<CollectionId, Collection>,
    /// Top-level collections, in outliner order.
    #[serde(default)]
    roots: Vec<CollectionId>,
    #[serde(default)]
    render: RenderSettings,
    #[serde(default)]
    light_level: LightLevel,
    #[serde(default)]
    camera: Option<ObjectId>,
    #[serde(default)]
    active: Option<ObjectId>,
    #[serde(default)]
    shading: ViewportShading,
    #[serde(default)]
    assets: BTreeSet<String>,
    #[serde(default = "TemplateLibrary::standard")]
    library: TemplateLibrary,
    #[serde(default)]
    next_id: u32,
    #[serde(skip)]
    renders: Vec<RenderRecord>,
    #[serde(skip)]
    fail_render_at: Option<usize>,
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryScene {
    /// Empty scene with the standard template library.
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            materials: BTreeMap::new(),
            texture_groups: BTreeMap::new(),
            images: BTreeMap::new(),
            collections: BTreeMap::new(),
            roots: Vec::new(),
            render: RenderSettings::default(),
            light_level: LightLevel::Driven,
            camera: None,
            active: None,
            shading: ViewportShading::Solid,
            assets: BTreeSet::new(),
            library: TemplateLibrary::standard(),
            next_id: 0,
            renders: Vec::new(),
            fail_render_at: None,
        }
    }

    /// Parses a scene document.
    pub fn from_json(json: &str) -> HostResult<Self> {
        let mut scene: MemoryScene = serde_json::from_str(json)?;
        let highest = scene
            .objects
            .keys()
            .map(|id| id.0)
            .chain(scene.materials.keys().map(|id| id.0))
            .chain(scene.texture_groups.keys().map(|id| id.0))
            .chain(scene.images.keys().map(|id| id.0))
            .chain(scene.collections.keys().map(|id| id.0))
            .max()
            .unwrap_or(0);
        scene.next_id = scene.next_id.max(highest);
        Ok(scene)
    }

    pub fn to_json(&self) -> HostResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    /// Every still rendered so far, oldest first.
    pub fn renders(&self) -> &[RenderRecord] {
        &self.renders
    }

    /// Makes the render with zero-based index `index` fail.
    pub fn fail_render_at(&mut self, index: usize) {
        self.fail_render_at = Some(index);
    }

    pub fn root_collections(&self) -> &[CollectionId] {
        &self.roots
    }

    /// Registers a texture group under a unique name.
    pub fn add_texture_group(&mut self, mut group: TextureGroup) -> TextureGroupId {
        group.name = free_name(&self.texture_groups, |g| &g.name, &group.name, None);
        let id = TextureGroupId(self.alloc());
        self.texture_groups.insert(id, group);
        id
    }

    /// Registers an image that has no backing file.
    pub fn add_image(&mut self, mut image: Image) -> ImageId {
        image.name = free_name(&self.images, |i| &i.name, &image.name, None);
        let id = ImageId(self.alloc());
        self.images.insert(id, image);
        id
    }

    /// Adds an object and links it into `collection`.
    pub fn add_linked_object(&mut self, object: Object, collection: CollectionId) -> HostResult<ObjectId> {
        let id = self.add_object(object)?;
        self.link_object(id, collection)?;
        Ok(id)
    }

    fn alloc(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Objects linked into a collection whose whole ancestry is shown.
    fn view_layer_objects(&self) -> Vec<ObjectId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut stack: Vec<CollectionId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(coll) = self.collections.get(&id) else {
                continue;
            };
            if coll.hidden {
                continue;
            }
            for &object in &coll.objects {
                if seen.insert(object) {
                    out.push(object);
                }
            }
            stack.extend(coll.children.iter().rev().copied());
        }
        out
    }

    fn evaluate_drivers(&mut self) {
        let (rx, ry) = (self.render.resolution_x, self.render.resolution_y);
        let cameras: BTreeMap<ObjectId, f64> = self
            .objects
            .iter()
            .filter_map(|(id, o)| match o.kind {
                ObjectKind::Camera { ortho_scale } => Some((*id, ortho_scale)),
                _ => None,
            })
            .collect();
        for object in self.objects.values_mut() {
            for driver in &object.drivers {
                let Some(&ortho) = cameras.get(&driver.camera) else {
                    continue;
                };
                let value = driver.evaluate(ortho, rx, ry);
                match driver.axis {
                    Axis::X => object.scale[0] = value,
                    Axis::Y => object.scale[1] = value,
                }
            }
        }
    }

    fn surface_color(&self, material: &Material) -> Color {
        if material.shading.output == OutputRoute::NormalPassthrough {
            return Color::flat_normal();
        }
        let factor = match self.light_level {
            LightLevel::Constant(v) => 0.5 + 0.5 * v.clamp(0.0, 1.0),
            LightLevel::Driven => 0.75,
        };
        Color::from_array(material.shading.base_color).shade(factor)
    }

    fn purge_round(&mut self, kind: DataKind) -> usize {
        match kind {
            DataKind::Objects => {
                let linked: HashSet<ObjectId> = self
                    .collections
                    .values()
                    .flat_map(|c| c.objects.iter().copied())
                    .collect();
                let orphans: Vec<ObjectId> = self
                    .objects
                    .keys()
                    .filter(|id| !linked.contains(id))
                    .copied()
                    .collect();
                for id in &orphans {
                    self.detach_object(*id);
                }
                orphans.len()
            }
            DataKind::Materials => {
                let used: HashSet<MaterialId> = self
                    .objects
                    .values()
                    .flat_map(|o| o.materials())
                    .collect();
                let before = self.materials.len();
                self.materials
                    .retain(|id, m| m.fake_user || used.contains(id));
                before - self.materials.len()
            }
            DataKind::TextureGroups => {
                let used: HashSet<TextureGroupId> = self
                    .materials
                    .values()
                    .filter_map(|m| m.shading.textures)
                    .collect();
                let before = self.texture_groups.len();
                self.texture_groups.retain(|id, _| used.contains(id));
                before - self.texture_groups.len()
            }
            DataKind::Images => {
                let used: HashSet<ImageId> = self
                    .texture_groups
                    .values()
                    .flat_map(|g| g.images())
                    .chain(self.materials.values().filter_map(|m| m.shading.emission_preview))
                    .collect();
                let before = self.images.len();
                self.images.retain(|id, _| used.contains(id));
                before - self.images.len()
            }
        }
    }

    /// Removes an object and every reference to it.
    fn detach_object(&mut self, id: ObjectId) {
        self.objects.remove(&id);
        for coll in self.collections.values_mut() {
            coll.objects.retain(|o| *o != id);
        }
        for object in self.objects.values_mut() {
            if object.parent == Some(id) {
                object.parent = None;
            }
            object.drivers.retain(|d| d.camera != id);
            for modifier in &mut object.modifiers {
                match &mut modifier.kind {
                    ModifierKind::Armature { object } if *object == Some(id) => *object = None,
                    ModifierKind::UvWarp {
                        object_from,
                        object_to,
                    } => {
                        if *object_from == Some(id) {
                            *object_from = None;
                        }
                        if *object_to == Some(id) {
                            *object_to = None;
                        }
                    }
                    _ => {}
                }
            }
        }
        if self.camera == Some(id) {
            self.camera = None;
        }
        if self.active == Some(id) {
            self.active = None;
        }
    }
}

impl Scene for MemoryScene {
    fn object_ids(&self) -> Vec<ObjectId> {
        self.objects.keys().copied().collect()
    }

    fn object(&self, id: ObjectId) -> HostResult<&Object> {
        self.objects.get(&id).ok_or(HostError::MissingObject(id))
    }

    fn object_mut(&mut self, id: ObjectId) -> HostResult<&mut Object> {
        self.objects.get_mut(&id).ok_or(HostError::MissingObject(id))
    }

    fn find_object(&self, name: &str) -> Option<ObjectId> {
        find_by_name(&self.objects, |o| &o.name, name)
    }

    fn add_object(&mut self, mut object: Object) -> HostResult<ObjectId> {
        object.name = free_name(&self.objects, |o| &o.name, &object.name, None);
        let id = ObjectId(self.alloc());
        self.objects.insert(id, object);
        Ok(id)
    }

    fn copy_object(&mut self, id: ObjectId) -> HostResult<ObjectId> {
        let copy = self.object(id)?.clone();
        self.add_object(copy)
    }

    fn remove_object(&mut self, id: ObjectId) -> HostResult<()> {
        self.object(id)?;
        self.detach_object(id);
        Ok(())
    }

    fn material_ids(&self) -> Vec<MaterialId> {
        self.materials.keys().copied().collect()
    }

    fn material(&self, id: MaterialId) -> HostResult<&Material> {
        self.materials.get(&id).ok_or(HostError::MissingMaterial(id))
    }

    fn material_mut(&mut self, id: MaterialId) -> HostResult<&mut Material> {
        self.materials.get_mut(&id).ok_or(HostError::MissingMaterial(id))
    }

    fn find_material(&self, name: &str) -> Option<MaterialId> {
        find_by_name(&self.materials, |m| &m.name, name)
    }

    fn add_material(&mut self, mut material: Material) -> HostResult<MaterialId> {
        material.name = free_name(&self.materials, |m| &m.name, &material.name, None);
        let id = MaterialId(self.alloc());
        self.materials.insert(id, material);
        Ok(id)
    }

    fn copy_material(&mut self, id: MaterialId) -> HostResult<MaterialId> {
        let mut copy = self.material(id)?.clone();
        copy.fake_user = false;
        self.add_material(copy)
    }

    fn rename_material(&mut self, id: MaterialId, name: &str) -> HostResult<String> {
        let name = free_name(&self.materials, |m| &m.name, name, Some(id));
        self.material_mut(id)?.name = name.clone();
        Ok(name)
    }

    fn remove_material(&mut self, id: MaterialId) -> HostResult<()> {
        self.materials
            .remove(&id)
            .ok_or(HostError::MissingMaterial(id))?;
        for object in self.objects.values_mut() {
            for slot in &mut object.material_slots {
                if *slot == Some(id) {
                    *slot = None;
                }
            }
        }
        Ok(())
    }

    fn import_material_template(&mut self, name: &str) -> HostResult<MaterialId> {
        if let Some(existing) = self.find_material(name) {
            return self.copy_material(existing);
        }
        let template = self
            .library
            .material(name)
            .cloned()
            .ok_or_else(|| HostError::MissingTemplate(name.to_string()))?;
        let group = self.add_texture_group(template.textures);
        let imported = self.add_material(template.material.with_textures(group))?;
        tracing::debug!(template = name, "imported material template");
        self.copy_material(imported)
    }

    fn texture_group(&self, id: TextureGroupId) -> HostResult<&TextureGroup> {
        self.texture_groups
            .get(&id)
            .ok_or(HostError::MissingTextureGroup(id))
    }

    fn texture_group_mut(&mut self, id: TextureGroupId) -> HostResult<&mut TextureGroup> {
        self.texture_groups
            .get_mut(&id)
            .ok_or(HostError::MissingTextureGroup(id))
    }

    fn find_texture_group(&self, name: &str) -> Option<TextureGroupId> {
        find_by_name(&self.texture_groups, |g| &g.name, name)
    }

    fn copy_texture_group(
        &mut self,
        id: TextureGroupId,
        name: &str,
    ) -> HostResult<TextureGroupId> {
        let mut copy = self.texture_group(id)?.clone();
        copy.name = name.to_string();
        Ok(self.add_texture_group(copy))
    }

    fn image_ids(&self) -> Vec<ImageId> {
        self.images.keys().copied().collect()
    }

    fn image(&self, id: ImageId) -> HostResult<&Image> {
        self.images.get(&id).ok_or(HostError::MissingImage(id))
    }

    fn image_mut(&mut self, id: ImageId) -> HostResult<&mut Image> {
        self.images.get_mut(&id).ok_or(HostError::MissingImage(id))
    }

    fn find_image(&self, name: &str) -> Option<ImageId> {
        find_by_name(&self.images, |i| &i.name, name)
    }

    fn load_image(&mut self, path: &Path) -> HostResult<ImageId> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| HostError::load_image(path, "path has no file name"))?;
        if file_name.len() > MAX_NAME_LEN {
            return Err(HostError::NameTooLong {
                name: file_name,
                max: MAX_NAME_LEN,
            });
        }
        let (width, height) =
            png::dimensions(path).map_err(|e| HostError::load_image(path, e.to_string()))?;
        let mut image = Image::new(file_name, width, height);
        image.filepath = Some(path.to_path_buf());
        Ok(self.add_image(image))
    }

    fn remove_image(&mut self, id: ImageId) -> HostResult<()> {
        self.images.remove(&id).ok_or(HostError::MissingImage(id))?;
        for group in self.texture_groups.values_mut() {
            for node in &mut group.image_nodes {
                if node.image == Some(id) {
                    node.image = None;
                }
            }
        }
        for material in self.materials.values_mut() {
            if material.shading.emission_preview == Some(id) {
                material.shading.emission_preview = None;
            }
        }
        Ok(())
    }

    fn rename_image(&mut self, id: ImageId, name: &str) -> HostResult<String> {
        let name = free_name(&self.images, |i| &i.name, name, Some(id));
        self.image_mut(id)?.name = name.clone();
        Ok(name)
    }

    fn remap_image_users(&mut self, from: ImageId, to: ImageId) -> HostResult<usize> {
        self.image(from)?;
        self.image(to)?;
        let mut changed = 0;
        for group in self.texture_groups.values_mut() {
            for node in &mut group.image_nodes {
                if node.image == Some(from) {
                    node.image = Some(to);
                    changed += 1;
                }
            }
        }
        for material in self.materials.values_mut() {
            if material.shading.emission_preview == Some(from) {
                material.shading.emission_preview = Some(to);
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn collection(&self, id: CollectionId) -> HostResult<&Collection> {
        self.collections
            .get(&id)
            .ok_or(HostError::MissingCollection(id))
    }

    fn collection_mut(&mut self, id: CollectionId) -> HostResult<&mut Collection> {
        self.collections
            .get_mut(&id)
            .ok_or(HostError::MissingCollection(id))
    }

    fn find_collection(&self, name: &str) -> Option<CollectionId> {
        find_by_name(&self.collections, |c| &c.name, name)
    }

    fn add_collection(
        &mut self,
        name: &str,
        parent: Option<CollectionId>,
    ) -> HostResult<CollectionId> {
        if let Some(parent) = parent {
            self.collection(parent)?;
        }
        let name = free_name(&self.collections, |c| &c.name, name, None);
        let id = CollectionId(self.alloc());
        self.collections.insert(id, Collection::new(name));
        match parent {
            Some(parent) => self.collection_mut(parent)?.children.push(id),
            None => self.roots.push(id),
        }
        Ok(id)
    }

    fn remove_collection(&mut self, id: CollectionId) -> HostResult<()> {
        self.collection(id)?;
        let mut doomed = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(coll) = self.collections.get(&next) {
                stack.extend(coll.children.iter().copied());
            }
            doomed.push(next);
        }
        for coll in &doomed {
            self.collections.remove(coll);
        }
        self.roots.retain(|c| !doomed.contains(c));
        for coll in self.collections.values_mut() {
            coll.children.retain(|c| !doomed.contains(c));
        }
        Ok(())
    }

    fn link_object(&mut self, object: ObjectId, collection: CollectionId) -> HostResult<()> {
        self.object(object)?;
        let coll = self.collection_mut(collection)?;
        if !coll.objects.contains(&object) {
            coll.objects.push(object);
        }
        Ok(())
    }

    fn collection_of(&self, object: ObjectId) -> Option<CollectionId> {
        self.collections
            .iter()
            .find(|(_, c)| c.objects.contains(&object))
            .map(|(id, _)| *id)
    }

    fn render_settings(&self) -> &RenderSettings {
        &self.render
    }

    fn render_settings_mut(&mut self) -> &mut RenderSettings {
        &mut self.render
    }

    fn light_level(&self) -> LightLevel {
        self.light_level
    }

    fn set_light_level(&mut self, level: LightLevel) {
        self.light_level = level;
    }

    fn scene_camera(&self) -> Option<ObjectId> {
        self.camera
    }

    fn set_scene_camera(&mut self, camera: Option<ObjectId>) {
        self.camera = camera;
    }

    fn active_object(&self) -> Option<ObjectId> {
        self.active
    }

    fn set_active_object(&mut self, object: Option<ObjectId>) {
        self.active = object;
    }

    fn viewport_shading(&self) -> ViewportShading {
        self.shading
    }

    fn set_viewport_shading(&mut self, shading: ViewportShading) {
        self.shading = shading;
    }

    fn render_still(&mut self, path: &Path) -> HostResult<()> {
        if self.fail_render_at == Some(self.renders.len()) {
            return Err(HostError::render_failed(path, "render engine failure"));
        }
        let camera = self.camera.ok_or(HostError::NoCamera)?;
        if !self.object(camera)?.is_camera() {
            return Err(HostError::NoCamera);
        }
        let (width, height) = (self.render.resolution_x, self.render.resolution_y);
        if width == 0 || height == 0 {
            return Err(HostError::render_failed(
                path,
                format!("invalid resolution {}x{}", width, height),
            ));
        }
        self.evaluate_drivers();

        let mut visible: Vec<&Object> = Vec::new();
        let mut record_visible = Vec::new();
        let mut order: Vec<(ObjectId, &Object)> = self
            .view_layer_objects()
            .into_iter()
            .filter_map(|id| self.objects.get(&id).map(|o| (id, o)))
            .filter(|(_, o)| o.is_mesh() && !o.hide_render)
            .collect();
        // Back to front along the camera axis.
        order.sort_by(|a, b| a.1.location[2].total_cmp(&b.1.location[2]).then(a.0.cmp(&b.0)));
        for (id, object) in &order {
            record_visible.push((*id, object.material_slots.clone()));
            visible.push(object);
        }

        let mut painted = None;
        for object in &visible {
            for material_id in object.materials() {
                if let Some(material) = self.materials.get(&material_id) {
                    if material.shading.base_color[3] > 0.0 {
                        painted = Some(material_id);
                    }
                }
            }
        }

        let background = if self.render.film_transparent {
            Color::transparent()
        } else {
            Color::rgba(0.0, 0.0, 0.0, 1.0)
        };
        let color = painted
            .and_then(|id| self.materials.get(&id))
            .map_or(background, |m| self.surface_color(m));

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let buffer = TextureBuffer::new(width, height, color);
        png::write_rgba(&buffer, path, &PngConfig::default())?;

        tracing::debug!(path = %path.display(), width, height, "rendered still");
        self.renders.push(RenderRecord {
            path: path.to_path_buf(),
            width,
            height,
            light_level: self.light_level,
            visible: record_visible,
            painted,
        });
        Ok(())
    }

    fn import_asset(&mut self, name: &str) -> HostResult<()> {
        if !self.library.has_asset(name) {
            return Err(HostError::MissingAsset(name.to_string()));
        }
        self.assets.insert(name.to_string());
        Ok(())
    }

    fn remove_asset(&mut self, name: &str) -> bool {
        self.assets.remove(name)
    }

    fn has_asset(&self, name: &str) -> bool {
        self.assets.contains(name)
    }

    fn purge_orphans(&mut self, kinds: &[DataKind]) -> usize {
        let mut total = 0;
        loop {
            let removed: usize = kinds.iter().map(|kind| self.purge_round(*kind)).sum();
            if removed == 0 {
                break;
            }
            total += removed;
        }
        if total > 0 {
            tracing::debug!(removed = total, "purged orphan data");
        }
        total
    }
}
