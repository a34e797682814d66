//! Tests for the shelf texture packer against the in-memory host.

use std::path::Path;

use matbake_scene::{
    Material, MaterialKind, MemoryScene, Object, PassType, Scene, ShelfPacker, TextureGroup,
    TexturePacker,
};
use matbake_texture::png::{self, PngConfig};
use matbake_texture::{Color, TextureBuffer};
use tempfile::tempdir;

fn write_solid(path: &Path, width: u32, height: u32, color: Color) {
    let buffer = TextureBuffer::new(width, height, color);
    png::write_rgba(&buffer, path, &PngConfig::default()).unwrap();
}

/// Builds a simplified material whose light image is a real file and whose
/// emission preview is wired to it.
fn wired_material(scene: &mut MemoryScene, dir: &Path, name: &str, size: (u32, u32)) -> matbake_scene::MaterialId {
    let path = dir.join(format!("{} light.png", name));
    write_solid(&path, size.0, size.1, Color::rgb(1.0, 0.0, 0.0));
    let image = scene.load_image(&path).unwrap();
    let group = scene.add_texture_group(TextureGroup::simplified(name));
    scene
        .texture_group_mut(group)
        .unwrap()
        .set_image("light", Some(image));
    let mut material = Material::new(name, MaterialKind::Simplified).with_textures(group);
    material.shading.emission_preview = Some(image);
    scene.add_material(material).unwrap()
}

// ============================================================================
// Naming and indexing
// ============================================================================

#[test]
fn test_pack_names_images_by_mesh_index() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    let mut scene = MemoryScene::new();
    let model = scene.add_collection("Model atlas", None).unwrap();

    let skin = wired_material(&mut scene, src.path(), "Skin", (32, 32));
    let cloth = wired_material(&mut scene, src.path(), "Cloth", (16, 64));
    let plain = scene
        .add_material(Material::new("Plain", MaterialKind::RawIneligible))
        .unwrap();

    // Mesh 0 has nothing to pack, mesh 1 has two materials.
    scene
        .add_linked_object(Object::mesh("Eyes").with_slots([plain]), model)
        .unwrap();
    let body = scene
        .add_linked_object(Object::mesh("Body").with_slots([skin, cloth, skin]), model)
        .unwrap();

    let report = ShelfPacker::default()
        .pack(&mut scene, model, &[PassType::Light, PassType::Dark], out.path())
        .unwrap();

    assert_eq!(report.images.len(), 2);
    let light = report.get(1, PassType::Light).unwrap();
    assert_eq!(light.object, body);
    assert!(out.path().join("1_light.png").exists());
    assert!(out.path().join("1_dark.png").exists());
    assert!(!out.path().join("0_light.png").exists());

    // Loaded under the file name.
    assert_eq!(scene.find_image("1_light.png"), Some(light.image));
    let (w, h) = png::dimensions(&light.path).unwrap();
    assert_eq!((w, h), (light.width, light.height));
}

#[test]
fn test_dark_pass_falls_back_to_light_image() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    let mut scene = MemoryScene::new();
    let model = scene.add_collection("Model atlas", None).unwrap();
    let skin = wired_material(&mut scene, src.path(), "Skin", (8, 8));
    scene
        .add_linked_object(Object::mesh("Body").with_slots([skin]), model)
        .unwrap();

    let report = ShelfPacker::new(0)
        .pack(&mut scene, model, &[PassType::Dark, PassType::Normal], out.path())
        .unwrap();

    assert!(report.get(0, PassType::Dark).is_some());
    assert!(report.get(0, PassType::Normal).is_none());
    let pixels = png::read_rgba(&out.path().join("0_dark.png")).unwrap();
    assert_eq!(pixels.get(0, 0).to_rgba8(), [255, 0, 0, 255]);
}

#[test]
fn test_materials_without_emission_preview_are_ignored() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    let mut scene = MemoryScene::new();
    let model = scene.add_collection("Model atlas", None).unwrap();
    let skin = wired_material(&mut scene, src.path(), "Skin", (8, 8));
    scene.material_mut(skin).unwrap().shading.emission_preview = None;
    scene
        .add_linked_object(Object::mesh("Body").with_slots([skin]), model)
        .unwrap();

    let report = ShelfPacker::default()
        .pack(&mut scene, model, &PassType::ALL, out.path())
        .unwrap();
    assert!(report.images.is_empty());
}
