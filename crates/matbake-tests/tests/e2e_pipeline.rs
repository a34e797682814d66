//! End-to-end tests for the bake pipeline.
//!
//! Each test builds a model in a scratch import directory and runs the real
//! pipeline against the in-memory host: renders land in `baked_files/` and
//! are loaded back during rebind.

use matbake_core::{
    bake_pass, cleanup, replace_all_baked_materials, run_pipeline, setup_camera, setup_rig,
    BakeError, PipelineStage,
};
use matbake_scene::{MaterialKind, PassType, Scene, ShelfPacker, SIMPLE_TEMPLATE};
use matbake_tests::{material_summary, ModelFixture};
use matbake_texture::png;
use pretty_assertions::assert_eq;

// ============================================================================
// Scenario A: light pass only
// ============================================================================

#[test]
fn test_light_only_produces_one_file_per_material() {
    let mut fx = ModelFixture::new("Rin");
    let mat_a = fx.add_raw_material("MatA");
    let mat_b = fx.add_raw_material("MatB");
    let body = fx.add_body("Body", &[mat_a, mat_b]);
    let config = fx.config().passes(true, false, false);

    let report = run_pipeline(&mut fx.scene, &ShelfPacker::default(), &config).unwrap();
    assert_eq!(report.stage, PipelineStage::ExportReady);

    assert_eq!(
        ModelFixture::files_in(&config.baked_dir()),
        vec!["MatA light.png".to_string(), "MatB light.png".to_string()]
    );

    let summary = material_summary(&fx.scene, body);
    for (slot, name) in summary.iter().zip(["MatA", "MatB"]) {
        let (material, kind, images) = slot.clone().unwrap();
        let light = format!("{} light.png", name);
        assert_eq!(material, name);
        assert_eq!(kind, MaterialKind::Simplified);
        assert_eq!(
            images,
            vec![
                ("light".to_string(), light.clone()),
                ("dark".to_string(), light.clone()),
            ]
        );
    }

    assert_eq!(fx.scene.material(mat_a).unwrap().name, "MatA-ORG");
    assert!(fx.scene.material(mat_a).unwrap().fake_user);
}

// ============================================================================
// Scenario B: user reverted a slot to its -ORG original
// ============================================================================

#[test]
fn test_rerun_after_revert_reinstates_simplified_material() {
    let mut fx = ModelFixture::new("Rin");
    let mat_a = fx.add_raw_material("MatA");
    let mat_b = fx.add_raw_material("MatB");
    let body = fx.add_body("Body", &[mat_a, mat_b]);
    let config = fx.config();

    run_pipeline(&mut fx.scene, &ShelfPacker::default(), &config).unwrap();
    let simplified_a = fx.scene.object(body).unwrap().material_slots[0];
    let materials_after_first = fx.scene.material_ids().len();

    fx.scene.object_mut(body).unwrap().material_slots[0] = Some(mat_a);
    let report = run_pipeline(&mut fx.scene, &ShelfPacker::default(), &config).unwrap();

    assert!(report.created_materials.is_empty());
    assert_eq!(report.reinstated_materials, vec!["MatA".to_string()]);
    assert_eq!(fx.scene.object(body).unwrap().material_slots[0], simplified_a);
    assert_eq!(fx.scene.material_ids().len(), materials_after_first);
    assert!(fx.scene.find_material("MatA.001").is_none());
    assert!(fx.scene.find_material("MatA-ORG-ORG").is_none());
}

// ============================================================================
// Eligibility and resolution
// ============================================================================

#[test]
fn test_ineligible_materials_produce_nothing() {
    let mut fx = ModelFixture::new("Rin");
    let skin = fx.add_raw_material("Skin");
    let eyeline = fx.add_ineligible_material("Eyeline");
    let body = fx.add_body("Body", &[eyeline, skin, eyeline]);
    let config = fx.config().passes(true, true, true);

    let report = run_pipeline(&mut fx.scene, &ShelfPacker::default(), &config).unwrap();
    assert_eq!(report.skipped_materials, vec!["Eyeline".to_string()]);

    let files = ModelFixture::files_in(&config.baked_dir());
    assert!(files.iter().all(|f| !f.starts_with("Eyeline")));
    assert_eq!(files.len(), 3);

    let slots = &fx.scene.object(body).unwrap().material_slots;
    assert_eq!(slots[0], Some(eyeline));
    assert_eq!(slots[2], Some(eyeline));
    assert_eq!(fx.scene.material(eyeline).unwrap().name, "Eyeline");
}

#[test]
fn test_output_resolution_follows_largest_input() {
    let mut fx = ModelFixture::new("Rin");
    let skin = fx.add_textured_material("Skin", 100, 50);
    let cloth = fx.add_raw_material("Cloth");
    fx.add_body("Body", &[skin, cloth]);
    let config = fx
        .config()
        .passes(true, false, false)
        .resolution_multiplier(1.5);

    run_pipeline(&mut fx.scene, &ShelfPacker::default(), &config).unwrap();

    let baked = config.baked_dir();
    assert_eq!(png::dimensions(&baked.join("Skin light.png")).unwrap(), (150, 75));
    assert_eq!(png::dimensions(&baked.join("Cloth light.png")).unwrap(), (64, 64));
}

#[test]
fn test_normal_pass_restores_output_route() {
    let mut fx = ModelFixture::new("Rin");
    let skin = fx.add_textured_material("Skin", 32, 32);
    fx.add_body("Body", &[skin]);
    let config = fx.config().passes(false, false, true);

    run_pipeline(&mut fx.scene, &ShelfPacker::default(), &config).unwrap();

    let pixels = png::read_rgba(&config.baked_dir().join("Skin normal.png")).unwrap();
    assert_eq!(pixels.get(0, 0).to_rgba8(), [128, 128, 255, 255]);
    let original = fx.scene.find_material("Skin-ORG").unwrap();
    assert_eq!(
        fx.scene.material(original).unwrap().shading.output,
        matbake_scene::OutputRoute::Combined
    );
}

// ============================================================================
// Slot order and idempotence
// ============================================================================

#[test]
fn test_bake_pass_preserves_slot_order() {
    let mut fx = ModelFixture::new("Rin");
    let a = fx.add_raw_material("A");
    let b = fx.add_ineligible_material("B");
    let c = fx.add_textured_material("C", 16, 16);
    let body = fx.add_body("Body", &[c, a, b, a, c]);
    let baked = fx.config().baked_dir();
    let before = fx.scene.object(body).unwrap().material_slots.clone();

    let camera = setup_camera(&mut fx.scene, fx.model).unwrap();
    let rig = setup_rig(&mut fx.scene, body, camera).unwrap();
    for pass in PassType::ALL {
        let outcome = bake_pass(&mut fx.scene, &rig, &baked, pass, 1.0).unwrap();
        assert_eq!(outcome.rendered.len(), 2);
        assert_eq!(fx.scene.object(body).unwrap().material_slots, before);
    }
    cleanup(&mut fx.scene).unwrap();
    assert_eq!(fx.scene.object(body).unwrap().material_slots, before);
}

#[test]
fn test_rebind_twice_gives_same_state() {
    let mut fx = ModelFixture::new("Rin");
    let skin = fx.add_raw_material("Skin");
    let hair = fx.add_textured_material("Hair", 8, 8);
    let body = fx.add_body("Body", &[skin, hair]);
    let config = fx.config();
    run_pipeline(&mut fx.scene, &ShelfPacker::default(), &config).unwrap();

    let once = material_summary(&fx.scene, body);
    let materials = fx.scene.material_ids().len();
    let images = fx.scene.image_ids().len();

    let outcome =
        replace_all_baked_materials(&mut fx.scene, &config.baked_dir(), body, SIMPLE_TEMPLATE)
            .unwrap();
    assert!(outcome.created.is_empty());
    assert_eq!(material_summary(&fx.scene, body), once);
    assert_eq!(fx.scene.material_ids().len(), materials);
    assert_eq!(fx.scene.image_ids().len(), images);
}

// ============================================================================
// Visibility and failure
// ============================================================================

#[test]
fn test_clothing_is_baked_with_its_collection_shown() {
    let mut fx = ModelFixture::new("Rin");
    let skin = fx.add_raw_material("Skin");
    let shirt = fx.add_raw_material("Shirt");
    fx.add_body("Body", &[skin]);
    let top = fx.add_clothing("Outfit 01", "Top", &[shirt]);
    let config = fx.config().passes(true, false, false);

    let report = run_pipeline(&mut fx.scene, &ShelfPacker::default(), &config).unwrap();
    assert_eq!(report.objects_baked, vec!["Body".to_string(), "Top".to_string()]);

    let shirt_render = fx
        .scene
        .renders()
        .iter()
        .find(|r| r.path.ends_with("Shirt light.png"))
        .unwrap();
    assert!(shirt_render.visible.iter().any(|(id, _)| *id == top));
    assert!(shirt_render.painted.is_some());
    let outfit = fx.scene.find_collection("Outfit 01").unwrap();
    assert!(fx.scene.collection(outfit).unwrap().hidden);
}

#[test]
fn test_render_failure_moves_to_failed_state() {
    let mut fx = ModelFixture::new("Rin");
    let skin = fx.add_raw_material("Skin");
    let hair = fx.add_raw_material("Hair");
    let body = fx.add_body("Body", &[skin, hair]);
    fx.scene.fail_render_at(1);
    let before = fx.scene.object(body).unwrap().material_slots.clone();

    let config = fx.config();
    let err = run_pipeline(&mut fx.scene, &ShelfPacker::default(), &config).unwrap_err();
    assert!(matches!(err, BakeError::Failed { .. }));
    assert_eq!(err.stage(), Some(PipelineStage::PerObjectBake));
    assert!(err.to_string().contains("per_object_bake"));

    assert_eq!(fx.scene.object(body).unwrap().material_slots, before);
    assert!(fx.scene.scene_camera().is_none());
    assert!(fx.scene.find_object("fillerplane").is_none());
}
