//! Property-based tests for the bake pipeline using proptest.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p matbake-tests --test proptest_pipeline
//! ```

use proptest::prelude::*;

use matbake_core::{bake_pass, cleanup, setup_camera, setup_rig, BakeConfig};
use matbake_scene::{MaterialId, PassType, Scene};
use matbake_tests::ModelFixture;

// ============================================================================
// 1. Slot order across bake passes
// ============================================================================

/// Slot layouts drawn from three materials plus empty slots.
fn slot_layout() -> impl Strategy<Value = Vec<Option<usize>>> {
    prop::collection::vec(prop::option::of(0usize..3), 1..7)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Every pass leaves the slot-to-material mapping exactly as it found it.
    #[test]
    fn bake_pass_keeps_slot_mapping(layout in slot_layout()) {
        let mut fx = ModelFixture::new("Rin");
        let materials: Vec<MaterialId> = vec![
            fx.add_raw_material("Cloth"),
            fx.add_ineligible_material("Eyeline"),
            fx.add_textured_material("Skin", 8, 8),
        ];
        let slots: Vec<MaterialId> = layout.iter().flatten().map(|&i| materials[i]).collect();
        let body = fx.add_body("Body", &slots);
        {
            let object = fx.scene.object_mut(body).unwrap();
            object.material_slots = layout.iter().map(|s| s.map(|i| materials[i])).collect();
        }
        let before = fx.scene.object(body).unwrap().material_slots.clone();
        let baked = fx.config().baked_dir();

        let camera = setup_camera(&mut fx.scene, fx.model).unwrap();
        let rig = setup_rig(&mut fx.scene, body, camera).unwrap();
        for pass in PassType::ALL {
            bake_pass(&mut fx.scene, &rig, &baked, pass, 1.0).unwrap();
            prop_assert_eq!(&fx.scene.object(body).unwrap().material_slots, &before);
        }
        cleanup(&mut fx.scene).unwrap();
        prop_assert_eq!(&fx.scene.object(body).unwrap().material_slots, &before);
    }
}

// ============================================================================
// 2. Config validation boundaries
// ============================================================================

proptest! {
    /// Multipliers below one are always rejected.
    #[test]
    fn small_multipliers_rejected(m in -10.0f64..0.999) {
        let config = BakeConfig::new("/models/rin", "Rin").resolution_multiplier(m);
        prop_assert!(config.validate().is_err());
    }

    /// Multipliers of at least one pass whenever a pass is enabled.
    #[test]
    fn valid_multipliers_accepted(
        m in 1.0f64..16.0,
        light in any::<bool>(),
        dark in any::<bool>(),
        normal in any::<bool>()
    ) {
        let config = BakeConfig::new("/models/rin", "Rin")
            .resolution_multiplier(m)
            .passes(light, dark, normal);
        prop_assert_eq!(config.validate().is_ok(), light || dark || normal);
    }
}
