//! matbake core pipeline
//!
//! Bakes bake-eligible materials of a character model into images, swaps in
//! simplified materials that sample those images, and optionally builds an
//! atlassed duplicate of the model.
//!
//! Everything runs against an injected [`Scene`](matbake_scene::Scene);
//! nothing here knows which 3D application sits behind it.
//!
//! # Stages
//!
//! 1. [`rig`]: orthographic camera, backdrop and UV flattener
//! 2. [`bake`]: one render per eligible material and pass
//! 3. [`teardown`]: rig removal
//! 4. [`rebind`]: baked images bound into simplified materials
//! 5. [`atlas`]: packed duplicate collection
//!
//! [`pipeline::run_pipeline`] sequences them.
//!
//! # Example
//!
//! ```no_run
//! use matbake_core::{run_pipeline, BakeConfig};
//! use matbake_scene::{MemoryScene, ShelfPacker};
//!
//! let json = std::fs::read_to_string("scene.json").unwrap();
//! let mut scene = MemoryScene::from_json(&json).unwrap();
//! let config = BakeConfig::new("/models/rin", "Rin").use_atlas(true);
//! let report = run_pipeline(&mut scene, &ShelfPacker::default(), &config).unwrap();
//! println!("{} files rendered", report.rendered_files.len());
//! ```

pub mod atlas;
pub mod bake;
pub mod config;
pub mod error;
pub mod export;
pub mod naming;
pub mod pipeline;
pub mod rebind;
pub mod rig;
pub mod teardown;

pub use atlas::{create_material_atlas, remove_orphan_data, rename_replacing, AtlasOutcome};
pub use bake::{bake_pass, material_resolution, PassOutcome, FAILSAFE_RESOLUTION};
pub use config::{BakeConfig, ShadingVariant, ATLAS_DIR_NAME, BAKED_DIR_NAME};
pub use error::{BakeError, BakeResult, PipelineStage};
pub use export::{attach_exporter, export_settings};
pub use pipeline::{run_pipeline, PipelineReport};
pub use rebind::{load_baked_images, replace_all_baked_materials, RebindOutcome};
pub use rig::{setup_camera, setup_rig, ProjectionRig};
pub use teardown::cleanup;
