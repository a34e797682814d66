//! matbake end-to-end test infrastructure
//!
//! Builds character models in a [`MemoryScene`](matbake_scene::MemoryScene)
//! inside a scratch import directory so the whole pipeline (renders, baked
//! files, atlas files) can run for real.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p matbake-tests
//! ```

pub mod fixtures;

pub use fixtures::{atlas_summary, material_summary, ModelFixture, SlotSummary};
