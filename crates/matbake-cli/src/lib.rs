//! matbake CLI library.
//!
//! Loads scene documents, runs the bake pipeline against a
//! [`MemoryScene`](matbake_scene::MemoryScene) and reports the outcome.

pub mod commands;
pub mod logging;
