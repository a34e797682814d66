//! CLI command implementations

pub mod bake;
pub mod inspect;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use matbake_scene::MemoryScene;

/// Reads a scene document.
pub(crate) fn load_scene(path: &Path) -> Result<MemoryScene> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scene file: {}", path.display()))?;
    MemoryScene::from_json(&json)
        .with_context(|| format!("Failed to parse scene file: {}", path.display()))
}

/// Writes a scene document, creating parent directories.
pub(crate) fn save_scene(scene: &MemoryScene, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = scene.to_json()?;
    fs::write(path, json).with_context(|| format!("Failed to write scene file: {}", path.display()))
}
