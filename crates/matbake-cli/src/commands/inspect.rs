//! Inspect command implementation
//!
//! Prints every mesh of a scene document with its material slots and their
//! bake state.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;
use matbake_scene::{CollectionId, MaterialKind, MemoryScene, Scene};
use serde::Serialize;

use super::load_scene;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotInfo {
    pub index: usize,
    pub material: Option<String>,
    pub kind: Option<MaterialKind>,
    /// Image names bound in the material's texture group.
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectInfo {
    pub name: String,
    pub collection: String,
    pub is_body: bool,
    pub slots: Vec<SlotInfo>,
}

/// Collects per-object material state for every mesh under a root
/// collection, in collection order.
pub fn collect(scene: &MemoryScene) -> Result<Vec<ObjectInfo>> {
    let mut objects = Vec::new();
    let roots: Vec<CollectionId> = scene.root_collections().to_vec();
    for root in roots {
        let root_name = scene.collection(root)?.name.clone();
        for id in scene.meshes_in(root)? {
            let object = scene.object(id)?;
            let collection = match scene.collection_of(id) {
                Some(c) => scene.collection(c)?.name.clone(),
                None => root_name.clone(),
            };
            let mut slots = Vec::new();
            for (index, slot) in object.material_slots.iter().enumerate() {
                slots.push(slot_info(scene, index, *slot)?);
            }
            objects.push(ObjectInfo {
                name: object.name.clone(),
                collection,
                is_body: object.is_body,
                slots,
            });
        }
    }
    Ok(objects)
}

fn slot_info(
    scene: &MemoryScene,
    index: usize,
    slot: Option<matbake_scene::MaterialId>,
) -> Result<SlotInfo> {
    let Some(material) = slot else {
        return Ok(SlotInfo {
            index,
            material: None,
            kind: None,
            images: Vec::new(),
        });
    };
    let material = scene.material(material)?;
    let mut images = Vec::new();
    if let Some(group) = material.shading.textures {
        for image in scene.texture_group(group)?.images() {
            images.push(scene.image(image)?.name.clone());
        }
    }
    Ok(SlotInfo {
        index,
        material: Some(material.name.clone()),
        kind: Some(material.kind),
        images,
    })
}

/// Run the inspect command
///
/// # Returns
/// Exit code: 0 on success, 1 on error
pub fn run(scene_path: &Path, json_output: bool) -> Result<ExitCode> {
    let scene = load_scene(scene_path)?;
    let objects = collect(&scene)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&objects)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{} {}", "Scene:".cyan().bold(), scene_path.display());
    for object in &objects {
        let role = if object.is_body { "body" } else { "clothing" };
        println!(
            "\n{} {} {}",
            object.name.bold(),
            format!("[{}]", object.collection).dimmed(),
            role.dimmed()
        );
        for slot in &object.slots {
            match (&slot.material, slot.kind) {
                (Some(name), Some(kind)) => {
                    let label = kind_label(kind);
                    println!("  {:>2}. {} {}", slot.index, name, label);
                    for image in &slot.images {
                        println!("        {} {}", "-".dimmed(), image);
                    }
                }
                _ => println!("  {:>2}. {}", slot.index, "(empty)".dimmed()),
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn kind_label(kind: MaterialKind) -> colored::ColoredString {
    match kind {
        MaterialKind::RawEligible => "bake".yellow(),
        MaterialKind::RawIneligible => "skip".dimmed(),
        MaterialKind::Simplified => "simple".green(),
        MaterialKind::Atlased => "atlas".cyan(),
    }
}
