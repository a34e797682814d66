//! Bake command implementation
//!
//! Loads a scene document, runs the full pipeline and writes the mutated
//! scene back out.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;
use matbake_core::{run_pipeline, BakeConfig, BakeError, PipelineReport, ShadingVariant};
use matbake_scene::{ErrorCode, ShelfPacker};
use serde::Serialize;

use super::{load_scene, save_scene};

/// Exit code for a pipeline that failed after it started mutating the scene.
pub const EXIT_PIPELINE_FAILED: u8 = 2;

/// Command-line overrides for a bake run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BakeOptions {
    pub scene: PathBuf,
    pub config: Option<PathBuf>,
    pub import_dir: Option<PathBuf>,
    pub model: Option<String>,
    pub multiplier: Option<f64>,
    pub no_light: bool,
    pub no_dark: bool,
    pub normal: bool,
    pub atlas: bool,
    pub legacy: bool,
    pub eevee_mod: bool,
    pub ue_fix_axis: bool,
    pub out: Option<PathBuf>,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct BakeOutput<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a PipelineReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorOutput>,
}

#[derive(Debug, Serialize)]
struct ErrorOutput {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<String>,
}

impl ErrorOutput {
    fn from_error(err: &BakeError) -> Self {
        Self {
            code: err.root().code(),
            message: err.to_string(),
            stage: err.stage().map(|s| s.to_string()),
        }
    }
}

/// Builds the effective config: the config file (or defaults), then the
/// command-line overrides. The import directory defaults to the scene
/// file's directory.
pub fn resolve_config(options: &BakeOptions) -> Result<BakeConfig> {
    let mut config = match &options.config {
        Some(path) => BakeConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => BakeConfig {
            import_dir: scene_dir(&options.scene),
            ..BakeConfig::default()
        },
    };

    if let Some(dir) = &options.import_dir {
        config.import_dir = dir.clone();
    }
    if let Some(model) = &options.model {
        config.model_name = model.clone();
    }
    if let Some(multiplier) = options.multiplier {
        config.resolution_multiplier = multiplier;
    }
    if options.no_light {
        config.bake_light = false;
    }
    if options.no_dark {
        config.bake_dark = false;
    }
    if options.normal {
        config.bake_normal = true;
    }
    if options.atlas {
        config.use_atlas = true;
    }
    if options.legacy {
        config.legacy_bake = true;
    }
    if options.eevee_mod {
        config.shading_variant = ShadingVariant::EeveeMod;
    }
    if options.ue_fix_axis {
        config.ue_fix_axis = true;
    }
    Ok(config)
}

fn scene_dir(scene: &Path) -> PathBuf {
    match scene.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Run the bake command
///
/// # Returns
/// Exit code: 0 success, 1 input or configuration error, 2 pipeline failure
pub fn run(options: &BakeOptions) -> Result<ExitCode> {
    execute(options).map(ExitCode::from)
}

fn execute(options: &BakeOptions) -> Result<u8> {
    let config = resolve_config(options)?;
    let mut scene = load_scene(&options.scene)?;

    if !options.json {
        println!("{} {}", "Baking model:".cyan().bold(), config.model_name);
        println!("{} {}", "Scene:".dimmed(), options.scene.display());
        println!("{} {}", "Output:".dimmed(), config.baked_dir().display());
    }

    let result = run_pipeline(&mut scene, &ShelfPacker::default(), &config);
    let out = options.out.as_deref().unwrap_or(&options.scene);

    match result {
        Ok(report) => {
            save_scene(&scene, out)?;
            if options.json {
                print_json(&BakeOutput {
                    success: true,
                    report: Some(&report),
                    error: None,
                })?;
            } else {
                print_report(&report, out);
            }
            Ok(0)
        }
        Err(err) => {
            // The scene is only written back once the pipeline got going, so
            // the partial state can be inspected.
            let started = err.stage().is_some();
            if started {
                save_scene(&scene, out)?;
            }
            if options.json {
                print_json(&BakeOutput {
                    success: false,
                    report: None,
                    error: Some(ErrorOutput::from_error(&err)),
                })?;
            } else {
                eprintln!("{} {}", "error:".red().bold(), err);
            }
            Ok(if started { EXIT_PIPELINE_FAILED } else { 1 })
        }
    }
}

fn print_json(output: &BakeOutput<'_>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(output)?);
    Ok(())
}

fn print_report(report: &PipelineReport, out: &Path) {
    println!();
    println!(
        "{} {} object(s), {} file(s) in {}ms",
        "Baked".green().bold(),
        report.objects_baked.len(),
        report.rendered_files.len(),
        report.elapsed_ms
    );
    for object in &report.objects_skipped {
        println!("  {} {} (no bakeable materials)", "-".dimmed(), object);
    }
    for material in &report.skipped_materials {
        println!("  {} skipped material {}", "-".dimmed(), material);
    }
    for file in &report.skipped_files {
        println!("  {} could not load {}", "!".yellow(), file.display());
    }
    if !report.created_materials.is_empty() {
        println!(
            "{} {}",
            "Created:".cyan(),
            report.created_materials.join(", ")
        );
    }
    if !report.reinstated_materials.is_empty() {
        println!(
            "{} {}",
            "Reinstated:".cyan(),
            report.reinstated_materials.join(", ")
        );
    }
    if !report.atlas_images.is_empty() {
        println!("{} {}", "Atlas:".cyan(), report.atlas_images.join(", "));
    }
    println!("{} {}", "Scene written to".dimmed(), out.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use matbake_scene::{Material, MaterialKind, MemoryScene, Object, Scene};
    use tempfile::tempdir;

    fn write_scene(dir: &Path) -> PathBuf {
        let mut scene = MemoryScene::new();
        let model = scene.add_collection("Rin", None).unwrap();
        let skin = scene
            .add_material(Material::new("Skin", MaterialKind::RawEligible))
            .unwrap();
        scene
            .add_linked_object(Object::mesh("Body").with_slots([skin]).body(), model)
            .unwrap();
        let path = dir.join("scene.json");
        save_scene(&scene, &path).unwrap();
        path
    }

    #[test]
    fn test_resolve_config_overrides() {
        let options = BakeOptions {
            scene: PathBuf::from("/models/rin/scene.json"),
            model: Some("Rin".to_string()),
            multiplier: Some(2.0),
            no_dark: true,
            normal: true,
            atlas: true,
            eevee_mod: true,
            ..Default::default()
        };
        let config = resolve_config(&options).unwrap();
        assert_eq!(config.import_dir, PathBuf::from("/models/rin"));
        assert_eq!(config.model_name, "Rin");
        assert_eq!(config.resolution_multiplier, 2.0);
        assert!(config.bake_light && !config.bake_dark && config.bake_normal);
        assert!(config.use_atlas);
        assert_eq!(config.shading_variant, ShadingVariant::EeveeMod);
    }

    #[test]
    fn test_scene_dir_defaults_to_cwd() {
        assert_eq!(scene_dir(Path::new("scene.json")), PathBuf::from("."));
    }

    #[test]
    fn test_run_writes_scene() {
        let dir = tempdir().unwrap();
        let scene_path = write_scene(dir.path());
        let out = dir.path().join("out").join("baked.json");
        let options = BakeOptions {
            scene: scene_path,
            model: Some("Rin".to_string()),
            out: Some(out.clone()),
            json: true,
            ..Default::default()
        };

        assert_eq!(execute(&options).unwrap(), 0);
        assert!(dir.path().join("baked_files").join("Skin light.png").exists());

        let baked = load_scene(&out).unwrap();
        assert!(baked.find_material("Skin-ORG").is_some());
    }

    #[test]
    fn test_invalid_config_exits_with_one() {
        let dir = tempdir().unwrap();
        let scene_path = write_scene(dir.path());
        let options = BakeOptions {
            scene: scene_path,
            model: Some("Rin".to_string()),
            no_light: true,
            no_dark: true,
            json: true,
            ..Default::default()
        };
        assert_eq!(execute(&options).unwrap(), 1);
    }

    #[test]
    fn test_missing_scene_is_an_error() {
        let dir = tempdir().unwrap();
        let options = BakeOptions {
            scene: dir.path().join("missing.json"),
            model: Some("Rin".to_string()),
            ..Default::default()
        };
        assert!(execute(&options).is_err());
    }
}
