//! matbake CLI - bake procedural materials into textures and atlases
//!
//! Runs the bake pipeline against a scene document and inspects the result.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use matbake_cli::commands;
use matbake_cli::logging::{init_logging, DEFAULT_FILTER};

/// matbake - material bake and atlas pipeline
#[derive(Parser)]
#[command(name = "matbake")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bake every eligible material of a model and rebind the results
    Bake {
        /// Path to the scene document (JSON)
        #[arg(short, long)]
        scene: PathBuf,

        /// Path to a bake config file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory the model was imported from (default: the scene's directory)
        #[arg(long)]
        import_dir: Option<PathBuf>,

        /// Name of the model collection
        #[arg(short, long)]
        model: Option<String>,

        /// Resolution multiplier applied to each material's largest image
        #[arg(long)]
        multiplier: Option<f64>,

        /// Skip the light pass
        #[arg(long)]
        no_light: bool,

        /// Skip the dark pass
        #[arg(long)]
        no_dark: bool,

        /// Also bake normal maps
        #[arg(long)]
        normal: bool,

        /// Build the atlassed duplicate after rebinding
        #[arg(long)]
        atlas: bool,

        /// Keep the target hidden from render while baking
        #[arg(long)]
        legacy: bool,

        /// Use the Eevee-modified simplified shader
        #[arg(long)]
        eevee_mod: bool,

        /// Export with -Y forward / Z up
        #[arg(long)]
        ue_fix_axis: bool,

        /// Where to write the baked scene (default: overwrite --scene)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Output the pipeline report as JSON (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Print each mesh with its material slots and bake state
    Inspect {
        /// Path to the scene document (JSON)
        #[arg(short, long)]
        scene: PathBuf,

        /// Output machine-readable JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let quiet = match &cli.command {
        Commands::Bake { json, .. } | Commands::Inspect { json, .. } => *json,
    };
    init_logging(if quiet { "warn" } else { DEFAULT_FILTER });

    let result = match cli.command {
        Commands::Bake {
            scene,
            config,
            import_dir,
            model,
            multiplier,
            no_light,
            no_dark,
            normal,
            atlas,
            legacy,
            eevee_mod,
            ue_fix_axis,
            out,
            json,
        } => commands::bake::run(&commands::bake::BakeOptions {
            scene,
            config,
            import_dir,
            model,
            multiplier,
            no_light,
            no_dark,
            normal,
            atlas,
            legacy,
            eevee_mod,
            ue_fix_axis,
            out,
            json,
        }),
        Commands::Inspect { scene, json } => commands::inspect::run(&scene, json),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
