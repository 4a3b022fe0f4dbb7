//! Command-line front end for Nebula ragdoll files.
//!
//! ```text
//! nebula-ragdoll check Content/Characters/Human/Ragdolls/*.xml
//! nebula-ragdoll normalize HumanDefaultRagdoll.xml --output out.xml
//! nebula-ragdoll resolve crawlerhusk --content-root /path/to/game
//! ```

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use nebula_config::{CliArgs, Config, default_config_dir};
use tracing::{error, info};

/// CLI arguments for the ragdoll tool.
#[derive(Parser, Debug)]
#[command(name = "nebula-ragdoll", about = "Inspect, normalize and resolve ragdoll files")]
struct ToolArgs {
    #[command(flatten)]
    overrides: CliArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate ragdoll files.
    Check {
        /// Files to check.
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Species key the files belong to (defaults to the file name).
        #[arg(long)]
        species: Option<String>,
    },
    /// Rewrite a ragdoll file in the canonical format.
    Normalize {
        file: PathBuf,
        /// Write here instead of overwriting the input.
        #[arg(long, short)]
        output: Option<PathBuf>,
        #[arg(long)]
        species: Option<String>,
    },
    /// Resolve the ragdoll a species would use.
    Resolve {
        species: String,
        /// Bare file name in the species' ragdoll folder, or a content path.
        #[arg(long)]
        file: Option<String>,
    },
}

fn main() -> ExitCode {
    let args = ToolArgs::parse();

    let config_dir = args
        .overrides
        .config
        .clone()
        .unwrap_or_else(default_config_dir);
    let mut config = match Config::load_or_create(&config_dir) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Using default config: {err}");
            Config::default()
        }
    };
    config.apply_cli_overrides(&args.overrides);

    nebula_log::init_logging(
        Some(&config_dir.join("logs")),
        cfg!(debug_assertions),
        Some(&config),
    );
    info!("Content root: {}", config.ragdoll.content_root.display());

    let result = match &args.command {
        Command::Check { files, species } => {
            Ok(commands::check(&config, files, species.as_deref()) == 0)
        }
        Command::Normalize {
            file,
            output,
            species,
        } => commands::normalize(&config, file, output.as_deref(), species.as_deref())
            .map(|_| true),
        Command::Resolve { species, file } => {
            commands::resolve(&config, species, file.as_deref()).map(|report| {
                println!("{report}");
                true
            })
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
