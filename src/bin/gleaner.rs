//! gleaner CLI - validate declarative reader definitions
//!
//! Running extraction requires a format-specific loader, which sits outside
//! this crate; the CLI covers the configuration side: validating reader
//! YAMLs and listing the transforms available to them.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use gleaner::config::{BuiltReader, ReaderDef, TransformRegistry};

#[derive(Parser)]
#[command(name = "gleaner")]
#[command(version, about = "Declarative document extraction framework", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a reader definition YAML
    Validate {
        /// Path to the reader definition file
        config: PathBuf,
    },

    /// List the built-in transforms available to reader definitions
    Transforms,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { config } => validate(config),
        Commands::Transforms => list_transforms(),
    };

    if let Err(message) = result {
        eprintln!("Error: {}", message);
        process::exit(1);
    }
}

fn validate(path: PathBuf) -> Result<(), String> {
    let def = ReaderDef::from_yaml_file(&path)
        .map_err(|e| format!("{}: {}", path.display(), e))?;
    let registry = TransformRegistry::with_builtins();
    let reader = def
        .build(&registry)
        .map_err(|e| format!("{}: {}", path.display(), e))?;

    let format = match &reader {
        BuiltReader::Tree(_) => "tree",
        BuiltReader::Rows(_) => "rows",
    };
    println!("{}: valid {} reader", path.display(), format);
    for field in reader.fields().fields() {
        let mut notes = Vec::new();
        if field.is_required() {
            notes.push("required");
        }
        if field.is_skipped() {
            notes.push("skip");
        }
        if notes.is_empty() {
            println!("  {}", field.name());
        } else {
            println!("  {} ({})", field.name(), notes.join(", "));
        }
    }
    Ok(())
}

fn list_transforms() -> Result<(), String> {
    let registry = TransformRegistry::with_builtins();
    for name in registry.transform_names() {
        println!("{}", name);
    }
    Ok(())
}
