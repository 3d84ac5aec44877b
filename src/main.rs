// src/main.rs

//! renew - CLI entry point
//!
//! The library does the updating; this binary carries the publishing
//! side: `sergen` packages a versions directory into the JSON manifest
//! document that HTTP-manifest sources consume.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use renew::manifest;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "renew")]
#[command(version)]
#[command(about = "Self-update engine utilities", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the JSON manifest for an HTTP update server
    Sergen {
        /// Base URL under which the version folders are served
        #[arg(short, long)]
        url: String,

        /// Path to the versions directory (one sub-directory per version)
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Where to write the generated manifest
        #[arg(short, long, default_value = "serv_update.json")]
        output: PathBuf,

        /// Filename of the per-version description file
        #[arg(short, long, default_value = manifest::DESCRIPTION_FILENAME)]
        desc_filename: String,

        /// Separator between release name and description in that file
        #[arg(short, long, default_value = manifest::NAME_SEPARATOR)]
        separator: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Sergen {
            url,
            input_dir,
            output,
            desc_filename,
            separator,
        } => {
            let releases =
                manifest::scan_versions_dir(&input_dir, &url, &desc_filename, &separator)
                    .with_context(|| {
                        format!("failed to scan versions directory {}", input_dir.display())
                    })?;
            manifest::write_manifest(&releases, &output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!(
                "Manifest written to {} ({} versions)",
                output.display(),
                releases.len()
            );
        }
    }

    Ok(())
}
