//! obscore2rdf
//!
//! Convert a MAST ObsCore dump (pipe-separated, no header) into one RDF
//! graph per observation plus an observation→datum map.
//!
//! ```text
//! obscore2rdf <input> [config] [rdf|n3]
//! ```

use anyhow::Result;
use clap::Parser;
use obscore_ingest::config::DEFAULT_PATH;
use obscore_ingest::{run, ConvertConfig, OutputFormat};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "obscore2rdf")]
#[command(author, version, about = "Convert MAST ObsCore tables to RDF")]
struct Cli {
    /// Pipe-separated ObsCore file
    input: PathBuf,

    /// TOML configuration
    #[arg(default_value = DEFAULT_PATH)]
    config: PathBuf,

    /// Output format: `rdf` (RDF/XML) or `n3`
    #[arg(default_value = "rdf")]
    format: OutputFormat,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = ConvertConfig::load(&cli.config)?;
    let summary = run(&config, &cli.input, cli.format)?;

    println!(
        "{} observation(s) written to {}",
        summary.groups_written,
        config.output_dir.display()
    );
    if summary.rows_skipped > 0 {
        println!("{} invalid row(s) skipped", summary.rows_skipped);
    }
    if summary.orphan_groups > 0 {
        println!(
            "{} file group(s) without a timestamp left out",
            summary.orphan_groups
        );
    }
    println!("observation map: {}", summary.map_file.display());
    Ok(())
}
