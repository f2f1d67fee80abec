mod articles;
mod config;
mod coords;
mod crops;
mod error;
mod exif;
mod generator;
mod tour;

use crate::config::AppConfig;
use crate::generator::Generator;
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tour-generator")]
#[command(about = "Generates panorama tours, tile pyramids and crops for a static site", long_about = None)]
struct Args {
    /// Directory holding layered configuration files
    #[arg(short, long, default_value = "config")]
    config_dir: PathBuf,

    /// Articles manifest path (overrides the configured one)
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Re-derive tiles and crops even when they already exist
    #[arg(short, long)]
    force: bool,

    /// Raise logging to debug, whatever the configured level
    #[arg(short, long)]
    verbose: bool,
}

/// The configured level, raised to at least debug when `--verbose` is set.
fn log_level(configured: &str, verbose: bool) -> log::LevelFilter {
    let level = configured.parse().unwrap_or(log::LevelFilter::Info);
    if verbose {
        level.max(log::LevelFilter::Debug)
    } else {
        level
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::new(&args.config_dir).context("loading configuration")?;

    env_logger::Builder::new()
        .filter_level(log_level(&config.log_level, args.verbose))
        .init();

    info!("Starting tour-generator");

    let manifest = args
        .manifest
        .unwrap_or_else(|| PathBuf::from(&config.articles_manifest));
    let articles = articles::load_manifest(&manifest)
        .with_context(|| format!("loading manifest {}", manifest.display()))?;
    info!("Loaded {} articles from {}", articles.len(), manifest.display());

    let generator = Generator::new(config, args.force)?;
    let summary = generator.run(&articles)?;

    info!(
        "Finished: {} scenes, {} tours written, {} tiles, {} crops written ({} skipped), {} errors",
        summary.scenes,
        summary.tours_written,
        summary.tiles_written,
        summary.crops_written,
        summary.crops_skipped,
        summary.errors
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_the_configured_level() {
        assert_eq!(log_level("info", false), log::LevelFilter::Info);
        assert_eq!(log_level("warn", false), log::LevelFilter::Warn);
        assert_eq!(log_level("info", true), log::LevelFilter::Debug);
        assert_eq!(log_level("warn", true), log::LevelFilter::Debug);
        // verbose never lowers an already chattier level
        assert_eq!(log_level("trace", true), log::LevelFilter::Trace);
    }

    #[test]
    fn unparseable_level_falls_back_to_info() {
        assert_eq!(log_level("noisy", false), log::LevelFilter::Info);
        assert_eq!(log_level("noisy", true), log::LevelFilter::Debug);
    }
}
