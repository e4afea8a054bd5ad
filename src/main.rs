mod atlas;
mod error;
mod physics;
mod pipeline;
mod util;

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use atlas::{AtlasConfig, GraphCache};
use pipeline::{Outcome, run_layout};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    #[arg(long, default_value = "atlas.config.json")]
    config: PathBuf,
    #[arg(long, default_value = "data")]
    input_dir: PathBuf,
    #[arg(long, default_value = "out")]
    output_dir: PathBuf,
    #[arg(long = "layout")]
    layouts: Vec<String>,
    #[arg(long)]
    force: bool,
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let config = AtlasConfig::load(&args.config)?;
    let layouts = if args.layouts.is_empty() {
        config.layouts.keys().cloned().collect::<Vec<_>>()
    } else {
        args.layouts.clone()
    };
    info!(
        version = %config.version,
        layouts = layouts.len(),
        representatives = config.representatives.len(),
        "starting atlas build"
    );

    let mut cache = GraphCache::new(&args.input_dir);
    let mut failed = Vec::new();
    for name in &layouts {
        match run_layout(name, &config, &mut cache, &args.output_dir, args.force) {
            Ok(Outcome::Generated { nodes, edges }) => {
                info!(layout = %name, nodes, edges, "generated");
            }
            Ok(Outcome::Skipped) => info!(layout = %name, "skipped"),
            Err(err) => {
                let message = format!("{err:#}");
                error!(layout = %name, error = %message, "layout failed");
                failed.push(name.as_str());
            }
        }
    }

    if !failed.is_empty() {
        bail!("{} of {} layouts failed: {}", failed.len(), layouts.len(), failed.join(", "));
    }
    Ok(())
}
