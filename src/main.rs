//! Retina Mosaic - Entry Point
//!
//! Loads a configuration, applies command-line overrides and runs one mosaic
//! simulation, writing its reports under the output directory.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use retina_mosaic::core::config::SimulationConfig;
use retina_mosaic::core::error::Result;
use retina_mosaic::simulation::simulate;

/// Retinal ganglion cell mosaic simulation
#[derive(Parser, Debug)]
#[command(name = "retina-mosaic")]
#[command(about = "Simulate the self-organisation of retinal ganglion cell mosaics")]
struct Args {
    /// TOML configuration file (defaults are used when omitted)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Number of ticks to simulate
    #[arg(long)]
    steps: Option<u64>,

    /// Density of undetermined somas (cells/mm²), implies --cell-fate
    #[arg(long)]
    density: Option<f64>,

    /// Directory receiving the results folder
    #[arg(long, short = 'o')]
    output_dir: Option<PathBuf>,

    /// Start from undetermined somas and let fate assignment pick categories
    #[arg(long)]
    cell_fate: bool,

    /// Export dendrite morphologies as SWC files
    #[arg(long)]
    swc: bool,

    /// Skip the per-sample position snapshots
    #[arg(long)]
    no_positions: bool,

    /// Log per-category statistics every day
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl Args {
    fn apply(&self, config: &mut SimulationConfig) {
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(steps) = self.steps {
            config.max_step = steps;
        }
        if let Some(density) = self.density {
            config.population.cell_density = density;
            config.population.cell_fate = true;
        }
        if let Some(dir) = &self.output_dir {
            config.output.output_dir = dir.clone();
        }
        if self.cell_fate {
            config.population.cell_fate = true;
        }
        if self.swc {
            config.output.write_swc = true;
        }
        if self.no_positions {
            config.output.write_positions = false;
        }
        if self.verbose {
            config.output.verbose = true;
        }
    }
}

fn main() -> Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("retina_mosaic=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    args.apply(&mut config);

    tracing::info!("Retina mosaic starting...");
    let summary = simulate(&config)?;
    println!("{}", summary.summary());
    Ok(())
}
