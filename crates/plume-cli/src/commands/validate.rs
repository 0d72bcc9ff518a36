//! Validate a configuration file without running.

use anyhow::{Context, Result};
use clap::Args;
use plume_types::config::SimulationConfig;
use std::path::PathBuf;
use tracing::info;

#[derive(Args)]
pub struct ValidateArgs {
    /// Configuration file path.
    #[arg(short, long)]
    pub config: PathBuf,
}

pub fn execute(args: ValidateArgs) -> Result<()> {
    let config = SimulationConfig::from_file(&args.config)
        .with_context(|| format!("reading configuration {}", args.config.display()))?;
    let derived = config.derive().context("validating configuration")?;

    info!(
        lattice_x = config.num_subdomains_x,
        lattice_y = config.num_subdomains_y,
        dx = derived.dx,
        dy = derived.dy,
        dt = derived.dt,
        nt = derived.nt,
        "configuration is valid"
    );
    println!(
        "lattice {}x{}  dx={:.6}  dy={:.6}  dt={:.6}  Nt={}",
        config.num_subdomains_x,
        config.num_subdomains_y,
        derived.dx,
        derived.dy,
        derived.dt,
        derived.nt
    );
    println!("sensors file:     {}", config.sensors_file_name());
    println!("observation file: {}", config.analytic_file_name(derived.nt));
    println!("result file:      {}", config.field_file_name(derived.nt));
    Ok(())
}
