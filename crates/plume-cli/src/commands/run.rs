//! Run a full assimilation simulation.

use anyhow::{Context, Result};
use clap::Args;
use plume_core::driver::Simulation;
use plume_core::output::ResultStream;
use plume_diagnostics::observations::{build_observation_sets, ReferenceSeries};
use plume_diagnostics::sensors::SensorLayout;
use plume_types::config::SimulationConfig;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

#[derive(Args)]
pub struct RunArgs {
    /// Configuration file path.
    #[arg(short, long)]
    pub config: PathBuf,

    /// Sensor file path; defaults to the conventional name inside the
    /// output directory.
    #[arg(long)]
    pub sensors: Option<PathBuf>,

    /// Reference observation file path; defaults to the conventional
    /// name inside the output directory.
    #[arg(long)]
    pub observations: Option<PathBuf>,

    /// Start from the configured Gaussian spot instead of a zero field.
    #[arg(long)]
    pub gaussian_start: bool,
}

pub fn execute(args: RunArgs) -> Result<()> {
    let config = SimulationConfig::from_file(&args.config)
        .with_context(|| format!("reading configuration {}", args.config.display()))?;
    let derived = config.derive().context("validating configuration")?;
    info!(
        nt = derived.nt,
        dt = derived.dt,
        subdomains = derived.lattice.len(),
        "configuration accepted"
    );

    let sensors_path = args
        .sensors
        .unwrap_or_else(|| config.output_path(&config.sensors_file_name()));
    let layout = SensorLayout::from_file(&sensors_path, derived.lattice)
        .with_context(|| format!("reading sensors {}", sensors_path.display()))?;
    info!(
        total = layout.total(),
        covered = layout.covered_subdomains(),
        "sensor layout loaded"
    );

    let observations_path = args
        .observations
        .unwrap_or_else(|| config.output_path(&config.analytic_file_name(derived.nt)));
    let series = ReferenceSeries::from_file(&observations_path, derived.lattice, derived.nt)
        .with_context(|| format!("reading observations {}", observations_path.display()))?;

    let sets = build_observation_sets(&layout, &series);

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating output directory {}", config.output_dir))?;
    let result_path = config.output_path(&config.field_file_name(derived.nt));
    let mut stream = ResultStream::create(&result_path)
        .with_context(|| format!("creating result file {}", result_path.display()))?;

    let mut sim = Simulation::new(config, sets).context("building the engine")?;
    if args.gaussian_start {
        sim.init_gaussian().context("placing the initial spot")?;
    } else {
        sim.init_zero();
    }

    let start = Instant::now();
    sim.run(&mut stream).context("running the simulation")?;
    stream.flush().context("flushing the result stream")?;

    info!(
        elapsed_s = start.elapsed().as_secs_f64(),
        result = %result_path.display(),
        "run complete"
    );
    Ok(())
}
