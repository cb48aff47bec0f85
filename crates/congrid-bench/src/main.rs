//! The congestion-control comparison suite: four scenarios, five variants,
//! background rates from 1 to 10 Mbps. Metrics stream to stdout as CSV;
//! diagnostics go to stderr.

use std::io;

use anyhow::Context;
use congrid::core::{cc, run::run_grid, scenario::Scenario, units::Mbps};
use congrid::impls::FluidRuntime;
use env_logger::Env;
use log::info;

const VARIANT_NAMES: [&str; 5] = [
    "TcpVegas",
    "TcpWestwoodPlus",
    "TcpBbr",
    "TcpCubic",
    "TcpVeno",
];

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    // Resolve every variant name up front: an unknown name aborts the batch
    // before any topology is built or any row is emitted.
    let variants = VARIANT_NAMES
        .iter()
        .map(|name| cc::resolve(name))
        .collect::<Result<Vec<_>, _>>()
        .context("invalid congestion-control configuration")?;
    let loads = (1..=10).map(Mbps::new).collect::<Vec<_>>();
    info!(
        "running {} scenarios x {} variants x {} load levels",
        Scenario::SUITE.len(),
        variants.len(),
        loads.len()
    );

    let mut csv = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(io::stdout());
    run_grid(
        &Scenario::SUITE,
        &variants,
        &loads,
        || FluidRuntime::builder().build(),
        |row| csv.serialize(row).map_err(io::Error::other),
    )
    .context("parameter grid aborted")?;
    csv.flush()?;

    info!("parameter grid complete");
    Ok(())
}
