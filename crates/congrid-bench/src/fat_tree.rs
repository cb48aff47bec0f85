//! The fat-tree study: the k=4 fat-tree scenario swept over every variant
//! and background rates from 1 to 10 Mbps.

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

    let variants = VARIANT_NAMES
        .iter()
        .map(|name| cc::resolve(name))
        .collect::<Result<Vec<_>, _>>()
        .context("invalid congestion-control configuration")?;
    let loads = (1..=10).map(Mbps::new).collect::<Vec<_>>();

    let mut csv = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(io::stdout());
    run_grid(
        &[Scenario::FatTree],
        &variants,
        &loads,
        || FluidRuntime::builder().build(),
        |row| csv.serialize(row).map_err(io::Error::other),
    )
    .context("fat-tree study aborted")?;
    csv.flush()?;

    info!("fat-tree study complete");
    Ok(())
}
