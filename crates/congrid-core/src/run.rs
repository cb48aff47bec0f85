//! The experiment driver: sweeps the scenario × variant × load grid, one
//! fully isolated run per combination.

use log::{debug, info};

use crate::cc::CcVariant;
use crate::network::{Network, TopologyError};
use crate::plan::PlanError;
use crate::runtime::{materialize, SimRuntime};
use crate::scenario::Scenario;
use crate::stats::{collect, MetricsRow, RunContext};
use crate::topo::TopoBuildError;
use crate::units::Mbps;

/// Iterates the Cartesian product of scenarios, variants, and background
/// load levels in declared order, emitting every [`MetricsRow`] as soon as
/// its run completes. Each combination gets a runtime of its own from
/// `make_runtime` and releases all run-scoped state before the next one
/// starts, so no run can observe another's state.
///
/// The first error halts the batch; remaining combinations are not run.
pub fn run_grid<R, F, E>(
    scenarios: &[Scenario],
    variants: &[CcVariant],
    loads: &[Mbps],
    mut make_runtime: F,
    mut emit: E,
) -> Result<(), RunError>
where
    R: SimRuntime,
    F: FnMut() -> R,
    E: FnMut(MetricsRow) -> std::io::Result<()>,
{
    for &scenario in scenarios {
        for &variant in variants {
            for &load in loads {
                let rows = run_once(scenario, variant, load, make_runtime())?;
                for row in rows {
                    emit(row)?;
                }
            }
        }
        info!("{} complete", scenario.label());
    }
    Ok(())
}

/// Executes one (scenario, variant, load) combination against a fresh
/// runtime and returns its rows. The runtime is consumed: the topology,
/// plan, and all runtime state are discarded when this function returns.
pub fn run_once<R: SimRuntime>(
    scenario: Scenario,
    variant: CcVariant,
    load: Mbps,
    mut rt: R,
) -> Result<Vec<MetricsRow>, RunError> {
    debug!(
        "running {} variant={variant} load={load}",
        scenario.label()
    );
    let blueprint = scenario.topo().build()?;
    let network = Network::new(&blueprint.nodes, &blueprint.links)?;
    let map = materialize(&network, &mut rt);
    let plan = scenario
        .traffic(&blueprint, variant, load)
        .validate(&network)?;
    plan.install(&network, &map, &mut rt)?;
    rt.advance(scenario.stop());
    let records = rt.flow_records();
    let ctx = RunContext::builder()
        .scenario(scenario.label())
        .variant(variant.name())
        .cbr_mbps(load.into_f64())
        .measured_ports(plan.measured_ports())
        .duration(scenario.stop() - plan.earliest_measured_start())
        .build();
    let rows = collect(&records, &ctx);
    rt.teardown();
    Ok(rows)
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Invalid topology size parameters: a configuration error.
    #[error("failed to build topology")]
    Build(#[from] TopoBuildError),

    /// The built graph is malformed: a structural error.
    #[error("invalid topology")]
    Topology(#[from] TopologyError),

    /// The scenario's flows are inconsistent: a configuration error.
    #[error("invalid traffic plan")]
    Plan(#[from] PlanError),

    /// The output stream rejected a row.
    #[error("failed to emit metrics row")]
    Emit(#[from] std::io::Error),
}
