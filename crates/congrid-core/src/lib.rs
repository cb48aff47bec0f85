#![warn(unreachable_pub, missing_debug_implementations)]

//! The core `congrid` library. This crate defines the pieces that compose a
//! congestion-control experiment: topology builders ([`topo`]), the variant
//! registry ([`cc`]), traffic plans ([`plan`]), the flow statistics reducer
//! ([`stats`]), and [the driver](run::run_grid) that sweeps the parameter
//! grid against a [simulation runtime](runtime::SimRuntime).

#[macro_use]
mod ident;

pub mod cc;
pub mod network;
pub mod plan;
pub mod run;
pub mod runtime;
pub mod scenario;
pub mod stats;
pub mod topo;
pub mod units;

#[cfg(test)]
pub(crate) mod testing;

pub use cc::CcVariant;
pub use network::{Network, TopologyError};
pub use plan::{FlowSpec, TrafficPlan};
pub use run::{run_grid, RunError};
pub use runtime::SimRuntime;
pub use scenario::Scenario;
pub use stats::MetricsRow;
