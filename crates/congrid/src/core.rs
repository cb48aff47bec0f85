//! Core congrid data structures, traits, and routines. The most common entry
//! point is [run::run_grid()], which sweeps a scenario × variant × load grid
//! against a [simulation runtime](runtime::SimRuntime).

pub use congrid_core::*;
