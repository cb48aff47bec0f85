//! Simulation runtime implementations.

pub use runtime_impls::*;
