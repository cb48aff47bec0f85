//! `congrid` is an experiment harness for studying transport-layer
//! congestion-control behavior over synthetic network topologies. It builds
//! parametrized fat-tree, diamond, and dumbbell graphs, attaches measured
//! and background traffic with a selectable congestion-control variant,
//! advances a pluggable simulation runtime, and reduces per-flow counters
//! into a CSV grid of throughput, average RTT, and drop-rate metrics.

#![warn(unreachable_pub, missing_docs)]

pub mod core;

pub mod impls;
