//! The flow statistics aggregator: a pure reducer from the runtime's raw
//! per-flow records to the report rows. Runs once, after the run completes,
//! over an immutable record list.

use std::net::Ipv4Addr;

use crate::units::{Bytes, Nanosecs};

/// Transport protocol of a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Protocol {
    Tcp,
    Udp,
}

/// The classification key mapping raw flow records back to flow specs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct FiveTuple {
    pub src_addr: Ipv4Addr,
    pub dst_addr: Ipv4Addr,
    pub protocol: Protocol,
    pub src_port: u16,
    pub dst_port: u16,
}

/// Counters accumulated by the runtime over one run. Monotone during the
/// run; read-only once the run ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct FlowCounters {
    pub tx_bytes: Bytes,
    pub rx_bytes: Bytes,
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub lost_packets: u64,
    /// Sum of per-packet round-trip delays over all received packets.
    pub delay_sum: Nanosecs,
}

/// One classified raw record, as handed back by the runtime.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct FlowRecord {
    pub tuple: FiveTuple,
    pub counters: FlowCounters,
}

/// Emitted in place of a metric whose denominator was zero, distinguishing
/// "no data" from a measured zero.
pub const SENTINEL: f64 = -1.0;

/// One output record. Produced exactly once per (scenario, variant, load)
/// combination and never mutated after emission.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MetricsRow {
    #[serde(rename = "Scenario")]
    pub scenario: String,
    #[serde(rename = "Variant")]
    pub variant: String,
    #[serde(rename = "CBR(Mbps)")]
    pub cbr_mbps: f64,
    #[serde(rename = "Throughput(Mbps)")]
    pub throughput_mbps: f64,
    #[serde(rename = "AvgRTT(ms)")]
    pub avg_rtt_ms: f64,
    #[serde(rename = "DropRate")]
    pub drop_rate: f64,
}

/// Per-run labels and filters supplied by the driver.
#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct RunContext {
    #[builder(setter(into))]
    pub scenario: String,
    #[builder(setter(into))]
    pub variant: String,
    pub cbr_mbps: f64,
    /// Destination ports of the measured flow(s).
    pub measured_ports: Vec<u16>,
    /// Stop time minus the warm-up offset (the earliest measured flow's
    /// start), held constant per scenario so rows are comparable.
    #[builder(setter(into))]
    pub duration: Nanosecs,
}

/// Reduces raw records to report rows: keeps reliable-transport records on
/// the measured ports and derives throughput, average RTT, and drop rate.
/// Background flows exist only to create contention and are never reported.
pub fn collect(records: &[FlowRecord], ctx: &RunContext) -> Vec<MetricsRow> {
    records
        .iter()
        .filter(|r| {
            r.tuple.protocol == Protocol::Tcp && ctx.measured_ports.contains(&r.tuple.dst_port)
        })
        .map(|r| MetricsRow {
            scenario: ctx.scenario.clone(),
            variant: ctx.variant.clone(),
            cbr_mbps: ctx.cbr_mbps,
            throughput_mbps: throughput_mbps(r.counters.rx_bytes, ctx.duration),
            avg_rtt_ms: avg_rtt_ms(&r.counters),
            drop_rate: drop_rate(&r.counters),
        })
        .collect()
}

/// Received bits over the run duration, in Mbps.
pub fn throughput_mbps(rx_bytes: Bytes, duration: Nanosecs) -> f64 {
    if duration == Nanosecs::ZERO {
        return SENTINEL;
    }
    rx_bytes.into_f64() * 8.0 / duration.into_secs_f64() / 1e6
}

/// Mean observed round-trip delay in milliseconds, or [`SENTINEL`] if no
/// packet was received.
pub fn avg_rtt_ms(counters: &FlowCounters) -> f64 {
    if counters.rx_packets == 0 {
        return SENTINEL;
    }
    counters.delay_sum.into_secs_f64() / counters.rx_packets as f64 * 1e3
}

/// Fraction of packets lost among all packets offered to the network, or
/// [`SENTINEL`] if nothing was offered.
pub fn drop_rate(counters: &FlowCounters) -> f64 {
    let denominator = counters.tx_packets + counters.lost_packets;
    if denominator == 0 {
        return SENTINEL;
    }
    counters.lost_packets as f64 / denominator as f64
}
