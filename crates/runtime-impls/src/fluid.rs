//! A deterministic fluid-model simulation runtime.
//!
//! `FluidRuntime` implements the harness's runtime interface without a
//! packet-level event loop: on `advance` it solves a one-shot fluid
//! approximation of the installed traffic. On/off sources offer their rate
//! scaled by a sampled duty cycle, bulk sources take the per-link residual
//! fair share and probe above it by a variant-dependent margin, and every
//! link delivers at most its capacity. Identical inputs and seed always
//! produce identical records, which is what makes grid rows comparable and
//! tests stable.

use std::collections::{HashSet, VecDeque};
use std::net::Ipv4Addr;

use log::debug;
use rand::prelude::*;
use rustc_hash::FxHashMap;

use congrid_core::cc::CcHandle;
use congrid_core::plan::OnOffPattern;
use congrid_core::runtime::{LinkHandle, NodeHandle, SimRuntime};
use congrid_core::stats::{FiveTuple, FlowCounters, FlowRecord, Protocol};
use congrid_core::units::{BitsPerSec, Bytes, Nanosecs, Packets};

/// Buffer assumed for links created without an explicit bound.
const DEFAULT_QUEUE: Packets = Packets::new(100);

/// Packetization granularity for bulk (TCP-like) sources.
const REF_PACKET: Bytes = Bytes::new(1_000);

/// A bulk source keeps at least this fraction of a link while probing, no
/// matter how much unreliable traffic crosses it.
const TCP_MIN_SHARE: f64 = 0.02;

const EPHEMERAL_PORT_BASE: u16 = 49152;

/// How far above its granted share a bulk source probes. Delay-sensitive
/// variants back off earlier and overshoot less; aggressive loss-based
/// variants overshoot more. This is where bulk residual losses come from.
fn probe_overshoot(cc: CcHandle) -> f64 {
    match cc.as_str() {
        "TcpVegas" => 0.01,
        "TcpBbr" => 0.02,
        "TcpVeno" => 0.03,
        "TcpWestwoodPlus" => 0.04,
        _ => 0.05, // Cubic and anything unrecognized
    }
}

/// A self-contained [`SimRuntime`] suitable for driving whole experiment
/// grids in-process.
#[derive(Debug, typed_builder::TypedBuilder)]
pub struct FluidRuntime {
    /// Seed for on/off interval sampling.
    #[builder(default = 0)]
    seed: u64,
    #[builder(default, setter(skip))]
    state: State,
}

#[derive(Debug, Default)]
struct State {
    nr_nodes: usize,
    links: Vec<FluidLink>,
    /// Per node: (peer, link index, forward direction), in creation order.
    adjacency: Vec<Vec<(usize, usize, bool)>>,
    /// Interface address to owning node.
    addr_owner: FxHashMap<Ipv4Addr, usize>,
    /// First assigned address per node.
    node_addr: FxHashMap<usize, Ipv4Addr>,
    routed: bool,
    sources: Vec<App>,
    sinks: HashSet<(usize, u16, Protocol)>,
    records: Vec<FlowRecord>,
}

#[derive(Debug, Clone, Copy)]
struct FluidLink {
    a: usize,
    b: usize,
    bandwidth: BitsPerSec,
    delay: Nanosecs,
    queue: Packets,
}

#[derive(Debug, Clone)]
struct App {
    node: usize,
    dst_addr: Ipv4Addr,
    dst_port: u16,
    kind: AppKind,
    start: Nanosecs,
    stop: Nanosecs,
}

#[derive(Debug, Clone, Copy)]
enum AppKind {
    Bulk {
        max_bytes: Option<Bytes>,
        cc: CcHandle,
    },
    OnOff {
        rate: BitsPerSec,
        packet_size: Bytes,
        on: OnOffPattern,
        off: OnOffPattern,
    },
}

impl AppKind {
    fn protocol(&self) -> Protocol {
        match self {
            AppKind::Bulk { .. } => Protocol::Tcp,
            AppKind::OnOff { .. } => Protocol::Udp,
        }
    }
}

impl Default for FluidRuntime {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl FluidRuntime {
    /// Shortest path from `src` to `dst`, as a list of (link, forward) hops.
    /// BFS with deterministic tie-breaking on link creation order. Like the
    /// packet-level engines this stands in for, any node forwards traffic
    /// once routes are computed.
    fn path_to(&self, src: usize, dst: usize) -> Vec<(usize, bool)> {
        let state = &self.state;
        let mut prev: Vec<Option<(usize, usize, bool)>> = vec![None; state.nr_nodes];
        let mut visited = vec![false; state.nr_nodes];
        visited[src] = true;
        let mut queue = VecDeque::from([src]);
        'search: while let Some(n) = queue.pop_front() {
            for &(peer, link, forward) in &state.adjacency[n] {
                if !visited[peer] {
                    visited[peer] = true;
                    prev[peer] = Some((n, link, forward));
                    if peer == dst {
                        break 'search;
                    }
                    queue.push_back(peer);
                }
            }
        }
        let mut hops = Vec::new();
        let mut cur = dst;
        while cur != src {
            match prev[cur] {
                Some((n, link, forward)) => {
                    hops.push((link, forward));
                    cur = n;
                }
                None => return Vec::new(), // unreachable destination
            }
        }
        hops.reverse();
        hops
    }

    /// Seconds the source spends "on" within a window of `window` seconds,
    /// sampling alternating on/off intervals.
    fn sample_on_time(rng: &mut StdRng, on: OnOffPattern, off: OnOffPattern, window: f64) -> f64 {
        let mut t = 0.0;
        let mut on_total = 0.0;
        while t < window {
            let on_len = sample_interval(rng, on);
            let off_len = sample_interval(rng, off);
            if on_len == 0.0 && off_len == 0.0 {
                // A zero-length cycle never advances the clock.
                break;
            }
            on_total += on_len.min(window - t);
            t += on_len + off_len;
        }
        on_total
    }

    fn solve(&mut self, stop: Nanosecs) {
        let stop_secs = stop.into_secs_f64();
        let nr_links = self.state.links.len();
        let nr_sources = self.state.sources.len();

        // Active window, destination node, path, and (for unreliable
        // sources) offered rate. Unreliable demand is inelastic, fixed by
        // the configured rate and the sampled duty cycle.
        let mut active = vec![0.0f64; nr_sources];
        let mut offered_rate = vec![0.0f64; nr_sources];
        let mut dsts = Vec::with_capacity(nr_sources);
        let mut paths = Vec::with_capacity(nr_sources);
        for (i, app) in self.state.sources.iter().enumerate() {
            let begin = app.start.into_secs_f64().min(stop_secs);
            let end = app.stop.into_secs_f64().min(stop_secs);
            active[i] = (end - begin).max(0.0);
            // A bad destination address is a configuration the runtime
            // cannot simulate; abort rather than guess.
            let dst = *self
                .state
                .addr_owner
                .get(&app.dst_addr)
                .expect("destination address was never assigned");
            dsts.push(dst);
            paths.push(self.path_to(app.node, dst));
            if let AppKind::OnOff { rate, on, off, .. } = app.kind {
                let mut rng = StdRng::seed_from_u64(
                    self.seed ^ (i as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15),
                );
                let on_time = Self::sample_on_time(&mut rng, on, off, active[i]);
                let duty = if active[i] > 0.0 { on_time / active[i] } else { 0.0 };
                offered_rate[i] = rate.into_f64() * duty;
            }
        }

        // Unreliable load and bulk flow count per link direction.
        let mut udp_load = vec![[0.0f64; 2]; nr_links];
        let mut nr_bulk = vec![[0usize; 2]; nr_links];
        for (i, app) in self.state.sources.iter().enumerate() {
            for &(link, forward) in &paths[i] {
                let dir = usize::from(forward);
                match app.kind {
                    AppKind::OnOff { .. } => udp_load[link][dir] += offered_rate[i],
                    AppKind::Bulk { .. } => nr_bulk[link][dir] += 1,
                }
            }
        }

        // Bulk sources adapt: each takes the residual fair share at its
        // path's tightest hop, then probes above it by its variant's margin.
        for (i, app) in self.state.sources.iter().enumerate() {
            let AppKind::Bulk { cc, .. } = app.kind else {
                continue;
            };
            let share = paths[i]
                .iter()
                .map(|&(link, forward)| {
                    let dir = usize::from(forward);
                    let cap = self.state.links[link].bandwidth.into_f64();
                    let residual = (cap - udp_load[link][dir]).max(cap * TCP_MIN_SHARE);
                    residual / nr_bulk[link][dir] as f64
                })
                .fold(f64::INFINITY, f64::min);
            if share.is_finite() {
                offered_rate[i] = share * (1.0 + probe_overshoot(cc));
            }
        }

        // Total offered load per link direction.
        let mut total_load = udp_load;
        for (i, app) in self.state.sources.iter().enumerate() {
            if matches!(app.kind, AppKind::Bulk { .. }) {
                for &(link, forward) in &paths[i] {
                    total_load[link][usize::from(forward)] += offered_rate[i];
                }
            }
        }
        // Loss happens at the tightest hop; traffic thinned there is not
        // dropped again downstream.
        let deliver_ratio = |link: usize, dir: usize| -> f64 {
            let cap = self.state.links[link].bandwidth.into_f64();
            let load = total_load[link][dir];
            if load > cap {
                cap / load
            } else {
                1.0
            }
        };

        // Reduce each source to its counters.
        let mut records = Vec::with_capacity(nr_sources);
        for (i, app) in self.state.sources.iter().enumerate() {
            let protocol = app.kind.protocol();
            let packet = match app.kind {
                AppKind::OnOff { packet_size, .. } => packet_size,
                AppKind::Bulk { .. } => REF_PACKET,
            };
            let mut offered_bytes = offered_rate[i] * active[i] / 8.0;
            if let AppKind::Bulk { max_bytes: Some(max), .. } = app.kind {
                offered_bytes = offered_bytes.min(max.into_f64());
            }

            let has_sink = self.state.sinks.contains(&(dsts[i], app.dst_port, protocol));
            let delivery = if has_sink && !paths[i].is_empty() {
                paths[i]
                    .iter()
                    .map(|&(link, forward)| deliver_ratio(link, usize::from(forward)))
                    .fold(1.0f64, f64::min)
            } else {
                0.0
            };

            let tx_packets = (offered_bytes / packet.into_f64()).ceil() as u64;
            let rx_packets = (tx_packets as f64 * delivery).floor() as u64;
            let rx_bytes = offered_bytes * delivery;
            let lost_packets = tx_packets - rx_packets;

            // Round trip: propagation both ways plus a utilization-scaled
            // queueing term bounded by each hop's buffer.
            let prop = paths[i]
                .iter()
                .map(|&(link, _)| self.state.links[link].delay.into_secs_f64())
                .sum::<f64>();
            let queueing = paths[i]
                .iter()
                .map(|&(link, forward)| {
                    let l = &self.state.links[link];
                    let cap = l.bandwidth.into_f64();
                    let util = (total_load[link][usize::from(forward)] / cap).min(1.0);
                    let pkt_time = l.bandwidth.length(REF_PACKET).into_secs_f64();
                    util * l.queue.into_f64() * pkt_time
                })
                .sum::<f64>();
            let rtt = 2.0 * prop + queueing;

            records.push(FlowRecord {
                tuple: FiveTuple {
                    src_addr: self
                        .state
                        .node_addr
                        .get(&app.node)
                        .copied()
                        .expect("source node has no assigned address"),
                    dst_addr: app.dst_addr,
                    protocol,
                    src_port: EPHEMERAL_PORT_BASE + i as u16,
                    dst_port: app.dst_port,
                },
                counters: FlowCounters {
                    tx_bytes: Bytes::new(offered_bytes.round() as u64),
                    rx_bytes: Bytes::new(rx_bytes.round() as u64),
                    tx_packets,
                    rx_packets,
                    lost_packets,
                    delay_sum: Nanosecs::new((rtt * rx_packets as f64 * 1e9).round() as u64),
                },
            });
        }
        debug!(
            "fluid solve: {} sources over {nr_links} links until {stop}",
            records.len()
        );
        self.state.records = records;
    }
}

fn sample_interval(rng: &mut StdRng, pattern: OnOffPattern) -> f64 {
    match pattern {
        OnOffPattern::Constant(value) => value.into_secs_f64(),
        OnOffPattern::Uniform { lo, hi } => {
            rng.gen_range(lo.into_secs_f64()..=hi.into_secs_f64())
        }
    }
}

impl SimRuntime for FluidRuntime {
    fn create_nodes(&mut self, count: usize) -> Vec<NodeHandle> {
        let first = self.state.nr_nodes;
        self.state.nr_nodes += count;
        self.state.adjacency.resize(self.state.nr_nodes, Vec::new());
        (first..first + count).map(NodeHandle::new).collect()
    }

    fn create_link(
        &mut self,
        a: NodeHandle,
        b: NodeHandle,
        bandwidth: BitsPerSec,
        delay: Nanosecs,
        queue: Option<Packets>,
    ) -> LinkHandle {
        let idx = self.state.links.len();
        self.state.links.push(FluidLink {
            a: a.inner(),
            b: b.inner(),
            bandwidth,
            delay,
            queue: queue.unwrap_or(DEFAULT_QUEUE),
        });
        self.state.adjacency[a.inner()].push((b.inner(), idx, true));
        self.state.adjacency[b.inner()].push((a.inner(), idx, false));
        LinkHandle::new(idx)
    }

    fn assign_addresses(
        &mut self,
        link: LinkHandle,
        subnet: Ipv4Addr,
        _prefix_len: u8,
    ) -> [Ipv4Addr; 2] {
        let base = u32::from(subnet);
        let addrs = [Ipv4Addr::from(base + 1), Ipv4Addr::from(base + 2)];
        let FluidLink { a, b, .. } = self.state.links[link.inner()];
        self.state.addr_owner.insert(addrs[0], a);
        self.state.addr_owner.insert(addrs[1], b);
        self.state.node_addr.entry(a).or_insert(addrs[0]);
        self.state.node_addr.entry(b).or_insert(addrs[1]);
        addrs
    }

    fn compute_routing(&mut self) {
        self.state.routed = true;
    }

    fn install_bulk_source(
        &mut self,
        node: NodeHandle,
        dst_addr: Ipv4Addr,
        dst_port: u16,
        max_bytes: Option<Bytes>,
        cc: CcHandle,
        start: Nanosecs,
        stop: Nanosecs,
    ) {
        self.state.sources.push(App {
            node: node.inner(),
            dst_addr,
            dst_port,
            kind: AppKind::Bulk { max_bytes, cc },
            start,
            stop,
        });
    }

    fn install_on_off_source(
        &mut self,
        node: NodeHandle,
        dst_addr: Ipv4Addr,
        dst_port: u16,
        rate: BitsPerSec,
        packet_size: Bytes,
        on: OnOffPattern,
        off: OnOffPattern,
        start: Nanosecs,
        stop: Nanosecs,
    ) {
        self.state.sources.push(App {
            node: node.inner(),
            dst_addr,
            dst_port,
            kind: AppKind::OnOff {
                rate,
                packet_size,
                on,
                off,
            },
            start,
            stop,
        });
    }

    fn install_sink(&mut self, node: NodeHandle, port: u16, protocol: Protocol, _start: Nanosecs) {
        self.state.sinks.insert((node.inner(), port, protocol));
    }

    fn advance(&mut self, stop: Nanosecs) {
        assert!(self.state.routed, "advance called before compute_routing");
        self.solve(stop);
    }

    fn flow_records(&self) -> Vec<FlowRecord> {
        self.state.records.clone()
    }

    fn teardown(&mut self) {
        self.state = State::default();
    }
}
