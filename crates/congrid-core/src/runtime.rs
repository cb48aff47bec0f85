//! The interface to the external simulation runtime, and the routine that
//! materializes a validated [`Network`] through it.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use crate::cc::CcHandle;
use crate::network::{LinkId, Network, NodeId, PREFIX_LEN};
use crate::plan::OnOffPattern;
use crate::stats::{FlowRecord, Protocol};
use crate::units::{BitsPerSec, Bytes, Nanosecs, Packets};

identifier!(NodeHandle, usize);
identifier!(LinkHandle, usize);

/// What the core calls on the external simulation collaborator. One runtime
/// instance serves exactly one run; the driver constructs a fresh one per
/// grid combination and tears it down afterward.
///
/// Runtime failures are outside the harness's error policy: implementations
/// either complete the run or abort the process.
pub trait SimRuntime {
    /// Creates `count` simulation nodes, returning their handles.
    fn create_nodes(&mut self, count: usize) -> Vec<NodeHandle>;

    /// Creates a point-to-point link between two nodes.
    fn create_link(
        &mut self,
        a: NodeHandle,
        b: NodeHandle,
        bandwidth: BitsPerSec,
        delay: Nanosecs,
        queue: Option<Packets>,
    ) -> LinkHandle;

    /// Assigns a fresh subnet to a link, returning the two interface
    /// addresses in endpoint order.
    fn assign_addresses(&mut self, link: LinkHandle, subnet: Ipv4Addr, prefix_len: u8)
        -> [Ipv4Addr; 2];

    /// Computes routes. Must be called once, after all links exist and
    /// before any traffic starts.
    fn compute_routing(&mut self);

    /// Installs a reliable bulk source. `max_bytes: None` sends until the
    /// run ends. The congestion-control handle applies to this flow only.
    #[allow(clippy::too_many_arguments)]
    fn install_bulk_source(
        &mut self,
        node: NodeHandle,
        dst_addr: Ipv4Addr,
        dst_port: u16,
        max_bytes: Option<Bytes>,
        cc: CcHandle,
        start: Nanosecs,
        stop: Nanosecs,
    );

    /// Installs an unreliable on/off source.
    #[allow(clippy::too_many_arguments)]
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
    );

    /// Installs a packet sink listening on `port`.
    fn install_sink(&mut self, node: NodeHandle, port: u16, protocol: Protocol, start: Nanosecs);

    /// Runs the simulated clock forward until `stop`, blocking.
    fn advance(&mut self, stop: Nanosecs);

    /// The classified per-flow counters accumulated during the run.
    fn flow_records(&self) -> Vec<FlowRecord>;

    /// Releases all run-scoped runtime state.
    fn teardown(&mut self);
}

/// Mapping from topology node ids to runtime node handles.
#[derive(Debug, Default, Clone)]
pub struct NodeMap {
    inner: HashMap<NodeId, NodeHandle>,
}

impl NodeMap {
    pub fn get(&self, id: NodeId) -> Option<NodeHandle> {
        self.inner.get(&id).copied()
    }

    pub fn insert(&mut self, id: NodeId, handle: NodeHandle) {
        self.inner.insert(id, handle);
    }

    delegate::delegate! {
        to self.inner {
            pub fn len(&self) -> usize;
            pub fn is_empty(&self) -> bool;
        }
    }
}

/// Replays a validated network into the runtime: nodes, then links with
/// their planned subnets, then the one-shot route computation.
pub fn materialize<R: SimRuntime>(network: &Network, rt: &mut R) -> NodeMap {
    let ids = network.nodes().map(|n| n.id).collect::<Vec<_>>();
    let handles = rt.create_nodes(ids.len());
    let mut map = NodeMap::default();
    for (&id, &handle) in ids.iter().zip(handles.iter()) {
        map.insert(id, handle);
    }
    for (i, link) in network.links().enumerate() {
        // Link endpoints were validated by `Network::new`
        let a = map.get(link.a).unwrap();
        let b = map.get(link.b).unwrap();
        let handle = rt.create_link(a, b, link.bandwidth, link.delay, link.queue);
        let planned = network.addrs().link(LinkId::new(i)).unwrap();
        let assigned = rt.assign_addresses(handle, planned.subnet, PREFIX_LEN);
        debug_assert_eq!(assigned, [planned.a, planned.b]);
    }
    rt.compute_routing();
    map
}
