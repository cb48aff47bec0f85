//! Traffic plans: the measured flow and its background load, with explicit
//! activation windows, validated against a network and installed on the
//! runtime.

use std::collections::HashSet;

use crate::cc::CcVariant;
use crate::network::{Network, NodeId};
use crate::runtime::{NodeMap, SimRuntime};
use crate::stats::Protocol;
use crate::units::{BitsPerSec, Bytes, Nanosecs};

identifier!(FlowId, usize);

/// An on or off interval distribution, in simulated time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum OnOffPattern {
    /// A fixed interval.
    Constant(Nanosecs),
    /// An interval drawn uniformly from `[lo, hi]` per cycle.
    Uniform { lo: Nanosecs, hi: Nanosecs },
}

/// What a flow sends.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub enum FlowKind {
    /// Reliable bulk transfer. `max_bytes: None` sends until the run ends so
    /// throughput reflects sustained capacity rather than completion of a
    /// fixed transfer. The congestion-control variant is carried here, per
    /// flow; there is no process-wide default and installation order does
    /// not select the variant.
    Bulk {
        max_bytes: Option<Bytes>,
        cc: CcVariant,
    },
    /// Unreliable on/off source at an explicit rate.
    OnOff {
        rate: BitsPerSec,
        packet_size: Bytes,
        on: OnOffPattern,
        off: OnOffPattern,
    },
}

/// A traffic source-sink pairing with an activation window `[start, stop)`.
#[derive(Debug, Clone, Copy, typed_builder::TypedBuilder, serde::Serialize)]
pub struct FlowSpec {
    pub id: FlowId,
    pub kind: FlowKind,
    pub src: NodeId,
    pub dst: NodeId,
    pub dst_port: u16,
    #[builder(setter(into))]
    pub start: Nanosecs,
    #[builder(setter(into))]
    pub stop: Nanosecs,
    /// Whether this flow's statistics are reported. Background flows exist
    /// only to create contention.
    #[builder(default)]
    pub measured: bool,
}

impl FlowSpec {
    pub fn protocol(&self) -> Protocol {
        match self.kind {
            FlowKind::Bulk { .. } => Protocol::Tcp,
            FlowKind::OnOff { .. } => Protocol::Udp,
        }
    }
}

/// The flows of one run, in installation order.
#[derive(Debug, Clone)]
pub struct TrafficPlan {
    flows: Vec<FlowSpec>,
}

impl TrafficPlan {
    pub fn new(flows: Vec<FlowSpec>) -> Self {
        Self { flows }
    }

    /// Validates the plan against a network, producing a `ValidPlan`.
    ///
    /// Correctness properties:
    ///
    /// - Every flow must have a unique ID.
    /// - Every flow's source and destination must be distinct non-switch nodes.
    /// - Every flow's activation window must be non-empty.
    /// - Flows targeting the same destination node must use distinct
    ///   destination ports, so the five-tuple classifier can tell them apart.
    /// - At least one flow is measured, and every measured flow is reliable.
    pub fn validate(self, network: &Network) -> Result<ValidPlan, PlanError> {
        if self.flows.is_empty() {
            return Err(PlanError::Empty);
        }
        let hosts = network
            .nodes()
            .filter(|n| n.kind.is_host())
            .map(|n| n.id)
            .collect::<HashSet<_>>();
        let mut ids = HashSet::new();
        let mut ports = HashSet::new();
        for flow in &self.flows {
            if !ids.insert(flow.id) {
                return Err(PlanError::DuplicateFlowId(flow.id));
            }
            if !hosts.contains(&flow.src) {
                return Err(PlanError::InvalidFlowSrc {
                    flow: flow.id,
                    src: flow.src,
                });
            }
            if !hosts.contains(&flow.dst) {
                return Err(PlanError::InvalidFlowDst {
                    flow: flow.id,
                    dst: flow.dst,
                });
            }
            if flow.src == flow.dst {
                return Err(PlanError::SelfFlow(flow.id));
            }
            if flow.start >= flow.stop {
                return Err(PlanError::EmptyWindow(flow.id));
            }
            // CORRECTNESS: (destination, port) pairs must be unique.
            if !ports.insert((flow.dst, flow.dst_port)) {
                return Err(PlanError::DuplicatePort {
                    dst: flow.dst,
                    port: flow.dst_port,
                });
            }
            if flow.measured && flow.protocol() != Protocol::Tcp {
                return Err(PlanError::UnreliableMeasuredFlow(flow.id));
            }
        }
        if !self.flows.iter().any(|f| f.measured) {
            return Err(PlanError::NoMeasuredFlow);
        }
        Ok(ValidPlan { flows: self.flows })
    }
}

/// A `TrafficPlan` that satisfies the properties listed in
/// [`TrafficPlan::validate`] against its network.
#[derive(Debug, Clone)]
pub struct ValidPlan {
    flows: Vec<FlowSpec>,
}

impl ValidPlan {
    pub fn flows(&self) -> &[FlowSpec] {
        &self.flows
    }

    /// Destination ports of the measured flow(s), for the aggregator filter.
    pub fn measured_ports(&self) -> Vec<u16> {
        self.flows
            .iter()
            .filter(|f| f.measured)
            .map(|f| f.dst_port)
            .collect()
    }

    /// The warm-up offset: the earliest measured flow's start time.
    pub fn earliest_measured_start(&self) -> Nanosecs {
        self.flows
            .iter()
            .filter(|f| f.measured)
            .map(|f| f.start)
            .min()
            .unwrap() // validation guarantees a measured flow exists
    }

    /// Registers every flow's source and sink with the runtime, resolving
    /// each bulk flow's own congestion-control variant at installation time.
    pub fn install<R: SimRuntime>(
        &self,
        network: &Network,
        map: &NodeMap,
        rt: &mut R,
    ) -> Result<(), PlanError> {
        for flow in &self.flows {
            let src = map.get(flow.src).ok_or(PlanError::UnmappedNode(flow.src))?;
            let dst = map.get(flow.dst).ok_or(PlanError::UnmappedNode(flow.dst))?;
            let dst_addr = network
                .addr_of(flow.dst)
                .ok_or(PlanError::UnaddressedNode(flow.dst))?;
            rt.install_sink(dst, flow.dst_port, flow.protocol(), Nanosecs::ZERO);
            match flow.kind {
                FlowKind::Bulk { max_bytes, cc } => rt.install_bulk_source(
                    src,
                    dst_addr,
                    flow.dst_port,
                    max_bytes,
                    cc.handle(),
                    flow.start,
                    flow.stop,
                ),
                FlowKind::OnOff {
                    rate,
                    packet_size,
                    on,
                    off,
                } => rt.install_on_off_source(
                    src,
                    dst_addr,
                    flow.dst_port,
                    rate,
                    packet_size,
                    on,
                    off,
                    flow.start,
                    flow.stop,
                ),
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("traffic plan has no flows")]
    Empty,

    #[error("traffic plan has no measured flow")]
    NoMeasuredFlow,

    #[error("duplicate flow ID {0}")]
    DuplicateFlowId(FlowId),

    #[error("flow {flow} has an invalid source ({src})")]
    InvalidFlowSrc { flow: FlowId, src: NodeId },

    #[error("flow {flow} has an invalid destination ({dst})")]
    InvalidFlowDst { flow: FlowId, dst: NodeId },

    #[error("flow {0} sends to itself")]
    SelfFlow(FlowId),

    #[error("flow {0} has an empty activation window")]
    EmptyWindow(FlowId),

    #[error("two flows to {dst} share destination port {port}")]
    DuplicatePort { dst: NodeId, port: u16 },

    #[error("measured flow {0} is not reliable-transport")]
    UnreliableMeasuredFlow(FlowId),

    #[error("node {0} has no runtime handle")]
    UnmappedNode(NodeId),

    #[error("node {0} has no assigned address")]
    UnaddressedNode(NodeId),
}
