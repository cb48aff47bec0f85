//! Declarative topology builders. Each spec describes a whole graph as data
//! and is executed in one deterministic pass, so the same spec always
//! produces the same nodes, links, and address plan.

use crate::network::{Link, Node, NodeId, NodeKind};
use crate::units::{BitsPerSec, Nanosecs, Packets};

/// Construction parameters shared by a group of links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, typed_builder::TypedBuilder, serde::Serialize)]
pub struct LinkParams {
    #[builder(setter(into))]
    pub bandwidth: BitsPerSec,
    #[builder(setter(into))]
    pub delay: Nanosecs,
    /// Bounded buffer in packets; `None` leaves the runtime default.
    #[builder(default, setter(strip_option))]
    pub queue: Option<Packets>,
}

impl LinkParams {
    fn link(&self, a: NodeId, b: NodeId) -> Link {
        let link = Link::new(a, b, self.bandwidth, self.delay);
        match self.queue {
            Some(queue) => link.with_queue(queue),
            None => link,
        }
    }
}

/// A topology family plus its size parameters.
#[derive(Debug, Clone, serde::Serialize)]
pub enum TopoSpec {
    FatTree(FatTreeSpec),
    Diamond(DiamondSpec),
    Dumbbell(DumbbellSpec),
}

impl TopoSpec {
    pub fn build(&self) -> Result<Blueprint, TopoBuildError> {
        match self {
            TopoSpec::FatTree(spec) => spec.build(),
            TopoSpec::Diamond(spec) => spec.build(),
            TopoSpec::Dumbbell(spec) => spec.build(),
        }
    }
}

/// The output of a builder: the full node/link description of one scenario,
/// with the designated endpoints and named tiers.
#[derive(Debug, Clone)]
pub struct Blueprint {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    /// Designated sending endpoints, in role order.
    pub senders: Vec<NodeId>,
    /// Designated receiving endpoints, in role order.
    pub receivers: Vec<NodeId>,
    /// Named node groups ("core", "agg", "edge", "hosts", ...).
    pub tiers: Vec<Tier>,
}

impl Blueprint {
    /// The nodes of a named tier; empty if the family has no such tier.
    pub fn tier(&self, name: &str) -> &[NodeId] {
        self.tiers
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.nodes.as_slice())
            .unwrap_or(&[])
    }
}

/// A named group of nodes within a blueprint.
#[derive(Debug, Clone, derive_new::new)]
pub struct Tier {
    pub name: &'static str,
    pub nodes: Vec<NodeId>,
}

#[derive(Debug, Default)]
struct NodeAlloc {
    nodes: Vec<Node>,
}

impl NodeAlloc {
    fn next(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Node { id, kind });
        id
    }

    fn batch(&mut self, kind: NodeKind, count: usize) -> Vec<NodeId> {
        (0..count).map(|_| self.next(kind)).collect()
    }
}

/// A folded-Clos fat-tree parameterized by port count `k` (even, at least 2):
/// `(k/2)²` core switches, `k` pods of `k/2` aggregation and `k/2` edge
/// switches, and `k/2` hosts per edge switch. Two hosts in different pods are
/// designated as experiment endpoints, joined through an explicit relay
/// switch that emulates path stretch.
#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize)]
pub struct FatTreeSpec {
    pub k: usize,
    pub link: LinkParams,
}

impl FatTreeSpec {
    pub fn build(&self) -> Result<Blueprint, TopoBuildError> {
        let k = self.k;
        if k < 2 || k % 2 != 0 {
            return Err(TopoBuildError::FatTreeArity(k));
        }
        let half = k / 2;
        let mut alloc = NodeAlloc::default();

        let core = alloc.batch(NodeKind::Switch, half * half);
        let mut agg = Vec::with_capacity(k);
        let mut edge = Vec::with_capacity(k);
        let mut host_groups = Vec::with_capacity(k * half);
        for _pod in 0..k {
            agg.push(alloc.batch(NodeKind::Switch, half));
            let pod_edge = alloc.batch(NodeKind::Switch, half);
            for _ in &pod_edge {
                host_groups.push(alloc.batch(NodeKind::Host, half));
            }
            edge.push(pod_edge);
        }

        // Designated endpoints: first host of the first edge group, second
        // host of the last edge group (different pods for any k >= 2).
        let sender = host_groups[0][0];
        let receiver = {
            let last = host_groups.last().unwrap();
            last[1.min(last.len() - 1)]
        };
        alloc.nodes[sender.inner()].kind = NodeKind::Sender;
        alloc.nodes[receiver.inner()].kind = NodeKind::Receiver;
        let relay = alloc.next(NodeKind::Switch);

        let mut links = Vec::new();
        // Full bipartite aggregation-edge mesh within each pod.
        for pod in 0..k {
            for &a in &agg[pod] {
                for &e in &edge[pod] {
                    links.push(self.link.link(a, e));
                }
            }
        }
        // Each aggregation switch fans out to its own group of k/2 cores.
        for pod in 0..k {
            for (i, &a) in agg[pod].iter().enumerate() {
                for &c in &core[i * half..(i + 1) * half] {
                    links.push(self.link.link(a, c));
                }
            }
        }
        // Edge switches down to their hosts.
        for pod in 0..k {
            for (i, &e) in edge[pod].iter().enumerate() {
                for &h in &host_groups[pod * half + i] {
                    links.push(self.link.link(e, h));
                }
            }
        }
        // The relay attaches to both endpoints last.
        links.push(self.link.link(sender, relay));
        links.push(self.link.link(relay, receiver));

        let hosts = host_groups.iter().flatten().copied().collect::<Vec<_>>();
        Ok(Blueprint {
            nodes: alloc.nodes,
            links,
            senders: vec![sender],
            receivers: vec![receiver],
            tiers: vec![
                Tier::new("core", core),
                Tier::new("agg", agg.into_iter().flatten().collect()),
                Tier::new("edge", edge.into_iter().flatten().collect()),
                Tier::new("hosts", hosts),
                Tier::new("relay", vec![relay]),
            ],
        })
    }
}

/// A two-level star: senders fan into hub A, hub B fans out to receivers.
/// With `nr_paths == 1` the hubs are joined directly; otherwise that many
/// parallel mid switches sit between them.
#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize)]
pub struct DiamondSpec {
    pub nr_senders: usize,
    pub nr_receivers: usize,
    pub nr_paths: usize,
    pub link: LinkParams,
}

impl DiamondSpec {
    pub fn build(&self) -> Result<Blueprint, TopoBuildError> {
        if self.nr_senders == 0 {
            return Err(TopoBuildError::MissingTier("diamond", "sender"));
        }
        if self.nr_receivers == 0 {
            return Err(TopoBuildError::MissingTier("diamond", "receiver"));
        }
        if self.nr_paths == 0 {
            return Err(TopoBuildError::MissingTier("diamond", "path"));
        }
        let mut alloc = NodeAlloc::default();
        let senders = alloc.batch(NodeKind::Sender, self.nr_senders);
        let hub_a = alloc.next(NodeKind::Switch);
        let mids = if self.nr_paths > 1 {
            alloc.batch(NodeKind::Switch, self.nr_paths)
        } else {
            Vec::new()
        };
        let hub_b = alloc.next(NodeKind::Switch);
        let receivers = alloc.batch(NodeKind::Receiver, self.nr_receivers);

        let mut links = Vec::new();
        for &s in &senders {
            links.push(self.link.link(s, hub_a));
        }
        if mids.is_empty() {
            links.push(self.link.link(hub_a, hub_b));
        } else {
            for &m in &mids {
                links.push(self.link.link(hub_a, m));
            }
            for &m in &mids {
                links.push(self.link.link(m, hub_b));
            }
        }
        for &r in &receivers {
            links.push(self.link.link(hub_b, r));
        }

        Ok(Blueprint {
            nodes: alloc.nodes,
            links,
            senders: senders.clone(),
            receivers: receivers.clone(),
            tiers: vec![
                Tier::new("senders", senders),
                Tier::new("hubs", vec![hub_a, hub_b]),
                Tier::new("mids", mids),
                Tier::new("receivers", receivers),
            ],
        })
    }
}

/// The shared-bottleneck dumbbell: `nr_pairs` senders and receivers on
/// individual access links into two routers joined by a single bottleneck
/// link of materially lower bandwidth.
#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize)]
pub struct DumbbellSpec {
    pub nr_pairs: usize,
    pub access: LinkParams,
    pub bottleneck: LinkParams,
}

impl DumbbellSpec {
    pub fn build(&self) -> Result<Blueprint, TopoBuildError> {
        if self.nr_pairs == 0 {
            return Err(TopoBuildError::MissingTier("dumbbell", "sender/receiver pair"));
        }
        let mut alloc = NodeAlloc::default();
        let senders = alloc.batch(NodeKind::Sender, self.nr_pairs);
        let receivers = alloc.batch(NodeKind::Receiver, self.nr_pairs);
        let left = alloc.next(NodeKind::Switch);
        let right = alloc.next(NodeKind::Switch);

        let mut links = Vec::new();
        for i in 0..self.nr_pairs {
            links.push(self.access.link(senders[i], left));
            links.push(self.access.link(receivers[i], right));
        }
        links.push(self.bottleneck.link(left, right));

        Ok(Blueprint {
            nodes: alloc.nodes,
            links,
            senders: senders.clone(),
            receivers: receivers.clone(),
            tiers: vec![
                Tier::new("senders", senders),
                Tier::new("receivers", receivers),
                Tier::new("routers", vec![left, right]),
            ],
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TopoBuildError {
    #[error("fat-tree arity must be even and at least 2 (got {0})")]
    FatTreeArity(usize),

    #[error("{0} requires at least one {1}")]
    MissingTier(&'static str, &'static str),
}
