//! The validated network model: topology, routing, and addressing.

mod addressing;
mod routing;
pub(crate) mod topology;
pub mod types;

use std::net::Ipv4Addr;

pub use addressing::{AddressPlan, LinkAddr, PREFIX_LEN};
pub use topology::TopologyError;
pub use types::*;

use self::{routing::Routes, topology::Topology};

/// A validated topology with computed routes and an address plan. Lives for
/// exactly one run and is discarded afterward.
#[derive(Debug, Clone)]
pub struct Network {
    topology: Topology,
    routes: Routes,
    addrs: AddressPlan,
    links: Vec<Link>,
}

impl Network {
    /// Builds and validates a network.
    ///
    /// In addition to the structural checks in [`Topology`], every pair of
    /// non-switch nodes must be mutually reachable once routes are computed;
    /// a pair without a route is a fatal construction error.
    pub fn new(nodes: &[Node], links: &[Link]) -> Result<Self, TopologyError> {
        let topology = Topology::new(nodes, links)?;
        let routes = Routes::new(&topology);
        let hosts = nodes
            .iter()
            .filter(|n| n.kind.is_host())
            .map(|n| n.id)
            .collect::<Vec<_>>();
        for &src in &hosts {
            for &dst in &hosts {
                if src != dst && routes.next_hops(src, dst).is_none() {
                    return Err(TopologyError::Unreachable { src, dst });
                }
            }
        }
        let addrs = AddressPlan::new(links);
        Ok(Self {
            topology,
            routes,
            addrs,
            links: links.to_vec(),
        })
    }

    /// The node's primary address (its address on its first link).
    pub fn addr_of(&self, node: NodeId) -> Option<Ipv4Addr> {
        self.addrs.primary(node)
    }

    /// Get a reference to the network's address plan.
    pub fn addrs(&self) -> &AddressPlan {
        &self.addrs
    }

    /// The hop-by-hop path from `src` to `dst`, always taking the first
    /// next-hop choice. Deterministic; empty if there is no route.
    pub fn path(&self, src: NodeId, dst: NodeId) -> Path {
        let mut channels = Vec::new();
        let mut cur = src;
        while cur != dst {
            let next = match self.routes.next_hops(cur, dst).and_then(|c| c.first()) {
                Some(&next) => next,
                None => return Path::new(Vec::new()),
            };
            // These indices all exist because routes only mention topology nodes
            let i = *self.topology.idx_of(&cur).unwrap();
            let j = *self.topology.idx_of(&next).unwrap();
            let e = self.topology.graph.find_edge(i, j).unwrap();
            channels.push(self.topology.graph[e]);
            cur = next;
        }
        Path::new(channels)
    }

    delegate::delegate! {
        to self.topology.graph {
            #[call(node_weights)]
            pub fn nodes(&self) -> impl Iterator<Item = &Node>;

            #[call(node_count)]
            pub fn nr_nodes(&self) -> usize;
        }

        to self.links {
            #[call(iter)]
            pub fn links(&self) -> impl Iterator<Item = &Link>;

            #[call(len)]
            pub fn nr_links(&self) -> usize;
        }
    }
}
