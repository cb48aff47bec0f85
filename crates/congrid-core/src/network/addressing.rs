use std::collections::HashMap;
use std::net::Ipv4Addr;

use crate::network::types::{Link, LinkId, NodeId};

/// Prefix length of every per-link subnet.
pub const PREFIX_LEN: u8 = 24;

const BASE_NET: u32 = 0x0a00_0000; // 10.0.0.0
const SUBNET_STEP: u32 = 1 << 8;

/// Deterministic per-link address assignment. Each link is allocated a fresh
/// `/24` subnet from `10.0.0.0/8` in link-declaration order; endpoint `a`
/// takes host octet `.1` and endpoint `b` takes `.2`. No two links share a
/// subnet, and the same nodes and links always produce the same plan.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AddressPlan {
    links: Vec<LinkAddr>,
    primary: HashMap<NodeId, Ipv4Addr>,
}

/// The addresses assigned to one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct LinkAddr {
    /// The subnet's network address.
    pub subnet: Ipv4Addr,
    /// Address of the link's `a` endpoint.
    pub a: Ipv4Addr,
    /// Address of the link's `b` endpoint.
    pub b: Ipv4Addr,
}

impl AddressPlan {
    pub(crate) fn new(links: &[Link]) -> Self {
        let mut plan = Vec::with_capacity(links.len());
        let mut primary = HashMap::new();
        for (i, link) in links.iter().enumerate() {
            let net = BASE_NET + (i as u32 + 1) * SUBNET_STEP;
            let addr = LinkAddr {
                subnet: Ipv4Addr::from(net),
                a: Ipv4Addr::from(net + 1),
                b: Ipv4Addr::from(net + 2),
            };
            // A node's primary address is its address on its first link.
            primary.entry(link.a).or_insert(addr.a);
            primary.entry(link.b).or_insert(addr.b);
            plan.push(addr);
        }
        Self {
            links: plan,
            primary,
        }
    }

    /// The addresses of the given link.
    pub fn link(&self, id: LinkId) -> Option<&LinkAddr> {
        self.links.get(id.inner())
    }

    /// The node's primary address, if it has any link.
    pub fn primary(&self, node: NodeId) -> Option<Ipv4Addr> {
        self.primary.get(&node).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LinkAddr> + '_ {
        self.links.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn subnets_are_injective() {
        let (_, links) = crate::testing::diamond_config();
        let plan = AddressPlan::new(&links);
        let subnets = plan.iter().map(|l| l.subnet).collect::<HashSet<_>>();
        assert_eq!(subnets.len(), links.len());
    }

    #[test]
    fn plan_is_deterministic() {
        let (_, links) = crate::testing::diamond_config();
        let p1 = AddressPlan::new(&links);
        let p2 = AddressPlan::new(&links);
        assert!(p1.iter().eq(p2.iter()));
    }

    #[test]
    fn star_plan_matches_snapshot() {
        let (_, links) = crate::testing::star_config();
        let plan = AddressPlan::new(&links);
        let rendered = plan
            .iter()
            .map(|l| format!("{}/{} a={} b={}", l.subnet, PREFIX_LEN, l.a, l.b))
            .collect::<Vec<_>>()
            .join("\n");
        insta::assert_snapshot!(rendered, @r###"
        10.0.1.0/24 a=10.0.1.1 b=10.0.1.2
        10.0.2.0/24 a=10.0.2.1 b=10.0.2.2
        10.0.3.0/24 a=10.0.3.1 b=10.0.3.2
        10.0.4.0/24 a=10.0.4.1 b=10.0.4.2
        "###);
    }

    #[test]
    fn primary_address_is_first_interface() {
        let (_, links) = crate::testing::star_config();
        let plan = AddressPlan::new(&links);
        // Hub 2 appears first as endpoint `b` of link 0.
        assert_eq!(
            plan.primary(NodeId::new(2)),
            Some(Ipv4Addr::new(10, 0, 1, 2))
        );
        // Receiver 4 only appears as endpoint `b` of link 3.
        assert_eq!(
            plan.primary(NodeId::new(4)),
            Some(Ipv4Addr::new(10, 0, 4, 2))
        );
    }
}
