use std::net::Ipv4Addr;

use crate::cc::CcHandle;
use crate::network::{Link, Node, NodeId};
use crate::plan::OnOffPattern;
use crate::runtime::{LinkHandle, NodeHandle, SimRuntime};
use crate::stats::{FiveTuple, FlowCounters, FlowRecord, Protocol};
use crate::units::{BitsPerSec, Bytes, Mbps, Millisecs, Nanosecs, Packets};

/// Two senders (0, 1) into hub 2, hub 3 out to receiver 4. 10 Mbps, 10 ms.
pub(crate) fn star_config() -> (Vec<Node>, Vec<Link>) {
    let nodes = vec![
        Node::new_sender(NodeId::new(0)),
        Node::new_sender(NodeId::new(1)),
        Node::new_switch(NodeId::new(2)),
        Node::new_switch(NodeId::new(3)),
        Node::new_receiver(NodeId::new(4)),
    ];
    let link = |a: usize, b: usize| {
        Link::new(
            NodeId::new(a),
            NodeId::new(b),
            Mbps::new(10),
            Millisecs::new(10),
        )
    };
    let links = vec![link(0, 2), link(1, 2), link(2, 3), link(3, 4)];
    (nodes, links)
}

/// Senders 0-1, hub 2, three parallel mids 3-5, hub 6, receivers 7-8.
pub(crate) fn diamond_config() -> (Vec<Node>, Vec<Link>) {
    let nodes = vec![
        Node::new_sender(NodeId::new(0)),
        Node::new_sender(NodeId::new(1)),
        Node::new_switch(NodeId::new(2)),
        Node::new_switch(NodeId::new(3)),
        Node::new_switch(NodeId::new(4)),
        Node::new_switch(NodeId::new(5)),
        Node::new_switch(NodeId::new(6)),
        Node::new_receiver(NodeId::new(7)),
        Node::new_receiver(NodeId::new(8)),
    ];
    let link = |a: usize, b: usize| {
        Link::new(
            NodeId::new(a),
            NodeId::new(b),
            Mbps::new(10),
            Millisecs::new(10),
        )
    };
    let links = vec![
        link(0, 2),
        link(1, 2),
        link(2, 3),
        link(2, 4),
        link(2, 5),
        link(3, 6),
        link(4, 6),
        link(5, 6),
        link(6, 7),
        link(6, 8),
    ];
    (nodes, links)
}

/// Four sender/receiver pairs around a 10 Mbps bottleneck. Senders 0-3,
/// receivers 4-7, routers 8-9.
pub(crate) fn dumbbell_config() -> (Vec<Node>, Vec<Link>) {
    let mut nodes = Vec::new();
    for i in 0..4 {
        nodes.push(Node::new_sender(NodeId::new(i)));
    }
    for i in 4..8 {
        nodes.push(Node::new_receiver(NodeId::new(i)));
    }
    nodes.push(Node::new_switch(NodeId::new(8)));
    nodes.push(Node::new_switch(NodeId::new(9)));
    let access = |a: usize, b: usize| {
        Link::new(
            NodeId::new(a),
            NodeId::new(b),
            Mbps::new(100),
            Millisecs::new(2),
        )
    };
    let mut links = Vec::new();
    for i in 0..4 {
        links.push(access(i, 8));
        links.push(access(i + 4, 9));
    }
    links.push(Link::new(
        NodeId::new(8),
        NodeId::new(9),
        Mbps::new(10),
        Millisecs::new(10),
    ));
    (nodes, links)
}

/// A runtime call, as observed by [`StubRuntime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Op {
    CreateNodes(usize),
    CreateLink { a: NodeHandle, b: NodeHandle },
    AssignAddresses { subnet: Ipv4Addr },
    ComputeRouting,
    InstallBulk { node: NodeHandle, dst_port: u16, cc: &'static str },
    InstallOnOff { node: NodeHandle, dst_port: u16 },
    InstallSink { node: NodeHandle, port: u16 },
    Advance(Nanosecs),
    Teardown,
}

/// A scripted runtime: records every call and hands back canned records.
#[derive(Debug, Default)]
pub(crate) struct StubRuntime {
    ops: Vec<Op>,
    records: Vec<FlowRecord>,
    next_node: usize,
    next_link: usize,
}

impl StubRuntime {
    pub(crate) fn ops(&self) -> &[Op] {
        &self.ops
    }

    fn tuple(protocol: Protocol, dst_port: u16) -> FiveTuple {
        FiveTuple {
            src_addr: Ipv4Addr::new(10, 0, 1, 1),
            dst_addr: Ipv4Addr::new(10, 0, 4, 2),
            protocol,
            src_port: 49152,
            dst_port,
        }
    }

    /// One healthy measured record (49 MB over the window) plus background
    /// noise that the aggregator must filter out.
    pub(crate) fn with_synthetic_records() -> Self {
        let records = vec![
            FlowRecord {
                tuple: Self::tuple(Protocol::Tcp, 8080),
                counters: FlowCounters {
                    tx_bytes: Bytes::new(49_000_000),
                    rx_bytes: Bytes::new(49_000_000),
                    tx_packets: 49_000,
                    rx_packets: 49_000,
                    lost_packets: 0,
                    delay_sum: Nanosecs::new(49_000 * 40_000_000),
                },
            },
            FlowRecord {
                tuple: Self::tuple(Protocol::Udp, 9000),
                counters: FlowCounters {
                    tx_bytes: Bytes::new(1_000_000),
                    rx_bytes: Bytes::new(900_000),
                    tx_packets: 1_000,
                    rx_packets: 900,
                    lost_packets: 100,
                    delay_sum: Nanosecs::new(900 * 40_000_000),
                },
            },
        ];
        Self {
            records,
            ..Default::default()
        }
    }

    /// A measured record with all-zero counters, to exercise the sentinels.
    pub(crate) fn with_degenerate_records() -> Self {
        let records = vec![FlowRecord {
            tuple: Self::tuple(Protocol::Tcp, 8080),
            counters: FlowCounters::default(),
        }];
        Self {
            records,
            ..Default::default()
        }
    }
}

impl SimRuntime for StubRuntime {
    fn create_nodes(&mut self, count: usize) -> Vec<NodeHandle> {
        self.ops.push(Op::CreateNodes(count));
        let handles = (self.next_node..self.next_node + count)
            .map(NodeHandle::new)
            .collect();
        self.next_node += count;
        handles
    }

    fn create_link(
        &mut self,
        a: NodeHandle,
        b: NodeHandle,
        _bandwidth: BitsPerSec,
        _delay: Nanosecs,
        _queue: Option<Packets>,
    ) -> LinkHandle {
        self.ops.push(Op::CreateLink { a, b });
        let handle = LinkHandle::new(self.next_link);
        self.next_link += 1;
        handle
    }

    fn assign_addresses(
        &mut self,
        _link: LinkHandle,
        subnet: Ipv4Addr,
        _prefix_len: u8,
    ) -> [Ipv4Addr; 2] {
        self.ops.push(Op::AssignAddresses { subnet });
        let base = u32::from(subnet);
        [Ipv4Addr::from(base + 1), Ipv4Addr::from(base + 2)]
    }

    fn compute_routing(&mut self) {
        self.ops.push(Op::ComputeRouting);
    }

    fn install_bulk_source(
        &mut self,
        node: NodeHandle,
        _dst_addr: Ipv4Addr,
        dst_port: u16,
        _max_bytes: Option<Bytes>,
        cc: CcHandle,
        _start: Nanosecs,
        _stop: Nanosecs,
    ) {
        self.ops.push(Op::InstallBulk {
            node,
            dst_port,
            cc: cc.as_str(),
        });
    }

    fn install_on_off_source(
        &mut self,
        node: NodeHandle,
        _dst_addr: Ipv4Addr,
        dst_port: u16,
        _rate: BitsPerSec,
        _packet_size: Bytes,
        _on: OnOffPattern,
        _off: OnOffPattern,
        _start: Nanosecs,
        _stop: Nanosecs,
    ) {
        self.ops.push(Op::InstallOnOff { node, dst_port });
    }

    fn install_sink(&mut self, node: NodeHandle, port: u16, _protocol: Protocol, _start: Nanosecs) {
        self.ops.push(Op::InstallSink { node, port });
    }

    fn advance(&mut self, stop: Nanosecs) {
        self.ops.push(Op::Advance(stop));
    }

    fn flow_records(&self) -> Vec<FlowRecord> {
        self.records.clone()
    }

    fn teardown(&mut self) {
        self.ops.push(Op::Teardown);
        self.records.clear();
    }
}
