use crate::units::{BitsPerSec, Nanosecs, Packets};

/// A topology endpoint or forwarding element.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
}

impl Node {
    pub fn new_host(id: NodeId) -> Self {
        Self {
            id,
            kind: NodeKind::Host,
        }
    }

    pub fn new_sender(id: NodeId) -> Self {
        Self {
            id,
            kind: NodeKind::Sender,
        }
    }

    pub fn new_receiver(id: NodeId) -> Self {
        Self {
            id,
            kind: NodeKind::Receiver,
        }
    }

    pub fn new_switch(id: NodeId) -> Self {
        Self {
            id,
            kind: NodeKind::Switch,
        }
    }
}

/// Node roles. `Sender` and `Receiver` are designated experiment endpoints;
/// `Host` is an undesignated leaf; `Switch` covers routers and switches.
/// Only switches forward traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum NodeKind {
    Host,
    Sender,
    Receiver,
    Switch,
}

impl NodeKind {
    /// Whether this node terminates traffic rather than forwarding it.
    pub fn is_host(&self) -> bool {
        !matches!(self, NodeKind::Switch)
    }
}

identifier!(NodeId, usize);
identifier!(LinkId, usize);

/// A bidirectional point-to-point link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Link {
    pub a: NodeId,
    pub b: NodeId,
    pub bandwidth: BitsPerSec,
    pub delay: Nanosecs,
    /// Bounded buffer, in packets. `None` leaves the buffer to the runtime's
    /// default.
    pub queue: Option<Packets>,
}

impl Link {
    pub fn new(
        a: NodeId,
        b: NodeId,
        bandwidth: impl Into<BitsPerSec>,
        delay: impl Into<Nanosecs>,
    ) -> Self {
        Self {
            a,
            b,
            bandwidth: bandwidth.into(),
            delay: delay.into(),
            queue: None,
        }
    }

    pub fn with_queue(mut self, queue: Packets) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn connects(&self, x: NodeId, y: NodeId) -> bool {
        self.a == x && self.b == y || self.a == y && self.b == x
    }
}

/// One direction of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Channel {
    pub(crate) src: NodeId,
    pub(crate) dst: NodeId,
    pub(crate) bandwidth: BitsPerSec,
    pub(crate) delay: Nanosecs,
}

impl Channel {
    pub(crate) fn new_from(link: &Link, src: NodeId, dst: NodeId) -> Self {
        Self {
            src,
            dst,
            bandwidth: link.bandwidth,
            delay: link.delay,
        }
    }

    pub fn src(&self) -> NodeId {
        self.src
    }

    pub fn dst(&self) -> NodeId {
        self.dst
    }

    pub fn bandwidth(&self) -> BitsPerSec {
        self.bandwidth
    }

    pub fn delay(&self) -> Nanosecs {
        self.delay
    }
}

/// A hop-by-hop path through the topology.
#[derive(Debug)]
pub struct Path {
    inner: Vec<Channel>,
}

impl Path {
    pub(crate) fn new(channels: Vec<Channel>) -> Self {
        Self { inner: channels }
    }

    /// End-to-end propagation delay.
    pub fn delay(&self) -> Nanosecs {
        self.inner.iter().map(|c| c.delay()).sum()
    }

    /// The smallest bandwidth along the path, if the path is non-empty.
    pub fn bottleneck(&self) -> Option<BitsPerSec> {
        self.inner.iter().map(|c| c.bandwidth()).min()
    }

    pub fn hops(&self) -> impl Iterator<Item = &Channel> + '_ {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
