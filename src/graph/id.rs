//! Identity types for the dataflow graph.
//!
//! All IDs are newtypes over `u32`. Node ids index directly into the graph's
//! slot vector and stay stable when other nodes are removed.

use std::fmt;

/// Index into `Graph::nodes`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const INVALID: NodeId = NodeId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "NodeId(INVALID)")
        } else {
            write!(f, "NodeId({})", self.0)
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Compact port identifier. High 20 bits = node index, low 12 bits = port index.
///
/// The port index counts over the node's full descriptor list, inputs and
/// outputs together, in declaration order.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortId(pub u32);

impl PortId {
    const PORT_BITS: u32 = 12;
    const PORT_MASK: u32 = (1 << Self::PORT_BITS) - 1;

    pub fn new(node: NodeId, port_index: u16) -> Self {
        debug_assert!(port_index < (1 << Self::PORT_BITS) as u16);
        Self((node.0 << Self::PORT_BITS) | (port_index as u32 & Self::PORT_MASK))
    }

    #[inline]
    pub fn node(self) -> NodeId {
        NodeId(self.0 >> Self::PORT_BITS)
    }

    #[inline]
    pub fn port_index(self) -> u16 {
        (self.0 & Self::PORT_MASK) as u16
    }
}

impl fmt::Debug for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PortId(node={}, port={})",
            self.node().0,
            self.port_index()
        )
    }
}

/// Stable identifier of a connection. Not an index: ids are never reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u32);

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}
