//! Tick-scheduled dataflow graph.
//!
//! Nodes own output channels in the graph's `ChannelStore`; connections copy
//! channel handles from output ports onto input ports every tick. Sources run
//! first, then every node runs after all nodes feeding it.
//!
//! # Architecture
//!
//! ```text
//! [FilePlayback] ──► [Smooth] ──► [Threshold] ──► [Feedback]
//! [SensorInput]  ──┘
//! ```
//!
//! # Design
//!
//! - **Trait objects**: the graph drives nodes only through `Node`.
//! - **Arena handles**: `ChannelId` and `NodeId` index owning collections.
//! - **Lazy plan**: topology edits mark the compiled plan dirty; it is rebuilt
//!   before the next tick.
//! - **Local failures**: node errors live in `NodeStatus` and never stop the tick.

pub mod attribute;
pub mod compiled_plan;
pub mod compiler;
pub mod error;
pub mod executor;
pub mod id;
pub mod node;
pub mod node_type;
pub mod nodes;
pub mod port;
pub mod provider;
pub mod status;

#[cfg(test)]
pub(crate) mod test_support;

pub use attribute::{AttributeSchema, AttributeValue, WidgetKind};
pub use compiled_plan::PlanStats;
pub use error::{GraphError, GraphResult};
pub use executor::{Connection, Graph};
pub use id::{ConnectionId, NodeId, PortId};
pub use node::{Node, NodeContext};
pub use node_type::{NodeFactory, NodeType};
pub use port::{Port, PortDescriptor, PortDirection};
pub use provider::{
    ChannelDataProvider, InMemoryProvider, JsonRecordingProvider, ProviderError, RecordedChannel,
};
pub use status::{ErrorCode, NodeStatus, WarningCode};
