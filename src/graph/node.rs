//! Node abstraction for the dataflow graph.
//!
//! Every node kind implements `Node`. The graph only talks to nodes through
//! this trait and never inspects concrete types.
//!
//! Lifecycle, driven by the graph:
//!
//! ```text
//! Created ─► init ─► ( reinit ─► start ─► update* ─► reset )* ─► dropped
//! ```
//!
//! `reinit` runs every tick. The graph calls `start` when a node becomes
//! ready and `reset` when it stops being ready, so `update` only ever sees a
//! fully initialized node.

use crate::dsp::{Channel, ChannelId, ChannelStore, MultiChannel, SampleFeed};
use crate::graph::attribute::{AttributeSchema, AttributeValue};
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::id::NodeId;
use crate::graph::node_type::NodeType;
use crate::graph::port::{Port, PortDescriptor};
use crate::graph::status::{ErrorCode, NodeStatus, WarningCode};
use std::time::Duration;

/// Context passed to node lifecycle hooks.
pub struct NodeContext<'a> {
    pub id: NodeId,
    /// Instance name, unique within the graph.
    pub name: &'a str,
    /// Session time of the current tick.
    pub elapsed: Duration,
    /// Time since the previous tick.
    pub delta: Duration,
    pub channels: &'a mut ChannelStore,
    pub inputs: &'a [Port],
    pub outputs: &'a mut [Port],
    pub status: &'a mut NodeStatus,
}

impl<'a> NodeContext<'a> {
    /// Signal set currently connected to input `port`.
    pub fn input(&self, port: usize) -> Option<&MultiChannel> {
        self.inputs.get(port).map(|p| p.channels())
    }

    /// Allocate a channel owned by this node and publish it on output `port`.
    pub fn create_output_channel(
        &mut self,
        port: usize,
        mut channel: Channel<f64>,
    ) -> Option<ChannelId> {
        let output = self.outputs.get_mut(port)?;
        channel.set_source_name(format!("{}.{}", self.name, output.name()));
        let id = self.channels.insert(self.id.0, channel);
        output.channels_mut().add_channel(id);
        Some(id)
    }

    pub fn set_error(&mut self, code: ErrorCode, message: impl Into<String>) {
        let message = message.into();
        if self.status.set_error(code, message.clone()) {
            tracing::warn!("Node '{}' error {:?}: {}", self.name, code, message);
        }
    }

    pub fn clear_error(&mut self, code: ErrorCode) {
        if self.status.clear_error(code) {
            tracing::debug!("Node '{}' cleared error {:?}", self.name, code);
        }
    }

    pub fn set_warning(&mut self, code: WarningCode, message: impl Into<String>) {
        let message = message.into();
        if self.status.set_warning(code, message.clone()) {
            tracing::warn!("Node '{}' warning {:?}: {}", self.name, code, message);
        }
    }

    pub fn clear_warning(&mut self, code: WarningCode) {
        if self.status.clear_warning(code) {
            tracing::debug!("Node '{}' cleared warning {:?}", self.name, code);
        }
    }

    /// Raise or clear a warning depending on `condition`.
    pub fn toggle_warning(&mut self, code: WarningCode, condition: bool, message: &str) {
        if condition {
            self.set_warning(code, message);
        } else {
            self.clear_warning(code);
        }
    }
}

/// Capability interface implemented by every node kind.
pub trait Node: Send {
    fn node_type(&self) -> NodeType;

    /// Port descriptors for this node.
    fn ports(&self) -> &'static [PortDescriptor];

    /// Attribute table for editors and persistence.
    fn schema(&self) -> Vec<AttributeSchema> {
        Vec::new()
    }

    /// Store an already validated attribute value in the node's typed config.
    fn apply_attribute(&mut self, key: &str, _value: &AttributeValue) -> GraphResult<()> {
        Err(GraphError::UnknownAttribute {
            node_type: self.node_type().to_string(),
            key: key.to_string(),
        })
    }

    /// Current value of an attribute.
    fn attribute(&self, _key: &str) -> Option<AttributeValue> {
        None
    }

    /// Called after attributes were changed externally.
    ///
    /// Return true to have the graph reset this node before its next update.
    fn on_attributes_changed(&mut self) -> bool {
        false
    }

    /// Called once when the node is added to a graph.
    fn init(&mut self, _ctx: &mut NodeContext) {}

    /// Drop runtime state, keeping configuration. The graph releases the
    /// node's channels afterwards.
    fn reset(&mut self, _ctx: &mut NodeContext) {}

    /// Revalidate configuration-dependent state. Returns whether the node can run.
    fn reinit(&mut self, _ctx: &mut NodeContext) -> bool {
        true
    }

    /// Prepare output channels once inputs are known to be valid.
    fn start(&mut self, _ctx: &mut NodeContext) {}

    /// Advance to `ctx.elapsed`.
    fn update(&mut self, ctx: &mut NodeContext);

    /// Latest value this node exposes to state machine conditions.
    fn feedback_value(&self) -> Option<f64> {
        None
    }

    /// Producer handle for nodes fed from another thread.
    fn sample_feed(&self) -> Option<SampleFeed> {
        None
    }
}
