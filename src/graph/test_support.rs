//! Drives a single node through the graph lifecycle without building a graph.

use crate::dsp::{Channel, ChannelId, ChannelStore};
use crate::graph::id::NodeId;
use crate::graph::node::{Node, NodeContext};
use crate::graph::port::{build_ports, Port};
use crate::graph::status::NodeStatus;
use std::time::Duration;

const NODE: NodeId = NodeId(0);
const EXTERNAL_OWNER: u32 = 1_000;

pub struct NodeHarness {
    node: Box<dyn Node>,
    pub channels: ChannelStore,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
    status: NodeStatus,
    initialized: bool,
    elapsed: Duration,
    step: Duration,
    ticked: bool,
}

impl NodeHarness {
    pub fn new(node: Box<dyn Node>) -> Self {
        let (inputs, outputs) = build_ports(node.ports());
        let mut harness = Self {
            node,
            channels: ChannelStore::new(),
            inputs,
            outputs,
            status: NodeStatus::new(),
            initialized: false,
            elapsed: Duration::ZERO,
            step: Duration::from_millis(100),
            ticked: false,
        };
        harness.with_context(Duration::ZERO, |node, ctx| node.init(ctx));
        harness
    }

    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    pub fn node_mut(&mut self) -> &mut dyn Node {
        self.node.as_mut()
    }

    pub fn node(&self) -> &dyn Node {
        self.node.as_ref()
    }

    /// Attach an externally owned channel to input `port`.
    pub fn add_input_channel(&mut self, port: usize, channel: Channel<f64>) -> ChannelId {
        let id = self.channels.insert(EXTERNAL_OWNER, channel);
        self.inputs[port].channels_mut().add_channel(id);
        id
    }

    pub fn push(&mut self, id: ChannelId, values: &[f64]) {
        if let Some(channel) = self.channels.get_mut(id) {
            channel.begin_add_samples();
            channel.add_samples(values.iter().copied());
        }
    }

    /// Tick at 0 first, then one step later each call.
    pub fn tick(&mut self) {
        let elapsed = if self.ticked {
            self.elapsed + self.step
        } else {
            Duration::ZERO
        };
        self.tick_at(elapsed);
    }

    pub fn tick_at(&mut self, elapsed: Duration) {
        let delta = elapsed.saturating_sub(self.elapsed);
        self.elapsed = elapsed;
        self.ticked = true;

        let ready = self.with_context(delta, |node, ctx| node.reinit(ctx)) && !self.status.has_errors();
        match (self.initialized, ready) {
            (false, true) => {
                self.with_context(delta, |node, ctx| node.start(ctx));
                self.initialized = true;
            }
            (true, false) => self.reset(),
            _ => {}
        }
        if self.initialized {
            self.with_context(delta, |node, ctx| node.update(ctx));
        }
    }

    pub fn reset(&mut self) {
        self.with_context(Duration::ZERO, |node, ctx| node.reset(ctx));
        self.channels.release_owner(NODE.0);
        for output in &mut self.outputs {
            output.channels_mut().clear();
        }
        self.initialized = false;
    }

    pub fn initialized(&self) -> bool {
        self.initialized
    }

    pub fn status(&self) -> &NodeStatus {
        &self.status
    }

    pub fn output_len(&self, port: usize) -> usize {
        self.outputs[port].channels().len()
    }

    pub fn output_channel(&self, port: usize, index: usize) -> Option<&Channel<f64>> {
        let id = self.outputs[port].channels().get(index)?;
        self.channels.get(id)
    }

    pub fn output_samples(&self, port: usize, index: usize) -> Vec<f64> {
        self.output_channel(port, index)
            .map(|c| c.samples().to_vec())
            .unwrap_or_default()
    }

    fn with_context<R>(
        &mut self,
        delta: Duration,
        f: impl FnOnce(&mut Box<dyn Node>, &mut NodeContext) -> R,
    ) -> R {
        let mut ctx = NodeContext {
            id: NODE,
            name: "node",
            elapsed: self.elapsed,
            delta,
            channels: &mut self.channels,
            inputs: &self.inputs,
            outputs: &mut self.outputs,
            status: &mut self.status,
        };
        f(&mut self.node, &mut ctx)
    }
}
