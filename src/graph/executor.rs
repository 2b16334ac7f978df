//! Graph storage and the per-tick scheduler.
//!
//! Each `update`:
//! 1. Recompile the plan if the topology changed.
//! 2. For every node in plan order, refresh its inputs from upstream outputs.
//! 3. Run `reinit` and apply the start/reset edges of the ready flag.
//! 4. Call `update` on nodes that are initialized.

use crate::dsp::{ChannelStore, MultiChannel};
use crate::graph::attribute::AttributeValue;
use crate::graph::compiled_plan::{CompiledPlan, PlanStats, Route};
use crate::graph::compiler::GraphCompiler;
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::id::{ConnectionId, NodeId, PortId};
use crate::graph::node::{Node, NodeContext};
use crate::graph::port::{build_ports, resolve_port, Port, PortDirection};
use crate::graph::status::NodeStatus;
use crate::state_machine::FeedbackSource;
use std::time::Duration;
use uuid::Uuid;

/// A connection from an output port to an input port.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub from: PortId,
    pub to: PortId,
}

/// A slot holding a node and its runtime state.
pub struct NodeSlot {
    pub node: Box<dyn Node>,
    pub uuid: Uuid,
    pub name: String,
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
    pub status: NodeStatus,
    /// Result of the last ready check.
    pub initialized: bool,
    /// Reset before the next update.
    pub pending_reset: bool,
    /// Whether this node has been deleted (slot is empty).
    pub deleted: bool,
}

impl NodeSlot {
    pub fn new(name: String, node: Box<dyn Node>) -> Self {
        let (inputs, outputs) = build_ports(node.ports());
        Self {
            node,
            uuid: Uuid::new_v4(),
            name,
            inputs,
            outputs,
            status: NodeStatus::new(),
            initialized: false,
            pending_reset: false,
            deleted: false,
        }
    }

    fn context<'a>(
        &'a mut self,
        index: usize,
        channels: &'a mut ChannelStore,
        elapsed: Duration,
        delta: Duration,
    ) -> (&'a mut Box<dyn Node>, NodeContext<'a>) {
        let ctx = NodeContext {
            id: NodeId(index as u32),
            name: &self.name,
            elapsed,
            delta,
            channels,
            inputs: &self.inputs,
            outputs: &mut self.outputs,
            status: &mut self.status,
        };
        (&mut self.node, ctx)
    }

    /// Reset the node and destroy every channel it owns.
    fn reset(&mut self, index: usize, channels: &mut ChannelStore, elapsed: Duration) {
        {
            let (node, mut ctx) = self.context(index, channels, elapsed, Duration::ZERO);
            node.reset(&mut ctx);
        }
        channels.release_owner(index as u32);
        for output in &mut self.outputs {
            output.channels_mut().clear();
        }
        self.initialized = false;
        self.pending_reset = false;
    }
}

/// The dataflow graph and its scheduler.
pub struct Graph {
    nodes: Vec<NodeSlot>,
    connections: Vec<Connection>,
    next_connection_id: u32,
    channels: ChannelStore,
    /// Cached compiled execution plan
    compiled_plan: CompiledPlan,
    /// Generation counter for cache invalidation
    graph_generation: u64,
    /// Whether plan needs recompilation
    compiled_plan_dirty: bool,
    elapsed: Duration,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("node_count", &self.nodes.len())
            .field("connections", &self.connections)
            .field("graph_generation", &self.graph_generation)
            .field("elapsed", &self.elapsed)
            .finish_non_exhaustive()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            connections: Vec::new(),
            next_connection_id: 0,
            channels: ChannelStore::new(),
            compiled_plan: CompiledPlan::new(),
            graph_generation: 0,
            compiled_plan_dirty: true,
            elapsed: Duration::ZERO,
        }
    }

    // ── Graph building ──

    /// Add a node under a unique name and run its `init` hook.
    pub fn add_node(&mut self, name: impl Into<String>, node: Box<dyn Node>) -> GraphResult<NodeId> {
        let name = name.into();
        if self.find_node(&name).is_some() {
            return Err(GraphError::DuplicateNodeName(name));
        }

        let index = self.nodes.len();
        let id = NodeId(index as u32);
        let node_type = node.node_type();
        self.nodes.push(NodeSlot::new(name, node));

        let elapsed = self.elapsed;
        let slot = &mut self.nodes[index];
        let (node, mut ctx) = slot.context(index, &mut self.channels, elapsed, Duration::ZERO);
        node.init(&mut ctx);

        self.invalidate_compiled_plan();
        tracing::info!("Added node {:?} '{}' of type {}", id, self.nodes[index].name, node_type);
        Ok(id)
    }

    /// Remove a node together with its connections and channels.
    pub fn remove_node(&mut self, id: NodeId) -> GraphResult<()> {
        let index = self.live_index(id)?;
        let elapsed = self.elapsed;
        self.nodes[index].reset(index, &mut self.channels, elapsed);
        self.nodes[index].deleted = true;
        self.connections
            .retain(|c| c.from.node() != id && c.to.node() != id);
        self.invalidate_compiled_plan();
        tracing::info!("Removed node {:?}", id);
        Ok(())
    }

    /// Connect an output port to an input port.
    ///
    /// Rejected without changing the graph if the ports are invalid, the
    /// connection exists already, or it would close a cycle.
    pub fn add_connection(&mut self, from: PortId, to: PortId) -> GraphResult<ConnectionId> {
        let from_index = self.live_index(from.node())?;
        let to_index = self.live_index(to.node())?;
        self.expect_direction(from_index, from, PortDirection::Output)?;
        self.expect_direction(to_index, to, PortDirection::Input)?;

        if self.connections.iter().any(|c| c.from == from && c.to == to) {
            return Err(GraphError::DuplicateConnection(format!("{:?} -> {:?}", from, to)));
        }
        if from.node() == to.node() || self.would_create_cycle(from.node(), to.node()) {
            tracing::warn!("Rejected connection {:?} -> {:?}: cycle", from, to);
            return Err(GraphError::CycleDetected);
        }

        let id = ConnectionId(self.next_connection_id);
        self.next_connection_id += 1;
        self.connections.push(Connection { id, from, to });
        self.invalidate_compiled_plan();
        tracing::debug!("Added connection {:?}: {:?} -> {:?}", id, from, to);
        Ok(id)
    }

    /// Connect ports by node and port name.
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_port: &str,
        to_node: NodeId,
        to_port: &str,
    ) -> GraphResult<ConnectionId> {
        let from = self.port_id(from_node, from_port)?;
        let to = self.port_id(to_node, to_port)?;
        self.add_connection(from, to)
    }

    pub fn remove_connection(&mut self, id: ConnectionId) -> GraphResult<()> {
        let position = self
            .connections
            .iter()
            .position(|c| c.id == id)
            .ok_or(GraphError::InvalidConnection(id))?;
        self.connections.remove(position);
        self.invalidate_compiled_plan();
        tracing::debug!("Removed connection {:?}", id);
        Ok(())
    }

    /// Validate and apply an attribute value.
    pub fn set_attribute(&mut self, id: NodeId, key: &str, value: &AttributeValue) -> GraphResult<()> {
        let index = self.live_index(id)?;
        let slot = &mut self.nodes[index];

        let schema = slot
            .node
            .schema()
            .into_iter()
            .find(|entry| entry.key == key)
            .ok_or_else(|| GraphError::UnknownAttribute {
                node_type: slot.node.node_type().to_string(),
                key: key.to_string(),
            })?;
        let value = schema.validate(value)?;
        slot.node.apply_attribute(key, &value)?;

        if slot.node.on_attributes_changed() {
            slot.pending_reset = true;
        }
        tracing::debug!("Node '{}' attribute {} = {}", slot.name, key, value);
        Ok(())
    }

    pub fn attribute(&self, id: NodeId, key: &str) -> Option<AttributeValue> {
        self.slot(id).and_then(|slot| slot.node.attribute(key))
    }

    /// Reset a node at the start of the next update.
    pub fn reset_node_async(&mut self, id: NodeId) -> GraphResult<()> {
        let index = self.live_index(id)?;
        self.nodes[index].pending_reset = true;
        Ok(())
    }

    // ── Queries ──

    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|slot| !slot.deleted && slot.name == name)
            .map(|i| NodeId(i as u32))
    }

    /// Resolve a port by name.
    pub fn port_id(&self, node: NodeId, port: &str) -> GraphResult<PortId> {
        let index = self.live_index(node)?;
        self.nodes[index]
            .node
            .ports()
            .iter()
            .position(|d| d.name == port)
            .map(|p| PortId::new(node, p as u16))
            .ok_or_else(|| GraphError::InvalidPort {
                node,
                port: port.to_string(),
            })
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.deleted)
            .map(|(i, _)| NodeId(i as u32))
    }

    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        self.slot(id).map(|slot| slot.name.as_str())
    }

    pub fn node_uuid(&self, id: NodeId) -> Option<Uuid> {
        self.slot(id).map(|slot| slot.uuid)
    }

    pub fn node(&self, id: NodeId) -> Option<&dyn Node> {
        self.slot(id).map(|slot| slot.node.as_ref())
    }

    pub fn node_status(&self, id: NodeId) -> Option<&NodeStatus> {
        self.slot(id).map(|slot| &slot.status)
    }

    pub fn is_initialized(&self, id: NodeId) -> bool {
        self.slot(id).map(|slot| slot.initialized).unwrap_or(false)
    }

    /// Signal set on an output port, by name.
    pub fn output(&self, id: NodeId, port: &str) -> Option<&MultiChannel> {
        self.slot(id)?
            .outputs
            .iter()
            .find(|p| p.name() == port)
            .map(|p| p.channels())
    }

    /// Signal set on an input port, by name.
    pub fn input(&self, id: NodeId, port: &str) -> Option<&MultiChannel> {
        self.slot(id)?
            .inputs
            .iter()
            .find(|p| p.name() == port)
            .map(|p| p.channels())
    }

    pub fn channels(&self) -> &ChannelStore {
        &self.channels
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|slot| !slot.deleted).count()
    }

    /// Current update order, recompiling first if needed.
    pub fn execution_order(&mut self) -> Vec<NodeId> {
        self.recompile_if_needed();
        self.compiled_plan
            .order
            .iter()
            .map(|&i| NodeId(i as u32))
            .collect()
    }

    pub fn plan_stats(&mut self) -> &PlanStats {
        self.recompile_if_needed();
        &self.compiled_plan.stats
    }

    /// Nodes whose status changed since the last call.
    pub fn take_status_changes(&mut self) -> Vec<NodeId> {
        self.nodes
            .iter_mut()
            .enumerate()
            .filter(|(_, slot)| !slot.deleted)
            .filter_map(|(i, slot)| slot.status.take_changed().then_some(NodeId(i as u32)))
            .collect()
    }

    // ── Tick ──

    /// Advance every node to `elapsed`.
    pub fn update(&mut self, elapsed: Duration, delta: Duration) {
        self.recompile_if_needed();
        self.elapsed = elapsed;

        let plan = &self.compiled_plan;
        let nodes = self.nodes.as_mut_slice();
        let channels = &mut self.channels;

        for &index in &plan.order {
            tick_node(nodes, channels, plan.routes_into(index), index, elapsed, delta);
        }
    }

    /// Reset every node and drop all channels.
    pub fn reset(&mut self) {
        let elapsed = self.elapsed;
        for (index, slot) in self.nodes.iter_mut().enumerate() {
            if !slot.deleted {
                slot.reset(index, &mut self.channels, elapsed);
                slot.status.clear();
            }
            for input in &mut slot.inputs {
                input.channels_mut().clear();
            }
        }
        tracing::info!("Graph reset");
    }

    // ── Internals ──

    fn slot(&self, id: NodeId) -> Option<&NodeSlot> {
        self.nodes.get(id.index()).filter(|slot| !slot.deleted)
    }

    fn live_index(&self, id: NodeId) -> GraphResult<usize> {
        match self.nodes.get(id.index()) {
            Some(slot) if !slot.deleted => Ok(id.index()),
            _ => Err(GraphError::InvalidNode(id)),
        }
    }

    fn expect_direction(&self, index: usize, port: PortId, direction: PortDirection) -> GraphResult<()> {
        let descriptors = self.nodes[index].node.ports();
        match resolve_port(descriptors, port.port_index() as usize) {
            Some((actual, _)) if actual == direction => Ok(()),
            Some((actual, _)) => Err(GraphError::DirectionMismatch(format!(
                "{:?} is an {:?} port, expected {:?}",
                port, actual, direction
            ))),
            None => Err(GraphError::InvalidPort {
                node: port.node(),
                port: format!("#{}", port.port_index()),
            }),
        }
    }

    /// Invalidate the compiled execution plan (called when graph topology changes).
    fn invalidate_compiled_plan(&mut self) {
        self.compiled_plan_dirty = true;
        self.graph_generation += 1;
    }

    /// Recompile the execution plan if needed (lazy recompilation).
    fn recompile_if_needed(&mut self) {
        if !self.compiled_plan_dirty {
            return;
        }
        self.compiled_plan =
            GraphCompiler::compile(&self.nodes, &self.connections, self.graph_generation);
        self.compiled_plan_dirty = false;

        tracing::info!(
            "Graph recompiled: {} scheduled / {} total (gen {})",
            self.compiled_plan.stats.scheduled_nodes,
            self.compiled_plan.stats.total_nodes,
            self.compiled_plan.generation,
        );

        for &index in &self.compiled_plan.unconnected_nodes {
            tracing::debug!(
                "Node '{}' (idx {}) has unconnected inputs",
                self.nodes[index].name,
                index
            );
        }
    }

    /// Check if connecting `from` to `to` would create a cycle.
    fn would_create_cycle(&self, from: NodeId, to: NodeId) -> bool {
        // If `to` can reach `from` through existing connections, from->to closes a cycle.
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![to];

        while let Some(current) = stack.pop() {
            if current == from {
                return true;
            }
            let idx = current.index();
            if idx >= self.nodes.len() || visited[idx] {
                continue;
            }
            visited[idx] = true;

            for connection in &self.connections {
                if connection.from.node() == current {
                    stack.push(connection.to.node());
                }
            }
        }
        false
    }
}

/// One node's share of a tick.
fn tick_node(
    nodes: &mut [NodeSlot],
    channels: &mut ChannelStore,
    routes: &[Route],
    index: usize,
    elapsed: Duration,
    delta: Duration,
) {
    if nodes[index].pending_reset {
        tracing::debug!("Resetting node '{}'", nodes[index].name);
        nodes[index].reset(index, channels, elapsed);
    }

    // Gather upstream signal sets. Uninitialized upstream nodes contribute nothing.
    let mut gathered = vec![MultiChannel::new(); nodes[index].inputs.len()];
    let mut upstream_ready = true;
    for route in routes {
        let upstream = &nodes[route.from_node];
        if !upstream.initialized {
            upstream_ready = false;
            continue;
        }
        if let (Some(target), Some(output)) = (
            gathered.get_mut(route.to_input),
            upstream.outputs.get(route.from_output),
        ) {
            target.extend(output.channels());
        }
    }

    let slot = &mut nodes[index];
    for (input, channels_in) in slot.inputs.iter_mut().zip(gathered) {
        if *input.channels() != channels_in {
            *input.channels_mut() = channels_in;
        }
    }

    let ready = {
        let (node, mut ctx) = slot.context(index, channels, elapsed, delta);
        node.reinit(&mut ctx)
    } && upstream_ready
        && !slot.status.has_errors();

    match (slot.initialized, ready) {
        (false, true) => {
            let (node, mut ctx) = slot.context(index, channels, elapsed, delta);
            node.start(&mut ctx);
            slot.initialized = true;
            tracing::info!("Node '{}' started", slot.name);
        }
        (true, false) => {
            slot.reset(index, channels, elapsed);
            tracing::info!("Node '{}' stopped", slot.name);
        }
        _ => {}
    }

    if slot.initialized {
        let (node, mut ctx) = slot.context(index, channels, elapsed, delta);
        node.update(&mut ctx);
    }
}

impl FeedbackSource for Graph {
    fn feedback_value(&self, name: &str) -> Option<f64> {
        let slot = self.slot(self.find_node(name)?)?;
        if !slot.initialized {
            return None;
        }
        slot.node.feedback_value()
    }
}
