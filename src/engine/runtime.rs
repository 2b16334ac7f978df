use crate::error::Result;
use crate::graph::{AttributeValue, Graph, GraphError};
use crate::state_machine::{FeedbackSource, StateEvent, StateMachine};
use std::time::Duration;

/// Explicit engine context: one dataflow graph and one state machine.
///
/// Everything is single threaded and driven by `update`. The caller owns the
/// clock, so tests advance time with explicit `elapsed`/`delta` values.
#[derive(Default)]
pub struct Engine {
    graph: Graph,
    state_machine: StateMachine,
    running: bool,
    elapsed: Duration,
    ticks: u64,
}

impl Engine {
    pub fn new(graph: Graph, state_machine: StateMachine) -> Self {
        Self {
            graph,
            state_machine,
            running: false,
            elapsed: Duration::ZERO,
            ticks: 0,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn state_machine(&self) -> &StateMachine {
        &self.state_machine
    }

    pub fn state_machine_mut(&mut self) -> &mut StateMachine {
        &mut self.state_machine
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Start a session at `elapsed`.
    ///
    /// The graph restarts from scratch; the state machine is started only
    /// when it has states, so a graph-only session is valid.
    pub fn start(&mut self, elapsed: Duration) -> Result<()> {
        if self.running {
            return Ok(());
        }
        self.graph.reset();
        if !self.state_machine.states().is_empty() {
            self.state_machine.start(elapsed)?;
        }
        self.elapsed = elapsed;
        self.ticks = 0;
        self.running = true;
        tracing::info!("Engine started");
        Ok(())
    }

    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.state_machine.stop();
        tracing::info!("Engine stopped after {} ticks", self.ticks);
    }

    /// Stop and return every node and state to its initial condition.
    pub fn reset(&mut self) {
        self.running = false;
        self.state_machine.reset();
        self.graph.reset();
        self.elapsed = Duration::ZERO;
        self.ticks = 0;
    }

    /// One engine tick: the graph first, then the state machine so feedback
    /// conditions see this tick's signal values.
    pub fn update(&mut self, elapsed: Duration, delta: Duration) {
        if !self.running {
            return;
        }
        self.elapsed = elapsed;
        self.graph.update(elapsed, delta);
        if self.state_machine.is_running() {
            self.state_machine.update(elapsed, delta, &self.graph);
        }
        self.ticks += 1;
        tracing::trace!("Engine tick {} at {:?}", self.ticks, elapsed);
    }

    /// Queue an external event for the next state machine tick.
    pub fn post_event(&mut self, name: impl Into<String>) -> Result<()> {
        self.state_machine.post_event(name)?;
        Ok(())
    }

    /// Set a node attribute by node name.
    pub fn set_attribute(&mut self, node: &str, key: &str, value: &AttributeValue) -> Result<()> {
        let id = self
            .graph
            .find_node(node)
            .ok_or_else(|| GraphError::UnknownNode(node.to_string()))?;
        self.graph.set_attribute(id, key, value)?;
        Ok(())
    }

    pub fn feedback_value(&self, name: &str) -> Option<f64> {
        self.graph.feedback_value(name)
    }

    pub fn take_state_events(&mut self) -> Vec<StateEvent> {
        self.state_machine.take_events()
    }

    /// Exit status once an exit state has been reached.
    pub fn exit_status(&self) -> Option<u32> {
        self.state_machine.exit_status()
    }

    /// Names of the currently active states.
    pub fn active_state_names(&self) -> Vec<String> {
        self.state_machine
            .active_states()
            .into_iter()
            .filter_map(|id| self.state_machine.state(id))
            .map(|state| state.name().to_string())
            .collect()
    }
}


impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("graph", &self.graph)
            .field("state_machine", &self.state_machine)
            .field("running", &self.running)
            .field("elapsed", &self.elapsed)
            .field("ticks", &self.ticks)
            .finish()
    }
}
