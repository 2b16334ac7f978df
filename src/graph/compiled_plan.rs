/// Where an input port gets its channels from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Upstream node index.
    pub from_node: usize,
    /// Index among the upstream node's output ports.
    pub from_output: usize,
    /// Index among this node's input ports.
    pub to_input: usize,
}

/// Compiled execution plan for a graph.
#[derive(Debug, Clone)]
pub struct CompiledPlan {
    /// Live node indices in update order.
    pub order: Vec<usize>,

    /// Incoming routes, indexed by node index.
    pub routes: Vec<Vec<Route>>,

    /// Cache invalidation generation number
    pub generation: u64,

    /// Compilation statistics
    pub stats: PlanStats,

    /// Nodes with at least one input port that nothing feeds
    pub unconnected_nodes: Vec<usize>,
}

/// Statistics about the compiled plan
#[derive(Debug, Clone, Default)]
pub struct PlanStats {
    /// Number of live nodes
    pub total_nodes: usize,

    /// Number of nodes in the update order
    pub scheduled_nodes: usize,

    /// Number of source nodes (no input ports)
    pub source_nodes: usize,

    /// Number of sink nodes (no output ports)
    pub sink_nodes: usize,

    /// Number of live connections
    pub connections: usize,

    /// Compilation time in microseconds
    pub compile_time_us: u64,
}

impl CompiledPlan {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            routes: Vec::new(),
            generation: 0,
            stats: PlanStats::default(),
            unconnected_nodes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Incoming routes of node `index`.
    pub fn routes_into(&self, index: usize) -> &[Route] {
        self.routes.get(index).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for CompiledPlan {
    fn default() -> Self {
        Self::new()
    }
}
