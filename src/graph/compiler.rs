use super::compiled_plan::{CompiledPlan, PlanStats, Route};
use super::executor::{Connection, NodeSlot};
use super::port::{resolve_port, PortDirection};
use std::collections::BTreeSet;

/// Compiles the graph into an update order plus per-node input routing.
pub struct GraphCompiler;

impl GraphCompiler {
    /// Compile a graph into an execution plan.
    ///
    /// Source nodes come first, then everything else in dependency order.
    /// Ties are broken by insertion order (node index), so the same graph
    /// always compiles to the same plan.
    ///
    /// # Arguments
    /// * `nodes` - All node slots, including deleted ones
    /// * `connections` - All live connections
    /// * `generation` - Generation counter for cache invalidation
    pub fn compile(nodes: &[NodeSlot], connections: &[Connection], generation: u64) -> CompiledPlan {
        let start_time = std::time::Instant::now();
        let n = nodes.len();

        let routes = Self::build_routes(nodes, connections);
        let order = Self::topological_sort(nodes, &routes);

        let unconnected_nodes: Vec<usize> = (0..n)
            .filter(|&i| !nodes[i].deleted)
            .filter(|&i| {
                (0..nodes[i].inputs.len())
                    .any(|input| !routes[i].iter().any(|r| r.to_input == input))
            })
            .collect();

        let live = || nodes.iter().filter(|slot| !slot.deleted);
        let stats = PlanStats {
            total_nodes: live().count(),
            scheduled_nodes: order.len(),
            source_nodes: live().filter(|slot| slot.inputs.is_empty()).count(),
            sink_nodes: live().filter(|slot| slot.outputs.is_empty()).count(),
            connections: routes.iter().map(Vec::len).sum(),
            compile_time_us: start_time.elapsed().as_micros() as u64,
        };

        CompiledPlan {
            order,
            routes,
            generation,
            stats,
            unconnected_nodes,
        }
    }

    /// Resolve each connection into (upstream output, downstream input) indices.
    fn build_routes(nodes: &[NodeSlot], connections: &[Connection]) -> Vec<Vec<Route>> {
        let n = nodes.len();
        let mut routes = vec![Vec::new(); n];

        for connection in connections {
            let from = connection.from.node().index();
            let to = connection.to.node().index();

            // Skip connections involving deleted nodes
            if from >= n || to >= n || nodes[from].deleted || nodes[to].deleted {
                continue;
            }

            let from_port = resolve_port(nodes[from].node.ports(), connection.from.port_index() as usize);
            let to_port = resolve_port(nodes[to].node.ports(), connection.to.port_index() as usize);
            if let (
                Some((PortDirection::Output, from_output)),
                Some((PortDirection::Input, to_input)),
            ) = (from_port, to_port)
            {
                routes[to].push(Route {
                    from_node: from,
                    from_output,
                    to_input,
                });
            }
        }

        routes
    }

    /// Kahn's algorithm with a sorted ready set.
    fn topological_sort(nodes: &[NodeSlot], routes: &[Vec<Route>]) -> Vec<usize> {
        let n = nodes.len();
        let mut adj = vec![Vec::new(); n];
        let mut in_degree = vec![0usize; n];

        for (to, incoming) in routes.iter().enumerate() {
            for route in incoming {
                adj[route.from_node].push(to);
                in_degree[to] += 1;
            }
        }

        // (is_not_source, index): sources sort ahead of everything else
        let key = |i: usize| (!nodes[i].inputs.is_empty(), i);
        let mut ready: BTreeSet<(bool, usize)> = (0..n)
            .filter(|&i| !nodes[i].deleted && in_degree[i] == 0)
            .map(key)
            .collect();
        let mut order = Vec::with_capacity(n);

        while let Some(entry) = ready.pop_first() {
            let node = entry.1;
            order.push(node);
            for &next in &adj[node] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.insert(key(next));
                }
            }
        }

        let live = nodes.iter().filter(|slot| !slot.deleted).count();
        if order.len() != live {
            tracing::warn!(
                "Dataflow graph has a cycle! Only {} of {} nodes scheduled.",
                order.len(),
                live
            );
        }

        order
    }
}
