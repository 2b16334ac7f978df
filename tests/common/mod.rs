//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use neurograph::{Engine, Graph};
use std::time::Duration;

/// Default engine step used by integration tests (10 Hz host loop)
pub const STEP: Duration = Duration::from_millis(100);

/// Advance a graph by `ticks` steps of `step`, starting after `start`.
///
/// Returns the elapsed time of the last update.
pub fn run_graph(graph: &mut Graph, start: Duration, ticks: u32, step: Duration) -> Duration {
    let mut elapsed = start;
    for _ in 0..ticks {
        elapsed += step;
        graph.update(elapsed, step);
    }
    elapsed
}

/// Advance a started engine by `ticks` steps of `step`.
pub fn run_engine(engine: &mut Engine, ticks: u32, step: Duration) {
    for _ in 0..ticks {
        let elapsed = engine.elapsed() + step;
        engine.update(elapsed, step);
    }
}

/// Samples of channel `index` on a node's output port.
pub fn output_samples(graph: &Graph, node: &str, port: &str, index: usize) -> Vec<f64> {
    let id = graph.find_node(node).expect("node exists");
    let output = graph.output(id, port).expect("port exists");
    let channel = output.get(index).expect("channel exists");
    graph
        .channels()
        .get(channel)
        .map(|c| c.samples().to_vec())
        .unwrap_or_default()
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}
