//! Node type enumeration for dynamic node creation.
//!
//! Session files name nodes by type; `NodeFactory` turns those names into
//! live nodes.

use crate::graph::node::Node;
use crate::graph::nodes::{
    FeedbackNode, FilePlaybackNode, SensorInputNode, SignalGeneratorNode, SmoothNode,
    ThresholdNode,
};
use serde::{Deserialize, Serialize};

/// Types of nodes that can be instantiated dynamically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    // Generator nodes
    /// Loops over a stored recording at a fixed rate.
    FilePlayback,
    /// Synthesizes periodic test signals.
    SignalGenerator,
    /// Receives frames from a device thread.
    SensorInput,

    // Transform nodes
    /// Moving average.
    Smooth,
    /// Binary comparison against a threshold.
    Threshold,

    // Sink nodes
    /// Exposes the latest value to the state machine.
    Feedback,
}

impl NodeType {
    /// Get the display name for this node type.
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeType::FilePlayback => "File Playback",
            NodeType::SignalGenerator => "Signal Generator",
            NodeType::SensorInput => "Sensor Input",
            NodeType::Smooth => "Smooth",
            NodeType::Threshold => "Threshold",
            NodeType::Feedback => "Feedback",
        }
    }

    /// Get all available node types.
    pub fn all() -> &'static [NodeType] {
        &[
            NodeType::FilePlayback,
            NodeType::SignalGenerator,
            NodeType::SensorInput,
            NodeType::Smooth,
            NodeType::Threshold,
            NodeType::Feedback,
        ]
    }

    /// Check if this node type produces data without inputs.
    pub fn is_generator(&self) -> bool {
        matches!(
            self,
            NodeType::FilePlayback | NodeType::SignalGenerator | NodeType::SensorInput
        )
    }

    /// Check if this node type is a sink node.
    pub fn is_sink(&self) -> bool {
        matches!(self, NodeType::Feedback)
    }

    /// Get a detailed description of what this node does.
    pub fn description(&self) -> &'static str {
        match self {
            NodeType::FilePlayback =>
                "Plays back a stored recording.\n\
                 Loops over the data at the recorded or overridden rate.\n\
                 Load errors persist until the node is reset.",

            NodeType::SignalGenerator =>
                "Generates sine, square, sawtooth, triangle or constant signals.\n\
                 Sample-accurate regardless of host frame rate.",

            NodeType::SensorInput =>
                "Receives sample frames from a device or network thread.\n\
                 Frames are drained once per tick.",

            NodeType::Smooth =>
                "Moving average over a configurable window.\n\
                 One output channel per input channel.",

            NodeType::Threshold =>
                "Outputs 1 when a sample passes the comparison, else 0.\n\
                 One output channel per input channel.",

            NodeType::Feedback =>
                "Records the latest value of one input channel.\n\
                 State transitions read it through feedback conditions.",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Factory for creating nodes dynamically.
pub struct NodeFactory;

impl NodeFactory {
    /// Create a node with default attributes.
    pub fn create(node_type: NodeType) -> Box<dyn Node> {
        match node_type {
            NodeType::FilePlayback => Box::new(FilePlaybackNode::new()),
            NodeType::SignalGenerator => Box::new(SignalGeneratorNode::new()),
            NodeType::SensorInput => Box::new(SensorInputNode::new()),
            NodeType::Smooth => Box::new(SmoothNode::new()),
            NodeType::Threshold => Box::new(ThresholdNode::new()),
            NodeType::Feedback => Box::new(FeedbackNode::new()),
        }
    }
}
