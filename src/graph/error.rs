//! Edit-time errors of the dataflow graph.
//!
//! Tick-time failures never surface here: nodes record them in their
//! `NodeStatus` and the scheduler keeps going.

use crate::graph::id::{ConnectionId, NodeId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Invalid node: {0:?}")]
    InvalidNode(NodeId),

    #[error("Unknown node '{0}'")]
    UnknownNode(String),

    #[error("A node named '{0}' already exists")]
    DuplicateNodeName(String),

    #[error("Node {node:?} has no port '{port}'")]
    InvalidPort { node: NodeId, port: String },

    #[error("Port direction mismatch: {0}")]
    DirectionMismatch(String),

    #[error("Cycle detected in dataflow graph")]
    CycleDetected,

    #[error("Connection already exists: {0}")]
    DuplicateConnection(String),

    #[error("Invalid connection: {0:?}")]
    InvalidConnection(ConnectionId),

    #[error("Unknown attribute '{key}' on {node_type}")]
    UnknownAttribute { node_type: String, key: String },

    #[error("Attribute '{key}' expects {expected}, got {found}")]
    AttributeType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Attribute '{key}' value {value} outside [{min}, {max}]")]
    AttributeBounds {
        key: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid value for attribute '{key}': {message}")]
    InvalidAttribute { key: String, message: String },
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;
