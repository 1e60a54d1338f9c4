//! Routing error types.

use thiserror::Error;

use crate::graph::NodeId;

/// Errors from graph loading and path search.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// No path connects the two nodes.
    #[error("No path from node {from} to node {to}")]
    NoPath {
        /// Origin node.
        from: NodeId,
        /// Destination node.
        to: NodeId,
    },

    /// A node ID is not part of the graph.
    #[error("Unknown node {id}")]
    UnknownNode {
        /// The missing node.
        id: NodeId,
    },

    /// The graph has no nodes to snap a point to.
    #[error("Road graph is empty")]
    EmptyGraph,

    /// Graph data is structurally invalid.
    #[error("Invalid graph: {message}")]
    InvalidGraph {
        /// What was wrong.
        message: String,
    },

    /// The graph provider could not load an area.
    #[error("Graph load failed for area '{area}': {message}")]
    GraphLoad {
        /// Requested area key.
        area: String,
        /// Underlying failure.
        message: String,
    },

    /// The graph provider did not answer in time.
    #[error("Graph load for area '{area}' timed out after {timeout_ms}ms")]
    Timeout {
        /// Requested area key.
        area: String,
        /// The bound that elapsed.
        timeout_ms: u64,
    },

    /// Graph file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Graph file is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
