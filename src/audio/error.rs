//! Error types for the audio subsystem.

use thiserror::Error;

use super::graph::NodeId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("node {0:?} has been released")]
    DeadNode(NodeId),
    #[error("node {node:?} has no port {port}")]
    Port { node: NodeId, port: u8 },
    #[error("connecting {from:?} -> {to:?} would create a cycle")]
    Cycle { from: NodeId, to: NodeId },
    #[error("no edge {from:?} -> {to:?}")]
    MissingEdge { from: NodeId, to: NodeId },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// The host cannot create a processing context. Playback continues
    /// natively.
    #[error("audio processing is not available on this platform")]
    UnsupportedPlatform,
    #[error("router is already bound to a media element")]
    AlreadyAttached,
    #[error("router is not attached to a media element")]
    NotAttached,
    #[error("audio graph error: {0}")]
    Graph(#[from] GraphError),
}
