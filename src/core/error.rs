use thiserror::Error;

use crate::core::InstanceId;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("Command channel closed: {0}")]
    TransportClosed(String),

    #[error("No live node instance with id {0}")]
    UnknownInstance(InstanceId),

    #[error("Node {node} does not support action '{action}'")]
    UnsupportedAction {
        node: InstanceId,
        action: &'static str,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GateError>;
