pub mod channel;
pub mod config;
pub mod error;
pub mod events;
pub mod fields;
pub mod gate;
pub mod host;
pub mod mirror;
pub mod registry;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The Alias for serde_json::Value, every persisted widget value is one of these
pub type NodeValue = serde_json::Value;

/// The node types this crate attaches widget behaviour to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    /// Single-item pause gate.
    TextInputPause,
    /// Indexed iteration gate over a batch of images.
    ImageTextIterator,
    /// Display-only text output.
    ShowText,
}

impl NodeType {
    /// The name the host registers the node under.
    pub fn name(&self) -> &'static str {
        match self {
            NodeType::TextInputPause => "TextInputPause",
            NodeType::ImageTextIterator => "ImageTextIterator",
            NodeType::ShowText => "ShowText",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "TextInputPause" => Some(NodeType::TextInputPause),
            "ImageTextIterator" => Some(NodeType::ImageTextIterator),
            "ShowText" => Some(NodeType::ShowText),
            _ => None,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of one placed node in the active workflow, as assigned by the host graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
