//! Messages the pipeline pushes to the editor.
//!
//! Wire form is `{"type": "<kind>", "data": {...}}`, the same envelope the host
//! uses for its own execution messages. Which node types react to which kind
//! is decided by [`NodeType::listens_to`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{InstanceId, NodeType, NodeValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum PushEvent {
    PauseUpdate(PauseUpdate),
    IteratorUpdate(IteratorUpdate),
    ExecutionStart(ExecutionStart),
    Executed(Executed),
}

/// Current text for a single-item pause gate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PauseUpdate {
    /// Instance the update is meant for. Absent in the legacy protocol, which broadcasts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<InstanceId>,
    #[serde(default)]
    pub text: String,
}

/// Item `index` of `total` for an iteration gate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IteratorUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<InstanceId>,
    /// Base64 encoded preview, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub total: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready: Option<bool>,
}

/// The pipeline started (or resumed) running the workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<Uuid>,
}

/// A node finished executing; `output` is whatever it reported for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Executed {
    pub node: InstanceId,
    #[serde(default)]
    pub output: NodeValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PauseUpdate,
    IteratorUpdate,
    ExecutionStart,
    Executed,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::PauseUpdate => "pause-update",
            EventKind::IteratorUpdate => "iterator-update",
            EventKind::ExecutionStart => "execution-start",
            EventKind::Executed => "executed",
        }
    }
}

impl PushEvent {
    /// Decodes one raw message. Malformed messages are dropped with a warning.
    pub fn decode(raw: &str) -> Option<Self> {
        match serde_json::from_str(raw) {
            Ok(event) => Some(event),
            Err(e) => {
                log::warn!("Dropping undecodable push event: {}", e);
                None
            }
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            PushEvent::PauseUpdate(_) => EventKind::PauseUpdate,
            PushEvent::IteratorUpdate(_) => EventKind::IteratorUpdate,
            PushEvent::ExecutionStart(_) => EventKind::ExecutionStart,
            PushEvent::Executed(_) => EventKind::Executed,
        }
    }

    /// The instance this event is scoped to, if any.
    pub fn target(&self) -> Option<InstanceId> {
        match self {
            PushEvent::PauseUpdate(update) => update.node,
            PushEvent::IteratorUpdate(update) => update.node,
            PushEvent::ExecutionStart(_) => None,
            PushEvent::Executed(executed) => Some(executed.node),
        }
    }
}

impl NodeType {
    /// Whether instances of this type subscribe to remote state pushes of `kind`.
    ///
    /// Lifecycle kinds (`execution-start`, `executed`) are routed by the host
    /// itself and are not subscriptions.
    pub fn listens_to(&self, kind: EventKind) -> bool {
        matches!(
            (self, kind),
            (NodeType::TextInputPause, EventKind::PauseUpdate)
                | (NodeType::ImageTextIterator, EventKind::IteratorUpdate)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_iterator_update_with_optional_fields_missing() {
        let event = PushEvent::decode(
            r#"{"type": "iterator-update", "data": {"image": "aGk=", "index": 1, "total": 4}}"#,
        )
        .unwrap();

        match event {
            PushEvent::IteratorUpdate(update) => {
                assert_eq!(update.index, 1);
                assert_eq!(update.total, 4);
                assert_eq!(update.image.as_deref(), Some("aGk="));
                assert!(update.texts.is_none());
                assert!(update.node.is_none());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_decode_scoped_pause_update() {
        let event =
            PushEvent::decode(r#"{"type": "pause-update", "data": {"node": 7, "text": "hi"}}"#)
                .unwrap();
        assert_eq!(event.kind(), EventKind::PauseUpdate);
        assert_eq!(event.target(), Some(InstanceId(7)));
    }

    #[test]
    fn test_decode_drops_garbage() {
        assert!(PushEvent::decode("not json").is_none());
        assert!(PushEvent::decode(r#"{"type": "status", "data": {}}"#).is_none());
        assert!(PushEvent::decode(r#"{"type": "executed", "data": {}}"#).is_none());
    }

    #[test]
    fn test_encode_uses_kebab_case_envelope() {
        let event = PushEvent::Executed(Executed {
            node: InstanceId(3),
            output: json!({"text": ["a"]}),
        });
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "executed", "data": {"node": 3, "output": {"text": ["a"]}}})
        );
        assert_eq!(event.kind().name(), "executed");
    }

    #[test]
    fn test_subscriptions() {
        assert!(NodeType::TextInputPause.listens_to(EventKind::PauseUpdate));
        assert!(!NodeType::TextInputPause.listens_to(EventKind::IteratorUpdate));
        assert!(NodeType::ImageTextIterator.listens_to(EventKind::IteratorUpdate));
        assert!(!NodeType::ShowText.listens_to(EventKind::PauseUpdate));
        assert!(!NodeType::ImageTextIterator.listens_to(EventKind::Executed));
    }
}
