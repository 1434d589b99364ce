use futures::{Stream, StreamExt};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::core::channel::{Canvas, CommandChannel, ResumeCommand};
use crate::core::config::GateConfig;
use crate::core::error::{GateError, Result};
use crate::core::events::PushEvent;
use crate::core::fields::FieldStore;
use crate::core::gate::{Effects, Gate, OperatorAction};
use crate::core::mirror::RemoteStateMirror;
use crate::core::registry::{Attention, InstanceRegistry, NodeInstance};
use crate::core::{InstanceId, NodeType};

/// One trigger for the host: a push from the pipeline or an operator action.
#[derive(Debug, Clone, PartialEq)]
pub enum HostSignal {
    Push(PushEvent),
    Operator {
        node: InstanceId,
        action: OperatorAction,
    },
}

/// Adapter between the editor and every pause-capable node of one workflow.
///
/// The host owns the instance registry and feeds it three kinds of triggers,
/// each handled to completion before the next one starts:
/// 1. **Push events** from the pipeline, routed through the [`RemoteStateMirror`]
/// 2. **Operator actions** on a node's widgets
/// 3. **Lifecycle events** (`execution-start`, `executed`)
///
/// Redraw requests go to the [`Canvas`]; resume commands go out on the
/// [`CommandChannel`], and a failing channel is reported to the caller.
pub struct GateHost<C, V> {
    config: GateConfig,
    workflow: Uuid,
    registry: InstanceRegistry,
    mirror: RemoteStateMirror,
    channel: C,
    canvas: V,
}

impl<C: CommandChannel, V: Canvas> GateHost<C, V> {
    /// Creates a host for a fresh workflow run.
    pub fn new(config: GateConfig, channel: C, canvas: V) -> Self {
        let mirror = RemoteStateMirror::new(&config);
        Self {
            config,
            workflow: Uuid::new_v4(),
            registry: InstanceRegistry::new(),
            mirror,
            channel,
            canvas,
        }
    }

    /// Binds the host to an existing workflow run instead of a fresh one.
    pub fn with_workflow(mut self, workflow: Uuid) -> Self {
        self.workflow = workflow;
        self
    }

    pub fn workflow(&self) -> Uuid {
        self.workflow
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn instance(&self, id: InstanceId) -> Option<&NodeInstance> {
        self.registry.get(id)
    }

    /// Places a new node of `node_type` in the workflow.
    pub fn add_node(&mut self, node_type: NodeType) -> InstanceId {
        let id = self.registry.allocate_id();
        self.restore_node(id, node_type, FieldStore::new())
    }

    /// Re-creates a node from a saved workflow, replacing any live node with the same id.
    pub fn restore_node(&mut self, id: InstanceId, node_type: NodeType, fields: FieldStore) -> InstanceId {
        let gate = Gate::for_node_type(node_type, &self.config);
        if self.registry.insert(NodeInstance::new(id, gate, fields)).is_some() {
            log::warn!("Node {} was restored over a live instance", id);
        }
        log::debug!("Created {} {}", node_type, id);
        id
    }

    pub fn remove_node(&mut self, id: InstanceId) -> Option<NodeInstance> {
        self.registry.remove(id)
    }

    /// Persisted fields of every live node, as the pipeline reads them on resume.
    pub fn workflow_fields(&self) -> BTreeMap<InstanceId, FieldStore> {
        self.registry
            .iter()
            .map(|instance| (instance.id(), instance.fields().clone()))
            .collect()
    }

    pub async fn handle_event(&mut self, event: PushEvent) -> Result<()> {
        let effects = match &event {
            PushEvent::ExecutionStart(start) => {
                log::debug!("Execution started (workflow {:?})", start.workflow);
                for instance in self.registry.iter_mut() {
                    instance.state.attention = Attention::Idle;
                }
                Effects::redraw()
            }
            PushEvent::Executed(executed) => match self.registry.get_mut(executed.node) {
                Some(instance) => instance
                    .gate
                    .on_cycle_complete(&mut instance.state, &executed.output),
                None => {
                    log::debug!("Ignoring completion of unknown node {}", executed.node);
                    Effects::none()
                }
            },
            PushEvent::PauseUpdate(_) | PushEvent::IteratorUpdate(_) => {
                self.mirror.apply(&mut self.registry, &event).effects
            }
        };
        self.commit(effects).await
    }

    pub async fn handle_action(&mut self, node: InstanceId, action: OperatorAction) -> Result<()> {
        let instance = self
            .registry
            .get_mut(node)
            .ok_or(GateError::UnknownInstance(node))?;
        let effects = instance.gate.apply(node, &mut instance.state, action)?;
        self.commit(effects).await
    }

    /// Handles `signals` in order until the stream ends.
    ///
    /// Rejected operator actions are logged and skipped; a command channel
    /// failure stops the loop and is returned.
    pub async fn drive<S>(&mut self, mut signals: S) -> Result<()>
    where
        S: Stream<Item = HostSignal> + Unpin,
    {
        while let Some(signal) = signals.next().await {
            let result = match signal {
                HostSignal::Push(event) => self.handle_event(event).await,
                HostSignal::Operator { node, action } => self.handle_action(node, action).await,
            };
            match result {
                Err(e @ GateError::TransportClosed(_)) => return Err(e),
                Err(e) => log::warn!("Operator action rejected: {}", e),
                Ok(()) => {}
            }
        }
        Ok(())
    }

    async fn commit(&self, effects: Effects) -> Result<()> {
        if effects.redraw {
            self.canvas.request_redraw();
        }
        let Some(reason) = effects.command else {
            return Ok(());
        };

        let command = ResumeCommand {
            workflow: self.workflow,
            reason,
        };
        log::info!("Sending {:?} for workflow {}", reason, self.workflow);
        if let Err(e) = self.channel.send(command).await {
            log::error!("Resume command failed: {}", e);
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::channel::{DirtyFlag, QueueChannel, ResumeReason};
    use crate::core::events::{ExecutionStart, Executed, IteratorUpdate, PauseUpdate};
    use crate::core::gate::Direction;
    use crate::core::gate::display::{DISPLAY_TEXT, ShowTextGate};
    use crate::core::gate::iterator::{ALL_TEXTS, CURRENT_TEXT};
    use crate::core::gate::pause::TEXT;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::mpsc::UnboundedReceiver;

    type TestHost = GateHost<QueueChannel, Arc<DirtyFlag>>;

    fn host() -> (TestHost, UnboundedReceiver<ResumeCommand>, Arc<DirtyFlag>) {
        let (channel, receiver) = QueueChannel::new();
        let canvas = Arc::new(DirtyFlag::new());
        let host = GateHost::new(GateConfig::default(), channel, canvas.clone());
        (host, receiver, canvas)
    }

    fn iterator_push(index: i64, total: i64) -> PushEvent {
        PushEvent::IteratorUpdate(IteratorUpdate {
            index,
            total,
            ..IteratorUpdate::default()
        })
    }

    #[tokio::test]
    async fn test_pause_continue_sends_resume_command() {
        let (mut host, mut receiver, canvas) = host();
        let node = host.add_node(NodeType::TextInputPause);

        host.handle_event(PushEvent::PauseUpdate(PauseUpdate {
            node: Some(node),
            text: "draft".into(),
        }))
        .await
        .unwrap();
        assert!(canvas.take());
        assert_eq!(host.instance(node).unwrap().attention(), Attention::AwaitingInput);

        host.handle_action(node, OperatorAction::Continue).await.unwrap();

        let command = receiver.try_recv().unwrap();
        assert_eq!(command.workflow, host.workflow());
        assert_eq!(command.reason, ResumeReason::Continue);
        assert!(host.instance(node).unwrap().fields().ready());
        assert_eq!(host.instance(node).unwrap().attention(), Attention::Idle);
    }

    #[tokio::test]
    async fn test_closed_channel_error_propagates() {
        let (mut host, receiver, _) = host();
        let node = host.add_node(NodeType::TextInputPause);
        drop(receiver);

        let err = host.handle_action(node, OperatorAction::Continue).await.unwrap_err();

        assert!(matches!(err, GateError::TransportClosed(_)));
        // the gate was armed before the transport failed
        assert!(host.instance(node).unwrap().fields().ready());
    }

    #[tokio::test]
    async fn test_action_on_unknown_node() {
        let (mut host, _receiver, _) = host();
        let err = host
            .handle_action(InstanceId(404), OperatorAction::Continue)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::UnknownInstance(InstanceId(404))));
    }

    #[tokio::test]
    async fn test_executed_completes_the_cycle() {
        let (mut host, _receiver, _) = host();
        let node = host.add_node(NodeType::ImageTextIterator);
        host.handle_event(iterator_push(0, 2)).await.unwrap();
        host.handle_action(node, OperatorAction::Continue).await.unwrap();
        assert!(host.instance(node).unwrap().fields().ready());

        host.handle_event(PushEvent::Executed(Executed {
            node,
            output: json!({}),
        }))
        .await
        .unwrap();

        assert!(!host.instance(node).unwrap().fields().ready());
    }

    #[tokio::test]
    async fn test_execution_start_clears_markers() {
        let (mut host, _receiver, _) = host();
        let pause = host.add_node(NodeType::TextInputPause);
        let iterator = host.add_node(NodeType::ImageTextIterator);
        host.handle_event(PushEvent::PauseUpdate(PauseUpdate::default())).await.unwrap();
        host.handle_event(iterator_push(0, 1)).await.unwrap();

        host.handle_event(PushEvent::ExecutionStart(ExecutionStart::default()))
            .await
            .unwrap();

        for id in [pause, iterator] {
            assert_eq!(host.instance(id).unwrap().attention(), Attention::Idle);
        }
    }

    #[tokio::test]
    async fn test_show_text_displays_executed_output() {
        let (mut host, mut receiver, _) = host();
        let node = host.add_node(NodeType::ShowText);

        host.handle_event(PushEvent::Executed(Executed {
            node,
            output: json!({"text": ["hello ", "world"]}),
        }))
        .await
        .unwrap();

        let instance = host.instance(node).unwrap();
        assert_eq!(ShowTextGate::displayed(instance.state()), "hello world");
        assert_eq!(instance.fields().text(DISPLAY_TEXT), "hello world");
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_navigation_requests_reevaluation() {
        let (mut host, mut receiver, _) = host();
        let node = host.add_node(NodeType::ImageTextIterator);
        host.handle_event(iterator_push(0, 3)).await.unwrap();

        host.handle_action(node, OperatorAction::EditText { text: "cat".into() })
            .await
            .unwrap();
        host.handle_action(node, OperatorAction::Navigate { direction: Direction::Next })
            .await
            .unwrap();

        assert_eq!(receiver.try_recv().unwrap().reason, ResumeReason::Reevaluate);
        assert_eq!(
            host.instance(node).unwrap().fields().get(ALL_TEXTS),
            Some(&json!(["cat", "", ""]))
        );
    }

    #[tokio::test]
    async fn test_drive_skips_rejected_actions() {
        let (mut host, mut receiver, _) = host();
        let pause = host.add_node(NodeType::TextInputPause);
        let show = host.add_node(NodeType::ShowText);

        let signals = futures::stream::iter(vec![
            HostSignal::Push(PushEvent::PauseUpdate(PauseUpdate {
                node: Some(pause),
                text: "pushed".into(),
            })),
            HostSignal::Operator { node: show, action: OperatorAction::Continue },
            HostSignal::Operator {
                node: pause,
                action: OperatorAction::EditText { text: "edited".into() },
            },
            HostSignal::Operator { node: pause, action: OperatorAction::Continue },
        ]);
        host.drive(signals).await.unwrap();

        assert_eq!(receiver.try_recv().unwrap().reason, ResumeReason::Continue);
        assert!(receiver.try_recv().is_err());
        assert_eq!(host.instance(pause).unwrap().fields().text(TEXT), "edited");
    }

    #[tokio::test]
    async fn test_drive_stops_on_transport_failure() {
        let (mut host, receiver, _) = host();
        let pause = host.add_node(NodeType::TextInputPause);
        drop(receiver);

        let signals = futures::stream::iter(vec![
            HostSignal::Operator { node: pause, action: OperatorAction::Continue },
            HostSignal::Operator {
                node: pause,
                action: OperatorAction::EditText { text: "never applied".into() },
            },
        ]);
        let err = host.drive(signals).await.unwrap_err();

        assert!(matches!(err, GateError::TransportClosed(_)));
        assert_eq!(host.instance(pause).unwrap().fields().text(TEXT), "");
    }

    #[tokio::test]
    async fn test_restore_node_keeps_saved_progress() {
        let (mut host, _receiver, _) = host();
        let mut fields = FieldStore::new();
        fields.set(ALL_TEXTS, r#"["a", "b"]"#);
        fields.set(CURRENT_TEXT, "b");
        fields.set("current_index", 1);
        fields.set("total", 2);

        let id = host.restore_node(InstanceId(12), NodeType::ImageTextIterator, fields);
        let next = host.add_node(NodeType::TextInputPause);

        assert_eq!(next, InstanceId(13));
        let saved = host.workflow_fields();
        assert_eq!(saved[&id].get(ALL_TEXTS), Some(&json!(["a", "b"])));
        assert_eq!(saved[&id].text(CURRENT_TEXT), "b");
        assert!(saved.contains_key(&next));
    }

    #[tokio::test]
    async fn test_remove_node_drops_later_events() {
        let (mut host, _receiver, canvas) = host();
        let node = host.add_node(NodeType::TextInputPause);
        assert!(host.remove_node(node).is_some());

        host.handle_event(PushEvent::PauseUpdate(PauseUpdate {
            node: Some(node),
            text: "late".into(),
        }))
        .await
        .unwrap();

        assert!(!canvas.take());
        assert!(host.registry().is_empty());
    }
}
