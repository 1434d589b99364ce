//! Routes remote state pushes into the instances they are meant for.

use crate::core::config::GateConfig;
use crate::core::events::PushEvent;
use crate::core::fields::READY;
use crate::core::gate::Effects;
use crate::core::registry::{Attention, InstanceRegistry};
use crate::core::InstanceId;

/// What one [`RemoteStateMirror::apply`] call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorOutcome {
    /// Instances whose state was overwritten.
    pub applied: Vec<InstanceId>,
    /// Matching instances left alone because their blocking switch is off.
    pub skipped: Vec<InstanceId>,
    pub effects: Effects,
}

/// Mirrors authoritative pipeline state into local editable fields.
///
/// An event scoped to an instance id only touches that instance. An unscoped
/// event (the legacy protocol) reaches every instance of the subscribed type
/// unless `broadcast_unscoped` is off, in which case it is dropped.
#[derive(Debug, Clone)]
pub struct RemoteStateMirror {
    broadcast_unscoped: bool,
}

impl RemoteStateMirror {
    pub fn new(config: &GateConfig) -> Self {
        Self {
            broadcast_unscoped: config.broadcast_unscoped,
        }
    }

    pub fn apply(&self, registry: &mut InstanceRegistry, event: &PushEvent) -> MirrorOutcome {
        let kind = event.kind();
        let targets = match event.target() {
            Some(id) => match registry.get(id) {
                Some(instance) if instance.node_type().listens_to(kind) => vec![id],
                Some(instance) => {
                    log::debug!(
                        "Dropping {} for {}: node is a {}",
                        kind.name(),
                        id,
                        instance.node_type()
                    );
                    Vec::new()
                }
                None => {
                    log::debug!("Dropping {} for {}: no such node", kind.name(), id);
                    Vec::new()
                }
            },
            None if self.broadcast_unscoped => registry.subscribers(kind),
            None => {
                log::debug!("Dropping unscoped {}", kind.name());
                Vec::new()
            }
        };

        let mut outcome = MirrorOutcome::default();
        for id in targets {
            let Some(instance) = registry.get_mut(id) else {
                continue;
            };
            if !instance.is_blocking() {
                log::debug!("Ignoring {} for {}: blocking is off", kind.name(), id);
                outcome.skipped.push(id);
                continue;
            }

            instance.state.fields.set(READY, false);
            instance.state.attention = Attention::AwaitingInput;
            let effects = instance.gate.on_event(&mut instance.state, event);
            outcome.effects = outcome.effects.merge(effects).merge(Effects::redraw());
            outcome.applied.push(id);
        }

        if event.target().is_none() && outcome.applied.len() > 1 {
            log::warn!(
                "Unscoped {} was applied to {} instances at once: {:?}",
                kind.name(),
                outcome.applied.len(),
                outcome.applied
            );
        }
        outcome
    }
}
