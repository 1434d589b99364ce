use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::events::EventKind;
use crate::core::fields::FieldStore;
use crate::core::gate::Gate;
use crate::core::{InstanceId, NodeType};

/// Transient visual marker drawn behind a node. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Attention {
    #[default]
    Idle,
    /// The pipeline is paused on this node and needs operator input.
    AwaitingInput,
}

/// Everything a gate is allowed to mutate on its own instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceState {
    pub fields: FieldStore,
    pub attention: Attention,
}

impl InstanceState {
    pub fn with_fields(fields: FieldStore) -> Self {
        Self {
            fields,
            attention: Attention::Idle,
        }
    }
}

/// One live pause-capable node.
#[derive(Debug, Clone)]
pub struct NodeInstance {
    id: InstanceId,
    node_type: NodeType,
    pub(crate) state: InstanceState,
    pub(crate) gate: Gate,
}

impl NodeInstance {
    /// Instantiates the node and runs its gate's `on_created` hook over `fields`,
    /// which may hold values restored from a saved workflow.
    pub fn new(id: InstanceId, mut gate: Gate, fields: FieldStore) -> Self {
        let mut state = InstanceState::with_fields(fields);
        gate.on_created(&mut state);
        Self {
            id,
            node_type: gate.node_type(),
            state,
            gate,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn fields(&self) -> &FieldStore {
        &self.state.fields
    }

    pub fn attention(&self) -> Attention {
        self.state.attention
    }

    pub fn state(&self) -> &InstanceState {
        &self.state
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    pub fn is_blocking(&self) -> bool {
        self.state.fields.blocking()
    }
}

/// Live instances keyed by id, iterated in id order.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    instances: BTreeMap<InstanceId, NodeInstance>,
    next_id: u64,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out an id no live or previously restored instance uses.
    pub fn allocate_id(&mut self) -> InstanceId {
        self.next_id += 1;
        InstanceId(self.next_id)
    }

    /// Inserts `instance`, returning the one it replaced.
    pub fn insert(&mut self, instance: NodeInstance) -> Option<NodeInstance> {
        let id = instance.id();
        self.next_id = self.next_id.max(id.0);
        self.instances.insert(id, instance)
    }

    pub fn remove(&mut self, id: InstanceId) -> Option<NodeInstance> {
        self.instances.remove(&id)
    }

    pub fn get(&self, id: InstanceId) -> Option<&NodeInstance> {
        self.instances.get(&id)
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut NodeInstance> {
        self.instances.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeInstance> {
        self.instances.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut NodeInstance> {
        self.instances.values_mut()
    }

    pub fn ids_of_type(&self, node_type: NodeType) -> Vec<InstanceId> {
        self.iter()
            .filter(|instance| instance.node_type() == node_type)
            .map(NodeInstance::id)
            .collect()
    }

    /// Ids of every instance whose type subscribes to `kind`.
    pub fn subscribers(&self, kind: EventKind) -> Vec<InstanceId> {
        self.iter()
            .filter(|instance| instance.node_type().listens_to(kind))
            .map(NodeInstance::id)
            .collect()
    }
}
