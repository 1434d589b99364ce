//! Gate state machines.
//!
//! Each node type gets one [`GateLogic`] implementation; [`Gate`] is the
//! tagged variant the registry stores:
//! - [`PauseGate`] blocks on a single text value
//! - [`IterationGate`] blocks on one text per item of a batch
//! - [`ShowTextGate`] only displays what the pipeline reported

pub mod display;
pub mod iterator;
pub mod pause;

pub use display::ShowTextGate;
pub use iterator::{IterationGate, IterationPhase, IterationRecord, IteratorView};
pub use pause::{PauseGate, PausePhase, PauseRecord};

use serde::{Deserialize, Serialize};

use crate::core::channel::ResumeReason;
use crate::core::config::{GateConfig, IteratorMode};
use crate::core::error::{GateError, Result};
use crate::core::events::PushEvent;
use crate::core::fields::{BLOCKING, LEGACY_BLOCK, READY};
use crate::core::registry::{Attention, InstanceState};
use crate::core::{InstanceId, NodeType, NodeValue};

/// What the host has to do after a gate handled a trigger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Effects {
    pub redraw: bool,
    pub command: Option<ResumeReason>,
}

impl Effects {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn redraw() -> Self {
        Self {
            redraw: true,
            command: None,
        }
    }

    /// Redraw, then wake the pipeline.
    pub fn resume(reason: ResumeReason) -> Self {
        Self {
            redraw: true,
            command: Some(reason),
        }
    }

    /// Combines two effect sets; a `Continue` outranks a `Reevaluate`.
    pub fn merge(self, other: Effects) -> Self {
        let command = match (self.command, other.command) {
            (Some(ResumeReason::Continue), _) | (_, Some(ResumeReason::Continue)) => {
                Some(ResumeReason::Continue)
            }
            (a, b) => a.or(b),
        };
        Self {
            redraw: self.redraw || other.redraw,
            command,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Previous,
    Next,
}

impl Direction {
    pub fn step(self) -> isize {
        match self {
            Direction::Previous => -1,
            Direction::Next => 1,
        }
    }
}

/// Something the operator did on a node's widgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OperatorAction {
    /// Typed into the node's text box.
    EditText { text: String },
    SetBlocking { blocking: bool },
    /// Continue on a pause gate, continue-all on an iteration gate.
    Continue,
    Navigate { direction: Direction },
    ResetAll,
    /// Forward-only advance of the sequential iterator.
    NextManual,
}

impl OperatorAction {
    pub fn name(&self) -> &'static str {
        match self {
            OperatorAction::EditText { .. } => "edit_text",
            OperatorAction::SetBlocking { .. } => "set_blocking",
            OperatorAction::Continue => "continue",
            OperatorAction::Navigate { .. } => "navigate",
            OperatorAction::ResetAll => "reset_all",
            OperatorAction::NextManual => "next_manual",
        }
    }
}

/// Lifecycle hooks the host calls on a node's gate.
///
/// The defaults do nothing, so a gate only implements the hooks it cares about.
pub trait GateLogic {
    /// The host instantiated the node, `state.fields` may already hold saved values.
    fn on_created(&mut self, _state: &mut InstanceState) {}

    /// A remote push passed the mirror's filters for this instance.
    fn on_event(&mut self, _state: &mut InstanceState, _event: &PushEvent) -> Effects {
        Effects::none()
    }

    /// The pipeline reported this node finished executing.
    fn on_cycle_complete(&mut self, _state: &mut InstanceState, _output: &NodeValue) -> Effects {
        Effects::none()
    }
}

/// Writes the gating switch on creation. A workflow saved under the legacy
/// field name keeps its value.
pub(crate) fn init_blocking(state: &mut InstanceState, default: bool) {
    if state.fields.contains(BLOCKING) {
        return;
    }
    let blocking = state
        .fields
        .get(LEGACY_BLOCK)
        .and_then(NodeValue::as_bool)
        .unwrap_or(default);
    state.fields.set(BLOCKING, blocking);
}

/// Puts a gate in the released state: `ready` set and the marker cleared.
pub(crate) fn arm(state: &mut InstanceState) {
    state.fields.set(READY, true);
    state.attention = Attention::Idle;
}

/// Clears `ready` and the marker so the next pause cycle starts clean.
pub(crate) fn disarm(state: &mut InstanceState) {
    state.fields.set(READY, false);
    state.attention = Attention::Idle;
}

#[derive(Debug, Clone)]
pub enum Gate {
    Pause(PauseGate),
    Iterator(IterationGate),
    Display(ShowTextGate),
}

impl Gate {
    pub fn for_node_type(node_type: NodeType, config: &GateConfig) -> Self {
        match node_type {
            NodeType::TextInputPause => Gate::Pause(PauseGate::new(config.default_blocking)),
            NodeType::ImageTextIterator => Gate::Iterator(
                IterationGate::new(
                    config.iterator_mode,
                    config.seed_policy,
                    config.default_blocking,
                )
                .with_max_batch_size(config.max_batch_size),
            ),
            NodeType::ShowText => Gate::Display(ShowTextGate),
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Gate::Pause(_) => NodeType::TextInputPause,
            Gate::Iterator(_) => NodeType::ImageTextIterator,
            Gate::Display(_) => NodeType::ShowText,
        }
    }

    fn logic_mut(&mut self) -> &mut dyn GateLogic {
        match self {
            Gate::Pause(gate) => gate,
            Gate::Iterator(gate) => gate,
            Gate::Display(gate) => gate,
        }
    }

    pub fn on_created(&mut self, state: &mut InstanceState) {
        self.logic_mut().on_created(state)
    }

    pub fn on_event(&mut self, state: &mut InstanceState, event: &PushEvent) -> Effects {
        self.logic_mut().on_event(state, event)
    }

    pub fn on_cycle_complete(&mut self, state: &mut InstanceState, output: &NodeValue) -> Effects {
        self.logic_mut().on_cycle_complete(state, output)
    }

    /// Applies an operator action, rejecting the ones this gate does not offer.
    pub fn apply(
        &mut self,
        node: InstanceId,
        state: &mut InstanceState,
        action: OperatorAction,
    ) -> Result<Effects> {
        let unsupported = |action: &OperatorAction| GateError::UnsupportedAction {
            node,
            action: action.name(),
        };

        match (self, action) {
            (Gate::Display(_), action) => Err(unsupported(&action)),
            (Gate::Pause(_), OperatorAction::EditText { text }) => {
                state.fields.set(pause::TEXT, text);
                Ok(Effects::none())
            }
            (Gate::Iterator(_), OperatorAction::EditText { text }) => {
                state.fields.set(iterator::CURRENT_TEXT, text);
                Ok(Effects::none())
            }
            (_, OperatorAction::SetBlocking { blocking }) => {
                state.fields.set(BLOCKING, blocking);
                Ok(Effects::redraw())
            }
            (Gate::Pause(gate), OperatorAction::Continue) => Ok(gate.continue_run(state)),
            (Gate::Iterator(gate), OperatorAction::Continue) => Ok(gate.continue_all(state)),
            (Gate::Iterator(gate), OperatorAction::ResetAll) => Ok(gate.reset_all(state)),
            (Gate::Iterator(gate), OperatorAction::Navigate { direction })
                if gate.mode() == IteratorMode::Navigable =>
            {
                Ok(gate.navigate(state, direction))
            }
            (Gate::Iterator(gate), OperatorAction::NextManual)
                if gate.mode() == IteratorMode::Sequential =>
            {
                Ok(gate.next_manual(state))
            }
            (_, action) => Err(unsupported(&action)),
        }
    }
}
