use crate::core::channel::ResumeReason;
use crate::core::events::PushEvent;
use crate::core::fields::{FieldStore, READY};
use crate::core::gate::{Effects, GateLogic, arm, disarm, init_blocking};
use crate::core::registry::{Attention, InstanceState};
use crate::core::NodeValue;

/// Field holding the single text value.
pub const TEXT: &str = "text";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PausePhase {
    /// Not paused yet.
    Idle,
    /// A push arrived and the operator has not continued.
    AwaitingInput,
    /// Continue was pressed, the pipeline has not consumed the text yet.
    Armed,
}

/// Typed view over a pause gate's persisted fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PauseRecord {
    pub text: String,
    pub ready: bool,
    pub blocking: bool,
}

impl PauseRecord {
    pub fn from_fields(fields: &FieldStore) -> Self {
        Self {
            text: fields.text(TEXT),
            ready: fields.ready(),
            blocking: fields.blocking(),
        }
    }
}

/// Blocks the pipeline until the operator edits one text value and continues.
#[derive(Debug, Clone)]
pub struct PauseGate {
    default_blocking: bool,
}

impl PauseGate {
    pub fn new(default_blocking: bool) -> Self {
        Self { default_blocking }
    }

    pub fn phase(state: &InstanceState) -> PausePhase {
        if state.fields.ready() {
            PausePhase::Armed
        } else if state.attention == Attention::AwaitingInput {
            PausePhase::AwaitingInput
        } else {
            PausePhase::Idle
        }
    }

    /// Releases the gate with whatever text is displayed, empty included.
    pub fn continue_run(&mut self, state: &mut InstanceState) -> Effects {
        arm(state);
        log::info!("Pause gate released with {} chars of text", state.fields.text(TEXT).len());
        Effects::resume(ResumeReason::Continue)
    }
}

impl GateLogic for PauseGate {
    fn on_created(&mut self, state: &mut InstanceState) {
        state.fields.set_default(TEXT, "");
        state.fields.set_default(READY, false);
        init_blocking(state, self.default_blocking);
    }

    fn on_event(&mut self, state: &mut InstanceState, event: &PushEvent) -> Effects {
        let PushEvent::PauseUpdate(update) = event else {
            return Effects::none();
        };
        // single shared slot, the pushed value always wins
        state.fields.set(TEXT, update.text.clone());
        Effects::redraw()
    }

    fn on_cycle_complete(&mut self, state: &mut InstanceState, _output: &NodeValue) -> Effects {
        disarm(state);
        Effects::redraw()
    }
}
