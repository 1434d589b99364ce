use crate::core::gate::{Effects, GateLogic};
use crate::core::registry::InstanceState;
use crate::core::NodeValue;

/// Read-only field the reported text is shown in.
pub const DISPLAY_TEXT: &str = "display_text";

/// Shows the text a node reported when it executed. Holds no gating state,
/// ignores push events and offers no operator actions.
#[derive(Debug, Clone, Default)]
pub struct ShowTextGate;

impl ShowTextGate {
    pub fn displayed(state: &InstanceState) -> String {
        state.fields.text(DISPLAY_TEXT)
    }
}

impl GateLogic for ShowTextGate {
    fn on_created(&mut self, state: &mut InstanceState) {
        state.fields.set_default(DISPLAY_TEXT, "");
    }

    fn on_cycle_complete(&mut self, state: &mut InstanceState, output: &NodeValue) -> Effects {
        let Some(parts) = output.get("text").and_then(NodeValue::as_array) else {
            return Effects::none();
        };
        let text: String = parts
            .iter()
            .map(|part| match part {
                NodeValue::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        state.fields.set(DISPLAY_TEXT, text);
        Effects::redraw()
    }
}
