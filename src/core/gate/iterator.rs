//! The indexed iteration gate.
//!
//! The pipeline walks a batch of `total` items and pushes the one at `index`.
//! The operator writes one text per item and may move freely between items
//! while the pipeline waits. Every text lives in the `all_texts` field, one
//! slot per item; the text box only ever shows slot `current_index`.
//!
//! The rule that keeps edits from getting lost: whatever moves the index
//! (navigation, a push for another item, releasing the gate) first *flushes*
//! the displayed text into its slot.

use crate::core::channel::ResumeReason;
use crate::core::config::{DEFAULT_MAX_BATCH_SIZE, IteratorMode, SeedPolicy};
use crate::core::events::{IteratorUpdate, PushEvent};
use crate::core::fields::{FieldStore, READY, pad_texts};
use crate::core::gate::{Direction, Effects, GateLogic, arm, disarm, init_blocking};
use crate::core::registry::InstanceState;
use crate::core::NodeValue;

/// Field holding the text shown for the current item.
pub const CURRENT_TEXT: &str = "current_text";
/// Field holding one text per item.
pub const ALL_TEXTS: &str = "all_texts";
pub const CURRENT_INDEX: &str = "current_index";
pub const TOTAL: &str = "total";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationPhase {
    /// No batch loaded (`total == 0`).
    Empty,
    /// The operator is editing and moving between items.
    Browsing,
    /// Released, waiting for the pipeline to consume the texts.
    Armed,
}

/// Typed view over an iteration gate's persisted fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationRecord {
    pub index: usize,
    pub total: usize,
    pub texts: Vec<String>,
    pub ready: bool,
    pub blocking: bool,
}

impl IterationRecord {
    pub fn from_fields(fields: &FieldStore) -> Self {
        Self {
            index: fields.index(CURRENT_INDEX),
            total: fields.index(TOTAL),
            texts: fields.texts(ALL_TEXTS),
            ready: fields.ready(),
            blocking: fields.blocking(),
        }
    }
}

/// Display-only state of the last push. Not persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IteratorView {
    pub image: Option<String>,
    pub filename: Option<String>,
    pub label: String,
    /// The push the view was built from, dropped on reset.
    pub remote: Option<IteratorUpdate>,
}

/// `"2 / 5 | cat_01"`, or empty when no batch is loaded.
pub fn counter_label(index: usize, total: usize, filename: Option<&str>) -> String {
    if total == 0 {
        return String::new();
    }
    match filename {
        Some(name) if !name.is_empty() => format!("{} / {} | {}", index + 1, total, name),
        _ => format!("{} / {}", index + 1, total),
    }
}

#[derive(Debug, Clone)]
pub struct IterationGate {
    mode: IteratorMode,
    seed_policy: SeedPolicy,
    default_blocking: bool,
    max_batch_size: usize,
    view: IteratorView,
}

/// Pins `index` into `[0, total - 1]`, or 0 when there is no batch.
fn clamp_index(index: usize, total: usize) -> usize {
    index.min(total.saturating_sub(1))
}

/// Writes the displayed text into its slot and returns the index and the padded texts.
fn flush(state: &mut InstanceState) -> (usize, Vec<String>) {
    let fields = &mut state.fields;
    let total = fields.index(TOTAL);
    let index = clamp_index(fields.index(CURRENT_INDEX), total);

    let mut texts = fields.texts(ALL_TEXTS);
    pad_texts(&mut texts, total.max(index.saturating_add(1)));
    texts[index] = fields.text(CURRENT_TEXT);
    fields.set_texts(ALL_TEXTS, &texts);

    (index, texts)
}

impl IterationGate {
    pub fn new(mode: IteratorMode, seed_policy: SeedPolicy, default_blocking: bool) -> Self {
        Self {
            mode,
            seed_policy,
            default_blocking,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            view: IteratorView::default(),
        }
    }

    /// Caps the batch size this gate accepts from pushes and saved workflows.
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub fn mode(&self) -> IteratorMode {
        self.mode
    }

    pub fn seed_policy(&self) -> SeedPolicy {
        self.seed_policy
    }

    pub fn view(&self) -> &IteratorView {
        &self.view
    }

    pub fn phase(state: &InstanceState) -> IterationPhase {
        if state.fields.ready() {
            IterationPhase::Armed
        } else if state.fields.index(TOTAL) == 0 {
            IterationPhase::Empty
        } else {
            IterationPhase::Browsing
        }
    }

    /// Moves one item back or forth, clamped to the batch. Never wraps.
    ///
    /// The displayed text is flushed into its slot before the index moves, then
    /// the slot of the new item is displayed and the pipeline is asked to
    /// re-evaluate so it pushes that item's image. A move that clamps at an
    /// edge changes nothing beyond the flush.
    pub fn navigate(&mut self, state: &mut InstanceState, direction: Direction) -> Effects {
        let total = state.fields.index(TOTAL);
        if total == 0 {
            log::debug!("Navigation ignored, no batch loaded");
            return Effects::none();
        }

        let (index, texts) = flush(state);
        let target = index.saturating_add_signed(direction.step()).min(total - 1);

        state.fields.set(CURRENT_INDEX, target);
        state
            .fields
            .set(CURRENT_TEXT, texts.get(target).cloned().unwrap_or_default());

        if target == index {
            log::debug!("Navigation clamped at item {} of {}", index + 1, total);
            return Effects::redraw();
        }
        Effects::resume(ResumeReason::Reevaluate)
    }

    /// Releases the gate. The last viewed item's edit is flushed first, if a batch is loaded.
    pub fn continue_all(&mut self, state: &mut InstanceState) -> Effects {
        if self.mode == IteratorMode::Navigable && state.fields.index(TOTAL) > 0 {
            flush(state);
        }
        arm(state);
        log::info!(
            "Iteration gate released at item {} of {}",
            state.fields.index(CURRENT_INDEX).saturating_add(1),
            state.fields.index(TOTAL)
        );
        Effects::resume(ResumeReason::Continue)
    }

    /// Abandons the batch: wipes every text and returns to the empty state.
    pub fn reset_all(&mut self, state: &mut InstanceState) -> Effects {
        let fields = &mut state.fields;
        fields.set(CURRENT_INDEX, 0);
        fields.set(TOTAL, 0);
        fields.set(CURRENT_TEXT, "");
        fields.set_texts(ALL_TEXTS, &[]);
        disarm(state);
        self.view = IteratorView::default();
        log::info!("Iteration gate reset, batch progress discarded");
        Effects::redraw()
    }

    /// Sequential mode only: step forward locally and clear the text box.
    pub fn next_manual(&mut self, state: &mut InstanceState) -> Effects {
        let index = state.fields.index(CURRENT_INDEX);
        let total = state.fields.index(TOTAL);
        if total > 0 {
            state
                .fields
                .set(CURRENT_INDEX, clamp_index(index.saturating_add(1), total));
        }
        state.fields.set(CURRENT_TEXT, "");
        Effects::redraw()
    }

    fn merge_navigable(&self, state: &mut InstanceState, update: &IteratorUpdate, index: usize, total: usize) {
        let (_, mut texts) = flush(state);

        if let Some(pushed) = &update.texts {
            pad_texts(&mut texts, pushed.len());
            for (slot, text) in texts.iter_mut().zip(pushed) {
                if self.seed_policy == SeedPolicy::Overwrite || slot.is_empty() {
                    slot.clone_from(text);
                }
            }
        }
        pad_texts(&mut texts, total.max(index + 1));

        state.fields.set(CURRENT_TEXT, texts[index].clone());
        state.fields.set_texts(ALL_TEXTS, &texts);
    }

    fn merge_sequential(&self, state: &mut InstanceState, update: &IteratorUpdate, index: usize) {
        let Some(text) = update.texts.as_ref().and_then(|texts| texts.get(index)) else {
            return;
        };
        if self.seed_policy == SeedPolicy::Overwrite || state.fields.text(CURRENT_TEXT).is_empty() {
            state.fields.set(CURRENT_TEXT, text.clone());
        }
    }
}

impl GateLogic for IterationGate {
    fn on_created(&mut self, state: &mut InstanceState) {
        let fields = &mut state.fields;
        fields.set_default(CURRENT_TEXT, "");
        fields.set_default(CURRENT_INDEX, 0);
        fields.set_default(TOTAL, 0);
        fields.set_default(READY, false);

        let total = fields.index(TOTAL);
        if total > self.max_batch_size {
            log::warn!(
                "Saved batch of {} items exceeds the limit of {}, truncating",
                total,
                self.max_batch_size
            );
            fields.set(TOTAL, self.max_batch_size);
        }
        let total = fields.index(TOTAL);
        let index = fields.index(CURRENT_INDEX);
        if index != clamp_index(index, total) {
            log::warn!("Saved index {} out of range for {} items, clamping", index, total);
            fields.set(CURRENT_INDEX, clamp_index(index, total));
        }

        // older workflows stored the texts as a serialized string
        if !matches!(fields.get(ALL_TEXTS), Some(NodeValue::Array(_))) {
            let texts = fields.texts(ALL_TEXTS);
            fields.set_texts(ALL_TEXTS, &texts);
        }
        init_blocking(state, self.default_blocking);

        if self.mode == IteratorMode::Sequential {
            log::warn!("Sequential iterator mode is deprecated, prefer the navigable mode");
        }
    }

    fn on_event(&mut self, state: &mut InstanceState, event: &PushEvent) -> Effects {
        let PushEvent::IteratorUpdate(update) = event else {
            return Effects::none();
        };

        let pushed_texts = update.texts.as_ref().map_or(0, Vec::len);
        let limit = i64::try_from(self.max_batch_size).unwrap_or(i64::MAX);
        if update.total > limit || pushed_texts > self.max_batch_size {
            log::warn!(
                "Dropping push of {} items ({} texts), the limit is {}",
                update.total,
                pushed_texts,
                self.max_batch_size
            );
            return Effects::none();
        }

        let total = update.total.max(0) as usize;
        let index = if total == 0 {
            0
        } else {
            update.index.clamp(0, total as i64 - 1) as usize
        };
        if index as i64 != update.index {
            log::debug!(
                "Pushed index {} out of range for {} items, using {}",
                update.index,
                total,
                index
            );
        }

        match self.mode {
            IteratorMode::Navigable => self.merge_navigable(state, update, index, total),
            IteratorMode::Sequential => self.merge_sequential(state, update, index),
        }
        state.fields.set(CURRENT_INDEX, index);
        state.fields.set(TOTAL, total);

        self.view = IteratorView {
            image: update.image.clone(),
            filename: update.filename.clone(),
            label: counter_label(index, total, update.filename.as_deref()),
            remote: Some(update.clone()),
        };
        Effects::redraw()
    }

    fn on_cycle_complete(&mut self, state: &mut InstanceState, _output: &NodeValue) -> Effects {
        disarm(state);
        Effects::redraw()
    }
}
