//! # Pausegate
//!
//! Human-in-the-loop pause and iteration gates for a node editor driving a
//! batch pipeline.
//!
//! The pipeline halts at a gate node and pushes the state it is holding (the
//! current caption, or item `index` of `total` with its preview image). The
//! editor mirrors that state into the node's editable fields, the operator
//! edits or browses, and the gate sends a resume command once they are done.
//!
//! ## Features
//!
//! - **Single-item pause**: [`PauseGate`] shows one text, lets the operator edit it and continue
//! - **Batch iteration**: [`IterationGate`] keeps one editable text per item and navigates between them
//! - **Scoped pushes**: events carry the instance they are meant for; legacy unscoped events still fan out
//! - **Async transport**: resume commands go out through any [`CommandChannel`]
//!
//! ## Quick Start
//!
//! ```rust
//! use pausegate::prelude::*;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> pausegate::Result<()> {
//! let (channel, mut commands) = QueueChannel::new();
//! let canvas = Arc::new(DirtyFlag::new());
//! let mut host = GateHost::new(GateConfig::default(), channel, canvas.clone());
//!
//! let node = host.add_node(NodeType::TextInputPause);
//! let raw = r#"{"type": "pause-update", "data": {"text": "a cat on a mat"}}"#;
//! if let Some(event) = PushEvent::decode(raw) {
//!     host.handle_event(event).await?;
//! }
//!
//! host.handle_action(node, OperatorAction::EditText { text: "a cat".into() }).await?;
//! host.handle_action(node, OperatorAction::Continue).await?;
//!
//! let command = commands.recv().await.unwrap();
//! assert_eq!(command.reason, ResumeReason::Continue);
//! assert!(canvas.take());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`fields`]: names of the persisted widget fields each node reads and writes
//! - [`prelude`]: Commonly used types and traits (import with `use pausegate::prelude::*`)

// ============================================================================
// Core Module
// ============================================================================

mod core;

// ============================================================================
// Public Re-exports - Granular Imports
// ============================================================================

// Core types
pub use crate::core::{InstanceId, NodeType, NodeValue};
pub use crate::core::config::{GateConfig, IteratorMode, SeedPolicy};
pub use crate::core::error::{GateError, Result};
pub use crate::core::fields::{FieldStore, pad_texts, parse_texts};

// Events and transport
pub use crate::core::channel::{
    Canvas, CommandChannel, DirtyFlag, QueueChannel, ResumeCommand, ResumeReason,
};
pub use crate::core::events::{
    EventKind, ExecutionStart, Executed, IteratorUpdate, PauseUpdate, PushEvent,
};

// Gates
pub use crate::core::gate::iterator::counter_label;
pub use crate::core::gate::{
    Direction, Effects, Gate, GateLogic, IterationGate, IterationPhase, IterationRecord,
    IteratorView, OperatorAction, PauseGate, PausePhase, PauseRecord, ShowTextGate,
};

// Instances and hosting
pub use crate::core::host::{GateHost, HostSignal};
pub use crate::core::mirror::{MirrorOutcome, RemoteStateMirror};
pub use crate::core::registry::{Attention, InstanceRegistry, InstanceState, NodeInstance};

/// Names of the persisted widget fields.
pub mod fields {
    pub use crate::core::fields::{BLOCKING, LEGACY_BLOCK, READY};
    pub use crate::core::gate::display::DISPLAY_TEXT;
    pub use crate::core::gate::iterator::{ALL_TEXTS, CURRENT_INDEX, CURRENT_TEXT, TOTAL};
    pub use crate::core::gate::pause::TEXT;
}

// ============================================================================
// Prelude Module - Convenient Bulk Imports
// ============================================================================

/// The main prelude: imports everything needed to host gates in an editor.
///
/// # Example
/// ```rust
/// use pausegate::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        Attention,
        // Transport
        Canvas,
        CommandChannel,
        Direction,
        DirtyFlag,
        Effects,
        FieldStore,
        // Core
        GateConfig,
        GateError,
        // Hosting
        GateHost,
        HostSignal,
        InstanceId,
        IteratorMode,
        NodeType,
        NodeValue,
        OperatorAction,
        PushEvent,
        QueueChannel,
        ResumeCommand,
        ResumeReason,
        SeedPolicy,
    };
}

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
