use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::error::{GateError, Result};

/// Why the editor is waking the pipeline up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeReason {
    /// The operator released a gate.
    Continue,
    /// The operator moved to another item and its context must be fetched again.
    Reevaluate,
}

/// Wake-up signal sent to the pipeline.
///
/// It only names the workflow run; the pipeline reads `ready`, the texts and the
/// index from each instance's persisted fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeCommand {
    pub workflow: Uuid,
    pub reason: ResumeReason,
}

/// The command channel from the editor to the pipeline.
#[async_trait]
pub trait CommandChannel: Send + Sync {
    async fn send(&self, command: ResumeCommand) -> Result<()>;
}

/// [`CommandChannel`] backed by an unbounded tokio queue.
#[derive(Debug, Clone)]
pub struct QueueChannel {
    sender: mpsc::UnboundedSender<ResumeCommand>,
}

impl QueueChannel {
    /// Creates the channel and the receiving end the pipeline side polls.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ResumeCommand>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn from_sender(sender: mpsc::UnboundedSender<ResumeCommand>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl CommandChannel for QueueChannel {
    async fn send(&self, command: ResumeCommand) -> Result<()> {
        self.sender.send(command).map_err(|e| {
            GateError::TransportClosed(format!(
                "pipeline stopped listening, {:?} for workflow {} dropped",
                e.0.reason, e.0.workflow
            ))
        })
    }
}

/// Redraw hook of the host canvas.
pub trait Canvas: Send + Sync {
    fn request_redraw(&self);
}

impl<T: Canvas + ?Sized> Canvas for Arc<T> {
    fn request_redraw(&self) {
        (**self).request_redraw()
    }
}

/// A [`Canvas`] for hosts that poll for pending redraws.
#[derive(Debug, Default)]
pub struct DirtyFlag {
    dirty: AtomicBool,
    requests: AtomicUsize,
}

impl DirtyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a redraw was requested since the last call, and clears it.
    pub fn take(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    /// Total number of redraw requests seen.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::Acquire)
    }
}

impl Canvas for DirtyFlag {
    fn request_redraw(&self) {
        self.dirty.store(true, Ordering::Release);
        self.requests.fetch_add(1, Ordering::AcqRel);
    }
}
