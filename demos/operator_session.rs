//! A scripted operator session captioning a batch of three images.
//!
//! This example demonstrates:
//! - Hosting an iteration gate and a pause gate in one workflow
//! - Feeding raw pipeline pushes through the host
//! - Editing, navigating and releasing a batch
//! - Reading back the resume commands and the persisted fields

use pausegate::fields::{ALL_TEXTS, CURRENT_TEXT, TEXT};
use pausegate::prelude::*;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

const BATCH: [&str; 3] = ["cat_01", "dog_02", "bird_03"];

/// What the pipeline would push while holding item `index` of the batch.
fn item_push(node: InstanceId, index: usize) -> String {
    format!(
        r#"{{"type": "iterator-update", "data": {{"node": {}, "image": "aW1hZ2U=", "index": {}, "total": {}, "filename": "{}", "texts": ["a cat", "", ""]}}}}"#,
        node.0,
        index,
        BATCH.len(),
        BATCH[index]
    )
}

fn drain(commands: &mut UnboundedReceiver<ResumeCommand>) {
    while let Ok(command) = commands.try_recv() {
        println!("  -> pipeline receives {:?}", command.reason);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> pausegate::Result<()> {
    let (channel, mut commands) = QueueChannel::new();
    let canvas = Arc::new(DirtyFlag::new());
    let mut host = GateHost::new(GateConfig::default(), channel, canvas.clone());

    let iterator = host.add_node(NodeType::ImageTextIterator);
    let review = host.add_node(NodeType::TextInputPause);
    println!("Workflow {} with iterator {} and review {}", host.workflow(), iterator, review);

    // ========================================================================
    // Batch captioning
    // ========================================================================

    let mut index = 0;
    for caption in ["a cat sitting on a mat", "a dog in the snow"] {
        if let Some(event) = PushEvent::decode(&item_push(iterator, index)) {
            host.handle_event(event).await?;
        }
        let seeded = host
            .instance(iterator)
            .map(|instance| instance.fields().text(CURRENT_TEXT))
            .unwrap_or_default();
        println!("Item {} ({}) arrives with text {:?}", index + 1, BATCH[index], seeded);

        host.handle_action(iterator, OperatorAction::EditText { text: caption.into() })
            .await?;
        host.handle_action(iterator, OperatorAction::Navigate { direction: Direction::Next })
            .await?;
        drain(&mut commands);
        index += 1;
    }

    if let Some(event) = PushEvent::decode(&item_push(iterator, index)) {
        host.handle_event(event).await?;
    }
    host.handle_action(iterator, OperatorAction::EditText { text: "a bird on a wire".into() })
        .await?;
    host.handle_action(iterator, OperatorAction::Continue).await?;
    drain(&mut commands);

    if let Some(instance) = host.instance(iterator) {
        println!("Captions sent: {}", instance.fields().get(ALL_TEXTS).cloned().unwrap_or_default());
    }

    // ========================================================================
    // Final review
    // ========================================================================

    let raw = format!(
        r#"{{"type": "pause-update", "data": {{"node": {}, "text": "3 captions written"}}}}"#,
        review.0
    );
    if let Some(event) = PushEvent::decode(&raw) {
        host.handle_event(event).await?;
    }
    host.handle_action(review, OperatorAction::EditText { text: "3 captions, reviewed".into() })
        .await?;
    host.handle_action(review, OperatorAction::Continue).await?;
    drain(&mut commands);

    if let Some(instance) = host.instance(review) {
        println!("Review text: {:?}", instance.fields().text(TEXT));
    }
    println!("Canvas redraws requested: {}", canvas.requests());
    Ok(())
}
