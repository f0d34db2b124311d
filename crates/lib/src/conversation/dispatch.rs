//! Inbound dispatch: one ordered queue per user, users processed concurrently.

use super::engine::ConversationEngine;
use super::store::UserId;
use crate::channels::InboundMessage;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Receive inbound messages and hand each to its sender's worker. Messages from one user are
/// handled in arrival order. Worker queues are unbounded so handing off never waits on a
/// user whose replies are still being paced. Returns when `inbound_rx` closes.
pub fn spawn_dispatcher(
    engine: ConversationEngine,
    mut inbound_rx: mpsc::Receiver<InboundMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut workers: HashMap<UserId, mpsc::UnboundedSender<InboundMessage>> = HashMap::new();
        while let Some(msg) = inbound_rx.recv().await {
            let user = msg.sender_id.trim().to_string();
            if user.is_empty() {
                log::warn!("inbound: dropping message without sender id");
                continue;
            }
            let worker = workers
                .entry(user.clone())
                .or_insert_with(|| spawn_worker(engine.clone(), user.clone()));
            if let Err(mpsc::error::SendError(msg)) = worker.send(msg) {
                log::debug!("inbound: worker for {} gone, restarting", user);
                let fresh = spawn_worker(engine.clone(), user.clone());
                if fresh.send(msg).is_err() {
                    log::warn!("inbound: could not queue message from {}", user);
                }
                workers.insert(user, fresh);
            }
        }
        log::info!("inbound dispatcher stopped");
    })
}

fn spawn_worker(engine: ConversationEngine, user: UserId) -> mpsc::UnboundedSender<InboundMessage> {
    let (tx, mut rx) = mpsc::unbounded_channel::<InboundMessage>();
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match engine.handle_inbound(&msg).await {
                Ok(outcome) if outcome.dropped > 0 => log::warn!(
                    "inbound from {}: rule {} left {} outbound message(s) undelivered",
                    user,
                    outcome.rule,
                    outcome.dropped
                ),
                Ok(outcome) => log::debug!("inbound from {}: rule {}", user, outcome.rule),
                Err(e) => log::warn!("inbound from {} dropped: {}", user, e),
            }
        }
    });
    tx
}
