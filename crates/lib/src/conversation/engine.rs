//! Conversation engine: applies the menu table to inbound messages and runs the resulting
//! replies, escalations and pause timers.
//!
//! Updates to one user's session are serialized by a per-user lock; different users are
//! handled concurrently. The deferred pause release takes the same lock, so its guard check
//! and state write are atomic with respect to message handling.

use super::messages::{release_label, Composer, ReplyContext, DEFAULT_CUSTOMER_NAME};
use super::rules::{self, Decision, Effect, Inbound};
use super::scheduler::{Scheduler, TimerHandle};
use super::state::ConversationState;
use super::store::{SessionStore, UserId};
use crate::channels::{InboundMessage, Transport};
use crate::config::ConversationConfig;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, Mutex};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("malformed inbound event: {0}")]
    MalformedEvent(&'static str),
}

/// What happened for one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleOutcome {
    /// Rule of the transition table that matched.
    pub rule: &'static str,
    /// Session state after handling; `None` when the user still has no session.
    pub state: Option<ConversationState>,
    /// Outbound messages the transport accepted.
    pub delivered: usize,
    /// Outbound messages dropped because the transport failed.
    pub dropped: usize,
}

/// State change broadcast to observers (e.g. the gateway WebSocket).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent {
    pub user_id: String,
    pub state: ConversationState,
    pub cause: &'static str,
}

#[derive(Default)]
struct Delivery {
    delivered: usize,
    dropped: usize,
}

struct EngineInner {
    store: Arc<dyn SessionStore>,
    transport: Arc<dyn Transport>,
    scheduler: Arc<dyn Scheduler>,
    settings: ConversationConfig,
    composer: Composer,
    user_locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
    /// Pending pause release per user, tagged with the generation that armed it.
    release_timers: Mutex<HashMap<UserId, (u64, TimerHandle)>>,
    generation: AtomicU64,
    events: broadcast::Sender<SessionEvent>,
}

/// Cheap to clone; clones share sessions, locks and timers.
#[derive(Clone)]
pub struct ConversationEngine {
    inner: Arc<EngineInner>,
}

impl ConversationEngine {
    pub fn new(
        store: Arc<dyn SessionStore>,
        transport: Arc<dyn Transport>,
        scheduler: Arc<dyn Scheduler>,
        settings: ConversationConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        let composer = Composer::new(settings.company_name.clone());
        Self {
            inner: Arc::new(EngineInner {
                store,
                transport,
                scheduler,
                settings,
                composer,
                user_locks: Mutex::new(HashMap::new()),
                release_timers: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
                events,
            }),
        }
    }

    /// Subscribe to session state changes.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    #[cfg(test)]
    async fn session_state(&self, user: &str) -> Option<ConversationState> {
        self.inner.store.get(user).await
    }

    /// Handle one inbound message: decide, commit the new state, then send replies.
    /// Delivery failures are logged and counted; they never roll back the state.
    pub async fn handle_inbound(&self, msg: &InboundMessage) -> Result<HandleOutcome, EngineError> {
        let user = msg.sender_id.trim();
        if user.is_empty() {
            return Err(EngineError::MalformedEvent("missing sender id"));
        }
        let body = msg.body.trim();

        let lock = self.inner.user_lock(user).await;
        let _guard = lock.lock().await;

        let state = self.inner.store.get(user).await;
        let decision = rules::decide(&Inbound {
            state,
            body,
            is_group_traffic: msg.is_group_traffic(),
        });
        log::debug!(
            "inbound from {}: state={:?} rule={} next={:?}",
            user,
            state,
            decision.rule,
            decision.next
        );
        if let Some(next) = decision.next {
            self.inner.store.set(user, next).await;
            self.inner.publish(user, next, decision.rule);
        }

        let delivery = self.run_effects(user, msg, &decision).await;
        Ok(HandleOutcome {
            rule: decision.rule,
            state: decision.next.or(state),
            delivered: delivery.delivered,
            dropped: delivery.dropped,
        })
    }

    /// Guarded pause release outside any timer: `Menu` only if still `Paused`.
    #[cfg(test)]
    async fn release_if_paused(&self, user: &str) -> bool {
        EngineInner::release(&self.inner, user, None).await
    }

    async fn run_effects(&self, user: &str, msg: &InboundMessage, decision: &Decision) -> Delivery {
        let settings = &self.inner.settings;
        let display_name = msg
            .display_name
            .clone()
            .unwrap_or_else(|| DEFAULT_CUSTOMER_NAME.to_string());
        let release_at = chrono::Utc::now()
            + chrono::Duration::from_std(settings.pause_duration())
                .unwrap_or_else(|_| chrono::Duration::zero());
        let ctx = ReplyContext {
            display_name,
            release_label: release_label(release_at, settings.utc_offset_minutes),
        };

        let mut delivery = Delivery::default();
        for effect in &decision.effects {
            match effect {
                Effect::Typing => {
                    if let Err(e) = self.inner.transport.send_typing(user).await {
                        log::debug!("typing indicator for {} skipped: {}", user, e);
                    }
                    tokio::time::sleep(settings.typing_delay()).await;
                }
                Effect::WelcomePause => tokio::time::sleep(settings.welcome_pause()).await,
                Effect::Send(reply) => {
                    let text = self.inner.composer.render(reply, &ctx);
                    self.inner.deliver(user, &text, &mut delivery).await;
                }
                Effect::Escalate => self.escalate(user, &ctx.display_name, &mut delivery).await,
                Effect::ArmRelease => self.arm_release(user).await,
                Effect::CancelRelease => self.cancel_release(user).await,
            }
        }
        delivery
    }

    /// Send the same alert to every support contact. Each send is independent.
    async fn escalate(&self, user: &str, display_name: &str, delivery: &mut Delivery) {
        let alert = self.inner.composer.escalation_alert(display_name, user);
        let contacts = &self.inner.settings.support_contacts;
        log::info!(
            "escalating {} ({}) to {} support contact(s)",
            user,
            display_name,
            contacts.len()
        );
        let sends = contacts.iter().map(|contact| {
            let alert = &alert;
            async move {
                (
                    contact,
                    self.inner.transport.send_message(contact, alert).await,
                )
            }
        });
        for (contact, result) in futures_util::future::join_all(sends).await {
            match result {
                Ok(()) => delivery.delivered += 1,
                Err(e) => {
                    log::warn!("escalation to {} dropped: {}", contact, e);
                    delivery.dropped += 1;
                }
            }
        }
    }

    async fn arm_release(&self, user: &str) {
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
        let weak: Weak<EngineInner> = Arc::downgrade(&self.inner);
        let owner = user.to_string();
        let handle = self.inner.scheduler.schedule(
            self.inner.settings.pause_duration(),
            Box::pin(async move {
                if let Some(inner) = weak.upgrade() {
                    EngineInner::release(&inner, &owner, Some(generation)).await;
                }
            }),
        );
        let previous = self
            .inner
            .release_timers
            .lock()
            .await
            .insert(user.to_string(), (generation, handle));
        if let Some((_, old)) = previous {
            self.inner.scheduler.cancel(old);
        }
    }

    async fn cancel_release(&self, user: &str) {
        let pending = self.inner.release_timers.lock().await.remove(user);
        if let Some((_, handle)) = pending {
            self.inner.scheduler.cancel(handle);
        }
    }
}

impl EngineInner {
    async fn user_lock(&self, user: &str) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        locks
            .entry(user.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn publish(&self, user: &str, state: ConversationState, cause: &'static str) {
        let _ = self.events.send(SessionEvent {
            user_id: user.to_string(),
            state,
            cause,
        });
    }

    async fn deliver(&self, to: &str, text: &str, delivery: &mut Delivery) {
        match self.transport.send_message(to, text).await {
            Ok(()) => delivery.delivered += 1,
            Err(e) => {
                log::warn!("outbound message to {} dropped: {}", to, e);
                delivery.dropped += 1;
            }
        }
    }

    /// `generation` is set when called from a timer; a timer superseded by a newer pause is a no-op.
    async fn release(inner: &Arc<EngineInner>, user: &str, generation: Option<u64>) -> bool {
        let lock = inner.user_lock(user).await;
        let _guard = lock.lock().await;

        if let Some(generation) = generation {
            let mut timers = inner.release_timers.lock().await;
            match timers.get(user) {
                Some((current, _)) if *current == generation => {
                    timers.remove(user);
                }
                Some(_) => return false,
                None => {}
            }
        }

        if inner.store.get(user).await != Some(ConversationState::Paused) {
            return false;
        }
        inner.store.set(user, ConversationState::Menu).await;
        inner.publish(user, ConversationState::Menu, "pause_released");
        log::info!(
            "session {} released after {} minute pause",
            user,
            inner.settings.pause_minutes
        );
        true
    }
}
