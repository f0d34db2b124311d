//! Conversation engine: per-user menu state machine, timed pause release, and escalation.
//!
//! [`rules`] is the pure transition table; [`ConversationEngine`] applies it to inbound
//! messages, owns the session store and pause timers, and sends replies through the transport.

mod dispatch;
mod engine;
mod messages;
pub mod rules;
mod scheduler;
mod state;
mod store;

pub use dispatch::spawn_dispatcher;
pub use engine::{ConversationEngine, EngineError, HandleOutcome, SessionEvent};
pub use messages::{contact_reference, release_label, Composer, ReplyContext};
pub use scheduler::{Scheduler, TimerHandle, TokioScheduler};
pub use state::{ConversationState, UnknownState};
pub use store::{InMemorySessionStore, SessionStore, UserId};
