//! Deferred actions for timed states.
//!
//! The engine only needs "run this later" and "never mind". Actions re-check session state
//! when they fire, so a scheduler may drop or delay them without breaking correctness.

use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::AbortHandle;

/// Opaque id of a scheduled action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

/// Schedule and cancel deferred actions.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, action: BoxFuture<'static, ()>) -> TimerHandle;
    /// Cancel a pending action. No-op if it already ran or was cancelled.
    fn cancel(&self, handle: TimerHandle);
}

/// Runs each action on its own tokio task after `tokio::time::sleep`.
#[derive(Default)]
pub struct TokioScheduler {
    next_id: AtomicU64,
    tasks: Arc<Mutex<HashMap<u64, AbortHandle>>>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        self.tasks.lock().map(|g| g.len()).unwrap_or(0)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, action: BoxFuture<'static, ()>) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let tasks = Arc::clone(&self.tasks);
        // Hold the map lock across spawn so the task cannot remove its entry before it exists.
        let mut g = match self.tasks.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
            if let Ok(mut g) = tasks.lock() {
                g.remove(&id);
            }
        });
        g.insert(id, handle.abort_handle());
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        let removed = self.tasks.lock().ok().and_then(|mut g| g.remove(&handle.0));
        if let Some(abort) = removed {
            abort.abort();
        }
    }
}
