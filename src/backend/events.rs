//! Auth-state-change events — a broadcast hub with scoped subscriptions.
//!
//! Subscriptions are the one tracked resource in the application: each is
//! released exactly once, either explicitly via [`AuthSubscription::unsubscribe`]
//! or implicitly on drop, and the hub exposes the live count so teardown is
//! observable.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::broadcast;
use tracing::warn;

use super::types::Session;

/// One auth-state-change event: `Some` when a session is present, `None` on
/// sign-out.
pub type AuthEvent = Option<Session>;

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// Fan-out hub for auth-state-change events. Events are delivered to each
/// subscriber in emit order.
pub struct AuthEventHub {
    tx: broadcast::Sender<AuthEvent>,
    active: Arc<AtomicUsize>,
}

impl AuthEventHub {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Self {
            tx,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Subscribe to auth events. The returned guard owns the subscription.
    pub fn subscribe(&self) -> AuthSubscription {
        self.active.fetch_add(1, Ordering::SeqCst);
        AuthSubscription {
            rx: self.tx.subscribe(),
            active: Arc::clone(&self.active),
            released: AtomicBool::new(false),
        }
    }

    /// Emit an event to all current subscribers. Ok if nobody is listening.
    pub fn emit(&self, event: AuthEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of live (unreleased) subscriptions.
    pub fn active_subscribers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl Default for AuthEventHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped subscription guard. Releasing twice (explicitly and then on drop)
/// only decrements the hub's count once.
pub struct AuthSubscription {
    rx: broadcast::Receiver<AuthEvent>,
    active: Arc<AtomicUsize>,
    released: AtomicBool,
}

impl AuthSubscription {
    /// Receive the next event, in emit order. Returns `None` once the hub is
    /// gone. Lagged events are skipped, not replayed out of order.
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Auth subscription lagged; skipping missed events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Release the subscription. Idempotent.
    pub fn unsubscribe(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
