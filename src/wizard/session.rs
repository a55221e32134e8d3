//! Session bootstrap — initial session fetch plus the long-lived
//! auth-event watcher.
//!
//! The watcher owns the application's single tracked resource, the auth
//! subscription. It is released exactly once on every exit path: explicit
//! stop, hub closure, or the action channel going away.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::backend::Backend;
use crate::backend::types::{AuthUser, ProfileRow, Session};
use crate::wizard::state::WizardAction;

/// Starts the bootstrap and hands back a teardown handle.
pub struct SessionBootstrap;

/// Handle for the running watcher task. Dropping it without calling
/// [`stop`](Self::stop) aborts nothing — the task keeps running until the
/// hub or action channel closes — so teardown paths call `stop`.
pub struct BootstrapHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<()>,
}

impl BootstrapHandle {
    /// Stop the watcher and wait for it to release its subscription.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }
}

impl SessionBootstrap {
    /// Query the current session once, then watch auth-state changes for the
    /// lifetime of the returned handle. Actions flow out on `actions`.
    pub async fn start(
        backend: Arc<dyn Backend>,
        actions: mpsc::UnboundedSender<WizardAction>,
    ) -> BootstrapHandle {
        // Subscribe before the initial fetch so an event firing in between
        // is not lost. Both paths produce identical actions, so the race in
        // the other direction is harmless.
        let mut sub = backend.subscribe_auth();

        if let Some(session) = backend.current_session().await {
            info!(user_id = %session.user.id, "Existing session found on startup");
            let _ = actions.send(WizardAction::SessionEstablished {
                user: session.user,
            });
        }

        let (stop_tx, mut stop_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    event = sub.recv() => match event {
                        Some(Some(session)) => {
                            ensure_profile(backend.as_ref(), &session).await;
                            let action = WizardAction::SessionEstablished {
                                user: session.user,
                            };
                            if actions.send(action).is_err() {
                                break;
                            }
                        }
                        Some(None) => {
                            if actions.send(WizardAction::SignedOut).is_err() {
                                break;
                            }
                        }
                        // Hub dropped — nothing more will arrive.
                        None => break,
                    }
                }
            }
            sub.unsubscribe();
        });

        BootstrapHandle {
            stop_tx: Some(stop_tx),
            task,
        }
    }
}

/// Ensure a profile row exists for the session's user. OAuth users reach
/// this with no prior sign-up, so the row is created here on first login.
async fn ensure_profile(backend: &dyn Backend, session: &Session) {
    let user = &session.user;
    let existing = match backend.profile_by_id(&user.id).await {
        Ok(existing) => existing,
        Err(e) => {
            // Treat a failed lookup as absent and try the insert anyway.
            warn!(user_id = %user.id, error = %e, "Profile lookup failed");
            None
        }
    };
    if existing.is_some() {
        return;
    }

    let row = ProfileRow {
        id: user.id.clone(),
        email: user.email.clone(),
        auth_provider: provider_of(user),
    };
    if let Err(e) = backend.insert_profile(row).await {
        warn!(user_id = %user.id, error = %e, "Profile insert failed");
    } else {
        info!(user_id = %user.id, "Created profile row on first login");
    }
}

fn provider_of(user: &AuthUser) -> String {
    user.provider.clone().unwrap_or_else(|| "email".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    async fn recv_action(
        rx: &mut mpsc::UnboundedReceiver<WizardAction>,
    ) -> WizardAction {
        tokio::time::timeout(std::time::Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for action")
            .expect("action channel closed")
    }

    #[tokio::test]
    async fn initial_session_produces_established_action() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_account("a@b.com", "secret1").await;
        backend.establish_session("a@b.com", "google").await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = SessionBootstrap::start(backend.clone(), tx).await;

        // Both the initial fetch and the emitted event yield the same action.
        let first = recv_action(&mut rx).await;
        match first {
            WizardAction::SessionEstablished { user } => assert_eq!(user.email, "a@b.com"),
            other => panic!("expected SessionEstablished, got {other:?}"),
        }

        handle.stop().await;
        assert_eq!(backend.auth_hub().active_subscribers(), 0);
    }

    #[tokio::test]
    async fn oauth_first_login_creates_profile_row() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_account("oauth@b.com", "unused").await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = SessionBootstrap::start(backend.clone(), tx).await;

        backend.establish_session("oauth@b.com", "google").await;
        recv_action(&mut rx).await;

        let profiles = backend.profiles().await;
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].email, "oauth@b.com");
        assert_eq!(profiles[0].auth_provider, "google");

        handle.stop().await;
    }

    #[tokio::test]
    async fn duplicate_events_insert_profile_once() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_account("a@b.com", "secret1").await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = SessionBootstrap::start(backend.clone(), tx).await;

        let session = backend.establish_session("a@b.com", "email").await;
        backend.emit_auth_event(Some(session));

        let first = recv_action(&mut rx).await;
        let second = recv_action(&mut rx).await;
        assert_eq!(first, second);
        assert_eq!(backend.profile_insert_calls(), 1);

        handle.stop().await;
    }

    #[tokio::test]
    async fn sign_out_event_produces_signed_out() {
        let backend = Arc::new(MemoryBackend::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = SessionBootstrap::start(backend.clone(), tx).await;

        backend.emit_auth_event(None);
        assert_eq!(recv_action(&mut rx).await, WizardAction::SignedOut);

        handle.stop().await;
    }

    #[tokio::test]
    async fn subscription_released_once_even_on_immediate_stop() {
        let backend = Arc::new(MemoryBackend::new());
        let (tx, _rx) = mpsc::unbounded_channel();

        let handle = SessionBootstrap::start(backend.clone(), tx).await;
        assert_eq!(backend.auth_hub().active_subscribers(), 1);

        handle.stop().await;
        assert_eq!(backend.auth_hub().active_subscribers(), 0);
    }
}
