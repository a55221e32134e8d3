//! Auth step — credential sign-in, sign-up, and the OAuth redirect.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::backend::Backend;
use crate::backend::types::ProfileRow;
use crate::error::ValidationError;
use crate::notify::{Notice, Notifier};
use crate::wizard::state::WizardAction;

const MSG_SIGNED_IN: &str = "Successfully signed in!";
const MSG_INVALID_CREDENTIALS: &str = "Invalid email or password. Please try again.";
const MSG_SIGN_IN_FAILED: &str = "Failed to sign in. Please try again.";
const MSG_ALREADY_EXISTS: &str =
    "An account with this email already exists. Please sign in instead.";
const MSG_SIGN_UP_FAILED: &str = "Failed to sign up. Please try again.";
const MSG_SIGNED_UP: &str = "Account created successfully! You can now sign in.";
const MSG_OAUTH_FAILED: &str = "Failed to sign in with Google. Please try again.";

const MIN_PASSWORD_LEN: usize = 6;

/// Controller for the auth step. Each operation is guarded by a busy flag
/// that rejects re-entry until the call settles.
pub struct AuthStep {
    backend: Arc<dyn Backend>,
    notifier: Arc<dyn Notifier>,
    oauth_redirect: String,
    busy: AtomicBool,
}

impl AuthStep {
    pub fn new(
        backend: Arc<dyn Backend>,
        notifier: Arc<dyn Notifier>,
        oauth_redirect: String,
    ) -> Self {
        Self {
            backend,
            notifier,
            oauth_redirect,
            busy: AtomicBool::new(false),
        }
    }

    /// Whether an operation is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    fn try_begin(&self) -> Option<BusyGuard<'_>> {
        if self.busy.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(BusyGuard(&self.busy))
        }
    }

    /// Credential sign-in. Returns the completion action on success, `None`
    /// when the attempt failed (or was rejected because another operation is
    /// in flight) — the outcome is reported through the notifier either way.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<WizardAction>, ValidationError> {
        validate_credentials(email, password)?;
        let Some(_guard) = self.try_begin() else {
            return Ok(None);
        };

        match self.backend.sign_in_with_password(email, password).await {
            Ok(session) => {
                self.notifier.notify(Notice::success(MSG_SIGNED_IN));
                Ok(Some(WizardAction::AuthSucceeded { user: session.user }))
            }
            Err(e) => {
                if e.is_invalid_credentials() {
                    self.notifier.notify(Notice::error(MSG_INVALID_CREDENTIALS));
                } else {
                    warn!(error = %e, "Sign-in failed");
                    self.notifier.notify(Notice::error(MSG_SIGN_IN_FAILED));
                }
                Ok(None)
            }
        }
    }

    /// Sign-up. Checks for an existing profile first so a duplicate email
    /// never reaches the provider. Returns whether an account was created.
    /// Never advances the wizard — the user signs in separately afterwards.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<bool, ValidationError> {
        validate_credentials(email, password)?;
        let Some(_guard) = self.try_begin() else {
            return Ok(false);
        };

        let existing = match self.backend.profile_by_email(email).await {
            Ok(existing) => existing,
            Err(e) => {
                // A failed lookup is treated as absent; the provider's own
                // duplicate check below still catches true duplicates.
                warn!(error = %e, "Profile lookup failed during sign-up");
                None
            }
        };
        if existing.is_some() {
            self.notifier.notify(Notice::error(MSG_ALREADY_EXISTS));
            return Ok(false);
        }

        let metadata = serde_json::json!({ "email": email });
        let user = match self.backend.sign_up(email, password, metadata).await {
            Ok(user) => user,
            Err(e) => {
                if e.is_already_registered() {
                    self.notifier.notify(Notice::error(MSG_ALREADY_EXISTS));
                } else {
                    warn!(error = %e, "Sign-up failed");
                    self.notifier.notify(Notice::error(MSG_SIGN_UP_FAILED));
                }
                return Ok(false);
            }
        };

        let row = ProfileRow {
            id: user.id.clone(),
            email: user.email.clone(),
            auth_provider: "email".to_string(),
        };
        if let Err(e) = self.backend.insert_profile(row).await {
            warn!(user_id = %user.id, error = %e, "Profile insert failed after sign-up");
            self.notifier.notify(Notice::error(MSG_SIGN_UP_FAILED));
            return Ok(false);
        }

        info!(user_id = %user.id, "Account created");
        self.notifier.notify(Notice::success(MSG_SIGNED_UP));
        Ok(true)
    }

    /// Build the Google OAuth redirect URL. The presentation layer hands it
    /// to the user; the redirect itself happens outside this application.
    pub fn oauth_sign_in(&self) -> Option<String> {
        match self.backend.oauth_redirect_url(
            "google",
            &self.oauth_redirect,
            &[("access_type", "offline"), ("prompt", "consent")],
        ) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(error = %e, "OAuth URL assembly failed");
                self.notifier.notify(Notice::error(MSG_OAUTH_FAILED));
                None
            }
        }
    }
}

/// Resets the busy flag when the operation settles, on every path.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Form-level validation. Failures never reach the network.
fn validate_credentials(email: &str, password: &str) -> Result<(), ValidationError> {
    validate_email(email)?;
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::Required { field: "email" });
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(ValidationError::InvalidEmail {
            value: email.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::notify::RecordingNotifier;

    fn step(backend: Arc<MemoryBackend>, notifier: Arc<RecordingNotifier>) -> AuthStep {
        AuthStep::new(backend, notifier, "http://localhost:3000".to_string())
    }

    #[test]
    fn email_validation() {
        assert!(validate_email("a@b.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@b.com").is_err());
        assert!(validate_email("a@nodot").is_err());
        assert!(validate_email("a@.com").is_err());
    }

    #[test]
    fn password_validation() {
        assert!(validate_credentials("a@b.com", "secret1").is_ok());
        assert!(matches!(
            validate_credentials("a@b.com", "short"),
            Err(ValidationError::PasswordTooShort { min: 6 })
        ));
    }

    #[tokio::test]
    async fn busy_flag_resets_after_failure() {
        let backend = Arc::new(MemoryBackend::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let auth = step(backend, notifier);

        assert!(auth.sign_in("a@b.com", "secret1").await.unwrap().is_none());
        assert!(!auth.is_busy());
        // A second attempt is accepted once the first has settled.
        assert!(auth.sign_in("a@b.com", "secret1").await.unwrap().is_none());
        assert!(!auth.is_busy());
    }

    #[tokio::test]
    async fn oauth_url_reports_consent_params() {
        let backend = Arc::new(MemoryBackend::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let auth = step(backend, notifier.clone());

        let url = auth.oauth_sign_in().unwrap();
        assert!(url.contains("provider=google"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(notifier.notices().is_empty());
    }
}
