//! The `Backend` trait — single async interface for the entire remote
//! boundary (identity provider + tables).

use async_trait::async_trait;

use crate::error::BackendError;

use super::events::AuthSubscription;
use super::types::{AuthUser, NewOrganization, NewWebPage, Organization, ProfileRow, Session};

/// Opaque collaborator for everything remote. Implemented by [`super::RestBackend`]
/// for the hosted service and [`super::MemoryBackend`] for tests/offline use.
#[async_trait]
pub trait Backend: Send + Sync {
    // ── Auth ────────────────────────────────────────────────────────

    /// Credential sign-in. A success establishes the current session and
    /// emits a session-present auth event.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError>;

    /// Provider sign-up. Does not establish a session; the user signs in
    /// separately afterwards.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<AuthUser, BackendError>;

    /// Assemble the provider redirect URL for an OAuth flow. Pure URL
    /// assembly; the actual redirect happens outside this application.
    fn oauth_redirect_url(
        &self,
        provider: &str,
        redirect_to: &str,
        params: &[(&str, &str)],
    ) -> Result<String, BackendError>;

    /// The current session, if any.
    async fn current_session(&self) -> Option<Session>;

    /// Subscribe to auth-state-change events.
    fn subscribe_auth(&self) -> AuthSubscription;

    // ── Tables ──────────────────────────────────────────────────────

    /// Select a profile row by auth user id. At most one row.
    async fn profile_by_id(&self, id: &str) -> Result<Option<ProfileRow>, BackendError>;

    /// Select a profile row by email. At most one row.
    async fn profile_by_email(&self, email: &str) -> Result<Option<ProfileRow>, BackendError>;

    /// Insert a profile row.
    async fn insert_profile(&self, row: ProfileRow) -> Result<(), BackendError>;

    /// Insert an organization row and return it with its generated fields.
    async fn create_organization(
        &self,
        new: NewOrganization,
    ) -> Result<Organization, BackendError>;

    /// Insert a batch of webpage rows.
    async fn insert_pages(&self, pages: Vec<NewWebPage>) -> Result<(), BackendError>;
}
