//! In-memory backend — scripted auth outcomes and in-process tables for
//! tests and offline runs.
//!
//! Ids are deterministic (`user1`, `org1`, `page1`, ...) and every operation
//! is counted, so tests can assert things like "no provider sign-up call
//! occurred".

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::RwLock;

use crate::error::BackendError;

use super::events::{AuthEvent, AuthEventHub, AuthSubscription};
use super::traits::Backend;
use super::types::{
    AuthUser, NewOrganization, NewWebPage, Organization, ProfileRow, Session, WebPage,
};

#[derive(Debug, Clone)]
struct Account {
    user_id: String,
    password: String,
}

#[derive(Default)]
struct Tables {
    profiles: Vec<ProfileRow>,
    organizations: Vec<Organization>,
    pages: Vec<WebPage>,
}

/// Per-operation call counters.
#[derive(Default)]
struct Calls {
    sign_in: AtomicUsize,
    sign_up: AtomicUsize,
    profile_insert: AtomicUsize,
}

/// In-memory implementation of [`Backend`].
#[derive(Default)]
pub struct MemoryBackend {
    accounts: RwLock<HashMap<String, Account>>,
    tables: RwLock<Tables>,
    session: RwLock<Option<Session>>,
    hub: AuthEventHub,
    next_user: AtomicUsize,
    next_org: AtomicUsize,
    next_page: AtomicUsize,
    calls: Calls,
    fail_org_insert: AtomicBool,
    fail_page_insert: AtomicBool,
    fail_profile_insert: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(counter: &AtomicUsize, prefix: &str) -> String {
        format!("{prefix}{}", counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn make_session(user: AuthUser) -> Session {
        Session {
            access_token: format!("token-{}", user.id),
            refresh_token: None,
            user,
        }
    }

    /// Seed a provider account. Returns the generated user id.
    pub async fn add_account(&self, email: &str, password: &str) -> String {
        let user_id = Self::next_id(&self.next_user, "user");
        self.accounts.write().await.insert(
            email.to_string(),
            Account {
                user_id: user_id.clone(),
                password: password.to_string(),
            },
        );
        user_id
    }

    /// Establish a session for a seeded account without credentials, as an
    /// OAuth redirect would, and emit the session-present event.
    pub async fn establish_session(&self, email: &str, provider: &str) -> Session {
        let user_id = {
            let accounts = self.accounts.read().await;
            accounts
                .get(email)
                .map(|a| a.user_id.clone())
                .unwrap_or_else(|| "user-oauth".to_string())
        };
        let session = Self::make_session(AuthUser {
            id: user_id,
            email: email.to_string(),
            provider: Some(provider.to_string()),
        });
        *self.session.write().await = Some(session.clone());
        self.hub.emit(Some(session.clone()));
        session
    }

    /// Emit a raw auth event (tests drive the bootstrap watcher with this).
    pub fn emit_auth_event(&self, event: AuthEvent) {
        self.hub.emit(event);
    }

    pub fn auth_hub(&self) -> &AuthEventHub {
        &self.hub
    }

    // ── Scripted failures ───────────────────────────────────────────

    pub fn set_fail_org_insert(&self, fail: bool) {
        self.fail_org_insert.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_page_insert(&self, fail: bool) {
        self.fail_page_insert.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_profile_insert(&self, fail: bool) {
        self.fail_profile_insert.store(fail, Ordering::SeqCst);
    }

    // ── Introspection for tests ─────────────────────────────────────

    pub fn sign_in_calls(&self) -> usize {
        self.calls.sign_in.load(Ordering::SeqCst)
    }

    pub fn sign_up_calls(&self) -> usize {
        self.calls.sign_up.load(Ordering::SeqCst)
    }

    pub fn profile_insert_calls(&self) -> usize {
        self.calls.profile_insert.load(Ordering::SeqCst)
    }

    pub async fn profiles(&self) -> Vec<ProfileRow> {
        self.tables.read().await.profiles.clone()
    }

    pub async fn organizations(&self) -> Vec<Organization> {
        self.tables.read().await.organizations.clone()
    }

    pub async fn pages(&self) -> Vec<WebPage> {
        self.tables.read().await.pages.clone()
    }

    fn scripted_failure(table: &str) -> BackendError {
        BackendError::Api {
            status: 500,
            message: format!("scripted failure inserting into {table}"),
        }
    }
}

#[async_trait::async_trait]
impl Backend for MemoryBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        self.calls.sign_in.fetch_add(1, Ordering::SeqCst);

        let user_id = {
            let accounts = self.accounts.read().await;
            match accounts.get(email) {
                Some(account) if account.password == password => account.user_id.clone(),
                _ => {
                    return Err(BackendError::Auth {
                        message: "Invalid login credentials".into(),
                    });
                }
            }
        };

        let session = Self::make_session(AuthUser {
            id: user_id,
            email: email.to_string(),
            provider: Some("email".to_string()),
        });
        *self.session.write().await = Some(session.clone());
        self.hub.emit(Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _metadata: serde_json::Value,
    ) -> Result<AuthUser, BackendError> {
        self.calls.sign_up.fetch_add(1, Ordering::SeqCst);

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(email) {
            return Err(BackendError::Auth {
                message: "User already registered".into(),
            });
        }

        let user_id = Self::next_id(&self.next_user, "user");
        accounts.insert(
            email.to_string(),
            Account {
                user_id: user_id.clone(),
                password: password.to_string(),
            },
        );

        Ok(AuthUser {
            id: user_id,
            email: email.to_string(),
            provider: Some("email".to_string()),
        })
    }

    fn oauth_redirect_url(
        &self,
        provider: &str,
        redirect_to: &str,
        params: &[(&str, &str)],
    ) -> Result<String, BackendError> {
        let mut url = format!(
            "memory://authorize?provider={provider}&redirect_to={redirect_to}"
        );
        for (key, value) in params {
            url.push_str(&format!("&{key}={value}"));
        }
        Ok(url)
    }

    async fn current_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    fn subscribe_auth(&self) -> AuthSubscription {
        self.hub.subscribe()
    }

    async fn profile_by_id(&self, id: &str) -> Result<Option<ProfileRow>, BackendError> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn profile_by_email(&self, email: &str) -> Result<Option<ProfileRow>, BackendError> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.iter().find(|p| p.email == email).cloned())
    }

    async fn insert_profile(&self, row: ProfileRow) -> Result<(), BackendError> {
        self.calls.profile_insert.fetch_add(1, Ordering::SeqCst);
        if self.fail_profile_insert.load(Ordering::SeqCst) {
            return Err(Self::scripted_failure("user_profiles"));
        }
        self.tables.write().await.profiles.push(row);
        Ok(())
    }

    async fn create_organization(
        &self,
        new: NewOrganization,
    ) -> Result<Organization, BackendError> {
        if self.fail_org_insert.load(Ordering::SeqCst) {
            return Err(Self::scripted_failure("organizations"));
        }
        let org = Organization {
            id: Self::next_id(&self.next_org, "org"),
            name: new.name,
            website_url: new.website_url,
            description: new.description,
            user_id: new.user_id,
            created_at: chrono::Utc::now(),
        };
        self.tables.write().await.organizations.push(org.clone());
        Ok(org)
    }

    async fn insert_pages(&self, pages: Vec<NewWebPage>) -> Result<(), BackendError> {
        if self.fail_page_insert.load(Ordering::SeqCst) {
            return Err(Self::scripted_failure("webpages"));
        }
        let mut tables = self.tables.write().await;
        for page in pages {
            tables.pages.push(WebPage {
                id: Self::next_id(&self.next_page, "page"),
                url: page.url,
                status: page.status,
                meta_description: page.meta_description,
                org_id: page.org_id,
                created_at: chrono::Utc::now(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_in_requires_matching_credentials() {
        let backend = MemoryBackend::new();
        backend.add_account("a@b.com", "secret1").await;

        let err = backend
            .sign_in_with_password("a@b.com", "wrong")
            .await
            .unwrap_err();
        assert!(err.is_invalid_credentials());

        let session = backend
            .sign_in_with_password("a@b.com", "secret1")
            .await
            .unwrap();
        assert_eq!(session.user.email, "a@b.com");
        assert_eq!(backend.sign_in_calls(), 2);
    }

    #[tokio::test]
    async fn sign_in_emits_session_event() {
        let backend = MemoryBackend::new();
        backend.add_account("a@b.com", "secret1").await;
        let mut sub = backend.subscribe_auth();

        backend
            .sign_in_with_password("a@b.com", "secret1")
            .await
            .unwrap();

        let event = sub.recv().await.unwrap();
        assert_eq!(event.unwrap().user.email, "a@b.com");
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_already_registered() {
        let backend = MemoryBackend::new();
        backend.add_account("a@b.com", "secret1").await;

        let err = backend
            .sign_up("a@b.com", "other", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.is_already_registered());
    }

    #[tokio::test]
    async fn organization_ids_are_sequential() {
        let backend = MemoryBackend::new();
        let new = |name: &str| NewOrganization {
            name: name.into(),
            website_url: "https://acme.io".into(),
            description: "desc".into(),
            user_id: "user1".into(),
        };
        assert_eq!(backend.create_organization(new("a")).await.unwrap().id, "org1");
        assert_eq!(backend.create_organization(new("b")).await.unwrap().id, "org2");
    }

    #[tokio::test]
    async fn scripted_page_failure() {
        let backend = MemoryBackend::new();
        backend.set_fail_page_insert(true);

        let err = backend
            .insert_pages(vec![NewWebPage {
                url: "https://acme.io/home".into(),
                status: crate::backend::types::PageStatus::Scraped,
                meta_description: "Home page of the website".into(),
                org_id: "org1".into(),
            }])
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Api { status: 500, .. }));
        assert!(backend.pages().await.is_empty());
    }
}
