//! REST backend — talks to the hosted service's auth and table endpoints.
//!
//! Auth lives under `/auth/v1`, tables under `/rest/v1/<table>` with
//! PostgREST-style filters. Every request carries the project `apikey`;
//! table requests additionally carry a bearer token (the session's access
//! token once signed in, the anon key before that). The current session is
//! held in memory only — there is no local persistence.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::BackendError;

use super::events::{AuthEventHub, AuthSubscription};
use super::traits::Backend;
use super::types::{AuthUser, NewOrganization, NewWebPage, Organization, ProfileRow, Session};

/// Backend client for the hosted auth/database service.
pub struct RestBackend {
    base_url: String,
    anon_key: SecretString,
    client: reqwest::Client,
    session: RwLock<Option<Session>>,
    hub: AuthEventHub,
}

/// Wire shape of `/auth/v1/token` and `/auth/v1/signup` user payloads.
#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
    email: String,
    #[serde(default)]
    app_metadata: Option<WireAppMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct WireAppMetadata {
    #[serde(default)]
    provider: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireTokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    user: WireUser,
}

/// Wire shape of auth error bodies. The service uses both
/// `error_description` (token endpoint) and `msg` (signup endpoint).
#[derive(Debug, Default, Deserialize)]
struct WireAuthError {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

impl From<WireUser> for AuthUser {
    fn from(user: WireUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            provider: user.app_metadata.and_then(|m| m.provider),
        }
    }
}

impl RestBackend {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            client: reqwest::Client::new(),
            session: RwLock::new(None),
            hub: AuthEventHub::new(),
        }
    }

    fn auth_url(&self, endpoint: &str) -> String {
        format!("{}/auth/v1/{endpoint}", self.base_url)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    /// Bearer token for table requests: session access token once signed in,
    /// anon key before that.
    async fn bearer(&self) -> String {
        let session = self.session.read().await;
        match session.as_ref() {
            Some(s) => s.access_token.clone(),
            None => self.anon_key.expose_secret().to_string(),
        }
    }

    /// Extract the provider's message from an auth error body.
    async fn auth_error(resp: reqwest::Response) -> BackendError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let parsed: WireAuthError = serde_json::from_str(&body).unwrap_or_default();
        let message = parsed
            .error_description
            .or(parsed.msg)
            .unwrap_or_else(|| format!("auth endpoint returned status {status}"));
        BackendError::Auth { message }
    }

    /// Map a non-2xx table response into an API error.
    async fn api_error(resp: reqwest::Response) -> BackendError {
        let status = resp.status().as_u16();
        let message = resp.text().await.unwrap_or_default();
        BackendError::Api { status, message }
    }

    /// Select at most one row from `table` where `column = eq.value`.
    async fn select_one<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        column: &str,
        value: &str,
    ) -> Result<Option<T>, BackendError> {
        let filter = format!("eq.{value}");
        let resp = self
            .client
            .get(self.table_url(table))
            .query(&[("select", "*"), (column, filter.as_str()), ("limit", "1")])
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(self.bearer().await)
            .send()
            .await
            .map_err(|e| BackendError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }

        let mut rows: Vec<T> = resp
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.remove(0))
        })
    }

    /// Insert rows into `table`. `returning` asks the service to echo the
    /// created rows back in the response body.
    async fn insert<B: serde::Serialize>(
        &self,
        table: &str,
        body: &B,
        returning: bool,
    ) -> Result<reqwest::Response, BackendError> {
        let prefer = if returning {
            "return=representation"
        } else {
            "return=minimal"
        };
        let resp = self
            .client
            .post(self.table_url(table))
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(self.bearer().await)
            .header("Prefer", prefer)
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }
        Ok(resp)
    }
}

#[async_trait::async_trait]
impl Backend for RestBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        let resp = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", self.anon_key.expose_secret())
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| BackendError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Self::auth_error(resp).await);
        }

        let token: WireTokenResponse = resp
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        let session = Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            user: token.user.into(),
        };

        info!(user_id = %session.user.id, "Signed in");
        *self.session.write().await = Some(session.clone());
        // The hosted SDK fires SIGNED_IN client-side after a password
        // sign-in; mirror that so the bootstrap watcher sees it too.
        self.hub.emit(Some(session.clone()));

        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<AuthUser, BackendError> {
        let resp = self
            .client
            .post(self.auth_url("signup"))
            .header("apikey", self.anon_key.expose_secret())
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": metadata,
            }))
            .send()
            .await
            .map_err(|e| BackendError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Self::auth_error(resp).await);
        }

        let user: WireUser = resp
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        info!(user_id = %user.id, "Signed up");
        Ok(user.into())
    }

    fn oauth_redirect_url(
        &self,
        provider: &str,
        redirect_to: &str,
        params: &[(&str, &str)],
    ) -> Result<String, BackendError> {
        let mut url = url::Url::parse(&self.auth_url("authorize"))
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("provider", provider);
            pairs.append_pair("redirect_to", redirect_to);
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        debug!(provider, "Assembled OAuth redirect URL");
        Ok(url.into())
    }

    async fn current_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    fn subscribe_auth(&self) -> AuthSubscription {
        self.hub.subscribe()
    }

    async fn profile_by_id(&self, id: &str) -> Result<Option<ProfileRow>, BackendError> {
        self.select_one("user_profiles", "id", id).await
    }

    async fn profile_by_email(&self, email: &str) -> Result<Option<ProfileRow>, BackendError> {
        self.select_one("user_profiles", "email", email).await
    }

    async fn insert_profile(&self, row: ProfileRow) -> Result<(), BackendError> {
        self.insert("user_profiles", &vec![row], false).await?;
        Ok(())
    }

    async fn create_organization(
        &self,
        new: NewOrganization,
    ) -> Result<Organization, BackendError> {
        let resp = self.insert("organizations", &vec![new], true).await?;
        let mut rows: Vec<Organization> = resp
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        if rows.is_empty() {
            return Err(BackendError::Decode(
                "insert returned no representation".into(),
            ));
        }
        Ok(rows.remove(0))
    }

    async fn insert_pages(&self, pages: Vec<NewWebPage>) -> Result<(), BackendError> {
        self.insert("webpages", &pages, false).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::PageStatus;

    fn backend_for(server: &mockito::ServerGuard) -> RestBackend {
        let config = AppConfig {
            backend_url: server.url(),
            anon_key: SecretString::from("anon-key"),
            oauth_redirect: "http://localhost:3000".into(),
            widget_base: "https://chatbot.example.com/widget".into(),
        };
        RestBackend::new(&config)
    }

    #[tokio::test]
    async fn sign_in_stores_session_and_emits_event() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/v1/token")
            .match_query(mockito::Matcher::UrlEncoded(
                "grant_type".into(),
                "password".into(),
            ))
            .match_header("apikey", "anon-key")
            .with_status(200)
            .with_body(
                r#"{
                    "access_token": "jwt",
                    "refresh_token": "refresh",
                    "user": {"id": "u1", "email": "a@b.com", "app_metadata": {"provider": "email"}}
                }"#,
            )
            .create_async()
            .await;

        let backend = backend_for(&server);
        let mut sub = backend.subscribe_auth();

        let session = backend
            .sign_in_with_password("a@b.com", "secret1")
            .await
            .unwrap();
        assert_eq!(session.user.id, "u1");
        assert_eq!(session.user.provider.as_deref(), Some("email"));

        // Session is held and the SIGNED_IN event fired.
        assert_eq!(backend.current_session().await.unwrap().user.id, "u1");
        let event = sub.recv().await.unwrap();
        assert_eq!(event.unwrap().user.id, "u1");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn sign_in_failure_carries_provider_wording() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/token")
            .match_query(mockito::Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)
            .create_async()
            .await;

        let backend = backend_for(&server);
        let err = backend
            .sign_in_with_password("a@b.com", "wrong")
            .await
            .unwrap_err();
        assert!(err.is_invalid_credentials());
        assert!(backend.current_session().await.is_none());
    }

    #[tokio::test]
    async fn sign_up_conflict_maps_to_already_registered() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/signup")
            .with_status(422)
            .with_body(r#"{"code":422,"msg":"User already registered"}"#)
            .create_async()
            .await;

        let backend = backend_for(&server);
        let err = backend
            .sign_up("a@b.com", "secret1", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.is_already_registered());
    }

    #[tokio::test]
    async fn profile_by_email_uses_eq_filter() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/user_profiles")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("select".into(), "*".into()),
                mockito::Matcher::UrlEncoded("email".into(), "eq.a@b.com".into()),
                mockito::Matcher::UrlEncoded("limit".into(), "1".into()),
            ]))
            .match_header("apikey", "anon-key")
            .with_status(200)
            .with_body(r#"[{"id":"u1","email":"a@b.com","auth_provider":"email"}]"#)
            .create_async()
            .await;

        let backend = backend_for(&server);
        let profile = backend.profile_by_email("a@b.com").await.unwrap().unwrap();
        assert_eq!(profile.id, "u1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn profile_by_id_empty_result_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/user_profiles")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let backend = backend_for(&server);
        assert!(backend.profile_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_organization_returns_representation() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1/organizations")
            .match_header("Prefer", "return=representation")
            .with_status(201)
            .with_body(
                r#"[{
                    "id": "org1",
                    "name": "Acme",
                    "website_url": "https://acme.io",
                    "description": "desc",
                    "user_id": "u1",
                    "created_at": "2026-01-01T00:00:00Z"
                }]"#,
            )
            .create_async()
            .await;

        let backend = backend_for(&server);
        let org = backend
            .create_organization(NewOrganization {
                name: "Acme".into(),
                website_url: "https://acme.io".into(),
                description: "desc".into(),
                user_id: "u1".into(),
            })
            .await
            .unwrap();
        assert_eq!(org.id, "org1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn insert_pages_posts_batch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1/webpages")
            .match_header("Prefer", "return=minimal")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!([
                {"url": "https://acme.io/home", "status": "scraped"},
                {"url": "https://acme.io/about", "status": "in_progress"},
                {"url": "https://acme.io/contact", "status": "pending"}
            ])))
            .with_status(201)
            .create_async()
            .await;

        let backend = backend_for(&server);
        let pages = vec![
            NewWebPage {
                url: "https://acme.io/home".into(),
                status: PageStatus::Scraped,
                meta_description: "Home page of the website".into(),
                org_id: "org1".into(),
            },
            NewWebPage {
                url: "https://acme.io/about".into(),
                status: PageStatus::InProgress,
                meta_description: "About page".into(),
                org_id: "org1".into(),
            },
            NewWebPage {
                url: "https://acme.io/contact".into(),
                status: PageStatus::Pending,
                meta_description: "Contact page".into(),
                org_id: "org1".into(),
            },
        ];
        backend.insert_pages(pages).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn failed_insert_maps_to_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/rest/v1/user_profiles")
            .with_status(409)
            .with_body("duplicate key value violates unique constraint")
            .create_async()
            .await;

        let backend = backend_for(&server);
        let err = backend
            .insert_profile(ProfileRow {
                id: "u1".into(),
                email: "a@b.com".into(),
                auth_provider: "email".into(),
            })
            .await
            .unwrap_err();
        match err {
            BackendError::Api { status, .. } => assert_eq!(status, 409),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn oauth_url_carries_fixed_consent_params() {
        let config = AppConfig {
            backend_url: "https://proj.example.co".into(),
            anon_key: SecretString::from("anon-key"),
            oauth_redirect: "http://localhost:3000".into(),
            widget_base: "https://chatbot.example.com/widget".into(),
        };
        let backend = RestBackend::new(&config);

        let url = backend
            .oauth_redirect_url(
                "google",
                "http://localhost:3000",
                &[("access_type", "offline"), ("prompt", "consent")],
            )
            .unwrap();

        assert!(url.starts_with("https://proj.example.co/auth/v1/authorize?"));
        assert!(url.contains("provider=google"));
        assert!(url.contains("redirect_to=http%3A%2F%2Flocalhost%3A3000"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
    }
}
