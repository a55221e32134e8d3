//! Data model — session payloads and the three persisted row shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimal identity-provider user, derived from a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Opaque identifier, stable for the session lifetime.
    pub id: String,
    pub email: String,
    /// Identity provider that created this user ("email", "google", ...).
    /// Absent when the provider sends no metadata; callers default to "email".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// An authenticated session issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub user: AuthUser,
}

/// Row in the `user_profiles` table, mirroring an identity-provider user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRow {
    /// Same id as the auth user.
    pub id: String,
    pub email: String,
    pub auth_provider: String,
}

/// The tenant entity, created once per onboarding run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub website_url: String,
    pub description: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Insert shape for `organizations` — the backend generates id/created_at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrganization {
    pub name: String,
    pub website_url: String,
    pub description: String,
    pub user_id: String,
}

/// Crawl status of a placeholder page row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    Scraped,
    InProgress,
    Pending,
}

impl std::fmt::Display for PageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Scraped => "scraped",
            Self::InProgress => "in_progress",
            Self::Pending => "pending",
        };
        write!(f, "{s}")
    }
}

/// Row in the `webpages` table. Not produced by any real crawl.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebPage {
    pub id: String,
    pub url: String,
    pub status: PageStatus,
    pub meta_description: String,
    pub org_id: String,
    pub created_at: DateTime<Utc>,
}

/// Insert shape for `webpages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWebPage {
    pub url: String,
    pub status: PageStatus,
    pub meta_description: String,
    pub org_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_status_display_matches_serde() {
        for status in [PageStatus::Scraped, PageStatus::InProgress, PageStatus::Pending] {
            let display = format!("{status}");
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(format!("\"{display}\""), json);
        }
    }

    #[test]
    fn auth_user_provider_defaults_to_none() {
        let user: AuthUser = serde_json::from_str(r#"{"id":"u1","email":"a@b.com"}"#).unwrap();
        assert_eq!(user.provider, None);
    }
}
