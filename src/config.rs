//! Configuration types.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Application configuration, built from `ONBOARD_*` environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the hosted backend project (auth + REST).
    pub backend_url: String,
    /// Public (anon) API key for the backend.
    pub anon_key: SecretString,
    /// Redirect target for the OAuth flow.
    pub oauth_redirect: String,
    /// Base URL the widget script tag points at.
    pub widget_base: String,
}

impl AppConfig {
    /// Build config from environment variables.
    ///
    /// `ONBOARD_BACKEND_URL` and `ONBOARD_ANON_KEY` are required; the rest
    /// have defaults matching the hosted widget deployment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend_url = std::env::var("ONBOARD_BACKEND_URL")
            .map_err(|_| ConfigError::MissingEnvVar("ONBOARD_BACKEND_URL".into()))?
            .trim_end_matches('/')
            .to_string();

        let anon_key = std::env::var("ONBOARD_ANON_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("ONBOARD_ANON_KEY".into()))?;

        let oauth_redirect = std::env::var("ONBOARD_OAUTH_REDIRECT")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let widget_base = std::env::var("ONBOARD_WIDGET_BASE")
            .unwrap_or_else(|_| "https://chatbot.example.com/widget".to_string());

        Ok(Self {
            backend_url,
            anon_key: SecretString::from(anon_key),
            oauth_redirect,
            widget_base,
        })
    }
}
