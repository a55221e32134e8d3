//! Error types for the onboarding wizard.

/// Top-level error type for the wizard.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Clipboard error: {0}")]
    Clipboard(#[from] ClipboardError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from the hosted backend (auth + tables).
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Identity-provider failure. The message carries the provider's own
    /// wording so callers can classify it ("Invalid login credentials",
    /// "already registered").
    #[error("Auth failed: {message}")]
    Auth { message: String },

    /// Non-2xx response from a table endpoint.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body did not match the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl BackendError {
    /// Whether this is the provider's invalid-credentials rejection.
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, Self::Auth { message } if message.contains("Invalid login credentials"))
    }

    /// Whether this is the provider's duplicate-account rejection.
    pub fn is_already_registered(&self) -> bool {
        matches!(self, Self::Auth { message } if message.contains("already registered"))
    }
}

/// Client-side form validation errors. These never reach the network.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("Invalid email address: {value}")]
    InvalidEmail { value: String },

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("Invalid website URL: {reason}")]
    InvalidUrl { reason: String },
}

/// Clipboard access errors.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ClipboardError(pub String);

/// Result type alias for the wizard.
pub type Result<T> = std::result::Result<T, Error>;
