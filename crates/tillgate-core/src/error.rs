//! Error types for the login flow.
//!
//! `AuthError` is what a single credential check can fail with.
//! `LoginError` is what ends a whole login session. `CookieError` covers the
//! remembered-credential backends.

use thiserror::Error;

/// Failure of a single credential check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown user, wrong password, inactive account or no branch access
    #[error("{0}")]
    BadCredentials(String),

    /// The account's profile linkage is broken in the store
    #[error("{0}")]
    Profile(String),

    /// The account authenticated but has no profile set
    #[error("User '{username}' has no profile set")]
    MissingProfile { username: String },

    /// The backing store could not be reached
    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(String),
}

impl AuthError {
    pub fn bad_credentials() -> Self {
        AuthError::BadCredentials("Invalid user or password".to_string())
    }

    /// Errors the interactive loop answers with another prompt
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::BadCredentials(_) | AuthError::Profile(_))
    }
}

/// Terminal outcome of a login session other than success or cancellation.
#[derive(Error, Debug)]
pub enum LoginError {
    #[error("User '{username}' does not have a profile")]
    ProfileMisconfigured { username: String },

    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Depleted attempts of authentication")]
    AttemptsDepleted,

    /// The operator asked to leave the application from the prompt
    #[error("Quit requested at login")]
    QuitRequested,

    #[error("Login prompt failed: {0}")]
    Prompt(#[from] std::io::Error),
}

/// Failure of a remembered-credential backend.
#[derive(Error, Debug)]
pub enum CookieError {
    #[error("No remembered credentials")]
    NotFound,

    #[error("Cookie file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed cookie: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),
}

// ============================================================================
// Tests
// ============================================================================
