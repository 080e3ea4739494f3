//! Authentication module for station operators.
//!
//! This module provides:
//! - `AuthenticationSession`: cookie login and the bounded interactive login loop
//! - `CredentialStore`: account lookup and verification, with a JSON file backend
//! - `CookieStore`: remembered credentials, in a file or the OS keychain
//! - `PromptUi`: the capability the session uses to ask for credentials
//! - `CurrentUser`: the authenticated identity handed to the rest of the application

pub mod context;
pub mod cookie;
pub mod credentials;
pub mod prompt;
pub mod session;

pub use context::CurrentUser;
pub use cookie::{CookieStore, FileCookieStore, KeyringCookieStore, RememberedCookie};
pub use credentials::{CredentialStore, JsonCredentialStore};
pub use prompt::{PromptRequest, PromptResponse, PromptUi, Submission};
pub use session::{AuthResult, AuthenticationSession, RetryState, MAX_ATTEMPTS};
