//! Core library for tillgate.
//!
//! Provides the station login flow for a point-of-sale terminal:
//!
//! - `auth`: the `AuthenticationSession` state machine and the collaborator
//!   traits it drives (`CredentialStore`, `CookieStore`, `PromptUi`)
//! - `models`: operator accounts, profiles and stations
//! - `password`: password digests and legacy cookie detection
//! - `config`: on-disk application configuration

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod password;

pub use auth::{
    AuthenticationSession, CookieStore, CredentialStore, CurrentUser, PromptResponse, PromptUi,
};
pub use config::Config;
pub use error::{AuthError, CookieError, LoginError};
