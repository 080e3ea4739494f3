//! The station login flow.
//!
//! `AuthenticationSession` first tries a remembered cookie, then a single
//! default admin account with a blank password, and finally a bounded
//! interactive prompt loop.

use tracing::{debug, info, warn};

use super::context::CurrentUser;
use super::cookie::CookieStore;
use super::credentials::CredentialStore;
use super::prompt::{PromptRequest, PromptResponse, PromptUi, Submission};
use crate::error::{AuthError, CookieError, LoginError};
use crate::models::{Station, ADMIN_USERNAME};
use crate::password;

/// Failed credential checks allowed before the session gives up
pub const MAX_ATTEMPTS: u32 = 3;

const MISSING_USERNAME_MESSAGE: &str = "specify a username";

/// Outcome of a single pass through the login prompt
#[derive(Debug)]
pub enum AuthResult {
    Success(CurrentUser),
    Cancelled,
    Invalid(String),
}

/// Attempt bookkeeping for one interactive login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    attempts_used: u32,
    max_attempts: u32,
    /// Consecutive submissions with an empty username. These never reach
    /// the store but are bounded by the same limit.
    blank_submissions: u32,
    last_error_message: Option<String>,
}

impl RetryState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempts_used: 0,
            max_attempts,
            blank_submissions: 0,
            last_error_message: None,
        }
    }

    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.attempts_used = (self.attempts_used + 1).min(self.max_attempts);
        self.blank_submissions = 0;
        self.last_error_message = Some(message.into());
    }

    pub fn record_blank(&mut self, message: impl Into<String>) {
        self.blank_submissions = (self.blank_submissions + 1).min(self.max_attempts);
        self.last_error_message = Some(message.into());
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts_used >= self.max_attempts || self.blank_submissions >= self.max_attempts
    }

    pub fn attempts_used(&self) -> u32 {
        self.attempts_used
    }

    pub fn remaining(&self) -> u32 {
        self.max_attempts - self.attempts_used
    }

    pub fn last_error_message(&self) -> Option<&str> {
        self.last_error_message.as_deref()
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new(MAX_ATTEMPTS)
    }
}

pub struct AuthenticationSession<C, K> {
    credentials: C,
    cookies: K,
    station: Station,
    cookies_disabled: bool,
    forced_username: Option<String>,
}

impl<C: CredentialStore, K: CookieStore> AuthenticationSession<C, K> {
    pub fn new(credentials: C, cookies: K, station: Station) -> Self {
        Self {
            credentials,
            cookies,
            station,
            cookies_disabled: false,
            forced_username: None,
        }
    }

    /// Turn remembered logins off: no cookie is read, written or cleared
    /// and the prompt does not offer "remember me".
    pub fn with_cookies_disabled(mut self, disabled: bool) -> Self {
        self.cookies_disabled = disabled;
        self
    }

    /// Pre-fill the prompt with a username the operator cannot change
    pub fn with_forced_username(mut self, username: Option<String>) -> Self {
        self.forced_username = username.filter(|u| !u.trim().is_empty());
        self
    }

    pub fn station(&self) -> &Station {
        &self.station
    }

    pub fn credentials(&self) -> &C {
        &self.credentials
    }

    pub fn cookies(&self) -> &K {
        &self.cookies
    }

    // =========================================================================
    // Cookie login
    // =========================================================================

    /// Log in silently with remembered credentials.
    ///
    /// Returns `None` whenever no cookie login happened. Failures are only
    /// logged; the caller falls back to `validate_user`.
    pub fn cookie_login(&mut self) -> Option<CurrentUser> {
        if self.cookies_disabled {
            info!("Cookies disabled by configuration");
            return None;
        }

        let cookie = match self.cookies.get() {
            Ok(cookie) => cookie,
            Err(CookieError::NotFound) => {
                info!("Not using cookie based login");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read remembered credentials");
                return None;
            }
        };

        let username = cookie.username;
        let mut pw_hash = cookie.password_hash;

        // Older versions remembered the plaintext
        if !password::is_hashed(&pw_hash) {
            pw_hash = self.credentials.hash(&pw_hash);
            match self.cookies.store(&username, &pw_hash) {
                Ok(()) => info!(username = %username, "Upgraded remembered password to a digest"),
                Err(e) => warn!(error = %e, "Failed to upgrade remembered password"),
            }
        }

        match self.check_user(&username, &pw_hash) {
            Ok(user) => {
                info!(username = %username, "Logging in using cookie credentials");
                Some(user)
            }
            Err(e) => {
                info!(error = %e, "Cookie login failed");
                if e.is_retryable() {
                    self.forget_cookie();
                }
                None
            }
        }
    }

    // =========================================================================
    // Interactive login
    // =========================================================================

    /// Log an operator in, prompting as needed.
    ///
    /// Returns `Ok(None)` when the operator cancels the prompt.
    pub fn validate_user<P: PromptUi>(
        &mut self,
        prompt: &mut P,
    ) -> Result<Option<CurrentUser>, LoginError> {
        if let Some(user) = self.default_admin_login(prompt)? {
            return Ok(Some(user));
        }

        info!("Showing login dialog");
        let mut retry = RetryState::new(MAX_ATTEMPTS);

        while !retry.is_exhausted() {
            match self.attempt(prompt, &mut retry)? {
                AuthResult::Success(user) => return Ok(Some(user)),
                AuthResult::Cancelled => {
                    info!("Login cancelled");
                    return Ok(None);
                }
                AuthResult::Invalid(reason) => {
                    debug!(reason = %reason, attempts = retry.attempts_used(), "Login attempt rejected");
                }
            }
        }

        warn!("Depleted attempts of authentication");
        Err(LoginError::AttemptsDepleted)
    }

    /// Log in `admin` without a prompt when it is the only account and has
    /// a blank password. A store that cannot count its accounts is fatal;
    /// any other failure just means the shortcut does not apply.
    fn default_admin_login<P: PromptUi>(
        &mut self,
        prompt: &mut P,
    ) -> Result<Option<CurrentUser>, LoginError> {
        let count = match self.credentials.user_count() {
            Ok(count) => count,
            Err(e) => {
                let message = match e {
                    AuthError::StoreUnavailable(msg) => msg,
                    other => other.to_string(),
                };
                prompt.warn(&message);
                return Err(LoginError::StoreUnavailable(message));
            }
        };
        if count != 1 {
            return Ok(None);
        }

        let pw_hash = self.credentials.hash("");
        match self.check_user(ADMIN_USERNAME, &pw_hash) {
            Ok(user) => {
                info!("Logged in as the default admin account");
                Ok(Some(user))
            }
            Err(e) => {
                debug!(error = %e, "Default admin login not possible");
                Ok(None)
            }
        }
    }

    /// One prompt and, if the operator submitted a username, one credential check.
    fn attempt<P: PromptUi>(
        &mut self,
        prompt: &mut P,
        retry: &mut RetryState,
    ) -> Result<AuthResult, LoginError> {
        let request = PromptRequest {
            username: self.forced_username.as_deref(),
            username_locked: self.forced_username.is_some(),
            message: retry.last_error_message(),
            allow_remember: !self.cookies_disabled,
        };

        let submission = match prompt.run(&request)? {
            PromptResponse::Submitted(submission) => submission,
            PromptResponse::Cancelled => return Ok(AuthResult::Cancelled),
            PromptResponse::Quit => return Err(LoginError::QuitRequested),
        };

        let Submission {
            username,
            password,
            remember,
        } = submission;
        let username = username.trim().to_string();
        let pw_hash = self.credentials.hash(password.trim());

        if username.is_empty() {
            retry.record_blank(MISSING_USERNAME_MESSAGE);
            return Ok(AuthResult::Invalid(MISSING_USERNAME_MESSAGE.to_string()));
        }

        match self.check_user(&username, &pw_hash) {
            Ok(user) => {
                info!(username = %username, station = %self.station, "Authenticated user");
                self.forced_username = None;
                if remember {
                    self.remember(&user);
                }
                Ok(AuthResult::Success(user))
            }
            Err(e) if e.is_retryable() => {
                self.forget_cookie();
                let message = e.to_string();
                retry.record_failure(message.clone());
                Ok(AuthResult::Invalid(message))
            }
            Err(AuthError::MissingProfile { username }) => {
                prompt.warn(&format!(
                    "User '{}' has no profile set, but this should not happen.\n\n\
                     Please contact your system administrator.",
                    username
                ));
                Err(LoginError::ProfileMisconfigured { username })
            }
            Err(e) => {
                let message = match e {
                    AuthError::StoreUnavailable(msg) => msg,
                    other => other.to_string(),
                };
                prompt.warn(&message);
                Err(LoginError::StoreUnavailable(message))
            }
        }
    }

    /// Verify credentials and register the login at this station.
    fn check_user(&mut self, username: &str, pw_hash: &str) -> Result<CurrentUser, AuthError> {
        let user = self.credentials.authenticate(username, pw_hash, &self.station)?;

        // Some accounts exist without a profile. Letting them in breaks later.
        let Some(profile) = user.profile.clone() else {
            warn!(username = %user.username, "User has no profile set");
            return Err(AuthError::MissingProfile {
                username: user.username,
            });
        };

        self.credentials.login(&user, &self.station)?;
        Ok(CurrentUser::new(user, profile, self.station.clone()))
    }

    fn remember(&mut self, user: &CurrentUser) {
        if self.cookies_disabled {
            return;
        }
        let account = user.user();
        if let Err(e) = self.cookies.store(&account.username, &account.pw_hash) {
            warn!(error = %e, "Failed to store remembered credentials");
        }
    }

    fn forget_cookie(&mut self) {
        if self.cookies_disabled {
            return;
        }
        if let Err(e) = self.cookies.clear() {
            warn!(error = %e, "Failed to clear remembered credentials");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
