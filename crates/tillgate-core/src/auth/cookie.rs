//! Remembered credentials for silent re-login.
//!
//! A cookie is a single username and password digest pair, written when
//! the operator ticks "remember me". Older installs wrote the plaintext
//! password instead of the digest; the session upgrades those on read.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CookieError;

const SERVICE_NAME: &str = "tillgate";

/// Keychain account name the cookie is stored under
const COOKIE_ACCOUNT: &str = "remembered-login";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RememberedCookie {
    pub username: String,
    /// Digest, or plaintext for cookies written by older versions
    #[serde(alias = "password")]
    pub password_hash: String,
    #[serde(default)]
    pub stored_at: Option<DateTime<Utc>>,
}

impl RememberedCookie {
    pub fn new(username: &str, password_hash: &str) -> Self {
        Self {
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            stored_at: Some(Utc::now()),
        }
    }
}

pub trait CookieStore {
    /// Fails with `CookieError::NotFound` when nothing is remembered.
    fn get(&self) -> Result<RememberedCookie, CookieError>;

    fn store(&mut self, username: &str, password_hash: &str) -> Result<(), CookieError>;

    /// Forget the remembered credentials. Clearing an empty store succeeds.
    fn clear(&mut self) -> Result<(), CookieError>;
}

impl<T: CookieStore + ?Sized> CookieStore for Box<T> {
    fn get(&self) -> Result<RememberedCookie, CookieError> {
        (**self).get()
    }

    fn store(&mut self, username: &str, password_hash: &str) -> Result<(), CookieError> {
        (**self).store(username, password_hash)
    }

    fn clear(&mut self) -> Result<(), CookieError> {
        (**self).clear()
    }
}

/// Cookie kept as a JSON file readable only by the owner.
pub struct FileCookieStore {
    path: PathBuf,
}

impl FileCookieStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CookieStore for FileCookieStore {
    fn get(&self) -> Result<RememberedCookie, CookieError> {
        if !self.path.exists() {
            return Err(CookieError::NotFound);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn store(&mut self, username: &str, password_hash: &str) -> Result<(), CookieError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&RememberedCookie::new(username, password_hash))?;
        write_private(&self.path, contents.as_bytes())?;
        debug!(path = %self.path.display(), "Cookie file written");
        Ok(())
    }

    fn clear(&mut self) -> Result<(), CookieError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// Write `contents` to a file only the owner can read, from its creation on.
#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies to new files
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(contents)
}

/// Cookie kept in the OS keychain
pub struct KeyringCookieStore {
    entry: Entry,
}

impl KeyringCookieStore {
    pub fn new() -> Result<Self, CookieError> {
        Ok(Self {
            entry: Entry::new(SERVICE_NAME, COOKIE_ACCOUNT)?,
        })
    }
}

impl CookieStore for KeyringCookieStore {
    fn get(&self) -> Result<RememberedCookie, CookieError> {
        match self.entry.get_password() {
            Ok(secret) => Ok(serde_json::from_str(&secret)?),
            Err(keyring::Error::NoEntry) => Err(CookieError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&mut self, username: &str, password_hash: &str) -> Result<(), CookieError> {
        let secret = serde_json::to_string(&RememberedCookie::new(username, password_hash))?;
        self.entry.set_password(&secret)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), CookieError> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
