//! Operator account storage.
//!
//! `CredentialStore` is what the login session verifies against.
//! `JsonCredentialStore` keeps accounts, profiles and the login history in a
//! single JSON file, and carries the small administration surface the CLI
//! exposes.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::AuthError;
use crate::models::{LoginRecord, LoginUser, Station, UserProfile, ADMIN_USERNAME};
use crate::password;

/// Profile given to the account seeded into an empty store
const ADMIN_PROFILE: &str = "Administrator";

/// Account lookup and verification.
pub trait CredentialStore {
    /// One-way transform applied to every password before it is compared
    /// or stored.
    fn hash(&self, password: &str) -> String {
        password::hash(password)
    }

    fn user_count(&self) -> Result<usize, AuthError>;

    /// Verify a username and password digest for a login at `station`.
    ///
    /// A user without a profile still authenticates; the caller decides
    /// what that means.
    fn authenticate(
        &self,
        username: &str,
        pw_hash: &str,
        station: &Station,
    ) -> Result<LoginUser, AuthError>;

    /// Record that `user` is now logged in at `station`.
    fn login(&mut self, user: &LoginUser, station: &Station) -> Result<(), AuthError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRecord {
    username: String,
    pw_hash: String,
    #[serde(default)]
    profile: Option<String>,
    #[serde(default = "default_active")]
    is_active: bool,
    #[serde(default)]
    branches: Vec<String>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UsersFile {
    #[serde(default)]
    profiles: Vec<UserProfile>,
    #[serde(default)]
    users: Vec<UserRecord>,
    #[serde(default)]
    logins: Vec<LoginRecord>,
}

pub struct JsonCredentialStore {
    path: PathBuf,
    data: UsersFile,
}

impl JsonCredentialStore {
    /// Open the accounts file at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read users file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse users file: {}", path.display()))?
        } else {
            UsersFile::default()
        };
        debug!(path = %path.display(), users = data.users.len(), "Users file loaded");
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the store back to disk through a temp file and rename.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.data)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write users file: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace users file: {}", self.path.display()))?;
        Ok(())
    }

    /// Seed a fresh install with `admin`, an empty password and a full
    /// profile. Returns whether anything was created.
    pub fn ensure_admin(&mut self) -> Result<bool> {
        if !self.data.users.is_empty() {
            return Ok(false);
        }
        self.add_profile(UserProfile {
            name: ADMIN_PROFILE.to_string(),
            permissions: vec!["admin".to_string()],
        });
        self.add_user(ADMIN_USERNAME, "", Some(ADMIN_PROFILE))?;
        info!("Created default admin account");
        Ok(true)
    }

    /// Add a profile, replacing one with the same name.
    pub fn add_profile(&mut self, profile: UserProfile) {
        self.data.profiles.retain(|p| p.name != profile.name);
        self.data.profiles.push(profile);
    }

    pub fn add_user(&mut self, username: &str, password: &str, profile: Option<&str>) -> Result<()> {
        let username = username.trim();
        if username.is_empty() {
            bail!("Username must not be empty");
        }
        if self.find(username).is_some() {
            bail!("User '{}' already exists", username);
        }
        if let Some(name) = profile {
            if self.find_profile(name).is_none() {
                bail!("Profile '{}' does not exist", name);
            }
        }
        let pw_hash = self.hash(password);
        self.data.users.push(UserRecord {
            username: username.to_string(),
            pw_hash,
            profile: profile.map(str::to_string),
            is_active: true,
            branches: Vec::new(),
        });
        Ok(())
    }

    pub fn set_password(&mut self, username: &str, password: &str) -> Result<()> {
        let pw_hash = self.hash(password);
        let record = self.find_mut(username)?;
        record.pw_hash = pw_hash;
        Ok(())
    }

    pub fn deactivate_user(&mut self, username: &str) -> Result<()> {
        self.find_mut(username)?.is_active = false;
        Ok(())
    }

    /// Restrict a user to the given branches. An empty list lifts the
    /// restriction.
    pub fn set_branches(&mut self, username: &str, branches: Vec<String>) -> Result<()> {
        self.find_mut(username)?.branches = branches;
        Ok(())
    }

    pub fn logins_for(&self, username: &str) -> Vec<&LoginRecord> {
        self.data
            .logins
            .iter()
            .filter(|l| l.username == username)
            .collect()
    }

    fn find(&self, username: &str) -> Option<&UserRecord> {
        self.data.users.iter().find(|u| u.username == username)
    }

    fn find_mut(&mut self, username: &str) -> Result<&mut UserRecord> {
        self.data
            .users
            .iter_mut()
            .find(|u| u.username == username)
            .ok_or_else(|| anyhow::anyhow!("User '{}' does not exist", username))
    }

    fn find_profile(&self, name: &str) -> Option<&UserProfile> {
        self.data.profiles.iter().find(|p| p.name == name)
    }
}

impl CredentialStore for JsonCredentialStore {
    fn user_count(&self) -> Result<usize, AuthError> {
        Ok(self.data.users.len())
    }

    fn authenticate(
        &self,
        username: &str,
        pw_hash: &str,
        station: &Station,
    ) -> Result<LoginUser, AuthError> {
        let record = self
            .find(username)
            .filter(|u| u.pw_hash == pw_hash)
            .ok_or_else(AuthError::bad_credentials)?;

        if !record.is_active {
            return Err(AuthError::BadCredentials("This user is inactive".to_string()));
        }

        let profile = match record.profile {
            Some(ref name) => Some(self.find_profile(name).cloned().ok_or_else(|| {
                AuthError::Profile(format!(
                    "Profile '{}' of user '{}' does not exist",
                    name, record.username
                ))
            })?),
            None => None,
        };

        let user = LoginUser {
            username: record.username.clone(),
            pw_hash: record.pw_hash.clone(),
            profile,
            is_active: record.is_active,
            branches: record.branches.clone(),
        };

        // A station without a branch was never synchronized; there is only one.
        if let Some(ref branch) = station.branch {
            if !user.has_access_to(branch) {
                return Err(AuthError::BadCredentials(
                    "This user does not have access to this branch".to_string(),
                ));
            }
        }

        Ok(user)
    }

    fn login(&mut self, user: &LoginUser, station: &Station) -> Result<(), AuthError> {
        self.data.logins.push(LoginRecord::new(&user.username, station));
        self.save()
            .map_err(|e| AuthError::StoreUnavailable(format!("{:#}", e)))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn station() -> Station {
        Station::new("till-1", None)
    }

    fn store_with_users(dir: &tempfile::TempDir) -> JsonCredentialStore {
        let mut store = JsonCredentialStore::open(dir.path().join("users.json")).unwrap();
        store.add_profile(UserProfile {
            name: "Salesperson".to_string(),
            permissions: vec!["pos".to_string()],
        });
        store.add_user("maria", "secret", Some("Salesperson")).unwrap();
        store.add_user("joao", "hunter2", None).unwrap();
        store
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCredentialStore::open(dir.path().join("users.json")).unwrap();
        assert_eq!(store.user_count().unwrap(), 0);
    }

    #[test]
    fn test_authenticate_success() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_users(&dir);

        let user = store
            .authenticate("maria", &password::hash("secret"), &station())
            .unwrap();
        assert_eq!(user.username, "maria");
        assert_eq!(user.profile_name(), Some("Salesperson"));
    }

    #[test]
    fn test_authenticate_wrong_password() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_users(&dir);

        let err = store
            .authenticate("maria", &password::hash("wrong"), &station())
            .unwrap_err();
        assert_eq!(err, AuthError::bad_credentials());
    }

    #[test]
    fn test_authenticate_unknown_user() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_users(&dir);

        let err = store
            .authenticate("nobody", &password::hash("secret"), &station())
            .unwrap_err();
        assert_eq!(err, AuthError::bad_credentials());
    }

    #[test]
    fn test_authenticate_compares_digests_not_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_users(&dir);

        assert!(store.authenticate("maria", "secret", &station()).is_err());
    }

    #[test]
    fn test_authenticate_without_profile_returns_user() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_users(&dir);

        let user = store
            .authenticate("joao", &password::hash("hunter2"), &station())
            .unwrap();
        assert!(user.profile.is_none());
    }

    #[test]
    fn test_authenticate_inactive_user() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_with_users(&dir);
        store.deactivate_user("maria").unwrap();

        let err = store
            .authenticate("maria", &password::hash("secret"), &station())
            .unwrap_err();
        assert_eq!(err, AuthError::BadCredentials("This user is inactive".to_string()));
    }

    #[test]
    fn test_authenticate_broken_profile_link() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(
            &path,
            format!(
                r#"{{"users": [{{"username": "maria", "pw_hash": "{}", "profile": "Ghost"}}]}}"#,
                password::hash("secret")
            ),
        )
        .unwrap();
        let store = JsonCredentialStore::open(&path).unwrap();

        let err = store
            .authenticate("maria", &password::hash("secret"), &station())
            .unwrap_err();
        assert!(matches!(err, AuthError::Profile(_)));
    }

    #[test]
    fn test_authenticate_branch_restriction() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_with_users(&dir);
        store.set_branches("maria", vec!["Downtown".to_string()]).unwrap();
        let pw_hash = password::hash("secret");

        let downtown = Station::new("till-1", Some("Downtown".to_string()));
        let harbor = Station::new("till-2", Some("Harbor".to_string()));

        assert!(store.authenticate("maria", &pw_hash, &downtown).is_ok());
        assert!(store.authenticate("maria", &pw_hash, &station()).is_ok());
        assert!(matches!(
            store.authenticate("maria", &pw_hash, &harbor),
            Err(AuthError::BadCredentials(_))
        ));
    }

    #[test]
    fn test_add_user_rejects_duplicates_and_unknown_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_with_users(&dir);

        assert!(store.add_user("maria", "x", None).is_err());
        assert!(store.add_user("ana", "x", Some("Ghost")).is_err());
        assert!(store.add_user("  ", "x", None).is_err());
        assert_eq!(store.user_count().unwrap(), 2);
    }

    #[test]
    fn test_set_password() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_with_users(&dir);
        store.set_password("maria", "new-secret").unwrap();

        assert!(store
            .authenticate("maria", &password::hash("new-secret"), &station())
            .is_ok());
        assert!(store.set_password("nobody", "x").is_err());
    }

    #[test]
    fn test_login_is_recorded_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_with_users(&dir);
        let user = store
            .authenticate("maria", &password::hash("secret"), &station())
            .unwrap();

        store.login(&user, &station()).unwrap();

        let reopened = JsonCredentialStore::open(store.path()).unwrap();
        let logins = reopened.logins_for("maria");
        assert_eq!(logins.len(), 1);
        assert_eq!(logins[0].station, station());
        assert!(reopened.logins_for("joao").is_empty());
    }

    #[test]
    fn test_ensure_admin_seeds_only_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonCredentialStore::open(dir.path().join("users.json")).unwrap();

        assert!(store.ensure_admin().unwrap());
        assert!(!store.ensure_admin().unwrap());
        assert_eq!(store.user_count().unwrap(), 1);

        let admin = store
            .authenticate(ADMIN_USERNAME, &password::hash(""), &station())
            .unwrap();
        assert_eq!(admin.profile_name(), Some(ADMIN_PROFILE));
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_users(&dir);
        store.save().unwrap();

        let reopened = JsonCredentialStore::open(store.path()).unwrap();
        assert_eq!(reopened.user_count().unwrap(), 2);
        assert!(!dir.path().join("users.json.tmp").exists());
    }

    #[test]
    fn test_default_hash_matches_password_module() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_users(&dir);
        assert_eq!(store.hash("abc"), password::hash("abc"));
    }
}
