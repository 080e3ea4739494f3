use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Station;

/// Name of the account created with every new install
pub const ADMIN_USERNAME: &str = "admin";

/// Permissions record attached to an operator account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl UserProfile {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// An operator account as returned by a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginUser {
    pub username: String,
    /// Stored digest, see `password::hash`
    pub pw_hash: String,
    pub profile: Option<UserProfile>,
    pub is_active: bool,
    /// Branches the user may log in at. Empty means every branch.
    #[serde(default)]
    pub branches: Vec<String>,
}

impl LoginUser {
    pub fn has_access_to(&self, branch: &str) -> bool {
        self.branches.is_empty() || self.branches.iter().any(|b| b == branch)
    }

    pub fn profile_name(&self) -> Option<&str> {
        self.profile.as_ref().map(|p| p.name.as_str())
    }
}

/// One successful login, kept by the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRecord {
    pub username: String,
    pub station: Station,
    pub logged_in_at: DateTime<Utc>,
}

impl LoginRecord {
    pub fn new(username: &str, station: &Station) -> Self {
        Self {
            username: username.to_string(),
            station: station.clone(),
            logged_in_at: Utc::now(),
        }
    }
}
