use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::{LoginUser, Station, UserProfile};

/// The authenticated operator of this process.
///
/// Built once per successful login and handed to whichever component needs
/// to know who is working the station. Logging in again produces a new
/// value; an existing one is never mutated.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    user: Arc<LoginUser>,
    profile: UserProfile,
    station: Station,
    logged_in_at: DateTime<Utc>,
}

impl CurrentUser {
    pub fn new(user: LoginUser, profile: UserProfile, station: Station) -> Self {
        Self {
            user: Arc::new(user),
            profile,
            station,
            logged_in_at: Utc::now(),
        }
    }

    pub fn user(&self) -> &LoginUser {
        &self.user
    }

    pub fn username(&self) -> &str {
        &self.user.username
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn station(&self) -> &Station {
        &self.station
    }

    pub fn logged_in_at(&self) -> DateTime<Utc> {
        self.logged_in_at
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.profile.has_permission(permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_user_accessors() {
        let profile = UserProfile {
            name: "Manager".to_string(),
            permissions: vec!["till".to_string()],
        };
        let user = LoginUser {
            username: "maria".to_string(),
            pw_hash: crate::password::hash("pw"),
            profile: Some(profile.clone()),
            is_active: true,
            branches: Vec::new(),
        };
        let current = CurrentUser::new(user, profile, Station::new("till-1", None));

        assert_eq!(current.username(), "maria");
        assert_eq!(current.profile().name, "Manager");
        assert_eq!(current.station().name, "till-1");
        assert!(current.has_permission("till"));
        assert!(!current.has_permission("admin"));

        let cloned = current.clone();
        assert!(Arc::ptr_eq(&cloned.user, &current.user));
    }
}
