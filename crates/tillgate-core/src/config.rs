//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the station identity, cookie policy and the location of
//! the operator accounts file.
//!
//! Configuration is stored at `~/.config/tillgate/config.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::Station;

/// Application name used for config/data directory paths
const APP_NAME: &str = "tillgate";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default operator accounts file name in the data directory
const USERS_FILE: &str = "users.json";

/// Remembered login file name in the data directory
const COOKIE_FILE: &str = "cookie.json";

/// Where remembered credentials are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CookieBackend {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub station_name: String,
    pub branch: Option<String>,
    /// Administrative switch that turns remembered logins off entirely
    pub disable_cookies: bool,
    pub cookie_backend: CookieBackend,
    /// Overrides the accounts file in the data directory
    pub users_file: Option<PathBuf>,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            station_name: default_station_name(),
            branch: None,
            disable_cookies: false,
            cookie_backend: CookieBackend::File,
            users_file: None,
            last_username: None,
        }
    }
}

/// Use the host name when the environment exposes one
fn default_station_name() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| "station".to_string())
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Record the last logged in user without writing anything else.
    ///
    /// The in-memory config may carry environment overrides, so the file is
    /// reloaded and only `last_username` is changed.
    pub fn save_last_username(username: &str) -> Result<()> {
        Self::save_last_username_to(&Self::config_path()?, username)
    }

    pub fn save_last_username_to(path: &Path, username: &str) -> Result<()> {
        let mut on_disk = Self::load_from(path)?;
        on_disk.last_username = Some(username.to_string());
        on_disk.save_to(path)
    }

    /// Apply `TILLGATE_*` environment overrides. Not meant to be saved.
    pub fn apply_env(&mut self) {
        if let Ok(station) = std::env::var("TILLGATE_STATION") {
            if !station.trim().is_empty() {
                self.station_name = station.trim().to_string();
            }
        }
        if let Ok(branch) = std::env::var("TILLGATE_BRANCH") {
            self.branch = Some(branch.trim().to_string()).filter(|b| !b.is_empty());
        }
        if let Ok(value) = std::env::var("TILLGATE_DISABLE_COOKIES") {
            self.disable_cookies = parse_flag(&value);
        }
    }

    pub fn station(&self) -> Station {
        Station::new(self.station_name.clone(), self.branch.clone())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn users_path(&self) -> Result<PathBuf> {
        match self.users_file {
            Some(ref path) => Ok(path.clone()),
            None => Ok(self.data_dir()?.join(USERS_FILE)),
        }
    }

    pub fn cookie_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(COOKIE_FILE))
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ============================================================================
// Tests
// ============================================================================
