//! Configuration Management
//!
//! Each gcloud configuration ("profile") gets its own directory under
//! `<gcloud config dir>/gcpadm/<profile>/` holding:
//!
//! - `config.yaml` - the [`AdminConfig`] written by bootstrap/import
//! - `admin.json` - the admin bot's service account key
//!
//! [`ConfigStore::at`] points the store at another root, which is how tests
//! avoid touching the real gcloud directory.

use crate::error::{GcpError, Result};
use crate::gcp::auth::get_gcloud_config_dir;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.yaml";
pub const KEY_FILE: &str = "admin.json";
const STORE_DIR: &str = "gcpadm";
const LOG_FILE: &str = "gcpadm.log";

/// How the admin bot was set up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Bot project lives in an organization and holds org-level roles
    #[default]
    Organization,
    /// No organization; the bot only manages projects it owns
    Personal,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Organization => f.write_str("organization"),
            Mode::Personal => f.write_str("personal"),
        }
    }
}

/// Contents of `config.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub mode: Mode,
    /// Email of the admin bot service account
    pub admin_bot: String,
    /// Humans who are granted owner on every project the bot creates
    #[serde(default)]
    pub trusted_humans: Vec<String>,
}

/// Reject profile names that could escape the store directory
pub fn validate_profile_name(name: &str) -> Result<()> {
    let problem = if name.is_empty() {
        Some("cannot be empty")
    } else if name == "." || name == ".." {
        Some("cannot be '.' or '..'")
    } else if name.starts_with('.') {
        Some("cannot start with a dot")
    } else if name.contains('/') || name.contains('\\') {
        Some("cannot contain path separators")
    } else if name.chars().any(|c| c.is_ascii_control()) {
        Some("cannot contain control characters")
    } else {
        None
    };

    match problem {
        Some(p) => Err(GcpError::InvalidArgument(format!("Profile name {}.", p))),
        None => Ok(()),
    }
}

/// Location of all per-profile admin directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    /// Store under the gcloud configuration directory
    pub fn new() -> Result<Self> {
        let gcloud_dir = get_gcloud_config_dir().ok_or_else(|| {
            GcpError::NotFound("Could not locate the gcloud configuration directory".to_string())
        })?;
        Ok(Self::at(gcloud_dir.join(STORE_DIR)))
    }

    /// Store rooted at an explicit directory
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join(LOG_FILE)
    }

    pub fn profile_dir(&self, profile: &str) -> PathBuf {
        self.root.join(profile)
    }

    pub fn config_path(&self, profile: &str) -> PathBuf {
        self.profile_dir(profile).join(CONFIG_FILE)
    }

    pub fn key_path(&self, profile: &str) -> PathBuf {
        self.profile_dir(profile).join(KEY_FILE)
    }

    /// Write `config.yaml` for a profile, creating its directory
    pub fn save_config(&self, profile: &str, config: &AdminConfig) -> Result<PathBuf> {
        validate_profile_name(profile)?;

        let dir = self.profile_dir(profile);
        fs::create_dir_all(&dir)?;

        let path = self.config_path(profile);
        fs::write(&path, serde_yaml::to_string(config)?)?;
        tracing::info!("Saved configuration to {}", path.display());

        Ok(path)
    }

    /// Load `config.yaml` for a profile, `None` when it does not exist
    pub fn load_config(&self, profile: &str) -> Result<Option<AdminConfig>> {
        let path = self.config_path(profile);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_yaml::from_str(&content)?))
    }

    /// Profiles whose directory holds both `config.yaml` and `admin.json`, sorted
    pub fn list_profiles(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut profiles = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let dir = entry.path();
            if dir.join(CONFIG_FILE).is_file() && dir.join(KEY_FILE).is_file() {
                profiles.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        profiles.sort();
        Ok(profiles)
    }
}
