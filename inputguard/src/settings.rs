// inputguard/src/settings.rs
//! Persisted relay settings (the endpoint URLs set through `SET_*_URL` or
//! `inputguard config`).
//!
//! Stored as JSON under the user config directory. `INPUTGUARD_SETTINGS_FILE`
//! points somewhere else, which is what tests use.

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use inputguard_core::Endpoints;

pub const SETTINGS_ENV: &str = "INPUTGUARD_SETTINGS_FILE";
const SETTINGS_FILE_TMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_url: Option<String>,
    pub ingest_url: Option<String>,
}

/// Location of the settings file.
pub fn settings_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(SETTINGS_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join("inputguard").join("settings.json"))
        .ok_or_else(|| anyhow!("Could not determine a config directory; set {}", SETTINGS_ENV))
}

impl Settings {
    /// Reads settings; a missing or empty file means defaults. A corrupt
    /// file is logged and ignored rather than blocking the relay.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        match serde_json::from_str(&raw) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!("Ignoring unreadable settings file {}: {}", path.display(), e);
                Ok(Self::default())
            }
        }
    }

    /// Writes through a temporary file so a crash never leaves half a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(SETTINGS_FILE_TMP_SUFFIX);
        let tmp = PathBuf::from(tmp);

        let body = serde_json::to_string_pretty(self)?;
        fs::write(&tmp, body).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
        debug!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Endpoints with persisted overrides applied on top of `base`.
    pub fn apply(&self, base: &Endpoints) -> Endpoints {
        let mut endpoints = base.clone();
        if let Some(url) = &self.api_url {
            endpoints.check_url = url.clone();
        }
        if let Some(url) = &self.ingest_url {
            endpoints.ingest_url = url.clone();
        }
        endpoints
    }
}
