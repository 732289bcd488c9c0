//! Configuration management for `inputguard-core`.
//!
//! Defines the agent's tunables (timings, policy, container measurement,
//! detection endpoints), YAML loading and validation.
//!
//! License: MIT OR Apache-2.0

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::errors::GuardError;

pub const DEFAULT_CHECK_URL: &str = "http://127.0.0.1:8000/check";
pub const DEFAULT_INGEST_URL: &str = "http://127.0.0.1:8000/ingest";

/// How a positive detection is acted on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Leave the text alone, flag it and ask the user before sending.
    #[default]
    Confirm,
    /// Strip the matches out of the live text; the user re-sends.
    AutoRedact,
}

impl std::str::FromStr for Policy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "confirm" => Ok(Policy::Confirm),
            "auto_redact" | "redact" => Ok(Policy::AutoRedact),
            other => Err(anyhow!("Unknown policy '{}'", other)),
        }
    }
}

/// Detection service endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Endpoints {
    pub check_url: String,
    pub ingest_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            check_url: DEFAULT_CHECK_URL.to_string(),
            ingest_url: DEFAULT_INGEST_URL.to_string(),
        }
    }
}

/// Footprint an ancestor must reach to count as the visual input bar.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ContainerConfig {
    pub min_width: f64,
    pub min_height: f64,
    /// How many ancestors above the surface are measured.
    pub max_depth: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self { min_width: 240.0, min_height: 36.0, max_depth: 6 }
    }
}

/// Top-level agent configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GuardConfig {
    pub policy: Policy,
    /// Quiet interval before an edited surface is validated.
    pub debounce_ms: u64,
    /// Lifetime of a flagged/clear indicator.
    pub indicator_ttl_ms: u64,
    /// Upper bound on a single detection call.
    pub request_timeout_ms: u64,
    /// Period of the focused-surface sampler.
    pub sample_interval_ms: u64,
    /// `data-testid` of the host's send control.
    pub send_control_test_id: String,
    pub container: ContainerConfig,
    pub endpoints: Endpoints,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            policy: Policy::default(),
            debounce_ms: 220,
            indicator_ttl_ms: 8_000,
            request_timeout_ms: 10_000,
            sample_interval_ms: 250,
            send_control_test_id: "send-button".to_string(),
            container: ContainerConfig::default(),
            endpoints: Endpoints::default(),
        }
    }
}

impl GuardConfig {
    /// Loads and validates a YAML configuration file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading agent configuration from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: GuardConfig = serde_yml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reports every problem at once rather than stopping at the first.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        for (name, value) in [
            ("debounce_ms", self.debounce_ms),
            ("indicator_ttl_ms", self.indicator_ttl_ms),
            ("request_timeout_ms", self.request_timeout_ms),
            ("sample_interval_ms", self.sample_interval_ms),
        ] {
            if value == 0 {
                errors.push(format!("`{}` must be greater than zero.", name));
            }
        }

        if self.send_control_test_id.trim().is_empty() {
            errors.push("`send_control_test_id` must not be empty.".to_string());
        }

        for (name, url) in [
            ("endpoints.check_url", &self.endpoints.check_url),
            ("endpoints.ingest_url", &self.endpoints.ingest_url),
        ] {
            if let Err(e) = validate_endpoint_url(url) {
                errors.push(format!("`{}`: {}", name, e));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(GuardError::InvalidConfig(errors.join("\n")).into())
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn indicator_ttl(&self) -> Duration {
        Duration::from_millis(self.indicator_ttl_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

/// Accepts absolute `http`/`https` URLs only.
pub fn validate_endpoint_url(url: &str) -> Result<reqwest::Url> {
    let parsed = reqwest::Url::parse(url.trim())
        .map_err(|e| anyhow!("'{}' is not a valid URL ({})", url, e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(anyhow!("unsupported scheme '{}' in '{}'", other, url)),
    }
}
