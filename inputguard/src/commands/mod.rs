// inputguard/src/commands/mod.rs
//! Subcommand implementations.

pub mod check;
pub mod config;
pub mod redact;
pub mod relay;
pub mod session;

use anyhow::{Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};

use inputguard_core::{Endpoints, GuardConfig};

use crate::settings::{settings_path, Settings};

/// Agent configuration from `--config`, or defaults.
pub fn load_config(path: Option<&Path>) -> Result<GuardConfig> {
    match path {
        Some(path) => GuardConfig::load_from_file(path),
        None => Ok(GuardConfig::default()),
    }
}

/// Configured endpoints with persisted settings on top, plus the settings
/// file they came from.
pub fn effective_endpoints(config: &GuardConfig) -> Result<(Endpoints, PathBuf)> {
    let path = settings_path()?;
    let settings = Settings::load(&path)?;
    Ok((settings.apply(&config.endpoints), path))
}

/// The positional text argument, or all of stdin.
pub fn text_or_stdin(text: Option<String>) -> Result<String> {
    match text {
        Some(text) => Ok(text),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read input from stdin")?;
            Ok(buf.trim_end_matches(['\r', '\n']).to_string())
        }
    }
}
