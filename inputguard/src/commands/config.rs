// inputguard/src/commands/config.rs
//! `inputguard config`: inspect and change the persisted endpoints.

use anyhow::{Context, Result};
use log::info;

use inputguard_core::config::validate_endpoint_url;
use inputguard_core::GuardConfig;

use crate::cli::ConfigCommand;
use crate::output::{out, Tone};
use crate::settings::{settings_path, Settings};

pub fn run_config(cmd: ConfigCommand, config: &GuardConfig) -> Result<()> {
    let path = settings_path()?;
    let mut settings = Settings::load(&path)?;

    match cmd {
        ConfigCommand::Show => {
            let endpoints = settings.apply(&config.endpoints);
            out(Tone::Header, &format!("settings: {}", path.display()));
            println!("check_url: {}", endpoints.check_url);
            println!("ingest_url: {}", endpoints.ingest_url);
            println!("policy: {:?}", config.policy);
            return Ok(());
        }
        ConfigCommand::SetApiUrl { url } => {
            let url = validate_endpoint_url(&url).context("Refusing to save check URL")?;
            settings.api_url = Some(url.to_string());
        }
        ConfigCommand::SetIngestUrl { url } => {
            let url = validate_endpoint_url(&url).context("Refusing to save ingest URL")?;
            settings.ingest_url = Some(url.to_string());
        }
    }

    settings.save(&path)?;
    info!("Saved settings to {}", path.display());
    out(Tone::Success, "Saved.");
    Ok(())
}
