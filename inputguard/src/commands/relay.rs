// inputguard/src/commands/relay.rs
//! `inputguard relay`: native-messaging host on stdin/stdout.

use anyhow::{Context, Result};
use log::info;

use inputguard_core::GuardConfig;

use crate::commands::effective_endpoints;
use crate::native_host;
use crate::relay::RelayService;

pub async fn run_relay(config: &GuardConfig) -> Result<()> {
    let (endpoints, settings_path) = effective_endpoints(config)?;
    info!(
        "Relay using check={} ingest={} (settings: {})",
        endpoints.check_url,
        endpoints.ingest_url,
        settings_path.display()
    );
    let service = RelayService::new(endpoints, Some(settings_path));

    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    native_host::run(&service, &mut stdin, &mut stdout)
        .await
        .context("Native-messaging session failed")?;
    Ok(())
}
