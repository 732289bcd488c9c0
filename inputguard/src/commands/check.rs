// inputguard/src/commands/check.rs
//! `inputguard check`: one-shot query of both detection endpoints.

use anyhow::{Context, Result};
use serde_json::json;

use inputguard_core::{DetectionClient, GuardConfig, HttpDetectionClient, PiiReport};

use crate::cli::CheckCommand;
use crate::commands::{effective_endpoints, text_or_stdin};
use crate::output::{out, Tone};

pub async fn run_check(cmd: CheckCommand, config: &GuardConfig) -> Result<()> {
    let text = text_or_stdin(cmd.text)?;
    let (endpoints, _) = effective_endpoints(config)?;
    let client = HttpDetectionClient::with_timeout(endpoints, config.request_timeout())
        .context("Failed to build HTTP client")?;

    let terms = client.check_terms(&text).await.context("Sensitive-term check failed")?;
    let pii = client.ingest(&text).await.context("PII check failed")?;

    if cmd.json {
        let report = json!({
            "sensitive_words": terms.matched_terms,
            "pii": pii.entities(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if terms.matched_terms.is_empty() {
        out(Tone::Success, "No sensitive terms.");
    } else {
        out(Tone::Header, &format!("{} sensitive term(s):", terms.matched_terms.len()));
        for term in &terms.matched_terms {
            out(Tone::Sensitive, &format!("  {}", term));
        }
    }
    match pii {
        PiiReport::None => out(Tone::Success, "No PII."),
        PiiReport::Found(entities) => {
            out(Tone::Header, &format!("{} PII item(s):", entities.len()));
            for entity in &entities {
                out(Tone::Sensitive, &format!("  {}", entity));
            }
        }
    }
    Ok(())
}
