// inputguard/src/commands/redact.rs
//! `inputguard redact`: local term removal.

use anyhow::{Context, Result};
use log::debug;

use inputguard_core::TermSet;

use crate::cli::RedactCommand;
use crate::commands::text_or_stdin;

pub fn run_redact(cmd: RedactCommand) -> Result<()> {
    let text = text_or_stdin(cmd.text)?;
    let terms = TermSet::compile(&cmd.terms).context("Invalid redaction term")?;
    debug!("Redacting with {} term(s)", terms.terms().len());
    println!("{}", terms.redact(&text));
    Ok(())
}
