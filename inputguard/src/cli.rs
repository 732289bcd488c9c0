// inputguard/src/cli.rs
//! Command-line interface of the `inputguard` binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use inputguard_core::Policy;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "inputguard",
    author = "Relay",
    version = env!("CARGO_PKG_VERSION"),
    about = "Keep sensitive text from leaving the page",
    long_about = "InputGuard validates what users type into web composers against a detection service, flags sensitive terms and PII, and holds sends until the user confirms. This binary hosts the relay the in-page agent talks to and offers one-shot tools for checking and redacting text.",
    arg_required_else_help = true,
)]
pub struct Cli {
    #[arg(long, short = 'q', global = true, help = "Suppress all informational and debug messages.")]
    pub quiet: bool,

    #[arg(long, short = 'd', global = true, help = "Enable debug logging.")]
    pub debug: bool,

    /// Agent configuration file (YAML).
    #[arg(long = "config", value_name = "FILE", global = true, env = "INPUTGUARD_CONFIG", help = "Path to an agent configuration file (YAML).")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Runs the relay as a native-messaging host on stdin/stdout.
    #[command(about = "Run the relay as a native-messaging host on stdin/stdout.")]
    Relay,

    /// Sends text to both detection endpoints and prints what they found.
    #[command(about = "Send text to the detection service and print sensitive terms and PII.")]
    Check(CheckCommand),

    /// Removes terms from text locally.
    #[command(about = "Remove the given terms from text, locally.")]
    Redact(RedactCommand),

    #[command(subcommand, about = "Show or change the persisted endpoint settings.")]
    Config(ConfigCommand),

    /// Drives the agent against a simulated composer fed from stdin.
    #[command(about = "Type each stdin line into a simulated composer and send it through the agent.")]
    Session(SessionCommand),
}

#[derive(Parser, Debug)]
pub struct CheckCommand {
    /// Text to check (reads stdin if not provided).
    #[arg(value_name = "TEXT")]
    pub text: Option<String>,

    #[arg(long, help = "Print the raw results as JSON.")]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct RedactCommand {
    /// Text to redact (reads stdin if not provided).
    #[arg(value_name = "TEXT")]
    pub text: Option<String>,

    /// Term to remove; repeat or comma-separate for several.
    #[arg(long = "term", short = 't', value_delimiter = ',', required = true, help = "Term to remove (repeatable, comma-separated).")]
    pub terms: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Prints the settings file location and the effective endpoints.
    Show,
    /// Persists the URL of the term-check endpoint.
    SetApiUrl {
        #[arg(value_name = "URL")]
        url: String,
    },
    /// Persists the URL of the PII ingest endpoint.
    SetIngestUrl {
        #[arg(value_name = "URL")]
        url: String,
    },
}

#[derive(Parser, Debug)]
pub struct SessionCommand {
    /// Overrides the configured policy.
    #[arg(long, value_name = "POLICY", help = "How to act on detections: 'confirm' or 'auto-redact'.")]
    pub policy: Option<Policy>,
}
