//! errors.rs - Custom error types for the inputguard-core library.
//!
//! Two families live here. `GuardError` covers configuration and redaction
//! pattern failures. `DetectionError` covers everything that can go
//! wrong between the agent and the detection service; every variant is
//! handled fail-open by the callers.
//!
//! License: MIT OR APACHE 2.0

use thiserror::Error;

/// Non-detection error types in the `inputguard-core` library.
///
/// `#[non_exhaustive]` lets new variants land without breaking downstream
/// matches.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GuardError {
    #[error("Failed to compile redaction term '{0}': {1}")]
    TermCompilationError(String, regex::Error),

    #[error("Configuration validation failed:\n{0}")]
    InvalidConfig(String),
}

/// Failure outcomes of a detection call.
///
/// Callers must read any of these as "unknown", never as "nothing sensitive
/// found", and must not block the user because of them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DetectionError {
    /// The service could not be reached or answered with an error status.
    #[error("transport failure: {0}")]
    Transport(String),

    /// No answer arrived within the configured bound.
    #[error("detection request timed out after {0} ms")]
    Timeout(u64),

    /// The answer arrived but lacked the expected fields.
    #[error("malformed detection response: {0}")]
    Malformed(String),

    /// The messaging channel to the relay is gone (e.g. the host extension
    /// was reloaded under the page).
    #[error("relay unavailable: {0}")]
    RelayUnavailable(String),
}

impl DetectionError {
    /// True when the failure came from a torn-down relay channel.
    pub fn is_relay_unavailable(&self) -> bool {
        matches!(self, DetectionError::RelayUnavailable(_))
    }
}

impl From<reqwest::Error> for DetectionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DetectionError::Malformed(err.to_string())
        } else {
            DetectionError::Transport(err.to_string())
        }
    }
}
