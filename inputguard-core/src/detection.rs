// inputguard-core/src/detection.rs
//! Detection client: the request/response seam to the external service that
//! decides whether text holds sensitive terms or PII.
//!
//! The service is a black box with two endpoints:
//!
//! * `POST check  {text} -> {sensitive_words: [..]}`
//! * `POST ingest {text} -> {pii: "null" | null | [{type, value}, ..]}`
//!
//! Every failure is reported as a `DetectionError` and is handled fail-open
//! by the agent.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Endpoints;
use crate::errors::DetectionError;
use crate::redaction::loggable;

/// One typed PII finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiiEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl PiiEntity {
    pub fn new(kind: &str, value: &str) -> Self {
        Self { kind: kind.to_string(), value: value.to_string() }
    }
}

impl std::fmt::Display for PiiEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.value)
    }
}

/// Result of the lightweight term check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermCheck {
    pub matched_terms: Vec<String>,
}

/// Result of the full ingest/PII check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PiiReport {
    /// The service explicitly reported no PII.
    None,
    Found(Vec<PiiEntity>),
}

impl PiiReport {
    pub fn entities(&self) -> &[PiiEntity] {
        match self {
            PiiReport::None => &[],
            PiiReport::Found(entities) => entities,
        }
    }

    pub fn has_pii(&self) -> bool {
        !self.entities().is_empty()
    }
}

/// Abstraction over the detection service.
#[async_trait]
pub trait DetectionClient: Send + Sync {
    /// Lightweight sensitive-term check.
    async fn check_terms(&self, text: &str) -> Result<TermCheck, DetectionError>;

    /// Full PII check.
    async fn ingest(&self, text: &str) -> Result<PiiReport, DetectionError>;
}

#[derive(Debug, Serialize)]
struct TextPayload<'a> {
    text: &'a str,
}

/// Parses a `check` response body.
pub fn parse_check_response(body: &Value) -> Result<TermCheck, DetectionError> {
    let words = body
        .get("sensitive_words")
        .and_then(Value::as_array)
        .ok_or_else(|| DetectionError::Malformed("missing `sensitive_words` array".to_string()))?;

    let matched_terms = words
        .iter()
        .filter_map(Value::as_str)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();
    Ok(TermCheck { matched_terms })
}

fn is_none_marker(s: &str) -> bool {
    let s = s.trim();
    s.eq_ignore_ascii_case("null") || s.eq_ignore_ascii_case("nil") || s.eq_ignore_ascii_case("none")
}

/// Parses an `ingest` response body.
///
/// `pii` may be the string `"null"`, JSON `null` or an entity list. A list
/// made only of `{type: "error"}` entries is how the service reports its
/// own classifier failing, so it is surfaced as a transport failure.
pub fn parse_ingest_response(body: &Value) -> Result<PiiReport, DetectionError> {
    let Some(pii) = body.get("pii") else {
        return Err(DetectionError::Malformed("missing `pii` field".to_string()));
    };

    match pii {
        Value::Null => Ok(PiiReport::None),
        Value::String(s) if is_none_marker(s) => Ok(PiiReport::None),
        Value::Array(items) => {
            let entities: Vec<PiiEntity> = items
                .iter()
                .map(|item| serde_json::from_value(item.clone()))
                .collect::<Result<_, _>>()
                .map_err(|e| DetectionError::Malformed(format!("bad `pii` entry: {}", e)))?;

            if !entities.is_empty() && entities.iter().all(|e| e.kind.eq_ignore_ascii_case("error")) {
                return Err(DetectionError::Transport(format!(
                    "detection service reported an error: {}",
                    entities[0].value
                )));
            }
            if entities.is_empty() {
                Ok(PiiReport::None)
            } else {
                Ok(PiiReport::Found(entities))
            }
        }
        other => Err(DetectionError::Malformed(format!("unexpected `pii` value: {}", other))),
    }
}

/// Which of the two endpoints a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Check,
    Ingest,
}

/// Talks to the detection service directly over HTTP.
#[derive(Debug)]
pub struct HttpDetectionClient {
    client: Client,
    endpoints: RwLock<Endpoints>,
}

impl HttpDetectionClient {
    pub fn new(endpoints: Endpoints) -> Self {
        Self { client: Client::new(), endpoints: RwLock::new(endpoints) }
    }

    /// Builds a client whose requests give up after `timeout`.
    pub fn with_timeout(endpoints: Endpoints, timeout: Duration) -> Result<Self, DetectionError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoints: RwLock::new(endpoints) })
    }

    pub fn endpoints(&self) -> Endpoints {
        match self.endpoints.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn update(&self, f: impl FnOnce(&mut Endpoints)) {
        match self.endpoints.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    pub fn set_check_url(&self, url: &str) {
        self.update(|e| e.check_url = url.to_string());
    }

    pub fn set_ingest_url(&self, url: &str) {
        self.update(|e| e.ingest_url = url.to_string());
    }

    /// Posts `{text}` to an endpoint and returns the decoded JSON body.
    pub async fn post_text(&self, endpoint: Endpoint, text: &str) -> Result<Value, DetectionError> {
        let url = {
            let endpoints = self.endpoints();
            match endpoint {
                Endpoint::Check => endpoints.check_url,
                Endpoint::Ingest => endpoints.ingest_url,
            }
        };
        debug!("POST {} text={}", url, loggable(text));

        let response = self
            .client
            .post(&url)
            .json(&TextPayload { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Detection endpoint {} answered {}", url, status);
            return Err(DetectionError::Transport(format!("{} answered {}", url, status)));
        }
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl DetectionClient for HttpDetectionClient {
    async fn check_terms(&self, text: &str) -> Result<TermCheck, DetectionError> {
        let body = self.post_text(Endpoint::Check, text).await?;
        parse_check_response(&body)
    }

    async fn ingest(&self, text: &str) -> Result<PiiReport, DetectionError> {
        let body = self.post_text(Endpoint::Ingest, text).await?;
        parse_ingest_response(&body)
    }
}
