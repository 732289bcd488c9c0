// inputguard-core/src/relay.rs
//! In-page ⇄ relay message protocol.
//!
//! The in-page agent cannot reach the detection service itself; it hands
//! requests to a relay that owns the endpoint configuration and performs
//! the HTTP exchange. Messages are JSON objects tagged by `type`.

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::detection::{
    parse_check_response, parse_ingest_response, DetectionClient, PiiEntity, PiiReport, TermCheck,
};
use crate::errors::DetectionError;

/// Requests sent from the page to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelayRequest {
    Ping,
    CheckSensitive { text: String },
    SendPrompt { text: String },
    SetApiUrl { url: String },
    SetIngestUrl { url: String },
}

/// Messages the relay pushes to the page unprompted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelayPush {
    ShowPiiAlert { pii: Vec<PiiEntity> },
}

/// Reply to a `RelayRequest`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pong: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RelayResponse {
    pub fn pong() -> Self {
        Self { ok: true, pong: Some(true), ..Default::default() }
    }

    pub fn ok() -> Self {
        Self { ok: true, ..Default::default() }
    }

    pub fn with_data(data: Value) -> Self {
        Self { ok: true, data: Some(data), ..Default::default() }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { ok: false, error: Some(error.into()), ..Default::default() }
    }

    /// The `data` payload of a successful reply.
    fn into_data(self) -> Result<Value, DetectionError> {
        if !self.ok {
            return Err(DetectionError::Transport(
                self.error.unwrap_or_else(|| "relay reported failure".to_string()),
            ));
        }
        self.data
            .ok_or_else(|| DetectionError::Malformed("relay reply without `data`".to_string()))
    }
}

/// Carries one request to the relay and brings back its reply.
///
/// Implementations return `DetectionError::RelayUnavailable` when the
/// channel itself is gone.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn request(&self, request: RelayRequest) -> Result<RelayResponse, DetectionError>;
}

/// A request paired with the slot its reply goes into.
#[derive(Debug)]
pub struct RelayEnvelope {
    pub request: RelayRequest,
    pub reply: oneshot::Sender<RelayResponse>,
}

/// In-process transport over a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<RelayEnvelope>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::Sender<RelayEnvelope>) -> Self {
        Self { tx }
    }

    /// Creates a transport and the receiving end the relay serves.
    pub fn pair(capacity: usize) -> (Self, mpsc::Receiver<RelayEnvelope>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl RelayTransport for ChannelTransport {
    async fn request(&self, request: RelayRequest) -> Result<RelayResponse, DetectionError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(RelayEnvelope { request, reply })
            .await
            .map_err(|_| DetectionError::RelayUnavailable("relay channel closed".to_string()))?;
        response
            .await
            .map_err(|_| DetectionError::RelayUnavailable("relay dropped the request".to_string()))
    }
}

/// `DetectionClient` that goes through the relay.
pub struct RelayDetectionClient<T: RelayTransport> {
    transport: T,
}

impl<T: RelayTransport> RelayDetectionClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Round-trips a `PING`; true when the relay answered with a pong.
    pub async fn ping(&self) -> bool {
        match self.transport.request(RelayRequest::Ping).await {
            Ok(resp) => resp.ok && resp.pong == Some(true),
            Err(e) => {
                debug!("Relay ping failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl<T: RelayTransport> DetectionClient for RelayDetectionClient<T> {
    async fn check_terms(&self, text: &str) -> Result<TermCheck, DetectionError> {
        let response = self
            .transport
            .request(RelayRequest::CheckSensitive { text: text.to_string() })
            .await?;
        let data = response.into_data().inspect_err(|e| warn!("CHECK_SENSITIVE failed: {}", e))?;
        parse_check_response(&data)
    }

    async fn ingest(&self, text: &str) -> Result<PiiReport, DetectionError> {
        let response = self
            .transport
            .request(RelayRequest::SendPrompt { text: text.to_string() })
            .await?;
        let data = response.into_data().inspect_err(|e| warn!("SEND_PROMPT failed: {}", e))?;
        parse_ingest_response(&data)
    }
}
