// inputguard/src/relay.rs
//! The relay: answers `RelayRequest`s from the in-page agent by talking to
//! the detection service, and owns the endpoint settings.

use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::mpsc;

use inputguard_core::config::validate_endpoint_url;
use inputguard_core::detection::Endpoint;
use inputguard_core::redaction::loggable;
use inputguard_core::{Endpoints, HttpDetectionClient, RelayEnvelope, RelayRequest, RelayResponse};

use crate::settings::Settings;

pub struct RelayService {
    client: HttpDetectionClient,
    /// Where `SET_*_URL` changes are persisted; `None` keeps them in memory.
    settings_path: Option<PathBuf>,
}

impl RelayService {
    pub fn new(endpoints: Endpoints, settings_path: Option<PathBuf>) -> Self {
        Self { client: HttpDetectionClient::new(endpoints), settings_path }
    }

    pub fn endpoints(&self) -> Endpoints {
        self.client.endpoints()
    }

    pub async fn handle(&self, request: RelayRequest) -> RelayResponse {
        match request {
            RelayRequest::Ping => {
                debug!("Relay awake");
                RelayResponse::pong()
            }
            RelayRequest::CheckSensitive { text } => self.forward(Endpoint::Check, &text).await,
            RelayRequest::SendPrompt { text } => self.forward(Endpoint::Ingest, &text).await,
            RelayRequest::SetApiUrl { url } => self.set_url(Endpoint::Check, &url),
            RelayRequest::SetIngestUrl { url } => self.set_url(Endpoint::Ingest, &url),
        }
    }

    async fn forward(&self, endpoint: Endpoint, text: &str) -> RelayResponse {
        debug!("Forwarding {:?} request: {}", endpoint, loggable(text));
        match self.client.post_text(endpoint, text).await {
            Ok(data) => RelayResponse::with_data(data),
            Err(e) => {
                warn!("{:?} request failed: {}", endpoint, e);
                RelayResponse::failure(e.to_string())
            }
        }
    }

    fn set_url(&self, endpoint: Endpoint, url: &str) -> RelayResponse {
        let url = match validate_endpoint_url(url) {
            Ok(parsed) => parsed.to_string(),
            Err(e) => return RelayResponse::failure(e.to_string()),
        };
        match endpoint {
            Endpoint::Check => self.client.set_check_url(&url),
            Endpoint::Ingest => self.client.set_ingest_url(&url),
        }
        info!("{:?} endpoint set to {}", endpoint, url);

        if let Err(e) = self.persist() {
            warn!("Endpoint changed but could not be saved: {:#}", e);
            return RelayResponse::failure(format!("{:#}", e));
        }
        RelayResponse::ok()
    }

    fn persist(&self) -> anyhow::Result<()> {
        let Some(path) = &self.settings_path else {
            return Ok(());
        };
        let endpoints = self.client.endpoints();
        let mut settings = Settings::load(path)?;
        settings.api_url = Some(endpoints.check_url);
        settings.ingest_url = Some(endpoints.ingest_url);
        settings.save(path)
    }

    /// Serves an in-process channel until every sender is gone. Requests are
    /// handled concurrently; each reply goes back on its own oneshot.
    pub async fn serve(self: Arc<Self>, mut requests: mpsc::Receiver<RelayEnvelope>) {
        while let Some(envelope) = requests.recv().await {
            let service = Arc::clone(&self);
            tokio::spawn(async move {
                let response = service.handle(envelope.request).await;
                if envelope.reply.send(response).is_err() {
                    debug!("Requester went away before the reply");
                }
            });
        }
        debug!("Relay channel closed");
    }
}
