// inputguard-core/src/pipeline.rs
//! Timers and detection calls for the validation pipeline.
//!
//! Everything here runs as detached tokio tasks that never touch agent
//! state. Each task reports back with a `Completion` on the agent's channel,
//! and the agent applies it on its own task. Timers are cancelled by
//! dropping their `PendingTimer`.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::detection::{DetectionClient, PiiReport, TermCheck};
use crate::errors::DetectionError;
use crate::gate::IntentId;
use crate::page::ElementId;

pub type TimerToken = u64;

/// Handle to a scheduled timer. Dropping it cancels the timer.
#[derive(Debug)]
pub struct PendingTimer {
    token: TimerToken,
    handle: JoinHandle<()>,
}

impl PendingTimer {
    pub fn token(&self) -> TimerToken {
        self.token
    }
}

impl Drop for PendingTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Results fed back into the agent.
#[derive(Debug)]
pub enum Completion {
    /// A surface's quiet interval ended.
    DebounceElapsed { surface: ElementId, token: TimerToken },
    /// A flagged/clear indicator reached the end of its lifetime.
    IndicatorExpired { surface: ElementId, token: TimerToken },
    /// The reload hint's display time ended.
    HintExpired { token: TimerToken },
    /// A term check issued with `seq` for `text` finished.
    TermsChecked {
        surface: ElementId,
        seq: u64,
        text: String,
        result: Result<TermCheck, DetectionError>,
    },
    /// The ingest call of a submission intent finished.
    Ingested {
        intent: IntentId,
        seq: u64,
        result: Result<PiiReport, DetectionError>,
    },
}

/// Spawns timers and bounded detection calls.
#[derive(Debug)]
pub struct Scheduler {
    tx: mpsc::UnboundedSender<Completion>,
    next_token: TimerToken,
    request_timeout: Duration,
}

impl Scheduler {
    pub fn new(tx: mpsc::UnboundedSender<Completion>, request_timeout: Duration) -> Self {
        Self { tx, next_token: 0, request_timeout }
    }

    fn timer<F>(&mut self, delay: Duration, make: F) -> PendingTimer
    where
        F: FnOnce(TimerToken) -> Completion + Send + 'static,
    {
        self.next_token += 1;
        let token = self.next_token;
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(make(token));
        });
        PendingTimer { token, handle }
    }

    /// Starts the quiet-interval timer for a surface.
    pub fn debounce(&mut self, surface: ElementId, delay: Duration) -> PendingTimer {
        self.timer(delay, move |token| Completion::DebounceElapsed { surface, token })
    }

    pub fn expire_indicator(&mut self, surface: ElementId, ttl: Duration) -> PendingTimer {
        self.timer(ttl, move |token| Completion::IndicatorExpired { surface, token })
    }

    pub fn expire_hint(&mut self, ttl: Duration) -> PendingTimer {
        self.timer(ttl, move |token| Completion::HintExpired { token })
    }

    /// Issues a term check. The call cannot be cancelled once spawned; the
    /// agent discards its result if `seq` went stale meanwhile.
    pub fn check_terms(
        &self,
        client: Arc<dyn DetectionClient>,
        surface: ElementId,
        seq: u64,
        text: String,
    ) {
        let tx = self.tx.clone();
        let limit = self.request_timeout;
        tokio::spawn(async move {
            let result = bounded(limit, client.check_terms(&text)).await;
            debug!("Term check for {} (seq {}) finished: ok={}", surface, seq, result.is_ok());
            let _ = tx.send(Completion::TermsChecked { surface, seq, text, result });
        });
    }

    /// Issues the ingest call that decides a submission intent.
    pub fn ingest(&self, client: Arc<dyn DetectionClient>, intent: IntentId, seq: u64, text: String) {
        let tx = self.tx.clone();
        let limit = self.request_timeout;
        tokio::spawn(async move {
            let result = bounded(limit, client.ingest(&text)).await;
            debug!("Ingest for intent {} finished: ok={}", intent, result.is_ok());
            let _ = tx.send(Completion::Ingested { intent, seq, result });
        });
    }
}

/// Resolves to `DetectionError::Timeout` once `limit` elapses.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, DetectionError>
where
    F: std::future::Future<Output = Result<T, DetectionError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(DetectionError::Timeout(limit.as_millis() as u64)),
    }
}
