// inputguard-core/src/gate.rs
//! Submission gate.
//!
//! Every intercepted send becomes a `SubmissionIntent`. An intent moves
//! `AwaitingResult → (AwaitingConfirmation →) Released`, or back to idle
//! when cancelled. Releasing with replay mints a single-use `ReplayToken`;
//! the host re-dispatches the original trigger carrying that token and the
//! gate lets exactly that one event through.

use std::collections::HashMap;

use log::debug;

use crate::page::ElementId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntentId(u64);

impl std::fmt::Display for IntentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "intent-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplayToken(u64);

/// The user action that asked for a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Plain Enter pressed on `target`.
    EnterKey { target: ElementId },
    /// The host's send control was activated.
    SendControl { control: ElementId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentPhase {
    AwaitingResult,
    AwaitingConfirmation,
    Released,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionIntent {
    pub id: IntentId,
    pub surface: ElementId,
    pub captured_text: String,
    pub trigger: Trigger,
    pub phase: IntentPhase,
    /// Request sequence number the ingest call was issued with.
    pub seq: u64,
}

/// A released intent and, when the send must be replayed, its token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub intent: SubmissionIntent,
    pub replay: Option<ReplayToken>,
}

#[derive(Debug, Default)]
pub struct SubmissionGate {
    in_flight: HashMap<IntentId, SubmissionIntent>,
    replays: HashMap<ReplayToken, (IntentId, ElementId)>,
    next_id: u64,
}

impl SubmissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// In-flight intent of a surface, if any.
    pub fn active_for(&self, surface: ElementId) -> Option<&SubmissionIntent> {
        self.in_flight.values().find(|i| i.surface == surface)
    }

    pub fn get(&self, id: IntentId) -> Option<&SubmissionIntent> {
        self.in_flight.get(&id)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Idle → awaiting result.
    pub fn begin(&mut self, surface: ElementId, text: &str, trigger: Trigger, seq: u64) -> IntentId {
        self.next_id += 1;
        let id = IntentId(self.next_id);
        debug!("{} captured on {} via {:?}", id, surface, trigger);
        self.in_flight.insert(
            id,
            SubmissionIntent {
                id,
                surface,
                captured_text: text.to_string(),
                trigger,
                phase: IntentPhase::AwaitingResult,
                seq,
            },
        );
        id
    }

    /// Awaiting result → awaiting confirmation.
    pub fn await_confirmation(&mut self, id: IntentId) -> bool {
        match self.in_flight.get_mut(&id) {
            Some(intent) if intent.phase == IntentPhase::AwaitingResult => {
                intent.phase = IntentPhase::AwaitingConfirmation;
                true
            }
            _ => false,
        }
    }

    /// Terminal transition. Succeeds once per intent.
    pub fn release(&mut self, id: IntentId, replay: bool) -> Option<Release> {
        let mut intent = self.in_flight.remove(&id)?;
        intent.phase = IntentPhase::Released;
        let replay = replay.then(|| {
            self.next_id += 1;
            let token = ReplayToken(self.next_id);
            self.replays.insert(token, (id, intent.surface));
            token
        });
        debug!("{} released (replay: {})", id, replay.is_some());
        Some(Release { intent, replay })
    }

    /// Back to idle without replaying.
    pub fn cancel(&mut self, id: IntentId) -> Option<SubmissionIntent> {
        let intent = self.in_flight.remove(&id);
        if intent.is_some() {
            debug!("{} cancelled", id);
        }
        intent
    }

    /// Cancels whatever intent a surface has in flight.
    pub fn abandon_surface(&mut self, surface: ElementId) -> Option<SubmissionIntent> {
        let id = self.active_for(surface)?.id;
        self.cancel(id)
    }

    /// Consumes a replay token. True exactly once per minted token.
    pub fn take_replay(&mut self, token: ReplayToken) -> bool {
        self.replays.remove(&token).is_some()
    }

    /// Forgets everything held for a surface that left the page.
    pub fn forget_surface(&mut self, surface: ElementId) {
        self.in_flight.retain(|_, intent| intent.surface != surface);
        self.replays.retain(|_, (_, owner)| *owner != surface);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{Document, Node};

    fn surface() -> ElementId {
        let mut doc = Document::new();
        doc.append(doc.body(), Node::textarea()).unwrap()
    }

    #[test]
    fn test_release_happens_once_and_token_is_single_use() {
        let field = surface();
        let mut gate = SubmissionGate::new();
        let id = gate.begin(field, "hello", Trigger::EnterKey { target: field }, 1);
        assert_eq!(gate.active_for(field).map(|i| i.id), Some(id));

        let release = gate.release(id, true).unwrap();
        assert_eq!(release.intent.phase, IntentPhase::Released);
        let token = release.replay.unwrap();
        assert!(gate.release(id, true).is_none());
        assert!(gate.active_for(field).is_none());

        assert!(gate.take_replay(token));
        assert!(!gate.take_replay(token));
    }

    #[test]
    fn test_confirmation_only_from_awaiting_result() {
        let field = surface();
        let mut gate = SubmissionGate::new();
        let id = gate.begin(field, "x", Trigger::EnterKey { target: field }, 1);
        assert!(gate.await_confirmation(id));
        assert!(!gate.await_confirmation(id));
        assert_eq!(gate.get(id).unwrap().phase, IntentPhase::AwaitingConfirmation);

        let cancelled = gate.cancel(id).unwrap();
        assert_eq!(cancelled.captured_text, "x");
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn test_release_without_replay_mints_no_token() {
        let field = surface();
        let mut gate = SubmissionGate::new();
        let id = gate.begin(field, "x", Trigger::SendControl { control: field }, 1);
        assert_eq!(gate.release(id, false).unwrap().replay, None);
    }

    #[test]
    fn test_abandon_surface() {
        let field = surface();
        let mut gate = SubmissionGate::new();
        gate.begin(field, "x", Trigger::EnterKey { target: field }, 1);
        assert!(gate.abandon_surface(field).is_some());
        assert!(gate.abandon_surface(field).is_none());
    }
}
