// inputguard-core/src/agent.rs
//! The agent: one owner for the page model, the per-surface store and the
//! submission gate, driven by page events and by completions of the work it
//! spawned.
//!
//! All mutation happens through `&mut self` on whichever task owns the
//! agent, so handlers never interleave. The only suspension points are the
//! detection calls, which run as spawned tasks and come back as
//! `Completion`s.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

use crate::config::{GuardConfig, Policy};
use crate::detection::{DetectionClient, PiiEntity, PiiReport, TermCheck};
use crate::errors::DetectionError;
use crate::gate::{IntentId, IntentPhase, ReplayToken, SubmissionGate, Trigger};
use crate::page::{Document, ElementId};
use crate::pipeline::{Completion, PendingTimer, Scheduler, TimerToken};
use crate::redaction::{loggable, redact};
use crate::relay::RelayPush;
use crate::resolver::{deep_active_element, is_editable, resolve_from_target};
use crate::store::{IndicatorState, StateStore, SurfaceState};
use crate::ui;

pub const RELOAD_HINT: &str = "Extension updated, refresh this tab for it to work.";
const HINT_TTL: Duration = Duration::from_secs(4);
/// Consecutive relay failures before the reload hint appears.
const RELAY_FAILURES_BEFORE_HINT: u32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.meta || self.alt
    }
}

/// Discrete things that happen on the page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    FocusIn { target: ElementId },
    Input { target: ElementId },
    KeyDown {
        target: ElementId,
        key: String,
        modifiers: Modifiers,
        replay: Option<ReplayToken>,
    },
    Click { target: ElementId, replay: Option<ReplayToken> },
    Submit { form: ElementId },
    /// The user answered a confirmation prompt.
    Confirmation { intent: IntentId, confirmed: bool },
    /// Something the relay pushed to the page.
    Relay(RelayPush),
}

impl PageEvent {
    pub fn enter(target: ElementId) -> Self {
        PageEvent::KeyDown {
            target,
            key: "Enter".to_string(),
            modifiers: Modifiers::default(),
            replay: None,
        }
    }

    pub fn click(target: ElementId) -> Self {
        PageEvent::Click { target, replay: None }
    }
}

/// What the host should do with the event's default action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Allow,
    Suppress,
}

/// Work the host must carry out on the agent's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Re-dispatch `trigger`, tagged with `token`.
    Replay {
        intent: IntentId,
        surface: ElementId,
        trigger: Trigger,
        token: ReplayToken,
    },
    /// Ask the user whether to send anyway.
    ConfirmRequested {
        intent: IntentId,
        surface: ElementId,
        entities: Vec<PiiEntity>,
    },
    /// A prompt opened earlier is moot; close it.
    PromptClosed { intent: IntentId },
    SubmitBlocked { form: ElementId },
    ReloadHint { message: String },
    PiiAlert { message: String, entities: Vec<PiiEntity> },
}

/// Commands accepted by `Agent::run`.
pub enum AgentCommand {
    Event {
        event: PageEvent,
        reply: Option<oneshot::Sender<Disposition>>,
    },
    /// Host-side page mutation (typing, layout, removal).
    Page(Box<dyn FnOnce(&mut Document) + Send>),
    /// Read-only access to the agent, e.g. to render it.
    Inspect(Box<dyn FnOnce(&Agent) + Send>),
}

#[derive(Debug, Default)]
struct Sampler {
    last: Option<(ElementId, String)>,
}

#[derive(Debug, Default)]
struct RelayHealth {
    consecutive_failures: u32,
    hint_shown: bool,
    hint: Option<(ElementId, PendingTimer)>,
}

pub struct Agent {
    config: GuardConfig,
    doc: Document,
    store: StateStore,
    gate: SubmissionGate,
    client: Arc<dyn DetectionClient>,
    scheduler: Scheduler,
    completions: mpsc::UnboundedReceiver<Completion>,
    effects: mpsc::UnboundedSender<Effect>,
    sampler: Sampler,
    health: RelayHealth,
}

impl Agent {
    /// Builds an agent over `doc`. Must be called inside a tokio runtime.
    pub fn new(
        config: GuardConfig,
        doc: Document,
        client: Arc<dyn DetectionClient>,
    ) -> (Self, mpsc::UnboundedReceiver<Effect>) {
        let (completion_tx, completions) = mpsc::unbounded_channel();
        let (effects, effect_rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(completion_tx, config.request_timeout());
        info!("Agent started with policy {:?}", config.policy);
        let agent = Self {
            config,
            doc,
            store: StateStore::new(),
            gate: SubmissionGate::new(),
            client,
            scheduler,
            completions,
            effects,
            sampler: Sampler::default(),
            health: RelayHealth::default(),
        };
        (agent, effect_rx)
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn state(&self, surface: ElementId) -> Option<&SurfaceState> {
        self.store.get(&self.doc, surface)
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn gate(&self) -> &SubmissionGate {
        &self.gate
    }

    pub fn indicator(&self, surface: ElementId) -> IndicatorState {
        self.state(surface).map(|s| s.indicator).unwrap_or_default()
    }

    fn emit(&self, effect: Effect) {
        if self.effects.send(effect).is_err() {
            debug!("Effect receiver gone; dropping effect");
        }
    }

    // ---------------------------------------------------------------------
    // Page events
    // ---------------------------------------------------------------------

    /// Handles one page event and says what to do with its default action.
    pub fn handle_event(&mut self, event: PageEvent) -> Disposition {
        self.prune();
        match event {
            PageEvent::FocusIn { target } => {
                if let Some(surface) = resolve_from_target(&self.doc, target) {
                    self.remember_initial_value(surface);
                }
                Disposition::Allow
            }
            PageEvent::Input { target } => {
                if let Some(surface) = resolve_from_target(&self.doc, target) {
                    self.value_changed(surface);
                }
                Disposition::Allow
            }
            PageEvent::KeyDown { target, key, modifiers, replay } => {
                if key != "Enter" || modifiers.any() {
                    return Disposition::Allow;
                }
                let Some(surface) = resolve_from_target(&self.doc, target) else {
                    return Disposition::Allow;
                };
                if self.is_replay(replay) {
                    return Disposition::Allow;
                }
                self.begin_submission(surface, Trigger::EnterKey { target })
            }
            PageEvent::Click { target, replay } => self.on_click(target, replay),
            PageEvent::Submit { form } => self.on_form_submit(form),
            PageEvent::Confirmation { intent, confirmed } => {
                self.resolve_confirmation(intent, confirmed);
                Disposition::Allow
            }
            PageEvent::Relay(RelayPush::ShowPiiAlert { pii }) => {
                let lines: Vec<String> = pii.iter().map(ToString::to_string).collect();
                let message = format!(
                    "Sensitive information detected. The following data you entered may contain PII:\n{}\nPlease review before proceeding.",
                    lines.join("\n")
                );
                self.emit(Effect::PiiAlert { message, entities: pii });
                Disposition::Allow
            }
        }
    }

    fn is_replay(&mut self, replay: Option<ReplayToken>) -> bool {
        match replay {
            Some(token) if self.gate.take_replay(token) => {
                debug!("Letting replayed send through");
                true
            }
            _ => false,
        }
    }

    fn on_click(&mut self, target: ElementId, replay: Option<ReplayToken>) -> Disposition {
        if self.dismiss_overlay(target) {
            return Disposition::Allow;
        }
        let test_id = self.config.send_control_test_id.as_str();
        let Some(control) = self
            .doc
            .closest(target, |n| n.attrs.get("data-testid").map(String::as_str) == Some(test_id))
        else {
            return Disposition::Allow;
        };
        if self.is_replay(replay) {
            return Disposition::Allow;
        }
        let Some(surface) = deep_active_element(&self.doc).filter(|s| is_editable(&self.doc, *s)) else {
            return Disposition::Allow;
        };
        self.begin_submission(surface, Trigger::SendControl { control })
    }

    /// Handles clicks on a banner's or the hint's dismiss control.
    fn dismiss_overlay(&mut self, target: ElementId) -> bool {
        if let Some((hint, _)) = &self.health.hint {
            if self.doc.is_inclusive_ancestor(*hint, target) && self.doc.attr(target, "class") == Some(ui::DISMISS_CLASS) {
                let hint = *hint;
                self.doc.remove(hint);
                self.health.hint = None;
                return true;
            }
        }

        let owner = self
            .store
            .surfaces()
            .find(|(_, state)| state.banner.as_ref().is_some_and(|b| b.dismiss == target))
            .map(|(surface, _)| *surface);
        let Some(surface) = owner else { return false };
        let sending = self.gate.active_for(surface).is_some();
        if let Some(state) = self.store.get_mut(&self.doc, surface) {
            debug!("Banner on {} dismissed", surface);
            if sending {
                // The pending send still owns the indicator.
                ui::clear_banner(&mut self.doc, state);
                state.holds_flagged = false;
            } else {
                ui::clear_overlays(&mut self.doc, state);
            }
        }
        true
    }

    fn on_form_submit(&mut self, form: ElementId) -> Disposition {
        let flagged = self
            .store
            .surfaces()
            .any(|(surface, state)| state.holds_flagged && self.doc.is_inclusive_ancestor(form, *surface));
        if flagged {
            info!("Blocking submission of form {} holding flagged input", form);
            self.emit(Effect::SubmitBlocked { form });
            Disposition::Suppress
        } else {
            Disposition::Allow
        }
    }

    fn remember_initial_value(&mut self, surface: ElementId) {
        if self.store.contains(surface) {
            return;
        }
        let value = self.doc.value(surface).unwrap_or_default().to_string();
        self.store.set(&self.doc, surface, SurfaceState::with_clean_value(&value));
    }

    // ---------------------------------------------------------------------
    // Debounced validation
    // ---------------------------------------------------------------------

    /// Single entry point for "the value of `surface` changed", whichever
    /// producer noticed it.
    pub fn value_changed(&mut self, surface: ElementId) {
        if !is_editable(&self.doc, surface) {
            return;
        }
        if let Some(intent) = self.gate.abandon_surface(surface) {
            debug!("Edit on {} abandons {}", surface, intent.id);
            if intent.phase == IntentPhase::AwaitingConfirmation {
                self.emit(Effect::PromptClosed { intent: intent.id });
            }
        }
        if let Some((sampled, last_value)) = self.sampler.last.as_mut() {
            if *sampled == surface {
                *last_value = self.doc.value(surface).unwrap_or_default().to_string();
            }
        }
        let Some(state) = self.store.entry(&self.doc, surface) else { return };
        // Results of requests issued before this edit are stale from now on.
        state.next_seq();
        ui::clear_overlays(&mut self.doc, state);
        self.schedule(surface);
    }

    /// (Re)starts the quiet-interval timer of a surface.
    pub fn schedule(&mut self, surface: ElementId) {
        let delay = self.config.debounce();
        let Some(state) = self.store.entry(&self.doc, surface) else { return };
        state.pending_timer = Some(self.scheduler.debounce(surface, delay));
    }

    /// Polls the focused surface; feeds the same entry point as input
    /// notifications for pages that do not report edits reliably.
    pub fn sample_focused(&mut self) {
        let Some(surface) = deep_active_element(&self.doc).filter(|s| is_editable(&self.doc, *s)) else {
            self.sampler.last = None;
            return;
        };
        let value = self.doc.value(surface).unwrap_or_default().to_string();

        let previous = self.sampler.last.replace((surface, value.clone()));
        match previous {
            Some((last, ref last_value)) if last == surface => {
                if *last_value != value {
                    self.value_changed(surface);
                }
            }
            _ => {
                if !self.store.contains(surface) {
                    self.remember_initial_value(surface);
                    self.schedule(surface);
                }
            }
        }
    }

    fn validate(&mut self, surface: ElementId) {
        let value = self.doc.value(surface).unwrap_or_default().to_string();
        let cfg = &self.config.container;
        let Some(state) = self.store.get_mut(&self.doc, surface) else { return };
        let seq = state.next_seq();

        if value.trim().is_empty() {
            state.last_clean_value = value;
            ui::clear_overlays(&mut self.doc, state);
            return;
        }

        ui::begin_loading(&mut self.doc, state, surface, cfg);
        debug!("Validating {} (seq {}): {}", surface, seq, loggable(&value));
        self.scheduler.check_terms(Arc::clone(&self.client), surface, seq, value);
    }

    // ---------------------------------------------------------------------
    // Submission gate
    // ---------------------------------------------------------------------

    fn begin_submission(&mut self, surface: ElementId, trigger: Trigger) -> Disposition {
        if self.gate.active_for(surface).is_some() {
            debug!("Send on {} while a check is in flight; swallowed", surface);
            return Disposition::Suppress;
        }
        let text = self.doc.value(surface).unwrap_or_default().to_string();
        if text.trim().is_empty() {
            return Disposition::Allow;
        }

        let cfg = &self.config.container;
        let Some(state) = self.store.entry(&self.doc, surface) else {
            return Disposition::Allow;
        };
        // The send supersedes any validation still waiting for quiet.
        state.pending_timer = None;
        let seq = state.next_seq();
        ui::begin_loading(&mut self.doc, state, surface, cfg);

        let intent = self.gate.begin(surface, &text, trigger, seq);
        self.scheduler.ingest(Arc::clone(&self.client), intent, seq, text);
        Disposition::Suppress
    }

    fn release(&mut self, intent: IntentId, replay: bool) {
        let Some(release) = self.gate.release(intent, replay) else { return };
        if let Some(token) = release.replay {
            self.emit(Effect::Replay {
                intent,
                surface: release.intent.surface,
                trigger: release.intent.trigger,
                token,
            });
        }
    }

    fn resolve_confirmation(&mut self, intent: IntentId, confirmed: bool) {
        let Some(pending) = self.gate.get(intent) else {
            debug!("Confirmation for unknown {}", intent);
            return;
        };
        if pending.phase != IntentPhase::AwaitingConfirmation {
            return;
        }
        let surface = pending.surface;
        if confirmed {
            info!("{} confirmed by user", intent);
            self.mark_flagged(surface, false);
            self.release(intent, true);
        } else {
            info!("{} cancelled by user", intent);
            self.gate.cancel(intent);
        }
        self.start_indicator_expiry(surface);
    }

    // ---------------------------------------------------------------------
    // Completions
    // ---------------------------------------------------------------------

    /// Applies the outcome of previously spawned work.
    pub fn apply(&mut self, completion: Completion) {
        self.prune();
        match completion {
            Completion::DebounceElapsed { surface, token } => self.on_debounce(surface, token),
            Completion::IndicatorExpired { surface, token } => self.on_indicator_expired(surface, token),
            Completion::HintExpired { token } => {
                if self.health.hint.as_ref().is_some_and(|(_, timer)| timer.token() == token) {
                    if let Some((hint, _)) = self.health.hint.take() {
                        self.doc.remove(hint);
                    }
                }
            }
            Completion::TermsChecked { surface, seq, text, result } => {
                self.on_terms_checked(surface, seq, text, result)
            }
            Completion::Ingested { intent, seq, result } => self.on_ingested(intent, seq, result),
        }
    }

    fn on_debounce(&mut self, surface: ElementId, token: TimerToken) {
        let Some(state) = self.store.get_mut(&self.doc, surface) else { return };
        if state.pending_timer.as_ref().map(PendingTimer::token) != Some(token) {
            return;
        }
        state.pending_timer = None;
        if self.gate.active_for(surface).is_some() {
            return;
        }
        self.validate(surface);
    }

    fn on_indicator_expired(&mut self, surface: ElementId, token: TimerToken) {
        let cfg = &self.config.container;
        let Some(state) = self.store.get_mut(&self.doc, surface) else { return };
        if state.indicator_expiry.as_ref().map(PendingTimer::token) != Some(token) {
            return;
        }
        state.indicator_expiry = None;
        ui::set_indicator(&mut self.doc, state, surface, IndicatorState::None, cfg);
    }

    fn start_indicator_expiry(&mut self, surface: ElementId) {
        let ttl = self.config.indicator_ttl();
        let Some(state) = self.store.get_mut(&self.doc, surface) else { return };
        if matches!(state.indicator, IndicatorState::Flagged | IndicatorState::Clear) {
            state.indicator_expiry = Some(self.scheduler.expire_indicator(surface, ttl));
        }
    }

    /// Puts the indicator in its final state for this round.
    fn settle_indicator(&mut self, surface: ElementId, next: IndicatorState, expire: bool) {
        let cfg = &self.config.container;
        let Some(state) = self.store.get_mut(&self.doc, surface) else { return };
        ui::set_indicator(&mut self.doc, state, surface, next, cfg);
        if expire {
            self.start_indicator_expiry(surface);
        }
    }

    fn mark_flagged(&mut self, surface: ElementId, flagged: bool) {
        if let Some(state) = self.store.get_mut(&self.doc, surface) {
            state.holds_flagged = flagged;
        }
    }

    fn show_banner(&mut self, surface: ElementId, values: &[String]) {
        let cfg = &self.config.container;
        if let Some(state) = self.store.get_mut(&self.doc, surface) {
            ui::show_banner(&mut self.doc, state, surface, values, cfg);
        }
    }

    fn clear_banner(&mut self, surface: ElementId) {
        if let Some(state) = self.store.get_mut(&self.doc, surface) {
            ui::clear_banner(&mut self.doc, state);
        }
    }

    /// Removes `terms` from the live value of `surface`. Returns the new
    /// value, or `None` when nothing could be done.
    fn redact_in_place(&mut self, surface: ElementId, terms: &[String]) -> Option<String> {
        let current = self.doc.value(surface)?.to_string();
        let redacted = match redact(&current, terms) {
            Ok(redacted) => redacted,
            Err(e) => {
                warn!("Redaction on {} failed, leaving text alone: {}", surface, e);
                return None;
            }
        };
        if redacted != current {
            self.doc.set_value(surface, &redacted);
            if self.sampler.last.as_ref().is_some_and(|(s, _)| *s == surface) {
                self.sampler.last = Some((surface, redacted.clone()));
            }
        }
        if let Some(state) = self.store.get_mut(&self.doc, surface) {
            state.last_clean_value = redacted.clone();
        }
        Some(redacted)
    }

    fn on_terms_checked(
        &mut self,
        surface: ElementId,
        seq: u64,
        text: String,
        result: Result<TermCheck, DetectionError>,
    ) {
        let Some(state) = self.store.get_mut(&self.doc, surface) else {
            debug!("Dropping term check for detached surface {}", surface);
            return;
        };
        if state.request_seq != seq {
            debug!("Discarding stale term check for {} (seq {} < {})", surface, seq, state.request_seq);
            return;
        }
        self.note_outcome(result.as_ref().err());

        let check = match result {
            Ok(check) => check,
            Err(e) => {
                warn!("Term check failed for {}, failing open: {}", surface, e);
                self.settle_indicator(surface, IndicatorState::None, false);
                return;
            }
        };

        if check.matched_terms.is_empty() {
            if let Some(state) = self.store.get_mut(&self.doc, surface) {
                state.last_clean_value = text;
                state.holds_flagged = false;
            }
            self.clear_banner(surface);
            self.settle_indicator(surface, IndicatorState::Clear, true);
            return;
        }

        info!("{} sensitive term(s) found on {}", check.matched_terms.len(), surface);
        match self.config.policy {
            Policy::AutoRedact => {
                let failed = self.redact_in_place(surface, &check.matched_terms).is_none();
                self.mark_flagged(surface, failed);
            }
            Policy::Confirm => self.mark_flagged(surface, true),
        }
        self.settle_indicator(surface, IndicatorState::Flagged, true);
        self.show_banner(surface, &check.matched_terms);
    }

    fn on_ingested(&mut self, intent: IntentId, seq: u64, result: Result<PiiReport, DetectionError>) {
        let Some(pending) = self.gate.get(intent) else {
            debug!("Ingest result for settled {} ignored", intent);
            return;
        };
        let surface = pending.surface;
        let Some(state) = self.store.get_mut(&self.doc, surface) else {
            self.gate.cancel(intent);
            return;
        };
        if state.request_seq != seq {
            debug!("Ingest result for {} is stale; returning to idle", intent);
            self.gate.cancel(intent);
            self.settle_indicator(surface, IndicatorState::None, false);
            return;
        }
        self.note_outcome(result.as_ref().err());

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                warn!("Ingest failed for {}, releasing send: {}", intent, e);
                self.settle_indicator(surface, IndicatorState::None, false);
                self.release(intent, true);
                return;
            }
        };

        let entities = match report {
            PiiReport::Found(entities) if !entities.is_empty() => entities,
            _ => {
                self.mark_flagged(surface, false);
                self.clear_banner(surface);
                self.settle_indicator(surface, IndicatorState::Clear, true);
                self.release(intent, true);
                return;
            }
        };

        let values: Vec<String> = entities.iter().map(|e| e.value.clone()).collect();
        info!("{} PII item(s) in {}", entities.len(), intent);
        match self.config.policy {
            Policy::Confirm => {
                self.mark_flagged(surface, true);
                self.settle_indicator(surface, IndicatorState::Flagged, false);
                self.show_banner(surface, &values);
                self.gate.await_confirmation(intent);
                self.emit(Effect::ConfirmRequested { intent, surface, entities });
            }
            Policy::AutoRedact => {
                let failed = self.redact_in_place(surface, &values).is_none();
                self.mark_flagged(surface, failed);
                self.settle_indicator(surface, IndicatorState::Flagged, true);
                self.show_banner(surface, &values);
                self.release(intent, false);
            }
        }
    }

    /// Tracks relay health for the reload hint.
    fn note_outcome(&mut self, error: Option<&DetectionError>) {
        match error {
            Some(e) if e.is_relay_unavailable() => {
                self.health.consecutive_failures += 1;
                if self.health.consecutive_failures >= RELAY_FAILURES_BEFORE_HINT && !self.health.hint_shown {
                    self.health.hint_shown = true;
                    warn!("Relay unreachable {} times in a row", self.health.consecutive_failures);
                    if let Some(hint) = ui::show_hint(&mut self.doc, RELOAD_HINT) {
                        let timer = self.scheduler.expire_hint(HINT_TTL);
                        self.health.hint = Some((hint, timer));
                    }
                    self.emit(Effect::ReloadHint { message: RELOAD_HINT.to_string() });
                }
            }
            _ => self.health.consecutive_failures = 0,
        }
    }

    /// Forgets surfaces that left the page and takes down their overlays.
    fn prune(&mut self) {
        for (surface, mut state) in self.store.prune(&self.doc) {
            ui::clear_overlays(&mut self.doc, &mut state);
            if let Some(intent) = self.gate.active_for(surface) {
                if intent.phase == IntentPhase::AwaitingConfirmation {
                    self.emit(Effect::PromptClosed { intent: intent.id });
                }
            }
            self.gate.forget_surface(surface);
        }
        if self.sampler.last.as_ref().is_some_and(|(s, _)| !self.doc.contains(*s)) {
            self.sampler.last = None;
        }
    }

    // ---------------------------------------------------------------------
    // Driving
    // ---------------------------------------------------------------------

    /// Waits for the next completion and applies it. Returns false only if
    /// the completion channel closed.
    pub async fn process_next(&mut self) -> bool {
        match self.completions.recv().await {
            Some(completion) => {
                self.apply(completion);
                true
            }
            None => false,
        }
    }

    /// Applies every completion that is already available.
    pub fn process_ready(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions.try_recv() {
            self.apply(completion);
            applied += 1;
        }
        applied
    }

    /// Serves host commands, completions and the sampling tick until the
    /// command channel closes, then hands the agent back.
    pub async fn run(mut self, mut commands: mpsc::Receiver<AgentCommand>) -> Self {
        let mut sampling = tokio::time::interval(self.config.sample_interval());
        sampling.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(AgentCommand::Event { event, reply }) => {
                        let disposition = self.handle_event(event);
                        if let Some(reply) = reply {
                            let _ = reply.send(disposition);
                        }
                    }
                    Some(AgentCommand::Page(mutate)) => mutate(&mut self.doc),
                    Some(AgentCommand::Inspect(look)) => look(&self),
                    None => break,
                },
                Some(completion) = self.completions.recv() => self.apply(completion),
                _ = sampling.tick() => self.sample_focused(),
            }
        }
        info!("Agent stopped");
        self
    }
}
