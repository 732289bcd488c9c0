// inputguard-core/tests/agent_tests.rs
//! End-to-end behaviour of the agent against a scripted detection service.
//! Time is paused, so every timer and delay below is exact.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;

use inputguard_core::relay::ChannelTransport;
use inputguard_core::ui::{banner_chips, DISMISS_CLASS, HINT_CLASS, INDICATOR_ATTR};
use inputguard_core::{
    Agent, DetectionClient, DetectionError, Disposition, Document, Effect, ElementId, GuardConfig,
    IndicatorState, Modifiers, Node, PageEvent, PiiEntity, PiiReport, Policy, RelayDetectionClient,
    RelayPush, ReplayToken, TermCheck, Trigger,
};

struct ScriptedDetector {
    terms: Vec<String>,
    check_error: Option<DetectionError>,
    pii: Result<PiiReport, DetectionError>,
    check_delay: Duration,
    ingest_delay: Duration,
    checked: Mutex<Vec<String>>,
    ingested: Mutex<Vec<String>>,
}

impl ScriptedDetector {
    fn new() -> Self {
        Self {
            terms: Vec::new(),
            check_error: None,
            pii: Ok(PiiReport::None),
            check_delay: Duration::ZERO,
            ingest_delay: Duration::ZERO,
            checked: Mutex::new(Vec::new()),
            ingested: Mutex::new(Vec::new()),
        }
    }

    fn terms(mut self, terms: &[&str]) -> Self {
        self.terms = terms.iter().map(|t| t.to_string()).collect();
        self
    }

    fn check_error(mut self, error: DetectionError) -> Self {
        self.check_error = Some(error);
        self
    }

    fn pii(mut self, pii: Result<PiiReport, DetectionError>) -> Self {
        self.pii = pii;
        self
    }

    fn check_delay(mut self, delay: Duration) -> Self {
        self.check_delay = delay;
        self
    }

    fn ingest_delay(mut self, delay: Duration) -> Self {
        self.ingest_delay = delay;
        self
    }

    fn checked(&self) -> Vec<String> {
        self.checked.lock().unwrap().clone()
    }

    fn ingested(&self) -> Vec<String> {
        self.ingested.lock().unwrap().clone()
    }
}

#[async_trait]
impl DetectionClient for ScriptedDetector {
    async fn check_terms(&self, text: &str) -> Result<TermCheck, DetectionError> {
        self.checked.lock().unwrap().push(text.to_string());
        tokio::time::sleep(self.check_delay).await;
        if let Some(e) = &self.check_error {
            return Err(e.clone());
        }
        let lower = text.to_lowercase();
        let matched_terms = self
            .terms
            .iter()
            .filter(|t| lower.contains(&t.to_lowercase()))
            .cloned()
            .collect();
        Ok(TermCheck { matched_terms })
    }

    async fn ingest(&self, text: &str) -> Result<PiiReport, DetectionError> {
        self.ingested.lock().unwrap().push(text.to_string());
        tokio::time::sleep(self.ingest_delay).await;
        self.pii.clone()
    }
}

struct Page {
    agent: Agent,
    effects: UnboundedReceiver<Effect>,
    form: ElementId,
    bar: ElementId,
    field: ElementId,
    send: ElementId,
}

impl Page {
    fn new(config: GuardConfig, client: Arc<dyn DetectionClient>) -> Self {
        let mut doc = Document::new();
        let form = doc.append(doc.body(), Node::element("form").size(800.0, 120.0)).unwrap();
        let bar = doc.append(form, Node::div().size(700.0, 52.0)).unwrap();
        let field = doc.append(bar, Node::textarea().size(580.0, 20.0)).unwrap();
        let send = doc
            .append(bar, Node::button().attr("data-testid", "send-button").size(32.0, 32.0))
            .unwrap();
        doc.focus(field);
        let (agent, effects) = Agent::new(config, doc, client);
        Self { agent, effects, form, bar, field, send }
    }

    fn with(detector: &Arc<ScriptedDetector>) -> Self {
        Self::new(GuardConfig::default(), detector.clone())
    }

    fn type_text(&mut self, text: &str) {
        self.agent.document_mut().set_value(self.field, text);
        self.agent.handle_event(PageEvent::Input { target: self.field });
    }

    fn press_enter(&mut self) -> Disposition {
        self.agent.handle_event(PageEvent::enter(self.field))
    }

    fn value(&self) -> String {
        self.agent.document().value(self.field).unwrap_or_default().to_string()
    }

    fn indicator(&self) -> IndicatorState {
        self.agent.indicator(self.field)
    }

    fn banner(&self) -> Option<ElementId> {
        self.agent.state(self.field).and_then(|s| s.banner.as_ref()).map(|b| b.element)
    }

    fn effects(&mut self) -> Vec<Effect> {
        let mut out = Vec::new();
        while let Ok(effect) = self.effects.try_recv() {
            out.push(effect);
        }
        out
    }

    /// Lets `duration` of virtual time pass while the agent applies whatever
    /// completes in between.
    async fn run_for(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => break,
                more = self.agent.process_next() => if !more { break },
            }
        }
    }
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn replay_of(effects: &[Effect]) -> Vec<(Trigger, ReplayToken)> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Replay { trigger, token, .. } => Some((*trigger, *token)),
            _ => None,
        })
        .collect()
}

fn replayed_enter(target: ElementId, token: ReplayToken) -> PageEvent {
    PageEvent::KeyDown {
        target,
        key: "Enter".to_string(),
        modifiers: Modifiers::default(),
        replay: Some(token),
    }
}

fn find_by_class(doc: &Document, class: &str) -> Option<ElementId> {
    doc.descendants(doc.body())
        .into_iter()
        .find(|id| doc.attr(*id, "class") == Some(class))
}

// -------------------------------------------------------------------------
// Debounced validation
// -------------------------------------------------------------------------

#[test_log::test(tokio::test(start_paused = true))]
async fn test_rapid_edits_coalesce_into_one_check() {
    let detector = Arc::new(ScriptedDetector::new());
    let mut page = Page::with(&detector);

    page.type_text("h");
    page.run_for(ms(50)).await;
    page.type_text("he");
    page.run_for(ms(50)).await;
    page.type_text("hello");
    page.run_for(ms(1_000)).await;

    assert_eq!(detector.checked(), vec!["hello"]);
    assert_eq!(page.indicator(), IndicatorState::Clear);
    assert_eq!(page.agent.document().attr(page.bar, INDICATOR_ATTR), Some("clear"));
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_spaced_edits_each_get_a_check() {
    let detector = Arc::new(ScriptedDetector::new());
    let mut page = Page::with(&detector);

    page.type_text("first");
    page.run_for(ms(300)).await;
    page.type_text("first second");
    page.run_for(ms(1_000)).await;

    assert_eq!(detector.checked(), vec!["first", "first second"]);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_stale_result_is_discarded() {
    let detector = Arc::new(ScriptedDetector::new().terms(&["secret"]).check_delay(ms(500)));
    let mut page = Page::with(&detector);

    page.type_text("a secret plan");
    // Debounce fires at 220ms; the check is in flight until 720ms.
    page.run_for(ms(300)).await;
    page.type_text("a plain plan");
    // The stale result lands at 720ms, the fresh check is still running.
    page.run_for(ms(450)).await;
    assert_eq!(page.indicator(), IndicatorState::Loading);
    assert!(page.banner().is_none());

    page.run_for(ms(1_000)).await;
    assert_eq!(page.indicator(), IndicatorState::Clear);
    assert!(page.banner().is_none());
    assert_eq!(detector.checked().len(), 2);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_flagged_terms_render_banner_and_keep_text() {
    let detector = Arc::new(ScriptedDetector::new().terms(&["Project Falcon", "acme"]));
    let mut page = Page::with(&detector);

    page.type_text("ask ACME about project falcon");
    page.run_for(ms(500)).await;

    assert_eq!(page.indicator(), IndicatorState::Flagged);
    assert_eq!(page.value(), "ask ACME about project falcon");
    let banner = page.banner().expect("banner shown");
    assert_eq!(banner_chips(page.agent.document(), banner), vec!["Project Falcon", "acme"]);
    assert_eq!(page.agent.document().parent(banner), Some(page.form));
    // Confirm policy leaves the last clean value alone.
    assert_eq!(page.agent.state(page.field).unwrap().last_clean_value, "");
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_auto_redact_rewrites_text() {
    let detector = Arc::new(ScriptedDetector::new().terms(&["secret"]));
    let config = GuardConfig { policy: Policy::AutoRedact, ..GuardConfig::default() };
    let mut page = Page::new(config, detector.clone());

    page.type_text("my Secret plan");
    page.run_for(ms(500)).await;

    assert_eq!(page.value(), "my plan");
    assert_eq!(page.indicator(), IndicatorState::Flagged);
    assert_eq!(page.agent.state(page.field).unwrap().last_clean_value, "my plan");
    // Rewriting the text is not an edit; nothing is re-validated.
    page.run_for(ms(1_000)).await;
    assert_eq!(detector.checked().len(), 1);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_indicator_expires_but_banner_stays() {
    let detector = Arc::new(ScriptedDetector::new().terms(&["secret"]));
    let mut page = Page::with(&detector);

    page.type_text("secret");
    page.run_for(ms(500)).await;
    assert_eq!(page.indicator(), IndicatorState::Flagged);

    page.run_for(ms(8_000)).await;
    assert_eq!(page.indicator(), IndicatorState::None);
    assert_eq!(page.agent.document().attr(page.bar, INDICATOR_ATTR), None);
    assert!(page.banner().is_some());

    page.type_text("nothing here");
    assert!(page.banner().is_none());
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_check_failure_fails_open() {
    let detector = Arc::new(
        ScriptedDetector::new().check_error(DetectionError::Transport("connection refused".into())),
    );
    let mut page = Page::with(&detector);

    page.type_text("anything");
    page.run_for(ms(500)).await;

    assert_eq!(page.indicator(), IndicatorState::None);
    assert!(page.banner().is_none());
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_whitespace_only_text_is_not_sent() {
    let detector = Arc::new(ScriptedDetector::new());
    let mut page = Page::with(&detector);

    page.type_text("   ");
    page.run_for(ms(500)).await;

    assert!(detector.checked().is_empty());
    assert_eq!(page.indicator(), IndicatorState::None);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_dismiss_control_removes_banner() {
    let detector = Arc::new(ScriptedDetector::new().terms(&["secret"]));
    let mut page = Page::with(&detector);

    page.type_text("secret");
    page.run_for(ms(500)).await;
    let dismiss = page.agent.state(page.field).unwrap().banner.as_ref().unwrap().dismiss;
    let banner = page.banner().unwrap();

    assert_eq!(page.agent.handle_event(PageEvent::click(dismiss)), Disposition::Allow);
    assert!(!page.agent.document().contains(banner));
    assert!(page.banner().is_none());
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_sampler_picks_up_silent_edits() {
    let detector = Arc::new(ScriptedDetector::new());
    let mut page = Page::with(&detector);

    page.agent.document_mut().set_value(page.field, "draft");
    page.agent.sample_focused();
    page.run_for(ms(500)).await;
    assert_eq!(detector.checked(), vec!["draft"]);

    page.agent.document_mut().set_value(page.field, "draft two");
    page.agent.sample_focused();
    page.agent.sample_focused();
    page.run_for(ms(500)).await;
    assert_eq!(detector.checked(), vec!["draft", "draft two"]);
}

// -------------------------------------------------------------------------
// Submission gate
// -------------------------------------------------------------------------

#[test_log::test(tokio::test(start_paused = true))]
async fn test_clean_send_is_replayed_once() {
    let detector = Arc::new(ScriptedDetector::new().pii(Ok(PiiReport::None)));
    let mut page = Page::with(&detector);

    page.type_text("hello there");
    assert_eq!(page.press_enter(), Disposition::Suppress);
    page.run_for(ms(100)).await;

    let effects = page.effects();
    let replays = replay_of(&effects);
    assert_eq!(replays.len(), 1);
    assert_eq!(replays[0].0, Trigger::EnterKey { target: page.field });
    assert_eq!(detector.ingested(), vec!["hello there"]);
    assert_eq!(page.indicator(), IndicatorState::Clear);
    assert!(page.banner().is_none());
    // The pending debounce was superseded by the send.
    assert!(detector.checked().is_empty());

    let token = replays[0].1;
    let replayed = page.agent.handle_event(replayed_enter(page.field, token));
    assert_eq!(replayed, Disposition::Allow);
    // A token only lets one event through.
    let again = page.agent.handle_event(replayed_enter(page.field, token));
    assert_eq!(again, Disposition::Suppress);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_slow_service_times_out_and_releases() {
    let detector = Arc::new(ScriptedDetector::new().ingest_delay(Duration::from_secs(30)));
    let config = GuardConfig { request_timeout_ms: 1_000, ..GuardConfig::default() };
    let mut page = Page::new(config, detector.clone());

    page.type_text("hello");
    assert_eq!(page.press_enter(), Disposition::Suppress);
    page.run_for(ms(900)).await;
    assert!(replay_of(&page.effects()).is_empty());
    assert_eq!(page.indicator(), IndicatorState::Loading);

    page.run_for(ms(200)).await;
    assert_eq!(replay_of(&page.effects()).len(), 1);
    assert_eq!(page.indicator(), IndicatorState::None);
    assert_eq!(page.agent.gate().in_flight(), 0);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_ingest_failure_fails_open() {
    let detector = Arc::new(
        ScriptedDetector::new().pii(Err(DetectionError::Transport("HTTP status 502".into()))),
    );
    let mut page = Page::with(&detector);

    page.type_text("hello");
    page.press_enter();
    page.run_for(ms(100)).await;

    assert_eq!(replay_of(&page.effects()).len(), 1);
    assert_eq!(page.indicator(), IndicatorState::None);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_pii_requires_confirmation_then_replays() {
    let ssn = PiiEntity::new("US_SSN", "123-45-6789");
    let detector = Arc::new(ScriptedDetector::new().pii(Ok(PiiReport::Found(vec![ssn.clone()]))));
    let mut page = Page::with(&detector);

    page.type_text("my ssn is 123-45-6789");
    assert_eq!(page.press_enter(), Disposition::Suppress);
    page.run_for(ms(100)).await;

    let effects = page.effects();
    let intent = match effects.as_slice() {
        [Effect::ConfirmRequested { intent, surface, entities }] => {
            assert_eq!(*surface, page.field);
            assert_eq!(entities, &vec![ssn.clone()]);
            *intent
        }
        other => panic!("expected a confirmation request, got {:?}", other),
    };
    assert_eq!(page.indicator(), IndicatorState::Flagged);
    let banner = page.banner().unwrap();
    assert_eq!(banner_chips(page.agent.document(), banner), vec!["123-45-6789"]);

    // Another Enter while the prompt is open is swallowed.
    assert_eq!(page.press_enter(), Disposition::Suppress);
    assert_eq!(detector.ingested().len(), 1);

    page.agent.handle_event(PageEvent::Confirmation { intent, confirmed: true });
    page.agent.handle_event(PageEvent::Confirmation { intent, confirmed: true });
    let replays = replay_of(&page.effects());
    assert_eq!(replays.len(), 1);
    assert_eq!(page.agent.handle_event(replayed_enter(page.field, replays[0].1)), Disposition::Allow);
    assert_eq!(page.value(), "my ssn is 123-45-6789");
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_declined_confirmation_keeps_text_and_flag() {
    let detector = Arc::new(
        ScriptedDetector::new().pii(Ok(PiiReport::Found(vec![PiiEntity::new("EMAIL", "a@b.io")]))),
    );
    let mut page = Page::with(&detector);

    page.type_text("mail a@b.io");
    page.press_enter();
    page.run_for(ms(100)).await;
    let intent = match page.effects().pop() {
        Some(Effect::ConfirmRequested { intent, .. }) => intent,
        other => panic!("expected a confirmation request, got {:?}", other),
    };

    page.agent.handle_event(PageEvent::Confirmation { intent, confirmed: false });
    assert!(page.effects().is_empty());
    assert_eq!(page.agent.gate().in_flight(), 0);
    assert_eq!(page.indicator(), IndicatorState::Flagged);
    assert_eq!(page.value(), "mail a@b.io");

    page.run_for(ms(8_500)).await;
    assert_eq!(page.indicator(), IndicatorState::None);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_edit_while_prompt_open_closes_it() {
    let detector = Arc::new(
        ScriptedDetector::new().pii(Ok(PiiReport::Found(vec![PiiEntity::new("EMAIL", "a@b.io")]))),
    );
    let mut page = Page::with(&detector);

    page.type_text("mail a@b.io");
    page.press_enter();
    page.run_for(ms(100)).await;
    let intent = match page.effects().pop() {
        Some(Effect::ConfirmRequested { intent, .. }) => intent,
        other => panic!("expected a confirmation request, got {:?}", other),
    };

    page.type_text("mail me");
    assert_eq!(page.effects(), vec![Effect::PromptClosed { intent }]);
    assert_eq!(page.agent.gate().in_flight(), 0);
    assert!(page.banner().is_none());

    // A late answer to the closed prompt changes nothing.
    page.agent.handle_event(PageEvent::Confirmation { intent, confirmed: true });
    assert!(replay_of(&page.effects()).is_empty());
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_auto_redact_send_is_not_replayed() {
    let detector = Arc::new(
        ScriptedDetector::new().pii(Ok(PiiReport::Found(vec![PiiEntity::new("US_SSN", "123-45-6789")]))),
    );
    let config = GuardConfig { policy: Policy::AutoRedact, ..GuardConfig::default() };
    let mut page = Page::new(config, detector.clone());

    page.type_text("my ssn is 123-45-6789");
    page.press_enter();
    page.run_for(ms(100)).await;

    assert_eq!(page.value(), "my ssn is");
    assert!(page.effects().is_empty());
    assert_eq!(page.indicator(), IndicatorState::Flagged);
    assert!(page.banner().is_some());
    assert_eq!(page.agent.gate().in_flight(), 0);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_send_control_click_is_gated() {
    let detector = Arc::new(ScriptedDetector::new());
    let mut page = Page::with(&detector);

    page.type_text("hello");
    let label = page
        .agent
        .document_mut()
        .append(page.send, Node::element("span").text("Send"))
        .unwrap();
    assert_eq!(page.agent.handle_event(PageEvent::click(label)), Disposition::Suppress);
    page.run_for(ms(100)).await;

    let replays = replay_of(&page.effects());
    assert_eq!(replays.len(), 1);
    assert_eq!(replays[0].0, Trigger::SendControl { control: page.send });
    let replayed = PageEvent::Click { target: page.send, replay: Some(replays[0].1) };
    assert_eq!(page.agent.handle_event(replayed), Disposition::Allow);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_modified_enter_and_empty_text_pass_through() {
    let detector = Arc::new(ScriptedDetector::new());
    let mut page = Page::with(&detector);

    page.type_text("line one");
    let shift_enter = PageEvent::KeyDown {
        target: page.field,
        key: "Enter".to_string(),
        modifiers: Modifiers { shift: true, ..Modifiers::default() },
        replay: None,
    };
    assert_eq!(page.agent.handle_event(shift_enter), Disposition::Allow);

    page.type_text("");
    assert_eq!(page.press_enter(), Disposition::Allow);
    assert!(detector.ingested().is_empty());
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_form_submit_blocked_while_flagged() {
    let detector = Arc::new(ScriptedDetector::new().terms(&["secret"]));
    let mut page = Page::with(&detector);

    assert_eq!(page.agent.handle_event(PageEvent::Submit { form: page.form }), Disposition::Allow);

    page.type_text("secret");
    page.run_for(ms(500)).await;
    assert_eq!(page.agent.handle_event(PageEvent::Submit { form: page.form }), Disposition::Suppress);
    assert_eq!(page.effects(), vec![Effect::SubmitBlocked { form: page.form }]);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_form_stays_blocked_after_indicator_expires() {
    let detector = Arc::new(ScriptedDetector::new().terms(&["secret"]));
    let mut page = Page::with(&detector);

    page.type_text("my secret");
    page.run_for(ms(500)).await;
    assert_eq!(page.agent.handle_event(PageEvent::Submit { form: page.form }), Disposition::Suppress);

    page.run_for(Duration::from_secs(9)).await;
    assert_eq!(page.indicator(), IndicatorState::None);
    assert_eq!(page.value(), "my secret");
    assert_eq!(page.agent.handle_event(PageEvent::Submit { form: page.form }), Disposition::Suppress);

    // Editing to clean text lifts the block.
    page.type_text("my plan");
    page.run_for(ms(500)).await;
    assert_eq!(page.indicator(), IndicatorState::Clear);
    assert_eq!(page.agent.handle_event(PageEvent::Submit { form: page.form }), Disposition::Allow);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_dismissed_banner_lifts_form_block() {
    let detector = Arc::new(ScriptedDetector::new().terms(&["secret"]));
    let mut page = Page::with(&detector);

    page.type_text("secret");
    page.run_for(ms(500)).await;
    let dismiss = page.agent.state(page.field).unwrap().banner.as_ref().unwrap().dismiss;
    page.agent.handle_event(PageEvent::click(dismiss));

    assert_eq!(page.agent.handle_event(PageEvent::Submit { form: page.form }), Disposition::Allow);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_confirmed_send_does_not_block_its_form() {
    let detector = Arc::new(
        ScriptedDetector::new().pii(Ok(PiiReport::Found(vec![PiiEntity::new("PHONE", "555-1234")]))),
    );
    let mut page = Page::with(&detector);

    page.type_text("call 555-1234");
    page.press_enter();
    page.run_for(ms(100)).await;
    let intent = match page.effects().pop() {
        Some(Effect::ConfirmRequested { intent, .. }) => intent,
        other => panic!("expected a confirmation request, got {:?}", other),
    };
    assert_eq!(page.agent.handle_event(PageEvent::Submit { form: page.form }), Disposition::Suppress);
    page.effects();

    page.agent.handle_event(PageEvent::Confirmation { intent, confirmed: true });
    assert_eq!(replay_of(&page.effects()).len(), 1);
    assert_eq!(page.agent.handle_event(PageEvent::Submit { form: page.form }), Disposition::Allow);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_dismissing_old_banner_mid_send_keeps_indicator_for_prompt() {
    let detector = Arc::new(
        ScriptedDetector::new()
            .terms(&["secret"])
            .pii(Ok(PiiReport::Found(vec![PiiEntity::new("PHONE", "555-1234")])))
            .ingest_delay(ms(300)),
    );
    let mut page = Page::with(&detector);

    page.type_text("secret 555-1234");
    page.run_for(ms(500)).await;
    assert_eq!(page.indicator(), IndicatorState::Flagged);
    let dismiss = page.agent.state(page.field).unwrap().banner.as_ref().unwrap().dismiss;

    assert_eq!(page.press_enter(), Disposition::Suppress);
    assert_eq!(page.indicator(), IndicatorState::Loading);
    page.agent.handle_event(PageEvent::click(dismiss));
    assert_eq!(page.indicator(), IndicatorState::Loading);

    page.run_for(ms(500)).await;
    assert!(matches!(page.effects().as_slice(), [Effect::ConfirmRequested { .. }]));
    assert_eq!(page.indicator(), IndicatorState::Flagged);
    let banner = page.banner().expect("PII banner shown");
    assert_eq!(banner_chips(page.agent.document(), banner), vec!["555-1234"]);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_replayed_click_spends_token_even_without_focus() {
    let detector = Arc::new(ScriptedDetector::new());
    let mut page = Page::with(&detector);

    page.type_text("hello");
    assert_eq!(page.agent.handle_event(PageEvent::click(page.send)), Disposition::Suppress);
    page.run_for(ms(100)).await;
    let replays = replay_of(&page.effects());
    assert_eq!(replays.len(), 1);
    let replayed = PageEvent::Click { target: page.send, replay: Some(replays[0].1) };

    page.agent.document_mut().blur();
    assert_eq!(page.agent.handle_event(replayed.clone()), Disposition::Allow);

    // The token is gone: the same click, once focus is back, is gated anew.
    page.agent.document_mut().focus(page.field);
    assert_eq!(page.agent.handle_event(replayed), Disposition::Suppress);
    assert_eq!(detector.ingested().len(), 2);
}

// -------------------------------------------------------------------------
// Lifecycle and relay
// -------------------------------------------------------------------------

#[test_log::test(tokio::test(start_paused = true))]
async fn test_detached_surface_cancels_pending_check() {
    let detector = Arc::new(ScriptedDetector::new().terms(&["secret"]));
    let mut page = Page::with(&detector);

    page.type_text("secret");
    page.run_for(ms(100)).await;
    page.agent.document_mut().remove(page.field);
    page.run_for(ms(1_000)).await;

    assert!(detector.checked().is_empty());
    assert!(page.agent.store().is_empty());
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_detached_surface_takes_its_banner_along() {
    let detector = Arc::new(ScriptedDetector::new().terms(&["secret"]));
    let mut page = Page::with(&detector);

    page.type_text("secret");
    page.run_for(ms(500)).await;
    let banner = page.banner().unwrap();
    assert_eq!(page.agent.document().attr(page.bar, INDICATOR_ATTR), Some("flagged"));

    page.agent.document_mut().remove(page.field);
    page.agent.handle_event(PageEvent::FocusIn { target: page.send });

    assert!(!page.agent.document().contains(banner));
    assert_eq!(page.agent.document().attr(page.bar, INDICATOR_ATTR), None);
    assert!(page.agent.store().is_empty());
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_detach_during_ingest_drops_intent() {
    let detector = Arc::new(ScriptedDetector::new().ingest_delay(ms(500)));
    let mut page = Page::with(&detector);

    page.type_text("hello");
    page.press_enter();
    page.run_for(ms(100)).await;
    page.agent.document_mut().remove(page.field);
    page.run_for(ms(1_000)).await;

    assert!(page.effects().is_empty());
    assert_eq!(page.agent.gate().in_flight(), 0);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_reload_hint_after_repeated_relay_failures() {
    let (transport, relay_side) = ChannelTransport::pair(1);
    drop(relay_side);
    let client = Arc::new(RelayDetectionClient::new(transport));
    let mut page = Page::new(GuardConfig::default(), client);

    page.type_text("one");
    page.run_for(ms(500)).await;
    assert!(page.effects().is_empty());
    assert_eq!(page.indicator(), IndicatorState::None);

    page.type_text("two");
    page.run_for(ms(500)).await;
    let effects = page.effects();
    assert!(matches!(effects.as_slice(), [Effect::ReloadHint { .. }]));
    assert!(find_by_class(page.agent.document(), HINT_CLASS).is_some());

    page.type_text("three");
    page.run_for(ms(500)).await;
    assert!(page.effects().is_empty());

    page.run_for(Duration::from_secs(4)).await;
    assert!(find_by_class(page.agent.document(), HINT_CLASS).is_none());
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_reload_hint_can_be_dismissed() {
    let (transport, relay_side) = ChannelTransport::pair(1);
    drop(relay_side);
    let client = Arc::new(RelayDetectionClient::new(transport));
    let mut page = Page::new(GuardConfig::default(), client);

    for text in ["one", "two"] {
        page.type_text(text);
        page.run_for(ms(500)).await;
    }
    let hint = find_by_class(page.agent.document(), HINT_CLASS).expect("hint shown");
    let dismiss = page.agent.document().children(hint)[0];
    assert_eq!(page.agent.document().attr(dismiss, "class"), Some(DISMISS_CLASS));

    assert_eq!(page.agent.handle_event(PageEvent::click(dismiss)), Disposition::Allow);
    assert!(!page.agent.document().contains(hint));
    assert!(find_by_class(page.agent.document(), HINT_CLASS).is_none());

    // The cancelled expiry has nothing left to remove.
    page.run_for(Duration::from_secs(5)).await;
    assert!(find_by_class(page.agent.document(), HINT_CLASS).is_none());
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_relay_pii_alert_lists_entities() {
    let detector = Arc::new(ScriptedDetector::new());
    let mut page = Page::with(&detector);

    let pii = vec![PiiEntity::new("EMAIL", "a@b.io"), PiiEntity::new("PHONE", "555-0100")];
    page.agent.handle_event(PageEvent::Relay(RelayPush::ShowPiiAlert { pii: pii.clone() }));

    match page.effects().as_slice() {
        [Effect::PiiAlert { message, entities }] => {
            assert!(message.contains("EMAIL: a@b.io"));
            assert!(message.contains("PHONE: 555-0100"));
            assert_eq!(entities, &pii);
        }
        other => panic!("expected a PII alert, got {:?}", other),
    }
}
