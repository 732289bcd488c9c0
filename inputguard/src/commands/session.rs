// inputguard/src/commands/session.rs
//! `inputguard session`: runs the agent against a one-field composer.
//!
//! Every stdin line is typed into the composer, left to validate, then sent
//! with Enter. Confirmation prompts read their answer from the next line.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::debug;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc::UnboundedReceiver;

use inputguard_core::{
    Agent, Disposition, Document, Effect, ElementId, GuardConfig, HttpDetectionClient, IndicatorState, Modifiers,
    Node, PageEvent,
};

use crate::cli::SessionCommand;
use crate::commands::effective_endpoints;
use crate::output::{out, Tone};

type Input = Lines<BufReader<Stdin>>;

/// A composer page: a form holding the input bar with a text area and a
/// send button.
fn composer(send_control_test_id: &str) -> Result<(Document, ElementId)> {
    let mut doc = Document::new();
    let build = |doc: &mut Document| -> Option<ElementId> {
        let form = doc.append(doc.body(), Node::element("form").size(800.0, 120.0))?;
        let bar = doc.append(form, Node::div().size(700.0, 52.0))?;
        let field = doc.append(bar, Node::textarea().attr("placeholder", "Message").size(580.0, 24.0))?;
        doc.append(bar, Node::button().attr("data-testid", send_control_test_id).size(32.0, 32.0))?;
        doc.focus(field);
        Some(field)
    };
    let field = build(&mut doc).context("Failed to build the composer page")?;
    Ok((doc, field))
}

/// Applies completions until the surface has nothing pending.
async fn settle(agent: &mut Agent, surface: ElementId) {
    while agent
        .state(surface)
        .is_some_and(|s| s.pending_timer.is_some() || s.indicator == IndicatorState::Loading)
    {
        if !agent.process_next().await {
            break;
        }
    }
}

fn type_into(agent: &mut Agent, surface: ElementId, text: &str) {
    agent.document_mut().set_value(surface, text);
    agent.handle_event(PageEvent::Input { target: surface });
}

fn report(agent: &Agent, surface: ElementId) {
    let Some(state) = agent.state(surface) else { return };
    match state.indicator {
        IndicatorState::Flagged => out(Tone::Warn, "[flagged]"),
        IndicatorState::Clear => out(Tone::Success, "[clear]"),
        IndicatorState::Loading | IndicatorState::None => {}
    }
    if let Some(banner) = &state.banner {
        let heading = agent.document().value(banner.element).unwrap_or_default();
        out(Tone::Sensitive, &format!("{}: {}", heading, banner.items.join(", ")));
    }
}

async fn ask(input: &mut Input, question: &str) -> Result<bool> {
    out(Tone::Prompt, question);
    let answer = input.next_line().await.context("Failed to read answer")?;
    Ok(matches!(answer.as_deref().map(str::trim), Some("y" | "Y" | "yes")))
}

/// Plays the host's part for everything the agent asked of it.
async fn host_effects(
    agent: &mut Agent,
    effects: &mut UnboundedReceiver<Effect>,
    input: &mut Input,
    surface: ElementId,
) -> Result<bool> {
    let mut sent = false;
    while let Ok(effect) = effects.try_recv() {
        match effect {
            Effect::Replay { token, .. } => {
                let text = agent.document().value(surface).unwrap_or_default().to_string();
                let replayed = PageEvent::KeyDown {
                    target: surface,
                    key: "Enter".to_string(),
                    modifiers: Modifiers::default(),
                    replay: Some(token),
                };
                if agent.handle_event(replayed) == Disposition::Allow {
                    out(Tone::Success, &format!("sent: {}", text));
                    sent = true;
                }
            }
            Effect::ConfirmRequested { intent, entities, .. } => {
                out(Tone::Warn, "This message may contain PII:");
                for entity in &entities {
                    out(Tone::Sensitive, &format!("  {}", entity));
                }
                let confirmed = ask(input, "Send anyway? [y/N]").await?;
                agent.handle_event(PageEvent::Confirmation { intent, confirmed });
                if !confirmed {
                    out(Tone::Info, "not sent");
                }
            }
            Effect::PromptClosed { intent } => debug!("{} prompt closed", intent),
            Effect::SubmitBlocked { .. } => out(Tone::Warn, "form submission blocked"),
            Effect::ReloadHint { message } => out(Tone::Warn, &message),
            Effect::PiiAlert { message, .. } => out(Tone::Warn, &message),
        }
    }
    Ok(sent)
}

pub async fn run_session(cmd: SessionCommand, config: &GuardConfig) -> Result<()> {
    let mut config = config.clone();
    if let Some(policy) = cmd.policy {
        config.policy = policy;
    }
    let (endpoints, _) = effective_endpoints(&config)?;
    config.endpoints = endpoints.clone();
    let client = HttpDetectionClient::with_timeout(endpoints, config.request_timeout())
        .context("Failed to build HTTP client")?;

    let (doc, field) = composer(&config.send_control_test_id)?;
    let (mut agent, mut effects) = Agent::new(config, doc, Arc::new(client));
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = input.next_line().await.context("Failed to read stdin")? {
        type_into(&mut agent, field, &line);
        settle(&mut agent, field).await;
        report(&agent, field);

        if agent.handle_event(PageEvent::enter(field)) == Disposition::Allow {
            out(Tone::Info, "nothing to send");
            continue;
        }
        settle(&mut agent, field).await;
        report(&agent, field);

        let before = line.clone();
        let sent = host_effects(&mut agent, &mut effects, &mut input, field).await?;
        if sent {
            type_into(&mut agent, field, "");
        } else {
            let now = agent.document().value(field).unwrap_or_default().to_string();
            if now != before {
                out(Tone::Info, &format!("redacted, not sent: {}", now));
            }
        }
    }
    Ok(())
}
