// inputguard-core/src/lib.rs
//! # InputGuard Core Library
//!
//! `inputguard-core` keeps sensitive text from leaving a page by accident.
//! It watches the editable surfaces of a host page, validates what the user
//! types against an external detection service once typing settles, shows
//! the result next to the input, and holds every send until the service has
//! had a say.
//!
//! The host page is modelled by [`Document`], an arena of nodes addressed by
//! generational [`ElementId`]s. Nothing in the library keeps a removed
//! element alive; state belonging to a detached surface simply stops
//! resolving and is dropped.
//!
//! ## Modules
//!
//! * `page`: The host page model (`Document`, `Node`, `ElementId`).
//! * `resolver`: Maps event targets to the editable surface behind them.
//! * `store`: Per-surface state and the indicator state machine.
//! * `pipeline`: Timers and bounded detection calls, reported as `Completion`s.
//! * `detection`: The `DetectionClient` seam and its HTTP implementation.
//! * `relay`: The page ⇄ relay message protocol and a relay-backed client.
//! * `redaction`: Literal, case-insensitive term removal.
//! * `ui`: Indicator attribute, banner and hint overlays.
//! * `gate`: Submission intents and single-use replay tokens.
//! * `agent`: Ties everything together behind page events.
//! * `config`: `GuardConfig`, loaded from YAML.
//! * `errors`: `GuardError` and `DetectionError`.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use inputguard_core::{Agent, Document, GuardConfig, HttpDetectionClient, Node, PageEvent};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = GuardConfig::default();
//!     let client = Arc::new(HttpDetectionClient::new(config.endpoints.clone()));
//!
//!     let mut doc = Document::new();
//!     let field = doc.append(doc.body(), Node::textarea()).expect("body is attached");
//!     doc.set_value(field, "my ssn is 123-45-6789");
//!
//!     let (mut agent, _effects) = Agent::new(config, doc, client);
//!     agent.handle_event(PageEvent::Input { target: field });
//!     // Debounce elapses, then the term check comes back.
//!     agent.process_next().await;
//!     agent.process_next().await;
//!     println!("indicator: {:?}", agent.indicator(field));
//! }
//! ```
//!
//! ## Error Handling
//!
//! Configuration and redaction failures are `GuardError`s. Anything that goes
//! wrong talking to the detection service is a `DetectionError`, and the
//! agent always fails open on those: the user's send goes through.
//!
//! ---
//! License: MIT OR Apache-2.0

pub mod agent;
pub mod config;
pub mod detection;
pub mod errors;
pub mod gate;
pub mod page;
pub mod pipeline;
pub mod redaction;
pub mod relay;
pub mod resolver;
pub mod store;
pub mod ui;

/// Re-exports the agent and the event vocabulary hosts speak to it with.
pub use agent::{Agent, AgentCommand, Disposition, Effect, Modifiers, PageEvent, RELOAD_HINT};

pub use config::{ContainerConfig, Endpoints, GuardConfig, Policy, DEFAULT_CHECK_URL, DEFAULT_INGEST_URL};

pub use detection::{DetectionClient, HttpDetectionClient, PiiEntity, PiiReport, TermCheck};

pub use errors::{DetectionError, GuardError};

pub use gate::{IntentId, ReplayToken, SubmissionGate, Trigger};

pub use page::{Document, ElementId, Node, NodeKind, Rect};

pub use redaction::{redact, TermSet};

pub use relay::{ChannelTransport, RelayDetectionClient, RelayEnvelope, RelayPush, RelayRequest, RelayResponse, RelayTransport};

pub use store::{IndicatorState, StateStore, SurfaceState};
