// inputguard/src/lib.rs
//! # InputGuard CLI and relay host
//!
//! The `inputguard` binary hosts the relay the in-page agent talks to (as a
//! native-messaging host), keeps the endpoint settings, and exposes the
//! engine through a few one-shot commands and an interactive session.

pub mod cli;
pub mod commands;
pub mod logger;
pub mod native_host;
pub mod output;
pub mod relay;
pub mod settings;

pub use relay::RelayService;
