// inputguard/src/logger.rs
//! Logger setup for the binary.
//!
//! Logs always go to stderr: in relay mode stdout carries protocol frames.

use env_logger::{Builder, Env, Target};
use log::LevelFilter;

/// Initialises `env_logger`. `RUST_LOG` applies unless `level` overrides it.
/// Calling this more than once is harmless.
pub fn init_logger(level: Option<LevelFilter>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    builder.target(Target::Stderr);
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder.try_init().ok();
}

/// Maps the `--quiet`/`--debug` flags to an override.
pub fn level_from_flags(quiet: bool, debug: bool) -> Option<LevelFilter> {
    match (quiet, debug) {
        (true, _) => Some(LevelFilter::Off),
        (false, true) => Some(LevelFilter::Debug),
        (false, false) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_wins_over_debug() {
        assert_eq!(level_from_flags(true, true), Some(LevelFilter::Off));
        assert_eq!(level_from_flags(false, true), Some(LevelFilter::Debug));
        assert_eq!(level_from_flags(false, false), None);
    }
}
