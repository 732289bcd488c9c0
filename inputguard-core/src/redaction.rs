// inputguard-core/src/redaction.rs
//! Redaction of matched sensitive substrings, plus the helpers that keep
//! user text out of debug logs.

use std::collections::HashSet;

use lazy_static::lazy_static;
use log::debug;
use regex::{Regex, RegexBuilder};

use crate::errors::GuardError;

lazy_static! {
    /// Whether raw user text may appear in debug logs.
    static ref PII_DEBUG_ALLOWED: bool = {
        std::env::var("INPUTGUARD_ALLOW_DEBUG_PII")
            .map(|s| s.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    };

    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s{2,}").expect("static pattern");
}

/// Placeholder for a piece of user text that must not be logged verbatim.
pub fn mask(s: &str) -> String {
    const MAX_LEN: usize = 8;
    let chars = s.chars().count();
    if chars <= MAX_LEN {
        "[REDACTED]".to_string()
    } else {
        format!("[REDACTED: {} chars]", chars)
    }
}

/// What may be printed for `text` in a log line.
pub fn loggable(text: &str) -> String {
    if *PII_DEBUG_ALLOWED {
        text.to_string()
    } else {
        mask(text)
    }
}

/// A de-duplicated, compiled set of literal terms.
#[derive(Debug)]
pub struct TermSet {
    terms: Vec<String>,
    patterns: Vec<Regex>,
}

impl TermSet {
    /// Compiles `terms` as case-insensitive literals. Duplicates (exact
    /// repeats) and empty terms are dropped, first occurrence wins.
    pub fn compile<S: AsRef<str>>(terms: &[S]) -> Result<Self, GuardError> {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        let mut patterns = Vec::new();

        for term in terms.iter().map(AsRef::as_ref) {
            if term.is_empty() || !seen.insert(term) {
                continue;
            }
            let regex = RegexBuilder::new(&regex::escape(term))
                .case_insensitive(true)
                .build()
                .map_err(|e| GuardError::TermCompilationError(loggable(term), e))?;
            unique.push(term.to_string());
            patterns.push(regex);
        }

        Ok(Self { terms: unique, patterns })
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True when any term occurs in `text`.
    pub fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(text))
    }

    fn remove_once(&self, text: &str) -> String {
        let mut out = text.to_string();
        for re in &self.patterns {
            if re.is_match(&out) {
                out = re.replace_all(&out, "").into_owned();
            }
        }
        WHITESPACE_RUN.replace_all(&out, " ").trim().to_string()
    }

    /// Removes every occurrence of every term from `text`, then collapses
    /// whitespace runs and trims.
    ///
    /// The removal is repeated until no term matches, so joins created by a
    /// removal are caught too and the result is a fixpoint.
    pub fn redact(&self, text: &str) -> String {
        let mut current = self.remove_once(text);
        while self.matches(&current) {
            let next = self.remove_once(&current);
            if next == current {
                break;
            }
            current = next;
        }
        if current != text {
            debug!(
                "Redacted {} term(s): '{}' -> '{}'",
                self.terms.len(),
                loggable(text),
                loggable(&current)
            );
        }
        current
    }
}

/// One-shot form of `TermSet::redact`.
pub fn redact<S: AsRef<str>>(text: &str, terms: &[S]) -> Result<String, GuardError> {
    Ok(TermSet::compile(terms)?.redact(text))
}

/// Distinct values in first-seen order.
pub fn unique_ordered<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for value in values {
        let value = value.into();
        if seen.insert(value.clone()) {
            out.push(value);
        }
    }
    out
}
