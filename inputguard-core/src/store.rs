// inputguard-core/src/store.rs
//! Per-surface state, keyed by `ElementId`.
//!
//! The store only ever holds generational ids, so it cannot keep a detached
//! element alive. Entries whose id no longer resolves are dropped on access
//! or on `prune`, which also aborts their timers.

use std::collections::HashMap;

use log::debug;

use crate::page::{Document, ElementId};
use crate::pipeline::PendingTimer;
use crate::ui::Banner;

/// Three-state visual cue plus "nothing shown".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndicatorState {
    #[default]
    None,
    Loading,
    Flagged,
    Clear,
}

impl IndicatorState {
    /// `none → loading → {flagged, clear, none}`; anything may fall back
    /// to `none`.
    pub fn can_transition_to(self, next: IndicatorState) -> bool {
        use IndicatorState::*;
        matches!(
            (self, next),
            (_, None) | (None, Loading) | (Loading, Flagged) | (Loading, Clear)
        )
    }

    /// Attribute value written on the container.
    pub fn as_attr(self) -> Option<&'static str> {
        match self {
            IndicatorState::None => Option::None,
            IndicatorState::Loading => Some("loading"),
            IndicatorState::Flagged => Some("flagged"),
            IndicatorState::Clear => Some("clear"),
        }
    }
}

#[derive(Debug, Default)]
pub struct SurfaceState {
    /// Last value known to have passed validation (or been redacted).
    pub last_clean_value: String,
    pub pending_timer: Option<PendingTimer>,
    pub indicator: IndicatorState,
    /// Element currently carrying the indicator attribute.
    pub indicator_host: Option<ElementId>,
    pub indicator_expiry: Option<PendingTimer>,
    pub banner: Option<Banner>,
    /// The live value holds content detection flagged. Outlives the
    /// indicator; only a clean result, an edit, a dismissal or a confirmed
    /// send clears it.
    pub holds_flagged: bool,
    /// Bumped for every issued request and every edit.
    pub request_seq: u64,
}

impl SurfaceState {
    pub fn with_clean_value(value: &str) -> Self {
        Self { last_clean_value: value.to_string(), ..Default::default() }
    }

    /// Starts a new request generation and returns its number.
    pub fn next_seq(&mut self) -> u64 {
        self.request_seq += 1;
        self.request_seq
    }
}

/// Identity-keyed, ephemeral store of `SurfaceState`.
#[derive(Debug, Default)]
pub struct StateStore {
    entries: HashMap<ElementId, SurfaceState>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of an attached surface. `None` also means "never validated".
    pub fn get(&self, doc: &Document, surface: ElementId) -> Option<&SurfaceState> {
        if !doc.contains(surface) {
            return None;
        }
        self.entries.get(&surface)
    }

    /// Mutable state of an attached surface; a detached surface's entry is
    /// dropped instead.
    pub fn get_mut(&mut self, doc: &Document, surface: ElementId) -> Option<&mut SurfaceState> {
        if !doc.contains(surface) {
            self.clear(surface);
            return None;
        }
        self.entries.get_mut(&surface)
    }

    /// Existing or fresh state for an attached surface.
    pub fn entry(&mut self, doc: &Document, surface: ElementId) -> Option<&mut SurfaceState> {
        if !doc.contains(surface) {
            self.clear(surface);
            return None;
        }
        Some(self.entries.entry(surface).or_default())
    }

    /// Replaces the state of an attached surface. Returns false (and stores
    /// nothing) for a detached one.
    pub fn set(&mut self, doc: &Document, surface: ElementId, state: SurfaceState) -> bool {
        if !doc.contains(surface) {
            self.clear(surface);
            return false;
        }
        self.entries.insert(surface, state);
        true
    }

    pub fn clear(&mut self, surface: ElementId) -> Option<SurfaceState> {
        self.entries.remove(&surface)
    }

    pub fn contains(&self, surface: ElementId) -> bool {
        self.entries.contains_key(&surface)
    }

    /// Drops every entry whose surface is no longer attached and returns
    /// them so the caller can take down their overlays.
    pub fn prune(&mut self, doc: &Document) -> Vec<(ElementId, SurfaceState)> {
        let dead: Vec<ElementId> = self
            .entries
            .keys()
            .filter(|id| !doc.contains(**id))
            .copied()
            .collect();

        let mut removed = Vec::with_capacity(dead.len());
        for id in dead {
            if let Some(state) = self.entries.remove(&id) {
                debug!("Dropping state of detached surface {}", id);
                removed.push((id, state));
            }
        }
        removed
    }

    pub fn surfaces(&self) -> impl Iterator<Item = (&ElementId, &SurfaceState)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
