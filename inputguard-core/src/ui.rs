// inputguard-core/src/ui.rs
//! Indicator and banner overlays, rendered into the host `Document`.
//!
//! The indicator is an attribute on the surface's container. The banner is
//! a small subtree next to the container listing what was detected, with a
//! dismiss control.

use log::{debug, warn};

use crate::config::ContainerConfig;
use crate::page::{Document, ElementId, Node};
use crate::redaction::unique_ordered;
use crate::store::{IndicatorState, SurfaceState};

pub const INDICATOR_ATTR: &str = "data-sig-state";
pub const BANNER_CLASS: &str = "sig-banner";
pub const CHIP_CLASS: &str = "sig-chip";
pub const DISMISS_CLASS: &str = "sig-dismiss";
pub const HINT_CLASS: &str = "sig-hint";

/// Handles to a rendered banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub element: ElementId,
    pub dismiss: ElementId,
    pub items: Vec<String>,
}

/// Smallest inclusive ancestor of `surface` that is big enough to stand for
/// the whole input bar. Falls back to the surface itself.
pub fn find_container(doc: &Document, surface: ElementId, cfg: &ContainerConfig) -> ElementId {
    let mut current = Some(surface);
    let mut depth = 0;
    while let Some(id) = current {
        if depth > cfg.max_depth || id == doc.body() {
            break;
        }
        let Some(node) = doc.node(id) else { break };
        if node.is_element() {
            if node.rect.width >= cfg.min_width && node.rect.height >= cfg.min_height {
                return id;
            }
            depth += 1;
        }
        current = doc.parent(id);
    }
    surface
}

/// Moves the surface's indicator to `next`, if the transition is allowed.
pub fn set_indicator(
    doc: &mut Document,
    state: &mut SurfaceState,
    surface: ElementId,
    next: IndicatorState,
    cfg: &ContainerConfig,
) -> bool {
    if state.indicator == next {
        return true;
    }
    if !state.indicator.can_transition_to(next) {
        warn!("Ignoring indicator change {:?} -> {:?} on {}", state.indicator, next, surface);
        return false;
    }

    if let Some(previous) = state.indicator_host.take() {
        doc.remove_attr(previous, INDICATOR_ATTR);
    }
    if let Some(value) = next.as_attr() {
        let host = find_container(doc, surface, cfg);
        doc.set_attr(host, INDICATOR_ATTR, value);
        state.indicator_host = Some(host);
    }
    if next != IndicatorState::Flagged && next != IndicatorState::Clear {
        state.indicator_expiry = None;
    }
    state.indicator = next;
    true
}

/// Resets to `none` and then enters `loading`.
pub fn begin_loading(
    doc: &mut Document,
    state: &mut SurfaceState,
    surface: ElementId,
    cfg: &ContainerConfig,
) {
    set_indicator(doc, state, surface, IndicatorState::None, cfg);
    set_indicator(doc, state, surface, IndicatorState::Loading, cfg);
}

fn banner_heading(count: usize) -> String {
    if count == 1 {
        "1 sensitive item detected".to_string()
    } else {
        format!("{} sensitive items detected", count)
    }
}

/// Renders (or re-renders) the banner listing `values`, de-duplicated in
/// first-seen order. An empty list takes the banner down.
pub fn show_banner<S: AsRef<str>>(
    doc: &mut Document,
    state: &mut SurfaceState,
    surface: ElementId,
    values: &[S],
    cfg: &ContainerConfig,
) -> Option<ElementId> {
    let items = unique_ordered(values.iter().map(|v| v.as_ref().to_string()));
    clear_banner(doc, state);
    if items.is_empty() {
        return None;
    }

    let container = find_container(doc, surface, cfg);
    let parent = doc.parent(container).unwrap_or_else(|| doc.body());
    let banner = Node::div()
        .attr("class", BANNER_CLASS)
        .attr("role", "status")
        .attr("data-sig-count", &items.len().to_string())
        .text(&banner_heading(items.len()));
    let element = doc.append(parent, banner)?;
    for item in &items {
        doc.append(element, Node::element("span").attr("class", CHIP_CLASS).text(item))?;
    }
    let dismiss = doc.append(
        element,
        Node::button().attr("class", DISMISS_CLASS).attr("aria-label", "Dismiss").text("×"),
    )?;

    debug!("Banner for {} shows {} item(s)", surface, items.len());
    state.banner = Some(Banner { element, dismiss, items });
    Some(element)
}

pub fn clear_banner(doc: &mut Document, state: &mut SurfaceState) {
    if let Some(banner) = state.banner.take() {
        doc.remove(banner.element);
    }
}

/// Takes down every overlay a surface owns.
pub fn clear_overlays(doc: &mut Document, state: &mut SurfaceState) {
    clear_banner(doc, state);
    if let Some(host) = state.indicator_host.take() {
        doc.remove_attr(host, INDICATOR_ATTR);
    }
    state.indicator = IndicatorState::None;
    state.indicator_expiry = None;
    state.holds_flagged = false;
}

/// Display strings of the chips currently rendered in a banner.
pub fn banner_chips(doc: &Document, banner: ElementId) -> Vec<String> {
    doc.children(banner)
        .iter()
        .filter(|id| doc.attr(**id, "class") == Some(CHIP_CLASS))
        .filter_map(|id| doc.value(*id).map(str::to_string))
        .collect()
}

/// Non-blocking hint pinned to the page body, with its own dismiss control.
pub fn show_hint(doc: &mut Document, message: &str) -> Option<ElementId> {
    let body = doc.body();
    let hint = doc.append(body, Node::div().attr("class", HINT_CLASS).attr("role", "alert").text(message))?;
    doc.append(hint, Node::button().attr("class", DISMISS_CLASS).attr("aria-label", "Dismiss").text("×"))?;
    Some(hint)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composer() -> (Document, ElementId, ElementId) {
        let mut doc = Document::new();
        let bar = doc.append(doc.body(), Node::div().size(700.0, 52.0)).unwrap();
        let wrap = doc.append(bar, Node::div().size(600.0, 24.0)).unwrap();
        let field = doc.append(wrap, Node::textarea().size(580.0, 20.0)).unwrap();
        (doc, bar, field)
    }

    #[test]
    fn test_container_is_smallest_big_enough_ancestor() {
        let (doc, bar, field) = composer();
        assert_eq!(find_container(&doc, field, &ContainerConfig::default()), bar);
    }

    #[test]
    fn test_container_falls_back_to_surface() {
        let mut doc = Document::new();
        let tiny = doc.append(doc.body(), Node::div().size(50.0, 10.0)).unwrap();
        let field = doc.append(tiny, Node::input("text").size(40.0, 10.0)).unwrap();
        assert_eq!(find_container(&doc, field, &ContainerConfig::default()), field);
    }

    #[test]
    fn test_indicator_attribute_follows_state() {
        let (mut doc, bar, field) = composer();
        let cfg = ContainerConfig::default();
        let mut state = SurfaceState::default();

        assert!(!set_indicator(&mut doc, &mut state, field, IndicatorState::Flagged, &cfg));
        begin_loading(&mut doc, &mut state, field, &cfg);
        assert_eq!(doc.attr(bar, INDICATOR_ATTR), Some("loading"));
        assert!(set_indicator(&mut doc, &mut state, field, IndicatorState::Flagged, &cfg));
        assert_eq!(doc.attr(bar, INDICATOR_ATTR), Some("flagged"));
        assert!(set_indicator(&mut doc, &mut state, field, IndicatorState::None, &cfg));
        assert_eq!(doc.attr(bar, INDICATOR_ATTR), None);
    }

    #[test]
    fn test_banner_dedupes_and_rerenders() {
        let (mut doc, bar, field) = composer();
        let cfg = ContainerConfig::default();
        let mut state = SurfaceState::default();

        let first = show_banner(&mut doc, &mut state, field, &["555-1234", "a@b.c", "555-1234"], &cfg).unwrap();
        assert_eq!(doc.parent(first), doc.parent(bar));
        assert_eq!(banner_chips(&doc, first), vec!["555-1234", "a@b.c"]);
        assert_eq!(doc.attr(first, "data-sig-count"), Some("2"));

        let second = show_banner(&mut doc, &mut state, field, &["x"], &cfg).unwrap();
        assert!(!doc.contains(first));
        assert_eq!(banner_chips(&doc, second), vec!["x"]);

        clear_overlays(&mut doc, &mut state);
        assert!(!doc.contains(second));
        assert!(state.banner.is_none());
    }
}
