// inputguard-core/src/resolver.rs
//! Surface resolution: from an interaction target to the editable surface
//! the user is actually typing into.

use crate::page::{Document, ElementId, Node, NodeKind};

/// Single-line input types that hold free text.
pub const EDITABLE_INPUT_TYPES: &[&str] =
    &["text", "search", "email", "tel", "url", "password", "number"];

/// Kind of text surface, as far as the agent cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    SingleLine,
    MultiLine,
    RichText,
}

fn has_textbox_role(node: &Node) -> bool {
    node.attrs
        .get("role")
        .is_some_and(|role| role.eq_ignore_ascii_case("textbox"))
}

/// Classifies a node, or `None` when it cannot hold user text right now.
pub fn surface_kind(node: &Node) -> Option<SurfaceKind> {
    if node.disabled || node.read_only {
        return None;
    }
    match &node.kind {
        NodeKind::TextArea => Some(SurfaceKind::MultiLine),
        NodeKind::Input { input_type } => {
            let ty = if input_type.is_empty() { "text" } else { input_type.as_str() };
            EDITABLE_INPUT_TYPES
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ty))
                .then_some(SurfaceKind::SingleLine)
        }
        NodeKind::Element { .. } if node.content_editable || has_textbox_role(node) => {
            Some(SurfaceKind::RichText)
        }
        _ => None,
    }
}

pub fn is_editable(doc: &Document, id: ElementId) -> bool {
    doc.node(id).and_then(surface_kind).is_some()
}

/// Cheap pre-filter matching anything that looks like a text field; the
/// real qualification is `surface_kind`.
fn looks_like_field(node: &Node) -> bool {
    matches!(node.kind, NodeKind::Input { .. } | NodeKind::TextArea)
        || node.content_editable
        || has_textbox_role(node)
}

/// Nearest editable surface along an event's propagation path.
///
/// `path` is innermost first, as returned by `Document::composed_path`.
pub fn resolve_editable(doc: &Document, path: &[ElementId]) -> Option<ElementId> {
    for &id in path {
        let Some(node) = doc.node(id) else { continue };
        if !node.is_element() {
            continue;
        }
        if surface_kind(node).is_some() {
            return Some(id);
        }
        if let Some(candidate) = doc.closest(id, looks_like_field) {
            if is_editable(doc, candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

/// Resolves the surface for an event dispatched at `target`.
pub fn resolve_from_target(doc: &Document, target: ElementId) -> Option<ElementId> {
    resolve_editable(doc, &doc.composed_path(target))
}

/// Focused element, descending into nested sub-trees.
pub fn deep_active_element(doc: &Document) -> Option<ElementId> {
    doc.active_element()
}
