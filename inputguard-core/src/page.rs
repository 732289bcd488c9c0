// inputguard-core/src/page.rs
//! Host page model.
//!
//! The agent never owns the page's elements; it refers to them by
//! `ElementId`, an arena index paired with a generation counter. Removing a
//! node frees its slot and bumps the generation, so every id handed out for
//! the removed subtree stops resolving. Anything keyed by `ElementId` (the
//! per-surface store in particular) therefore never keeps a detached element
//! reachable.
//!
//! Nested sub-trees (shadow roots) are ordinary nodes of kind
//! `NodeKind::ShadowRoot`. Composed paths walk straight through them, while
//! `closest` stops at them the way selector matching does on a real page.

use std::collections::BTreeMap;

/// Generational handle to a node of a `Document`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId {
    index: u32,
    generation: u32,
}

impl ElementId {
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Layout footprint of a node, in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Single-line field with its declared `type` attribute.
    Input { input_type: String },
    /// Multi-line field.
    TextArea,
    /// Any other element (`div`, `button`, `form`, ...).
    Element { tag: String },
    /// Root of an embedded sub-tree attached to its parent host.
    ShadowRoot,
}

/// Node description used to build a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub disabled: bool,
    pub read_only: bool,
    pub content_editable: bool,
    pub attrs: BTreeMap<String, String>,
    pub text: String,
    pub rect: Rect,
}

impl Node {
    fn of(kind: NodeKind) -> Self {
        Self {
            kind,
            disabled: false,
            read_only: false,
            content_editable: false,
            attrs: BTreeMap::new(),
            text: String::new(),
            rect: Rect::default(),
        }
    }

    pub fn input(input_type: &str) -> Self {
        Self::of(NodeKind::Input { input_type: input_type.to_string() })
    }

    pub fn textarea() -> Self {
        Self::of(NodeKind::TextArea)
    }

    pub fn element(tag: &str) -> Self {
        Self::of(NodeKind::Element { tag: tag.to_string() })
    }

    pub fn div() -> Self {
        Self::element("div")
    }

    pub fn button() -> Self {
        Self::element("button")
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn content_editable(mut self) -> Self {
        self.content_editable = true;
        self
    }

    pub fn role(self, role: &str) -> Self {
        self.attr("role", role)
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.rect = Rect { width, height };
        self
    }

    pub fn tag(&self) -> &str {
        match &self.kind {
            NodeKind::Input { .. } => "input",
            NodeKind::TextArea => "textarea",
            NodeKind::Element { tag } => tag,
            NodeKind::ShadowRoot => "#shadow-root",
        }
    }

    pub fn is_element(&self) -> bool {
        !matches!(self.kind, NodeKind::ShadowRoot)
    }
}

#[derive(Debug)]
struct Entry {
    node: Node,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// Arena-backed page tree.
#[derive(Debug)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    body: ElementId,
    focused: Option<ElementId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates a page holding only a `body` element.
    pub fn new() -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            body: ElementId { index: 0, generation: 0 },
            focused: None,
        };
        doc.body = doc.allocate(Node::element("body").size(1280.0, 800.0), None);
        doc
    }

    pub fn body(&self) -> ElementId {
        self.body
    }

    fn allocate(&mut self, node: Node, parent: Option<ElementId>) -> ElementId {
        let entry = Entry { node, parent, children: Vec::new() };
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                ElementId { index, generation: slot.generation }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot { generation: 0, entry: Some(entry) });
                ElementId { index, generation: 0 }
            }
        }
    }

    fn entry(&self, id: ElementId) -> Option<&Entry> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    fn entry_mut(&mut self, id: ElementId) -> Option<&mut Entry> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
    }

    /// Appends `node` as the last child of `parent`.
    ///
    /// Returns `None` when `parent` is no longer attached.
    pub fn append(&mut self, parent: ElementId, node: Node) -> Option<ElementId> {
        self.entry(parent)?;
        let id = self.allocate(node, Some(parent));
        self.entry_mut(parent)?.children.push(id);
        Some(id)
    }

    /// Attaches an embedded sub-tree root to `host`.
    pub fn attach_shadow(&mut self, host: ElementId) -> Option<ElementId> {
        self.append(host, Node::of(NodeKind::ShadowRoot))
    }

    /// Detaches `id` and its whole subtree, invalidating every id in it.
    pub fn remove(&mut self, id: ElementId) -> bool {
        if id == self.body {
            return false;
        }
        let Some(parent) = self.entry(id).map(|e| e.parent) else {
            return false;
        };
        if let Some(parent) = parent.and_then(|p| self.entry_mut(p)) {
            parent.children.retain(|c| *c != id);
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let slot = &mut self.slots[current.index as usize];
            if let Some(entry) = slot.entry.take() {
                stack.extend(entry.children);
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(current.index);
            }
            if self.focused == Some(current) {
                self.focused = None;
            }
        }
        true
    }

    /// True while `id` refers to an attached node.
    pub fn contains(&self, id: ElementId) -> bool {
        self.entry(id).is_some()
    }

    pub fn node(&self, id: ElementId) -> Option<&Node> {
        self.entry(id).map(|e| &e.node)
    }

    pub fn node_mut(&mut self, id: ElementId) -> Option<&mut Node> {
        self.entry_mut(id).map(|e| &mut e.node)
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.entry(id).and_then(|e| e.parent)
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.entry(id).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    /// Propagation path of an event dispatched at `target`, innermost
    /// first, crossing sub-tree boundaries.
    pub fn composed_path(&self, target: ElementId) -> Vec<ElementId> {
        let mut path = Vec::new();
        let mut current = Some(target);
        while let Some(id) = current {
            if !self.contains(id) {
                break;
            }
            path.push(id);
            current = self.parent(id);
        }
        path
    }

    /// Nearest inclusive ancestor of `id` matching `pred`, without leaving
    /// the sub-tree `id` lives in.
    pub fn closest<F>(&self, id: ElementId, pred: F) -> Option<ElementId>
    where
        F: Fn(&Node) -> bool,
    {
        let mut current = Some(id);
        while let Some(cur) = current {
            let node = self.node(cur)?;
            if !node.is_element() {
                return None;
            }
            if pred(node) {
                return Some(cur);
            }
            current = self.parent(cur);
        }
        None
    }

    /// True when `ancestor` is `id` or one of its ancestors.
    pub fn is_inclusive_ancestor(&self, ancestor: ElementId, id: ElementId) -> bool {
        self.composed_path(id).contains(&ancestor)
    }

    /// Moves focus to `id` (which may sit inside nested sub-trees).
    pub fn focus(&mut self, id: ElementId) -> bool {
        if self.contains(id) {
            self.focused = Some(id);
            true
        } else {
            false
        }
    }

    pub fn blur(&mut self) {
        self.focused = None;
    }

    /// Innermost focused node, or `None` when focus sits on the page itself.
    pub fn active_element(&self) -> Option<ElementId> {
        self.focused.filter(|id| self.contains(*id))
    }

    /// Current text held by a node: the field value for inputs and text
    /// areas, the text content for everything else.
    pub fn value(&self, id: ElementId) -> Option<&str> {
        self.node(id).map(|n| n.text.as_str())
    }

    /// Replaces the text held by a node.
    pub fn set_value(&mut self, id: ElementId, value: &str) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.text = value.to_string();
                true
            }
            None => false,
        }
    }

    pub fn attr(&self, id: ElementId, name: &str) -> Option<&str> {
        self.node(id).and_then(|n| n.attrs.get(name)).map(String::as_str)
    }

    pub fn set_attr(&mut self, id: ElementId, name: &str, value: &str) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.attrs.insert(name.to_string(), value.to_string());
                true
            }
            None => false,
        }
    }

    pub fn remove_attr(&mut self, id: ElementId, name: &str) {
        if let Some(node) = self.node_mut(id) {
            node.attrs.remove(name);
        }
    }

    pub fn rect(&self, id: ElementId) -> Option<Rect> {
        self.node(id).map(|n| n.rect)
    }

    /// Attached nodes in the subtree of `root` (inclusive), depth first.
    pub fn descendants(&self, root: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(entry) = self.entry(id) {
                out.push(id);
                stack.extend(entry.children.iter().rev().copied());
            }
        }
        out
    }

    /// Number of attached nodes, `body` included.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
