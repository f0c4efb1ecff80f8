//! Arena-backed markup tree.
//!
//! Provides:
//! - `Tree` - an arena of element and text nodes with parent/child links
//! - `Document` - the live tree: a `body` holding the editor `root` plus any
//!   transient surfaces the clipboard attaches next to it
//! - `Fragment` - a detached tree produced by extraction, owning its nodes
//!
//! Detaching a node unlinks it from its parent but keeps its id valid, so
//! boundary points recorded before a mutation can still be resolved
//! afterwards. `Tree::remove` frees a subtree for reuse; ids into it go stale
//! and are rejected by `Tree::contains`. Ids are only meaningful for the tree
//! that created them; moving content between trees goes through `Tree::import`.

use smol_str::SmolStr;

use crate::error::ClipboardError;

/// Opaque handle to a node within a single `Tree`.
///
/// The generation tells a live node apart from an earlier, removed node that
/// occupied the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    /// Raw arena index.
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.generation {
            0 => write!(f, "n{}", self.index),
            generation => write!(f, "n{}v{}", self.index, generation),
        }
    }
}

/// A single attribute on an element. Order of attributes is preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: SmolStr,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Node payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Element with a lowercase tag name.
    Element {
        tag: SmolStr,
        attrs: Vec<Attribute>,
    },
    /// Text content. Offsets into text nodes are char offsets.
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    generation: u32,
    live: bool,
}

/// Arena of nodes with a distinguished root element.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<NodeData>,
    /// Slots released by `remove`, reused before the arena grows.
    free: Vec<u32>,
    root: NodeId,
}

impl Tree {
    /// Create a tree whose root is an empty element with the given tag.
    pub fn new(root_tag: &str) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
        };
        tree.root = tree.create_element(root_tag, Vec::new());
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Check that an id was allocated by this tree and not removed since.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.index())
            .is_some_and(|data| data.live && data.generation == id.generation)
    }

    /// Number of allocated, not yet removed nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Validate an id, for entry points that accept ids from callers.
    pub fn check(&self, id: NodeId) -> Result<NodeId, ClipboardError> {
        if self.contains(id) {
            Ok(id)
        } else {
            Err(ClipboardError::UnknownNode(id))
        }
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.nodes[index as usize];
            let generation = slot.generation.wrapping_add(1);
            *slot = NodeData {
                kind,
                parent: None,
                children: Vec::new(),
                generation,
                live: true,
            };
            return NodeId { index, generation };
        }

        let id = NodeId {
            index: self.nodes.len() as u32,
            generation: 0,
        };
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
            generation: 0,
            live: true,
        });
        id
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str, attrs: Vec<Attribute>) -> NodeId {
        self.push(NodeKind::Element {
            tag: SmolStr::new(tag.to_ascii_lowercase()),
            attrs,
        })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    // === Inspection ===

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Text(_))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element { .. })
    }

    /// Tag name for elements, `None` for text.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    /// Check whether `id` is an element with the given tag (case-insensitive).
    pub fn has_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id).is_some_and(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Text(text) => Some(text.as_str()),
            NodeKind::Element { .. } => None,
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[Attribute] {
        match self.kind(id) {
            NodeKind::Element { attrs, .. } => attrs,
            NodeKind::Text(_) => &[],
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    /// Position of `id` among its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        self.children(parent).get(idx + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        idx.checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    /// Boundary length: chars for text, child count for elements.
    pub fn len(&self, id: NodeId) -> usize {
        match self.kind(id) {
            NodeKind::Text(text) => text.chars().count(),
            NodeKind::Element { .. } => self.children(id).len(),
        }
    }

    /// Iterate `id` and its ancestors, innermost first.
    pub fn inclusive_ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |&n| self.parent(n))
    }

    /// Check whether `ancestor` is `node` or one of its ancestors.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.inclusive_ancestors(node).any(|n| n == ancestor)
    }

    /// The child of `ancestor` on the path down to `node`.
    pub fn child_toward(&self, ancestor: NodeId, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        loop {
            let parent = self.parent(current)?;
            if parent == ancestor {
                return Some(current);
            }
            current = parent;
        }
    }

    /// All descendants of `id` in document order (excluding `id`).
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    // === Mutation ===

    /// Unlink `id` from its parent. The node and its subtree stay allocated.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|&c| c != id);
        }
    }

    /// Detach `id` and free it with its whole subtree.
    ///
    /// No-op for the tree root and for ids that are already stale.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root || !self.contains(id) {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let data = &mut self.nodes[node.index()];
            data.live = false;
            data.parent = None;
            data.kind = NodeKind::Text(String::new());
            stack.append(&mut data.children);
            self.free.push(node.index);
        }
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    /// Move every child of `from` to the end of `to`, preserving order.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        let children = std::mem::take(&mut self.nodes[from.index()].children);
        for child in children {
            self.nodes[child.index()].parent = Some(to);
            self.nodes[to.index()].children.push(child);
        }
    }

    /// Remove the char range `start..end` from a text node.
    pub fn remove_text(&mut self, id: NodeId, start: usize, end: usize) {
        if let NodeKind::Text(text) = &mut self.nodes[id.index()].kind {
            let from = char_to_byte(text, start);
            let to = char_to_byte(text, end);
            if from < to {
                text.replace_range(from..to, "");
            }
        }
    }

    /// Append to a text node's content. No-op on elements.
    pub fn append_text(&mut self, id: NodeId, more: &str) {
        if let NodeKind::Text(text) = &mut self.nodes[id.index()].kind {
            text.push_str(more);
        }
    }

    /// Copy `node` from `source` into this tree without its children.
    pub fn import_shallow(&mut self, source: &Tree, node: NodeId) -> NodeId {
        self.push(source.kind(node).clone())
    }

    /// Deep-copy `node` from `source` into this tree. Returns the detached copy.
    pub fn import(&mut self, source: &Tree, node: NodeId) -> NodeId {
        let copy = self.import_shallow(source, node);
        for &child in source.children(node) {
            let child_copy = self.import(source, child);
            self.nodes[child_copy.index()].parent = Some(copy);
            self.nodes[copy.index()].children.push(child_copy);
        }
        copy
    }
}

/// Convert a char offset within `text` to a byte offset (clamped to the end).
pub(crate) fn char_to_byte(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(b, _)| b)
        .unwrap_or(text.len())
}

/// Slice `text` by char offsets.
pub(crate) fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let from = char_to_byte(text, start);
    let to = char_to_byte(text, end.max(start));
    &text[from..to]
}

// === Classification ===

/// Elements that start a new block in layout.
pub fn is_block_tag(tag: &str) -> bool {
    matches!(
        tag,
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "caption"
            | "dd"
            | "details"
            | "dialog"
            | "div"
            | "dl"
            | "dt"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "footer"
            | "form"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hgroup"
            | "hr"
            | "li"
            | "main"
            | "nav"
            | "ol"
            | "p"
            | "pre"
            | "section"
            | "summary"
            | "table"
            | "tbody"
            | "td"
            | "tfoot"
            | "th"
            | "thead"
            | "tr"
            | "ul"
    )
}

/// Elements that never have children.
pub fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "source"
            | "track"
            | "wbr"
    )
}

impl Tree {
    pub fn is_block(&self, id: NodeId) -> bool {
        self.tag(id).is_some_and(is_block_tag)
    }

    /// Void elements (`br`, `img`, ...) act as leaves for boundary movement.
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.tag(id).is_some_and(is_void_tag)
    }

    /// Nearest block-level inclusive ancestor of `id`, stopping before `limit`.
    pub fn nearest_block(&self, id: NodeId, limit: NodeId) -> Option<NodeId> {
        self.inclusive_ancestors(id)
            .take_while(|&n| n != limit)
            .find(|&n| self.is_block(n))
    }
}

// === Document ===

/// The live document: a `body` containing the editable `root`.
///
/// Transient clipboard surfaces are attached to `body` as siblings after the
/// root so they never become part of the edited content.
#[derive(Debug, Clone)]
pub struct Document {
    tree: Tree,
    root: NodeId,
}

impl Document {
    /// Create an empty document with an editable root of the given tag.
    pub fn new(root_tag: &str) -> Self {
        let mut tree = Tree::new("body");
        let root = tree.create_element(root_tag, Vec::new());
        let body = tree.root();
        tree.append_child(body, root);
        Self { tree, root }
    }

    /// Parse markup into the editable root of a new document.
    pub fn from_markup(root_tag: &str, markup: &str) -> Self {
        let mut doc = Self::new(root_tag);
        let fragment = crate::markup::parse_fragment(markup);
        let root = doc.root;
        for &child in fragment.tree().children(fragment.container()) {
            let copy = doc.tree.import(fragment.tree(), child);
            doc.tree.append_child(root, copy);
        }
        doc
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// Top-level container holding the editor root and any transient surfaces.
    pub fn body(&self) -> NodeId {
        self.tree.root()
    }

    /// The editable root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Markup of the editable root's children.
    pub fn root_markup(&self) -> String {
        crate::markup::inner_html(&self.tree, self.root)
    }

    /// True when the editable root holds no elements and no visible text.
    pub fn is_structurally_empty(&self) -> bool {
        self.tree.children(self.root).iter().all(|&child| {
            self.tree
                .text(child)
                .is_some_and(|t| t.trim().is_empty())
        })
    }
}

// === Fragment ===

/// A detached tree produced by extraction.
///
/// The fragment's content lives under a container element. It owns its nodes
/// outright; nothing in it refers back to the document it came from.
#[derive(Debug, Clone)]
pub struct Fragment {
    tree: Tree,
}

impl Fragment {
    /// Empty fragment whose container has the given tag.
    pub fn new(container_tag: &str) -> Self {
        Self {
            tree: Tree::new(container_tag),
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// The container element; its children are the fragment's content.
    pub fn container(&self) -> NodeId {
        self.tree.root()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.children(self.container()).is_empty()
    }

    /// Markup of the fragment's content (container excluded).
    pub fn to_markup(&self) -> String {
        crate::markup::inner_html(&self.tree, self.container())
    }
}
