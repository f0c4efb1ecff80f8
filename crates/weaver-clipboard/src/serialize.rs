//! Fragment serialization into the two outbound encodings.
//!
//! The fragment is attached to the live document inside an off-screen host
//! element so a layout-aware engine can measure its text, and detached again
//! once both encodings are read.

use std::borrow::Cow;

use serde::Serialize;

use crate::config::ClipboardConfig;
use crate::dom::{Attribute, Fragment, NodeId, NodeKind, Tree, is_block_tag};
use crate::engine::EditingEngine;
use crate::markup::inner_html;
use crate::platform::LineEnding;

/// Both encodings of a fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Serialized {
    pub markup: String,
    pub plain_text: String,
}

/// Serialize `fragment` into markup and plain text.
///
/// Trailing line breaks are cleaned up before either encoding is taken.
/// Line endings are normalised for the plain text only.
pub fn serialize<E: EditingEngine + ?Sized>(
    engine: &mut E,
    fragment: Fragment,
    config: &ClipboardConfig,
    line_ending: LineEnding,
) -> Serialized {
    let host = engine.create_element(
        &config.surface_tag,
        vec![Attribute::new("style", config.layout_surface_style.as_str())],
    );

    let doc = engine.document_mut();
    let body = doc.body();
    let tree = doc.tree_mut();
    for &child in fragment.tree().children(fragment.container()) {
        let copy = tree.import(fragment.tree(), child);
        tree.append_child(host, copy);
    }
    cleanup_trailing_breaks(tree, host);
    tree.append_child(body, host);

    let tree = engine.document().tree();
    let markup = inner_html(tree, host);
    let text = engine.rendered_text(tree, host);
    engine.document_mut().tree_mut().remove(host);

    Serialized {
        markup,
        plain_text: normalize_line_endings(&text, line_ending).into_owned(),
    }
}

/// Remove `<br>`s that only end a line their block ends anyway.
///
/// A break is kept when visible content follows it within its block, or when
/// nothing visible precedes it (it is what makes a blank line).
pub fn cleanup_trailing_breaks(tree: &mut Tree, node: NodeId) {
    let breaks: Vec<NodeId> = tree
        .descendants(node)
        .into_iter()
        .filter(|&n| tree.has_tag(n, "br"))
        .collect();

    for br in breaks {
        let block = tree
            .inclusive_ancestors(br)
            .skip(1)
            .find(|&n| n == node || tree.is_block(n))
            .unwrap_or(node);
        if !is_line_break(tree, br, block) {
            tree.remove(br);
        }
    }
}

fn is_line_break(tree: &Tree, br: NodeId, block: NodeId) -> bool {
    let nodes = tree.descendants(block);
    let Some(pos) = nodes.iter().position(|&n| n == br) else {
        return true;
    };
    let visible = |n: NodeId| {
        tree.is_element(n) || tree.text(n).is_some_and(|t| !t.trim().is_empty())
    };

    let content_after = nodes[pos + 1..].iter().any(|&n| visible(n));
    let content_before = nodes[..pos]
        .iter()
        .any(|&n| visible(n) && !tree.is_inclusive_ancestor(n, br));
    content_after || !content_before
}

/// Layout-free plain text rendering of `node`'s content.
///
/// Blocks start and end lines (paragraphs leave a blank line between them),
/// `<br>` and newlines in text break lines, runs of other whitespace collapse
/// to one space, and table cells are tab separated. Leading and trailing
/// block breaks are dropped.
pub fn render_text(tree: &Tree, node: NodeId) -> String {
    let mut renderer = TextRenderer::default();
    renderer.children(tree, node, false);
    renderer.out
}

#[derive(Default)]
struct TextRenderer {
    out: String,
    /// Line breaks owed by block boundaries, emitted before the next content.
    pending_breaks: usize,
    pending_space: bool,
}

impl TextRenderer {
    fn children(&mut self, tree: &Tree, node: NodeId, pre: bool) {
        for &child in tree.children(node) {
            self.node(tree, child, pre);
        }
    }

    fn node(&mut self, tree: &Tree, node: NodeId, pre: bool) {
        let tag = match tree.kind(node) {
            NodeKind::Text(text) => return self.text(text, pre),
            NodeKind::Element { tag, .. } => tag.as_str(),
        };
        match tag {
            "br" => self.line_break(),
            "script" | "style" | "template" => {}
            "td" | "th" => {
                self.children(tree, node, pre);
                if tree.next_sibling(node).is_some() {
                    self.flush();
                    self.out.push('\t');
                    self.pending_space = false;
                }
            }
            "p" => self.block(tree, node, pre, 2),
            "pre" => self.block(tree, node, true, 1),
            _ if is_block_tag(tag) => self.block(tree, node, pre, 1),
            _ => self.children(tree, node, pre),
        }
    }

    fn block(&mut self, tree: &Tree, node: NodeId, pre: bool, breaks: usize) {
        self.require(breaks);
        self.children(tree, node, pre);
        self.require(breaks);
    }

    fn require(&mut self, breaks: usize) {
        self.pending_breaks = self.pending_breaks.max(breaks);
        self.pending_space = false;
    }

    fn flush(&mut self) {
        if self.pending_breaks > 0 && !self.out.is_empty() {
            for _ in 0..self.pending_breaks {
                self.out.push('\n');
            }
        }
        self.pending_breaks = 0;
    }

    fn line_break(&mut self) {
        self.flush();
        self.out.push('\n');
        self.pending_space = false;
    }

    fn at_line_start(&self) -> bool {
        self.pending_breaks > 0 || self.out.is_empty() || self.out.ends_with('\n')
    }

    fn text(&mut self, text: &str, pre: bool) {
        if pre {
            if !text.is_empty() {
                self.flush();
                self.out.push_str(&text.replace("\r\n", "\n"));
            }
            return;
        }
        for c in text.chars() {
            match c {
                '\n' => self.line_break(),
                '\r' => {}
                c if c.is_ascii_whitespace() => {
                    if !self.at_line_start() {
                        self.pending_space = true;
                    }
                }
                c => {
                    self.flush();
                    if self.pending_space {
                        self.out.push(' ');
                        self.pending_space = false;
                    }
                    self.out.push(c);
                }
            }
        }
    }
}

/// Convert `\n` and `\r\n` line endings to the requested convention.
pub fn normalize_line_endings(text: &str, line_ending: LineEnding) -> Cow<'_, str> {
    match line_ending {
        LineEnding::Lf => Cow::Borrowed(text),
        LineEnding::CrLf if !text.contains('\n') => Cow::Borrowed(text),
        LineEnding::CrLf => Cow::Owned(text.replace("\r\n", "\n").replace('\n', "\r\n")),
    }
}
