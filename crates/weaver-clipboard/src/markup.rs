//! Markup encoding for trees.
//!
//! The writer emits HTML the way the platform's `innerHTML` would for the
//! subset of the tree model we keep (elements, attributes, text). The parser
//! is deliberately forgiving: clipboard markup from other applications is
//! routinely malformed, and anything it cannot make sense of becomes text.

use std::borrow::Cow;

use markdown_weaver_escape::{escape_html, escape_html_body_text};

use crate::dom::{Attribute, Fragment, NodeId, NodeKind, Tree, is_void_tag};

/// Markup of `node`'s children.
pub fn inner_html(tree: &Tree, node: NodeId) -> String {
    let mut out = String::new();
    for &child in tree.children(node) {
        write_node(tree, child, &mut out);
    }
    out
}

fn write_node(tree: &Tree, node: NodeId, out: &mut String) {
    match tree.kind(node) {
        NodeKind::Text(text) => {
            // Writing into a String cannot fail.
            let _ = escape_html_body_text(&mut *out, text);
        }
        NodeKind::Element { tag, attrs } => {
            out.push('<');
            out.push_str(tag);
            for attr in attrs.iter().filter(|a| is_attr_name(&a.name)) {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                let _ = escape_html(&mut *out, &attr.value);
                out.push('"');
            }
            out.push('>');
            if is_void_tag(tag) {
                return;
            }
            for &child in tree.children(node) {
                write_node(tree, child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

/// Whether `name` can be written as an attribute name and read back intact.
pub fn is_attr_name(name: &str) -> bool {
    !name.is_empty()
        && !name.chars().any(|c| {
            c.is_whitespace()
                || c.is_control()
                || matches!(c, '"' | '\'' | '<' | '>' | '/' | '=')
        })
}

/// Parse markup into a fragment with a `div` container.
pub fn parse_fragment(input: &str) -> Fragment {
    parse_fragment_in(input, "div")
}

/// Parse markup into a fragment whose container has the given tag.
pub fn parse_fragment_in(input: &str, container_tag: &str) -> Fragment {
    let fragment = Fragment::new(container_tag);
    let container = fragment.container();
    MarkupParser {
        input,
        pos: 0,
        fragment,
        open: vec![container],
    }
    .run()
}

/// Parse markup and append the resulting nodes to `parent` in `tree`.
pub fn append_markup(tree: &mut Tree, parent: NodeId, input: &str) {
    let fragment = parse_fragment(input);
    for &child in fragment.tree().children(fragment.container()) {
        let copy = tree.import(fragment.tree(), child);
        tree.append_child(parent, copy);
    }
}

struct MarkupParser<'a> {
    input: &'a str,
    pos: usize,
    fragment: Fragment,
    /// Stack of open elements; the bottom entry is the container.
    open: Vec<NodeId>,
}

impl<'a> MarkupParser<'a> {
    fn run(mut self) -> Fragment {
        while self.pos < self.input.len() {
            let rest = &self.input[self.pos..];
            if rest.starts_with("<!--") {
                self.pos += rest.find("-->").map(|i| i + 3).unwrap_or(rest.len());
            } else if rest.starts_with("</") {
                self.close_tag();
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.pos += rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
            } else if rest.starts_with('<')
                && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic())
            {
                self.open_tag();
            } else {
                self.text();
            }
        }
        self.fragment
    }

    fn current(&self) -> NodeId {
        // The container is never popped.
        self.open.last().copied().unwrap_or(self.fragment.container())
    }

    fn text(&mut self) {
        let rest = &self.input[self.pos..];
        // A '<' that did not start a tag is literal text.
        let skip = if rest.starts_with('<') { 1 } else { 0 };
        let len = rest[skip..].find('<').map(|i| i + skip).unwrap_or(rest.len());
        let raw = &rest[..len];
        self.pos += len;

        let decoded = decode_entities(raw);
        let parent = self.current();
        let tree = self.fragment.tree_mut();
        // Merge with a preceding text sibling so split reads stay one node.
        if let Some(last) = tree.last_child(parent)
            && tree.is_text(last)
        {
            tree.append_text(last, &decoded);
            return;
        }
        let node = tree.create_text(decoded.into_owned());
        tree.append_child(parent, node);
    }

    fn take_name(&mut self) -> &'a str {
        let input = self.input;
        let rest = &input[self.pos..];
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == ':' || c == '_'))
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.input[self.pos..];
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn open_tag(&mut self) {
        self.pos += 1;
        let name = self.take_name().to_ascii_lowercase();
        let mut attrs = Vec::new();
        let mut self_closing = false;

        loop {
            self.skip_whitespace();
            let rest = &self.input[self.pos..];
            if rest.is_empty() {
                break;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break;
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                self_closing = true;
                break;
            }
            if rest.starts_with('/') {
                self.pos += 1;
                continue;
            }

            let name_len = rest
                .find(|c: char| c.is_whitespace() || c == '=' || c == '>' || c == '/')
                .unwrap_or(rest.len())
                .max(1);
            let attr_name = rest[..name_len].to_ascii_lowercase();
            self.pos += name_len;
            self.skip_whitespace();

            let mut value = String::new();
            if self.input[self.pos..].starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                value = self.attr_value();
            }
            if is_attr_name(&attr_name) {
                attrs.push(Attribute::new(attr_name, value));
            }
        }

        let parent = self.current();
        let tree = self.fragment.tree_mut();
        let element = tree.create_element(&name, attrs);
        tree.append_child(parent, element);
        if !self_closing && !is_void_tag(&name) {
            self.open.push(element);
        }
    }

    fn attr_value(&mut self) -> String {
        let rest = &self.input[self.pos..];
        let raw = match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &rest[1..];
                let end = body.find(quote).unwrap_or(body.len());
                self.pos += 1 + end + usize::from(end < body.len());
                &body[..end]
            }
            _ => {
                let end = rest
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                self.pos += end;
                &rest[..end]
            }
        };
        decode_entities(raw).into_owned()
    }

    fn close_tag(&mut self) {
        self.pos += 2;
        let name = self.take_name().to_ascii_lowercase();
        let rest = &self.input[self.pos..];
        self.pos += rest.find('>').map(|i| i + 1).unwrap_or(rest.len());

        // Pop to the matching open element; stray close tags are ignored.
        let tree = self.fragment.tree();
        if let Some(depth) = self
            .open
            .iter()
            .skip(1)
            .rposition(|&n| tree.has_tag(n, &name))
        {
            self.open.truncate(depth + 1);
        }
    }
}

/// Decode the character references clipboard markup actually contains.
pub fn decode_entities(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_reference(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}
