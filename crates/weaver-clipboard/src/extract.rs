//! Range-to-fragment extraction for copy and cut.
//!
//! Both modes clone the selected content into a detached `Fragment` in one
//! walk over the source tree, following the DOM `cloneContents` rules:
//! fully contained nodes are deep-copied, partially contained ones are
//! shallow-copied and recursed into, and boundary text nodes are sliced.
//! A cut records what it cloned as a removal plan and applies it afterwards,
//! which leaves the document exactly as `extractContents` would.
//!
//! The fragment is then wrapped in shallow clones of the ancestors between
//! the range's common ancestor and the copy root, so list and table context
//! survives the trip through the clipboard.

use tracing::trace;

use crate::dom::{Fragment, NodeId, Tree, char_slice};
use crate::error::ClipboardError;
use crate::range::{BoundaryPoint, SelectionRange, move_boundaries_down, move_boundaries_up};

/// Tag of the container element that holds a fragment's content.
pub const FRAGMENT_CONTAINER: &str = "div";

/// Whether extraction leaves the document untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// Clone only. Boundaries are normalised first so fully selected inline
    /// wrappers come along as elements.
    Copy,
    /// Clone, then excise the range from the document.
    Cut,
}

/// Result of a non-empty extraction.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub fragment: Fragment,
    /// The block the range was confined to, or the editable root.
    pub copy_root: NodeId,
    /// For a cut, the collapsed excision point; for a copy, the range that
    /// was actually cloned.
    pub range_after: SelectionRange,
}

enum Removal {
    Remove(NodeId),
    Trim { node: NodeId, start: usize, end: usize },
}

/// Extract the content of `range`, confined to `root`.
///
/// Returns `Ok(None)` for a collapsed range; nothing is cloned and the tree
/// is not touched.
pub fn extract(
    tree: &mut Tree,
    range: SelectionRange,
    root: NodeId,
    mode: ExtractMode,
) -> Result<Option<Extraction>, ClipboardError> {
    tree.check(root)?;
    range.validate(tree)?;
    if range.is_collapsed() {
        return Ok(None);
    }
    for point in [range.start, range.end] {
        if !tree.is_inclusive_ancestor(root, point.node) {
            return Err(ClipboardError::InvalidRange(format!(
                "{} is outside the editable root",
                point.node
            )));
        }
    }

    let copy_root = copy_root(tree, &range, root);

    let mut working = range;
    if mode == ExtractMode::Copy {
        move_boundaries_down(tree, &mut working);
        move_boundaries_up(tree, &mut working, copy_root, copy_root, root);
    }

    let mut fragment = Fragment::new(FRAGMENT_CONTAINER);
    let container = fragment.container();
    let mut plan = Vec::new();
    clone_contents(tree, &working, fragment.tree_mut(), container, &mut plan);

    let ancestor = working.common_ancestor_element(tree);
    let wrappers: Vec<NodeId> = tree
        .inclusive_ancestors(ancestor)
        .take_while(|&n| n != copy_root)
        .collect();
    for wrapper in wrappers {
        let ftree = fragment.tree_mut();
        let clone = ftree.import_shallow(tree, wrapper);
        ftree.move_children(container, clone);
        ftree.append_child(container, clone);
    }
    trace!(
        copy_root = %copy_root,
        planned = plan.len(),
        "extracted {:?} fragment",
        mode
    );

    let range_after = match mode {
        ExtractMode::Copy => working,
        ExtractMode::Cut => {
            let point = collapse_point(tree, &working);
            apply(tree, plan);
            SelectionRange::collapsed(point)
        }
    };

    Ok(Some(Extraction {
        fragment,
        copy_root,
        range_after,
    }))
}

/// Clone the range's content without mutating the tree.
pub fn extract_copy(
    tree: &mut Tree,
    range: SelectionRange,
    root: NodeId,
) -> Result<Option<Extraction>, ClipboardError> {
    extract(tree, range, root, ExtractMode::Copy)
}

/// Excise the range's content from the tree.
pub fn extract_cut(
    tree: &mut Tree,
    range: SelectionRange,
    root: NodeId,
) -> Result<Option<Extraction>, ClipboardError> {
    extract(tree, range, root, ExtractMode::Cut)
}

/// The block both boundaries share, or `root` when they sit in different
/// blocks (or in no block below the root).
pub fn copy_root(tree: &Tree, range: &SelectionRange, root: NodeId) -> NodeId {
    let mut deep = *range;
    move_boundaries_down(tree, &mut deep);
    let start_block = tree.nearest_block(deep.start.node, root);
    let end_block = tree.nearest_block(deep.end.node, root);
    match (start_block, end_block) {
        (Some(start), Some(end)) if start == end => start,
        _ => root,
    }
}

fn clone_contents(
    src: &Tree,
    range: &SelectionRange,
    dest: &mut Tree,
    dest_parent: NodeId,
    plan: &mut Vec<Removal>,
) {
    let (start, end) = (range.start, range.end);

    if start.node == end.node
        && let Some(text) = src.text(start.node)
    {
        let copy = dest.create_text(char_slice(text, start.offset, end.offset));
        dest.append_child(dest_parent, copy);
        plan.push(Removal::Trim {
            node: start.node,
            start: start.offset,
            end: end.offset,
        });
        return;
    }

    let common = range.common_ancestor(src);
    let first_partial = (start.node != common)
        .then(|| src.child_toward(common, start.node))
        .flatten();
    let last_partial = (end.node != common)
        .then(|| src.child_toward(common, end.node))
        .flatten();

    let from = match first_partial {
        Some(child) => src.index_in_parent(child).unwrap_or(0),
        None => start.offset,
    };
    let to = match last_partial {
        Some(child) => src.index_in_parent(child).map_or(0, |i| i + 1),
        None => end.offset,
    };

    for &child in src.children(common).get(from..to).unwrap_or_default() {
        if Some(child) == first_partial {
            let inner = SelectionRange::new(start, BoundaryPoint::new(child, src.len(child)));
            clone_partial(src, child, &inner, dest, dest_parent, plan);
        } else if Some(child) == last_partial {
            let inner = SelectionRange::new(BoundaryPoint::new(child, 0), end);
            clone_partial(src, child, &inner, dest, dest_parent, plan);
        } else {
            let copy = dest.import(src, child);
            dest.append_child(dest_parent, copy);
            plan.push(Removal::Remove(child));
        }
    }
}

/// Clone a partially selected child: a text slice, or a shallow element
/// clone holding the recursively cloned selected part.
fn clone_partial(
    src: &Tree,
    child: NodeId,
    inner: &SelectionRange,
    dest: &mut Tree,
    dest_parent: NodeId,
    plan: &mut Vec<Removal>,
) {
    if src.is_text(child) {
        clone_contents(src, inner, dest, dest_parent, plan);
        return;
    }
    let shell = dest.import_shallow(src, child);
    dest.append_child(dest_parent, shell);
    clone_contents(src, inner, dest, shell, plan);
}

/// Where a range collapses to once its contents are gone.
fn collapse_point(tree: &Tree, range: &SelectionRange) -> BoundaryPoint {
    if tree.is_inclusive_ancestor(range.start.node, range.end.node) {
        return range.start;
    }
    let mut reference = range.start.node;
    while let Some(parent) = tree.parent(reference) {
        if tree.is_inclusive_ancestor(parent, range.end.node) {
            let index = tree.index_in_parent(reference).unwrap_or(0);
            return BoundaryPoint::new(parent, index + 1);
        }
        reference = parent;
    }
    range.start
}

fn apply(tree: &mut Tree, plan: Vec<Removal>) {
    for removal in plan {
        match removal {
            Removal::Remove(node) => tree.remove(node),
            Removal::Trim { node, start, end } => tree.remove_text(node, start, end),
        }
    }
}
