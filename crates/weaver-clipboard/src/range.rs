//! Selection ranges over a `Tree`.
//!
//! A boundary point is a container plus an offset: a char offset for text
//! containers, a child index for elements. Ranges keep the DOM convention that
//! the start never follows the end in document order.

use std::cmp::Ordering;

use crate::dom::{NodeId, Tree};
use crate::error::ClipboardError;

/// One end of a selection range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundaryPoint {
    pub node: NodeId,
    pub offset: usize,
}

impl BoundaryPoint {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// An ordered pair of boundary points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionRange {
    pub start: BoundaryPoint,
    pub end: BoundaryPoint,
}

impl SelectionRange {
    /// Create a range without validation. Use `validate` before trusting it.
    pub fn new(start: BoundaryPoint, end: BoundaryPoint) -> Self {
        Self { start, end }
    }

    /// A collapsed range at a single point.
    pub fn collapsed(point: BoundaryPoint) -> Self {
        Self {
            start: point,
            end: point,
        }
    }

    /// A range covering all of `node`'s contents.
    pub fn select_contents(tree: &Tree, node: NodeId) -> Self {
        Self {
            start: BoundaryPoint::new(node, 0),
            end: BoundaryPoint::new(node, tree.len(node)),
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Check that both boundaries exist in `tree`, their offsets are in
    /// bounds and the start does not follow the end.
    pub fn validate(&self, tree: &Tree) -> Result<(), ClipboardError> {
        for point in [self.start, self.end] {
            tree.check(point.node)?;
            if point.offset > tree.len(point.node) {
                return Err(ClipboardError::InvalidRange(format!(
                    "offset {} out of bounds for {}",
                    point.offset, point.node
                )));
            }
        }
        if compare_points(tree, &self.start, &self.end) == Ordering::Greater {
            return Err(ClipboardError::InvalidRange(
                "start follows end".to_string(),
            ));
        }
        Ok(())
    }

    /// Deepest node containing both boundaries.
    pub fn common_ancestor(&self, tree: &Tree) -> NodeId {
        tree.inclusive_ancestors(self.start.node)
            .find(|&a| tree.is_inclusive_ancestor(a, self.end.node))
            .unwrap_or(tree.root())
    }

    /// Like `common_ancestor`, but a text container resolves to its parent.
    pub fn common_ancestor_element(&self, tree: &Tree) -> NodeId {
        let ancestor = self.common_ancestor(tree);
        if tree.is_text(ancestor) {
            tree.parent(ancestor).unwrap_or(ancestor)
        } else {
            ancestor
        }
    }
}

/// Compare two boundary points in document order.
pub fn compare_points(tree: &Tree, a: &BoundaryPoint, b: &BoundaryPoint) -> Ordering {
    if a.node == b.node {
        return a.offset.cmp(&b.offset);
    }
    if tree.is_inclusive_ancestor(a.node, b.node) {
        // b sits inside a's child at `idx`; a is after b iff a's offset is past that child.
        let idx = tree
            .child_toward(a.node, b.node)
            .and_then(|c| tree.index_in_parent(c))
            .unwrap_or(0);
        return if a.offset > idx {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if tree.is_inclusive_ancestor(b.node, a.node) {
        return compare_points(tree, b, a).reverse();
    }
    tree_order(tree, a.node, b.node)
}

/// Document order of two nodes, neither an ancestor of the other.
fn tree_order(tree: &Tree, a: NodeId, b: NodeId) -> Ordering {
    let path = |node: NodeId| {
        let mut path: Vec<usize> = tree
            .inclusive_ancestors(node)
            .filter_map(|n| tree.index_in_parent(n))
            .collect();
        path.reverse();
        path
    };
    path(a).cmp(&path(b))
}

/// Push both boundaries as deep as possible, into text where there is any.
///
/// Stops at void elements, which cannot contain a boundary.
pub fn move_boundaries_down(tree: &Tree, range: &mut SelectionRange) {
    let mut start = range.start;
    while !tree.is_text(start.node) {
        match tree.children(start.node).get(start.offset) {
            Some(&child) if !tree.is_leaf(child) => start = BoundaryPoint::new(child, 0),
            _ => break,
        }
    }

    let mut end = range.end;
    while !tree.is_text(end.node) {
        let child = if end.offset > 0 {
            tree.children(end.node).get(end.offset - 1).copied()
        } else {
            tree.first_child(end.node)
        };
        match child {
            Some(child) if !tree.is_leaf(child) => {
                let offset = if end.offset > 0 { tree.len(child) } else { 0 };
                end = BoundaryPoint::new(child, offset);
            }
            _ => break,
        }
    }

    range.start = start;
    range.end = end;
}

/// Lift boundaries that sit at the very edge of their container up to the
/// parent, so fully selected inline wrappers are included as elements.
///
/// Never lifts past `start_max`/`end_max` or `root`. A trailing `<br>` right
/// after the end boundary is absorbed.
pub fn move_boundaries_up(
    tree: &Tree,
    range: &mut SelectionRange,
    start_max: NodeId,
    end_max: NodeId,
    root: NodeId,
) {
    let mut start = range.start;
    while start.node != start_max && start.node != root && start.offset == 0 {
        let Some(parent) = tree.parent(start.node) else {
            break;
        };
        let idx = tree.index_in_parent(start.node).unwrap_or(0);
        start = BoundaryPoint::new(parent, idx);
    }

    let mut end = range.end;
    while end.node != end_max && end.node != root {
        if !tree.is_text(end.node)
            && tree
                .children(end.node)
                .get(end.offset)
                .is_some_and(|&c| tree.has_tag(c, "br"))
        {
            end.offset += 1;
        }
        if end.offset != tree.len(end.node) {
            break;
        }
        let Some(parent) = tree.parent(end.node) else {
            break;
        };
        let idx = tree.index_in_parent(end.node).unwrap_or(0);
        end = BoundaryPoint::new(parent, idx + 1);
    }

    range.start = start;
    range.end = end;
}
