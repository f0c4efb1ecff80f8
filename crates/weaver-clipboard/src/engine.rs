//! Services the clipboard layer consumes from the editing engine.

use crate::dom::{Attribute, Document, NodeId, Tree};
use crate::error::{ClipboardError, EngineError};
use crate::range::SelectionRange;

/// The editing engine around a clipboard.
///
/// The engine owns the live document and the selection model. Insertion,
/// cleanup and structure repair are opaque to the clipboard layer: it decides
/// *what* to insert and *when*, the engine decides how.
pub trait EditingEngine {
    fn document(&self) -> &Document;

    fn document_mut(&mut self) -> &mut Document;

    fn current_selection(&self) -> SelectionRange;

    fn set_selection(&mut self, range: SelectionRange);

    /// Record an undo point. `range` is the selection to restore on undo,
    /// `None` for the current one.
    fn save_undo_checkpoint(&mut self, range: Option<SelectionRange>);

    /// Insert markup at the selection.
    fn insert_structured(&mut self, markup: &str, from_external: bool) -> Result<(), EngineError>;

    /// Insert plain text at the selection.
    fn insert_plain_text(&mut self, text: &str, from_external: bool) -> Result<(), EngineError>;

    /// Create a detached element in the document's tree.
    fn create_element(&mut self, tag: &str, attrs: Vec<Attribute>) -> NodeId {
        self.document_mut().tree_mut().create_element(tag, attrs)
    }

    /// Tidy markup under `root` after the platform inserted content itself.
    fn cleanup_structure(&mut self, root: NodeId) -> Result<(), EngineError>;

    /// Turn bare URLs under `root` into links.
    fn auto_detect_links(&mut self, root: NodeId) -> Result<(), EngineError>;

    /// Restore the minimal structure the engine needs (e.g. an empty block
    /// in an emptied root).
    fn ensure_minimal_structure(&mut self) -> Result<(), EngineError>;

    /// Host-level error sink for failures in deferred work.
    fn report_error(&mut self, error: ClipboardError);

    /// Plain text as the host would render `node`.
    ///
    /// `node` is attached to the live document when this is called. Hosts
    /// with a layout engine can measure the real rendering; the default is a
    /// layout-free approximation.
    fn rendered_text(&self, tree: &Tree, node: NodeId) -> String {
        crate::serialize::render_text(tree, node)
    }
}
