//! Hidden-surface paste scraping.
//!
//! When a paste cannot be read at all, the platform is allowed to insert it
//! itself, into an editable surface parked next to the editor root with the
//! selection moved inside. One turn later the surface is read back and
//! removed, and the original selection is restored.

use smol_str::SmolStr;
use tracing::{debug, trace};

use crate::config::ClipboardConfig;
use crate::dom::{Attribute, NodeId};
use crate::engine::EditingEngine;
use crate::markup::inner_html;
use crate::range::{BoundaryPoint, SelectionRange};

/// A surface waiting for the platform's insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeSession {
    surface: NodeId,
    surface_tag: SmolStr,
    saved: SelectionRange,
}

impl ScrapeSession {
    pub fn surface(&self) -> NodeId {
        self.surface
    }

    /// Selection to restore once the surface is read.
    pub fn saved_selection(&self) -> SelectionRange {
        self.saved
    }
}

/// Attach a scrape surface and move the selection into it.
pub fn begin<E: EditingEngine + ?Sized>(engine: &mut E, config: &ClipboardConfig) -> ScrapeSession {
    let saved = engine.current_selection();
    let surface = engine.create_element(
        &config.surface_tag,
        vec![
            Attribute::new("contenteditable", "true"),
            Attribute::new("style", config.scrape_surface_style.as_str()),
        ],
    );
    let doc = engine.document_mut();
    let body = doc.body();
    doc.tree_mut().append_child(body, surface);
    engine.set_selection(SelectionRange::collapsed(BoundaryPoint::new(surface, 0)));
    debug!(surface = %surface, "[SCRAPE] surface attached");

    ScrapeSession {
        surface,
        surface_tag: config.surface_tag.clone(),
        saved,
    }
}

/// Read back and remove the surface, plus any sibling surfaces the platform
/// split the insertion across, then restore the saved selection.
///
/// Returns the recovered markup, concatenated in document order.
pub fn finish<E: EditingEngine + ?Sized>(engine: &mut E, session: ScrapeSession) -> String {
    let tree = engine.document_mut().tree_mut();
    let mut markup = String::new();
    let mut next = Some(session.surface);
    let mut surfaces = 0usize;

    while let Some(area) = next {
        next = tree.next_sibling(area);
        surfaces += 1;

        // Some platforms wrap the whole insertion in one extra block.
        let children = tree.children(area);
        let source = match children {
            [only] if tree.has_tag(*only, &session.surface_tag) => *only,
            _ => area,
        };
        markup.push_str(&inner_html(tree, source));
        tree.remove(area);
    }
    trace!(surfaces, bytes = markup.len(), "[SCRAPE] surfaces read");

    engine.set_selection(session.saved);
    markup
}

/// Remove the surface without reading it.
pub fn discard<E: EditingEngine + ?Sized>(engine: &mut E, session: ScrapeSession) {
    engine.document_mut().tree_mut().remove(session.surface);
    engine.set_selection(session.saved);
}
