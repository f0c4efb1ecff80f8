//! Paste format resolution.
//!
//! Picks exactly one way to get content out of an inbound transfer. The
//! choice is made up front from what the transfer advertises and what the
//! platform is known to support; nothing is read speculatively, so a
//! deferred materialization never races another branch.

use tracing::debug;

use crate::channel::{
    FILES, InboundTransfer, LEGACY_RICH, PLAIN, ReadCapability, STRUCTURED, TransferItem, URI_LIST,
};
use crate::gate::PasteContent;
use crate::platform::Capabilities;

/// How a materialized item string should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeAs {
    /// Markup, inserted structurally.
    Structured,
    /// Legacy rich text. An empty result probably means the paste is an image.
    LegacyRich,
    Plain,
}

/// The single extraction path chosen for a paste.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No structured access: let the platform insert into a hidden surface.
    Scrape,
    /// Per-item transfer with no items at all.
    EmptyItems,
    /// An image item is present. Reported, never inserted automatically.
    Image,
    /// Read one item asynchronously, then insert it.
    Materialize { item: TransferItem, mode: MaterializeAs },
    /// Content read synchronously from a type-only transfer.
    Insert(PasteContent),
    /// Readable, but nothing worth inserting.
    Nothing,
}

/// Choose the extraction path for `transfer`.
///
/// `force_plain` downgrades any markup match to plain text handling.
pub fn resolve(
    transfer: &dyn InboundTransfer,
    capabilities: &Capabilities,
    force_plain: bool,
) -> Resolution {
    let resolution = match transfer.capability() {
        ReadCapability::None => Resolution::Scrape,
        ReadCapability::PerItem => resolve_items(transfer, capabilities, force_plain),
        ReadCapability::TypeOnly => resolve_types(transfer, capabilities, force_plain),
    };
    debug!(
        capability = ?transfer.capability(),
        force_plain,
        "[PASTE] resolved {:?}",
        resolution
    );
    resolution
}

fn resolve_items(
    transfer: &dyn InboundTransfer,
    capabilities: &Capabilities,
    force_plain: bool,
) -> Resolution {
    let has_files = transfer.has_type(FILES);
    let has_structured = transfer.has_type(STRUCTURED);

    // Without files, a platform that only ever exposes plain text items is
    // better served by its own insertion.
    if !has_files && capabilities.item_reads_plain_only {
        return Resolution::Scrape;
    }

    let items = transfer.items();
    if items.is_empty() {
        // File lists on some platforms arrive as a paste with no items.
        return Resolution::EmptyItems;
    }

    if (has_files || !has_structured) && items.iter().any(TransferItem::is_image) {
        return Resolution::Image;
    }

    let find_last = |mime: &str| items.iter().rev().find(|i| i.mime == mime);
    let find_first = |mime: &str| items.iter().find(|i| i.mime == mime);

    if !force_plain && let Some(item) = find_last(STRUCTURED) {
        return Resolution::Materialize {
            item: item.clone(),
            mode: MaterializeAs::Structured,
        };
    }
    if let Some(item) = find_first(LEGACY_RICH) {
        return Resolution::Materialize {
            item: item.clone(),
            mode: MaterializeAs::LegacyRich,
        };
    }
    if let Some(item) = find_first(PLAIN) {
        return Resolution::Materialize {
            item: item.clone(),
            mode: MaterializeAs::Plain,
        };
    }
    Resolution::Nothing
}

fn resolve_types(
    transfer: &dyn InboundTransfer,
    capabilities: &Capabilities,
    force_plain: bool,
) -> Resolution {
    let has_structured = transfer.has_type(STRUCTURED);
    let has_plain = transfer.has_type(PLAIN);
    let has_rich = transfer.has_type(LEGACY_RICH);

    // Platform insertion converts legacy rich text to markup, which beats a
    // plain text read. Some platforms hide the rich channel from the type
    // list, so plain text alone is not trusted there either.
    let usable = !capabilities.item_reads_plain_only
        && (has_structured || (!capabilities.type_reads_hide_rich_text && has_plain && !has_rich));
    if !usable {
        return Resolution::Scrape;
    }

    // Some sources put an empty markup channel next to real plain text, or a
    // blank plain text channel next to a URI list.
    let non_empty = |mime: &str| transfer.get_data(mime).filter(|d| !d.is_empty());

    if !force_plain && let Some(markup) = non_empty(STRUCTURED) {
        return Resolution::Insert(PasteContent::Structured(markup));
    }
    if let Some(text) = non_empty(PLAIN).or_else(|| non_empty(URI_LIST)) {
        return Resolution::Insert(PasteContent::Plain(text));
    }
    Resolution::Nothing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MemoryTransfer;
    use crate::platform::Platform;

    fn caps() -> Capabilities {
        Platform::default().capabilities()
    }

    fn per_item() -> MemoryTransfer {
        MemoryTransfer::new(ReadCapability::PerItem)
    }

    fn type_only() -> MemoryTransfer {
        MemoryTransfer::new(ReadCapability::TypeOnly)
    }

    fn mode_of(resolution: &Resolution) -> Option<(usize, MaterializeAs)> {
        match resolution {
            Resolution::Materialize { item, mode } => Some((item.index, *mode)),
            _ => None,
        }
    }

    #[test]
    fn test_no_read_access_scrapes() {
        let transfer = MemoryTransfer::opaque().with_string(STRUCTURED, "<b>x</b>");
        assert_eq!(resolve(&transfer, &caps(), false), Resolution::Scrape);
    }

    #[test]
    fn test_structured_beats_plain() {
        let transfer = per_item()
            .with_string(PLAIN, "x")
            .with_string(STRUCTURED, "<b>x</b>");
        let resolution = resolve(&transfer, &caps(), false);
        assert_eq!(mode_of(&resolution), Some((1, MaterializeAs::Structured)));
    }

    #[test]
    fn test_force_plain_downgrades_structured() {
        let transfer = per_item()
            .with_string(PLAIN, "x")
            .with_string(STRUCTURED, "<b>x</b>");
        let resolution = resolve(&transfer, &caps(), true);
        assert_eq!(mode_of(&resolution), Some((0, MaterializeAs::Plain)));
    }

    #[test]
    fn test_image_only_reports_image() {
        let transfer = per_item().with_file("image/png");
        assert_eq!(resolve(&transfer, &caps(), false), Resolution::Image);
    }

    #[test]
    fn test_image_next_to_markup_without_files_is_markup() {
        let transfer = per_item()
            .with_string(STRUCTURED, "<img src=\"x.png\">")
            .with_string("image/png", "");
        let resolution = resolve(&transfer, &caps(), false);
        assert_eq!(mode_of(&resolution), Some((0, MaterializeAs::Structured)));
    }

    #[test]
    fn test_legacy_rich_beats_plain() {
        let transfer = per_item()
            .with_string(PLAIN, "x")
            .with_string(LEGACY_RICH, "{\\rtf1 x}");
        let resolution = resolve(&transfer, &caps(), false);
        assert_eq!(mode_of(&resolution), Some((1, MaterializeAs::LegacyRich)));
    }

    #[test]
    fn test_empty_item_list() {
        let transfer = per_item().with_type(FILES);
        assert_eq!(resolve(&transfer, &caps(), false), Resolution::EmptyItems);
    }

    #[test]
    fn test_plain_only_items_scrape_without_files() {
        let edge = Platform {
            edge: true,
            ..Default::default()
        }
        .capabilities();
        let transfer = per_item().with_string(PLAIN, "x");
        assert_eq!(resolve(&transfer, &edge, false), Resolution::Scrape);

        let with_files = per_item().with_file("image/jpeg");
        assert_eq!(resolve(&with_files, &edge, false), Resolution::Image);
    }

    #[test]
    fn test_type_only_structured() {
        let transfer = type_only()
            .with_string(STRUCTURED, "<b>x</b>")
            .with_string(PLAIN, "x");
        assert_eq!(
            resolve(&transfer, &caps(), false),
            Resolution::Insert(PasteContent::Structured("<b>x</b>".into()))
        );
        assert_eq!(
            resolve(&transfer, &caps(), true),
            Resolution::Insert(PasteContent::Plain("x".into()))
        );
    }

    #[test]
    fn test_type_only_empty_markup_falls_back_to_plain() {
        let transfer = type_only()
            .with_string(STRUCTURED, "")
            .with_string(PLAIN, "plain");
        assert_eq!(
            resolve(&transfer, &caps(), false),
            Resolution::Insert(PasteContent::Plain("plain".into()))
        );
    }

    #[test]
    fn test_type_only_blank_plain_uses_uri_list() {
        let transfer = type_only()
            .with_string(PLAIN, "")
            .with_string(URI_LIST, "https://example.com/");
        assert_eq!(
            resolve(&transfer, &caps(), false),
            Resolution::Insert(PasteContent::Plain("https://example.com/".into()))
        );
    }

    #[test]
    fn test_type_only_rich_text_scrapes() {
        let transfer = type_only()
            .with_string(PLAIN, "x")
            .with_string(LEGACY_RICH, "{\\rtf1 x}");
        assert_eq!(resolve(&transfer, &caps(), false), Resolution::Scrape);

        let gecko = Platform {
            gecko: true,
            ..Default::default()
        }
        .capabilities();
        let plain_only = type_only().with_string(PLAIN, "x");
        assert_eq!(resolve(&plain_only, &gecko, false), Resolution::Scrape);
    }

    #[test]
    fn test_type_only_ignores_files() {
        let transfer = type_only().with_type(FILES).with_string(STRUCTURED, "");
        assert_eq!(resolve(&transfer, &caps(), false), Resolution::Nothing);
    }
}
