//! Tests for the clipboard state machine.
//!
//! These drive `Clipboard` against a recording engine and in-memory channels,
//! covering each trigger end to end including deferred turns.

use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::channel::{
    FILES, LEGACY_PLAIN, LEGACY_RICH, MemoryOutbound, MemoryTransfer, PLAIN, ReadCapability,
};
use crate::engine::testing::{Call, RecordingEngine};
use crate::error::EngineError;
use crate::markup::append_markup;
use crate::range::BoundaryPoint;

fn clipboard() -> Clipboard {
    Clipboard::new(Platform::default(), ClipboardConfig::default())
}

fn select(engine: &mut RecordingEngine, start: (&[usize], usize), end: (&[usize], usize)) {
    let range = SelectionRange::new(
        BoundaryPoint::new(engine.node(start.0), start.1),
        BoundaryPoint::new(engine.node(end.0), end.1),
    );
    engine.selection = range;
}

fn select_all(engine: &mut RecordingEngine) {
    let root = engine.doc.root();
    engine.selection = SelectionRange::select_contents(engine.doc.tree(), root);
}

/// Record the `willPaste` payloads observers see.
fn watch_will_paste(clipboard: &mut Clipboard) -> Rc<RefCell<Vec<WillPaste>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    clipboard
        .events_mut()
        .subscribe(GateKind::WillPaste, move |event| {
            if let Some(payload) = event.as_will_paste() {
                sink.borrow_mut().push(payload.clone());
            }
        });
    seen
}

fn materialize(
    clipboard: &mut Clipboard,
    engine: &mut RecordingEngine,
    transfer: &mut MemoryTransfer,
) -> TransferAction {
    let requests = transfer.take_requests();
    assert_eq!(requests.len(), 1, "exactly one item must be materialized");
    let (index, ticket) = requests[0];
    let text = transfer.item_string(index).unwrap_or_default().to_string();
    clipboard.complete_materialization(engine, ticket, text)
}

// === Copy ===

#[test]
fn test_copy_single_block() {
    let mut engine = RecordingEngine::new("<p>hello <b>world</b></p><p>second</p>");
    select(&mut engine, (&[0, 0], 0), (&[0, 1, 0], 5));
    let before = engine.doc.root_markup();
    let mut outbound = MemoryOutbound::new();

    let outcome = clipboard()
        .handle_copy(&mut engine, Some(&mut outbound))
        .unwrap();

    assert!(outcome.prevents_default());
    assert!(!outcome.turn_requested);
    assert_eq!(outbound.get(STRUCTURED), Some("hello <b>world</b>"));
    assert_eq!(outbound.get(PLAIN), Some("hello world"));
    assert_eq!(engine.doc.root_markup(), before);
    assert!(engine.calls.is_empty());
}

#[test]
fn test_copy_list_items() {
    let mut engine = RecordingEngine::new("<ul><li>one</li><li>two</li></ul><p>after</p>");
    select(&mut engine, (&[0, 0, 0], 1), (&[0, 1, 0], 2));
    let mut outbound = MemoryOutbound::new();

    let outcome = clipboard()
        .handle_copy(&mut engine, Some(&mut outbound))
        .unwrap();

    let TransferAction::Written(serialized) = outcome.action else {
        panic!("expected a write, got {:?}", outcome.action);
    };
    insta::assert_yaml_snapshot!(serialized);
}

#[test]
fn test_copy_uses_platform_line_endings() {
    let mut engine = RecordingEngine::new("<div>a</div><div>b</div>");
    select_all(&mut engine);
    let windows = Platform {
        windows: true,
        ..Default::default()
    };
    let mut outbound = MemoryOutbound::new();

    let _ = Clipboard::new(windows, ClipboardConfig::default())
        .handle_copy(&mut engine, Some(&mut outbound))
        .unwrap();

    assert_eq!(outbound.get(PLAIN), Some("a\r\nb"));
    assert_eq!(outbound.get(STRUCTURED), Some("<div>a</div><div>b</div>"));
}

#[test]
fn test_copy_collapsed_writes_nothing() {
    let mut engine = RecordingEngine::new("<p>text</p>");
    select(&mut engine, (&[0, 0], 2), (&[0, 0], 2));
    let mut outbound = MemoryOutbound::new();

    let outcome = clipboard()
        .handle_copy(&mut engine, Some(&mut outbound))
        .unwrap();

    assert_eq!(outcome.action, TransferAction::Nothing);
    assert!(outbound.is_empty());
}

#[test]
fn test_copy_canceled_keeps_platform_default() {
    let mut engine = RecordingEngine::new("<p>text</p>");
    select_all(&mut engine);
    let mut clipboard = clipboard();
    clipboard
        .events_mut()
        .subscribe(GateKind::BeforeCopy, |e| e.prevent_default());
    let mut outbound = MemoryOutbound::new();

    let outcome = clipboard
        .handle_copy(&mut engine, Some(&mut outbound))
        .unwrap();

    assert_eq!(outcome.disposition, Disposition::PlatformDefault);
    assert_eq!(outcome.action, TransferAction::Canceled);
    assert!(outbound.is_empty());
}

#[test]
fn test_copy_without_outbound_write_access() {
    let mut engine = RecordingEngine::new("<p>text</p>");
    select_all(&mut engine);
    let ios = Platform {
        ios: true,
        safari: true,
        ..Default::default()
    };
    let mut outbound = MemoryOutbound::new();

    let outcome = Clipboard::new(ios, ClipboardConfig::default())
        .handle_copy(&mut engine, Some(&mut outbound))
        .unwrap();
    assert_eq!(outcome.disposition, Disposition::PlatformDefault);
    assert!(outbound.is_empty());

    let outcome = clipboard().handle_copy(&mut engine, None).unwrap();
    assert_eq!(outcome.action, TransferAction::PlatformDefault);
}

// === Cut ===

#[test]
fn test_cut_across_blocks() {
    let mut engine = RecordingEngine::new("<p>one</p><p>two</p>");
    select(&mut engine, (&[0, 0], 1), (&[1, 0], 1));
    let range = engine.selection;
    let root = engine.doc.root();
    let mut outbound = MemoryOutbound::new();

    let outcome = clipboard()
        .handle_cut(&mut engine, Some(&mut outbound))
        .unwrap();

    assert!(outcome.prevents_default());
    assert!(!outcome.turn_requested);
    assert_eq!(outbound.get(STRUCTURED), Some("<p>ne</p><p>t</p>"));
    assert_eq!(outbound.get(PLAIN), Some("ne\n\nt"));
    assert_eq!(engine.doc.root_markup(), "<p>o</p><p>wo</p>");

    let after = SelectionRange::collapsed(BoundaryPoint::new(root, 1));
    assert_eq!(
        engine.calls,
        vec![Call::UndoCheckpoint(Some(range)), Call::SetSelection(after)]
    );
}

#[test]
fn test_cut_everything_restores_structure_next_turn() {
    let mut engine = RecordingEngine::new("<p>all</p>");
    select_all(&mut engine);
    let mut clipboard = clipboard();
    let mut outbound = MemoryOutbound::new();

    let outcome = clipboard
        .handle_cut(&mut engine, Some(&mut outbound))
        .unwrap();

    assert!(outcome.turn_requested);
    assert_eq!(outbound.get(STRUCTURED), Some("<p>all</p>"));
    assert_eq!(engine.doc.root_markup(), "");
    assert!(!engine.calls.contains(&Call::EnsureMinimalStructure));

    assert_eq!(clipboard.run_next_turn(&mut engine).unwrap(), 1);
    assert_eq!(engine.calls.last(), Some(&Call::EnsureMinimalStructure));
}

#[test]
fn test_cut_collapsed_is_noop() {
    let mut engine = RecordingEngine::new("<p>text</p>");
    select(&mut engine, (&[0, 0], 2), (&[0, 0], 2));
    let mut outbound = MemoryOutbound::new();

    let outcome = clipboard()
        .handle_cut(&mut engine, Some(&mut outbound))
        .unwrap();

    assert_eq!(outcome.action, TransferAction::Nothing);
    assert!(outcome.prevents_default());
    assert_eq!(engine.doc.root_markup(), "<p>text</p>");
    assert!(engine.calls.is_empty());
    assert!(outbound.is_empty());
}

#[test]
fn test_cut_without_outbound_write_access() {
    let mut engine = RecordingEngine::new("<p>text</p>");
    select(&mut engine, (&[0, 0], 0), (&[0, 0], 2));
    let range = engine.selection;
    let edge = Platform {
        edge: true,
        windows: true,
        ..Default::default()
    };
    let mut clipboard = Clipboard::new(edge, ClipboardConfig::default());
    let mut outbound = MemoryOutbound::new();

    let outcome = clipboard
        .handle_cut(&mut engine, Some(&mut outbound))
        .unwrap();

    assert_eq!(outcome.disposition, Disposition::PlatformDefault);
    assert!(outcome.turn_requested);
    assert!(outbound.is_empty());
    assert_eq!(engine.doc.root_markup(), "<p>text</p>");
    assert_eq!(
        engine.calls,
        vec![Call::UndoCheckpoint(Some(range)), Call::SetSelection(range)]
    );

    clipboard.run_next_turn(&mut engine).unwrap();
    assert_eq!(engine.calls.last(), Some(&Call::EnsureMinimalStructure));
}

// === Paste: per-item ===

#[test]
fn test_paste_prefers_structured_item() {
    let mut engine = RecordingEngine::new("<p>x</p>");
    let mut clipboard = clipboard();
    let mut transfer = MemoryTransfer::new(ReadCapability::PerItem)
        .with_string(PLAIN, "x")
        .with_string(STRUCTURED, "<b>x</b>");

    let outcome = clipboard.handle_paste(&mut engine, &mut transfer).unwrap();
    assert!(outcome.prevents_default());
    assert!(matches!(outcome.action, TransferAction::Materializing(_)));
    assert_eq!(clipboard.state(), ClipboardState::AwaitingMaterialization);

    let action = materialize(&mut clipboard, &mut engine, &mut transfer);
    assert_eq!(
        action,
        TransferAction::Inserted(PasteContent::Structured("<b>x</b>".into()))
    );
    assert_eq!(
        engine.insertions(),
        vec![&Call::InsertStructured("<b>x</b>".into())]
    );
    assert_eq!(clipboard.state(), ClipboardState::Idle);
}

#[test]
fn test_paste_modifier_forces_plain_text() {
    let mut engine = RecordingEngine::new("");
    let mut clipboard = clipboard();
    let mut transfer = MemoryTransfer::new(ReadCapability::PerItem)
        .with_string(PLAIN, "x")
        .with_string(STRUCTURED, "<b>x</b>");

    clipboard.on_modifier_change(true);
    let _ = clipboard.handle_paste(&mut engine, &mut transfer).unwrap();
    materialize(&mut clipboard, &mut engine, &mut transfer);

    assert_eq!(engine.insertions(), vec![&Call::InsertPlain("x".into())]);
}

#[test]
fn test_paste_modifier_ignored_when_disabled() {
    let mut engine = RecordingEngine::new("");
    let config = ClipboardConfig {
        plain_text_modifier: false,
        ..Default::default()
    };
    let mut clipboard = Clipboard::new(Platform::default(), config);
    let mut transfer = MemoryTransfer::new(ReadCapability::PerItem)
        .with_string(PLAIN, "x")
        .with_string(STRUCTURED, "<b>x</b>");

    clipboard.on_modifier_change(true);
    let _ = clipboard.handle_paste(&mut engine, &mut transfer).unwrap();
    materialize(&mut clipboard, &mut engine, &mut transfer);

    assert_eq!(
        engine.insertions(),
        vec![&Call::InsertStructured("<b>x</b>".into())]
    );
}

#[test]
fn test_paste_image_is_reported_not_inserted() {
    let mut engine = RecordingEngine::new("");
    let mut clipboard = clipboard();
    let seen = watch_will_paste(&mut clipboard);
    let mut transfer = MemoryTransfer::new(ReadCapability::PerItem).with_file("image/png");

    let outcome = clipboard.handle_paste(&mut engine, &mut transfer).unwrap();

    assert_eq!(outcome.action, TransferAction::ImageReported);
    assert!(outcome.prevents_default());
    assert!(engine.insertions().is_empty());
    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].is_image);
    assert_eq!(seen[0].items.len(), 1);
    assert!(seen[0].content.is_none());
}

#[test]
fn test_paste_empty_item_list() {
    let mut engine = RecordingEngine::new("");
    let mut clipboard = clipboard();
    let seen = watch_will_paste(&mut clipboard);
    let mut transfer = MemoryTransfer::new(ReadCapability::PerItem).with_type(FILES);

    let outcome = clipboard.handle_paste(&mut engine, &mut transfer).unwrap();

    assert_eq!(outcome.action, TransferAction::EmptyItems);
    assert_eq!(seen.borrow().len(), 1);
    assert!(seen.borrow()[0].items.is_empty());
    assert!(!seen.borrow()[0].is_image);
}

#[test]
fn test_paste_empty_legacy_rich_text_is_probably_an_image() {
    let mut engine = RecordingEngine::new("");
    let mut clipboard = clipboard();
    let seen = watch_will_paste(&mut clipboard);
    let mut transfer = MemoryTransfer::new(ReadCapability::PerItem)
        .with_string(PLAIN, "fallback")
        .with_string(LEGACY_RICH, "");

    let _ = clipboard.handle_paste(&mut engine, &mut transfer).unwrap();
    let action = materialize(&mut clipboard, &mut engine, &mut transfer);

    assert_eq!(action, TransferAction::Nothing);
    assert!(seen.borrow()[0].is_image);
    assert!(engine.insertions().is_empty());
}

#[test]
fn test_paste_legacy_rich_text_inserts_plain() {
    let mut engine = RecordingEngine::new("");
    let mut clipboard = clipboard();
    let seen = watch_will_paste(&mut clipboard);
    let mut transfer =
        MemoryTransfer::new(ReadCapability::PerItem).with_string(LEGACY_RICH, "rich words");

    let _ = clipboard.handle_paste(&mut engine, &mut transfer).unwrap();
    materialize(&mut clipboard, &mut engine, &mut transfer);

    assert!(!seen.borrow()[0].is_image);
    assert_eq!(
        engine.insertions(),
        vec![&Call::InsertPlain("rich words".into())]
    );
}

#[test]
fn test_stale_ticket_is_reported() {
    let mut engine = RecordingEngine::new("");
    let mut clipboard = clipboard();

    let action = clipboard.complete_materialization(&mut engine, Ticket(7), "late".into());

    assert_eq!(action, TransferAction::Nothing);
    assert_eq!(
        engine.errors(),
        vec!["no pending materialization for ticket 7"]
    );
    assert!(engine.insertions().is_empty());
}

#[test]
fn test_materialization_insert_failure_is_reported() {
    let mut engine = RecordingEngine::new("");
    engine.fail_inserts = true;
    let mut clipboard = clipboard();
    let mut transfer = MemoryTransfer::new(ReadCapability::PerItem).with_string(PLAIN, "x");

    let _ = clipboard.handle_paste(&mut engine, &mut transfer).unwrap();
    materialize(&mut clipboard, &mut engine, &mut transfer);

    assert_eq!(engine.errors(), vec!["editing engine error: insert rejected"]);
    assert_eq!(clipboard.state(), ClipboardState::Idle);
}

/// Per-item transfer whose items can never be read as strings.
struct UnreadableItems(MemoryTransfer);

impl InboundTransfer for UnreadableItems {
    fn capability(&self) -> ReadCapability {
        self.0.capability()
    }

    fn types(&self) -> Vec<SmolStr> {
        self.0.types()
    }

    fn items(&self) -> Vec<TransferItem> {
        self.0.items()
    }

    fn get_data(&self, mime: &str) -> Option<String> {
        self.0.get_data(mime)
    }

    fn request_string(&mut self, _index: usize, _ticket: Ticket) -> Result<(), EngineError> {
        Err(EngineError::from("getAsString threw"))
    }
}

#[test]
fn test_failed_materialization_request_returns_to_idle() {
    let mut engine = RecordingEngine::new("<p>text</p>");
    select_all(&mut engine);
    let mut clipboard = clipboard();
    let mut transfer =
        UnreadableItems(MemoryTransfer::new(ReadCapability::PerItem).with_string(PLAIN, "x"));

    let result = clipboard.handle_paste(&mut engine, &mut transfer);

    assert!(matches!(
        result,
        Err(ClipboardError::Engine(EngineError(ref msg))) if msg == "getAsString threw"
    ));
    assert_eq!(clipboard.state(), ClipboardState::Idle);
    assert!(!clipboard.abandon_pending(&mut engine));
    assert!(engine.insertions().is_empty());

    // The next operation is not rejected as busy.
    let mut outbound = MemoryOutbound::new();
    let outcome = clipboard
        .handle_copy(&mut engine, Some(&mut outbound))
        .unwrap();
    assert!(outcome.prevents_default());
    assert_eq!(outbound.get(PLAIN), Some("text"));
}

#[test]
fn test_operations_rejected_while_materializing() {
    let mut engine = RecordingEngine::new("<p>text</p>");
    select_all(&mut engine);
    let mut clipboard = clipboard();
    let mut transfer = MemoryTransfer::new(ReadCapability::PerItem).with_string(PLAIN, "x");
    let _ = clipboard.handle_paste(&mut engine, &mut transfer).unwrap();

    let mut outbound = MemoryOutbound::new();
    assert!(matches!(
        clipboard.handle_copy(&mut engine, Some(&mut outbound)),
        Err(ClipboardError::Busy {
            state: "materialization"
        })
    ));
    assert!(clipboard.abandon_pending(&mut engine));
    assert_eq!(clipboard.state(), ClipboardState::Idle);
    assert!(!clipboard.abandon_pending(&mut engine));
}

// === Paste: gates ===

#[test]
fn test_before_paste_cancel_touches_nothing() {
    let mut engine = RecordingEngine::new("<p>keep</p>");
    let before = engine.doc.root_markup();
    let mut clipboard = clipboard();
    clipboard
        .events_mut()
        .subscribe(GateKind::BeforePaste, |e| e.prevent_default());

    for mut transfer in [
        MemoryTransfer::new(ReadCapability::PerItem).with_string(STRUCTURED, "<b>x</b>"),
        MemoryTransfer::new(ReadCapability::TypeOnly).with_string(PLAIN, "x"),
        MemoryTransfer::opaque(),
    ] {
        let outcome = clipboard.handle_paste(&mut engine, &mut transfer).unwrap();
        assert_eq!(outcome.action, TransferAction::Canceled);
        assert!(outcome.prevents_default());
        assert!(transfer.take_requests().is_empty());
    }

    assert!(engine.calls.is_empty());
    assert_eq!(engine.doc.root_markup(), before);
    assert_eq!(clipboard.state(), ClipboardState::Idle);
}

#[test]
fn test_will_paste_cancel_suppresses_insertion() {
    let mut engine = RecordingEngine::new("");
    let mut clipboard = clipboard();
    clipboard
        .events_mut()
        .subscribe(GateKind::WillPaste, |e| e.prevent_default());
    let mut transfer = MemoryTransfer::new(ReadCapability::TypeOnly)
        .with_string(STRUCTURED, "<i>y</i>");

    let outcome = clipboard.handle_paste(&mut engine, &mut transfer).unwrap();

    assert_eq!(outcome.action, TransferAction::InsertionPrevented);
    assert!(engine.insertions().is_empty());
}

// === Paste: type-only ===

#[test]
fn test_type_only_paste_inserts_synchronously() {
    let mut engine = RecordingEngine::new("");
    let mut clipboard = clipboard();
    let seen = watch_will_paste(&mut clipboard);
    let mut transfer = MemoryTransfer::new(ReadCapability::TypeOnly)
        .with_string(STRUCTURED, "<b>x</b>")
        .with_string(PLAIN, "x");

    let outcome = clipboard.handle_paste(&mut engine, &mut transfer).unwrap();

    assert_eq!(
        outcome.action,
        TransferAction::Inserted(PasteContent::Structured("<b>x</b>".into()))
    );
    assert!(!outcome.turn_requested);
    assert_eq!(
        seen.borrow()[0].content,
        Some(PasteContent::Structured("<b>x</b>".into()))
    );
}

#[test]
fn test_type_only_insert_failure_propagates() {
    let mut engine = RecordingEngine::new("");
    engine.fail_inserts = true;
    let mut transfer = MemoryTransfer::new(ReadCapability::TypeOnly).with_string(PLAIN, "x");

    let result = clipboard().handle_paste(&mut engine, &mut transfer);

    assert!(matches!(result, Err(ClipboardError::Engine(_))));
    assert!(engine.errors().is_empty());
}

// === Paste: scrape fallback ===

#[test]
fn test_scrape_concatenates_split_surfaces() {
    let mut engine = RecordingEngine::new("<p>text</p>");
    select(&mut engine, (&[0, 0], 1), (&[0, 0], 3));
    let saved = engine.selection;
    let mut clipboard = clipboard();
    let mut transfer = MemoryTransfer::opaque();

    let outcome = clipboard.handle_paste(&mut engine, &mut transfer).unwrap();
    assert_eq!(outcome.action, TransferAction::Scraping);
    assert_eq!(outcome.disposition, Disposition::PlatformDefault);
    assert!(outcome.turn_requested);
    assert_eq!(clipboard.state(), ClipboardState::AwaitingScrape);

    // A second paste notification for the same gesture is rejected.
    assert!(matches!(
        clipboard.handle_paste(&mut engine, &mut MemoryTransfer::opaque()),
        Err(ClipboardError::Busy { state: "scrape" })
    ));

    // The platform inserts, splitting its content over two surfaces.
    let surface = clipboard.scrape_session().map(|s| s.surface()).unwrap();
    let body = engine.doc.body();
    let tree = engine.doc.tree_mut();
    append_markup(tree, surface, "<div>hello</div>");
    let split = tree.create_element("div", Vec::new());
    tree.append_child(body, split);
    append_markup(tree, split, "<div>world</div>");

    assert_eq!(clipboard.run_next_turn(&mut engine).unwrap(), 1);

    assert_eq!(clipboard.state(), ClipboardState::Idle);
    assert_eq!(engine.selection, saved);
    assert_eq!(
        engine.insertions(),
        vec![&Call::InsertStructured("helloworld".into())]
    );
    let restore = engine
        .calls
        .iter()
        .position(|c| *c == Call::SetSelection(saved));
    let insert = engine
        .calls
        .iter()
        .position(|c| matches!(c, Call::InsertStructured(_)));
    assert!(restore < insert);
    assert_eq!(engine.doc.tree().children(body), &[engine.doc.root()]);
}

#[test]
fn test_scrape_with_nothing_inserted() {
    let mut engine = RecordingEngine::new("<p>text</p>");
    let mut clipboard = clipboard();

    let _ = clipboard
        .handle_paste(&mut engine, &mut MemoryTransfer::opaque())
        .unwrap();
    clipboard.run_next_turn(&mut engine).unwrap();

    assert!(engine.insertions().is_empty());
    assert!(engine.errors().is_empty());
    assert_eq!(clipboard.state(), ClipboardState::Idle);
}

#[test]
fn test_abandon_scrape_removes_surface() {
    let mut engine = RecordingEngine::new("<p>text</p>");
    let saved = engine.selection;
    let mut clipboard = clipboard();

    let _ = clipboard
        .handle_paste(&mut engine, &mut MemoryTransfer::opaque())
        .unwrap();
    assert!(clipboard.abandon_pending(&mut engine));

    assert_eq!(engine.selection, saved);
    assert_eq!(engine.doc.tree().children(engine.doc.body()).len(), 1);
    assert!(!clipboard.has_deferred_work());
    assert!(matches!(
        clipboard.run_next_turn(&mut engine),
        Err(ClipboardError::NothingDeferred)
    ));
}

// === Drop ===

#[test]
fn test_drop_cleans_up_next_turn() {
    let mut engine = RecordingEngine::new("<p>text</p>");
    let root = engine.doc.root();
    let selection = engine.selection;
    let mut clipboard = clipboard();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    clipboard.events_mut().subscribe(GateKind::WillDrop, move |e| {
        if let Some(payload) = e.as_will_drop() {
            sink.borrow_mut().push(payload.clone());
        }
    });
    let transfer = MemoryTransfer::new(ReadCapability::TypeOnly).with_string(LEGACY_PLAIN, "dropped");
    let point = SelectionRange::collapsed(BoundaryPoint::new(root, 1));

    let outcome = clipboard
        .handle_drop(&mut engine, &transfer, Some(point))
        .unwrap();

    assert_eq!(outcome.disposition, Disposition::PlatformDefault);
    assert!(outcome.turn_requested);
    {
        let seen = seen.borrow();
        assert!(seen[0].has_plain);
        assert!(!seen[0].has_structured);
        assert_eq!(seen[0].insertion_point, Some(point));
    }
    assert_eq!(
        engine.calls,
        vec![Call::UndoCheckpoint(None), Call::SetSelection(selection)]
    );

    clipboard.run_next_turn(&mut engine).unwrap();
    assert_eq!(
        &engine.calls[2..],
        &[Call::CleanupStructure(root), Call::AutoDetectLinks(root)]
    );
}

#[test]
fn test_drop_cleanup_failure_reported_once() {
    let mut engine = RecordingEngine::new("<p>text</p>");
    engine.fail_cleanup = true;
    let mut clipboard = clipboard();
    let transfer = MemoryTransfer::new(ReadCapability::TypeOnly).with_string(STRUCTURED, "<b>x</b>");

    let _ = clipboard.handle_drop(&mut engine, &transfer, None).unwrap();
    assert_eq!(clipboard.run_next_turn(&mut engine).unwrap(), 1);

    assert_eq!(engine.errors(), vec!["editing engine error: cleanup failed"]);
    assert!(!engine
        .calls
        .iter()
        .any(|c| matches!(c, Call::AutoDetectLinks(_))));
}

#[test]
fn test_drop_canceled() {
    let mut engine = RecordingEngine::new("<p>text</p>");
    let mut clipboard = clipboard();
    clipboard
        .events_mut()
        .subscribe(GateKind::WillDrop, |e| e.prevent_default());
    let transfer = MemoryTransfer::new(ReadCapability::TypeOnly).with_string(PLAIN, "x");

    let outcome = clipboard.handle_drop(&mut engine, &transfer, None).unwrap();

    assert_eq!(outcome.action, TransferAction::Canceled);
    assert!(outcome.prevents_default());
    assert!(engine.calls.is_empty());
    assert!(!clipboard.has_deferred_work());
}

#[test]
fn test_drop_without_text_is_left_alone() {
    let mut engine = RecordingEngine::new("<p>text</p>");
    let mut clipboard = clipboard();
    let transfer = MemoryTransfer::new(ReadCapability::TypeOnly).with_file("image/png");

    let outcome = clipboard.handle_drop(&mut engine, &transfer, None).unwrap();

    assert_eq!(outcome.action, TransferAction::PlatformDefault);
    assert!(!outcome.turn_requested);
    assert!(engine.calls.is_empty());
}
