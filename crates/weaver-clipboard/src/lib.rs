//! weaver-clipboard: Clipboard and drag-drop reconciliation without framework dependencies.
//!
//! This crate provides:
//! - `Tree` / `Document` - arena node tree the editing engine and clipboard share
//! - `extract` - DOM-range extraction of a selection into a standalone fragment
//! - `serialize` - fragment to markup plus rendered plain text
//! - `resolve` - choosing the one extraction path for a paste
//! - `scrape` - hidden-surface fallback when a paste cannot be read
//! - `Clipboard` - the per-editor state machine tying copy, cut, paste and drop
//!   to an `EditingEngine`, with cancellable gates on an `EventBus`
//!
//! Platform access goes through the `InboundTransfer` and `OutboundChannel`
//! traits, so browser and native hosts plug in their own channels.

pub mod channel;
pub mod clipboard;
pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod extract;
pub mod gate;
pub mod markup;
pub mod platform;
pub mod range;
pub mod resolve;
pub mod scrape;
pub mod serialize;

pub use channel::{
    Channel, InboundTransfer, ItemKind, MemoryOutbound, MemoryTransfer, OutboundChannel,
    ReadCapability, Ticket, TransferItem,
};
pub use clipboard::{Clipboard, ClipboardState, Disposition, TransferAction, TransferOutcome};
pub use config::ClipboardConfig;
pub use dom::{Attribute, Document, Fragment, NodeId, NodeKind, Tree};
pub use engine::EditingEngine;
pub use error::{ClipboardError, EngineError};
pub use extract::{ExtractMode, Extraction, extract, extract_copy, extract_cut};
pub use gate::{
    EventBus, GateEvent, GateKind, GatePayload, PasteContent, SubscriptionId, WillDrop, WillPaste,
};
pub use markup::{inner_html, parse_fragment};
pub use platform::{Capabilities, LineEnding, Platform};
pub use range::{BoundaryPoint, SelectionRange};
pub use resolve::{MaterializeAs, Resolution, resolve};
pub use serialize::{Serialized, serialize};
pub use smol_str::SmolStr;
