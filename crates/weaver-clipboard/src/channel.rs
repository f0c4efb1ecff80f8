//! Logical clipboard channels.
//!
//! Inbound transfers advertise named channels (MIME types plus a couple of
//! legacy names) and expose them at one of three read granularities. Outbound
//! writes go to exactly two slots and are fire-and-forget.

use smol_str::SmolStr;

use crate::error::EngineError;

pub const STRUCTURED: &str = "text/html";
pub const PLAIN: &str = "text/plain";
pub const LEGACY_RICH: &str = "text/rtf";
pub const URI_LIST: &str = "text/uri-list";
/// File payloads.
pub const FILES: &str = "Files";
/// Legacy plain text name used by old drag sources.
pub const LEGACY_PLAIN: &str = "Text";

/// What a channel name means to the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Structured,
    Plain,
    LegacyRich,
    UriList,
    Files,
    Image,
    Other,
}

impl Channel {
    pub fn classify(name: &str) -> Self {
        match name {
            STRUCTURED => Channel::Structured,
            PLAIN | LEGACY_PLAIN => Channel::Plain,
            LEGACY_RICH => Channel::LegacyRich,
            URI_LIST => Channel::UriList,
            FILES => Channel::Files,
            _ if is_image_type(name) => Channel::Image,
            _ => Channel::Other,
        }
    }
}

/// Image family check (`image/*`).
pub fn is_image_type(mime: &str) -> bool {
    mime.strip_prefix("image/").is_some_and(|sub| !sub.is_empty())
}

/// Read granularity an inbound transfer offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadCapability {
    /// Nothing can be read; only the platform's own insertion sees the data.
    None,
    /// Channel names plus synchronous whole-channel reads.
    TypeOnly,
    /// Individual items, each materialized asynchronously.
    PerItem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    String,
    File,
}

/// One entry of a per-item transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferItem {
    /// Position in the transfer's item list.
    pub index: usize,
    pub kind: ItemKind,
    pub mime: SmolStr,
}

impl TransferItem {
    pub fn new(index: usize, kind: ItemKind, mime: impl Into<SmolStr>) -> Self {
        Self {
            index,
            kind,
            mime: mime.into(),
        }
    }

    pub fn channel(&self) -> Channel {
        Channel::classify(&self.mime)
    }

    pub fn is_image(&self) -> bool {
        is_image_type(&self.mime)
    }
}

/// Handle identifying one pending materialization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub u64);

impl std::fmt::Display for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Inbound side of a paste or drop.
pub trait InboundTransfer {
    fn capability(&self) -> ReadCapability;

    /// Advertised channel names, in the order the platform lists them.
    fn types(&self) -> Vec<SmolStr>;

    /// Items of a per-item transfer. Empty for other capabilities.
    fn items(&self) -> Vec<TransferItem>;

    /// Synchronous read of a whole channel. `None` when the channel is absent
    /// or unreadable.
    fn get_data(&self, mime: &str) -> Option<String>;

    /// Start materializing item `index` as a string.
    ///
    /// The result must be handed back through
    /// `Clipboard::complete_materialization` with the same ticket, on a later
    /// turn. An `Err` means no result will ever be delivered for `ticket`.
    fn request_string(&mut self, index: usize, ticket: Ticket) -> Result<(), EngineError>;

    fn has_type(&self, mime: &str) -> bool {
        self.types().iter().any(|t| t == mime)
    }
}

/// Outbound side of a copy or cut.
///
/// Writes give no feedback; a platform may silently drop either slot.
pub trait OutboundChannel {
    fn set_data(&mut self, mime: &str, data: &str);
}

/// Write both encodings to the outbound slots. One attempt, no retry.
pub fn write<O: OutboundChannel + ?Sized>(outbound: &mut O, markup: &str, plain_text: &str) {
    outbound.set_data(STRUCTURED, markup);
    outbound.set_data(PLAIN, plain_text);
}

// === In-memory channels ===

/// Inbound transfer backed by plain data, for native hosts and tests.
#[derive(Debug, Clone)]
pub struct MemoryTransfer {
    capability: ReadCapability,
    types: Vec<SmolStr>,
    entries: Vec<(TransferItem, String)>,
    requests: Vec<(usize, Ticket)>,
}

impl MemoryTransfer {
    pub fn new(capability: ReadCapability) -> Self {
        Self {
            capability,
            types: Vec::new(),
            entries: Vec::new(),
            requests: Vec::new(),
        }
    }

    /// Transfer with no readable channels at all.
    pub fn opaque() -> Self {
        Self::new(ReadCapability::None)
    }

    /// Advertise a channel with data.
    pub fn with_string(mut self, mime: &str, data: impl Into<String>) -> Self {
        self.push(ItemKind::String, mime, data.into());
        self
    }

    /// Advertise a file item. Advertises the `Files` channel as well.
    pub fn with_file(mut self, mime: &str) -> Self {
        self.push(ItemKind::File, mime, String::new());
        if !self.types.iter().any(|t| t == FILES) {
            self.types.push(SmolStr::new_static(FILES));
        }
        self
    }

    /// Advertise a channel name with no item behind it.
    pub fn with_type(mut self, mime: &str) -> Self {
        self.types.push(SmolStr::new(mime));
        self
    }

    fn push(&mut self, kind: ItemKind, mime: &str, data: String) {
        let index = self.entries.len();
        if kind == ItemKind::String && !self.types.iter().any(|t| t == mime) {
            self.types.push(SmolStr::new(mime));
        }
        self.entries.push((TransferItem::new(index, kind, mime), data));
    }

    /// Materialization requests received so far, oldest first.
    pub fn take_requests(&mut self) -> Vec<(usize, Ticket)> {
        std::mem::take(&mut self.requests)
    }

    /// String payload of item `index`, as a completed materialization
    /// would deliver it.
    pub fn item_string(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|(_, data)| data.as_str())
    }
}

impl InboundTransfer for MemoryTransfer {
    fn capability(&self) -> ReadCapability {
        self.capability
    }

    fn types(&self) -> Vec<SmolStr> {
        if self.capability == ReadCapability::None {
            return Vec::new();
        }
        self.types.clone()
    }

    fn items(&self) -> Vec<TransferItem> {
        if self.capability != ReadCapability::PerItem {
            return Vec::new();
        }
        self.entries.iter().map(|(item, _)| item.clone()).collect()
    }

    fn get_data(&self, mime: &str) -> Option<String> {
        if self.capability == ReadCapability::None {
            return None;
        }
        self.entries
            .iter()
            .find(|(item, _)| item.kind == ItemKind::String && item.mime == mime)
            .map(|(_, data)| data.clone())
    }

    fn request_string(&mut self, index: usize, ticket: Ticket) -> Result<(), EngineError> {
        self.requests.push((index, ticket));
        Ok(())
    }
}

/// Outbound channel that records what was written.
#[derive(Debug, Clone, Default)]
pub struct MemoryOutbound {
    slots: Vec<(SmolStr, String)>,
}

impl MemoryOutbound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, mime: &str) -> Option<&str> {
        self.slots
            .iter()
            .rev()
            .find(|(slot, _)| slot == mime)
            .map(|(_, data)| data.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[(SmolStr, String)] {
        &self.slots
    }
}

impl OutboundChannel for MemoryOutbound {
    fn set_data(&mut self, mime: &str, data: &str) {
        self.slots.push((SmolStr::new(mime), data.to_string()));
    }
}
