//! Cancelable clipboard events.
//!
//! Before-events fire ahead of an operation and can veto it outright.
//! Will-events fire once the operation knows what it is about to insert and
//! can veto just the insertion. Observers run synchronously in registration
//! order and share the event's `prevented` flag.

use smol_str::SmolStr;

use crate::channel::TransferItem;
use crate::range::SelectionRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateKind {
    BeforeCopy,
    BeforeCut,
    BeforePaste,
    WillPaste,
    WillDrop,
}

/// What a paste is about to insert, when it is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteContent {
    Structured(String),
    Plain(String),
}

/// Payload of `willPaste`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WillPaste {
    /// Items of a per-item transfer. Empty for other read paths, and for
    /// platforms that report file pastes as an empty item list.
    pub items: Vec<TransferItem>,
    pub types: Vec<SmolStr>,
    /// The paste probably carries an image. Heuristic for legacy rich text.
    pub is_image: bool,
    /// `None` when nothing will be inserted automatically.
    pub content: Option<PasteContent>,
}

/// Payload of `willDrop`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WillDrop {
    /// Where the host thinks the drop will land, if it could tell.
    pub insertion_point: Option<SelectionRange>,
    pub types: Vec<SmolStr>,
    pub has_plain: bool,
    pub has_structured: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatePayload {
    None,
    WillPaste(WillPaste),
    WillDrop(WillDrop),
}

/// One dispatch of a gate.
#[derive(Debug, Clone)]
pub struct GateEvent {
    kind: GateKind,
    payload: GatePayload,
    prevented: bool,
}

impl GateEvent {
    pub fn new(kind: GateKind, payload: GatePayload) -> Self {
        Self {
            kind,
            payload,
            prevented: false,
        }
    }

    pub fn before(kind: GateKind) -> Self {
        Self::new(kind, GatePayload::None)
    }

    pub fn will_paste(payload: WillPaste) -> Self {
        Self::new(GateKind::WillPaste, GatePayload::WillPaste(payload))
    }

    pub fn will_drop(payload: WillDrop) -> Self {
        Self::new(GateKind::WillDrop, GatePayload::WillDrop(payload))
    }

    pub fn kind(&self) -> GateKind {
        self.kind
    }

    pub fn payload(&self) -> &GatePayload {
        &self.payload
    }

    pub fn as_will_paste(&self) -> Option<&WillPaste> {
        match &self.payload {
            GatePayload::WillPaste(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_will_drop(&self) -> Option<&WillDrop> {
        match &self.payload {
            GatePayload::WillDrop(p) => Some(p),
            _ => None,
        }
    }

    pub fn prevent_default(&mut self) {
        self.prevented = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.prevented
    }
}

/// Handle returned by `EventBus::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&mut GateEvent)>;

/// Synchronous observer registry.
#[derive(Default)]
pub struct EventBus {
    observers: Vec<(SubscriptionId, GateKind, Observer)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, kind: GateKind, observer: F) -> SubscriptionId
    where
        F: FnMut(&mut GateEvent) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, kind, Box::new(observer)));
        id
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _, _)| *sub != id);
        self.observers.len() != before
    }

    /// Run every observer registered for the event's kind.
    ///
    /// Returns true when the event went through uncanceled.
    pub fn fire(&mut self, event: &mut GateEvent) -> bool {
        for (_, kind, observer) in &mut self.observers {
            if *kind == event.kind {
                observer(event);
            }
        }
        !event.prevented
    }

    pub fn has_observers(&self, kind: GateKind) -> bool {
        self.observers.iter().any(|(_, k, _)| *k == kind)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.observers.len())
            .finish()
    }
}
