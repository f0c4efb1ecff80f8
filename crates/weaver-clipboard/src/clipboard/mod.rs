//! Per-editor clipboard context.
//!
//! `Clipboard` wires extraction, serialization, resolution and the gates
//! together for the four transfer triggers (copy, cut, paste, drop). It owns
//! the only state that outlives a single trigger:
//!
//! - the suspension state (`Idle`, awaiting a scrape, awaiting a
//!   materialization), which rejects overlapping operations
//! - the last sampled plain-text modifier
//! - work queued for the next scheduling turn
//!
//! Hosts call the `handle_*` methods from their platform event handlers,
//! honour the returned `Disposition`, and call `run_next_turn` from a
//! zero-delay timer whenever an outcome asks for one.

use std::collections::VecDeque;

use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::channel::{
    self, Channel, InboundTransfer, OutboundChannel, STRUCTURED, Ticket, TransferItem,
};
use crate::config::ClipboardConfig;
use crate::engine::EditingEngine;
use crate::error::ClipboardError;
use crate::extract::{extract_copy, extract_cut};
use crate::gate::{EventBus, GateEvent, GateKind, PasteContent, WillDrop, WillPaste};
use crate::platform::{Capabilities, Platform};
use crate::range::SelectionRange;
use crate::resolve::{MaterializeAs, Resolution, resolve};
use crate::scrape::{self, ScrapeSession};
use crate::serialize::{Serialized, serialize};

#[cfg(test)]
mod tests;

/// What the host must do with the platform event that triggered an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The operation handled the event; suppress the platform default.
    Handled,
    /// Let the platform perform its default behaviour.
    PlatformDefault,
}

/// What an operation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferAction {
    /// Nothing to transfer.
    Nothing,
    /// A before-gate observer canceled the operation.
    Canceled,
    /// Both outbound slots were written.
    Written(Serialized),
    /// The platform handles the transfer itself.
    PlatformDefault,
    /// Content was handed to the engine for insertion.
    Inserted(PasteContent),
    /// A `willPaste` observer vetoed the insertion.
    InsertionPrevented,
    /// An image paste was reported to observers and left to them.
    ImageReported,
    /// A per-item paste arrived with no items and was reported to observers.
    EmptyItems,
    /// Waiting for `complete_materialization` with this ticket.
    Materializing(Ticket),
    /// Waiting one turn for the platform to fill the scrape surface.
    Scraping,
}

/// Result of a clipboard trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct TransferOutcome {
    pub disposition: Disposition,
    pub action: TransferAction,
    /// Work was queued; the host must call `run_next_turn` on the next turn.
    pub turn_requested: bool,
}

impl TransferOutcome {
    fn handled(action: TransferAction) -> Self {
        Self {
            disposition: Disposition::Handled,
            action,
            turn_requested: false,
        }
    }

    fn platform_default(action: TransferAction) -> Self {
        Self {
            disposition: Disposition::PlatformDefault,
            action,
            turn_requested: false,
        }
    }

    fn with_turn(mut self, requested: bool) -> Self {
        self.turn_requested = requested;
        self
    }

    pub fn prevents_default(&self) -> bool {
        self.disposition == Disposition::Handled
    }
}

/// Public view of the suspension state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardState {
    Idle,
    AwaitingScrape,
    AwaitingMaterialization,
}

impl ClipboardState {
    pub fn name(self) -> &'static str {
        match self {
            ClipboardState::Idle => "idle",
            ClipboardState::AwaitingScrape => "scrape",
            ClipboardState::AwaitingMaterialization => "materialization",
        }
    }
}

#[derive(Debug)]
struct PendingMaterialization {
    ticket: Ticket,
    mode: MaterializeAs,
    items: Vec<TransferItem>,
    types: Vec<SmolStr>,
}

#[derive(Debug)]
enum State {
    Idle,
    AwaitingScrape(ScrapeSession),
    AwaitingMaterialization(PendingMaterialization),
}

/// Work for the next scheduling turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    CompleteScrape,
    EnsureMinimalStructure,
    CleanupAfterDrop,
}

/// Clipboard and drag-drop handling for one editor.
#[derive(Debug)]
pub struct Clipboard {
    config: ClipboardConfig,
    platform: Platform,
    capabilities: Capabilities,
    events: EventBus,
    state: State,
    plain_modifier: bool,
    deferred: VecDeque<Deferred>,
    next_ticket: u64,
}

impl Clipboard {
    pub fn new(platform: Platform, config: ClipboardConfig) -> Self {
        Self {
            capabilities: platform.capabilities(),
            config,
            platform,
            events: EventBus::new(),
            state: State::Idle,
            plain_modifier: false,
            deferred: VecDeque::new(),
            next_ticket: 0,
        }
    }

    pub fn config(&self) -> &ClipboardConfig {
        &self.config
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Register gate observers here.
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn state(&self) -> ClipboardState {
        match self.state {
            State::Idle => ClipboardState::Idle,
            State::AwaitingScrape(_) => ClipboardState::AwaitingScrape,
            State::AwaitingMaterialization(_) => ClipboardState::AwaitingMaterialization,
        }
    }

    /// The scrape surface currently waiting for the platform, if any.
    pub fn scrape_session(&self) -> Option<&ScrapeSession> {
        match &self.state {
            State::AwaitingScrape(session) => Some(session),
            _ => None,
        }
    }

    pub fn has_deferred_work(&self) -> bool {
        !self.deferred.is_empty()
    }

    /// Record the plain-text modifier state.
    ///
    /// Paste events do not carry modifier state, so hosts forward every key
    /// event's shift state here and the last sample wins.
    pub fn on_modifier_change(&mut self, shift: bool) {
        self.plain_modifier = shift;
    }

    fn force_plain(&self) -> bool {
        self.config.plain_text_modifier && self.plain_modifier
    }

    fn ensure_idle(&self, operation: &str) -> Result<(), ClipboardError> {
        match self.state() {
            ClipboardState::Idle => Ok(()),
            state => {
                warn!("[{}] ignored: {} pending", operation, state.name());
                Err(ClipboardError::Busy { state: state.name() })
            }
        }
    }

    fn defer(&mut self, work: Deferred) {
        self.deferred.push_back(work);
    }

    // === Copy / cut ===

    /// Handle a copy trigger.
    ///
    /// `outbound` is the event's writable channel, if the platform provided
    /// one. Everything runs before this returns; writes made later would be
    /// rejected by the platform.
    pub fn handle_copy<E: EditingEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        outbound: Option<&mut dyn OutboundChannel>,
    ) -> Result<TransferOutcome, ClipboardError> {
        self.ensure_idle("COPY")?;

        let mut before = GateEvent::before(GateKind::BeforeCopy);
        if !self.events.fire(&mut before) {
            debug!("[COPY] canceled by observer");
            return Ok(TransferOutcome::platform_default(TransferAction::Canceled));
        }

        let Some(outbound) = outbound.filter(|_| self.capabilities.outbound_write) else {
            debug!("[COPY] no outbound write access, leaving it to the platform");
            return Ok(TransferOutcome::platform_default(
                TransferAction::PlatformDefault,
            ));
        };

        let range = engine.current_selection();
        let root = engine.document().root();
        let Some(extraction) = extract_copy(engine.document_mut().tree_mut(), range, root)? else {
            debug!("[COPY] collapsed selection, nothing to copy");
            return Ok(TransferOutcome::handled(TransferAction::Nothing));
        };

        let line_ending = self.config.line_ending(&self.capabilities);
        let serialized = serialize(engine, extraction.fragment, &self.config, line_ending);
        channel::write(outbound, &serialized.markup, &serialized.plain_text);
        debug!(
            markup_len = serialized.markup.len(),
            text_len = serialized.plain_text.len(),
            "[COPY] wrote clipboard"
        );

        Ok(TransferOutcome::handled(TransferAction::Written(serialized)))
    }

    /// Handle a cut trigger.
    ///
    /// Saves an undo checkpoint before anything is removed. Without outbound
    /// write access the platform performs the cut, and the engine's minimal
    /// structure is restored on the next turn.
    pub fn handle_cut<E: EditingEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        outbound: Option<&mut dyn OutboundChannel>,
    ) -> Result<TransferOutcome, ClipboardError> {
        self.ensure_idle("CUT")?;

        let mut before = GateEvent::before(GateKind::BeforeCut);
        if !self.events.fire(&mut before) {
            debug!("[CUT] canceled by observer");
            return Ok(TransferOutcome::platform_default(TransferAction::Canceled));
        }

        let range = engine.current_selection();
        range.validate(engine.document().tree())?;
        if range.is_collapsed() {
            return Ok(TransferOutcome::handled(TransferAction::Nothing));
        }

        engine.save_undo_checkpoint(Some(range));

        let Some(outbound) = outbound.filter(|_| self.capabilities.outbound_write) else {
            debug!("[CUT] no outbound write access, leaving it to the platform");
            self.defer(Deferred::EnsureMinimalStructure);
            engine.set_selection(range);
            return Ok(TransferOutcome::platform_default(TransferAction::PlatformDefault)
                .with_turn(true));
        };

        let root = engine.document().root();
        let Some(extraction) = extract_cut(engine.document_mut().tree_mut(), range, root)? else {
            return Ok(TransferOutcome::handled(TransferAction::Nothing));
        };
        let range_after = extraction.range_after;

        let line_ending = self.config.line_ending(&self.capabilities);
        let serialized = serialize(engine, extraction.fragment, &self.config, line_ending);
        channel::write(outbound, &serialized.markup, &serialized.plain_text);
        engine.set_selection(range_after);

        let emptied = engine.document().is_structurally_empty();
        if emptied {
            debug!("[CUT] document emptied, restoring structure next turn");
            self.defer(Deferred::EnsureMinimalStructure);
        }

        Ok(TransferOutcome::handled(TransferAction::Written(serialized)).with_turn(emptied))
    }

    // === Paste ===

    /// Handle a paste trigger.
    pub fn handle_paste<E: EditingEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        transfer: &mut dyn InboundTransfer,
    ) -> Result<TransferOutcome, ClipboardError> {
        self.ensure_idle("PASTE")?;

        let mut before = GateEvent::before(GateKind::BeforePaste);
        if !self.events.fire(&mut before) {
            debug!("[PASTE] canceled by observer");
            return Ok(TransferOutcome::handled(TransferAction::Canceled));
        }

        let force_plain = self.force_plain();
        match resolve(&*transfer, &self.capabilities, force_plain) {
            Resolution::Scrape => {
                let session = scrape::begin(engine, &self.config);
                self.state = State::AwaitingScrape(session);
                self.defer(Deferred::CompleteScrape);
                Ok(TransferOutcome::platform_default(TransferAction::Scraping).with_turn(true))
            }
            Resolution::EmptyItems => {
                let mut event = GateEvent::will_paste(WillPaste {
                    types: transfer.types(),
                    ..Default::default()
                });
                self.events.fire(&mut event);
                Ok(TransferOutcome::handled(TransferAction::EmptyItems))
            }
            Resolution::Image => {
                let mut event = GateEvent::will_paste(WillPaste {
                    items: transfer.items(),
                    types: transfer.types(),
                    is_image: true,
                    content: None,
                });
                self.events.fire(&mut event);
                Ok(TransferOutcome::handled(TransferAction::ImageReported))
            }
            Resolution::Materialize { item, mode } => {
                let ticket = Ticket(self.next_ticket);
                self.next_ticket += 1;
                self.state = State::AwaitingMaterialization(PendingMaterialization {
                    ticket,
                    mode,
                    items: transfer.items(),
                    types: transfer.types(),
                });
                debug!(%ticket, index = item.index, mime = %item.mime, "[PASTE] materializing");
                if let Err(e) = transfer.request_string(item.index, ticket) {
                    self.state = State::Idle;
                    warn!(%ticket, "[PASTE] materialization request failed: {}", e);
                    return Err(e.into());
                }
                Ok(TransferOutcome::handled(TransferAction::Materializing(ticket)))
            }
            Resolution::Insert(content) => {
                let payload = WillPaste {
                    items: Vec::new(),
                    types: transfer.types(),
                    is_image: false,
                    content: Some(content),
                };
                let action = self.insert(engine, payload)?;
                Ok(TransferOutcome::handled(action))
            }
            Resolution::Nothing => Ok(TransferOutcome::handled(TransferAction::Nothing)),
        }
    }

    /// Deliver a materialized item string.
    ///
    /// This runs as a deferred callback: failures (including a ticket that is
    /// not pending) go to the engine's error reporter, never to the caller.
    pub fn complete_materialization<E: EditingEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        ticket: Ticket,
        text: String,
    ) -> TransferAction {
        match self.finish_materialization(engine, ticket, text) {
            Ok(action) => action,
            Err(err) => {
                warn!(%ticket, "[PASTE] materialization failed: {}", err);
                engine.report_error(err);
                TransferAction::Nothing
            }
        }
    }

    fn finish_materialization<E: EditingEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        ticket: Ticket,
        text: String,
    ) -> Result<TransferAction, ClipboardError> {
        let pending = match std::mem::replace(&mut self.state, State::Idle) {
            State::AwaitingMaterialization(pending) if pending.ticket == ticket => pending,
            other => {
                self.state = other;
                return Err(ClipboardError::StaleTicket(ticket.0));
            }
        };

        let (content, is_image) = match pending.mode {
            MaterializeAs::Structured => (Some(PasteContent::Structured(text)), false),
            MaterializeAs::Plain => (Some(PasteContent::Plain(text)), false),
            // Legacy rich text that materializes empty usually sits next to
            // an image the platform did not expose as an item.
            MaterializeAs::LegacyRich if text.is_empty() => (None, true),
            MaterializeAs::LegacyRich => (Some(PasteContent::Plain(text)), false),
        };

        self.insert(
            engine,
            WillPaste {
                items: pending.items,
                types: pending.types,
                is_image,
                content,
            },
        )
    }

    /// Fire `willPaste` and insert its content unless an observer vetoes it.
    fn insert<E: EditingEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        payload: WillPaste,
    ) -> Result<TransferAction, ClipboardError> {
        let mut event = GateEvent::will_paste(payload);
        if !self.events.fire(&mut event) {
            debug!("[PASTE] insertion prevented by observer");
            return Ok(TransferAction::InsertionPrevented);
        }

        let content = event.as_will_paste().and_then(|p| p.content.clone());
        match content {
            Some(PasteContent::Structured(markup)) if !markup.is_empty() => {
                engine.insert_structured(&markup, true)?;
                Ok(TransferAction::Inserted(PasteContent::Structured(markup)))
            }
            Some(PasteContent::Plain(text)) if !text.is_empty() => {
                engine.insert_plain_text(&text, true)?;
                Ok(TransferAction::Inserted(PasteContent::Plain(text)))
            }
            _ => Ok(TransferAction::Nothing),
        }
    }

    // === Drop ===

    /// Handle a drop onto the editor.
    ///
    /// There is no reliable way to insert at the drop location ourselves, so
    /// the platform inserts and the result is cleaned up on the next turn.
    /// `insertion_point` is the host's best guess at the drop location.
    pub fn handle_drop<E: EditingEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        transfer: &dyn InboundTransfer,
        insertion_point: Option<SelectionRange>,
    ) -> Result<TransferOutcome, ClipboardError> {
        self.ensure_idle("DROP")?;

        let types = transfer.types();
        let has_plain = types.iter().any(|t| Channel::classify(t) == Channel::Plain);
        let has_structured = types.iter().any(|t| t == STRUCTURED);

        let mut event = GateEvent::will_drop(WillDrop {
            insertion_point,
            types,
            has_plain,
            has_structured,
        });
        if !self.events.fire(&mut event) {
            debug!("[DROP] canceled by observer");
            return Ok(TransferOutcome::handled(TransferAction::Canceled));
        }

        if !(has_plain || has_structured) {
            return Ok(TransferOutcome::platform_default(
                TransferAction::PlatformDefault,
            ));
        }

        let range = engine.current_selection();
        engine.save_undo_checkpoint(None);
        engine.set_selection(range);
        // Some platforms deliver markup as plain text, so clean either way.
        self.defer(Deferred::CleanupAfterDrop);
        Ok(TransferOutcome::platform_default(TransferAction::PlatformDefault).with_turn(true))
    }

    // === Deferred work ===

    /// Run the work queued by the previous turn.
    ///
    /// Each task's failure is reported to the engine once; one failing task
    /// does not stop the others. Returns the number of tasks run.
    pub fn run_next_turn<E: EditingEngine + ?Sized>(
        &mut self,
        engine: &mut E,
    ) -> Result<usize, ClipboardError> {
        if self.deferred.is_empty() {
            return Err(ClipboardError::NothingDeferred);
        }
        let tasks: Vec<Deferred> = self.deferred.drain(..).collect();
        let count = tasks.len();
        for task in tasks {
            if let Err(err) = self.run_deferred(engine, task) {
                warn!(?task, "deferred clipboard work failed: {}", err);
                engine.report_error(err);
            }
        }
        Ok(count)
    }

    fn run_deferred<E: EditingEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        task: Deferred,
    ) -> Result<(), ClipboardError> {
        match task {
            Deferred::CompleteScrape => {
                let session = match std::mem::replace(&mut self.state, State::Idle) {
                    State::AwaitingScrape(session) => session,
                    other => {
                        self.state = other;
                        return Ok(());
                    }
                };
                let markup = scrape::finish(engine, session);
                debug!(bytes = markup.len(), "[SCRAPE] recovered paste");
                if !markup.is_empty() {
                    self.insert(
                        engine,
                        WillPaste {
                            content: Some(PasteContent::Structured(markup)),
                            ..Default::default()
                        },
                    )?;
                }
                Ok(())
            }
            Deferred::EnsureMinimalStructure => Ok(engine.ensure_minimal_structure()?),
            Deferred::CleanupAfterDrop => {
                let root = engine.document().root();
                engine.cleanup_structure(root)?;
                engine.auto_detect_links(root)?;
                Ok(())
            }
        }
    }

    /// Drop any suspended operation and return to `Idle`.
    ///
    /// For hosts whose platform never delivered the materialization or the
    /// scrape turn. A pending scrape surface is removed and the saved
    /// selection restored. Returns false if nothing was pending.
    pub fn abandon_pending<E: EditingEngine + ?Sized>(&mut self, engine: &mut E) -> bool {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => false,
            State::AwaitingScrape(session) => {
                self.deferred.retain(|d| *d != Deferred::CompleteScrape);
                scrape::discard(engine, session);
                warn!("[SCRAPE] abandoned pending scrape");
                true
            }
            State::AwaitingMaterialization(pending) => {
                warn!(ticket = %pending.ticket, "[PASTE] abandoned pending materialization");
                true
            }
        }
    }
}
