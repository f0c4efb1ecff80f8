//! `DataTransfer` adapters.
//!
//! Wraps a clipboard or drag event's `DataTransfer` as the core crate's
//! inbound and outbound channels.

use std::rc::Rc;

use smol_str::SmolStr;
use wasm_bindgen::{JsCast, JsValue};
use weaver_clipboard::{
    EngineError, InboundTransfer, ItemKind, OutboundChannel, ReadCapability, Ticket, TransferItem,
};

/// Receives materialized item strings. Called on a later turn with the ticket
/// passed to `request_string`; forward both to
/// `Clipboard::complete_materialization`.
pub type MaterializeSink = Rc<dyn Fn(Ticket, String)>;

/// Inbound view of a paste or drop.
pub struct DataTransferInbound {
    data_transfer: Option<web_sys::DataTransfer>,
    capability: ReadCapability,
    on_string: Option<MaterializeSink>,
}

impl DataTransferInbound {
    /// Create from a paste event.
    ///
    /// Call this in your paste event handler.
    pub fn from_clipboard_event(evt: &web_sys::ClipboardEvent, on_string: MaterializeSink) -> Self {
        Self::new(evt.clipboard_data(), Some(on_string))
    }

    /// Create from a drop event. Drops never materialize items.
    pub fn from_drag_event(evt: &web_sys::DragEvent) -> Self {
        Self::new(evt.data_transfer(), None)
    }

    pub fn new(
        data_transfer: Option<web_sys::DataTransfer>,
        on_string: Option<MaterializeSink>,
    ) -> Self {
        let capability = match &data_transfer {
            None => ReadCapability::None,
            Some(dt) if has_item_list(dt) => ReadCapability::PerItem,
            Some(_) => ReadCapability::TypeOnly,
        };
        Self {
            data_transfer,
            capability,
            on_string,
        }
    }
}

/// Older engines expose `types` and `getData` but no `items`.
fn has_item_list(dt: &web_sys::DataTransfer) -> bool {
    js_sys::Reflect::get(dt.as_ref(), &JsValue::from_str("items"))
        .map(|items| !items.is_undefined() && !items.is_null())
        .unwrap_or(false)
}

impl InboundTransfer for DataTransferInbound {
    fn capability(&self) -> ReadCapability {
        self.capability
    }

    fn types(&self) -> Vec<SmolStr> {
        let Some(dt) = &self.data_transfer else {
            return Vec::new();
        };
        dt.types()
            .iter()
            .filter_map(|t| t.as_string())
            .map(SmolStr::from)
            .collect()
    }

    fn items(&self) -> Vec<TransferItem> {
        let Some(dt) = self.data_transfer.as_ref().filter(|_| self.capability == ReadCapability::PerItem)
        else {
            return Vec::new();
        };
        let list = dt.items();
        (0..list.length())
            .filter_map(|i| {
                let item = list.get(i)?;
                let kind = match item.kind().as_str() {
                    "file" => ItemKind::File,
                    _ => ItemKind::String,
                };
                Some(TransferItem::new(i as usize, kind, item.type_()))
            })
            .collect()
    }

    fn get_data(&self, mime: &str) -> Option<String> {
        self.data_transfer.as_ref()?.get_data(mime).ok()
    }

    fn request_string(&mut self, index: usize, ticket: Ticket) -> Result<(), EngineError> {
        let (Some(dt), Some(sink)) = (&self.data_transfer, &self.on_string) else {
            return Err(EngineError::from("cannot materialize: no transfer or sink"));
        };
        let Some(item) = dt.items().get(index as u32) else {
            return Err(EngineError(format!(
                "item {} vanished before materialization",
                index
            )));
        };

        let sink = sink.clone();
        let callback = wasm_bindgen::closure::Closure::once_into_js(move |text: String| {
            sink(ticket, text);
        });
        item.get_as_string(Some(callback.unchecked_ref()))
            .map_err(|e| EngineError(format!("getAsString failed: {:?}", e)))
    }
}

/// Outbound view of a copy or cut event.
pub struct DataTransferOutbound {
    data_transfer: web_sys::DataTransfer,
}

impl DataTransferOutbound {
    /// Create from a copy or cut event. `None` when the event carries no
    /// writable transfer.
    pub fn from_event(evt: &web_sys::ClipboardEvent) -> Option<Self> {
        evt.clipboard_data().map(Self::new)
    }

    pub fn new(data_transfer: web_sys::DataTransfer) -> Self {
        Self { data_transfer }
    }
}

impl OutboundChannel for DataTransferOutbound {
    fn set_data(&mut self, mime: &str, data: &str) {
        if let Err(e) = self.data_transfer.set_data(mime, data) {
            tracing::warn!("Clipboard write of {} failed: {:?}", mime, e);
        }
    }
}
