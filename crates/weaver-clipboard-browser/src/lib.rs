//! Browser layer for weaver-clipboard.
//!
//! This crate adapts `DataTransfer` and browser event handling to the
//! platform-independent clipboard core. It assumes a
//! `wasm32-unknown-unknown` target environment.
//!
//! # Architecture
//!
//! - `transfer`: `DataTransfer` as inbound and outbound channels
//! - `events`: disposition, modifier sampling and next-turn scheduling
//! - `platform`: Browser/OS detection for platform-specific behavior
//!
//! `init_tracing` wires `tracing` to the browser console for host binaries.
//!
//! # Re-exports
//!
//! This crate re-exports `weaver-clipboard` for convenience, so consumers
//! only need to depend on `weaver-clipboard-browser`.

// Re-export core crate
pub use weaver_clipboard;
pub use weaver_clipboard::*;

pub mod events;
pub mod platform;
pub mod transfer;

pub use events::{apply_disposition, schedule_next_turn, track_modifiers};
pub use platform::platform;
pub use transfer::{DataTransferInbound, DataTransferOutbound, MaterializeSink};

/// Install the browser console tracing subscriber and panic hook.
///
/// For host binaries; the library itself never installs a subscriber.
/// `filter` takes `EnvFilter` directives, e.g. `"weaver_clipboard=debug"`.
pub fn init_tracing(filter: &str) {
    use tracing::subscriber::set_global_default;
    use tracing_subscriber::Registry;
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;

    console_error_panic_hook::set_once();

    let wasm_layer = tracing_wasm::WASMLayer::new(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::DEBUG)
            .build(),
    );
    let reg = Registry::default().with(EnvFilter::new(filter)).with(wasm_layer);

    // A host may have installed its own subscriber already.
    let _ = set_global_default(reg);
}
