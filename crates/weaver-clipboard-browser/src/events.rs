//! Browser event plumbing around a `Clipboard`.
//!
//! The core never touches events directly. These helpers apply an outcome's
//! disposition to the triggering event, sample modifier state, and schedule
//! the deferred turn an outcome may ask for.

use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use weaver_clipboard::{Clipboard, TransferOutcome};

/// Suppress the platform default if the outcome handled the event.
pub fn apply_disposition(evt: &web_sys::Event, outcome: &TransferOutcome) {
    if outcome.prevents_default() {
        evt.prevent_default();
    }
}

/// Forward a key event's shift state to the clipboard.
///
/// Paste events carry no modifier state, so wire this to both `keydown` and
/// `keyup` on the editor.
pub fn track_modifiers(evt: &web_sys::KeyboardEvent, clipboard: &mut Clipboard) {
    clipboard.on_modifier_change(evt.shift_key());
}

/// Run `callback` on the next turn via a zero-delay timeout.
///
/// Returns false if no timer could be scheduled, in which case the callback
/// never runs.
pub fn schedule_next_turn(callback: impl FnOnce() + 'static) -> bool {
    let Some(window) = web_sys::window() else {
        tracing::warn!("no window, cannot schedule deferred clipboard work");
        return false;
    };
    let closure = Closure::once_into_js(callback);
    match window
        .set_timeout_with_callback_and_timeout_and_arguments_0(closure.unchecked_ref(), 0)
    {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("setTimeout failed: {:?}", e);
            false
        }
    }
}
