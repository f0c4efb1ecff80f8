//! Error types for clipboard operations.

use thiserror::Error;

use crate::dom::NodeId;

/// Error raised by an editing engine service.
///
/// Engines wrap whatever went wrong on their side into a message; the
/// clipboard layer only needs to carry it to the host's error reporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError(pub String);

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for EngineError {}

impl From<&str> for EngineError {
    fn from(s: &str) -> Self {
        EngineError(s.to_string())
    }
}

impl From<String> for EngineError {
    fn from(s: String) -> Self {
        EngineError(s)
    }
}

/// Errors that can occur during clipboard operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ClipboardError {
    /// An operation was triggered while another one is still suspended.
    #[error("clipboard busy: {state} pending")]
    Busy {
        /// Name of the state the clipboard was in.
        state: &'static str,
    },

    /// A materialization result arrived for a request that is not pending.
    #[error("no pending materialization for ticket {0}")]
    StaleTicket(u64),

    /// A deferred turn was run with nothing queued for it.
    #[error("no deferred work queued")]
    NothingDeferred,

    /// A node id that does not belong to the tree it was used with.
    #[error("node {0} does not belong to this tree")]
    UnknownNode(NodeId),

    /// A range whose boundaries are out of bounds or out of order.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// An editing engine service failed.
    #[error("editing engine error: {0}")]
    Engine(#[from] EngineError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_converts() {
        let err: ClipboardError = EngineError::from("insert failed").into();
        assert_eq!(err.to_string(), "editing engine error: insert failed");
    }

    #[test]
    fn test_busy_message() {
        let err = ClipboardError::Busy {
            state: "scrape",
        };
        assert_eq!(err.to_string(), "clipboard busy: scrape pending");
    }
}
