//! Error types for focus sessions.

use thiserror::Error;

use crate::models::session::SessionState;

/// Errors raised by the session state machine.
///
/// A rejected operation never leaves a session partially updated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("duration must not be negative (got {seconds}s)")]
    NegativeDuration { seconds: i64 },

    #[error("planned duration must be greater than zero (got {seconds}s)")]
    InvalidPlannedDuration { seconds: i64 },

    #[error("cannot {operation}: session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("invalid session record: {0}")]
    InvalidRecord(String),
}
