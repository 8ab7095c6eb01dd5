//! Error types for the room layer.

use crate::RoomCode;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No room is registered under this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The room's mailbox is closed or its reply was dropped; the room has
    /// stopped or is stopping.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),

    /// The string is not a usable room code.
    #[error("invalid room code {0:?}")]
    InvalidCode(String),
}
