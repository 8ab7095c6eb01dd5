//! Unified error type for the Orbarena server.

use orbarena_protocol::ProtocolError;
use orbarena_room::RoomError;
use orbarena_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (not found, unavailable, invalid code).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A configuration value could not be used.
    #[error("configuration error: {0}")]
    Config(String),
}
