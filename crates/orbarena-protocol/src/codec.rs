//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The handler and the room actor never call `serde_json` directly; they
//! go through a [`Codec`]. Only [`JsonCodec`] exists today, matching the
//! browser client.

use serde::{Serialize, de::DeserializeOwned};

use crate::{ClientMessage, ProtocolError};

/// Encodes Rust values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` so one codec value can live inside every room
/// task and connection task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or do
    /// not match `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Decodes one inbound client frame.
    ///
    /// # Errors
    /// `InvalidMessage` for an empty frame, otherwise whatever
    /// [`Codec::decode`] returns.
    fn decode_client(&self, data: &[u8]) -> Result<ClientMessage, ProtocolError> {
        if data.is_empty() {
            return Err(ProtocolError::InvalidMessage("empty frame".into()));
        }
        self.decode(data)
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use orbarena_protocol::{ClientMessage, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let msg = codec.decode_client(br#"{"t":"list_rooms"}"#).unwrap();
/// assert_eq!(msg, ClientMessage::ListRooms);
///
/// let bytes = codec.encode(&msg).unwrap();
/// assert_eq!(bytes, br#"{"t":"list_rooms"}"#);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
