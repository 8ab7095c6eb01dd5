//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means the bytes were the problem, never the
//! socket or the room. The connection handler logs these at debug and
//! keeps reading.

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing an outbound message failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The inbound bytes are not a well-formed envelope, the `t` tag is
    /// unknown, or the payload does not match the tag.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// Decoded fine but breaks a protocol rule, e.g. an empty frame.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
