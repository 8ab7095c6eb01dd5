//! Wire protocol for Orbarena.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`StateSnapshot`]):
//!   the `{"t", "p"}` envelope and every payload.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how messages become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! The protocol layer sits between the transport (raw frames) and the room
//! (simulation commands). It knows how to turn a simulation [`State`] into
//! a snapshot but nothing about sockets or room lifecycles.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Room (Input / Join / Leave)
//! Room (State)      → Protocol (ServerMessage) → Transport (bytes)
//! ```
//!
//! [`State`]: orbarena_sim::State

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    BROADCAST_HZ, CLIENT_INPUT_HZ, ClientMessage, EliminatedSnapshot, Hello,
    InputMessage, OrbSnapshot, PlayerSnapshot, RoomSummary, SIM_TICK_HZ,
    ServerMessage, StateSnapshot, Welcome, error_code,
};
