//! Room lifecycle management for Orbarena.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns one
//! match: the simulation state, the connected clients and their latched
//! inputs. Everything else talks to a room through its [`RoomHandle`].
//!
//! # Key types
//!
//! - [`RoomManager`]: creates, finds and reaps rooms by code
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomCode`]: short case-insensitive room identifier
//! - [`RoomStatus`]: lifecycle state machine
//! - [`RoomConfig`]: mailbox, outbox and tick settings

mod code;
mod config;
mod error;
mod manager;
mod room;

pub use code::{CODE_ALPHABET, CODE_LEN, RoomCode};
pub use config::{RoomConfig, RoomStatus};
pub use error::RoomError;
pub use manager::RoomManager;
pub use room::{RoomHandle, RoomInfo, spawn_room};
