//! # Orbarena
//!
//! Authoritative multiplayer arena server. Players steer a body around a
//! square arena, fling an orbiting orb at each other and score by staying
//! alive and landing hits.
//!
//! The server owns the truth: clients send inputs, each room simulates at
//! a fixed tick rate and broadcasts snapshots back over WebSocket.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use orbarena::{ArenaServer, ServerConfig};
//!
//! # async fn run() -> Result<(), orbarena::ArenaError> {
//! let server = ArenaServer::builder()
//!     .config(ServerConfig::from_env())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{DEFAULT_BIND_ADDR, DEFAULT_IDLE_TIMEOUT_SECS, ServerConfig};
pub use error::ArenaError;
pub use server::{ArenaServer, ArenaServerBuilder};

/// Re-exports for embedding the server or talking to it.
pub mod prelude {
    pub use crate::{ArenaError, ArenaServer, ArenaServerBuilder, ServerConfig};
    pub use orbarena_protocol::{
        BROADCAST_HZ, ClientMessage, Hello, InputMessage, SIM_TICK_HZ, ServerMessage,
        StateSnapshot,
    };
    pub use orbarena_room::{RoomCode, RoomConfig, RoomInfo};
    pub use orbarena_tick::TickConfig;
}
