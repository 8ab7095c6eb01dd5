//! Transport abstraction layer for Orbarena.
//!
//! Two capabilities are kept apart on purpose:
//!
//! - [`ClientHandle`] is all a room ever sees of a client: push bytes out,
//!   or hang up. Rooms are generic over it and never name a socket type.
//! - [`Connection`] adds the inbound side (`recv`) used only by the
//!   connection handler.
//!
//! All trait futures are `Send` so handlers and room writers can be
//! `tokio::spawn`ed.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{PendingWebSocket, WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
///
/// Accepting is split in two. [`accept`](Transport::accept) returns as soon
/// as a peer is there; the protocol handshake happens later in
/// [`PendingConnection::upgrade`], usually on the peer's own task, so a
/// peer that never finishes it cannot hold up the accept loop.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// An accepted peer that has not completed its handshake yet.
    type Pending: PendingConnection<Connection = Self::Connection, Error = Self::Error>;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Waits for the next incoming peer.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Pending, Self::Error>> + Send;

    /// The address the transport is listening on.
    fn local_addr(&self) -> Result<SocketAddr, Self::Error>;
}

/// A peer accepted by a [`Transport`] whose handshake is still to run.
pub trait PendingConnection: Send + 'static {
    /// The connection produced once the handshake succeeds.
    type Connection: Connection;
    /// The error type for a failed handshake.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Remote address of the peer.
    fn peer_addr(&self) -> SocketAddr;

    /// Runs the handshake and yields the connection.
    fn upgrade(self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;
}

/// Outbound capability to one client.
///
/// A room holds one of these per player, each behind its own writer task,
/// so a slow `deliver` only ever stalls that player's queue.
pub trait ClientHandle: Send + Sync + 'static {
    /// The error type for delivery and termination.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Delivers one encoded message to the client.
    fn deliver(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Closes the client's connection. Calling it on an already closed
    /// connection returns an error and has no other effect.
    fn terminate(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// A full client connection: outbound capability plus inbound messages.
pub trait Connection: ClientHandle {
    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Room code requested at connect time, if any.
    fn room_code(&self) -> Option<&str>;
}
