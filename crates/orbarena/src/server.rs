//! `ArenaServer` builder and server loop.
//!
//! This is the entry point for running an Orbarena server. It ties
//! together all the layers: transport → protocol → room.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use orbarena_protocol::JsonCodec;
use orbarena_room::{RoomConfig, RoomManager};
use orbarena_transport::{
    Connection, PendingConnection, Transport, WebSocketConnection, WebSocketTransport,
};

use crate::ArenaError;
use crate::config::{DEFAULT_BIND_ADDR, DEFAULT_IDLE_TIMEOUT_SECS, ServerConfig};
use crate::handler::{ServerState, handle_connection};

/// Builder for configuring and starting an Orbarena server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), orbarena::ArenaError> {
/// let server = orbarena::ArenaServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ArenaServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    idle_timeout: Duration,
}

impl ArenaServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            room_config: RoomConfig::default(),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }

    /// Takes the bind address and idle timeout from a [`ServerConfig`].
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.bind_addr = config.bind_addr;
        self.idle_timeout = config.idle_timeout;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the configuration every new room starts with.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets how long a connection may stay silent before it is dropped.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Binds the listener and creates the room registry.
    pub async fn build(self) -> Result<ArenaServer, ArenaError> {
        if self.idle_timeout.is_zero() {
            return Err(ArenaError::Config("idle timeout must be positive".into()));
        }

        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            rooms: RoomManager::new(self.room_config),
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
        });

        Ok(ArenaServer { transport, state })
    }
}

impl Default for ArenaServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Orbarena server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct ArenaServer {
    transport: WebSocketTransport,
    state: Arc<ServerState<WebSocketConnection>>,
}

impl ArenaServer {
    /// Creates a new builder.
    pub fn builder() -> ArenaServerBuilder {
        ArenaServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ArenaError> {
        Ok(self.transport.local_addr()?)
    }

    /// The room registry shared by every connection.
    pub fn rooms(&self) -> &Arc<RoomManager<WebSocketConnection>> {
        &self.state.rooms
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), ArenaError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves, then stops every
    /// room.
    ///
    /// Each accepted peer is upgraded and handled on its own task, so a
    /// peer stuck in the handshake never delays the next accept. Accept
    /// and upgrade errors are logged and the loop continues.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), ArenaError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "Orbarena server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(pending) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            let peer = pending.peer_addr();
                            let conn = match pending.upgrade().await {
                                Ok(conn) => conn,
                                Err(e) => {
                                    tracing::debug!(%peer, error = %e, "upgrade failed");
                                    return;
                                }
                            };
                            let conn_id = conn.id();
                            if let Err(e) = handle_connection(Arc::new(conn), state).await {
                                tracing::debug!(%conn_id, error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                },
            }
        }

        self.state.rooms.shutdown().await;
        tracing::info!("Orbarena server stopped");
        Ok(())
    }
}
