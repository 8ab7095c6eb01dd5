//! Per-connection handler: lobby, join, and input routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Lobby: answer `list_rooms` / `create_room` until `hello` arrives
//!   2. `hello` → resolve the room code → get or create the room → join
//!   3. Loop: forward `input` to the room
//!   4. On close, receive error or idle timeout → leave the room
//!
//! Once joined, everything the client receives comes from the room's
//! writer task; the handler only reads.
//!
//! The lobby is WebSocket-only: there is no HTTP room listing.

use std::sync::Arc;
use std::time::Duration;

use orbarena_protocol::{
    ClientMessage, Codec, Hello, JsonCodec, RoomSummary, ServerMessage, error_code,
};
use orbarena_room::{RoomCode, RoomHandle, RoomManager};
use orbarena_sim::PlayerId;
use orbarena_transport::{ClientHandle, Connection, TransportError};

use crate::ArenaError;

/// How often a join is attempted when the room stops underneath it.
const JOIN_ATTEMPTS: usize = 2;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C> {
    pub(crate) rooms: Arc<RoomManager<C>>,
    pub(crate) codec: JsonCodec,
    pub(crate) idle_timeout: Duration,
}

/// The room a connection has joined and its player id there.
struct Joined<C> {
    room: RoomHandle<C>,
    player_id: PlayerId,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C>(
    conn: Arc<C>,
    state: Arc<ServerState<C>>,
) -> Result<(), ArenaError>
where
    C: Connection<Error = TransportError>,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, room = ?conn.room_code(), "handling new connection");

    let mut joined: Option<Joined<C>> = None;

    loop {
        let data = match tokio::time::timeout(state.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%conn_id, timeout = ?state.idle_timeout, "connection idle, dropping");
                break;
            }
        };

        let msg = match state.codec.decode_client(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "ignoring malformed message");
                continue;
            }
        };

        match msg {
            ClientMessage::Input(input) => match &joined {
                Some(j) => {
                    if let Err(e) = j.room.submit_input(j.player_id, input.to_input()) {
                        tracing::debug!(%conn_id, error = %e, "room gone, closing connection");
                        break;
                    }
                }
                None => tracing::trace!(%conn_id, "input before hello ignored"),
            },
            ClientMessage::Hello(hello) => {
                if joined.is_none() {
                    joined = join(&conn, &state, hello).await?;
                } else {
                    tracing::debug!(%conn_id, "repeated hello ignored");
                }
            }
            ClientMessage::ListRooms | ClientMessage::CreateRoom if joined.is_some() => {
                tracing::debug!(%conn_id, "lobby message after join ignored");
            }
            ClientMessage::ListRooms => {
                let rooms = state
                    .rooms
                    .list_rooms()
                    .await
                    .into_iter()
                    .map(|info| RoomSummary {
                        code: info.code.to_string(),
                        players: info.player_count,
                    })
                    .collect();
                send(&*conn, &state.codec, &ServerMessage::Rooms(rooms)).await?;
            }
            ClientMessage::CreateRoom => {
                let room = state.rooms.create_room().await;
                tracing::info!(%conn_id, code = %room.code(), "room created from lobby");
                let reply = ServerMessage::RoomCreated {
                    code: room.code().to_string(),
                };
                send(&*conn, &state.codec, &reply).await?;
            }
        }
    }

    match joined {
        Some(Joined { room, player_id }) => {
            if let Err(e) = room.leave(player_id).await {
                tracing::debug!(%conn_id, %player_id, error = %e, "leave after room stopped");
            }
        }
        None => {
            // Not joined, so no room writer will hang up for us.
            let _ = conn.terminate().await;
        }
    }
    Ok(())
}

/// Resolves the room for `hello` and joins it.
///
/// The code from the upgrade URL wins over `hello.room`. Failures are
/// reported to the client with an `error` message and leave the
/// connection in the lobby.
async fn join<C>(
    conn: &Arc<C>,
    state: &ServerState<C>,
    hello: Hello,
) -> Result<Option<Joined<C>>, ArenaError>
where
    C: Connection<Error = TransportError>,
{
    let Some(raw) = conn.room_code().map(str::to_owned).or(hello.room) else {
        let reply = ServerMessage::error(error_code::BAD_REQUEST, "missing room code");
        send(&**conn, &state.codec, &reply).await?;
        return Ok(None);
    };
    let code = match RoomCode::parse(&raw) {
        Ok(code) => code,
        Err(e) => {
            let reply = ServerMessage::error(error_code::BAD_REQUEST, e.to_string());
            send(&**conn, &state.codec, &reply).await?;
            return Ok(None);
        }
    };

    // A room that emptied a moment ago may be stopping; a second
    // `get_or_create` then starts a fresh one under the same code.
    for attempt in 1..=JOIN_ATTEMPTS {
        let room = state.rooms.get_or_create(&code).await;
        match room.join(Arc::clone(conn), hello.name.clone()).await {
            Ok(player_id) => {
                tracing::debug!(conn_id = %conn.id(), %code, %player_id, "joined room");
                return Ok(Some(Joined { room, player_id }));
            }
            Err(e) => {
                tracing::debug!(conn_id = %conn.id(), %code, attempt, error = %e, "join failed");
            }
        }
    }

    let reply = ServerMessage::error(
        error_code::UNAVAILABLE,
        format!("room {code} is unavailable"),
    );
    send(&**conn, &state.codec, &reply).await?;
    Ok(None)
}

/// Sends a message directly on the connection.
async fn send<C>(conn: &C, codec: &JsonCodec, msg: &ServerMessage) -> Result<(), ArenaError>
where
    C: ClientHandle<Error = TransportError>,
{
    let bytes = codec.encode(msg)?;
    conn.deliver(&bytes).await?;
    Ok(())
}
