//! Every message that travels on the wire.
//!
//! All messages share one envelope: a JSON object with a type tag `t` and
//! an optional payload `p`.
//!
//! ```text
//! {"t":"input","p":{"ax":0.5,"ay":-1,"boost":true}}
//! {"t":"list_rooms"}
//! ```
//!
//! serde's adjacently tagged enums produce exactly this shape, so the
//! envelope is not a separate struct: [`ClientMessage`] and
//! [`ServerMessage`] *are* the envelope.

use serde::{Deserialize, Serialize};

use orbarena_sim::{EliminatedEntry, Input, Orb, Player, State};

// ---------------------------------------------------------------------------
// Rates
// ---------------------------------------------------------------------------

/// Simulation ticks per second.
pub const SIM_TICK_HZ: u32 = 40;

/// Snapshots per second. `SIM_TICK_HZ` must be an integer multiple.
pub const BROADCAST_HZ: u32 = 20;

/// Rate at which clients are expected to send input. Advisory only.
pub const CLIENT_INPUT_HZ: u32 = 40;

// ---------------------------------------------------------------------------
// Error codes for `ServerMessage::Error`
// ---------------------------------------------------------------------------

/// HTTP-style codes carried by [`ServerMessage::Error`].
pub mod error_code {
    /// The request was well-formed but cannot be served as sent, e.g. a
    /// `hello` with no room code anywhere.
    pub const BAD_REQUEST: u16 = 400;
    /// The room exists but is shutting down.
    pub const UNAVAILABLE: u16 = 503;
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Messages a client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "p", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a room. Must precede any `input`.
    Hello(Hello),
    /// Replace the latched input.
    Input(InputMessage),
    /// Lobby: list active rooms.
    ListRooms,
    /// Lobby: create a room with a fresh code.
    CreateRoom,
}

/// Payload of `hello`. Unknown fields (such as a client version `v`) are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Room code, used when the upgrade URL carried none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

/// Payload of `input`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InputMessage {
    pub ax: f64,
    pub ay: f64,
    #[serde(default)]
    pub boost: bool,
    #[serde(default)]
    pub shoot: bool,
}

impl InputMessage {
    /// Converts to a simulation [`Input`], clamping each axis to `[-1, 1]`
    /// and mapping non-finite values to 0.
    pub fn to_input(self) -> Input {
        Input {
            ax: sanitize_axis(self.ax),
            ay: sanitize_axis(self.ay),
            boost: self.boost,
            shoot: self.shoot,
        }
    }
}

fn sanitize_axis(v: f64) -> f64 {
    if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Messages the server sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "p", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First message after a successful join.
    Welcome(Welcome),
    /// Periodic room snapshot.
    State(StateSnapshot),
    /// Reply to `list_rooms`.
    Rooms(Vec<RoomSummary>),
    /// Reply to `create_room`.
    RoomCreated { code: String },
    /// Something the client asked for could not be done.
    Error { code: u16, message: String },
}

impl ServerMessage {
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Welcome {
    /// Player id in its display form, e.g. `"p3"`.
    pub player_id: String,
    pub tick_hz: u32,
}

/// One room in a `rooms` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub code: String,
    pub players: usize,
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// The broadcast view of a room's [`State`].
///
/// Entities are listed in ascending id order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub tick: u64,
    pub players: Vec<PlayerSnapshot>,
    pub orbs: Vec<OrbSnapshot>,
    /// Kills logged since the previous broadcast.
    pub eliminated: Vec<EliminatedSnapshot>,
}

impl StateSnapshot {
    /// Builds a snapshot, including only elimination entries at index
    /// `eliminated_since` and later.
    pub fn from_state(state: &State, eliminated_since: usize) -> Self {
        let recent = state.eliminated.get(eliminated_since..).unwrap_or(&[]);
        Self {
            tick: state.tick,
            players: state.players.values().map(PlayerSnapshot::from).collect(),
            orbs: state.orbs.values().map(OrbSnapshot::from).collect(),
            eliminated: recent.iter().map(EliminatedSnapshot::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub stamina: f64,
    pub score: f64,
}

impl From<&Player> for PlayerSnapshot {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id.to_string(),
            name: p.name.clone(),
            x: p.pos.x,
            y: p.pos.y,
            stamina: p.stamina,
            score: p.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrbSnapshot {
    pub id: String,
    pub owner_id: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    /// Orbit phase in radians.
    pub a: f64,
    /// 0 = orbit, 1 = shot, 2 = return.
    pub mode: u8,
}

impl From<&Orb> for OrbSnapshot {
    fn from(o: &Orb) -> Self {
        Self {
            id: o.id.to_string(),
            owner_id: o.owner.to_string(),
            x: o.pos.x,
            y: o.pos.y,
            size: o.size,
            a: o.angle,
            mode: o.mode.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EliminatedSnapshot {
    pub id: String,
    pub name: String,
    pub score: f64,
}

impl From<&EliminatedEntry> for EliminatedSnapshot {
    fn from(e: &EliminatedEntry) -> Self {
        Self {
            id: e.id.to_string(),
            name: e.name.clone(),
            score: e.score,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
