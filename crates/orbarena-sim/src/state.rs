//! Authoritative match state.

use std::collections::BTreeMap;
use std::fmt;

use crate::tuning::{
    ARENA_SIZE, ORB_ORBIT_RADIUS, PLAYER_RADIUS, SPAWN_GOLDEN_ANGLE,
    SPAWN_SPACING, STAMINA_MAX,
};
use crate::{Orb, Vec2};

/// A unique identifier for a player within a room.
///
/// Its `Display` form (`p7`) is the id clients see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// One player's control input, latched by the room until replaced.
///
/// The default value is the neutral input: no acceleration, no boost,
/// no shoot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Input {
    /// Desired acceleration, x component in `[-1, 1]`.
    pub ax: f64,
    /// Desired acceleration, y component in `[-1, 1]`.
    pub ay: f64,
    /// Sprint request.
    pub boost: bool,
    /// Fire request. Only the rising edge fires the orb.
    pub shoot: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Sprint resource in `[0, STAMINA_MAX]`.
    pub stamina: f64,
    /// Never decreases while the player is alive.
    pub score: f64,
    /// Whether shoot was held on the previous tick.
    pub prev_shoot: bool,
}

impl Player {
    /// Creates a player at the deterministic spawn point for `id`.
    pub fn spawn(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            pos: spawn_point(id),
            vel: Vec2::ZERO,
            stamina: STAMINA_MAX,
            score: 0.0,
            prev_shoot: false,
        }
    }
}

/// Spawn points lie on a golden-angle spiral around the arena center,
/// pulled in far enough that a fresh orb stays inside the arena.
fn spawn_point(id: PlayerId) -> Vec2 {
    let half = ARENA_SIZE / 2.0;
    let max_r = half - PLAYER_RADIUS - ORB_ORBIT_RADIUS;
    let n = id.0 as f64;
    let r = (SPAWN_SPACING * n.sqrt()).min(max_r);
    Vec2::new(half, half) + Vec2::from_angle(n * SPAWN_GOLDEN_ANGLE) * r
}

/// A player removed by a kill, captured before removal.
#[derive(Debug, Clone, PartialEq)]
pub struct EliminatedEntry {
    pub id: PlayerId,
    pub name: String,
    /// Score at the moment of death.
    pub score: f64,
}

/// The full simulated state of one match.
///
/// Players and orbs live in ordered maps so every pass over them visits
/// entities in ascending id order.
#[derive(Debug, Clone, Default)]
pub struct State {
    pub tick: u64,
    pub players: BTreeMap<PlayerId, Player>,
    /// Orbs keyed by owner id.
    pub orbs: BTreeMap<PlayerId, Orb>,
    /// Append-only kill log for this match.
    pub eliminated: Vec<EliminatedEntry>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the player and its orb for `id`, each only if absent.
    ///
    /// Returns `true` if a new player was created.
    pub fn spawn_player(&mut self, id: PlayerId, name: impl Into<String>) -> bool {
        let created = !self.players.contains_key(&id);
        let player = self
            .players
            .entry(id)
            .or_insert_with(|| Player::spawn(id, name));
        let owner_pos = player.pos;
        self.orbs.entry(id).or_insert_with(|| Orb::new(id, owner_pos));
        created
    }

    /// Removes a player together with its orb.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        self.orbs.remove(&id);
        self.players.remove(&id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}
