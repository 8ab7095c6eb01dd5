//! Deterministic match simulation for Orbarena.
//!
//! The engine is a single total function, [`step`], that advances a
//! [`State`] by exactly one tick given the latched [`Input`] of each player.
//! It performs no I/O and cannot fail. The room actor that owns a `State`
//! is the only caller.
//!
//! # Stages
//!
//! Every tick runs three stages in a fixed order so the outcome never
//! depends on map iteration order:
//!
//! ```text
//! A. movement     → accelerate, damp, clamp speed, integrate, clamp to arena
//! B. collisions   → collect Shot-orb hits, then resolve kills and scoring
//! C. orb machine  → Orbit → Shot → Return → Orbit
//! ```
//!
//! # Key types
//!
//! - [`State`]: tick counter, players, orbs, elimination log
//! - [`Player`] / [`Orb`] / [`OrbMode`]: the simulated entities
//! - [`Input`]: one player's latched control input
//! - [`tuning`]: every gameplay constant

mod orb;
mod state;
mod step;
pub mod tuning;
mod vec2;

pub use orb::{Orb, OrbId, OrbMode};
pub use state::{EliminatedEntry, Input, Player, PlayerId, State};
pub use step::step;
pub use vec2::Vec2;
