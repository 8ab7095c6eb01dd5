//! Gameplay tuning constants.
//!
//! Distances are in arena units, speeds in units per tick, angles in
//! radians. All rates are expressed per simulation tick, so changing the
//! tick rate changes the feel of the game.

// ---------------------------------------------------------------------------
// Arena
// ---------------------------------------------------------------------------

/// Width and height of the square arena.
pub const ARENA_SIZE: f64 = 2000.0;

/// Collision radius of a player body.
pub const PLAYER_RADIUS: f64 = 25.0;

/// Radial spacing of the spawn spiral. Spawn `n` sits at
/// `SPAWN_SPACING * sqrt(n)` from the arena center.
pub const SPAWN_SPACING: f64 = 90.0;

/// Golden angle in radians, used to spread spawns evenly.
pub const SPAWN_GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

// ---------------------------------------------------------------------------
// Movement
// ---------------------------------------------------------------------------

/// Input magnitude at or below this is treated as no input.
pub const DEADZONE: f64 = 0.08;

/// Acceleration applied along the input direction each tick.
pub const ACCEL_PER_TICK: f64 = 1.0;

/// Acceleration multiplier while sprinting.
pub const SPRINT_MULT: f64 = 2.5;

/// Player velocity is divided by this every tick (exponential decay).
pub const PLAYER_DAMPING_DIV: f64 = 1.1;

/// Speed cap while walking.
pub const MAX_SPEED: f64 = 12.0;

/// Speed cap while sprinting.
pub const MAX_SPRINT_SPEED: f64 = 20.0;

// ---------------------------------------------------------------------------
// Stamina
// ---------------------------------------------------------------------------

pub const STAMINA_MAX: f64 = 100.0;

/// Stamina spent per sprinting tick (~2.5 s of sprint at 40 Hz).
pub const STAMINA_DRAIN_PER_TICK: f64 = 1.0;

/// Stamina recovered per non-sprinting tick.
pub const STAMINA_REGEN_PER_TICK: f64 = 0.4;

// ---------------------------------------------------------------------------
// Orb
// ---------------------------------------------------------------------------

/// Distance of an orbiting orb from its owner's center.
pub const ORB_ORBIT_RADIUS: f64 = 60.0;

/// Orbit phase advance per tick.
pub const ORB_ANGULAR_SPEED: f64 = 0.12;

/// Rendered size of an orb, reported in snapshots.
pub const ORB_BASE_SIZE: f64 = 12.0;

/// Hit radius of a shot orb. A hit lands when the distance between orb and
/// player is below `PLAYER_RADIUS + ORB_HIT_RADIUS`.
pub const ORB_HIT_RADIUS: f64 = 12.0;

/// Speed at launch, tangential to the orbit circle.
pub const ORB_SHOT_SPEED: f64 = 22.0;

/// Shot velocity is divided by this every tick after the first.
pub const ORB_SHOT_DAMPING_DIV: f64 = 1.04;

/// Ticks a shot lasts before the orb starts returning.
pub const ORB_SHOT_DURATION_TICKS: u32 = 24;

/// A shot ends early once the orb is this far from its owner.
pub const ORB_MAX_SHOT_DISTANCE: f64 = 420.0;

/// Ticks after launch before the orb may be fired again.
pub const ORB_COOLDOWN_TICKS: u32 = 60;

/// Maximum distance covered per tick while returning.
pub const ORB_RETURN_SPEED: f64 = 18.0;

/// A returning orb re-enters orbit once its distance from the owner is
/// within this much of `ORB_ORBIT_RADIUS`.
pub const ORB_RETURN_SNAP_TOLERANCE: f64 = 4.0;

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Score every living player accrues per tick.
pub const PASSIVE_SCORE_PER_TICK: f64 = 0.025;

/// Flat score for an elimination.
pub const KILL_REWARD: f64 = 10.0;

/// Fraction of the victim's pre-death score transferred to the killer.
pub const KILL_STEAL_FRACTION: f64 = 0.5;
