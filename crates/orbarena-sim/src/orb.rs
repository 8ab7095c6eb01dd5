//! The orb weapon and its three-mode state machine.

use std::f64::consts::TAU;
use std::fmt;

use crate::tuning::{
    ORB_ANGULAR_SPEED, ORB_BASE_SIZE, ORB_COOLDOWN_TICKS, ORB_MAX_SHOT_DISTANCE,
    ORB_ORBIT_RADIUS, ORB_RETURN_SNAP_TOLERANCE, ORB_RETURN_SPEED,
    ORB_SHOT_DAMPING_DIV, ORB_SHOT_DURATION_TICKS, ORB_SHOT_SPEED,
};
use crate::{PlayerId, Vec2};

/// Identifier of an orb. Shares its number with the owning player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrbId(pub u64);

impl From<PlayerId> for OrbId {
    fn from(owner: PlayerId) -> Self {
        Self(owner.0)
    }
}

impl fmt::Display for OrbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}_o", self.0)
    }
}

/// The weapon mode of an orb.
///
/// Transitions are strictly cyclic:
///
/// ```text
/// Orbit ──shoot edge──→ Shot ──timeout / max range──→ Return ──snap──→ Orbit
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrbMode {
    #[default]
    Orbit,
    Shot,
    Return,
}

impl OrbMode {
    /// The only mode this one may transition to.
    pub fn next(self) -> Self {
        match self {
            Self::Orbit => Self::Shot,
            Self::Shot => Self::Return,
            Self::Return => Self::Orbit,
        }
    }
}

impl From<OrbMode> for u8 {
    fn from(mode: OrbMode) -> u8 {
        match mode {
            OrbMode::Orbit => 0,
            OrbMode::Shot => 1,
            OrbMode::Return => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Orb {
    pub id: OrbId,
    pub owner: PlayerId,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Orbit phase in radians, kept in `[0, TAU)`.
    pub angle: f64,
    pub size: f64,
    pub mode: OrbMode,
    /// Remaining Shot ticks. Equal to `ORB_SHOT_DURATION_TICKS` only on
    /// the tick of launch.
    pub shot_ticks_left: u32,
    /// Ticks until the orb may be fired again.
    pub cooldown_ticks: u32,
}

impl Orb {
    /// A fresh orb in Orbit mode at phase 0 around `owner_pos`.
    pub fn new(owner: PlayerId, owner_pos: Vec2) -> Self {
        Self {
            id: owner.into(),
            owner,
            pos: orbit_point(owner_pos, 0.0),
            vel: Vec2::ZERO,
            angle: 0.0,
            size: ORB_BASE_SIZE,
            mode: OrbMode::Orbit,
            shot_ticks_left: 0,
            cooldown_ticks: 0,
        }
    }

    /// Advances the state machine by one tick.
    ///
    /// `owner_pos` is the owner's post-movement position. `shoot_edge` is
    /// `true` only on the tick the owner's shoot input goes from released
    /// to pressed.
    pub fn advance(&mut self, owner_pos: Vec2, shoot_edge: bool) {
        self.cooldown_ticks = self.cooldown_ticks.saturating_sub(1);

        match self.mode {
            OrbMode::Orbit => self.orbit(owner_pos, shoot_edge),
            OrbMode::Shot => self.fly(owner_pos),
            OrbMode::Return => self.home(owner_pos),
        }
    }

    fn orbit(&mut self, owner_pos: Vec2, shoot_edge: bool) {
        self.advance_phase();
        self.pos = orbit_point(owner_pos, self.angle);
        self.vel = Vec2::ZERO;

        if shoot_edge && self.cooldown_ticks == 0 {
            // Tangent of a counter-clockwise orbit.
            let tangent = Vec2::new(-self.angle.sin(), self.angle.cos());
            self.vel = tangent * ORB_SHOT_SPEED;
            self.shot_ticks_left = ORB_SHOT_DURATION_TICKS;
            self.cooldown_ticks = ORB_COOLDOWN_TICKS;
            self.mode = self.mode.next();
        }
    }

    fn fly(&mut self, owner_pos: Vec2) {
        if self.shot_ticks_left < ORB_SHOT_DURATION_TICKS {
            self.vel = self.vel / ORB_SHOT_DAMPING_DIV;
        }
        self.pos += self.vel;
        self.shot_ticks_left = self.shot_ticks_left.saturating_sub(1);

        if self.shot_ticks_left == 0
            || self.pos.distance_to(owner_pos) > ORB_MAX_SHOT_DISTANCE
        {
            self.shot_ticks_left = 0;
            self.mode = self.mode.next();
        }
    }

    fn home(&mut self, owner_pos: Vec2) {
        self.advance_phase();
        let target = orbit_point(owner_pos, self.angle);
        let to_target = target - self.pos;
        let dist = to_target.length();

        self.vel = if dist <= ORB_RETURN_SPEED {
            to_target
        } else {
            to_target * (ORB_RETURN_SPEED / dist)
        };
        self.pos += self.vel;

        let radial = self.pos.distance_to(owner_pos);
        if (radial - ORB_ORBIT_RADIUS).abs() <= ORB_RETURN_SNAP_TOLERANCE {
            self.pos = target;
            self.vel = Vec2::ZERO;
            self.mode = self.mode.next();
        }
    }

    fn advance_phase(&mut self) {
        self.angle = (self.angle + ORB_ANGULAR_SPEED).rem_euclid(TAU);
    }
}

/// The point on the orbit circle around `center` at `angle`.
pub(crate) fn orbit_point(center: Vec2, angle: f64) -> Vec2 {
    center + Vec2::from_angle(angle) * ORB_ORBIT_RADIUS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orb_at_origin() -> Orb {
        Orb::new(PlayerId(1), Vec2::ZERO)
    }

    #[test]
    fn test_mode_cycle() {
        assert_eq!(OrbMode::Orbit.next(), OrbMode::Shot);
        assert_eq!(OrbMode::Shot.next(), OrbMode::Return);
        assert_eq!(OrbMode::Return.next(), OrbMode::Orbit);
    }

    #[test]
    fn test_mode_wire_values() {
        assert_eq!(u8::from(OrbMode::Orbit), 0);
        assert_eq!(u8::from(OrbMode::Shot), 1);
        assert_eq!(u8::from(OrbMode::Return), 2);
    }

    #[test]
    fn test_orb_id_follows_owner() {
        let orb = orb_at_origin();
        assert_eq!(orb.id, OrbId(1));
        assert_eq!(orb.id.to_string(), "p1_o");
    }

    #[test]
    fn test_new_orb_sits_on_orbit() {
        let orb = Orb::new(PlayerId(1), Vec2::new(100.0, 100.0));
        assert!((orb.pos.distance_to(Vec2::new(100.0, 100.0)) - ORB_ORBIT_RADIUS).abs() < 1e-9);
    }

    #[test]
    fn test_launch_sets_tangential_velocity_and_timers() {
        let mut orb = orb_at_origin();
        orb.advance(Vec2::ZERO, true);

        assert_eq!(orb.mode, OrbMode::Shot);
        assert_eq!(orb.shot_ticks_left, ORB_SHOT_DURATION_TICKS);
        assert_eq!(orb.cooldown_ticks, ORB_COOLDOWN_TICKS);
        assert!((orb.vel.length() - ORB_SHOT_SPEED).abs() < 1e-9);
        // Tangential: perpendicular to the radius.
        let radial = orb.pos - Vec2::ZERO;
        let dot = radial.x * orb.vel.x + radial.y * orb.vel.y;
        assert!(dot.abs() < 1e-6);
    }

    #[test]
    fn test_first_shot_tick_is_undamped() {
        let mut orb = orb_at_origin();
        orb.advance(Vec2::ZERO, true);
        orb.advance(Vec2::ZERO, false);
        assert!((orb.vel.length() - ORB_SHOT_SPEED).abs() < 1e-9);

        orb.advance(Vec2::ZERO, false);
        let expected = ORB_SHOT_SPEED / ORB_SHOT_DAMPING_DIV;
        assert!((orb.vel.length() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_shot_ends_at_max_distance() {
        let mut orb = orb_at_origin();
        orb.mode = OrbMode::Shot;
        orb.shot_ticks_left = 10;
        orb.pos = Vec2::new(ORB_MAX_SHOT_DISTANCE - 1.0, 0.0);
        orb.vel = Vec2::new(5.0, 0.0);

        orb.advance(Vec2::ZERO, false);
        assert_eq!(orb.mode, OrbMode::Return);
        assert_eq!(orb.shot_ticks_left, 0);
    }

    #[test]
    fn test_return_snaps_onto_orbit() {
        let mut orb = orb_at_origin();
        orb.mode = OrbMode::Return;
        orb.pos = Vec2::new(ORB_ORBIT_RADIUS + 10.0, 0.0);

        orb.advance(Vec2::ZERO, false);
        assert_eq!(orb.mode, OrbMode::Orbit);
        assert_eq!(orb.vel, Vec2::ZERO);
        assert!((orb.pos.length() - ORB_ORBIT_RADIUS).abs() < 1e-9);
    }

    #[test]
    fn test_return_speed_is_capped() {
        let mut orb = orb_at_origin();
        orb.mode = OrbMode::Return;
        orb.pos = Vec2::new(300.0, 0.0);
        let before = orb.pos;

        orb.advance(Vec2::ZERO, false);
        assert_eq!(orb.mode, OrbMode::Return);
        assert!((orb.pos.distance_to(before) - ORB_RETURN_SPEED).abs() < 1e-9);
    }

    #[test]
    fn test_cooldown_ticks_down_in_every_mode() {
        let mut orb = orb_at_origin();
        orb.cooldown_ticks = 5;
        orb.mode = OrbMode::Return;
        orb.pos = Vec2::new(300.0, 0.0);
        orb.advance(Vec2::ZERO, false);
        assert_eq!(orb.cooldown_ticks, 4);
    }

    #[test]
    fn test_edge_ignored_while_cooling_down() {
        let mut orb = orb_at_origin();
        orb.cooldown_ticks = 3;
        orb.advance(Vec2::ZERO, true);
        assert_eq!(orb.mode, OrbMode::Orbit);
    }
}
