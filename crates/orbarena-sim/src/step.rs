//! The per-tick state transition.

use std::collections::{BTreeMap, HashMap};

use crate::tuning::{
    ACCEL_PER_TICK, ARENA_SIZE, DEADZONE, KILL_REWARD, KILL_STEAL_FRACTION,
    MAX_SPEED, MAX_SPRINT_SPEED, ORB_HIT_RADIUS, PASSIVE_SCORE_PER_TICK,
    PLAYER_DAMPING_DIV, PLAYER_RADIUS, SPRINT_MULT, STAMINA_DRAIN_PER_TICK,
    STAMINA_MAX, STAMINA_REGEN_PER_TICK,
};
use crate::{EliminatedEntry, Input, OrbMode, Player, PlayerId, State, Vec2};

/// Advances `state` by exactly one tick.
///
/// Players without an entry in `inputs` get the neutral input. Inputs for
/// unknown players, players without an orb and orbs without a player are
/// skipped.
pub fn step(state: &mut State, inputs: &HashMap<PlayerId, Input>) {
    state.tick += 1;

    for player in state.players.values_mut() {
        let input = inputs.get(&player.id).copied().unwrap_or_default();
        move_player(player, &input);
    }

    resolve_hits(state);

    let shooting = |id: &PlayerId| inputs.get(id).is_some_and(|i| i.shoot);
    for (owner_id, orb) in state.orbs.iter_mut() {
        let Some(owner) = state.players.get(owner_id) else {
            continue;
        };
        let edge = shooting(owner_id) && !owner.prev_shoot;
        orb.advance(owner.pos, edge);
    }
    for (id, player) in state.players.iter_mut() {
        player.prev_shoot = shooting(id);
    }
}

fn move_player(player: &mut Player, input: &Input) {
    let (dir, magnitude) = Vec2::new(input.ax, input.ay).normalize_with_length();
    let moving = magnitude > DEADZONE;
    let sprinting = moving && input.boost && player.stamina > 0.0;

    if moving {
        let accel = if sprinting {
            ACCEL_PER_TICK * SPRINT_MULT
        } else {
            ACCEL_PER_TICK
        };
        player.vel += dir * accel;
    }

    player.stamina = if sprinting {
        (player.stamina - STAMINA_DRAIN_PER_TICK).max(0.0)
    } else {
        (player.stamina + STAMINA_REGEN_PER_TICK).min(STAMINA_MAX)
    };

    let cap = if sprinting { MAX_SPRINT_SPEED } else { MAX_SPEED };
    player.vel = (player.vel / PLAYER_DAMPING_DIV).clamp_length(cap);
    player.pos += player.vel;

    let (lo, hi) = (PLAYER_RADIUS, ARENA_SIZE - PLAYER_RADIUS);
    if player.pos.x < lo || player.pos.x > hi {
        player.pos.x = player.pos.x.clamp(lo, hi);
        player.vel.x = 0.0;
    }
    if player.pos.y < lo || player.pos.y > hi {
        player.pos.y = player.pos.y.clamp(lo, hi);
        player.vel.y = 0.0;
    }

    player.score += PASSIVE_SCORE_PER_TICK;
}

/// Collects every Shot-orb hit, then applies them.
///
/// No score or entity changes until all hits are known, so every kill is
/// priced at the victim's pre-kill score. A victim hit by several orbs is
/// credited to the lowest-id killer.
fn resolve_hits(state: &mut State) {
    let hit_dist = PLAYER_RADIUS + ORB_HIT_RADIUS;

    // victim → killer
    let mut kills: BTreeMap<PlayerId, PlayerId> = BTreeMap::new();
    for orb in state.orbs.values().filter(|o| o.mode == OrbMode::Shot) {
        if !state.players.contains_key(&orb.owner) {
            continue;
        }
        for victim in state.players.values() {
            if victim.id != orb.owner && orb.pos.distance_to(victim.pos) < hit_dist {
                kills.entry(victim.id).or_insert(orb.owner);
            }
        }
    }
    if kills.is_empty() {
        return;
    }

    let mut credits: BTreeMap<PlayerId, f64> = BTreeMap::new();
    for (victim_id, killer_id) in &kills {
        let Some(victim) = state.players.get(victim_id) else {
            continue;
        };
        state.eliminated.push(EliminatedEntry {
            id: victim.id,
            name: victim.name.clone(),
            score: victim.score,
        });
        *credits.entry(*killer_id).or_default() +=
            KILL_REWARD + KILL_STEAL_FRACTION * victim.score;
    }

    for victim_id in kills.keys() {
        state.remove_player(*victim_id);
    }
    for (killer_id, credit) in credits {
        if let Some(killer) = state.players.get_mut(&killer_id) {
            killer.score += credit;
        }
    }
}
