//! Fixed timestep simulation tick
//!
//! One call advances the whole session by one step: enemy gating, traffic,
//! coins, enemy and projectiles and explosions move first, then the player
//! drives, then collisions and scoring are resolved.

use super::collision::{collect_coin, resolve_projectile_hits, traffic_crash};
use super::state::{EntityRef, GameEvent, GameOverCause, GameState};

/// How far ahead the autopilot looks for traffic
const AUTOPILOT_LOOKAHEAD: f32 = 45.0;
/// Vehicles this far behind the player still block a lane change
const AUTOPILOT_LOOKBEHIND: f32 = 5.0;
/// Lateral distance at which a vehicle counts as sharing a lane
const AUTOPILOT_LANE_WIDTH: f32 = 2.4;
/// Clear road below which the autopilot brakes instead of accelerating
const AUTOPILOT_BRAKE_GAP: f32 = 12.0;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    pub steer_left: bool,
    pub steer_right: bool,
    pub brake: bool,
    pub accelerate: bool,
    /// Demo mode - the car drives itself
    pub autopilot: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput) {
    if state.is_over() {
        return;
    }

    let input = if input.autopilot {
        autopilot(state)
    } else {
        *input
    };

    // The world advances against where the car was at the start of the step
    let player_pos = state.player.position;
    let player_speed = state.player.speed;

    state
        .enemy
        .update_activation(state.score, player_pos.z, &mut state.events);
    state
        .traffic
        .update(player_pos.z, &mut state.rng, &mut state.events);
    state
        .coins
        .update(player_speed, &mut state.rng, &mut state.events);
    state.enemy.update(
        player_pos,
        player_speed,
        &mut state.rng,
        &mut state.explosions,
        &mut state.events,
    );

    for id in state.explosions.update() {
        state.events.push(GameEvent::Hide(EntityRef::Explosion(id)));
    }

    state.player.drive(&input, &state.car, &state.tuning.player);
    state.time_ticks += 1;

    resolve_collisions(state);

    if !state.is_over() {
        let points = state.tuning.player.passive_score;
        state.add_score(points);
    }
}

fn resolve_collisions(state: &mut GameState) {
    collect_coin(state);

    let damage = resolve_projectile_hits(state);
    if damage > 0 {
        let wrecked = state.player.take_damage(damage);
        state.events.push(GameEvent::PlayerHit {
            damage,
            health: state.player.health,
        });
        if wrecked {
            state.finish(GameOverCause::Destroyed);
        }
    }

    if let Some(id) = traffic_crash(state) {
        log::debug!("crashed into traffic slot {}", id.index());
        state.finish(GameOverCause::Crash);
    }
}

/// Pick inputs that keep the car out of traffic.
///
/// Scores each traffic lane by the clear road ahead of it and steers for the
/// best one, preferring lanes closer to the car on ties.
pub fn autopilot(state: &GameState) -> TickInput {
    let player = state.player.position;
    let lanes = state.traffic.lanes();

    let clearance = |lane_x: f32| -> f32 {
        state
            .traffic
            .iter_active()
            .filter(|(_, v)| (v.lane - lane_x).abs() < AUTOPILOT_LANE_WIDTH)
            .map(|(_, v)| v.z - player.z)
            .filter(|dz| (-AUTOPILOT_LOOKBEHIND..=AUTOPILOT_LOOKAHEAD).contains(dz))
            .fold(AUTOPILOT_LOOKAHEAD, f32::min)
    };

    let mut target = player.x;
    let mut best = f32::MIN;
    for &lane in lanes {
        if lane.abs() > state.tuning.player.lateral_limit {
            continue;
        }
        let score = clearance(lane) - (lane - player.x).abs() * 0.1;
        if score > best {
            best = score;
            target = lane;
        }
    }

    let ahead = clearance(player.x);
    let handling = state.car.handling;
    TickInput {
        steer_left: target > player.x + handling * 0.5,
        steer_right: target < player.x - handling * 0.5,
        accelerate: ahead >= AUTOPILOT_BRAKE_GAP,
        brake: ahead < AUTOPILOT_BRAKE_GAP,
        autopilot: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{Cue, GamePhase};
    use crate::sim::traffic::TrafficScheduler;
    use glam::Vec3;
    use proptest::prelude::*;

    fn empty_state(seed: u64) -> GameState {
        let mut state = GameState::new(seed);
        state.traffic = TrafficScheduler::new(&state.tuning.traffic);
        state.drain_events();
        state
    }

    #[test]
    fn test_passive_score() {
        let mut state = empty_state(1);
        tick(&mut state, &TickInput::default());
        assert_eq!(state.score, 1);
        assert_eq!(state.time_ticks, 1);
        assert_eq!(state.player.speed, state.tuning.player.min_speed);
    }

    #[test]
    fn test_crash_is_terminal() {
        let mut state = empty_state(2);
        // Lane 2 sits 1.5 to the side of the centred player
        state.traffic.place_vehicle(2, 2.0, 0.3, &mut Vec::new()).unwrap();
        tick(&mut state, &TickInput::default());

        assert_eq!(state.phase, GamePhase::GameOver);
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::Sound(Cue::Crash)));
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::GameOver {
                cause: GameOverCause::Crash,
                ..
            }
        )));

        let frozen = (state.time_ticks, state.score, state.player.position);
        tick(&mut state, &TickInput::default());
        assert_eq!((state.time_ticks, state.score, state.player.position), frozen);
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_projectile_damage_can_end_the_run() {
        let mut state = empty_state(3);
        state.player.health = 10;
        let muzzle = Vec3::Z * state.tuning.projectile.muzzle_offset;
        state.enemy.position = state.player.position - muzzle;
        let target = state.player.position;
        state.enemy.fire_at(target, 0.0, &mut Vec::new());

        tick(&mut state, &TickInput::default());
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::PlayerHit { damage: 10, health: 0 }));
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::GameOver {
                cause: GameOverCause::Destroyed,
                ..
            }
        )));
        assert_eq!(state.score, 0, "no passive score on the final step");
    }

    #[test]
    fn test_world_moves_before_the_player() {
        let mut state = empty_state(6);
        state.player.speed = 1.0;
        let mut events = Vec::new();
        for _ in 0..state.tuning.coins.spawn_interval {
            state.coins.update(0.0, &mut state.rng, &mut events);
        }
        let start = state.coins.coins()[0].relative_z;
        let accelerate = TickInput {
            accelerate: true,
            ..Default::default()
        };

        tick(&mut state, &accelerate);
        // Coins scrolled by the speed held when the step began
        assert_eq!(state.coins.coins()[0].relative_z, start - 1.0);
        assert!(state.player.speed > 1.0);
        assert_eq!(state.player.position.z, state.player.speed);
    }

    #[test]
    fn test_enemy_joins_at_threshold() {
        let mut state = empty_state(4);
        state.score = 99;
        tick(&mut state, &TickInput::default());
        assert!(!state.enemy.is_active());
        assert_eq!(state.score, 100);

        tick(&mut state, &TickInput::default());
        assert!(state.enemy.is_active());
        let warnings = state
            .drain_events()
            .into_iter()
            .filter(|e| *e == GameEvent::EnemyWarning)
            .count();
        assert_eq!(warnings, 1);
    }

    #[test]
    fn test_determinism() {
        let mut a = GameState::new(99999);
        let mut b = GameState::new(99999);
        let inputs = [
            TickInput {
                autopilot: true,
                ..Default::default()
            },
            TickInput {
                accelerate: true,
                steer_left: true,
                ..Default::default()
            },
            TickInput::default(),
        ];

        for step in 0..900 {
            let input = inputs[(step / 7) % inputs.len()];
            tick(&mut a, &input);
            tick(&mut b, &input);
        }

        assert_eq!(a.time_ticks, b.time_ticks);
        assert_eq!(a.score, b.score);
        assert_eq!(a.player.position, b.player.position);
        assert_eq!(a.player.health, b.player.health);
        assert_eq!(a.drain_events(), b.drain_events());
        let za: Vec<f32> = a.traffic.iter_active().map(|(_, v)| v.z).collect();
        let zb: Vec<f32> = b.traffic.iter_active().map(|(_, v)| v.z).collect();
        assert_eq!(za, zb);
    }

    #[test]
    fn test_autopilot_leaves_blocked_lane() {
        let mut state = empty_state(5);
        state.player.position.x = 1.5;
        state.traffic.place_vehicle(2, 10.0, 0.3, &mut Vec::new()).unwrap();
        let input = autopilot(&state);
        assert!(input.steer_left || input.steer_right);
        assert!(input.brake);
    }

    proptest! {
        #[test]
        fn prop_score_and_health_are_monotonic(
            seed in any::<u64>(),
            inputs in proptest::collection::vec((any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()), 1..600),
        ) {
            let mut state = GameState::new(seed);
            for (left, right, brake, accelerate) in inputs {
                let before = (state.score, state.player.health, state.time_ticks);
                let was_over = state.is_over();
                tick(&mut state, &TickInput { steer_left: left, steer_right: right, brake, accelerate, autopilot: false });
                prop_assert!(state.score >= before.0);
                prop_assert!(state.player.health <= before.1);
                prop_assert!(state.player.position.x.abs() <= state.tuning.player.lateral_limit);
                if was_over {
                    prop_assert_eq!(state.time_ticks, before.2);
                }
            }
        }
    }
}
