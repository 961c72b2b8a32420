//! Game state and core simulation types
//!
//! Everything one session owns lives in [`GameState`]; the platform layer only
//! ever reads snapshots and drains events from it.

use glam::Vec3;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::coins::CoinSpawner;
use super::enemy::{AerialEnemy, MovementPattern};
use super::pool::SlotId;
use super::projectile::Explosions;
use super::tick::TickInput;
use super::traffic::TrafficScheduler;
use crate::consts::*;
use crate::settings::CarProfile;
use crate::tuning::{PlayerTuning, Tuning};

/// Current phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Run ended; no further steps are simulated
    GameOver,
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverCause {
    /// Hit a traffic vehicle
    Crash,
    /// Health ran out under projectile fire
    Destroyed,
}

/// Entities the external scene mirrors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Player,
    Traffic(SlotId),
    Coin(u32),
    Enemy,
    Projectile(u32),
    Explosion(u32),
}

/// Named audio cues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cue {
    ProjectileFire,
    ProjectileHit,
    CoinCollect,
    Crash,
}

impl Cue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cue::ProjectileFire => "projectileFire",
            Cue::ProjectileHit => "projectileHit",
            Cue::CoinCollect => "coinCollect",
            Cue::Crash => "crash",
        }
    }
}

/// Side effects produced by a simulation step, in the order they happened
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Entity became active / was created
    Show(EntityRef),
    /// Entity became inactive / was destroyed
    Hide(EntityRef),
    Sound(Cue),
    /// The aerial enemy arrived for the first time this session
    EnemyWarning,
    CoinCollected { points: u64 },
    PlayerHit { damage: i32, health: i32 },
    GameOver { score: u64, cause: GameOverCause },
}

/// The player's car
#[derive(Debug, Clone)]
pub struct Player {
    /// (lateral, vertical, forward)
    pub position: Vec3,
    /// Forward distance per step
    pub speed: f32,
    pub health: i32,
    pub max_health: i32,
    /// Steps left on the damage flash
    pub hit_timer: u32,
    hit_flash_steps: u32,
}

impl Player {
    pub fn new(tuning: &PlayerTuning) -> Self {
        Self {
            position: Vec3::new(0.0, CAR_RIDE_HEIGHT, 0.0),
            speed: 0.0,
            health: tuning.max_health,
            max_health: tuning.max_health,
            hit_timer: 0,
            hit_flash_steps: tuning.hit_flash_steps,
        }
    }

    /// Subtract `amount` from health. Returns true when the car is wrecked.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        self.health -= amount;
        self.hit_timer = self.hit_flash_steps;
        self.health <= 0
    }

    pub fn is_hit(&self) -> bool {
        self.hit_timer > 0
    }

    /// Apply one step of driver input.
    ///
    /// The lateral axis points to the driver's left, so steering left grows x.
    pub fn drive(&mut self, input: &TickInput, car: &CarProfile, tuning: &PlayerTuning) {
        if input.accelerate {
            self.speed = (self.speed + car.acceleration).min(car.top_speed);
        } else if input.brake {
            self.speed = tuning.brake_speed;
        } else {
            self.speed = (self.speed - tuning.deceleration).max(tuning.min_speed);
        }

        self.position.z += self.speed;

        if input.steer_left {
            self.position.x = (self.position.x + car.handling).min(tuning.lateral_limit);
        }
        if input.steer_right {
            self.position.x = (self.position.x - car.handling).max(-tuning.lateral_limit);
        }

        if self.hit_timer > 0 {
            self.hit_timer -= 1;
        }
    }

    /// Health as 0-100 for the HUD
    pub fn health_percent(&self) -> f32 {
        (self.health.max(0) as f32 / self.max_health as f32 * 100.0).clamp(0.0, 100.0)
    }
}

/// What the HUD shows after each step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HudSnapshot {
    pub score: u64,
    pub health_percent: f32,
    pub speed_display: u32,
}

/// Per-frame view of everything visible, handed to the external scene
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderSnapshot {
    pub player: [f32; 3],
    pub player_hit: bool,
    pub traffic: Vec<TrafficView>,
    pub coins: Vec<CoinView>,
    pub enemy: Option<EnemyView>,
    pub projectiles: Vec<[f32; 3]>,
    pub explosions: Vec<ExplosionView>,
    pub warning_opacity: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrafficView {
    pub slot: usize,
    pub position: [f32; 3],
}

#[derive(Debug, Clone, Serialize)]
pub struct CoinView {
    pub id: u32,
    pub position: [f32; 3],
    pub spin: f32,
    pub collected: bool,
    pub popup_opacity: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnemyView {
    pub position: [f32; 3],
    pub pattern: MovementPattern,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExplosionView {
    pub id: u32,
    pub particles: Vec<[f32; 3]>,
    pub opacity: f32,
}

/// Complete session state (deterministic for a given seed and input stream)
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub tuning: Tuning,
    pub car: CarProfile,
    pub phase: GamePhase,
    /// Score (never decreases)
    pub score: u64,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub player: Player,
    pub traffic: TrafficScheduler,
    pub coins: CoinSpawner,
    pub enemy: AerialEnemy,
    pub explosions: Explosions,
    /// Events produced since the last drain
    pub events: Vec<GameEvent>,
}

impl GameState {
    /// Create a new session with default tuning and the stock car
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, Tuning::default(), CarProfile::default())
    }

    pub fn with_config(seed: u64, tuning: Tuning, car: CarProfile) -> Self {
        let mut state = Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            player: Player::new(&tuning.player),
            traffic: TrafficScheduler::new(&tuning.traffic),
            coins: CoinSpawner::new(&tuning.coins),
            enemy: AerialEnemy::new(&tuning.enemy, &tuning.projectile),
            explosions: Explosions::new(&tuning.projectile),
            tuning,
            car,
            phase: GamePhase::Playing,
            score: 0,
            time_ticks: 0,
            events: Vec::new(),
        };

        state.events.push(GameEvent::Show(EntityRef::Player));
        let player_z = state.player.position.z;
        state
            .traffic
            .seed_initial_traffic(player_z, &mut state.rng, &mut state.events);

        state
    }

    /// Award points; score only ever grows
    pub fn add_score(&mut self, points: u64) {
        self.score = self.score.saturating_add(points);
    }

    pub fn is_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    /// End the run. Only the first call has any effect.
    pub fn finish(&mut self, cause: GameOverCause) {
        if self.is_over() {
            return;
        }
        self.phase = GamePhase::GameOver;
        self.events.push(GameEvent::Sound(Cue::Crash));
        self.events.push(GameEvent::GameOver {
            score: self.score,
            cause,
        });
        log::info!("Game over ({:?}) with score {}", cause, self.score);
    }

    /// Take all events produced since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn hud(&self) -> HudSnapshot {
        HudSnapshot {
            score: self.score,
            health_percent: self.player.health_percent(),
            speed_display: (self.player.speed * SPEED_DISPLAY_SCALE).round() as u32,
        }
    }

    pub fn render_snapshot(&self) -> RenderSnapshot {
        let player_z = self.player.position.z;
        RenderSnapshot {
            player: self.player.position.to_array(),
            player_hit: self.player.is_hit(),
            traffic: self
                .traffic
                .iter_active()
                .map(|(id, v)| TrafficView {
                    slot: id.index(),
                    position: v.position().to_array(),
                })
                .collect(),
            coins: self
                .coins
                .coins()
                .iter()
                .map(|c| CoinView {
                    id: c.id,
                    position: c.display_position(player_z).to_array(),
                    spin: c.spin,
                    collected: c.collected,
                    popup_opacity: c.popup_opacity(),
                })
                .collect(),
            enemy: self.enemy.is_active().then(|| EnemyView {
                position: self.enemy.position.to_array(),
                pattern: self.enemy.pattern(),
            }),
            projectiles: self
                .enemy
                .projectiles()
                .iter()
                .map(|p| p.position.to_array())
                .collect(),
            explosions: self
                .explosions
                .iter()
                .map(|e| ExplosionView {
                    id: e.id,
                    particles: e.particles.iter().map(|p| p.position.to_array()).collect(),
                    opacity: e.opacity(),
                })
                .collect(),
            warning_opacity: self.enemy.warning_opacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn player_with_health(health: i32) -> Player {
        let mut player = Player::new(&PlayerTuning::default());
        player.health = health;
        player
    }

    #[test]
    fn test_three_hits_wreck_a_30_health_car() {
        let mut player = player_with_health(30);
        assert!(!player.take_damage(10));
        assert_eq!(player.health, 20);
        assert!(!player.take_damage(10));
        assert_eq!(player.health, 10);
        assert!(player.take_damage(10));
        assert!(player.health <= 0);
    }

    #[test]
    fn test_damage_starts_hit_flash() {
        let mut player = player_with_health(100);
        player.take_damage(1);
        assert!(player.is_hit());
        let tuning = PlayerTuning::default();
        for _ in 0..tuning.hit_flash_steps {
            player.drive(&TickInput::default(), &CarProfile::default(), &tuning);
        }
        assert!(!player.is_hit());
    }

    #[test]
    fn test_drive_speed_envelope() {
        let tuning = PlayerTuning::default();
        let car = CarProfile::default();
        let mut player = Player::new(&tuning);

        // Coasting settles at the minimum speed
        player.drive(&TickInput::default(), &car, &tuning);
        assert_eq!(player.speed, tuning.min_speed);

        let accelerate = TickInput {
            accelerate: true,
            ..Default::default()
        };
        for _ in 0..100 {
            player.drive(&accelerate, &car, &tuning);
        }
        assert_eq!(player.speed, car.top_speed);

        let brake = TickInput {
            brake: true,
            ..Default::default()
        };
        player.drive(&brake, &car, &tuning);
        assert_eq!(player.speed, tuning.brake_speed);
    }

    #[test]
    fn test_steering_is_clamped_to_road() {
        let tuning = PlayerTuning::default();
        let car = CarProfile::default();
        let mut player = Player::new(&tuning);
        let left = TickInput {
            steer_left: true,
            ..Default::default()
        };
        for _ in 0..100 {
            player.drive(&left, &car, &tuning);
        }
        assert_eq!(player.position.x, tuning.lateral_limit);

        let right = TickInput {
            steer_right: true,
            ..Default::default()
        };
        for _ in 0..200 {
            player.drive(&right, &car, &tuning);
        }
        assert_eq!(player.position.x, -tuning.lateral_limit);
    }

    #[test]
    fn test_hud_snapshot() {
        let mut state = GameState::new(1);
        state.player.health = 250;
        state.player.speed = 1.234;
        state.score = 77;
        let hud = state.hud();
        assert_eq!(hud.score, 77);
        assert!((hud.health_percent - 25.0).abs() < 1e-4);
        assert_eq!(hud.speed_display, 123);
    }

    #[test]
    fn test_new_session_shows_player_and_opening_traffic() {
        let mut state = GameState::new(5);
        let events = state.drain_events();
        assert_eq!(events[0], GameEvent::Show(EntityRef::Player));
        let shown = events
            .iter()
            .filter(|e| matches!(e, GameEvent::Show(EntityRef::Traffic(_))))
            .count();
        assert_eq!(shown, state.traffic.active_count());
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_finish_only_once() {
        let mut state = GameState::new(5);
        state.drain_events();
        state.finish(GameOverCause::Crash);
        state.finish(GameOverCause::Destroyed);
        let overs = state
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::GameOver { .. }))
            .count();
        assert_eq!(overs, 1);
        assert!(state.is_over());
    }

    proptest! {
        #[test]
        fn prop_take_damage_is_exact(start in 1i32..2000, hits in proptest::collection::vec(0i32..50, 1..40)) {
            let mut player = player_with_health(start);
            for d in hits {
                let before = player.health;
                let dead = player.take_damage(d);
                prop_assert_eq!(player.health, before - d);
                prop_assert_eq!(dead, player.health <= 0);
            }
        }
    }
}
