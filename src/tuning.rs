//! Data-driven game balance
//!
//! Every numeric policy the simulation uses lives here so a session can be
//! re-tuned from JSON without touching code. Defaults reproduce the shipped
//! balance.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected tuning data
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("tuning JSON is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("enemy thresholds must satisfy appear_at < disappear_at (got {appear_at} / {disappear_at})")]
    ThresholdOrder { appear_at: u64, disappear_at: u64 },
    #[error("{0} must not be empty")]
    EmptyLanes(&'static str),
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
    #[error("{0} range is inverted")]
    InvertedRange(&'static str),
    #[error("traffic needs more lanes ({lanes}) than preferred lanes ({preferred})")]
    TooFewLanes { lanes: usize, preferred: usize },
    #[error("{field} must be a probability in [0, 1] (got {value})")]
    Probability { field: &'static str, value: f64 },
    #[error("{field} must not be negative")]
    Negative { field: &'static str },
}

/// Traffic scheduler parameters (distances are along the forward axis)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficTuning {
    /// Lateral lane centres
    pub lanes: Vec<f32>,
    /// Pre-allocated vehicle slots
    pub pool_size: usize,
    /// Vehicles further ahead than this (relative to the player) are recycled
    pub visible_ahead: f32,
    /// Vehicles further behind than this (negative) are recycled
    pub behind_cutoff: f32,
    /// Minimum same-lane gap at spawn time
    pub min_spacing: f32,
    /// Nothing spawns closer than this ahead of the player
    pub safety_distance: f32,
    pub max_per_lane: usize,
    pub sparse_max_per_lane: usize,
    /// How many lanes are dense at a time
    pub preferred_lane_count: usize,
    pub preferred_jitter: f32,
    pub sparse_spacing_factor: f32,
    pub sparse_jitter: f32,
    /// Per-step chance a sparse lane gets a vehicle
    pub sparse_spawn_chance: f64,
    /// Per-step chance the dense/sparse lane split is reshuffled
    pub lane_swap_chance: f64,
    pub base_speed: f32,
    pub speed_factor_min: f32,
    pub speed_factor_max: f32,
    /// Gap between the seeded vehicles of one lane at session start
    pub initial_lane_gap: f32,
    pub initial_jitter: f32,
    pub initial_sparse_offset: f32,
    pub initial_sparse_jitter: f32,
}

impl Default for TrafficTuning {
    fn default() -> Self {
        Self {
            lanes: vec![-4.5, -1.5, 1.5, 4.5],
            pool_size: 24,
            visible_ahead: 80.0,
            behind_cutoff: -20.0,
            min_spacing: 20.0,
            safety_distance: 40.0,
            max_per_lane: 2,
            sparse_max_per_lane: 1,
            preferred_lane_count: 2,
            preferred_jitter: 15.0,
            sparse_spacing_factor: 1.5,
            sparse_jitter: 20.0,
            sparse_spawn_chance: 0.3,
            lane_swap_chance: 0.005,
            base_speed: 0.3,
            speed_factor_min: 0.7,
            speed_factor_max: 1.2,
            initial_lane_gap: 35.0,
            initial_jitter: 15.0,
            initial_sparse_offset: 45.0,
            initial_sparse_jitter: 20.0,
        }
    }
}

/// Coin spawner parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinTuning {
    pub lanes: Vec<f32>,
    /// Steps between spawn attempts
    pub spawn_interval: u32,
    pub max_coins: usize,
    pub spawn_ahead: f32,
    pub spawn_jitter: f32,
    pub height: f32,
    /// Relative forward position behind which coins are dropped
    pub rear_cutoff: f32,
    pub value: u64,
    /// Radians per step
    pub spin_speed: f32,
    pub popup_rise: f32,
    pub popup_fade: f32,
}

impl Default for CoinTuning {
    fn default() -> Self {
        Self {
            lanes: vec![-6.0, -2.0, 2.0, 6.0],
            spawn_interval: 120,
            max_coins: 5,
            spawn_ahead: 40.0,
            spawn_jitter: 40.0,
            height: 1.0,
            rear_cutoff: -40.0,
            value: 10,
            spin_speed: 0.03,
            popup_rise: 0.2,
            popup_fade: 0.04,
        }
    }
}

/// Aerial enemy parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTuning {
    /// Enemy is active for scores in `[appear_at, disappear_at)`
    pub appear_at: u64,
    pub disappear_at: u64,
    /// Starting (lateral, vertical) position
    pub home: Vec2,
    /// Forward distance kept ahead of the player
    pub z_offset: f32,
    pub lateral_min: f32,
    pub lateral_max: f32,
    pub vertical_min: f32,
    pub vertical_max: f32,
    /// Patrol speed per step (lateral, vertical)
    pub patrol_speed: Vec2,
    pub hover_center: Vec2,
    pub hover_radius: f32,
    /// Radians per step
    pub hover_speed: f32,
    /// Vertical squash of the hover ellipse
    pub hover_squash: f32,
    /// Fraction of the lateral gap closed per step while chasing
    pub chase_follow: f32,
    pub chase_deadzone: f32,
    pub chase_bob: f32,
    /// Steps between movement pattern changes
    pub pattern_interval: u32,
    pub fire_interval: u32,
    pub chase_fire_interval: u32,
    pub warning_duration: u32,
    pub warning_fade: u32,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            appear_at: 100,
            disappear_at: 2500,
            home: Vec2::new(0.0, 15.0),
            z_offset: 20.0,
            lateral_min: -12.0,
            lateral_max: 12.0,
            vertical_min: 10.0,
            vertical_max: 20.0,
            patrol_speed: Vec2::new(0.15, 0.05),
            hover_center: Vec2::new(0.0, 15.0),
            hover_radius: 5.0,
            hover_speed: 0.02,
            hover_squash: 0.5,
            chase_follow: 0.02,
            chase_deadzone: 0.1,
            chase_bob: 0.05,
            pattern_interval: 300,
            fire_interval: 60,
            chase_fire_interval: 40,
            warning_duration: 120,
            warning_fade: 15,
        }
    }
}

/// Projectile and explosion parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileTuning {
    /// Launch point offset ahead of the enemy
    pub muzzle_offset: f32,
    /// Aim height above the road
    pub aim_height: f32,
    /// How far ahead of the player to aim
    pub lead_distance: f32,
    /// Maximum lateral aim error (both sides)
    pub aim_jitter: f32,
    pub speed: f32,
    /// Steps before a projectile expires
    pub max_lifetime: u32,
    /// Stored on every projectile, never read by the flight model
    pub tracking_factor: f32,
    /// Half size of the projectile bounding box
    pub half_extent: f32,
    pub explosion_particles: usize,
    pub explosion_lifetime: u32,
    pub particle_speed_min: f32,
    pub particle_speed_max: f32,
    pub particle_gravity: f32,
    /// Fraction of the explosion lifetime after which particles fade
    pub fade_start: f32,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            muzzle_offset: 2.0,
            aim_height: 0.5,
            lead_distance: 5.0,
            aim_jitter: 1.0,
            speed: 1.5,
            max_lifetime: 100,
            tracking_factor: 0.03,
            half_extent: 1.2,
            explosion_particles: 15,
            explosion_lifetime: 30,
            particle_speed_min: 0.2,
            particle_speed_max: 0.5,
            particle_gravity: 0.01,
            fade_start: 0.6,
        }
    }
}

/// Bounding volumes and hit rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionTuning {
    pub player_half_extents: Vec3,
    pub traffic_half_extents: Vec3,
    pub coin_half_extents: Vec3,
    /// Extra margin added around projectiles when testing against the player
    pub hit_margin: f32,
    /// Centre distance that counts as a projectile hit regardless of boxes
    pub proximity: f32,
    pub projectile_damage: i32,
}

impl Default for CollisionTuning {
    fn default() -> Self {
        Self {
            player_half_extents: Vec3::new(1.25, 0.85, 2.1),
            traffic_half_extents: Vec3::new(1.05, 0.85, 2.05),
            coin_half_extents: Vec3::new(1.2, 1.2, 0.2),
            hit_margin: 0.5,
            proximity: 2.5,
            projectile_damage: 10,
        }
    }
}

/// Player car limits not covered by the selected car profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub max_health: i32,
    pub min_speed: f32,
    /// Speed the car drops to while braking
    pub brake_speed: f32,
    pub deceleration: f32,
    pub lateral_limit: f32,
    pub hit_flash_steps: u32,
    /// Points awarded every step while playing
    pub passive_score: u64,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            max_health: crate::consts::PLAYER_MAX_HEALTH,
            min_speed: 0.5,
            brake_speed: 0.1,
            deceleration: 0.03,
            lateral_limit: crate::consts::ROAD_HALF_WIDTH,
            hit_flash_steps: 20,
            passive_score: 1,
        }
    }
}

/// Complete balance sheet for a session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub traffic: TrafficTuning,
    pub coins: CoinTuning,
    pub enemy: EnemyTuning,
    pub projectile: ProjectileTuning,
    pub collision: CollisionTuning,
    pub player: PlayerTuning,
}

impl Tuning {
    /// Parse and validate tuning from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the cross-field constraints the simulation relies on
    pub fn validate(&self) -> Result<(), TuningError> {
        let t = &self.traffic;
        if t.lanes.is_empty() {
            return Err(TuningError::EmptyLanes("traffic.lanes"));
        }
        if t.lanes.len() <= t.preferred_lane_count {
            return Err(TuningError::TooFewLanes {
                lanes: t.lanes.len(),
                preferred: t.preferred_lane_count,
            });
        }
        positive_usize("traffic.pool_size", t.pool_size)?;
        positive_usize("traffic.max_per_lane", t.max_per_lane)?;
        positive_f32("traffic.min_spacing", t.min_spacing)?;
        if t.behind_cutoff >= t.visible_ahead {
            return Err(TuningError::InvertedRange("traffic visibility window"));
        }
        if t.speed_factor_min > t.speed_factor_max {
            return Err(TuningError::InvertedRange("traffic.speed_factor"));
        }
        probability("traffic.sparse_spawn_chance", t.sparse_spawn_chance)?;
        probability("traffic.lane_swap_chance", t.lane_swap_chance)?;

        let c = &self.coins;
        if c.lanes.is_empty() {
            return Err(TuningError::EmptyLanes("coins.lanes"));
        }
        positive_u32("coins.spawn_interval", c.spawn_interval)?;

        let e = &self.enemy;
        if e.appear_at >= e.disappear_at {
            return Err(TuningError::ThresholdOrder {
                appear_at: e.appear_at,
                disappear_at: e.disappear_at,
            });
        }
        if e.lateral_min > e.lateral_max {
            return Err(TuningError::InvertedRange("enemy lateral bounds"));
        }
        if e.vertical_min > e.vertical_max {
            return Err(TuningError::InvertedRange("enemy vertical bounds"));
        }
        positive_u32("enemy.pattern_interval", e.pattern_interval)?;
        positive_u32("enemy.fire_interval", e.fire_interval)?;
        positive_u32("enemy.chase_fire_interval", e.chase_fire_interval)?;

        let p = &self.projectile;
        positive_f32("projectile.speed", p.speed)?;
        positive_u32("projectile.max_lifetime", p.max_lifetime)?;
        positive_u32("projectile.explosion_lifetime", p.explosion_lifetime)?;
        if p.aim_jitter < 0.0 {
            return Err(TuningError::Negative {
                field: "projectile.aim_jitter",
            });
        }
        if p.particle_speed_min > p.particle_speed_max {
            return Err(TuningError::InvertedRange("projectile.particle_speed"));
        }

        positive_i32("player.max_health", self.player.max_health)?;
        Ok(())
    }
}

fn positive_usize(field: &'static str, value: usize) -> Result<(), TuningError> {
    if value == 0 {
        return Err(TuningError::NotPositive { field });
    }
    Ok(())
}

fn positive_u32(field: &'static str, value: u32) -> Result<(), TuningError> {
    positive_usize(field, value as usize)
}

fn positive_i32(field: &'static str, value: i32) -> Result<(), TuningError> {
    if value <= 0 {
        return Err(TuningError::NotPositive { field });
    }
    Ok(())
}

fn probability(field: &'static str, value: f64) -> Result<(), TuningError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(TuningError::Probability { field, value });
    }
    Ok(())
}

fn positive_f32(field: &'static str, value: f32) -> Result<(), TuningError> {
    if value <= 0.0 {
        return Err(TuningError::NotPositive { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        Tuning::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "enemy": { "appear_at": 300, "disappear_at": 1600 } }"#)
            .unwrap();
        assert_eq!(tuning.enemy.appear_at, 300);
        assert_eq!(tuning.enemy.disappear_at, 1600);
        assert_eq!(tuning.enemy.fire_interval, 60);
        assert_eq!(tuning.traffic.pool_size, 24);
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let err = Tuning::from_json(r#"{ "enemy": { "appear_at": 500, "disappear_at": 500 } }"#)
            .unwrap_err();
        assert!(matches!(err, TuningError::ThresholdOrder { .. }));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = Tuning::from_json("{ not json").unwrap_err();
        assert!(matches!(err, TuningError::Parse(_)));
    }

    #[test]
    fn test_rejects_empty_pool() {
        let mut tuning = Tuning::default();
        tuning.traffic.pool_size = 0;
        assert!(matches!(
            tuning.validate(),
            Err(TuningError::NotPositive { field: "traffic.pool_size" })
        ));
    }

    #[test]
    fn test_rejects_bad_probability() {
        let err = Tuning::from_json(r#"{ "traffic": { "lane_swap_chance": 1.5 } }"#).unwrap_err();
        assert!(matches!(err, TuningError::Probability { .. }));
    }

    #[test]
    fn test_round_trip_through_json() {
        let json = Tuning::default().to_json().unwrap();
        let back = Tuning::from_json(&json).unwrap();
        assert_eq!(back.traffic.lanes, vec![-4.5, -1.5, 1.5, 4.5]);
        assert_eq!(back.collision.projectile_damage, 10);
    }
}
