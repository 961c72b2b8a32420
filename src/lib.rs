//! Highway Havoc - an endless-highway arcade driver
//!
//! Core modules:
//! - `sim`: Deterministic simulation (traffic, coins, air raid, collisions)
//! - `tuning`: Data-driven game balance
//! - `settings`: Player preferences and car profiles
//! - `platform`: Scene/audio/HUD collaborator seams
//! - `audio`: Web Audio cue synthesis (browser only)

#[cfg(target_arch = "wasm32")]
pub mod audio;
pub mod platform;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use settings::{CarProfile, Settings};
pub use tuning::{Tuning, TuningError};

use glam::Vec3;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep, one step per 60 Hz frame
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 4;

    /// Player health at session start
    pub const PLAYER_MAX_HEALTH: i32 = 1000;
    /// Lateral limit of the drivable road (both sides)
    pub const ROAD_HALF_WIDTH: f32 = 6.0;
    /// Resting height of car bodies above the road
    pub const CAR_RIDE_HEIGHT: f32 = 0.5;

    /// HUD speed readout multiplier (sim units per step -> km/h-ish)
    pub const SPEED_DISPLAY_SCALE: f32 = 100.0;
}

/// Uniform random direction on the unit sphere from an azimuth and an elevation
#[inline]
pub fn sphere_direction(azimuth: f32, elevation: f32) -> Vec3 {
    Vec3::new(
        azimuth.sin() * elevation.sin(),
        elevation.cos(),
        azimuth.cos() * elevation.sin(),
    )
}

/// Move `value` a fraction of the way toward `target`
#[inline]
pub fn approach(value: f32, target: f32, fraction: f32) -> f32 {
    value + (target - value) * fraction
}
