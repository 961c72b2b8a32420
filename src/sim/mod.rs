//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (pool slot order, then spawn order)
//! - No rendering, audio or DOM dependencies

pub mod coins;
pub mod collision;
pub mod enemy;
pub mod pool;
pub mod projectile;
pub mod state;
pub mod tick;
pub mod traffic;

pub use coins::{Coin, CoinSpawner};
pub use collision::{Aabb, collect_coin, resolve_projectile_hits, traffic_crash};
pub use enemy::{AerialEnemy, MovementPattern};
pub use pool::{Pool, SlotId};
pub use projectile::{Explosion, Explosions, Particle, Projectile, ProjectileFate, lead_target};
pub use state::{
    Cue, EntityRef, GameEvent, GameOverCause, GamePhase, GameState, HudSnapshot, Player,
    RenderSnapshot,
};
pub use tick::{TickInput, autopilot, tick};
pub use traffic::{TrafficScheduler, TrafficVehicle};
