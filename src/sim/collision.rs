//! Collision detection and scoring
//!
//! Coarse axis-aligned box tests between the player and everything it can
//! touch. Coins score, projectiles damage, traffic is fatal.

use glam::Vec3;

use super::pool::SlotId;
use super::state::{Cue, EntityRef, GameEvent, GameState};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Overlap test (touching faces count)
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// Grow outward by `margin` on every side
    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

/// The player's box this step
pub fn player_box(state: &GameState) -> Aabb {
    Aabb::from_center(state.player.position, state.tuning.collision.player_half_extents)
}

/// Collect the first uncollected coin touching the player.
///
/// Coins are checked newest first and at most one is taken per step. Returns
/// the id of the collected coin.
pub fn collect_coin(state: &mut GameState) -> Option<u32> {
    let player = player_box(state);
    let player_z = state.player.position.z;
    let half = state.tuning.collision.coin_half_extents;

    let coin = state
        .coins
        .coins_mut()
        .iter_mut()
        .rev()
        .filter(|c| !c.collected)
        .find(|c| Aabb::from_center(c.world_position(player_z), half).intersects(&player))?;
    if !coin.collect() {
        return None;
    }
    let id = coin.id;

    let points = state.coins.value();
    state.add_score(points);
    state.events.push(GameEvent::Sound(Cue::CoinCollect));
    state.events.push(GameEvent::CoinCollected { points });
    Some(id)
}

/// Resolve at most one projectile hit on the player.
///
/// A projectile hits when its box, grown by the hit margin, overlaps the
/// player box or when the two centres are within the proximity radius. The
/// most recently fired match is consumed and explodes. Returns the damage to
/// apply.
pub fn resolve_projectile_hits(state: &mut GameState) -> i32 {
    let player = player_box(state);
    let center = state.player.position;
    let rules = &state.tuning.collision;
    let half = Vec3::splat(state.tuning.projectile.half_extent);

    let hit = state.enemy.projectiles().iter().rev().find(|p| {
        let bounds = Aabb::from_center(p.position, half).expanded(rules.hit_margin);
        bounds.intersects(&player) || p.position.distance(center) < rules.proximity
    });
    let Some(id) = hit.map(|p| p.id) else {
        return 0;
    };
    let damage = rules.projectile_damage;

    let Some(projectile) = state.enemy.remove_projectile(id) else {
        return 0;
    };
    let burst = state.explosions.spawn(projectile.position, &mut state.rng);
    state.events.push(GameEvent::Hide(EntityRef::Projectile(id)));
    state.events.push(GameEvent::Show(EntityRef::Explosion(burst)));
    state.events.push(GameEvent::Sound(Cue::ProjectileHit));
    log::debug!("projectile {id} hit the player for {damage}");
    damage
}

/// First traffic vehicle overlapping the player, if any
pub fn traffic_crash(state: &GameState) -> Option<SlotId> {
    let player = player_box(state);
    let half = state.tuning.collision.traffic_half_extents;
    state
        .traffic
        .iter_active()
        .find(|(_, v)| Aabb::from_center(v.position(), half).intersects(&player))
        .map(|(id, _)| id)
}
