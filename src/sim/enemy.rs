//! The aerial enemy
//!
//! A single flyer that shows up once the score enters its window, cycles
//! through movement patterns and fires led shots at the player. It owns its
//! projectiles; ground impacts hand off to the shared explosion list.

use glam::{Vec2, Vec3};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use super::projectile::{Explosions, Projectile, ProjectileFate, lead_target};
use super::state::{Cue, EntityRef, GameEvent};
use crate::approach;
use crate::consts::SIM_DT;
use crate::tuning::{EnemyTuning, ProjectileTuning};

/// Movement behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementPattern {
    /// Bounce between the lateral and vertical bounds
    Patrol,
    /// Trace an ellipse around a fixed point
    Hover,
    /// Drift toward the player's lane and fire faster
    Chase,
}

impl MovementPattern {
    /// The two patterns a switch can pick from
    pub fn others(self) -> [MovementPattern; 2] {
        match self {
            MovementPattern::Patrol => [MovementPattern::Hover, MovementPattern::Chase],
            MovementPattern::Hover => [MovementPattern::Patrol, MovementPattern::Chase],
            MovementPattern::Chase => [MovementPattern::Patrol, MovementPattern::Hover],
        }
    }
}

#[derive(Debug, Clone)]
pub struct AerialEnemy {
    tuning: EnemyTuning,
    projectile_tuning: ProjectileTuning,
    pub position: Vec3,
    active: bool,
    pattern: MovementPattern,
    pattern_timer: u32,
    /// Patrol direction signs (lateral, vertical)
    heading: Vec2,
    hover_angle: f32,
    fire_counter: u32,
    fire_threshold: u32,
    projectiles: Vec<Projectile>,
    next_projectile_id: u32,
    warning_shown: bool,
    warning_timer: u32,
    /// Steps simulated while active; drives the chase bob
    clock_ticks: u64,
}

impl AerialEnemy {
    pub fn new(tuning: &EnemyTuning, projectile_tuning: &ProjectileTuning) -> Self {
        Self {
            tuning: tuning.clone(),
            projectile_tuning: projectile_tuning.clone(),
            position: Vec3::new(tuning.home.x, tuning.home.y, tuning.z_offset),
            active: false,
            pattern: MovementPattern::Patrol,
            pattern_timer: 0,
            heading: Vec2::ONE,
            hover_angle: 0.0,
            fire_counter: 0,
            fire_threshold: tuning.fire_interval,
            projectiles: Vec::new(),
            next_projectile_id: 0,
            warning_shown: false,
            warning_timer: 0,
            clock_ticks: 0,
        }
    }

    pub fn should_be_active(&self, score: u64) -> bool {
        (self.tuning.appear_at..self.tuning.disappear_at).contains(&score)
    }

    /// Show or hide the enemy for the current score
    pub fn update_activation(&mut self, score: u64, player_z: f32, events: &mut Vec<GameEvent>) {
        let wanted = self.should_be_active(score);
        if wanted == self.active {
            return;
        }

        if wanted {
            // Pattern timer, fire counter and x/y carry over from the last engagement
            self.active = true;
            self.position.z = player_z + self.tuning.z_offset;
            events.push(GameEvent::Show(EntityRef::Enemy));
            log::info!("Aerial enemy engaged at score {score}");

            if !self.warning_shown {
                self.warning_shown = true;
                self.warning_timer = self.tuning.warning_duration;
                events.push(GameEvent::EnemyWarning);
                events.push(GameEvent::Sound(Cue::ProjectileFire));
            }
        } else {
            self.active = false;
            self.clear_projectiles(events);
            events.push(GameEvent::Hide(EntityRef::Enemy));
            log::info!("Aerial enemy withdrew at score {score}");
        }
    }

    /// Advance one step against the player's current position and speed
    pub fn update(
        &mut self,
        player: Vec3,
        player_speed: f32,
        rng: &mut impl Rng,
        explosions: &mut Explosions,
        events: &mut Vec<GameEvent>,
    ) {
        self.warning_timer = self.warning_timer.saturating_sub(1);
        if !self.active {
            return;
        }
        self.clock_ticks += 1;

        self.pattern_timer += 1;
        if self.pattern_timer >= self.tuning.pattern_interval {
            self.pattern_timer = 0;
            let options = self.pattern.others();
            if let Some(&next) = options.choose(rng) {
                self.enter_pattern(next);
            }
        }

        match self.pattern {
            MovementPattern::Patrol => self.patrol(),
            MovementPattern::Hover => self.hover(),
            MovementPattern::Chase => self.chase(player.x),
        }
        self.position.z = player.z + self.tuning.z_offset;

        self.fire_counter += 1;
        if self.fire_counter >= self.fire_threshold {
            self.fire_counter = 0;
            let jitter = self.projectile_tuning.aim_jitter;
            let error = rng.random_range(-jitter..=jitter);
            self.fire_at(player, error, events);
            self.fire_threshold = self.reload_for(self.pattern);
        }

        self.update_projectiles(player_speed, rng, explosions, events);
    }

    /// Switch pattern, running its entry action.
    ///
    /// The shot already being counted down keeps its delay; the new pattern's
    /// fire rate applies from the next reload.
    pub fn enter_pattern(&mut self, pattern: MovementPattern) {
        if pattern == MovementPattern::Hover {
            self.hover_angle = 0.0;
        }
        self.pattern = pattern;
        log::debug!("enemy pattern -> {pattern:?}");
    }

    /// Steps between shots while flying `pattern`
    fn reload_for(&self, pattern: MovementPattern) -> u32 {
        match pattern {
            MovementPattern::Chase => self.tuning.chase_fire_interval,
            _ => self.tuning.fire_interval,
        }
    }

    fn patrol(&mut self) {
        let t = &self.tuning;
        self.position.x += t.patrol_speed.x * self.heading.x;
        self.position.y += t.patrol_speed.y * self.heading.y;

        if self.position.x > t.lateral_max || self.position.x < t.lateral_min {
            self.heading.x = -self.heading.x;
            self.position.x = self.position.x.clamp(t.lateral_min, t.lateral_max);
        }
        if self.position.y > t.vertical_max || self.position.y < t.vertical_min {
            self.heading.y = -self.heading.y;
            self.position.y = self.position.y.clamp(t.vertical_min, t.vertical_max);
        }
    }

    fn hover(&mut self) {
        let t = &self.tuning;
        self.hover_angle += t.hover_speed;
        self.position.x = t.hover_center.x + t.hover_radius * self.hover_angle.cos();
        self.position.y = t.hover_center.y + t.hover_radius * self.hover_angle.sin() * t.hover_squash;
    }

    fn chase(&mut self, player_x: f32) {
        let t = &self.tuning;
        let dx = player_x - self.position.x;
        if dx.abs() > t.chase_deadzone {
            self.position.x = approach(self.position.x, player_x, t.chase_follow).clamp(t.lateral_min, t.lateral_max);
        }
        let sim_time = self.clock_ticks as f32 * SIM_DT;
        self.position.y = (self.position.y + sim_time.sin() * t.chase_bob).clamp(t.vertical_min, t.vertical_max);
    }

    /// Launch a projectile at `player`, aimed `lateral_error` off the lead point.
    /// Returns the projectile id.
    pub fn fire_at(&mut self, player: Vec3, lateral_error: f32, events: &mut Vec<GameEvent>) -> u32 {
        let origin = self.position + Vec3::Z * self.projectile_tuning.muzzle_offset;
        let aim = lead_target(player, lateral_error, &self.projectile_tuning);
        let id = self.next_projectile_id;
        self.next_projectile_id = self.next_projectile_id.wrapping_add(1);

        self.projectiles.push(Projectile::launch(id, origin, aim, &self.projectile_tuning));
        events.push(GameEvent::Show(EntityRef::Projectile(id)));
        events.push(GameEvent::Sound(Cue::ProjectileFire));
        id
    }

    fn update_projectiles(
        &mut self,
        player_speed: f32,
        rng: &mut impl Rng,
        explosions: &mut Explosions,
        events: &mut Vec<GameEvent>,
    ) {
        self.projectiles.retain_mut(|p| match p.update(player_speed) {
            ProjectileFate::Flying => true,
            ProjectileFate::Grounded => {
                let burst = explosions.spawn(p.position, &mut *rng);
                events.push(GameEvent::Hide(EntityRef::Projectile(p.id)));
                events.push(GameEvent::Show(EntityRef::Explosion(burst)));
                false
            }
            ProjectileFate::Expired => {
                events.push(GameEvent::Hide(EntityRef::Projectile(p.id)));
                false
            }
        });
    }

    /// Drop every live projectile with no effects
    pub fn clear_projectiles(&mut self, events: &mut Vec<GameEvent>) {
        for p in self.projectiles.drain(..) {
            events.push(GameEvent::Hide(EntityRef::Projectile(p.id)));
        }
    }

    /// Remove one projectile (consumed by a hit)
    pub fn remove_projectile(&mut self, id: u32) -> Option<Projectile> {
        let index = self.projectiles.iter().position(|p| p.id == id)?;
        Some(self.projectiles.remove(index))
    }

    /// Banner opacity: fades in, holds, fades out
    pub fn warning_opacity(&self) -> f32 {
        if self.warning_timer == 0 {
            return 0.0;
        }
        let fade = self.tuning.warning_fade.max(1) as f32;
        let elapsed = self.tuning.warning_duration.saturating_sub(self.warning_timer) as f32;
        let remaining = self.warning_timer as f32;
        (elapsed / fade).min(remaining / fade).min(1.0)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn pattern(&self) -> MovementPattern {
        self.pattern
    }

    pub fn hover_angle(&self) -> f32 {
        self.hover_angle
    }

    pub fn fire_threshold(&self) -> u32 {
        self.fire_threshold
    }

    pub fn warning_shown(&self) -> bool {
        self.warning_shown
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn tuning(&self) -> &EnemyTuning {
        &self.tuning
    }
}
