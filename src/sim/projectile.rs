//! Enemy projectiles and impact explosions
//!
//! Projectiles fly in a straight line fixed at launch. Aim is led ahead of the
//! player and jittered sideways so shots are neither perfectly predictable nor
//! unavoidable.

use glam::Vec3;
use rand::Rng;

use crate::sphere_direction;
use crate::tuning::ProjectileTuning;

/// Outcome of one projectile step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileFate {
    Flying,
    /// Reached the road surface; explodes
    Grounded,
    /// Outlived its lifetime; removed without an effect
    Expired,
}

/// A straight-flying projectile
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: u32,
    pub position: Vec3,
    /// Unit direction fixed at launch
    pub direction: Vec3,
    pub speed: f32,
    pub time_alive: u32,
    pub max_lifetime: u32,
    /// Carried with every projectile but never applied to the flight path
    pub tracking_factor: f32,
}

impl Projectile {
    /// Launch from `origin` toward `aim`
    pub fn launch(id: u32, origin: Vec3, aim: Vec3, tuning: &ProjectileTuning) -> Self {
        Self {
            id,
            position: origin,
            direction: (aim - origin).try_normalize().unwrap_or(Vec3::NEG_Y),
            speed: tuning.speed,
            time_alive: 0,
            max_lifetime: tuning.max_lifetime,
            tracking_factor: tuning.tracking_factor,
        }
    }

    /// Advance one step while the world scrolls by `player_speed`
    pub fn update(&mut self, player_speed: f32) -> ProjectileFate {
        self.position += self.direction * self.speed;
        self.position.z -= player_speed;
        self.time_alive += 1;

        if self.position.y <= 0.0 {
            ProjectileFate::Grounded
        } else if self.time_alive > self.max_lifetime {
            ProjectileFate::Expired
        } else {
            ProjectileFate::Flying
        }
    }
}

/// Aim point for a shot at the player: near the road, led forward, offset
/// sideways by `lateral_error`.
pub fn lead_target(player: Vec3, lateral_error: f32, tuning: &ProjectileTuning) -> Vec3 {
    Vec3::new(
        player.x + lateral_error,
        tuning.aim_height,
        player.z + tuning.lead_distance,
    )
}

/// One explosion fragment
#[derive(Debug, Clone)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
}

/// Cosmetic particle burst
#[derive(Debug, Clone)]
pub struct Explosion {
    pub id: u32,
    pub particles: Vec<Particle>,
    pub age: u32,
    pub lifetime: u32,
    gravity: f32,
    fade_start: f32,
}

impl Explosion {
    pub fn new(id: u32, at: Vec3, tuning: &ProjectileTuning, rng: &mut impl Rng) -> Self {
        let particles = (0..tuning.explosion_particles)
            .map(|_| {
                let azimuth = rng.random::<f32>() * std::f32::consts::TAU;
                let elevation = (rng.random::<f32>() * 2.0 - 1.0).acos();
                let speed = rng.random_range(tuning.particle_speed_min..=tuning.particle_speed_max);
                Particle {
                    position: at,
                    velocity: sphere_direction(azimuth, elevation) * speed,
                }
            })
            .collect();

        Self {
            id,
            particles,
            age: 0,
            lifetime: tuning.explosion_lifetime,
            gravity: tuning.particle_gravity,
            fade_start: tuning.fade_start,
        }
    }

    /// Advance one step; returns false when the burst is finished
    pub fn update(&mut self) -> bool {
        self.age += 1;
        for p in &mut self.particles {
            p.position += p.velocity;
            p.velocity.y -= self.gravity;
        }
        self.age < self.lifetime
    }

    pub fn opacity(&self) -> f32 {
        let progress = self.age as f32 / self.lifetime as f32;
        if progress <= self.fade_start {
            1.0
        } else {
            (1.0 - (progress - self.fade_start) / (1.0 - self.fade_start)).max(0.0)
        }
    }
}

/// Live explosions, oldest first
#[derive(Debug, Clone)]
pub struct Explosions {
    tuning: ProjectileTuning,
    active: Vec<Explosion>,
    next_id: u32,
}

impl Explosions {
    pub fn new(tuning: &ProjectileTuning) -> Self {
        Self {
            tuning: tuning.clone(),
            active: Vec::new(),
            next_id: 0,
        }
    }

    /// Start a burst at `at` and return its id
    pub fn spawn(&mut self, at: Vec3, rng: &mut impl Rng) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.active.push(Explosion::new(id, at, &self.tuning, rng));
        id
    }

    /// Step every burst; returns the ids of those that finished
    pub fn update(&mut self) -> Vec<u32> {
        let mut finished = Vec::new();
        self.active.retain_mut(|e| {
            let alive = e.update();
            if !alive {
                finished.push(e.id);
            }
            alive
        });
        finished
    }

    pub fn iter(&self) -> impl Iterator<Item = &Explosion> {
        self.active.iter()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_lead_target() {
        let tuning = ProjectileTuning::default();
        let aim = lead_target(Vec3::new(2.0, 0.5, 40.0), 0.25, &tuning);
        assert_eq!(aim, Vec3::new(2.25, 0.5, 45.0));
    }

    #[test]
    fn test_direction_is_fixed_at_launch() {
        let tuning = ProjectileTuning::default();
        let origin = Vec3::new(0.0, 15.0, 22.0);
        let aim = Vec3::new(2.0, 0.5, 45.0);
        let mut p = Projectile::launch(0, origin, aim, &tuning);
        let expected = (aim - origin).normalize();
        assert!((p.direction - expected).length() < 1e-6);

        for _ in 0..5 {
            p.update(1.0);
            assert_eq!(p.direction, expected);
        }
        assert_eq!(p.tracking_factor, 0.03);
    }

    #[test]
    fn test_world_scroll_is_applied() {
        let tuning = ProjectileTuning::default();
        let mut p = Projectile::launch(0, Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, 10.0, 10.0), &tuning);
        p.update(2.0);
        // +1.5 along the flight direction, -2.0 for the scroll
        assert!((p.position.z - -0.5).abs() < 1e-6);
        assert_eq!(p.time_alive, 1);
    }

    #[test]
    fn test_ground_impact_and_expiry() {
        let tuning = ProjectileTuning::default();
        let mut falling = Projectile::launch(0, Vec3::new(0.0, 1.0, 0.0), Vec3::ZERO, &tuning);
        assert_eq!(falling.update(0.0), ProjectileFate::Grounded);

        // Level flight never lands
        let mut level = Projectile::launch(1, Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, 5.0, 1.0), &tuning);
        for _ in 0..tuning.max_lifetime {
            assert_eq!(level.update(0.0), ProjectileFate::Flying);
        }
        assert_eq!(level.update(0.0), ProjectileFate::Expired);
    }

    #[test]
    fn test_degenerate_aim_falls_straight_down() {
        let tuning = ProjectileTuning::default();
        let at = Vec3::new(1.0, 2.0, 3.0);
        let p = Projectile::launch(0, at, at, &tuning);
        assert_eq!(p.direction, Vec3::NEG_Y);
    }

    #[test]
    fn test_explosion_lifecycle() {
        let tuning = ProjectileTuning::default();
        let mut rng = Pcg32::seed_from_u64(11);
        let mut explosions = Explosions::new(&tuning);
        let id = explosions.spawn(Vec3::new(0.0, 1.0, 5.0), &mut rng);
        assert_eq!(explosions.iter().next().unwrap().particles.len(), 15);
        for p in &explosions.iter().next().unwrap().particles {
            let speed = p.velocity.length();
            assert!((0.2 - 1e-4..=0.5 + 1e-4).contains(&speed));
        }

        for _ in 0..29 {
            assert!(explosions.update().is_empty());
        }
        assert_eq!(explosions.update(), vec![id]);
        assert!(explosions.is_empty());
    }

    #[test]
    fn test_explosion_fades_late() {
        let tuning = ProjectileTuning::default();
        let mut rng = Pcg32::seed_from_u64(12);
        let mut e = Explosion::new(0, Vec3::ZERO, &tuning, &mut rng);
        for _ in 0..18 {
            e.update();
        }
        assert_eq!(e.opacity(), 1.0);
        for _ in 0..6 {
            e.update();
        }
        assert!(e.opacity() < 1.0 && e.opacity() > 0.0);
    }
}
