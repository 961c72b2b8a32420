//! Coin spawner
//!
//! Coins are kept in the player's frame: `relative_z` is the forward distance
//! from the player, so scrolling past at the player's speed leaves them fixed
//! in the world. Once collected they stop scrolling and play a short popup.

use glam::Vec3;
use rand::Rng;
use rand::seq::IndexedRandom;

use super::state::{EntityRef, GameEvent};
use crate::tuning::CoinTuning;

/// Rising score popup shown after collection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Popup {
    pub rise: f32,
    pub opacity: f32,
}

/// A collectible coin
#[derive(Debug, Clone)]
pub struct Coin {
    pub id: u32,
    pub lateral: f32,
    pub height: f32,
    /// Forward distance from the player
    pub relative_z: f32,
    pub collected: bool,
    /// Rotation phase (radians)
    pub spin: f32,
    pub popup: Option<Popup>,
}

impl Coin {
    /// Absolute position with the player at forward position `player_z`
    pub fn world_position(&self, player_z: f32) -> Vec3 {
        Vec3::new(self.lateral, self.height, player_z + self.relative_z)
    }

    /// Where the coin is drawn, including the popup rise
    pub fn display_position(&self, player_z: f32) -> Vec3 {
        let rise = self.popup.map_or(0.0, |p| p.rise);
        self.world_position(player_z) + Vec3::Y * rise
    }

    /// Mark collected. Returns false if the coin was already collected.
    pub fn collect(&mut self) -> bool {
        if self.collected {
            return false;
        }
        self.collected = true;
        self.popup = Some(Popup {
            rise: 0.0,
            opacity: 1.0,
        });
        true
    }

    pub fn popup_opacity(&self) -> f32 {
        match self.popup {
            Some(p) => p.opacity.max(0.0),
            None => 1.0,
        }
    }

    /// Advance one step; returns false once the coin should be removed
    fn update(&mut self, player_speed: f32, tuning: &CoinTuning) -> bool {
        match &mut self.popup {
            Some(popup) => {
                popup.rise += tuning.popup_rise;
                popup.opacity -= tuning.popup_fade;
                popup.opacity > 0.0
            }
            None => {
                self.relative_z -= player_speed;
                self.spin += tuning.spin_speed;
                self.relative_z >= tuning.rear_cutoff
            }
        }
    }
}

/// Timer-driven coin producer
#[derive(Debug, Clone)]
pub struct CoinSpawner {
    tuning: CoinTuning,
    coins: Vec<Coin>,
    timer: u32,
    next_id: u32,
}

impl CoinSpawner {
    pub fn new(tuning: &CoinTuning) -> Self {
        Self {
            tuning: tuning.clone(),
            coins: Vec::new(),
            timer: 0,
            next_id: 0,
        }
    }

    /// Advance one step at the player's current forward speed
    pub fn update(&mut self, player_speed: f32, rng: &mut impl Rng, events: &mut Vec<GameEvent>) {
        self.timer += 1;
        if self.timer >= self.tuning.spawn_interval {
            self.timer = 0;
            if self.coins.len() < self.tuning.max_coins {
                self.spawn(rng, events);
            }
        }

        let tuning = &self.tuning;
        self.coins.retain_mut(|coin| {
            let keep = coin.update(player_speed, tuning);
            if !keep {
                events.push(GameEvent::Hide(EntityRef::Coin(coin.id)));
            }
            keep
        });
    }

    fn spawn(&mut self, rng: &mut impl Rng, events: &mut Vec<GameEvent>) {
        let Some(&lateral) = self.tuning.lanes.choose(rng) else {
            return;
        };
        let relative_z = self.tuning.spawn_ahead + rng.random::<f32>() * self.tuning.spawn_jitter;
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.coins.push(Coin {
            id,
            lateral,
            height: self.tuning.height,
            relative_z,
            collected: false,
            spin: 0.0,
            popup: None,
        });
        events.push(GameEvent::Show(EntityRef::Coin(id)));
        log::trace!("coin {id} spawned at x={lateral} +{relative_z:.1}");
    }

    pub fn coins(&self) -> &[Coin] {
        &self.coins
    }

    pub fn coins_mut(&mut self) -> &mut [Coin] {
        &mut self.coins
    }

    pub fn live_count(&self) -> usize {
        self.coins.len()
    }

    pub fn value(&self) -> u64 {
        self.tuning.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn run(spawner: &mut CoinSpawner, steps: u32, speed: f32, rng: &mut Pcg32) -> Vec<GameEvent> {
        let mut events = Vec::new();
        for _ in 0..steps {
            spawner.update(speed, rng, &mut events);
        }
        events
    }

    #[test]
    fn test_spawns_on_interval() {
        let mut spawner = CoinSpawner::new(&CoinTuning::default());
        let mut rng = Pcg32::seed_from_u64(1);
        run(&mut spawner, 119, 0.0, &mut rng);
        assert_eq!(spawner.live_count(), 0);
        let events = run(&mut spawner, 1, 0.0, &mut rng);
        assert_eq!(spawner.live_count(), 1);
        assert_eq!(events, vec![GameEvent::Show(EntityRef::Coin(0))]);

        let coin = &spawner.coins()[0];
        assert!([-6.0, -2.0, 2.0, 6.0].contains(&coin.lateral));
        assert!((40.0..=80.0).contains(&coin.relative_z));
        assert_eq!(coin.height, 1.0);
    }

    #[test]
    fn test_live_count_is_capped() {
        let mut spawner = CoinSpawner::new(&CoinTuning::default());
        let mut rng = Pcg32::seed_from_u64(2);
        // Standing still: nothing ever scrolls out
        run(&mut spawner, 120 * 10, 0.0, &mut rng);
        assert_eq!(spawner.live_count(), 5);
    }

    #[test]
    fn test_coin_stays_fixed_in_world() {
        let mut spawner = CoinSpawner::new(&CoinTuning::default());
        let mut rng = Pcg32::seed_from_u64(3);
        run(&mut spawner, 120, 0.0, &mut rng);
        let start = spawner.coins()[0].world_position(0.0);

        let mut player_z = 0.0;
        let mut events = Vec::new();
        for _ in 0..10 {
            player_z += 1.5;
            spawner.update(1.5, &mut rng, &mut events);
        }
        let now = spawner.coins()[0].world_position(player_z);
        assert!((now.z - start.z).abs() < 1e-3);
    }

    #[test]
    fn test_removed_past_rear_cutoff() {
        let mut spawner = CoinSpawner::new(&CoinTuning::default());
        let mut rng = Pcg32::seed_from_u64(4);
        run(&mut spawner, 120, 0.0, &mut rng);
        let id = spawner.coins()[0].id;
        // 80 ahead at most, cutoff 40 behind: 121 units of travel is enough
        let events = run(&mut spawner, 1, 121.0, &mut rng);
        assert_eq!(spawner.live_count(), 0);
        assert!(events.contains(&GameEvent::Hide(EntityRef::Coin(id))));
    }

    #[test]
    fn test_collect_is_idempotent_and_popup_fades() {
        let mut spawner = CoinSpawner::new(&CoinTuning::default());
        let mut rng = Pcg32::seed_from_u64(5);
        run(&mut spawner, 120, 0.0, &mut rng);

        let coin = &mut spawner.coins_mut()[0];
        assert!(coin.collect());
        assert!(!coin.collect());
        let z = coin.relative_z;

        let mut events = Vec::new();
        spawner.update(2.0, &mut rng, &mut events);
        let coin = &spawner.coins()[0];
        assert_eq!(coin.relative_z, z, "collected coins stop scrolling");
        assert!(coin.popup_opacity() < 1.0);
        assert!(coin.display_position(0.0).y > coin.height);

        // 1.0 / 0.04 = 25 steps to fade out
        run(&mut spawner, 30, 0.0, &mut rng);
        assert_eq!(spawner.live_count(), 0);
    }
}
