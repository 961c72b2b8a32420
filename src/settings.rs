//! Game settings and preferences
//!
//! Persisted as JSON in LocalStorage. Also home to the selectable car roster.

use serde::{Deserialize, Serialize};

use crate::tuning::Tuning;

/// Driving characteristics of a selectable car
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CarProfile {
    pub name: &'static str,
    /// Forward distance per step at full throttle
    pub top_speed: f32,
    /// Speed gained per step while accelerating
    pub acceleration: f32,
    /// Lateral distance per step while steering
    pub handling: f32,
}

impl CarProfile {
    /// The showroom
    pub const ALL: [CarProfile; 6] = [
        CarProfile::new("Lamborghini Aventador", 2.0, 0.08, 0.25),
        CarProfile::new("Ferrari LaFerrari", 2.2, 0.09, 0.3),
        CarProfile::new("Porsche 911", 1.8, 0.07, 0.2),
        CarProfile::new("Nissan GT-R", 1.7, 0.065, 0.18),
        CarProfile::new("Ford Mustang GT", 1.6, 0.06, 0.15),
        CarProfile::new("Dodge Challenger", 1.65, 0.062, 0.16),
    ];

    pub const fn new(name: &'static str, top_speed: f32, acceleration: f32, handling: f32) -> Self {
        Self {
            name,
            top_speed,
            acceleration,
            handling,
        }
    }

    /// Roster entry by index, if any
    pub fn by_index(index: usize) -> Option<CarProfile> {
        Self::ALL.get(index).copied()
    }
}

impl Default for CarProfile {
    /// The unbranded car used when nothing was picked
    fn default() -> Self {
        CarProfile::new("Stock", 2.0, 0.05, 0.20)
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    pub muted: bool,
    /// Mute when the tab is hidden
    pub mute_on_blur: bool,

    // === HUD ===
    /// Show FPS counter
    pub show_fps: bool,

    // === Garage ===
    /// Index into [`CarProfile::ALL`]; `None` drives the stock car
    pub car: Option<usize>,

    /// Balance overrides; missing fields keep their defaults
    pub tuning: Option<Tuning>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
            mute_on_blur: true,
            show_fps: false,
            car: None,
            tuning: None,
        }
    }
}

impl Settings {
    /// The selected car (stock car for a missing or out-of-range choice)
    pub fn car_profile(&self) -> CarProfile {
        self.car.and_then(CarProfile::by_index).unwrap_or_default()
    }

    /// Tuning to run with. An override that fails validation is ignored.
    pub fn effective_tuning(&self) -> Tuning {
        match &self.tuning {
            Some(tuning) => match tuning.validate() {
                Ok(()) => tuning.clone(),
                Err(e) => {
                    log::warn!("Ignoring tuning override: {e}");
                    Tuning::default()
                }
            },
            None => Tuning::default(),
        }
    }

    /// Final gain for sound effects
    pub fn effective_sfx_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            (self.master_volume * self.sfx_volume).clamp(0.0, 1.0)
        }
    }

    /// LocalStorage key
    const STORAGE_KEY: &'static str = "highway_havoc_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match serde_json::from_str(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Stored settings unreadable: {e}"),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}
