//! Platform abstraction layer
//!
//! The simulation never talks to the outside world directly. Drivers hand it
//! input, then route the events it produced to these collaborators:
//! - [`SceneSink`] mirrors entities into whatever draws them
//! - [`AudioSink`] plays named cues, fire-and-forget
//! - [`HudSink`] shows score, health and speed
//!
//! [`FixedStepper`] turns variable frame times into whole simulation steps.

use thiserror::Error;

use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::sim::{Cue, EntityRef, GameEvent, GameState, HudSnapshot, TickInput, tick};

/// Why a cue could not be played
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio context available")]
    Unavailable,
    #[error("audio context is suspended (autoplay blocked?)")]
    Suspended,
    #[error("audio backend error: {0}")]
    Backend(String),
}

/// Visual representation of simulated entities
pub trait SceneSink {
    fn add(&mut self, entity: EntityRef);
    fn remove(&mut self, entity: EntityRef);
}

/// Sound playback
pub trait AudioSink {
    fn play(&mut self, cue: Cue) -> Result<(), AudioError>;
}

/// Heads-up display
pub trait HudSink {
    fn update(&mut self, hud: &HudSnapshot);

    /// The aerial enemy arrived for the first time
    fn show_warning(&mut self) {}

    /// The run ended with `score`
    fn game_over(&mut self, _score: u64) {}
}

/// Route a batch of simulation events to the collaborators.
///
/// Audio failures are logged and dropped; they never reach the caller.
pub fn dispatch_events(
    events: &[GameEvent],
    scene: &mut dyn SceneSink,
    audio: &mut dyn AudioSink,
    hud: &mut dyn HudSink,
) {
    for event in events {
        match event {
            GameEvent::Show(entity) => scene.add(*entity),
            GameEvent::Hide(entity) => scene.remove(*entity),
            GameEvent::Sound(cue) => {
                if let Err(e) = audio.play(*cue) {
                    log::warn!("Could not play {}: {e}", cue.as_str());
                }
            }
            GameEvent::EnemyWarning => hud.show_warning(),
            GameEvent::CoinCollected { points } => log::debug!("coin +{points}"),
            GameEvent::PlayerHit { damage, health } => {
                log::debug!("player hit for {damage}, health {health}");
            }
            GameEvent::GameOver { score, .. } => hud.game_over(*score),
        }
    }
}

/// Run up to `steps` ticks, routing each step's events as it completes.
///
/// Stops at game over so the final score stays on screen; a finished run
/// takes no further steps. Returns the number of steps taken.
pub fn run_steps(
    state: &mut GameState,
    input: &TickInput,
    steps: u32,
    scene: &mut dyn SceneSink,
    audio: &mut dyn AudioSink,
    hud: &mut dyn HudSink,
) -> u32 {
    let mut taken = 0;
    while taken < steps && !state.is_over() {
        tick(state, input);
        taken += 1;
        let events = state.drain_events();
        dispatch_events(&events, scene, audio, hud);
    }
    taken
}

/// Scene that draws nothing (headless runs)
#[derive(Debug, Default)]
pub struct NullScene;

impl SceneSink for NullScene {
    fn add(&mut self, _entity: EntityRef) {}
    fn remove(&mut self, _entity: EntityRef) {}
}

/// Audio that plays nothing
#[derive(Debug, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play(&mut self, _cue: Cue) -> Result<(), AudioError> {
        Ok(())
    }
}

/// HUD that logs the final score and nothing else
#[derive(Debug, Default)]
pub struct LogHud;

impl HudSink for LogHud {
    fn update(&mut self, _hud: &HudSnapshot) {}

    fn game_over(&mut self, score: u64) {
        log::info!("Final score: {score}");
    }
}

/// Fixed timestep accumulator
#[derive(Debug, Clone, Default)]
pub struct FixedStepper {
    accumulator: f32,
}

impl FixedStepper {
    /// Longest frame time honoured; anything longer is treated as a stall
    const MAX_FRAME: f32 = 0.1;

    pub fn new() -> Self {
        Self::default()
    }

    /// Add a frame's elapsed seconds and return how many steps to run now.
    /// At most `MAX_SUBSTEPS` per frame; leftover time carries over.
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.clamp(0.0, Self::MAX_FRAME);

        let mut steps = 0;
        while self.accumulator >= SIM_DT && steps < MAX_SUBSTEPS {
            self.accumulator -= SIM_DT;
            steps += 1;
        }
        steps
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
