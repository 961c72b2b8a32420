//! Audio system using Web Audio API
//!
//! Procedurally generated cues - no external files needed.

use wasm_bindgen::JsValue;
use web_sys::{AudioContext, AudioContextState, GainNode, OscillatorNode, OscillatorType};

use crate::platform::{AudioError, AudioSink};
use crate::settings::Settings;
use crate::sim::Cue;

impl From<JsValue> for AudioError {
    fn from(value: JsValue) -> Self {
        AudioError::Backend(format!("{value:?}"))
    }
}

/// Audio manager for the game
pub struct AudioManager {
    ctx: Option<AudioContext>,
    master_volume: f32,
    sfx_volume: f32,
    muted: bool,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioManager {
    pub fn new() -> Self {
        // May fail outside a secure context
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self {
            ctx,
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
        }
    }

    /// Take volume and mute preferences from settings
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.master_volume = settings.master_volume.clamp(0.0, 1.0);
        self.sfx_volume = settings.sfx_volume.clamp(0.0, 1.0);
        self.muted = settings.muted;
    }

    /// Resume audio context (required after user gesture)
    pub fn resume(&self) {
        if let Some(ctx) = &self.ctx {
            let _ = ctx.resume();
        }
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }

    // === Sound generators ===

    /// Create an oscillator with gain envelope
    fn create_osc(
        &self,
        ctx: &AudioContext,
        freq: f32,
        osc_type: OscillatorType,
    ) -> Result<(OscillatorNode, GainNode), AudioError> {
        let osc = ctx.create_oscillator()?;
        let gain = ctx.create_gain()?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain)?;
        gain.connect_with_audio_node(&ctx.destination())?;

        Ok((osc, gain))
    }

    /// Enemy shot - falling laser zap
    fn play_projectile_fire(&self, ctx: &AudioContext, vol: f32) -> Result<(), AudioError> {
        let (osc, gain) = self.create_osc(ctx, 900.0, OscillatorType::Sawtooth)?;
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.25, t)?;
        gain.gain().exponential_ramp_to_value_at_time(0.01, t + 0.25)?;
        osc.frequency().set_value_at_time(900.0, t)?;
        osc.frequency().exponential_ramp_to_value_at_time(180.0, t + 0.25)?;

        osc.start()?;
        osc.stop_with_when(t + 0.3)?;
        Ok(())
    }

    /// Projectile hits the car - boom with a crack on top
    fn play_projectile_hit(&self, ctx: &AudioContext, vol: f32) -> Result<(), AudioError> {
        let t = ctx.current_time();

        let (osc, gain) = self.create_osc(ctx, 100.0, OscillatorType::Sawtooth)?;
        gain.gain().set_value_at_time(vol * 0.5, t)?;
        gain.gain().exponential_ramp_to_value_at_time(0.01, t + 0.4)?;
        osc.frequency().set_value_at_time(100.0, t)?;
        osc.frequency().exponential_ramp_to_value_at_time(30.0, t + 0.4)?;
        osc.start()?;
        osc.stop_with_when(t + 0.5)?;

        let (crack, crack_gain) = self.create_osc(ctx, 1500.0, OscillatorType::Square)?;
        crack_gain.gain().set_value_at_time(vol * 0.2, t)?;
        crack_gain.gain().exponential_ramp_to_value_at_time(0.01, t + 0.1)?;
        crack.start()?;
        crack.stop_with_when(t + 0.15)?;
        Ok(())
    }

    /// Coin - two-note ding
    fn play_coin(&self, ctx: &AudioContext, vol: f32) -> Result<(), AudioError> {
        for (i, freq) in [988.0, 1319.0].iter().enumerate() {
            let delay = i as f64 * 0.07;
            let (osc, gain) = self.create_osc(ctx, *freq, OscillatorType::Square)?;
            let t = ctx.current_time() + delay;
            gain.gain().set_value_at_time(vol * 0.15, t)?;
            gain.gain().exponential_ramp_to_value_at_time(0.01, t + 0.2)?;
            osc.start_with_when(t)?;
            osc.stop_with_when(t + 0.25)?;
        }
        Ok(())
    }

    /// Crash - heavy crunch and a sinking tone
    fn play_crash(&self, ctx: &AudioContext, vol: f32) -> Result<(), AudioError> {
        let t = ctx.current_time();

        let (thud, thud_gain) = self.create_osc(ctx, 80.0, OscillatorType::Sine)?;
        thud_gain.gain().set_value_at_time(vol * 0.6, t)?;
        thud_gain.gain().exponential_ramp_to_value_at_time(0.01, t + 0.5)?;
        thud.frequency().set_value_at_time(80.0, t)?;
        thud.frequency().exponential_ramp_to_value_at_time(30.0, t + 0.5)?;
        thud.start()?;
        thud.stop_with_when(t + 0.6)?;

        // Metal crunch
        let (crunch, crunch_gain) = self.create_osc(ctx, 300.0, OscillatorType::Square)?;
        crunch_gain.gain().set_value_at_time(vol * 0.3, t)?;
        crunch_gain.gain().exponential_ramp_to_value_at_time(0.01, t + 0.3)?;
        crunch.frequency().set_value_at_time(300.0, t)?;
        crunch.frequency().set_value_at_time(120.0, t + 0.03)?;
        crunch.frequency().set_value_at_time(260.0, t + 0.06)?;
        crunch.frequency().set_value_at_time(90.0, t + 0.1)?;
        crunch.frequency().set_value_at_time(200.0, t + 0.15)?;
        crunch.start()?;
        crunch.stop_with_when(t + 0.35)?;

        for (i, freq) in [400.0, 300.0, 200.0].iter().enumerate() {
            let delay = 0.3 + i as f64 * 0.2;
            let (osc, gain) = self.create_osc(ctx, *freq, OscillatorType::Sine)?;
            let t = ctx.current_time() + delay;
            gain.gain().set_value_at_time(vol * 0.3, t)?;
            gain.gain().exponential_ramp_to_value_at_time(0.01, t + 0.3)?;
            osc.start_with_when(t)?;
            osc.stop_with_when(t + 0.4)?;
        }
        Ok(())
    }
}

impl AudioSink for AudioManager {
    fn play(&mut self, cue: Cue) -> Result<(), AudioError> {
        let vol = self.effective_volume();
        if vol <= 0.0 {
            return Ok(());
        }

        let ctx = self.ctx.as_ref().ok_or(AudioError::Unavailable)?;

        // Browsers keep the context suspended until a user gesture
        if ctx.state() == AudioContextState::Suspended {
            let _ = ctx.resume();
            return Err(AudioError::Suspended);
        }

        match cue {
            Cue::ProjectileFire => self.play_projectile_fire(ctx, vol),
            Cue::ProjectileHit => self.play_projectile_hit(ctx, vol),
            Cue::CoinCollect => self.play_coin(ctx, vol),
            Cue::Crash => self.play_crash(ctx, vol),
        }
    }
}
