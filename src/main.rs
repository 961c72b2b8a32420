//! Highway Havoc entry point
//!
//! Browser: runs the fixed-step loop on requestAnimationFrame and forwards
//! simulation events to a JS scene, Web Audio and the DOM HUD.
//! Native: runs a headless autopilot session and logs the result.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;

    use highway_havoc::audio::AudioManager;
    use highway_havoc::platform::{FixedStepper, HudSink, SceneSink, run_steps};
    use highway_havoc::sim::{EntityRef, GameState, HudSnapshot, TickInput};
    use highway_havoc::Settings;

    // Bridge to the three.js scene that owns meshes and the camera
    #[wasm_bindgen(inline_js = "
        export function scene_add(kind, id) {
            if (window.highwayScene) window.highwayScene.add(kind, id);
        }
        export function scene_remove(kind, id) {
            if (window.highwayScene) window.highwayScene.remove(kind, id);
        }
        export function scene_reset() {
            if (window.highwayScene) window.highwayScene.reset();
        }
        export function scene_frame(json) {
            if (window.highwayScene) window.highwayScene.frame(JSON.parse(json));
        }
    ")]
    extern "C" {
        fn scene_add(kind: &str, id: f64);
        fn scene_remove(kind: &str, id: f64);
        fn scene_reset();
        fn scene_frame(json: &str);
    }

    fn entity_key(entity: EntityRef) -> (&'static str, f64) {
        match entity {
            EntityRef::Player => ("player", 0.0),
            EntityRef::Traffic(id) => ("traffic", id.index() as f64),
            EntityRef::Coin(id) => ("coin", id as f64),
            EntityRef::Enemy => ("enemy", 0.0),
            EntityRef::Projectile(id) => ("projectile", id as f64),
            EntityRef::Explosion(id) => ("explosion", id as f64),
        }
    }

    /// Scene collaborator backed by the JS bridge
    struct JsScene;

    impl SceneSink for JsScene {
        fn add(&mut self, entity: EntityRef) {
            let (kind, id) = entity_key(entity);
            scene_add(kind, id);
        }

        fn remove(&mut self, entity: EntityRef) {
            let (kind, id) = entity_key(entity);
            scene_remove(kind, id);
        }
    }

    /// HUD collaborator writing into the page
    struct DomHud {
        document: web_sys::Document,
    }

    impl DomHud {
        fn set_text(&self, selector: &str, text: &str) {
            if let Some(el) = self.document.query_selector(selector).ok().flatten() {
                el.set_text_content(Some(text));
            }
        }

        fn set_visible(&self, id: &str, visible: bool) {
            if let Some(el) = self.document.get_element_by_id(id) {
                let _ = el.class_list().toggle_with_force("hidden", !visible);
            }
        }

        fn set_opacity(&self, id: &str, opacity: f32) {
            if let Some(el) = self.document.get_element_by_id(id) {
                let _ = el.set_attribute("style", &format!("opacity: {opacity:.2}"));
            }
        }
    }

    impl HudSink for DomHud {
        fn update(&mut self, hud: &HudSnapshot) {
            self.set_text("#hud-score .hud-value", &hud.score.to_string());
            self.set_text("#hud-health .hud-value", &format!("{:.0}%", hud.health_percent));
            self.set_text("#hud-speed .hud-value", &format!("{} km/h", hud.speed_display));
        }

        fn show_warning(&mut self) {
            log::info!("Warning: aerial enemy approaching");
        }

        fn game_over(&mut self, score: u64) {
            log::info!("Game over - final score {score}");
            self.set_text("#final-score", &score.to_string());
            self.set_visible("game-over", true);
        }
    }

    /// Game instance holding all state
    struct Game {
        state: GameState,
        settings: Settings,
        stepper: FixedStepper,
        last_time: f64,
        input: TickInput,
        audio: AudioManager,
        scene: JsScene,
        hud: DomHud,
        // FPS tracking
        frame_times: [f64; 60],
        frame_index: usize,
        fps: u32,
    }

    impl Game {
        fn new(seed: u64, settings: Settings, document: web_sys::Document) -> Self {
            let mut audio = AudioManager::new();
            audio.apply_settings(&settings);
            Self {
                state: GameState::with_config(seed, settings.effective_tuning(), settings.car_profile()),
                settings,
                stepper: FixedStepper::new(),
                last_time: 0.0,
                input: TickInput::default(),
                audio,
                scene: JsScene,
                hud: DomHud { document },
                frame_times: [0.0; 60],
                frame_index: 0,
                fps: 0,
            }
        }

        /// Run simulation ticks. A finished run stays on the final-score
        /// overlay until the player restarts.
        fn update(&mut self, dt: f32, time: f64) {
            let steps = self.stepper.advance(dt);
            run_steps(
                &mut self.state,
                &self.input,
                steps,
                &mut self.scene,
                &mut self.audio,
                &mut self.hud,
            );

            // Track frame times for FPS
            self.frame_times[self.frame_index] = time;
            self.frame_index = (self.frame_index + 1) % 60;

            let oldest_time = self.frame_times[self.frame_index];
            if oldest_time > 0.0 {
                let elapsed = time - oldest_time;
                if elapsed > 0.0 {
                    self.fps = (60000.0 / elapsed).round() as u32;
                }
            }
        }

        fn render(&self) {
            match serde_json::to_string(&self.state.render_snapshot()) {
                Ok(json) => scene_frame(&json),
                Err(e) => log::warn!("Could not serialise frame: {e}"),
            }
        }

        /// Update HUD elements in DOM
        fn update_hud(&mut self) {
            let hud = self.state.hud();
            self.hud.update(&hud);
            self.hud
                .set_opacity("enemy-warning", self.state.enemy.warning_opacity());
            self.hud.set_visible("hud-fps", self.settings.show_fps);
            if self.settings.show_fps {
                self.hud.set_text("#hud-fps .hud-value", &self.fps.to_string());
            }
        }

        /// Fresh session, keeping car and tuning choices
        fn restart(&mut self, seed: u64) {
            let autopilot = self.input.autopilot;
            scene_reset();
            self.state = GameState::with_config(
                seed,
                self.settings.effective_tuning(),
                self.settings.car_profile(),
            );
            self.input = TickInput {
                autopilot,
                ..Default::default()
            };
            self.stepper.reset();
            self.hud.set_visible("game-over", false);
            log::info!("Started new game with seed: {seed}");
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            return;
        }

        log::info!("Highway Havoc starting...");

        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let settings = Settings::load();
        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game::new(seed, settings, document.clone())));
        log::info!("Game initialized with seed: {seed}");

        setup_input_handlers(game.clone());
        setup_restart_button(game.clone());
        setup_visibility(game.clone());

        if let Some(hud) = document.get_element_by_id("hud") {
            let _ = hud.set_attribute("class", "");
        }

        request_animation_frame(game);
        log::info!("Highway Havoc running!");
    }

    fn setup_input_handlers(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        // Held keys
        for (event_name, pressed) in [("keydown", true), ("keyup", false)] {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
                let mut g = game.borrow_mut();
                g.audio.resume();
                match event.key().as_str() {
                    "ArrowLeft" => g.input.steer_left = pressed,
                    "ArrowRight" => g.input.steer_right = pressed,
                    "ArrowUp" => g.input.accelerate = pressed,
                    "ArrowDown" => g.input.brake = pressed,
                    _ => return,
                }
                event.prevent_default();
            });
            let _ = window.add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Toggles
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
                if event.repeat() {
                    return;
                }
                let mut g = game.borrow_mut();
                match event.key().as_str() {
                    "i" | "I" => {
                        g.input.autopilot = !g.input.autopilot;
                        log::info!("Autopilot: {}", g.input.autopilot);
                    }
                    "m" | "M" => {
                        let muted = !g.audio.is_muted();
                        g.audio.set_muted(muted);
                        g.settings.muted = muted;
                        g.settings.save();
                    }
                    "Enter" if g.state.is_over() => g.restart(js_sys::Date::now() as u64),
                    "f" | "F" => {
                        g.settings.show_fps = !g.settings.show_fps;
                        g.settings.save();
                    }
                    _ => {}
                }
            });
            let _ = window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_restart_button(game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        if let Some(btn) = document.get_element_by_id("restart-btn") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                game.borrow_mut().restart(js_sys::Date::now() as u64);
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Drop accumulated time while the tab is hidden so the car does not
    /// lurch forward on return
    fn setup_visibility(game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let document_clone = document.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let mut g = game.borrow_mut();
            let hidden = document_clone.visibility_state() == web_sys::VisibilityState::Hidden;
            if hidden {
                g.stepper.reset();
                g.last_time = 0.0;
            }
            if g.settings.mute_on_blur {
                let muted = hidden || g.settings.muted;
                g.audio.set_muted(muted);
            }
        });
        let _ = document
            .add_event_listener_with_callback("visibilitychange", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();

            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                highway_havoc::consts::SIM_DT
            };
            g.last_time = time;

            g.update(dt, time);
            g.render();
            g.update_hud();
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use highway_havoc::Settings;
    use highway_havoc::platform::{LogHud, NullAudio, NullScene, run_steps};
    use highway_havoc::sim::{GameState, TickInput};

    /// Ten minutes of play at 60 steps per second
    const MAX_STEPS: u32 = 60 * 60 * 10;

    env_logger::init();
    log::info!("Highway Havoc (native) starting headless autopilot run...");

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0)
        });

    let settings = Settings::load();
    let mut state = GameState::with_config(seed, settings.effective_tuning(), settings.car_profile());
    let input = TickInput {
        autopilot: true,
        ..Default::default()
    };
    let (mut scene, mut audio, mut hud) = (NullScene, NullAudio, LogHud);

    run_steps(&mut state, &input, MAX_STEPS, &mut scene, &mut audio, &mut hud);

    let hud = state.hud();
    log::info!(
        "Seed {seed}: {} steps, score {}, health {:.0}%, {}",
        state.time_ticks,
        hud.score,
        hud.health_percent,
        if state.is_over() { "wrecked" } else { "survived" }
    );
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
