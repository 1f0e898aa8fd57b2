//! Loopfall entry point
//!
//! On the web this wires the engine to the page: input listeners, the HUD,
//! menu buttons and the animation-frame loop. Natively it runs a headless
//! autopilot session, which is handy for balance checks.

#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, EventTarget, HtmlCanvasElement, KeyboardEvent, MouseEvent};

    use loopfall::audio::WebAudioSink;
    use loopfall::catalog::{LoreFragment, StoryBeat};
    use loopfall::platform::LocalStorage;
    use loopfall::{Catalog, Engine, EngineCallbacks, FinalStats, GamePhase, InputState, Settings, Tuning};

    /// Game instance holding the engine and the sampled input
    struct Game {
        engine: Engine,
        input: InputState,
        last_time: f64,
    }

    /// Writes callback values into the page's HUD elements
    struct DomHud {
        document: Document,
    }

    impl DomHud {
        fn set_text(&self, id: &str, text: &str) {
            if let Some(el) = self.document.get_element_by_id(id) {
                el.set_text_content(Some(text));
            }
        }

        fn show(&self, id: &str, visible: bool) {
            if let Some(el) = self.document.get_element_by_id(id) {
                let _ = el.set_attribute("class", if visible { "" } else { "hidden" });
            }
        }
    }

    impl EngineCallbacks for DomHud {
        fn on_health_changed(&mut self, current: f32, max: f32) {
            self.set_text("hp", &format!("{:.0} / {:.0}", current, max));
        }

        fn on_score_changed(&mut self, score: u64) {
            self.set_text("score", &score.to_string());
        }

        fn on_loop_changed(&mut self, loop_count: u32, time_remaining: f32, _max_time: f32) {
            self.set_text("loop", &loop_count.to_string());
            self.set_text("timer", &format!("{:.0}", time_remaining.max(0.0).ceil()));
        }

        fn on_xp_changed(&mut self, current: u32, max: u32, level: u32) {
            self.set_text("xp", &format!("{} / {}", current, max));
            self.set_text("level", &level.to_string());
        }

        fn on_ability_cooldown_changed(&mut self, current: f32, _max: f32) {
            let text = if current > 0.0 {
                format!("{:.1}s", current)
            } else {
                "READY".to_string()
            };
            self.set_text("nova", &text);
        }

        fn on_danger_warning(&mut self) {
            self.show("danger", true);
        }

        fn on_game_over(&mut self, stats: FinalStats) {
            self.set_text("final-score", &stats.score.to_string());
            self.set_text("final-loop", &stats.loop_count.to_string());
            self.show("game-over", true);
        }

        fn on_level_up(&mut self) {
            self.show("danger", false);
            self.show("level-up", true);
        }

        fn on_pause_toggled(&mut self, paused: bool) {
            self.show("pause-menu", paused);
        }

        fn on_lore_unlocked(&mut self, fragment: &LoreFragment) {
            self.set_text("lore-title", fragment.title);
            self.set_text("lore-content", fragment.content);
            self.show("lore", true);
        }

        fn on_story_triggered(&mut self, beat: &StoryBeat) {
            self.set_text("story-speaker", beat.speaker);
            self.set_text("story-lines", &beat.lines.join("\n"));
            self.show("story", true);
        }
    }

    /// Add a listener and register its removal with the engine
    fn listen(
        game: &Rc<RefCell<Game>>,
        target: EventTarget,
        kind: &'static str,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) {
        let closure = Closure::<dyn FnMut(web_sys::Event)>::new(handler);
        let _ = target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref());
        game.borrow_mut().engine.register_teardown(move || {
            let _ = target.remove_event_listener_with_callback(kind, closure.as_ref().unchecked_ref());
        });
    }

    /// Click handler on an element that runs an engine intent
    fn on_click(game: &Rc<RefCell<Game>>, document: &Document, id: &str, intent: impl Fn(&mut Engine) + 'static) {
        let Some(el) = document.get_element_by_id(id) else {
            log::warn!("Missing element #{}", id);
            return;
        };
        let g = game.clone();
        let doc = document.clone();
        let id_owned = id.to_string();
        listen(game, el.into(), "click", move |_event| {
            intent(&mut g.borrow_mut().engine);
            // Modal buttons close their own dialog
            if let Some(el) = doc.get_element_by_id(&id_owned) {
                if let Some(parent) = el.parent_element() {
                    if parent.id() != "hud" {
                        let _ = parent.set_attribute("class", "hidden");
                    }
                }
            }
        });
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        let _ = console_log::init_with_level(log::Level::Info);

        log::info!("Loopfall starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;
        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or("no canvas")?
            .dyn_into()?;

        let storage = LocalStorage::new();
        let settings = Settings::load(&storage);
        let seed = js_sys::Date::now() as u64;
        let tuning = Tuning::default();
        let (arena_w, arena_h) = (tuning.arena_width, tuning.arena_height);

        let mut engine = Engine::new(
            seed,
            tuning,
            Catalog::default(),
            Box::new(storage),
            Box::new(WebAudioSink::new(settings.effective_volume())),
            Box::new(DomHud {
                document: document.clone(),
            }),
        );
        engine.apply_settings(&settings);
        log::info!("Game initialized with seed: {}", seed);

        let game = Rc::new(RefCell::new(Game {
            engine,
            input: InputState::default(),
            last_time: 0.0,
        }));

        // Keyboard
        for (kind, down) in [("keydown", true), ("keyup", false)] {
            let g = game.clone();
            listen(&game, window.clone().into(), kind, move |event| {
                if let Some(event) = event.dyn_ref::<KeyboardEvent>() {
                    if g.borrow_mut().input.keys.set_key(&event.code(), down) {
                        event.prevent_default();
                    }
                }
            });
        }

        // Pointer position in arena coordinates
        {
            let g = game.clone();
            let c = canvas.clone();
            listen(&game, canvas.clone().into(), "mousemove", move |event| {
                if let Some(event) = event.dyn_ref::<MouseEvent>() {
                    let rect = c.get_bounding_client_rect();
                    if rect.width() > 0.0 && rect.height() > 0.0 {
                        let x = (event.client_x() as f64 - rect.left()) / rect.width() * arena_w as f64;
                        let y = (event.client_y() as f64 - rect.top()) / rect.height() * arena_h as f64;
                        g.borrow_mut().input.pointer = glam::Vec2::new(x as f32, y as f32);
                    }
                }
            });
        }

        // Buttons: 0 fires, 2 triggers nova
        for (kind, down) in [("mousedown", true), ("mouseup", false)] {
            let g = game.clone();
            listen(&game, canvas.clone().into(), kind, move |event| {
                if let Some(event) = event.dyn_ref::<MouseEvent>() {
                    let mut g = g.borrow_mut();
                    match event.button() {
                        0 => g.input.fire = down,
                        2 => g.input.secondary = down,
                        _ => {}
                    }
                }
            });
        }
        listen(&game, canvas.clone().into(), "contextmenu", |event| event.prevent_default());

        // Release every held key when focus is lost
        {
            let g = game.clone();
            listen(&game, window.clone().into(), "blur", move |_event| {
                let mut g = g.borrow_mut();
                g.input = InputState::default();
                g.engine.pause();
            });
        }

        // Teardown on page exit; this listener outlives the ones it removes
        {
            let g = game.clone();
            let closure = Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
                g.borrow_mut().engine.stop();
            });
            let _ = window.add_event_listener_with_callback("pagehide", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        on_click(&game, &document, "start-btn", Engine::start);
        on_click(&game, &document, "resume-btn", Engine::resume);
        on_click(&game, &document, "restart-btn", Engine::restart_fresh);
        on_click(&game, &document, "continue-btn", Engine::restart_from_checkpoint);
        on_click(&game, &document, "lore-btn", Engine::dismiss_lore);
        on_click(&game, &document, "story-btn", Engine::dismiss_cutscene);
        for i in 0..3 {
            on_click(&game, &document, &format!("upgrade-{}", i), move |engine| {
                if let Err(err) = engine.select_upgrade(i) {
                    log::warn!("{}", err);
                }
            });
        }

        if game.borrow().engine.has_checkpoint() {
            if let Some(el) = document.get_element_by_id("continue-btn") {
                let _ = el.set_attribute("class", "");
            }
        }

        request_animation_frame(game);
        log::info!("Loopfall running!");
        Ok(())
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
            if g.engine.is_stopped() {
                return;
            }

            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                0.0
            };
            g.last_time = time;

            let input = g.input;
            g.engine.frame(dt, &input);

            if g.engine.phase() == GamePhase::LevelUp {
                let names: Vec<&str> = g.engine.upgrade_choices().iter().map(|u| u.name).collect();
                if let Some(document) = web_sys::window().and_then(|w| w.document()) {
                    for (i, name) in names.iter().enumerate() {
                        if let Some(el) = document.get_element_by_id(&format!("upgrade-{}", i)) {
                            el.set_text_content(Some(name));
                        }
                    }
                }
            }
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run()
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::path::PathBuf;

    use clap::Parser;
    use glam::Vec2;

    use loopfall::catalog::{LoreFragment, StoryBeat};
    use loopfall::sim::GameState;
    use loopfall::{
        Catalog, Engine, EngineCallbacks, FinalStats, GamePhase, InputState, MemoryStorage,
        QualityPreset, Settings, Tuning,
    };

    /// Headless autopilot run, handy for balance checks
    #[derive(Debug, Parser)]
    #[command(name = "loopfall", version, about)]
    pub struct Args {
        /// Seed for the run's RNG
        #[arg(long, default_value_t = 12345)]
        pub seed: u64,
        /// JSON file overriding the default tuning
        #[arg(long)]
        pub tuning: Option<PathBuf>,
        /// Particle quality preset: low, medium or high
        #[arg(long, default_value = "low")]
        pub quality: QualityPreset,
        /// Simulated seconds before giving up
        #[arg(long, default_value_t = 600.0)]
        pub seconds: f32,
    }

    /// Logs the interesting callbacks
    struct LogCallbacks;

    impl EngineCallbacks for LogCallbacks {
        fn on_danger_warning(&mut self) {
            log::debug!("Danger!");
        }

        fn on_game_over(&mut self, stats: FinalStats) {
            log::info!("Game over: score {} on loop {}", stats.score, stats.loop_count);
        }

        fn on_level_up(&mut self) {
            log::debug!("Level up");
        }

        fn on_lore_unlocked(&mut self, fragment: &LoreFragment) {
            log::info!("Lore: {}", fragment.title);
        }

        fn on_story_triggered(&mut self, beat: &StoryBeat) {
            for line in beat.lines {
                log::info!("[{}] {}", beat.speaker, line);
            }
        }
    }

    /// Simple survival policy: kite the nearest enemy and shoot it
    fn autopilot(state: &GameState) -> InputState {
        let player = &state.player;
        let nearest = state
            .enemies
            .iter()
            .min_by(|a, b| {
                a.pos
                    .distance_squared(player.pos)
                    .partial_cmp(&b.pos.distance_squared(player.pos))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

        let mut input = InputState {
            fire: true,
            ..Default::default()
        };
        let Some(target) = nearest else {
            input.pointer = player.pos + Vec2::X;
            return input;
        };
        input.pointer = target.pos;

        let away = player.pos - target.pos;
        let dist = away.length();
        let center = Vec2::new(state.tuning.arena_width, state.tuning.arena_height) / 2.0;
        // Drift back toward the middle so we don't get pinned on a wall
        let desired = away.normalize_or_zero() + (center - player.pos).normalize_or_zero() * 0.6;
        input.keys.right = desired.x > 0.3;
        input.keys.left = desired.x < -0.3;
        input.keys.down = desired.y > 0.3;
        input.keys.up = desired.y < -0.3;
        input.keys.dash = dist < target.radius + player.radius + 40.0;

        let crowd = state
            .enemies
            .iter()
            .filter(|e| e.pos.distance(player.pos) < state.tuning.nova_radius)
            .count();
        input.secondary = crowd >= 3;
        input
    }

    pub fn run(args: Args) {
        let tuning = match &args.tuning {
            Some(path) => Tuning::load(path).unwrap_or_else(|err| {
                log::warn!("Using default tuning: {}", err);
                Tuning::default()
            }),
            None => Tuning::default(),
        };

        let mut engine = Engine::new(
            args.seed,
            tuning,
            Catalog::default(),
            Box::new(MemoryStorage::new()),
            Box::new(loopfall::audio::NullSink),
            Box::new(LogCallbacks),
        );
        engine.apply_settings(&Settings::from_preset(args.quality));
        engine.start();

        let frame_dt = 1.0 / 60.0;
        let mut elapsed = 0.0;
        while elapsed < args.seconds {
            match engine.phase() {
                GamePhase::Cutscene { .. } => engine.dismiss_cutscene(),
                GamePhase::Paused(_) => {
                    engine.dismiss_lore();
                    engine.resume();
                }
                GamePhase::LevelUp => {
                    if let Some(name) = engine.upgrade_choices().first().map(|u| u.name) {
                        log::info!("Autopilot takes {}", name);
                    }
                    if let Err(err) = engine.select_upgrade(0) {
                        log::warn!("{}", err);
                        break;
                    }
                }
                GamePhase::GameOver | GamePhase::Menu => break,
                GamePhase::Playing => {}
            }
            let input = autopilot(engine.state());
            engine.frame(frame_dt, &input);
            elapsed += frame_dt;
        }

        let state = engine.state();
        println!(
            "seed {} | loop {} | score {} | upgrades {} | hp {:.0}/{:.0} | {:.0}s",
            args.seed,
            state.loop_count,
            state.score,
            state.upgrades_taken,
            state.player.hp,
            state.player.max_hp,
            elapsed
        );
        engine.stop();
    }

}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Loopfall (native, headless) starting...");
    let args = headless::Args::parse();
    headless::run(args);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
