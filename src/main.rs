//! Ace Craft entry point
//!
//! On the web this exposes a thin bridge the page script drives once per
//! animation frame. Natively it flies a headless autopilot run and logs the
//! result.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use ace_craft::platform::{InputTracker, LocalStorage};
    use ace_craft::sim::Direction;
    use ace_craft::{RunPhase, Session};
    use glam::Vec2;
    use wasm_bindgen::prelude::*;

    fn direction_for_key(code: &str) -> Option<Direction> {
        match code {
            "ArrowUp" | "KeyW" => Some(Direction::Up),
            "ArrowDown" | "KeyS" => Some(Direction::Down),
            "ArrowLeft" | "KeyA" => Some(Direction::Left),
            "ArrowRight" | "KeyD" => Some(Direction::Right),
            _ => None,
        }
    }

    /// Session plus raw input, owned by the page
    #[wasm_bindgen]
    pub struct AceCraft {
        session: Session<LocalStorage>,
        input: InputTracker,
        last_time: f64,
    }

    #[wasm_bindgen]
    impl AceCraft {
        #[wasm_bindgen(constructor)]
        pub fn new(width: f32, height: f32) -> AceCraft {
            let mut session = Session::new(LocalStorage);
            session.set_play_area(width, height);
            log::info!("Ace Craft ready ({}x{})", width, height);
            AceCraft {
                session,
                input: InputTracker::new(),
                last_time: 0.0,
            }
        }

        pub fn start_run(&mut self) {
            self.session.start_run(js_sys::Date::now() as u64);
            self.last_time = 0.0;
        }

        pub fn assets_loaded(&mut self) {
            self.session.finish_loading();
        }

        /// Called from requestAnimationFrame with its timestamp (ms)
        pub fn frame(&mut self, time: f64) {
            let dt = if self.last_time > 0.0 {
                ((time - self.last_time) / 1000.0) as f32
            } else {
                0.0
            };
            self.last_time = time;
            let input = self.input.take();
            self.session.update(dt, input);
        }

        /// Current render view as JSON, or null between runs
        pub fn snapshot(&self) -> String {
            self.session
                .snapshot()
                .and_then(|s| serde_json::to_string(&s).ok())
                .unwrap_or_else(|| "null".to_string())
        }

        pub fn phase(&self) -> String {
            format!("{:?}", self.session.phase())
        }

        pub fn pointer_moved(&mut self, x: f32, y: f32) {
            self.input.pointer_moved(Vec2::new(x, y));
        }

        pub fn touch_moved(&mut self, dx: f32, dy: f32) {
            self.input.drag(Vec2::new(dx, dy));
        }

        pub fn key_down(&mut self, code: &str) {
            match code {
                "Space" => self.input.special_pressed(),
                "Escape" | "KeyP" => self.toggle_pause(),
                _ => {
                    if let Some(direction) = direction_for_key(code) {
                        self.input.key_down(direction);
                    }
                }
            }
        }

        pub fn key_up(&mut self, code: &str) {
            if let Some(direction) = direction_for_key(code) {
                self.input.key_up(direction);
            }
        }

        pub fn fire_special(&mut self) {
            self.input.special_pressed();
        }

        pub fn toggle_pause(&mut self) {
            self.session.toggle_pause();
            match self.session.phase() {
                RunPhase::Paused => self.input.pause(),
                _ => self.input.resume(),
            }
        }

        /// Tab hidden or window blurred
        pub fn auto_pause(&mut self) {
            if self.session.phase() == RunPhase::Running {
                self.toggle_pause();
                log::info!("Auto-paused");
            }
        }

        pub fn return_to_menu(&mut self) {
            self.session.return_to_menu();
            self.input.resume();
        }

        pub fn purchase_ship(&mut self, id: &str) -> Result<(), JsValue> {
            self.session
                .purchase_ship(id)
                .map_err(|e| JsValue::from_str(&e.to_string()))
        }

        pub fn select_ship(&mut self, id: &str) -> Result<(), JsValue> {
            self.session
                .select_ship(id)
                .map_err(|e| JsValue::from_str(&e.to_string()))
        }

        pub fn purchase_upgrade(&mut self, ship: &str, key: &str) -> Result<u32, JsValue> {
            self.session
                .purchase_upgrade(ship, key)
                .map_err(|e| JsValue::from_str(&e.to_string()))
        }

        pub fn currency(&self) -> f64 {
            self.session.progress.currency as f64
        }

        /// Leaderboard as a JSON array
        pub fn high_scores(&self) -> String {
            serde_json::to_string(&self.session.high_scores).unwrap_or_else(|_| "[]".to_string())
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
    log::info!("Ace Craft (web) starting...");
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use ace_craft::platform::{FileStorage, MemoryStorage, Storage};

    env_logger::init();
    log::info!("Ace Craft (native) starting...");

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(42);

    // Persist between runs only when a save directory is given
    match std::env::var("ACE_CRAFT_SAVE_DIR") {
        Ok(dir) => autopilot(FileStorage::new(dir), seed),
        Err(_) => autopilot(MemoryStorage::new(), seed),
    }

    fn autopilot<S: Storage>(storage: S, seed: u64) {
        use ace_craft::consts::SIM_DT;
        use ace_craft::sim::{ControlInput, TickInput};
        use ace_craft::{RunPhase, Session};

        const MAX_FRAMES: u32 = 60 * 60 * 10;

        let mut session = Session::new(storage);
        session.settings.skip_countdown = true;
        session.start_run(seed);
        session.finish_loading();

        for _ in 0..MAX_FRAMES {
            if session.phase() != RunPhase::Running {
                break;
            }
            let Some(state) = session.state() else {
                break;
            };

            // Shadow the boss from below and fire the laser whenever it is ready
            let target = glam::Vec2::new(state.boss.center().x, state.play.height - 80.0);
            let input = TickInput {
                control: ControlInput::Pointer(target),
                fire_special: state.player.special_ready(),
            };
            session.update(SIM_DT, input);
        }

        match session.summary() {
            Some(summary) => {
                println!(
                    "Seed {}: {} points, level {}, {} credits, rank {:?}",
                    seed, summary.score, summary.level, summary.credits, summary.rank
                );
                for id in &summary.achievements {
                    println!("  unlocked {}", id.title());
                }
            }
            None => {
                let (score, level) = session
                    .state()
                    .map(|s| (s.score, s.level))
                    .unwrap_or_default();
                println!("Seed {}: still flying after the time limit, {} points at level {}", seed, score, level);
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
