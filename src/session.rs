//! Run lifecycle and the fixed-cadence driver
//!
//! A [`Session`] owns the storage backend, the persisted tables and at most one
//! run. The frame loop feeds it real elapsed time; it runs whole 60 Hz ticks,
//! pays out achievement rewards as they unlock and banks the run exactly once
//! when the player dies.

use crate::achievements::{AchievementId, AchievementStore};
use crate::consts::*;
use crate::error::HangarError;
use crate::highscores::HighScores;
use crate::platform::Storage;
use crate::progression::{ProgressionRecord, ShipStats};
use crate::settings::Settings;
use crate::sim::{ControlInput, PlayArea, RunConfig, SimEvent, SimulationState, Snapshot, TickInput, tick};

/// Pre-run countdown length
pub const COUNTDOWN_MS: f64 = 3000.0;

/// Longest frame the driver will simulate (seconds)
pub const MAX_FRAME_DT: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunPhase {
    /// Menu
    Idle,
    /// Waiting for assets
    Loading,
    Countdown { remaining_ms: f64 },
    Running,
    Paused,
    /// Results screen; left only through [`Session::return_to_menu`]
    GameOver,
}

/// What the results screen shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub score: u64,
    pub level: u32,
    /// Credits banked into the profile (floored)
    pub credits: u64,
    /// Leaderboard rank, if the score made the board
    pub rank: Option<usize>,
    /// Achievements unlocked during this run
    pub achievements: Vec<AchievementId>,
}

pub struct Session<S: Storage> {
    storage: S,
    pub settings: Settings,
    pub progress: ProgressionRecord,
    pub achievements: AchievementStore,
    pub high_scores: HighScores,
    play: PlayArea,
    phase: RunPhase,
    state: Option<SimulationState>,
    accumulator: f32,
    run_achievements: Vec<AchievementId>,
    summary: Option<RunSummary>,
}

impl<S: Storage> Session<S> {
    /// Load every persisted table from `storage`
    pub fn new(storage: S) -> Self {
        let settings = Settings::load(&storage);
        let progress = ProgressionRecord::load(&storage);
        let achievements = AchievementStore::load(&storage);
        let high_scores = HighScores::load(&storage);
        Self {
            storage,
            settings,
            progress,
            achievements,
            high_scores,
            play: PlayArea::default(),
            phase: RunPhase::Idle,
            state: None,
            accumulator: 0.0,
            run_achievements: Vec::new(),
            summary: None,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn state(&self) -> Option<&SimulationState> {
        self.state.as_ref()
    }

    pub fn state_mut(&mut self) -> Option<&mut SimulationState> {
        self.state.as_mut()
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        self.summary.as_ref()
    }

    /// Render view of the current run
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.state.as_ref().map(Snapshot::capture)
    }

    /// Canvas size for the next run
    pub fn set_play_area(&mut self, width: f32, height: f32) {
        if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
            self.play = PlayArea { width, height };
        }
    }

    /// Reset everything and build a new run from the saved profile
    pub fn start_run(&mut self, seed: u64) {
        if !matches!(self.phase, RunPhase::Idle | RunPhase::GameOver) {
            log::warn!("Ignoring start_run while {:?}", self.phase);
            return;
        }

        let stats = ShipStats::derive(&self.progress);
        let difficulty = self.settings.difficulty;
        self.state = Some(SimulationState::new(RunConfig {
            seed,
            difficulty: difficulty.multiplier(),
            stats,
            play: self.play,
            touch_controls: self.settings.touch_controls,
            unlocked_achievements: self.achievements.unlocked_set(),
        }));
        self.accumulator = 0.0;
        self.run_achievements.clear();
        self.summary = None;
        self.phase = RunPhase::Loading;
        log::info!(
            "Run started: seed {}, {} difficulty, ship {}",
            seed,
            difficulty.as_str(),
            self.progress.selected().def().name
        );
    }

    /// Assets are ready; begin the countdown
    pub fn finish_loading(&mut self) {
        if self.phase != RunPhase::Loading {
            return;
        }
        self.phase = if self.settings.skip_countdown {
            RunPhase::Running
        } else {
            RunPhase::Countdown {
                remaining_ms: COUNTDOWN_MS,
            }
        };
    }

    /// Advance by one rendered frame; returns the number of ticks run
    pub fn update(&mut self, frame_dt: f32, input: TickInput) -> u32 {
        let frame_dt = if frame_dt.is_finite() {
            frame_dt.clamp(0.0, MAX_FRAME_DT)
        } else {
            0.0
        };

        match self.phase {
            RunPhase::Countdown { remaining_ms } => {
                let remaining_ms = remaining_ms - frame_dt as f64 * 1000.0;
                self.phase = if remaining_ms <= 0.0 {
                    self.accumulator = 0.0;
                    RunPhase::Running
                } else {
                    RunPhase::Countdown { remaining_ms }
                };
                0
            }
            RunPhase::Running => self.run_ticks(frame_dt, input),
            _ => 0,
        }
    }

    fn run_ticks(&mut self, frame_dt: f32, input: TickInput) -> u32 {
        self.accumulator += frame_dt;

        let mut input = input;
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let Some(state) = self.state.as_mut() else {
                break;
            };
            tick(state, &input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;

            // One-shot inputs apply to the first substep only
            input.fire_special = false;
            if let ControlInput::Drag(_) = input.control {
                input.control = ControlInput::Drag(glam::Vec2::ZERO);
            }

            if self.handle_events() {
                break;
            }
        }
        substeps
    }

    /// Apply this tick's events; returns true once the run is over
    fn handle_events(&mut self) -> bool {
        let events = match self.state.as_mut() {
            Some(state) => state.drain_events(),
            None => return false,
        };

        let mut over = false;
        for event in events {
            match event {
                SimEvent::AchievementUnlocked { id } => self.reward_achievement(id),
                SimEvent::GameOver { .. } => over = true,
                _ => {}
            }
        }
        if over {
            self.finish_run();
        }
        over
    }

    fn reward_achievement(&mut self, id: AchievementId) {
        if !self.achievements.unlock(id) {
            return;
        }
        self.progress.credit(id.reward());
        self.run_achievements.push(id);
        log::info!("{} unlocked (+{} credits)", id.title(), id.reward());

        if let Err(e) = self.achievements.save(&mut self.storage) {
            log::warn!("Failed to save achievements: {}", e);
        }
        if let Err(e) = self.progress.save(&mut self.storage) {
            log::warn!("Failed to save progress: {}", e);
        }
    }

    /// Bank credits and record the score; runs once per run
    fn finish_run(&mut self) {
        if self.phase != RunPhase::Running {
            return;
        }
        let Some(state) = self.state.as_ref() else {
            return;
        };
        self.phase = RunPhase::GameOver;

        let credits = state.banked_credits();
        let (score, level) = (state.score, state.level);
        self.progress.credit(credits);
        if let Err(e) = self.progress.save(&mut self.storage) {
            log::warn!("Failed to save progress: {}", e);
        }

        let rank = self.high_scores.add_score(&self.settings.effective_pilot_name(), score);
        if rank.is_some() {
            if let Err(e) = self.high_scores.save(&mut self.storage) {
                log::warn!("Failed to save high scores: {}", e);
            }
        }

        log::info!(
            "Run over: {} points, level {}, {} credits banked, rank {:?}",
            score,
            level,
            credits,
            rank
        );
        self.summary = Some(RunSummary {
            score,
            level,
            credits,
            rank,
            achievements: std::mem::take(&mut self.run_achievements),
        });
    }

    /// Freeze or resume the simulation; input handling stays live
    pub fn toggle_pause(&mut self) {
        self.phase = match self.phase {
            RunPhase::Running => RunPhase::Paused,
            RunPhase::Paused => {
                self.accumulator = 0.0;
                RunPhase::Running
            }
            other => other,
        };
    }

    /// Drop the current run and go back to the menu
    pub fn return_to_menu(&mut self) {
        if matches!(self.phase, RunPhase::Running | RunPhase::Paused) {
            log::info!("Run abandoned");
        }
        self.state = None;
        self.phase = RunPhase::Idle;
        self.accumulator = 0.0;
    }

    pub fn purchase_ship(&mut self, id: &str) -> Result<(), HangarError> {
        self.progress.purchase_ship(id)?;
        self.save_progress();
        Ok(())
    }

    pub fn select_ship(&mut self, id: &str) -> Result<(), HangarError> {
        self.progress.select_ship(id)?;
        self.save_progress();
        Ok(())
    }

    pub fn purchase_upgrade(&mut self, ship: &str, key: &str) -> Result<u32, HangarError> {
        let level = self.progress.purchase_upgrade(ship, key)?;
        self.save_progress();
        Ok(level)
    }

    pub fn save_settings(&mut self) {
        if let Err(e) = self.settings.save(&mut self.storage) {
            log::warn!("Failed to save settings: {}", e);
        }
    }

    fn save_progress(&mut self) {
        if let Err(e) = self.progress.save(&mut self.storage) {
            log::warn!("Failed to save progress: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::PROGRESS_KEY;
    use crate::platform::MemoryStorage;
    use crate::sim::state::BossProjectile;
    use glam::Vec2;

    fn running_session() -> Session<MemoryStorage> {
        let mut session = Session::new(MemoryStorage::new());
        session.settings.skip_countdown = true;
        session.start_run(7);
        session.finish_loading();
        assert_eq!(session.phase(), RunPhase::Running);
        session
    }

    fn kill_player(session: &mut Session<MemoryStorage>) {
        let state = session.state_mut().unwrap();
        state.player.health = 5.0;
        let target = state.player.center();
        state.boss_projectiles.push(BossProjectile {
            pos: target,
            radius: 8.0,
            vel: Vec2::ZERO,
            homing_until: None,
            active: true,
        });
    }

    #[test]
    fn test_countdown_then_running() {
        let mut session = Session::new(MemoryStorage::new());
        assert_eq!(session.phase(), RunPhase::Idle);
        session.start_run(1);
        assert_eq!(session.phase(), RunPhase::Loading);
        session.finish_loading();
        assert_eq!(session.phase(), RunPhase::Countdown { remaining_ms: COUNTDOWN_MS });

        // Frames are capped at 0.1s, so 3s takes at least 30 of them
        for _ in 0..29 {
            assert_eq!(session.update(1.0, TickInput::default()), 0);
        }
        assert!(matches!(session.phase(), RunPhase::Countdown { .. }));
        assert_eq!(session.update(0.1, TickInput::default()), 0);
        assert_eq!(session.phase(), RunPhase::Running);
        assert_eq!(session.state().unwrap().tick, 0);
    }

    #[test]
    fn test_substeps_are_bounded() {
        let mut session = running_session();
        let ran = session.update(5.0, TickInput::default());
        assert!(ran >= 5 && ran <= MAX_SUBSTEPS);
        assert_eq!(session.state().unwrap().tick, ran as u64);

        // Leftover time carries into the next frame
        let before = session.state().unwrap().tick;
        session.update(SIM_DT / 2.0, TickInput::default());
        session.update(SIM_DT / 2.0, TickInput::default());
        assert!(session.state().unwrap().tick > before);
    }

    #[test]
    fn test_pause_freezes_ticks() {
        let mut session = running_session();
        session.toggle_pause();
        assert_eq!(session.phase(), RunPhase::Paused);
        assert_eq!(session.update(0.1, TickInput::default()), 0);
        session.toggle_pause();
        assert_eq!(session.phase(), RunPhase::Running);
        assert!(session.update(0.1, TickInput::default()) > 0);
    }

    #[test]
    fn test_game_over_banks_once() {
        let mut session = running_session();
        session.settings.pilot_name = "MAV".into();
        {
            let state = session.state_mut().unwrap();
            state.credits_earned = 123.9;
            state.score = 200_000;
        }
        kill_player(&mut session);
        session.update(SIM_DT * 1.5, TickInput::default());

        assert_eq!(session.phase(), RunPhase::GameOver);
        assert_eq!(session.progress.currency, 123);
        assert_eq!(session.high_scores.top_score(), Some(200_000));
        assert_eq!(session.high_scores.entries[0].name, "MAV");
        let summary = session.summary().unwrap().clone();
        assert_eq!(summary.rank, Some(1));
        assert_eq!(summary.credits, 123);

        // Further frames change nothing
        session.update(0.1, TickInput::default());
        assert_eq!(session.progress.currency, 123);
        assert_eq!(
            session.high_scores.entries.iter().filter(|e| e.score == 200_000).count(),
            1
        );

        let saved = ProgressionRecord::load(session.storage());
        assert_eq!(saved.currency, 123);
        assert!(session.storage().get_item(PROGRESS_KEY).is_some());
    }

    #[test]
    fn test_achievement_pays_reward() {
        let mut session = running_session();
        session.state_mut().unwrap().boss.health = 0.0;
        session.update(SIM_DT * 1.5, TickInput::default());

        assert!(session.achievements.is_unlocked(AchievementId::NoHitBoss));
        assert_eq!(session.progress.currency, AchievementId::NoHitBoss.reward());
        let stored = AchievementStore::load(session.storage());
        assert!(stored.is_unlocked(AchievementId::NoHitBoss));
    }

    #[test]
    fn test_persisted_unlock_not_paid_twice() {
        let mut session = running_session();
        session.state_mut().unwrap().boss.health = 0.0;
        session.update(SIM_DT * 1.5, TickInput::default());
        let paid = session.progress.currency;

        session.return_to_menu();
        session.start_run(8);
        session.finish_loading();
        session.state_mut().unwrap().boss.health = 0.0;
        session.update(SIM_DT * 1.5, TickInput::default());
        assert_eq!(session.progress.currency, paid);
    }

    #[test]
    fn test_run_uses_selected_ship() {
        let mut session = Session::new(MemoryStorage::new());
        session.progress.credit(1000);
        session.purchase_ship("striker").unwrap();
        session.select_ship("striker").unwrap();
        session.settings.skip_countdown = true;
        session.start_run(3);
        let state = session.state().unwrap();
        assert_eq!(state.player.damage, 12.0);
        assert_eq!(state.player.side_damage, 4.0);
        assert_eq!(ProgressionRecord::load(session.storage()).selected_ship, "striker");
    }

    #[test]
    fn test_start_ignored_mid_run() {
        let mut session = running_session();
        session.update(0.1, TickInput::default());
        let tick_count = session.state().unwrap().tick;
        session.start_run(99);
        assert_eq!(session.state().unwrap().tick, tick_count);
        assert_eq!(session.state().unwrap().seed, 7);
    }
}
