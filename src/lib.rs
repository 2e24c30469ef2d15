//! Ace Craft - a vertical arcade shooter
//!
//! Core modules:
//! - `sim`: Simulation core (entities, spawning, per-frame tick, collisions)
//! - `progression`: Ship catalog, upgrades and the persisted progress record
//! - `achievements`: Achievement definitions and the persisted unlock store
//! - `persistence`: Typed JSON load/save with corruption recovery
//! - `platform`: Browser/native storage and input arbitration
//! - `session`: Run lifecycle and the fixed-cadence driver

pub mod achievements;
pub mod error;
pub mod highscores;
pub mod persistence;
pub mod platform;
pub mod progression;
pub mod session;
pub mod settings;
pub mod sim;

pub use achievements::{AchievementId, AchievementStore};
pub use error::{HangarError, StorageError};
pub use highscores::HighScores;
pub use progression::{ProgressionRecord, ShipId, ShipStats};
pub use session::{RunPhase, Session};
pub use settings::{Difficulty, Settings};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Display cadence the movement constants are tuned for
    pub const FRAME_RATE: f32 = 60.0;
    /// Fixed simulation timestep
    pub const SIM_DT: f32 = 1.0 / FRAME_RATE;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Default play area (overridden by the canvas size)
    pub const DEFAULT_PLAY_WIDTH: f32 = 800.0;
    pub const DEFAULT_PLAY_HEIGHT: f32 = 600.0;
    /// Projectiles may drift this far outside the play area before culling
    pub const OFFSCREEN_MARGIN: f32 = 20.0;

    /// Player defaults
    pub const PLAYER_SIZE: f32 = 50.0;
    pub const PLAYER_MAX_HEALTH: f32 = 100.0;
    pub const PLAYER_START_OFFSET_Y: f32 = 100.0;
    /// Collision rectangle as a fraction of the sprite box
    pub const PLAYER_HITBOX_SCALE: f32 = 0.6;
    pub const MAX_SPECIAL: f32 = 100.0;

    /// Damage dealt to the player
    pub const BOSS_PROJECTILE_DAMAGE: f32 = 10.0;
    pub const MINION_PROJECTILE_DAMAGE: f32 = 5.0;
    pub const KAMIKAZE_DAMAGE: f32 = 25.0;

    /// Timed buffs (ms)
    pub const TRIPLE_SHOT_DURATION_MS: f64 = 10_000.0;
    pub const SHIELD_DURATION_MS: f64 = 8_000.0;
    pub const LASER_DURATION_MS: f64 = 3_000.0;
    pub const HOMING_DURATION_MS: f64 = 2_000.0;
    pub const HEALTH_PICKUP_AMOUNT: f32 = 25.0;

    /// Laser beam
    pub const LASER_WIDTH: f32 = 10.0;
    pub const LASER_DAMAGE_PER_TICK: f32 = 2.0;
    /// Ticks for a full meter to drain while the beam is live
    pub const LASER_DRAIN_TICKS: f32 = 180.0;

    /// Special meter gain per bullet hit
    pub const METER_GAIN_BOSS_HIT: f32 = 0.5;
    pub const METER_GAIN_MINION_HIT: f32 = 1.0;

    /// Combo window (seconds) and score/credit rewards
    pub const COMBO_WINDOW_SECS: f32 = 3.0;
    pub const COMBO_STEP: u32 = 5;
    pub const MINION_SCORE: u64 = 50;
    pub const BOSS_SCORE: u64 = 1000;
    pub const MINION_CREDITS: f64 = 1.0;
    pub const BOSS_CREDITS: f64 = 50.0;

    /// Minion spawning
    pub const MINION_SPAWN_CHANCE: f64 = 0.015;
    pub const MAX_MINIONS: usize = 5;
    pub const MINION_SPAWN_Y: f32 = 120.0;
    pub const KAMIKAZE_SPEED: f32 = 5.0;

    /// Power-up drops
    pub const POWER_UP_DROP_CHANCE: f64 = 0.15;
    pub const POWER_UP_SIZE: f32 = 30.0;
    pub const POWER_UP_LARGE_SIZE: f32 = 64.0;
    pub const POWER_UP_FALL_SPEED: f32 = 2.0;

    /// Companion drone
    pub const COMPANION_SIZE: f32 = 20.0;
    pub const COMPANION_DAMAGE: f32 = 5.0;
    pub const COMPANION_SHOOT_INTERVAL_MS: f64 = 600.0;
    pub const COMPANION_LIFETIME_MS: f64 = 15_000.0;
    pub const COMPANION_LERP: f32 = 0.1;

    /// Boss base speed of its projectiles (scaled by difficulty)
    pub const BOSS_PROJECTILE_SPEED: f32 = 4.0;
    pub const BOSS_SPAWN_Y: f32 = 50.0;
    pub const PHASE_TWO_SPEED_BOOST: f32 = 1.5;
    pub const PHASE_TWO_INTERVAL_SCALE: f64 = 0.7;
    pub const TELEPORT_INTERVAL_MS: f64 = 2_500.0;
    pub const STREAM_SHOT_GAP_MS: f64 = 120.0;
    pub const WALL_SLOT_WIDTH: f32 = 60.0;
    pub const SHOTGUN_PELLETS: u32 = 8;
    pub const SHOTGUN_PELLETS_TOUCH: u32 = 5;
    pub const SHOTGUN_SPREAD: f32 = 0.6;

    /// Decorative starfield
    pub const STAR_COUNT: usize = 100;
}

/// Center of an axis-aligned box given its top-left corner and extents
#[inline]
pub fn box_center(top_left: Vec2, width: f32, height: f32) -> Vec2 {
    top_left + Vec2::new(width / 2.0, height / 2.0)
}

/// Unit vector pointing at `angle` radians (screen space, +y down)
#[inline]
pub fn direction_from_angle(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Angle of the vector from `from` to `to`
#[inline]
pub fn angle_between(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    d.y.atan2(d.x)
}
