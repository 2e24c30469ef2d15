//! Simulation state and entity records
//!
//! Entities are plain records with an `active` flag. Nothing is removed while a
//! tick is iterating; the tick compacts every collection once at the very end.

use std::collections::BTreeSet;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::{Aabb, Bounded, Circle};
use super::event::SimEvent;
use super::spawn;
use crate::achievements::AchievementId;
use crate::consts::*;
use crate::progression::{FirePattern, ShipStats};

/// Boss attack patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackPattern {
    /// 3 aimed shots in a 0.25 rad fan
    Burst,
    /// 4 shots 90° apart, rotating each volley
    Spiral,
    /// 1 shot that re-aims at the player for a while
    Homing,
    /// 3 aimed shots released one after another
    Stream,
    /// A row across the play area with one gap
    Walls,
    /// Wide random spread
    Shotgun,
}

/// How a boss moves once phase two starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseTwoMovement {
    /// Keep sliding toward the player's x
    Track,
    /// Jump to a random x on a timer
    Teleport,
}

/// Minion archetypes, picked by the current boss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MinionKind {
    Standard,
    Fast,
    Tank,
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    TripleShot,
    Shield,
    Bomb,
    Health,
    Companion,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 5] = [
        PowerUpKind::TripleShot,
        PowerUpKind::Shield,
        PowerUpKind::Bomb,
        PowerUpKind::Health,
        PowerUpKind::Companion,
    ];

    /// Pickup box edge length
    pub fn size(self) -> f32 {
        match self {
            PowerUpKind::Health | PowerUpKind::Companion => POWER_UP_LARGE_SIZE,
            _ => POWER_UP_SIZE,
        }
    }
}

/// Size of the play area in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayArea {
    pub width: f32,
    pub height: f32,
}

impl Default for PlayArea {
    fn default() -> Self {
        Self {
            width: DEFAULT_PLAY_WIDTH,
            height: DEFAULT_PLAY_HEIGHT,
        }
    }
}

/// The player's ship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Top-left corner of the sprite box
    pub pos: Vec2,
    pub size: f32,
    pub health: f32,
    pub max_health: f32,
    pub speed: f32,
    pub damage: f32,
    pub side_damage: f32,
    pub spread_angle: f32,
    pub fire_pattern: FirePattern,
    pub shoot_interval_ms: f64,
    pub last_shot_ms: f64,
    pub shield_expires_at: f64,
    pub triple_shot_expires_at: f64,
    pub laser_expires_at: f64,
    pub is_firing_laser: bool,
    pub special_meter: f32,
    pub max_special: f32,
    /// Collision rectangle scale relative to `size`
    pub hitbox_scale: f32,
}

impl Player {
    pub fn new(stats: &ShipStats, play: PlayArea) -> Self {
        Self {
            pos: Vec2::new(
                play.width / 2.0 - PLAYER_SIZE / 2.0,
                play.height - PLAYER_START_OFFSET_Y,
            ),
            size: PLAYER_SIZE,
            health: PLAYER_MAX_HEALTH,
            max_health: PLAYER_MAX_HEALTH,
            speed: stats.speed,
            damage: stats.damage,
            side_damage: stats.side_damage,
            spread_angle: stats.spread_angle,
            fire_pattern: stats.fire_pattern,
            shoot_interval_ms: stats.shoot_interval_ms,
            last_shot_ms: 0.0,
            shield_expires_at: 0.0,
            triple_shot_expires_at: 0.0,
            laser_expires_at: 0.0,
            is_firing_laser: false,
            special_meter: 0.0,
            max_special: MAX_SPECIAL,
            hitbox_scale: PLAYER_HITBOX_SCALE,
        }
    }

    pub fn center(&self) -> Vec2 {
        self.pos + Vec2::splat(self.size / 2.0)
    }

    /// Shrunk collision rectangle used for projectile hits
    pub fn hitbox(&self) -> Aabb {
        self.bounds().shrunk(self.hitbox_scale)
    }

    #[inline]
    pub fn shield_active(&self, now: f64) -> bool {
        now < self.shield_expires_at
    }

    #[inline]
    pub fn triple_shot_active(&self, now: f64) -> bool {
        now < self.triple_shot_expires_at
    }

    pub fn special_ready(&self) -> bool {
        self.special_meter >= self.max_special
    }
}

impl Bounded for Player {
    fn bounds(&self) -> Aabb {
        Aabb::square(self.pos, self.size)
    }
}

/// Roster entry a boss is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BossKind {
    Guardian,
    Invader,
    Predator,
}

/// The boss currently on screen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Boss {
    pub kind: BossKind,
    pub pos: Vec2,
    pub width: f32,
    pub height: f32,
    pub health: f32,
    pub max_health: f32,
    pub speed: f32,
    pub shoot_interval_ms: f64,
    pub last_shot_ms: f64,
    pub attack: AttackPattern,
    pub phase_two_attack: AttackPattern,
    pub phase_two_movement: PhaseTwoMovement,
    pub minion_kind: MinionKind,
    pub phase_two: bool,
    pub spiral_angle: f32,
    /// Slot index left open by the next `Walls` volley
    pub wall_gap: u32,
    pub next_teleport_ms: f64,
    /// Absolute release times of queued `Stream` shots
    pub pending_stream: Vec<f64>,
}

impl Boss {
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub fn center(&self) -> Vec2 {
        self.pos + Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Where projectiles leave the hull (bottom center)
    pub fn muzzle(&self) -> Vec2 {
        self.pos + Vec2::new(self.width / 2.0, self.height)
    }
}

impl Bounded for Boss {
    fn bounds(&self) -> Aabb {
        Aabb::new(self.pos.x, self.pos.y, self.width, self.height)
    }
}

/// A minion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Minion {
    pub kind: MinionKind,
    pub pos: Vec2,
    pub size: f32,
    pub health: f32,
    /// Only armored minions carry a health bar
    pub max_health: Option<f32>,
    pub speed_x: f32,
    pub shoot_interval_ms: f64,
    pub last_shot_ms: f64,
    /// Straight-line velocity once converted to a kamikaze
    pub kamikaze: Option<Vec2>,
    pub active: bool,
}

impl Minion {
    pub fn center(&self) -> Vec2 {
        self.pos + Vec2::splat(self.size / 2.0)
    }
}

impl Bounded for Minion {
    fn bounds(&self) -> Aabb {
        Aabb::square(self.pos, self.size)
    }
}

/// Bullet fired by the player's ship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerBullet {
    pub pos: Vec2,
    pub radius: f32,
    pub speed: f32,
    /// Deviation from straight up (radians)
    pub angle: f32,
    /// Damage captured when the bullet was fired
    pub damage: f32,
    /// Side-turret shots drift sideways in this direction (-1 or 1)
    pub side: Option<f32>,
    pub active: bool,
}

impl PlayerBullet {
    pub fn circle(&self) -> Circle {
        Circle::new(self.pos, self.radius)
    }
}

/// Projectile fired by the boss
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BossProjectile {
    pub pos: Vec2,
    pub radius: f32,
    pub vel: Vec2,
    /// Re-aims at the player until this time
    pub homing_until: Option<f64>,
    pub active: bool,
}

impl BossProjectile {
    pub fn circle(&self) -> Circle {
        Circle::new(self.pos, self.radius)
    }

    pub fn is_homing(&self, now: f64) -> bool {
        self.homing_until.is_some_and(|t| now < t)
    }
}

/// Projectile dropped by a minion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinionProjectile {
    pub pos: Vec2,
    pub radius: f32,
    pub speed: f32,
    pub active: bool,
}

impl MinionProjectile {
    pub fn circle(&self) -> Circle {
        Circle::new(self.pos, self.radius)
    }
}

/// Bullet fired by the companion drone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanionBullet {
    pub pos: Vec2,
    pub radius: f32,
    pub speed: f32,
    pub damage: f32,
    pub active: bool,
}

impl CompanionBullet {
    pub fn circle(&self) -> Circle {
        Circle::new(self.pos, self.radius)
    }
}

/// A falling power-up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUp {
    pub kind: PowerUpKind,
    pub pos: Vec2,
    pub size: f32,
    pub speed: f32,
    pub active: bool,
}

impl Bounded for PowerUp {
    fn bounds(&self) -> Aabb {
        Aabb::square(self.pos, self.size)
    }
}

/// Cosmetic blast ring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explosion {
    pub pos: Vec2,
    pub radius: f32,
    pub alpha: f32,
    pub active: bool,
}

impl Explosion {
    pub fn new(pos: Vec2, radius: f32) -> Self {
        Self {
            pos,
            radius,
            alpha: 1.0,
            active: true,
        }
    }
}

/// Ally drone that trails the player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Companion {
    pub pos: Vec2,
    pub size: f32,
    pub damage: f32,
    pub shoot_interval_ms: f64,
    pub last_shot_ms: f64,
    pub expires_at: f64,
}

/// Kill streak
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Combo {
    pub count: u32,
    pub multiplier: u32,
    /// Seconds left before the streak resets
    pub timer: f32,
}

impl Default for Combo {
    fn default() -> Self {
        Self {
            count: 0,
            multiplier: 1,
            timer: 0.0,
        }
    }
}

impl Combo {
    /// Register a kill and refresh the window
    pub fn advance(&mut self) {
        self.count += 1;
        self.timer = COMBO_WINDOW_SECS;
        self.multiplier = 1 + self.count / COMBO_STEP;
    }

    /// Count down the window; returns true if the streak just reset
    pub fn decay(&mut self, dt: f32) -> bool {
        if self.timer > 0.0 {
            self.timer -= dt;
            if self.timer <= 0.0 {
                *self = Self::default();
                return true;
            }
        }
        false
    }
}

/// Background star (cosmetic)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Star {
    pub pos: Vec2,
    pub size: f32,
    pub speed: f32,
}

/// Per-run counters feeding achievement checks
#[derive(Debug, Clone, Default)]
pub struct RunProgress {
    pub kills: u32,
    pub power_ups_used: BTreeSet<PowerUpKind>,
    pub laser_uses: u32,
    pub bosses_defeated: u32,
    /// Achievements already unlocked (persisted ones included)
    pub unlocked: BTreeSet<AchievementId>,
}

/// Everything needed to start a run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub seed: u64,
    pub difficulty: f32,
    pub stats: ShipStats,
    pub play: PlayArea,
    /// Touch devices get fewer shotgun pellets
    pub touch_controls: bool,
    pub unlocked_achievements: BTreeSet<AchievementId>,
}

/// Complete simulation state for one run
///
/// Owned by the run lifecycle and handed to [`super::tick`] by reference.
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub seed: u64,
    pub rng: Pcg32,
    pub tick: u64,
    /// Simulation clock in milliseconds, the base of every timestamp
    pub time_ms: f64,
    pub play: PlayArea,
    pub difficulty: f32,
    pub touch_controls: bool,

    pub level: u32,
    pub score: u64,
    /// Fractional credits accrued this run (floored when banked)
    pub credits_earned: f64,
    pub combo: Combo,

    pub player: Player,
    pub boss_index: usize,
    pub boss: Boss,
    pub companion: Option<Companion>,

    pub boss_projectiles: Vec<BossProjectile>,
    pub player_bullets: Vec<PlayerBullet>,
    pub minion_projectiles: Vec<MinionProjectile>,
    pub companion_bullets: Vec<CompanionBullet>,
    pub minions: Vec<Minion>,
    pub power_ups: Vec<PowerUp>,
    pub explosions: Vec<Explosion>,
    pub stars: Vec<Star>,

    pub kills_this_level: u32,
    pub damage_taken_this_fight: f32,
    pub progress: RunProgress,
    pub game_over: bool,
    /// Events raised since the last drain
    pub events: Vec<SimEvent>,
}

impl SimulationState {
    /// Reset everything for a new run and load the first boss
    pub fn new(config: RunConfig) -> Self {
        let boss_index = 0;
        let mut state = Self {
            seed: config.seed,
            rng: Pcg32::seed_from_u64(config.seed),
            tick: 0,
            time_ms: 0.0,
            play: config.play,
            difficulty: config.difficulty,
            touch_controls: config.touch_controls,
            level: 1,
            score: 0,
            credits_earned: 0.0,
            combo: Combo::default(),
            player: Player::new(&config.stats, config.play),
            boss_index,
            boss: spawn::build_boss(boss_index, 1, config.difficulty, config.play),
            companion: None,
            boss_projectiles: Vec::new(),
            player_bullets: Vec::new(),
            minion_projectiles: Vec::new(),
            companion_bullets: Vec::new(),
            minions: Vec::new(),
            power_ups: Vec::new(),
            explosions: Vec::new(),
            stars: Vec::new(),
            kills_this_level: 0,
            damage_taken_this_fight: 0.0,
            progress: RunProgress {
                unlocked: config.unlocked_achievements,
                ..Default::default()
            },
            game_over: false,
            events: Vec::new(),
        };
        spawn::load_next_boss(&mut state);
        state
    }

    /// Take the events raised since the last call
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Credits banked at the end of the run
    pub fn banked_credits(&self) -> u64 {
        if self.credits_earned.is_finite() && self.credits_earned > 0.0 {
            self.credits_earned.floor() as u64
        } else {
            0
        }
    }

    /// Unlock an achievement once per profile; later calls are no-ops
    pub fn unlock_achievement(&mut self, id: AchievementId) {
        if self.progress.unlocked.insert(id) {
            log::info!("Achievement unlocked: {}", id.title());
            self.events.push(SimEvent::AchievementUnlocked { id });
        }
    }

    /// Number of minions still in play
    pub fn live_minions(&self) -> usize {
        self.minions.iter().filter(|m| m.active).count()
    }

    /// Drop every inactive entry; nothing ever comes back to life here
    pub fn compact(&mut self) {
        self.boss_projectiles.retain(|p| p.active);
        self.player_bullets.retain(|b| b.active);
        self.minion_projectiles.retain(|p| p.active);
        self.companion_bullets.retain(|b| b.active);
        self.minions.retain(|m| m.active);
        self.power_ups.retain(|p| p.active);
        self.explosions.retain(|e| e.active);
    }
}
