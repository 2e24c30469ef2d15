//! Events raised inside a tick
//!
//! The run lifecycle drains these after every tick to persist rewards and
//! react to the end of a run. Renderers may use them for sound and flashes.

use glam::Vec2;
use serde::Serialize;

use super::state::PowerUpKind;
use crate::achievements::AchievementId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SimEvent {
    /// A minion died to player fire; `pos` is where it died
    MinionKilled { pos: Vec2, points: u64 },
    /// The boss went down; `level` is the level that was just cleared
    BossDefeated { level: u32, points: u64 },
    /// Damage that got past the shield
    PlayerDamaged { amount: f32, health: f32 },
    PowerUpCollected { kind: PowerUpKind },
    LaserFired,
    AchievementUnlocked { id: AchievementId },
    /// Raised exactly once per run
    GameOver { score: u64, level: u32 },
}
