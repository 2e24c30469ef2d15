//! Per-frame render view
//!
//! An owned copy of everything a renderer draws, taken once after the tick.
//! Entries with non-finite coordinates are dropped here so a bad value never
//! reaches a draw call.

use glam::Vec2;
use serde::Serialize;

use super::collision::Aabb;
use super::state::{BossKind, MinionKind, PlayArea, PowerUpKind, SimulationState};
use super::tick::laser_beam;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CircleView {
    pub pos: Vec2,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlayerView {
    pub pos: Vec2,
    pub size: f32,
    pub health: f32,
    pub max_health: f32,
    pub shielded: bool,
    pub triple_shot: bool,
    pub special_meter: f32,
    pub max_special: f32,
    pub special_ready: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BossView {
    pub kind: BossKind,
    pub name: &'static str,
    pub pos: Vec2,
    pub width: f32,
    pub height: f32,
    pub health: f32,
    pub max_health: f32,
    pub phase_two: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MinionView {
    pub kind: MinionKind,
    pub pos: Vec2,
    pub size: f32,
    /// Health bar fill in `[0, 1]`, armored minions only
    pub health_fraction: Option<f32>,
    pub kamikaze: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerUpView {
    pub kind: PowerUpKind,
    pub pos: Vec2,
    pub size: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExplosionView {
    pub pos: Vec2,
    pub radius: f32,
    pub alpha: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StarView {
    pub pos: Vec2,
    pub size: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompanionView {
    pub pos: Vec2,
    pub size: f32,
    /// Time left before the drone leaves
    pub remaining_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComboView {
    pub count: u32,
    pub multiplier: u32,
    pub timer: f32,
}

/// Read-only view of one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub play: PlayArea,
    pub level: u32,
    pub score: u64,
    /// Whole credits earned this run so far
    pub credits_earned: u64,
    pub combo: ComboView,
    pub game_over: bool,
    /// `None` if the ship's position went non-finite
    pub player: Option<PlayerView>,
    pub boss: Option<BossView>,
    pub companion: Option<CompanionView>,
    pub laser: Option<Aabb>,
    pub boss_projectiles: Vec<CircleView>,
    pub player_bullets: Vec<CircleView>,
    pub minion_projectiles: Vec<CircleView>,
    pub companion_bullets: Vec<CircleView>,
    pub minions: Vec<MinionView>,
    pub power_ups: Vec<PowerUpView>,
    pub explosions: Vec<ExplosionView>,
    pub stars: Vec<StarView>,
}

fn finite(pos: Vec2, extra: f32) -> bool {
    pos.is_finite() && extra.is_finite()
}

fn circles(items: impl Iterator<Item = (Vec2, f32)>) -> Vec<CircleView> {
    items
        .filter(|&(pos, radius)| finite(pos, radius))
        .map(|(pos, radius)| CircleView { pos, radius })
        .collect()
}

impl Snapshot {
    /// Copy the drawable parts of `state`
    pub fn capture(state: &SimulationState) -> Self {
        let now = state.time_ms;
        let p = &state.player;
        let player = finite(p.pos, p.health).then(|| PlayerView {
            pos: p.pos,
            size: p.size,
            health: p.health,
            max_health: p.max_health,
            shielded: p.shield_active(now),
            triple_shot: p.triple_shot_active(now),
            special_meter: p.special_meter,
            max_special: p.max_special,
            special_ready: p.special_ready(),
        });

        let b = &state.boss;
        let boss = (b.is_alive() && finite(b.pos, b.health)).then(|| BossView {
            kind: b.kind,
            name: b.kind.name(),
            pos: b.pos,
            width: b.width,
            height: b.height,
            health: b.health,
            max_health: b.max_health,
            phase_two: b.phase_two,
        });

        let laser = (p.is_firing_laser && p.pos.is_finite()).then(|| laser_beam(p));

        Self {
            tick: state.tick,
            play: state.play,
            level: state.level,
            score: state.score,
            credits_earned: state.banked_credits(),
            combo: ComboView {
                count: state.combo.count,
                multiplier: state.combo.multiplier,
                timer: state.combo.timer,
            },
            game_over: state.game_over,
            player,
            boss,
            companion: state
                .companion
                .as_ref()
                .filter(|c| c.pos.is_finite())
                .map(|c| CompanionView {
                    pos: c.pos,
                    size: c.size,
                    remaining_ms: (c.expires_at - state.time_ms).max(0.0),
                }),
            laser,
            boss_projectiles: circles(
                state.boss_projectiles.iter().filter(|x| x.active).map(|x| (x.pos, x.radius)),
            ),
            player_bullets: circles(
                state.player_bullets.iter().filter(|x| x.active).map(|x| (x.pos, x.radius)),
            ),
            minion_projectiles: circles(
                state.minion_projectiles.iter().filter(|x| x.active).map(|x| (x.pos, x.radius)),
            ),
            companion_bullets: circles(
                state.companion_bullets.iter().filter(|x| x.active).map(|x| (x.pos, x.radius)),
            ),
            minions: state
                .minions
                .iter()
                .filter(|m| m.active && finite(m.pos, m.health))
                .map(|m| MinionView {
                    kind: m.kind,
                    pos: m.pos,
                    size: m.size,
                    health_fraction: m
                        .max_health
                        .filter(|max| *max > 0.0)
                        .map(|max| (m.health / max).clamp(0.0, 1.0)),
                    kamikaze: m.kamikaze.is_some(),
                })
                .collect(),
            power_ups: state
                .power_ups
                .iter()
                .filter(|x| x.active && x.pos.is_finite())
                .map(|x| PowerUpView {
                    kind: x.kind,
                    pos: x.pos,
                    size: x.size,
                })
                .collect(),
            explosions: state
                .explosions
                .iter()
                .filter(|e| e.active && finite(e.pos, e.radius))
                .map(|e| ExplosionView {
                    pos: e.pos,
                    radius: e.radius,
                    alpha: e.alpha.clamp(0.0, 1.0),
                })
                .collect(),
            stars: state
                .stars
                .iter()
                .filter(|s| s.pos.is_finite())
                .map(|s| StarView {
                    pos: s.pos,
                    size: s.size,
                })
                .collect(),
        }
    }
}
