//! Fixed timestep simulation tick
//!
//! Advances one run by one step in a fixed order: starfield, combo and buff
//! timers, companion, player movement, player fire, boss, minion fire, motion
//! and collisions, laser, compaction. Entities created during a tick are not
//! moved or collided until the next one.

use glam::Vec2;

use super::collision::{Aabb, Bounded, circle_hits, circle_intersects_box, outside_play_area};
use super::event::SimEvent;
use super::spawn;
use super::state::{
    CompanionBullet, Explosion, MinionProjectile, PhaseTwoMovement, PlayArea, Player,
    PlayerBullet, PowerUpKind, SimulationState,
};
use crate::achievements::AchievementId;
use crate::consts::*;
use crate::progression::FirePattern;

/// Discrete keyboard direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn vector(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::new(0.0, -1.0),
            Direction::Down => Vec2::new(0.0, 1.0),
            Direction::Left => Vec2::new(-1.0, 0.0),
            Direction::Right => Vec2::new(1.0, 0.0),
        }
    }
}

/// The one control source that drives the ship this tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ControlInput {
    #[default]
    None,
    /// Ship centers on the pointer
    Pointer(Vec2),
    /// Held direction key, if any
    Keys(Option<Direction>),
    /// Touch drag since the last tick
    Drag(Vec2),
}

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    pub control: ControlInput,
    /// Fire the laser if the special meter is full
    pub fire_special: bool,
}

/// Collection lengths at the start of a tick; only these entries move and
/// collide in step 8
#[derive(Debug, Clone, Copy)]
struct Existing {
    boss_projectiles: usize,
    player_bullets: usize,
    minion_projectiles: usize,
    companion_bullets: usize,
    minions: usize,
    power_ups: usize,
    explosions: usize,
}

impl Existing {
    fn of(state: &SimulationState) -> Self {
        Self {
            boss_projectiles: state.boss_projectiles.len(),
            player_bullets: state.player_bullets.len(),
            minion_projectiles: state.minion_projectiles.len(),
            companion_bullets: state.companion_bullets.len(),
            minions: state.minions.len(),
            power_ups: state.power_ups.len(),
            explosions: state.explosions.len(),
        }
    }
}

/// Advance the run by `dt` seconds
pub fn tick(state: &mut SimulationState, input: &TickInput, dt: f32) {
    if state.game_over || !dt.is_finite() || dt <= 0.0 {
        return;
    }

    // Movement constants are tuned per 60 Hz frame
    let f = dt * FRAME_RATE;
    state.tick += 1;
    state.time_ms += dt as f64 * 1000.0;
    let existing = Existing::of(state);

    if input.fire_special {
        fire_laser(state);
    }

    // 1. Starfield
    advance_stars(state, f);

    // 2. Combo window and buff expiry
    state.combo.decay(dt);
    if state.player.is_firing_laser && state.time_ms >= state.player.laser_expires_at {
        state.player.is_firing_laser = false;
    }

    // 3. Companion
    advance_companion(state, f);

    // 4. Player movement
    move_player(&mut state.player, &input.control, state.play, f);

    // 5. Player fire
    auto_fire(state);

    // 6. Boss
    if state.boss.is_alive() {
        spawn::check_phase_two(state);
        move_boss(state, f);
        spawn::fire_boss(state);
        spawn::maybe_spawn_minion(state);
    }

    // 7. Minion fire
    fire_minions(state);

    // 8. Motion and collisions
    resolve_boss_projectiles(state, existing.boss_projectiles, f);
    resolve_player_bullets(state, existing.player_bullets, f);
    resolve_minion_projectiles(state, existing.minion_projectiles, f);
    resolve_companion_bullets(state, &existing, f);
    resolve_minions(state, &existing, f);
    resolve_power_ups(state, existing.power_ups, f);
    decay_explosions(state, existing.explosions, f);
    resolve_boss_defeat(state);

    // 9. Laser
    if state.player.is_firing_laser {
        channel_laser(state, f);
    }

    // 10. Compaction
    state.compact();
}

/// The single gate every hit on the player goes through
///
/// Returns true if the damage landed. The run ends the first time health
/// reaches zero; later calls are no-ops.
pub fn damage_player(state: &mut SimulationState, amount: f32) -> bool {
    if state.game_over || state.player.shield_active(state.time_ms) {
        return false;
    }

    let player = &mut state.player;
    player.health = (player.health - amount).max(0.0);
    state.damage_taken_this_fight += amount;
    state.events.push(SimEvent::PlayerDamaged {
        amount,
        health: player.health,
    });

    if player.health <= 0.0 {
        state.game_over = true;
        log::info!("Game over at level {} with {} points", state.level, state.score);
        state.events.push(SimEvent::GameOver {
            score: state.score,
            level: state.level,
        });
    }
    true
}

/// Start the laser if the meter is full; returns true if it fired
pub fn fire_laser(state: &mut SimulationState) -> bool {
    let player = &mut state.player;
    if state.game_over || player.is_firing_laser || !player.special_ready() {
        return false;
    }

    player.is_firing_laser = true;
    player.laser_expires_at = state.time_ms + LASER_DURATION_MS;
    state.progress.laser_uses += 1;
    state.events.push(SimEvent::LaserFired);
    log::debug!("Laser fired ({} this run)", state.progress.laser_uses);
    if state.progress.laser_uses >= 5 {
        state.unlock_achievement(AchievementId::LaserAdept);
    }
    true
}

/// Thin vertical beam from the ship's nose to the top of the screen
pub fn laser_beam(player: &Player) -> Aabb {
    Aabb::new(
        player.pos.x + player.size / 2.0 - LASER_WIDTH / 2.0,
        0.0,
        LASER_WIDTH,
        player.pos.y.max(0.0),
    )
}

/// Apply a collected power-up
pub fn apply_power_up(state: &mut SimulationState, kind: PowerUpKind) {
    let now = state.time_ms;
    match kind {
        PowerUpKind::TripleShot => state.player.triple_shot_expires_at = now + TRIPLE_SHOT_DURATION_MS,
        PowerUpKind::Shield => state.player.shield_expires_at = now + SHIELD_DURATION_MS,
        PowerUpKind::Bomb => {
            for minion in state.minions.iter_mut().filter(|m| m.active) {
                minion.active = false;
                state.explosions.push(Explosion::new(minion.center(), 15.0));
            }
            state.boss_projectiles.iter_mut().for_each(|p| p.active = false);
            state.minion_projectiles.iter_mut().for_each(|p| p.active = false);
        }
        PowerUpKind::Health => {
            let player = &mut state.player;
            player.health = (player.health + HEALTH_PICKUP_AMOUNT).min(player.max_health);
        }
        PowerUpKind::Companion => spawn::spawn_companion(state),
    }

    state.events.push(SimEvent::PowerUpCollected { kind });
    state.progress.power_ups_used.insert(kind);
    if state.progress.power_ups_used.len() >= PowerUpKind::ALL.len() {
        state.unlock_achievement(AchievementId::AllPowerups);
    }
}

fn advance_stars(state: &mut SimulationState, f: f32) {
    let PlayArea { width, height } = state.play;
    for star in &mut state.stars {
        star.pos.y += star.speed * f;
        if star.pos.y > height {
            star.pos.y = 0.0;
            star.pos.x = spawn::random_upto(&mut state.rng, width);
        }
    }
}

fn advance_companion(state: &mut SimulationState, f: f32) {
    let now = state.time_ms;
    if state.companion.as_ref().is_some_and(|c| now >= c.expires_at) {
        state.companion = None;
        return;
    }
    let Some(companion) = state.companion.as_mut() else {
        return;
    };

    let target = state.player.pos + spawn::companion_offset(state.player.size);
    companion.pos = companion.pos.lerp(target, (COMPANION_LERP * f).min(1.0));

    if now - companion.last_shot_ms > companion.shoot_interval_ms {
        companion.last_shot_ms = now;
        state.companion_bullets.push(CompanionBullet {
            pos: companion.pos + Vec2::new(companion.size / 2.0, 0.0),
            radius: 4.0,
            speed: 7.0,
            damage: companion.damage,
            active: true,
        });
    }
}

fn move_player(player: &mut Player, control: &ControlInput, play: PlayArea, f: f32) {
    let previous = player.pos;
    match *control {
        ControlInput::None | ControlInput::Keys(None) => {}
        ControlInput::Pointer(p) => player.pos = p - Vec2::splat(player.size / 2.0),
        ControlInput::Keys(Some(dir)) => player.pos += dir.vector() * player.speed * f,
        ControlInput::Drag(delta) => player.pos += delta,
    }
    if !player.pos.is_finite() {
        player.pos = previous;
    }

    let max = (Vec2::new(play.width, play.height) - Vec2::splat(player.size)).max(Vec2::ZERO);
    player.pos = player.pos.clamp(Vec2::ZERO, max);
}

fn player_bullet(pos: Vec2, radius: f32, speed: f32, angle: f32, damage: f32) -> PlayerBullet {
    PlayerBullet {
        pos,
        radius,
        speed,
        angle,
        damage,
        side: None,
        active: true,
    }
}

fn auto_fire(state: &mut SimulationState) {
    let now = state.time_ms;
    let player = &mut state.player;
    if player.is_firing_laser || now - player.last_shot_ms <= player.shoot_interval_ms {
        return;
    }
    player.last_shot_ms = now;

    let nose = Vec2::new(player.pos.x + player.size / 2.0, player.pos.y);
    let bullets = &mut state.player_bullets;
    if player.triple_shot_active(now) {
        for i in -1..=1 {
            bullets.push(player_bullet(nose, 6.0, 8.0, 0.2 * i as f32, player.damage));
        }
        return;
    }

    match player.fire_pattern {
        FirePattern::Single => bullets.push(player_bullet(nose, 6.0, 8.0, 0.0, player.damage)),
        FirePattern::Spread => {
            for i in -1..=1 {
                let angle = player.spread_angle * i as f32;
                bullets.push(player_bullet(nose, 5.0, 7.0, angle, player.damage));
            }
        }
        FirePattern::Side => {
            bullets.push(player_bullet(nose, 7.0, 8.0, 0.0, player.damage));
            for (x, side) in [(player.pos.x, -1.0), (player.pos.x + player.size, 1.0)] {
                bullets.push(PlayerBullet {
                    side: Some(side),
                    ..player_bullet(Vec2::new(x, player.pos.y + 20.0), 4.0, 6.0, 0.0, player.side_damage)
                });
            }
        }
    }
}

fn move_boss(state: &mut SimulationState, f: f32) {
    let now = state.time_ms;
    let max_x = (state.play.width - state.boss.width).max(0.0);

    if state.boss.phase_two && state.boss.phase_two_movement == PhaseTwoMovement::Teleport {
        if now >= state.boss.next_teleport_ms {
            state.boss.pos.x = spawn::random_upto(&mut state.rng, max_x);
            state.boss.next_teleport_ms = now + TELEPORT_INTERVAL_MS;
        }
        return;
    }

    let boss = &mut state.boss;
    let target_x = state.player.center().x - boss.width / 2.0;
    let delta = target_x - boss.pos.x;
    let step = boss.speed * f;
    if delta.abs() > step {
        boss.pos.x += delta.signum() * step;
    }
    boss.pos.x = boss.pos.x.clamp(0.0, max_x);
}

fn fire_minions(state: &mut SimulationState) {
    let now = state.time_ms;
    let speed = 3.0 * state.difficulty;
    for minion in state.minions.iter_mut().filter(|m| m.active && m.health > 0.0 && m.kamikaze.is_none()) {
        if now - minion.last_shot_ms > minion.shoot_interval_ms {
            minion.last_shot_ms = now;
            state.minion_projectiles.push(MinionProjectile {
                pos: minion.pos + Vec2::new(minion.size / 2.0, minion.size),
                radius: 5.0,
                speed,
                active: true,
            });
        }
    }
}

/// Special meter gain; nothing accrues while the beam is live
fn gain_special(player: &mut Player, amount: f32) {
    if player.is_firing_laser {
        return;
    }
    player.special_meter = (player.special_meter + amount).min(player.max_special);
}

fn advance_combo(state: &mut SimulationState) {
    state.combo.advance();
    if state.combo.count >= 50 {
        state.unlock_achievement(AchievementId::Combo50);
    }
}

fn earn_credits(state: &mut SimulationState, amount: f64) {
    state.credits_earned += amount;
    if state.credits_earned >= 200.0 {
        state.unlock_achievement(AchievementId::Tycoon);
    }
}

fn resolve_boss_projectiles(state: &mut SimulationState, count: usize, f: f32) {
    let now = state.time_ms;
    let target = state.player.center();
    let hitbox = state.player.hitbox();
    let homing_speed = BOSS_PROJECTILE_SPEED * state.difficulty;
    let PlayArea { width, height } = state.play;

    let mut hits = 0;
    for p in state.boss_projectiles[..count].iter_mut().filter(|p| p.active) {
        if p.is_homing(now) {
            p.vel = (target - p.pos).normalize_or_zero() * homing_speed;
        }
        p.pos += p.vel * f;
        if circle_intersects_box(p.circle(), &hitbox) {
            p.active = false;
            hits += 1;
        } else if outside_play_area(p.pos, width, height, OFFSCREEN_MARGIN) {
            p.active = false;
        }
    }
    for _ in 0..hits {
        damage_player(state, BOSS_PROJECTILE_DAMAGE);
    }
}

fn resolve_player_bullets(state: &mut SimulationState, count: usize, f: f32) {
    let PlayArea { width, height } = state.play;
    let boss_box = state.boss.bounds();

    let mut gain = 0.0;
    for b in state.player_bullets[..count].iter_mut().filter(|b| b.active) {
        match b.side {
            Some(dir) => {
                b.pos.x += dir * b.speed * 0.5 * f;
                b.pos.y -= b.speed * f;
            }
            None => {
                b.pos.x += b.angle.sin() * b.speed * f;
                b.pos.y -= b.angle.cos() * b.speed * f;
            }
        }
        if b.pos.y > height || outside_play_area(b.pos, width, height, OFFSCREEN_MARGIN) {
            b.active = false;
            continue;
        }
        if state.boss.is_alive() && circle_hits(b.circle(), &boss_box) {
            state.boss.health -= b.damage;
            b.active = false;
            gain += METER_GAIN_BOSS_HIT;
        }
    }
    gain_special(&mut state.player, gain);
}

fn resolve_minion_projectiles(state: &mut SimulationState, count: usize, f: f32) {
    let hitbox = state.player.hitbox();
    let height = state.play.height;

    let mut hits = 0;
    for p in state.minion_projectiles[..count].iter_mut().filter(|p| p.active) {
        p.pos.y += p.speed * f;
        if circle_intersects_box(p.circle(), &hitbox) {
            p.active = false;
            hits += 1;
        } else if p.pos.y > height {
            p.active = false;
        }
    }
    for _ in 0..hits {
        damage_player(state, MINION_PROJECTILE_DAMAGE);
    }
}

fn resolve_companion_bullets(state: &mut SimulationState, existing: &Existing, f: f32) {
    let boss_box = state.boss.bounds();
    for b in state.companion_bullets[..existing.companion_bullets].iter_mut().filter(|b| b.active) {
        b.pos.y -= b.speed * f;
        if b.pos.y < -OFFSCREEN_MARGIN {
            b.active = false;
            continue;
        }

        let circle = b.circle();
        let target = state.minions[..existing.minions]
            .iter_mut()
            .find(|m| m.active && m.health > 0.0 && circle_hits(circle, &**m));
        if let Some(minion) = target {
            minion.health -= b.damage;
            b.active = false;
        } else if state.boss.is_alive() && circle_hits(circle, &boss_box) {
            state.boss.health -= b.damage;
            b.active = false;
        }
    }
}

fn resolve_minions(state: &mut SimulationState, existing: &Existing, f: f32) {
    let PlayArea { width, height } = state.play;

    for i in 0..existing.minions {
        if !state.minions[i].active {
            continue;
        }
        // Drained by the beam last tick; dies before it can act
        if state.minions[i].health <= 0.0 {
            kill_minion(state, i);
            continue;
        }

        let minion = &mut state.minions[i];
        match minion.kamikaze {
            Some(vel) => minion.pos += vel * f,
            None => {
                minion.pos.x += minion.speed_x * f;
                if minion.pos.x <= 0.0 {
                    minion.speed_x = minion.speed_x.abs();
                } else if minion.pos.x + minion.size >= width {
                    minion.speed_x = -minion.speed_x.abs();
                }
            }
        }

        if minion.kamikaze.is_some() {
            // Sprites touching, center to center
            let reach = (state.player.size + minion.size) / 2.0;
            if minion.center().distance(state.player.center()) < reach {
                minion.active = false;
                let blast = minion.center();
                state.explosions.push(Explosion::new(blast, 15.0));
                damage_player(state, KAMIKAZE_DAMAGE);
                continue;
            }
            if outside_play_area(minion.center(), width, height, minion.size) {
                minion.active = false;
                continue;
            }
        }

        let bounds = minion.bounds();
        let mut gain = 0.0;
        for b in state.player_bullets[..existing.player_bullets].iter_mut().filter(|b| b.active) {
            if circle_intersects_box(b.circle(), &bounds) {
                minion.health -= b.damage;
                b.active = false;
                gain += METER_GAIN_MINION_HIT;
            }
        }
        gain_special(&mut state.player, gain);

        if state.minions[i].health <= 0.0 {
            kill_minion(state, i);
        }
    }
}

/// Death processing for a minion; runs once because it clears `active`
fn kill_minion(state: &mut SimulationState, index: usize) {
    let minion = &mut state.minions[index];
    if !minion.active {
        return;
    }
    minion.active = false;
    let pos = minion.pos;

    let points = MINION_SCORE * state.combo.multiplier as u64;
    state.score += points;
    earn_credits(state, MINION_CREDITS);
    advance_combo(state);
    state.kills_this_level += 1;
    state.progress.kills += 1;
    if state.progress.kills >= 100 {
        state.unlock_achievement(AchievementId::Minions100);
    }
    state.events.push(SimEvent::MinionKilled { pos, points });
    spawn::roll_power_up_drop(state, pos);
}

fn resolve_power_ups(state: &mut SimulationState, count: usize, f: f32) {
    let player_box = state.player.bounds();
    let height = state.play.height;

    let mut collected = Vec::new();
    for p in state.power_ups[..count].iter_mut().filter(|p| p.active) {
        p.pos.y += p.speed * f;
        if p.bounds().overlaps(&player_box) {
            p.active = false;
            collected.push(p.kind);
        } else if p.pos.y > height {
            p.active = false;
        }
    }
    for kind in collected {
        apply_power_up(state, kind);
    }
}

fn decay_explosions(state: &mut SimulationState, count: usize, f: f32) {
    for e in state.explosions[..count].iter_mut().filter(|e| e.active) {
        e.radius += 2.0 * f;
        e.alpha -= 0.05 * f;
        if e.alpha <= 0.0 {
            e.active = false;
        }
    }
}

fn resolve_boss_defeat(state: &mut SimulationState) {
    if state.boss.is_alive() {
        return;
    }

    let cleared = state.level;
    state.explosions.push(Explosion::new(state.boss.center(), 30.0));
    let points = BOSS_SCORE * cleared as u64 * state.combo.multiplier as u64;
    state.score += points;
    earn_credits(state, BOSS_CREDITS);
    log::info!("{} defeated at level {} (+{})", state.boss.kind.name(), cleared, points);

    if state.damage_taken_this_fight == 0.0 {
        state.unlock_achievement(AchievementId::NoHitBoss);
    }
    if state.player.health <= state.player.max_health * 0.1 {
        state.unlock_achievement(AchievementId::CloseCall);
    }

    state.level += 1;
    if state.level >= 5 {
        state.unlock_achievement(AchievementId::Level5);
    }
    advance_combo(state);
    state.progress.bosses_defeated += 1;
    if state.progress.bosses_defeated >= 3 {
        state.unlock_achievement(AchievementId::BossHunter);
    }

    state.boss_index = (state.boss_index + 1) % spawn::BOSS_ROSTER.len();
    state.minions.iter_mut().for_each(|m| m.active = false);
    state.boss_projectiles.iter_mut().for_each(|p| p.active = false);
    state.minion_projectiles.iter_mut().for_each(|p| p.active = false);

    state.events.push(SimEvent::BossDefeated {
        level: cleared,
        points,
    });
    spawn::load_next_boss(state);
}

fn channel_laser(state: &mut SimulationState, f: f32) {
    let player = &mut state.player;
    player.special_meter = (player.special_meter - player.max_special / LASER_DRAIN_TICKS * f).max(0.0);

    let beam = laser_beam(&state.player);
    let damage = LASER_DAMAGE_PER_TICK * f;
    for minion in state.minions.iter_mut().filter(|m| m.active) {
        if beam.overlaps_x(&minion.bounds()) {
            minion.health -= damage;
        }
    }
    if state.boss.is_alive() && beam.overlaps_x(&state.boss.bounds()) {
        state.boss.health -= damage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::ShipStats;
    use crate::sim::state::{BossKind, BossProjectile, Minion, MinionKind, RunConfig};
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn new_state(seed: u64) -> SimulationState {
        SimulationState::new(RunConfig {
            seed,
            difficulty: 1.0,
            stats: ShipStats::default(),
            play: PlayArea::default(),
            touch_controls: false,
            unlocked_achievements: BTreeSet::new(),
        })
    }

    fn bullet_at(pos: Vec2, damage: f32) -> PlayerBullet {
        player_bullet(pos, 6.0, 8.0, 0.0, damage)
    }

    fn boss_shot_at(pos: Vec2) -> BossProjectile {
        BossProjectile {
            pos,
            radius: 8.0,
            vel: Vec2::ZERO,
            homing_until: None,
            active: true,
        }
    }

    #[test]
    fn test_bullet_hits_boss() {
        let mut state = new_state(1);
        state.boss.health = 15.0;
        let center = state.boss.center();
        state.player_bullets.push(bullet_at(center, 10.0));

        tick(&mut state, &TickInput::default(), SIM_DT);

        assert_eq!(state.boss.health, 5.0);
        assert!(state.player_bullets.iter().all(|b| b.pos != center));
        assert!((state.player.special_meter - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_bullet_damage_fixed_at_spawn() {
        let mut state = new_state(1);
        state.boss.health = 40.0;
        let center = state.boss.center();
        state.player_bullets.push(bullet_at(center, 10.0));
        // An upgrade landing mid-flight does not change shots already fired
        state.player.damage = 50.0;

        tick(&mut state, &TickInput::default(), SIM_DT);

        assert_eq!(state.boss.health, 30.0);
    }

    #[test]
    fn test_bullet_kills_minion() {
        let mut state = new_state(1);
        let mut minion = spawn::build_minion(MinionKind::Fast, 1.0, 300.0, 0.0);
        minion.pos.y = 300.0;
        minion.speed_x = 0.0;
        state.minions.push(minion);
        state.player_bullets.push(bullet_at(Vec2::new(310.0, 318.0), 10.0));
        let multiplier = state.combo.multiplier as u64;

        tick(&mut state, &TickInput::default(), SIM_DT);

        assert!(state.minions.iter().all(|m| m.kind != MinionKind::Fast || m.pos.x != 300.0));
        assert_eq!(state.score, 50 * multiplier);
        assert_eq!(state.credits_earned, 1.0);
        assert_eq!(state.combo.count, 1);
        assert_eq!(state.progress.kills, 1);
        assert!((state.player.special_meter - 1.0).abs() < 1e-6);
        assert!(
            state
                .drain_events()
                .iter()
                .any(|e| matches!(e, SimEvent::MinionKilled { points: 50, .. }))
        );
    }

    #[test]
    fn test_lethal_hit_ends_run_once() {
        let mut state = new_state(1);
        state.player.health = 10.0;
        let target = state.player.center();
        state.boss_projectiles.push(boss_shot_at(target));

        tick(&mut state, &TickInput::default(), SIM_DT);

        assert_eq!(state.player.health, 0.0);
        assert!(state.game_over);

        // Repeat calls change nothing
        assert!(!damage_player(&mut state, 10.0));
        assert!(!damage_player(&mut state, 10.0));
        assert_eq!(state.player.health, 0.0);
        let game_overs = state
            .drain_events()
            .iter()
            .filter(|e| matches!(e, SimEvent::GameOver { .. }))
            .count();
        assert_eq!(game_overs, 1);

        // A finished run no longer advances
        let tick_count = state.tick;
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.tick, tick_count);
    }

    #[test]
    fn test_two_lethal_hits_same_tick() {
        let mut state = new_state(1);
        state.player.health = 10.0;
        let target = state.player.center();
        state.boss_projectiles.push(boss_shot_at(target));
        state.boss_projectiles.push(boss_shot_at(target));

        tick(&mut state, &TickInput::default(), SIM_DT);

        assert_eq!(state.player.health, 0.0);
        let game_overs = state
            .events
            .iter()
            .filter(|e| matches!(e, SimEvent::GameOver { .. }))
            .count();
        assert_eq!(game_overs, 1);
    }

    #[test]
    fn test_shield_negates_damage() {
        let mut state = new_state(1);
        state.player.shield_expires_at = 10_000.0;
        let target = state.player.center();
        state.boss_projectiles.push(boss_shot_at(target));

        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.player.health, 100.0);
        assert!(state.boss_projectiles.iter().all(|p| p.pos != target));

        assert!(!damage_player(&mut state, 50.0));
        assert_eq!(state.player.health, 100.0);
        assert_eq!(state.damage_taken_this_fight, 0.0);
    }

    #[test]
    fn test_boss_defeat_advances_level() {
        let mut state = new_state(1);
        state.boss.health = 0.0;
        state.minions.push(spawn::build_minion(MinionKind::Standard, 1.0, 100.0, 0.0));
        state.boss_projectiles.push(boss_shot_at(Vec2::new(100.0, 200.0)));
        state.minion_projectiles.push(MinionProjectile {
            pos: Vec2::new(600.0, 200.0),
            radius: 5.0,
            speed: 3.0,
            active: true,
        });

        tick(&mut state, &TickInput::default(), SIM_DT);

        assert_eq!(state.level, 2);
        assert_eq!(state.boss_index, 1);
        assert_eq!(state.boss.kind, spawn::BOSS_ROSTER[1]);
        assert!(state.boss.is_alive());
        assert!(state.minions.is_empty());
        assert!(state.boss_projectiles.is_empty());
        assert!(state.minion_projectiles.is_empty());
        assert_eq!(state.score, 1000);
        assert_eq!(state.credits_earned, 50.0);
        assert_eq!(state.combo.count, 1);
        assert!(state.progress.unlocked.contains(&AchievementId::NoHitBoss));

        let defeats: Vec<_> = state
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, SimEvent::BossDefeated { .. }))
            .collect();
        assert_eq!(defeats, vec![SimEvent::BossDefeated { level: 1, points: 1000 }]);
    }

    #[test]
    fn test_roster_wraps() {
        let mut state = new_state(1);
        for _ in 0..3 {
            state.boss.health = 0.0;
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert_eq!(state.level, 4);
        assert_eq!(state.boss_index, 0);
        assert!(state.progress.unlocked.contains(&AchievementId::BossHunter));
    }

    #[test]
    fn test_damaged_fight_denies_no_hit_bonus() {
        let mut state = new_state(1);
        assert!(damage_player(&mut state, 5.0));
        state.boss.health = 0.0;
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert!(!state.progress.unlocked.contains(&AchievementId::NoHitBoss));
        // The next fight starts clean
        assert_eq!(state.damage_taken_this_fight, 0.0);
    }

    #[test]
    fn test_combo_expires() {
        let mut state = new_state(1);
        state.combo.advance();
        state.combo.timer = SIM_DT / 2.0;
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.combo.count, 0);
        assert_eq!(state.combo.multiplier, 1);
    }

    #[test]
    fn test_new_bullets_wait_a_tick() {
        let mut state = new_state(1);
        state.player.last_shot_ms = -1000.0;
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.player_bullets.len(), 1);
        assert_eq!(state.player_bullets[0].pos.y, state.player.pos.y);

        tick(&mut state, &TickInput::default(), SIM_DT);
        assert!(state.player_bullets[0].pos.y < state.player.pos.y);
    }

    #[test]
    fn test_fire_patterns() {
        let mut state = new_state(1);
        state.player.fire_pattern = FirePattern::Spread;
        state.player.spread_angle = 0.25;
        state.player.last_shot_ms = -1000.0;
        tick(&mut state, &TickInput::default(), SIM_DT);
        let angles: Vec<f32> = state.player_bullets.iter().map(|b| b.angle).collect();
        assert_eq!(angles, vec![-0.25, 0.0, 0.25]);

        let mut state = new_state(1);
        state.player.fire_pattern = FirePattern::Side;
        state.player.side_damage = 4.0;
        state.player.last_shot_ms = -1000.0;
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.player_bullets.len(), 3);
        let sides: Vec<_> = state.player_bullets.iter().filter_map(|b| b.side).collect();
        assert_eq!(sides, vec![-1.0, 1.0]);
        assert!(state.player_bullets.iter().filter(|b| b.side.is_some()).all(|b| b.damage == 4.0));
    }

    #[test]
    fn test_triple_shot_overrides_pattern() {
        let mut state = new_state(1);
        state.player.fire_pattern = FirePattern::Side;
        state.player.triple_shot_expires_at = 10_000.0;
        state.player.last_shot_ms = -1000.0;
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.player_bullets.len(), 3);
        assert!(state.player_bullets.iter().all(|b| b.side.is_none() && b.radius == 6.0));
    }

    #[test]
    fn test_keyboard_movement_clamps() {
        let mut state = new_state(1);
        let start = state.player.pos;
        let input = TickInput {
            control: ControlInput::Keys(Some(Direction::Right)),
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);
        assert!((state.player.pos.x - (start.x + state.player.speed)).abs() < 1e-3);

        for _ in 0..500 {
            tick(&mut state, &input, SIM_DT);
            if state.game_over {
                break;
            }
        }
        assert_eq!(state.player.pos.x, state.play.width - state.player.size);
    }

    #[test]
    fn test_pointer_centers_ship() {
        let mut state = new_state(1);
        let input = TickInput {
            control: ControlInput::Pointer(Vec2::new(200.0, 300.0)),
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);
        assert_eq!(state.player.center(), Vec2::new(200.0, 300.0));

        let input = TickInput {
            control: ControlInput::Pointer(Vec2::new(f32::NAN, 0.0)),
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);
        assert_eq!(state.player.center(), Vec2::new(200.0, 300.0));
    }

    #[test]
    fn test_health_pickup_is_capped() {
        let mut state = new_state(1);
        state.player.health = 90.0;
        let pos = state.player.pos;
        state.power_ups.push(spawn::build_power_up(PowerUpKind::Health, pos));
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.player.health, 100.0);
        assert!(state.power_ups.is_empty());
        assert!(state.progress.power_ups_used.contains(&PowerUpKind::Health));
    }

    #[test]
    fn test_bomb_clears_hostiles() {
        let mut state = new_state(1);
        state.minions.push(spawn::build_minion(MinionKind::Standard, 1.0, 100.0, 0.0));
        state.boss_projectiles.push(boss_shot_at(Vec2::new(50.0, 200.0)));
        state.minion_projectiles.push(MinionProjectile {
            pos: Vec2::new(120.0, 250.0),
            radius: 5.0,
            speed: 3.0,
            active: true,
        });
        state.player_bullets.push(bullet_at(Vec2::new(300.0, 300.0), 10.0));
        apply_power_up(&mut state, PowerUpKind::Bomb);
        state.compact();
        assert!(state.minions.is_empty());
        assert!(state.boss_projectiles.is_empty());
        assert!(state.minion_projectiles.is_empty());
        // The player's own shots are not hostile
        assert_eq!(state.player_bullets.len(), 1);
        assert_eq!(state.score, 0);
    }

    #[test]
    fn test_all_power_ups_unlocks() {
        let mut state = new_state(1);
        for kind in PowerUpKind::ALL {
            assert!(!state.progress.unlocked.contains(&AchievementId::AllPowerups));
            apply_power_up(&mut state, kind);
        }
        assert!(state.progress.unlocked.contains(&AchievementId::AllPowerups));
        assert!(state.companion.is_some());
    }

    #[test]
    fn test_laser_requires_full_meter() {
        let mut state = new_state(1);
        state.player.special_meter = 99.0;
        assert!(!fire_laser(&mut state));

        state.player.special_meter = 100.0;
        assert!(fire_laser(&mut state));
        assert!(!fire_laser(&mut state));
        assert_eq!(state.progress.laser_uses, 1);
    }

    #[test]
    fn test_laser_burns_boss_then_expires() {
        let mut state = new_state(1);
        state.player.shield_expires_at = f64::MAX;
        state.player.special_meter = state.player.max_special;
        let health = state.boss.health;
        let input = TickInput {
            fire_special: true,
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);

        assert!(state.player.is_firing_laser);
        assert!((state.boss.health - (health - LASER_DAMAGE_PER_TICK)).abs() < 1e-3);
        assert!(state.player.special_meter < state.player.max_special);
        // No bullets while the beam is live
        assert!(state.player_bullets.is_empty());

        for _ in 0..200 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert!(!state.player.is_firing_laser);
        assert!(state.player.special_meter < 1.0);
    }

    #[test]
    fn test_kamikaze_detonates_on_player() {
        let mut state = new_state(1);
        let mut minion = spawn::build_minion(MinionKind::Standard, 1.0, 0.0, 0.0);
        minion.pos = state.player.center() - Vec2::splat(minion.size / 2.0);
        minion.kamikaze = Some(Vec2::new(0.0, 1.0));
        state.minions.push(minion);

        tick(&mut state, &TickInput::default(), SIM_DT);

        assert_eq!(state.player.health, 100.0 - KAMIKAZE_DAMAGE);
        assert_eq!(state.score, 0);
        assert!(state.explosions.iter().any(|e| e.radius == 15.0));
    }

    #[test]
    fn test_companion_expires() {
        let mut state = new_state(1);
        spawn::spawn_companion(&mut state);
        state.time_ms = COMPANION_LIFETIME_MS;
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert!(state.companion.is_none());
    }

    /// Minion parked in the laser column above the ship
    fn minion_in_beam(state: &SimulationState, health: f32, gap: f32) -> Minion {
        let mut minion = spawn::build_minion(MinionKind::Standard, 1.0, 0.0, 0.0);
        minion.pos = state.player.center() - Vec2::new(minion.size / 2.0, gap + minion.size / 2.0);
        minion.health = health;
        minion.speed_x = 0.0;
        minion
    }

    fn laser_input() -> TickInput {
        TickInput {
            fire_special: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_beam_killed_kamikaze_never_detonates() {
        let mut state = new_state(1);
        state.player.special_meter = state.player.max_special;
        let mut minion = minion_in_beam(&state, 1.0, 44.0);
        minion.kamikaze = Some(Vec2::new(0.0, 1.0));
        state.minions.push(minion);

        tick(&mut state, &laser_input(), SIM_DT);
        assert!(state.minions[0].health <= 0.0);

        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.player.health, 100.0);
        assert_eq!(state.score, MINION_SCORE);
        assert_eq!(state.progress.kills, 1);
        assert_eq!(state.combo.count, 1);
        assert!(state.minions.iter().all(|m| m.kamikaze.is_none()));
    }

    #[test]
    fn test_beam_killed_minion_does_not_fire() {
        let mut state = new_state(1);
        state.player.special_meter = state.player.max_special;
        state.player.shield_expires_at = f64::MAX;
        let mut minion = minion_in_beam(&state, 1.0, 200.0);
        // Gun comes off cooldown on the second tick
        minion.last_shot_ms = -2975.0;
        state.minions.push(minion);

        tick(&mut state, &laser_input(), SIM_DT);
        assert!(state.minion_projectiles.is_empty());

        tick(&mut state, &TickInput::default(), SIM_DT);
        assert!(state.minion_projectiles.is_empty());
        assert_eq!(state.progress.kills, 1);
        assert_eq!(state.score, MINION_SCORE);
    }

    #[test]
    fn test_drained_minion_dies_before_moving() {
        let mut state = new_state(1);
        let mut minion = minion_in_beam(&state, -1.0, 0.0);
        minion.kamikaze = Some(Vec2::new(0.0, 1.0));
        state.minions.push(minion);

        tick(&mut state, &TickInput::default(), SIM_DT);

        assert_eq!(state.player.health, 100.0);
        assert_eq!(state.progress.kills, 1);
        assert!(state.explosions.iter().all(|e| e.radius != 15.0));
    }

    #[test]
    fn test_kamikaze_reach_is_sprite_contact() {
        let mut state = new_state(1);
        let mut minion = minion_in_beam(&state, 10.0, 0.0);
        let reach = (state.player.size + minion.size) / 2.0;
        minion.pos.y -= reach + 2.0;
        minion.kamikaze = Some(Vec2::new(0.0, 1.0));
        state.minions.push(minion);

        // One frame closes the gap to within reach
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.player.health, 100.0);
        tick(&mut state, &TickInput::default(), SIM_DT);
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.player.health, 100.0 - KAMIKAZE_DAMAGE);
    }

    #[test]
    fn test_companion_bullets_prefer_minions() {
        let mut state = new_state(1);
        let mut minion = spawn::build_minion(MinionKind::Standard, 1.0, 100.0, 0.0);
        minion.pos.y = 300.0;
        minion.speed_x = 0.0;
        state.minions.push(minion);
        let boss_health = state.boss.health;
        let boss_center = state.boss.center();

        let shot = |pos| CompanionBullet {
            pos,
            radius: 4.0,
            speed: 7.0,
            damage: COMPANION_DAMAGE,
            active: true,
        };
        state.companion_bullets.push(shot(Vec2::new(112.0, 320.0)));
        state.companion_bullets.push(shot(boss_center + Vec2::new(0.0, 10.0)));

        tick(&mut state, &TickInput::default(), SIM_DT);

        assert_eq!(state.minions[0].health, 10.0 - COMPANION_DAMAGE);
        assert_eq!(state.boss.health, boss_health - COMPANION_DAMAGE);
        assert!(state.companion_bullets.is_empty());
    }

    #[test]
    fn test_homing_only_within_window() {
        let mut state = new_state(1);
        state.player.shield_expires_at = f64::MAX;
        let target = state.player.center();
        let start = Vec2::new(100.0, 100.0);
        state.boss_projectiles.push(BossProjectile {
            vel: Vec2::new(4.0, 0.0),
            homing_until: Some(HOMING_DURATION_MS),
            ..boss_shot_at(start)
        });
        state.boss_projectiles.push(BossProjectile {
            vel: Vec2::new(0.0, 4.0),
            homing_until: Some(0.0),
            ..boss_shot_at(Vec2::new(700.0, 100.0))
        });

        tick(&mut state, &TickInput::default(), SIM_DT);

        let homing = &state.boss_projectiles[0];
        assert!(homing.vel.normalize().dot((target - start).normalize()) > 0.999);
        assert!((homing.vel.length() - BOSS_PROJECTILE_SPEED).abs() < 1e-4);
        assert_eq!(state.boss_projectiles[1].vel, Vec2::new(0.0, 4.0));
    }

    #[test]
    fn test_invader_teleports_on_timer() {
        let mut state = new_state(1);
        state.boss = spawn::build_boss(1, 1, 1.0, state.play);
        assert_eq!(state.boss.kind, BossKind::Invader);
        state.boss.phase_two = true;
        state.boss.next_teleport_ms = 0.0;

        tick(&mut state, &TickInput::default(), SIM_DT);
        let jumped_to = state.boss.pos.x;
        assert_eq!(state.boss.next_teleport_ms, state.time_ms + TELEPORT_INTERVAL_MS);
        assert!(jumped_to >= 0.0 && jumped_to <= state.play.width - state.boss.width);

        // Holds still between jumps, even with the player off to one side
        let input = TickInput {
            control: ControlInput::Pointer(Vec2::new(30.0, 500.0)),
            ..Default::default()
        };
        for _ in 0..10 {
            tick(&mut state, &input, SIM_DT);
        }
        assert_eq!(state.boss.pos.x, jumped_to);
    }

    #[test]
    fn test_minion_shot_damage_and_shield() {
        let mut state = new_state(1);
        let shot = MinionProjectile {
            pos: state.player.center(),
            radius: 5.0,
            speed: 3.0,
            active: true,
        };
        state.minion_projectiles.push(shot.clone());
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.player.health, 100.0 - MINION_PROJECTILE_DAMAGE);

        state.player.shield_expires_at = f64::MAX;
        state.minion_projectiles.push(MinionProjectile {
            pos: state.player.center(),
            ..shot
        });
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.player.health, 100.0 - MINION_PROJECTILE_DAMAGE);
        assert!(state.minion_projectiles.is_empty());
    }

    #[test]
    fn test_minions_bounce_off_walls() {
        let mut state = new_state(1);
        let width = state.play.width;
        let mut right = spawn::build_minion(MinionKind::Standard, 1.0, 0.0, 0.0);
        right.pos = Vec2::new(width - right.size - 1.0, 300.0);
        right.speed_x = 2.0;
        let mut left = spawn::build_minion(MinionKind::Standard, 1.0, 0.0, 0.0);
        left.pos = Vec2::new(1.0, 300.0);
        left.speed_x = -2.0;
        state.minions.push(right);
        state.minions.push(left);

        tick(&mut state, &TickInput::default(), SIM_DT);

        assert_eq!(state.minions[0].speed_x, -2.0);
        assert_eq!(state.minions[1].speed_x, 2.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_ticks_keep_state_consistent(seed in any::<u64>(), moves in prop::collection::vec(0u8..5, 1..300)) {
            let mut state = new_state(seed);
            for m in moves {
                let control = match m {
                    0 => ControlInput::None,
                    1 => ControlInput::Keys(Some(Direction::Left)),
                    2 => ControlInput::Keys(Some(Direction::Right)),
                    3 => ControlInput::Pointer(Vec2::new(400.0, 500.0)),
                    _ => ControlInput::Drag(Vec2::new(3.0, -2.0)),
                };
                tick(&mut state, &TickInput { control, fire_special: true }, SIM_DT);

                // Compaction leaves only live entries
                prop_assert!(state.player_bullets.iter().all(|b| b.active));
                prop_assert!(state.boss_projectiles.iter().all(|p| p.active));
                prop_assert!(state.minion_projectiles.iter().all(|p| p.active));
                prop_assert!(state.minions.iter().all(|m| m.active));
                prop_assert!(state.power_ups.iter().all(|p| p.active));
                prop_assert!(state.explosions.iter().all(|e| e.active));

                prop_assert!(state.player.health >= 0.0 && state.player.health <= state.player.max_health);
                prop_assert!(state.live_minions() <= MAX_MINIONS);
                prop_assert_eq!(state.combo.multiplier, 1 + state.combo.count / COMBO_STEP);
            }
        }
    }
}
