//! Spawn logic: boss roster, minions, power-up drops and boss attack patterns
//!
//! Every roll draws from the run's seeded RNG, so a fixed seed reproduces the
//! same spawns.

use glam::Vec2;
use rand::Rng;

use super::state::{
    AttackPattern, Boss, BossKind, BossProjectile, Companion, Minion, MinionKind, PhaseTwoMovement,
    PlayArea, PowerUp, PowerUpKind, SimulationState, Star,
};
use crate::consts::*;
use crate::{angle_between, direction_from_angle};

/// Bosses in the order they are fought; the index wraps
pub const BOSS_ROSTER: [BossKind; 3] = [BossKind::Guardian, BossKind::Invader, BossKind::Predator];

impl BossKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Guardian => "Guardian",
            Self::Invader => "Invader",
            Self::Predator => "Predator",
        }
    }

    /// Hull width and height
    pub fn dimensions(self) -> (f32, f32) {
        match self {
            Self::Guardian => (140.0, 70.0),
            Self::Invader => (120.0, 80.0),
            Self::Predator => (150.0, 60.0),
        }
    }

    pub fn attack(self) -> AttackPattern {
        match self {
            Self::Guardian => AttackPattern::Burst,
            Self::Invader => AttackPattern::Spiral,
            Self::Predator => AttackPattern::Homing,
        }
    }

    pub fn phase_two_attack(self) -> AttackPattern {
        match self {
            Self::Guardian => AttackPattern::Stream,
            Self::Invader => AttackPattern::Walls,
            Self::Predator => AttackPattern::Shotgun,
        }
    }

    pub fn phase_two_movement(self) -> PhaseTwoMovement {
        match self {
            Self::Invader => PhaseTwoMovement::Teleport,
            _ => PhaseTwoMovement::Track,
        }
    }

    pub fn minion_kind(self) -> MinionKind {
        match self {
            Self::Guardian => MinionKind::Standard,
            Self::Invader => MinionKind::Fast,
            Self::Predator => MinionKind::Tank,
        }
    }
}

/// Build the roster boss at `index` scaled for `level` and difficulty
pub fn build_boss(index: usize, level: u32, difficulty: f32, play: PlayArea) -> Boss {
    let kind = BOSS_ROSTER[index % BOSS_ROSTER.len()];
    let (width, height) = kind.dimensions();
    let level_f = level as f32;
    let health = (100.0 + level_f * 75.0) * difficulty;

    Boss {
        kind,
        pos: Vec2::new(play.width / 2.0 - width / 2.0, BOSS_SPAWN_Y),
        width,
        height,
        health,
        max_health: health,
        speed: (2.0 + level_f * 0.1) * difficulty,
        shoot_interval_ms: (1000.0 - level as f64 * 50.0).max(200.0),
        last_shot_ms: 0.0,
        attack: kind.attack(),
        phase_two_attack: kind.phase_two_attack(),
        phase_two_movement: kind.phase_two_movement(),
        minion_kind: kind.minion_kind(),
        phase_two: false,
        spiral_angle: 0.0,
        wall_gap: 0,
        next_teleport_ms: 0.0,
        pending_stream: Vec::new(),
    }
}

/// Replace the boss with the roster entry at `boss_index` for the current level
pub fn load_next_boss(state: &mut SimulationState) {
    state.damage_taken_this_fight = 0.0;
    state.kills_this_level = 0;
    state.boss = build_boss(state.boss_index, state.level, state.difficulty, state.play);
    // Bosses fire relative to the simulation clock, not from zero
    state.boss.last_shot_ms = state.time_ms;
    log::info!(
        "Level {}: {} ({:.0} hp)",
        state.level,
        state.boss.kind.name(),
        state.boss.max_health
    );
    spawn_starfield(state);
}

/// Scatter a fresh starfield
pub fn spawn_starfield(state: &mut SimulationState) {
    let PlayArea { width, height } = state.play;
    state.stars = (0..STAR_COUNT)
        .map(|_| Star {
            pos: Vec2::new(random_upto(&mut state.rng, width), random_upto(&mut state.rng, height)),
            size: state.rng.random_range(1.0..3.0),
            speed: state.rng.random_range(0.5..2.0),
        })
        .collect();
}

/// Build a minion of `kind` with stats scaled by difficulty
pub fn build_minion(kind: MinionKind, difficulty: f32, x: f32, now: f64) -> Minion {
    let (size, health, speed_x, shoot_interval_ms) = match kind {
        MinionKind::Standard => (25.0, 10.0, 2.0, 3000.0),
        MinionKind::Fast => (20.0, 5.0, 4.0, 2500.0),
        MinionKind::Tank => (35.0, 30.0, 1.0, 4000.0),
    };
    let health = health * difficulty;

    Minion {
        kind,
        pos: Vec2::new(x, MINION_SPAWN_Y),
        size,
        health,
        max_health: (kind == MinionKind::Tank).then_some(health),
        speed_x: speed_x * difficulty,
        shoot_interval_ms,
        last_shot_ms: now,
        kamikaze: None,
        active: true,
    }
}

/// Roll for a new minion; only while the boss lives and below the cap
pub fn maybe_spawn_minion(state: &mut SimulationState) -> bool {
    if !state.boss.is_alive() || state.live_minions() >= MAX_MINIONS {
        return false;
    }
    let chance = (MINION_SPAWN_CHANCE * state.difficulty as f64).clamp(0.0, 1.0);
    if !state.rng.random_bool(chance) {
        return false;
    }
    let x = random_upto(&mut state.rng, state.play.width - 35.0);
    let minion = build_minion(state.boss.minion_kind, state.difficulty, x, state.time_ms);
    state.minions.push(minion);
    true
}

/// Build a power-up of `kind` at `pos`
pub fn build_power_up(kind: PowerUpKind, pos: Vec2) -> PowerUp {
    PowerUp {
        kind,
        pos,
        size: kind.size(),
        speed: POWER_UP_FALL_SPEED,
        active: true,
    }
}

/// Drop roll on minion death
pub fn roll_power_up_drop(state: &mut SimulationState, pos: Vec2) -> Option<PowerUpKind> {
    if !state.rng.random_bool(POWER_UP_DROP_CHANCE) {
        return None;
    }
    let kind = PowerUpKind::ALL[state.rng.random_range(0..PowerUpKind::ALL.len())];
    state.power_ups.push(build_power_up(kind, pos));
    Some(kind)
}

/// Spawn the companion drone, or extend its lifetime if already flying
pub fn spawn_companion(state: &mut SimulationState) {
    let expires_at = state.time_ms + COMPANION_LIFETIME_MS;
    match state.companion.as_mut() {
        Some(companion) => companion.expires_at = expires_at,
        None => {
            state.companion = Some(Companion {
                pos: state.player.pos + companion_offset(state.player.size),
                size: COMPANION_SIZE,
                damage: COMPANION_DAMAGE,
                shoot_interval_ms: COMPANION_SHOOT_INTERVAL_MS,
                last_shot_ms: state.time_ms,
                expires_at,
            });
        }
    }
}

/// Where the companion sits relative to the player's top-left corner
pub fn companion_offset(player_size: f32) -> Vec2 {
    Vec2::new(-COMPANION_SIZE - 10.0, player_size / 2.0)
}

/// Trigger phase two the first time the boss drops to half health
///
/// Returns true on the tick the transition happens.
pub fn check_phase_two(state: &mut SimulationState) -> bool {
    let boss = &mut state.boss;
    if boss.phase_two || !boss.is_alive() || boss.health > boss.max_health * 0.5 {
        return false;
    }

    boss.phase_two = true;
    boss.speed *= PHASE_TWO_SPEED_BOOST;
    boss.shoot_interval_ms *= PHASE_TWO_INTERVAL_SCALE;
    boss.attack = boss.phase_two_attack;
    boss.next_teleport_ms = state.time_ms + TELEPORT_INTERVAL_MS;
    log::info!("{} enters phase two ({:?})", boss.kind.name(), boss.attack);

    // Minions already in play dive at where the player is right now
    let target = state.player.center();
    let speed = KAMIKAZE_SPEED * state.difficulty;
    for minion in state.minions.iter_mut().filter(|m| m.active && m.kamikaze.is_none()) {
        let dir = (target - minion.center()).normalize_or_zero();
        minion.kamikaze = Some(dir * speed);
    }
    true
}

/// Fire the boss's current pattern if the cooldown elapsed, then release any
/// queued stream shots that are due
pub fn fire_boss(state: &mut SimulationState) {
    let now = state.time_ms;
    if state.boss.is_alive() && now - state.boss.last_shot_ms >= state.boss.shoot_interval_ms {
        state.boss.last_shot_ms = now;
        match state.boss.attack {
            AttackPattern::Burst => fire_burst(state),
            AttackPattern::Spiral => fire_spiral(state),
            AttackPattern::Homing => fire_homing(state),
            AttackPattern::Stream => queue_stream(state),
            AttackPattern::Walls => fire_walls(state),
            AttackPattern::Shotgun => fire_shotgun(state),
        }
    }
    release_stream_shots(state);
}

fn projectile_speed(state: &SimulationState) -> f32 {
    BOSS_PROJECTILE_SPEED * state.difficulty
}

fn aim_angle(state: &SimulationState) -> f32 {
    angle_between(state.boss.muzzle(), state.player.center())
}

fn push_shot(state: &mut SimulationState, pos: Vec2, radius: f32, vel: Vec2) {
    state.boss_projectiles.push(BossProjectile {
        pos,
        radius,
        vel,
        homing_until: None,
        active: true,
    });
}

fn fire_burst(state: &mut SimulationState) {
    let origin = state.boss.muzzle();
    let base = aim_angle(state);
    let speed = projectile_speed(state);
    for i in -1..=1 {
        let angle = base + 0.25 * i as f32;
        push_shot(state, origin, 8.0, direction_from_angle(angle) * speed);
    }
}

fn fire_spiral(state: &mut SimulationState) {
    let origin = state.boss.muzzle();
    let speed = projectile_speed(state);
    let start = state.boss.spiral_angle;
    for i in 0..4 {
        let angle = start + i as f32 * std::f32::consts::FRAC_PI_2;
        push_shot(state, origin, 6.0, direction_from_angle(angle) * speed);
    }
    state.boss.spiral_angle += 0.3;
}

fn fire_homing(state: &mut SimulationState) {
    let origin = state.boss.muzzle();
    let vel = direction_from_angle(aim_angle(state)) * projectile_speed(state);
    state.boss_projectiles.push(BossProjectile {
        pos: origin,
        radius: 10.0,
        vel,
        homing_until: Some(state.time_ms + HOMING_DURATION_MS),
        active: true,
    });
}

/// Queue three aimed shots at fixed offsets from now
fn queue_stream(state: &mut SimulationState) {
    let now = state.time_ms;
    state
        .boss
        .pending_stream
        .extend((0..3).map(|i| now + STREAM_SHOT_GAP_MS * i as f64));
}

/// Release queued stream shots whose time has come, each aimed on release
pub fn release_stream_shots(state: &mut SimulationState) {
    if state.boss.pending_stream.is_empty() {
        return;
    }
    let now = state.time_ms;
    let due = state.boss.pending_stream.iter().filter(|&&t| t <= now).count();
    state.boss.pending_stream.retain(|&t| t > now);
    if !state.boss.is_alive() {
        return;
    }
    let origin = state.boss.muzzle();
    let vel = direction_from_angle(aim_angle(state)) * projectile_speed(state);
    for _ in 0..due {
        push_shot(state, origin, 7.0, vel);
    }
}

fn fire_walls(state: &mut SimulationState) {
    let slots = ((state.play.width / WALL_SLOT_WIDTH).floor() as u32).max(1);
    let gap = state.boss.wall_gap % slots;
    let y = state.boss.muzzle().y;
    let vel = Vec2::new(0.0, projectile_speed(state) * 0.75);
    for i in 0..slots {
        // The gap is two slots wide so the ship fits through
        if i == gap || i == (gap + 1) % slots {
            continue;
        }
        let x = i as f32 * WALL_SLOT_WIDTH + WALL_SLOT_WIDTH / 2.0;
        push_shot(state, Vec2::new(x, y), 8.0, vel);
    }
    state.boss.wall_gap = (gap + 1) % slots;
}

fn fire_shotgun(state: &mut SimulationState) {
    let pellets = if state.touch_controls {
        SHOTGUN_PELLETS_TOUCH
    } else {
        SHOTGUN_PELLETS
    };
    let origin = state.boss.muzzle();
    let base = aim_angle(state);
    let speed = projectile_speed(state);
    for _ in 0..pellets {
        let angle = base + state.rng.random_range(-SHOTGUN_SPREAD..=SHOTGUN_SPREAD);
        let pellet_speed = speed * state.rng.random_range(0.8..1.2);
        push_shot(state, origin, 5.0, direction_from_angle(angle) * pellet_speed);
    }
}

/// Uniform value in `[0, max)`, or 0 when the range is empty
pub(crate) fn random_upto<R: Rng>(rng: &mut R, max: f32) -> f32 {
    if max > 0.0 { rng.random_range(0.0..max) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::ShipStats;
    use crate::sim::state::RunConfig;
    use std::collections::BTreeSet;

    fn state_with(difficulty: f32, seed: u64) -> SimulationState {
        SimulationState::new(RunConfig {
            seed,
            difficulty,
            stats: ShipStats::default(),
            play: PlayArea::default(),
            touch_controls: false,
            unlocked_achievements: BTreeSet::new(),
        })
    }

    #[test]
    fn test_minion_stats_scale_with_difficulty() {
        let tank = build_minion(MinionKind::Tank, 1.5, 0.0, 0.0);
        assert_eq!(tank.health, 45.0);
        assert_eq!(tank.max_health, Some(45.0));
        assert_eq!(tank.speed_x, 1.5);
        assert_eq!(tank.shoot_interval_ms, 4000.0);

        let fast = build_minion(MinionKind::Fast, 2.0, 0.0, 0.0);
        assert_eq!(fast.health, 10.0);
        assert_eq!(fast.speed_x, 8.0);
        assert_eq!(fast.max_health, None);

        let standard = build_minion(MinionKind::Standard, 0.75, 0.0, 0.0);
        assert_eq!(standard.health, 7.5);
        assert_eq!(standard.speed_x, 1.5);
        assert_eq!(standard.size, 25.0);
    }

    #[test]
    fn test_boss_scaling() {
        let boss = build_boss(0, 1, 1.0, PlayArea::default());
        assert_eq!(boss.kind, BossKind::Guardian);
        assert_eq!(boss.max_health, 175.0);
        assert_eq!(boss.shoot_interval_ms, 950.0);
        assert!((boss.speed - 2.1).abs() < 1e-5);

        let late = build_boss(4, 20, 1.0, PlayArea::default());
        assert_eq!(late.kind, BossKind::Invader);
        assert_eq!(late.shoot_interval_ms, 200.0);
    }

    #[test]
    fn test_spawn_rolls_are_reproducible() {
        let mut a = state_with(1.5, 42);
        let mut b = state_with(1.5, 42);
        for _ in 0..2000 {
            maybe_spawn_minion(&mut a);
            maybe_spawn_minion(&mut b);
        }
        assert_eq!(a.minions.len(), b.minions.len());
        for (ma, mb) in a.minions.iter().zip(&b.minions) {
            assert_eq!(ma.pos, mb.pos);
            assert_eq!(ma.health, mb.health);
        }
    }

    #[test]
    fn test_minion_cap() {
        let mut state = state_with(1.0, 7);
        for _ in 0..10_000 {
            maybe_spawn_minion(&mut state);
        }
        assert_eq!(state.live_minions(), MAX_MINIONS);
    }

    #[test]
    fn test_no_minions_while_boss_dead() {
        let mut state = state_with(1.0, 7);
        state.boss.health = 0.0;
        for _ in 0..10_000 {
            assert!(!maybe_spawn_minion(&mut state));
        }
    }

    #[test]
    fn test_burst_fires_three_shots() {
        let mut state = state_with(1.0, 3);
        state.time_ms = 5000.0;
        fire_boss(&mut state);
        assert_eq!(state.boss_projectiles.len(), 3);
        // Cooldown blocks an immediate second volley
        fire_boss(&mut state);
        assert_eq!(state.boss_projectiles.len(), 3);
    }

    #[test]
    fn test_spiral_rotates() {
        let mut state = state_with(1.0, 3);
        state.boss_index = 1;
        load_next_boss(&mut state);
        state.time_ms = 5000.0;
        fire_boss(&mut state);
        assert_eq!(state.boss_projectiles.len(), 4);
        assert!((state.boss.spiral_angle - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_homing_shot_has_deadline() {
        let mut state = state_with(1.0, 3);
        state.boss_index = 2;
        load_next_boss(&mut state);
        state.time_ms = 5000.0;
        fire_boss(&mut state);
        assert_eq!(state.boss_projectiles.len(), 1);
        assert_eq!(state.boss_projectiles[0].homing_until, Some(7000.0));
    }

    #[test]
    fn test_stream_releases_on_schedule() {
        let mut state = state_with(1.0, 3);
        state.boss.attack = AttackPattern::Stream;
        state.time_ms = 5000.0;
        fire_boss(&mut state);
        assert_eq!(state.boss_projectiles.len(), 1);
        assert_eq!(state.boss.pending_stream.len(), 2);

        state.time_ms += STREAM_SHOT_GAP_MS;
        fire_boss(&mut state);
        assert_eq!(state.boss_projectiles.len(), 2);

        state.time_ms += STREAM_SHOT_GAP_MS;
        fire_boss(&mut state);
        assert_eq!(state.boss_projectiles.len(), 3);
        assert!(state.boss.pending_stream.is_empty());
    }

    #[test]
    fn test_walls_leave_a_gap_that_moves() {
        let mut state = state_with(1.0, 3);
        state.boss.attack = AttackPattern::Walls;
        state.time_ms = 5000.0;
        fire_boss(&mut state);
        let slots = (DEFAULT_PLAY_WIDTH / WALL_SLOT_WIDTH) as usize;
        assert_eq!(state.boss_projectiles.len(), slots - 2);
        assert_eq!(state.boss.wall_gap, 1);
    }

    #[test]
    fn test_shotgun_fewer_pellets_on_touch() {
        let mut state = state_with(1.0, 3);
        state.boss.attack = AttackPattern::Shotgun;
        state.time_ms = 5000.0;
        fire_boss(&mut state);
        assert_eq!(state.boss_projectiles.len(), SHOTGUN_PELLETS as usize);

        let mut touch = state_with(1.0, 3);
        touch.touch_controls = true;
        touch.boss.attack = AttackPattern::Shotgun;
        touch.time_ms = 5000.0;
        fire_boss(&mut touch);
        assert_eq!(touch.boss_projectiles.len(), SHOTGUN_PELLETS_TOUCH as usize);
    }

    #[test]
    fn test_phase_two_triggers_once() {
        let mut state = state_with(1.0, 3);
        state.minions.push(build_minion(MinionKind::Standard, 1.0, 100.0, 0.0));
        let speed = state.boss.speed;
        let interval = state.boss.shoot_interval_ms;

        state.boss.health = state.boss.max_health * 0.6;
        assert!(!check_phase_two(&mut state));

        state.boss.health = state.boss.max_health * 0.5;
        assert!(check_phase_two(&mut state));
        assert!(state.boss.phase_two);
        assert_eq!(state.boss.attack, AttackPattern::Stream);
        assert!((state.boss.speed - speed * 1.5).abs() < 1e-5);
        assert!((state.boss.shoot_interval_ms - interval * 0.7).abs() < 1e-9);

        let vel = state.minions[0].kamikaze.expect("minion converted");
        let to_player = state.player.center() - state.minions[0].center();
        assert!(vel.normalize().dot(to_player.normalize()) > 0.999);

        assert!(!check_phase_two(&mut state));
        assert!((state.boss.speed - speed * 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_companion_refresh_extends_lifetime() {
        let mut state = state_with(1.0, 3);
        spawn_companion(&mut state);
        state.time_ms = 1000.0;
        spawn_companion(&mut state);
        let companion = state.companion.as_ref().expect("companion");
        assert_eq!(companion.expires_at, 1000.0 + COMPANION_LIFETIME_MS);
    }
}
