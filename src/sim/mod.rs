//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Caller-supplied timestep only
//! - Seeded RNG only
//! - Stable iteration order (insertion order, compacted once per tick)
//! - No rendering or platform dependencies

pub mod collision;
pub mod event;
pub mod snapshot;
pub mod spawn;
pub mod state;
pub mod tick;

pub use collision::{Aabb, Bounded, Circle, circle_hits, circle_intersects_box};
pub use event::SimEvent;
pub use snapshot::Snapshot;
pub use spawn::BOSS_ROSTER;
pub use state::{
    AttackPattern, Boss, BossKind, Combo, MinionKind, PlayArea, Player, PowerUpKind, RunConfig,
    SimulationState,
};
pub use tick::{ControlInput, Direction, TickInput, damage_player, fire_laser, tick};
