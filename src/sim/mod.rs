//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Frame-counted timers only
//! - Seeded RNG only
//! - Stable iteration order (insertion order of balls and blocks)
//! - No rendering, audio or platform dependencies

pub mod collision;
pub mod field;
pub mod maze;
pub mod patterns;
pub mod physics;
pub mod schedule;
pub mod state;
pub mod tick;

pub use collision::{Boundary, Rect};
pub use field::{Blast, BlockField, Strike};
pub use maze::Maze;
pub use physics::{FlightContext, FlightReport};
pub use schedule::{Schedule, Task};
pub use state::{
    AmmoKind, Ball, BallKind, Block, DestroyCause, DicePhase, DiceRoll, GameEvent, GamePhase,
    GameState, Hsl, Item, Particle, RenderSnapshot, SpecialKind,
};
pub use tick::{TickInput, tick};
