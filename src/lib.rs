//! Brick Volley - A turn-based ball volley brick breaker
//!
//! Core modules:
//! - `sim`: Deterministic simulation (swept collisions, turn flow, block field)
//! - `settings`: Data-driven game tuning and variant presets

pub mod settings;
pub mod sim;

pub use settings::{FieldMode, Settings};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Simulation frames per second (all timers count frames)
    pub const FRAMES_PER_SECOND: u32 = 60;

    /// Collision iterations per ball per frame
    pub const MAX_COLLISION_ITERATIONS: u32 = 8;
    /// Nudge along the normal after a bounce
    pub const COLLISION_EPSILON: f32 = 0.1;
    /// Below this the impact-to-rectangle vector is treated as degenerate
    pub const NORMAL_EPSILON: f32 = 1e-4;
    /// Balls never fly flatter than this vertical speed
    pub const MIN_VERTICAL_SPEED: f32 = 0.2;

    /// Shooter sits this far above the floor
    pub const SHOOTER_FLOOR_OFFSET: f32 = 30.0;
    /// Aim may not come closer than this to horizontal (radians)
    pub const AIM_MARGIN: f32 = 0.1;

    /// Hard cap on simultaneously simulated balls (multiplier spawns)
    pub const MAX_ACTIVE_BALLS: usize = 250;
    /// Cosmetic particle pool cap
    pub const MAX_PARTICLES: usize = 1024;
    /// Per-frame downward pull on particles
    pub const PARTICLE_GRAVITY: f32 = 0.1;
}

/// Quadratic ease-out on `t` in [0, 1]: fast start, soft landing
#[inline]
pub fn ease_out_quad(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * (2.0 - t)
}

/// Restrict an aim angle to the upper half-plane (screen y grows downward)
///
/// Angles at or below `-AIM_MARGIN` pass through unchanged; anything flatter
/// snaps to the nearest allowed edge on the side it points to.
pub fn clamp_aim_angle(angle: f32) -> f32 {
    use std::f32::consts::PI;
    if !angle.is_finite() {
        return -PI / 2.0;
    }
    let angle = normalize_angle(angle);
    if angle > -consts::AIM_MARGIN {
        if angle.cos() > 0.0 {
            -consts::AIM_MARGIN
        } else {
            -PI + consts::AIM_MARGIN
        }
    } else {
        angle
    }
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Unit direction for an angle (screen coordinates)
#[inline]
pub fn direction(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}
