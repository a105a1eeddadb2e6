//! Swept collision detection and response
//!
//! Balls are circles, everything they hit is axis-aligned. Expanding each
//! target by the ball radius turns the circle sweep into a point raycast, so
//! a fast ball can never skip over a thin block between two frames.

use glam::Vec2;

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_pos_size(pos: Vec2, size: Vec2) -> Self {
        Self {
            min: pos,
            max: pos + size,
        }
    }

    /// Grow by `amount` on every side
    pub fn expand(&self, amount: f32) -> Self {
        Self {
            min: self.min - Vec2::splat(amount),
            max: self.max + Vec2::splat(amount),
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Nearest point on or inside the rectangle
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max)
    }

    /// Strict overlap between the rectangle and the circle's bounding box
    pub fn overlaps_circle_bounds(&self, center: Vec2, radius: f32) -> bool {
        center.x + radius > self.min.x
            && center.x - radius < self.max.x
            && center.y + radius > self.min.y
            && center.y - radius < self.max.y
    }
}

/// Screen edges a ball can touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Left,
    Right,
    Ceiling,
    /// Bottom edge: the ball is collected here
    Floor,
}

impl Boundary {
    /// Normal pointing back into the play area
    pub fn normal(&self) -> Vec2 {
        match self {
            Boundary::Left => Vec2::X,
            Boundary::Right => Vec2::NEG_X,
            Boundary::Ceiling => Vec2::Y,
            Boundary::Floor => Vec2::NEG_Y,
        }
    }
}

/// Earliest boundary contact inside a sweep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryHit {
    pub time: f32,
    pub boundary: Boundary,
}

/// Time until the ball centre reaches a boundary line moving at `speed`
///
/// A ball already past the line while still moving outward hits at once.
fn time_to_line(pos: f32, line: f32, speed: f32) -> f32 {
    ((line - pos) / speed).max(0.0)
}

/// Sweep a ball against the four screen edges within `max_time` frames
///
/// The side walls are tested first; the floor or ceiling only wins when it
/// is strictly earlier.
pub fn sweep_boundaries(
    pos: Vec2,
    vel: Vec2,
    radius: f32,
    size: Vec2,
    max_time: f32,
) -> Option<BoundaryHit> {
    let mut best: Option<BoundaryHit> = None;

    if vel.x > 0.0 {
        let t = time_to_line(pos.x, size.x - radius, vel.x);
        if t < max_time {
            best = Some(BoundaryHit {
                time: t,
                boundary: Boundary::Right,
            });
        }
    } else if vel.x < 0.0 {
        let t = time_to_line(pos.x, radius, vel.x);
        if t < max_time {
            best = Some(BoundaryHit {
                time: t,
                boundary: Boundary::Left,
            });
        }
    }

    let vertical = if vel.y > 0.0 {
        Some((time_to_line(pos.y, size.y - radius, vel.y), Boundary::Floor))
    } else if vel.y < 0.0 {
        Some((time_to_line(pos.y, radius, vel.y), Boundary::Ceiling))
    } else {
        None
    };

    if let Some((t, boundary)) = vertical {
        if t < max_time && best.is_none_or(|b| t < b.time) {
            best = Some(BoundaryHit { time: t, boundary });
        }
    }

    best
}

/// Entry/exit times of a ray through one slab, or `None` if it never enters
fn slab(pos: f32, vel: f32, min: f32, max: f32) -> Option<(f32, f32)> {
    if vel == 0.0 {
        if pos >= min && pos <= max {
            Some((f32::NEG_INFINITY, f32::INFINITY))
        } else {
            None
        }
    } else {
        let t1 = (min - pos) / vel;
        let t2 = (max - pos) / vel;
        Some((t1.min(t2), t1.max(t2)))
    }
}

/// Point raycast against an (already expanded) rectangle
///
/// Returns the entry time when the ray enters within `[0, max_time)`.
/// A point that starts inside the rectangle does not collide.
pub fn sweep_rect(pos: Vec2, vel: Vec2, rect: &Rect, max_time: f32) -> Option<f32> {
    let (near_x, far_x) = slab(pos.x, vel.x, rect.min.x, rect.max.x)?;
    let (near_y, far_y) = slab(pos.y, vel.y, rect.min.y, rect.max.y)?;

    let t_near = near_x.max(near_y);
    let t_far = far_x.min(far_y);

    if t_near.is_finite() && t_near < t_far && t_near >= 0.0 && t_near < max_time {
        Some(t_near)
    } else {
        None
    }
}

/// Sweep a circle against a block rectangle
pub fn sweep_circle_rect(
    pos: Vec2,
    vel: Vec2,
    radius: f32,
    rect: &Rect,
    max_time: f32,
) -> Option<f32> {
    sweep_rect(pos, vel, &rect.expand(radius), max_time)
}

/// Surface normal for a ball touching `rect` at `impact`
///
/// Uses the direction from the nearest rectangle point to the ball centre,
/// which also rounds the corners. When that vector is too short to trust
/// the normal falls back to the axis with the smaller penetration, opposing
/// the ball's motion on that axis.
pub fn impact_normal(impact: Vec2, vel: Vec2, radius: f32, rect: &Rect, epsilon: f32) -> Vec2 {
    let offset = impact - rect.closest_point(impact);
    let distance = offset.length();
    if distance > epsilon {
        return offset / distance;
    }

    let overlap_x = ((impact.x + radius) - rect.min.x).min(rect.max.x - (impact.x - radius));
    let overlap_y = ((impact.y + radius) - rect.min.y).min(rect.max.y - (impact.y - radius));

    let horizontal = Vec2::new(-vel.x.signum(), 0.0);
    let vertical = Vec2::new(0.0, -vel.y.signum());

    if overlap_x < overlap_y && vel.x != 0.0 {
        horizontal
    } else if vel.y != 0.0 {
        vertical
    } else if vel.x != 0.0 {
        horizontal
    } else {
        Vec2::NEG_Y
    }
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Keep a ball out of near-horizontal flight and under the speed cap
///
/// The vertical component is lifted to `min_vertical` first; if that pushes
/// the speed over `max_speed` the horizontal component gives way.
pub fn clamp_velocity(mut vel: Vec2, min_vertical: f32, max_speed: f32) -> Vec2 {
    if vel.y.abs() < min_vertical {
        vel.y = if vel.y >= 0.0 { min_vertical } else { -min_vertical };
    }
    if vel.length_squared() > max_speed * max_speed {
        if vel.y.abs() >= max_speed {
            return Vec2::new(0.0, max_speed.copysign(vel.y));
        }
        let x = (max_speed * max_speed - vel.y * vel.y).sqrt();
        vel.x = x.copysign(vel.x);
    }
    vel
}

/// Scale a velocity to at most `max_speed`, keeping its direction
pub fn cap_speed(vel: Vec2, max_speed: f32) -> Vec2 {
    vel.clamp_length_max(max_speed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELD: Vec2 = Vec2::new(600.0, 800.0);

    #[test]
    fn test_sweep_boundaries_right_wall() {
        let hit = sweep_boundaries(Vec2::new(580.0, 400.0), Vec2::new(20.0, 0.0), 6.0, FIELD, 1.0)
            .unwrap();
        assert_eq!(hit.boundary, Boundary::Right);
        assert!((hit.time - 0.7).abs() < 1e-5);
    }

    #[test]
    fn test_sweep_boundaries_prefers_earlier_axis() {
        // Ceiling is 4 units away vertically, right wall 10 units horizontally
        let hit = sweep_boundaries(Vec2::new(584.0, 10.0), Vec2::new(10.0, -10.0), 6.0, FIELD, 1.0)
            .unwrap();
        assert_eq!(hit.boundary, Boundary::Ceiling);
        assert!((hit.time - 0.4).abs() < 1e-5);
    }

    #[test]
    fn test_sweep_boundaries_corner_tie_goes_to_side_wall() {
        // Right wall and ceiling both reached at t = 1
        let hit = sweep_boundaries(Vec2::new(584.0, 10.0), Vec2::new(10.0, -4.0), 6.0, FIELD, 2.0)
            .unwrap();
        assert_eq!(hit.boundary, Boundary::Right);
        assert!((hit.time - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_sweep_boundaries_floor() {
        let hit = sweep_boundaries(Vec2::new(300.0, 790.0), Vec2::new(0.0, 5.0), 6.0, FIELD, 1.0)
            .unwrap();
        assert_eq!(hit.boundary, Boundary::Floor);
    }

    #[test]
    fn test_sweep_boundaries_miss() {
        assert!(sweep_boundaries(Vec2::new(300.0, 400.0), Vec2::new(5.0, -5.0), 6.0, FIELD, 1.0).is_none());
    }

    #[test]
    fn test_sweep_rect_thin_block_at_high_speed() {
        // Radius 6, 90 units/frame, 10-wide block 95 units ahead
        let block = Rect::from_pos_size(Vec2::new(195.0, 380.0), Vec2::new(10.0, 40.0));
        let t = sweep_circle_rect(Vec2::new(100.0, 400.0), Vec2::new(90.0, 0.0), 6.0, &block, 1.0)
            .unwrap();
        assert!((t - 89.0 / 90.0).abs() < 1e-5);
    }

    #[test]
    fn test_sweep_rect_starting_inside_is_ignored() {
        let rect = Rect::new(Vec2::ZERO, Vec2::splat(10.0));
        assert!(sweep_rect(Vec2::splat(5.0), Vec2::new(1.0, 0.0), &rect, 1.0).is_none());
    }

    #[test]
    fn test_sweep_rect_axis_aligned_motion() {
        let rect = Rect::new(Vec2::new(0.0, 10.0), Vec2::new(10.0, 20.0));
        // Straight down, inside the x slab
        let t = sweep_rect(Vec2::new(5.0, 0.0), Vec2::new(0.0, 20.0), &rect, 1.0).unwrap();
        assert!((t - 0.5).abs() < 1e-6);
        // Straight down, outside the x slab
        assert!(sweep_rect(Vec2::new(15.0, 0.0), Vec2::new(0.0, 20.0), &rect, 1.0).is_none());
    }

    #[test]
    fn test_sweep_rect_beyond_reach() {
        let rect = Rect::new(Vec2::new(50.0, 0.0), Vec2::new(60.0, 10.0));
        assert!(sweep_rect(Vec2::new(0.0, 5.0), Vec2::new(10.0, 0.0), &rect, 1.0).is_none());
    }

    #[test]
    fn test_impact_normal_face() {
        let rect = Rect::new(Vec2::new(10.0, 10.0), Vec2::new(30.0, 20.0));
        // Ball touching the bottom face
        let n = impact_normal(Vec2::new(20.0, 26.0), Vec2::new(0.0, -5.0), 6.0, &rect, 1e-4);
        assert!((n - Vec2::Y).length() < 1e-6);
    }

    #[test]
    fn test_impact_normal_corner() {
        let rect = Rect::new(Vec2::new(10.0, 10.0), Vec2::new(30.0, 20.0));
        let n = impact_normal(Vec2::new(6.0, 6.0), Vec2::new(1.0, 1.0), 6.0, &rect, 1e-4);
        let expected = Vec2::new(-1.0, -1.0).normalize();
        assert!((n - expected).length() < 1e-5);
    }

    #[test]
    fn test_impact_normal_degenerate_fallback() {
        // Impact point inside the rectangle: fall back to the shallower axis
        let rect = Rect::new(Vec2::new(0.0, 0.0), Vec2::new(100.0, 10.0));
        let n = impact_normal(Vec2::new(50.0, 1.0), Vec2::new(3.0, 4.0), 0.0, &rect, 1e-4);
        assert_eq!(n, Vec2::new(0.0, -1.0));

        let tall = Rect::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 100.0));
        let n = impact_normal(Vec2::new(1.0, 50.0), Vec2::new(3.0, 4.0), 0.0, &tall, 1e-4);
        assert_eq!(n, Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn test_impact_normal_never_zero() {
        let rect = Rect::new(Vec2::ZERO, Vec2::splat(10.0));
        let n = impact_normal(Vec2::splat(5.0), Vec2::ZERO, 0.0, &rect, 1e-4);
        assert!((n.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_reflect_velocity() {
        // Ball moving right, hits vertical wall (normal pointing left)
        let velocity = Vec2::new(100.0, 0.0);
        let normal = Vec2::new(-1.0, 0.0);

        let reflected = reflect_velocity(velocity, normal);
        assert!((reflected.x - (-100.0)).abs() < 0.001);
        assert!(reflected.y.abs() < 0.001);
    }

    #[test]
    fn test_clamp_velocity_lifts_flat_flight() {
        let v = clamp_velocity(Vec2::new(5.0, 0.05), 0.2, 20.0);
        assert_eq!(v.y, 0.2);
        assert_eq!(v.x, 5.0);

        let v = clamp_velocity(Vec2::new(5.0, -0.0), 0.2, 20.0);
        assert_eq!(v.y, 0.2);
    }

    #[test]
    fn test_clamp_velocity_caps_speed() {
        let v = clamp_velocity(Vec2::new(20.0, 0.0), 0.2, 20.0);
        assert!(v.length() <= 20.0 + 1e-4);
        assert_eq!(v.y, 0.2);
        assert!(v.x > 19.99);
    }

    #[test]
    fn test_overlaps_circle_bounds() {
        let rect = Rect::new(Vec2::ZERO, Vec2::splat(10.0));
        assert!(rect.overlaps_circle_bounds(Vec2::new(14.0, 5.0), 5.0));
        assert!(!rect.overlaps_circle_bounds(Vec2::new(15.0, 5.0), 5.0));
    }
}
