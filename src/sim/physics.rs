//! Ball flight integrator
//!
//! Every frame each ball gets one unit of time and a fixed number of
//! collision iterations. Each iteration finds the earliest contact among the
//! screen edges and the live blocks, moves the ball there, reflects it and
//! spends the elapsed time. Magma balls skip all of this and move in
//! discrete steps, burning through whatever they overlap.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::collision::{
    Boundary, Rect, cap_speed, clamp_velocity, impact_normal, reflect_velocity,
    sweep_boundaries, sweep_circle_rect,
};
use super::field::BlockField;
use super::state::{Ball, BallKind, GameEvent, SpecialKind};
use crate::settings::Settings;

/// Everything a flight step may read or write besides balls and blocks
pub struct FlightContext<'a> {
    pub settings: &'a Settings,
    /// Health removed per direct hit
    pub damage: i32,
    pub rng: &'a mut Pcg32,
    pub events: &'a mut Vec<GameEvent>,
    /// First landing x this turn; later landings leave it alone
    pub landing_x: &'a mut Option<f32>,
}

/// What happened to the volley during one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlightReport {
    /// Normal balls that reached the floor
    pub reclaimed: u32,
    /// Balls paid out by destroyed multiplier blocks
    pub credit: u32,
    /// Extra balls requested by multiplier hits (position, velocity)
    pub spawned: Vec<(Vec2, Vec2)>,
}

/// Per-ball result of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flight {
    Flying,
    /// Touched the floor
    Landed,
    /// Used up (bomb detonation)
    Consumed,
}

#[derive(Debug, Clone, Copy)]
enum Contact {
    Boundary(Boundary),
    Block { id: u32, rect: Rect },
}

/// Advance every ball by one frame
///
/// Balls are processed in order and removed as soon as they land or are
/// consumed. Multiplier spawns are returned rather than inserted, so they
/// start moving on the next frame.
pub fn advance(balls: &mut Vec<Ball>, field: &mut BlockField, ctx: &mut FlightContext) -> FlightReport {
    let mut report = FlightReport::default();
    let accel = ctx.settings.acceleration;

    let mut i = 0;
    while i < balls.len() {
        let active = balls.len();
        let ball = &mut balls[i];
        if accel != 1.0 {
            ball.vel = cap_speed(ball.vel * accel, ctx.settings.max_speed);
        }

        let flight = match ball.kind {
            BallKind::Magma => step_magma(ball, field, ctx),
            BallKind::Normal | BallKind::Bomb => step_swept(ball, field, ctx, active, &mut report),
        };

        match flight {
            Flight::Flying => i += 1,
            Flight::Landed => {
                let ball = balls.remove(i);
                if ball.is_reclaimable() {
                    report.reclaimed += 1;
                }
            }
            Flight::Consumed => {
                balls.remove(i);
            }
        }
    }

    report
}

/// Earliest contact within `remaining`; walls win ties
fn earliest_contact(ball: &Ball, field: &BlockField, settings: &Settings, remaining: f32) -> Option<(f32, Contact)> {
    let size = Vec2::new(settings.width, settings.height);
    let mut best = sweep_boundaries(ball.pos, ball.vel, ball.radius, size, remaining)
        .map(|hit| (hit.time, Contact::Boundary(hit.boundary)));

    for block in &field.blocks {
        let rect = block.rect();
        if let Some(t) = sweep_circle_rect(ball.pos, ball.vel, ball.radius, &rect, remaining) {
            if best.is_none_or(|(time, _)| t < time) {
                best = Some((t, Contact::Block { id: block.id, rect }));
            }
        }
    }

    best
}

fn step_swept(
    ball: &mut Ball,
    field: &mut BlockField,
    ctx: &mut FlightContext,
    active: usize,
    report: &mut FlightReport,
) -> Flight {
    let settings = ctx.settings;
    let mut remaining = 1.0_f32;

    for _ in 0..settings.collision_iterations {
        if remaining <= 0.0 {
            return Flight::Flying;
        }

        let Some((t, contact)) = earliest_contact(ball, field, settings, remaining) else {
            ball.pos += ball.vel * remaining;
            return Flight::Flying;
        };

        ball.pos += ball.vel * t;

        if let Contact::Boundary(Boundary::Floor) = contact {
            land(ball, ctx);
            return Flight::Landed;
        }

        let normal = match contact {
            Contact::Boundary(boundary) => boundary.normal(),
            Contact::Block { rect, .. } => {
                impact_normal(ball.pos, ball.vel, ball.radius, &rect, settings.normal_epsilon)
            }
        };
        ball.vel = reflect_velocity(ball.vel, normal);
        ball.vel = clamp_velocity(ball.vel, settings.min_vertical_speed, settings.max_speed);
        ball.pos += normal * settings.collision_epsilon;

        match contact {
            Contact::Block { id, .. } => {
                if ball.kind == BallKind::Bomb {
                    report.credit += field.bomb(id, settings, ctx.rng, ctx.events);
                    return Flight::Consumed;
                }
                if let Some(strike) = field.strike(id, ctx.damage, settings, ctx.rng, ctx.events) {
                    report.credit += strike.credit;
                    if strike.special == SpecialKind::Multiplier
                        && active + report.spawned.len() < settings.max_active_balls
                    {
                        let angle = -ctx.rng.random::<f32>() * std::f32::consts::PI;
                        let vel = Vec2::from_angle(angle) * ball.speed();
                        report.spawned.push((ball.pos, vel));
                        ctx.events.push(GameEvent::BallMultiplied { pos: ball.pos });
                    }
                }
            }
            Contact::Boundary(_) => ctx.events.push(GameEvent::WallHit),
        }

        remaining -= t;
    }

    if remaining > 0.0 {
        log::warn!(
            "Ball {} used all {} collision iterations, {:.3} of the frame left",
            ball.id,
            settings.collision_iterations,
            remaining
        );
    }
    Flight::Flying
}

/// Discrete motion: bounce off the sides and ceiling, burn every overlapped block
fn step_magma(ball: &mut Ball, field: &mut BlockField, ctx: &mut FlightContext) -> Flight {
    let settings = ctx.settings;
    let r = ball.radius;
    ball.pos += ball.vel;

    if ball.pos.x < r || ball.pos.x > settings.width - r {
        ball.vel.x = -ball.vel.x;
        ball.pos.x = ball.pos.x.clamp(r, settings.width - r);
        ctx.events.push(GameEvent::WallHit);
    }
    if ball.pos.y < r {
        ball.vel.y = -ball.vel.y;
        ball.pos.y = r;
        ctx.events.push(GameEvent::WallHit);
    }
    if ball.pos.y > settings.height - r {
        land(ball, ctx);
        return Flight::Landed;
    }

    let burning: Vec<u32> = field
        .blocks
        .iter()
        .filter(|b| b.rect().overlaps_circle_bounds(ball.pos, r))
        .map(|b| b.id)
        .collect();
    for id in burning {
        field.incinerate(id, settings, ctx.rng, ctx.events);
    }

    Flight::Flying
}

fn land(ball: &Ball, ctx: &mut FlightContext) {
    let x = ball.pos.x.clamp(ball.radius, ctx.settings.width - ball.radius);
    if ctx.landing_x.is_none() {
        *ctx.landing_x = Some(x);
    }
    ctx.events.push(GameEvent::BallLanded { x });
}

/// Pull balls straight at `target`; returns how many normal balls arrived
pub fn recall(balls: &mut Vec<Ball>, target: Vec2, speed: f32) -> u32 {
    let mut arrived = 0;
    balls.retain_mut(|ball| {
        let to_target = target - ball.pos;
        let dist = to_target.length();
        if dist < speed {
            if ball.is_reclaimable() {
                arrived += 1;
            }
            return false;
        }
        ball.pos += to_target / dist * speed;
        true
    });
    arrived
}

/// Multiply every ball's speed, holding the result to `max_speed`
pub fn boost(balls: &mut [Ball], multiplier: f32, max_speed: f32) {
    for ball in balls {
        ball.vel = cap_speed(ball.vel * multiplier, max_speed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;

    struct Rig {
        settings: Settings,
        field: BlockField,
        rng: Pcg32,
        events: Vec<GameEvent>,
        landing_x: Option<f32>,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                settings: Settings {
                    item_chance: 0.0,
                    ..Settings::classic()
                },
                field: BlockField::new(Pcg32::seed_from_u64(0)),
                rng: Pcg32::seed_from_u64(1),
                events: Vec::new(),
                landing_x: None,
            }
        }

        fn step(&mut self, balls: &mut Vec<Ball>) -> FlightReport {
            let mut ctx = FlightContext {
                settings: &self.settings,
                damage: 1,
                rng: &mut self.rng,
                events: &mut self.events,
                landing_x: &mut self.landing_x,
            };
            advance(balls, &mut self.field, &mut ctx)
        }
    }

    fn ball(pos: Vec2, vel: Vec2) -> Ball {
        Ball::new(1, pos, vel, 6.0, BallKind::Normal)
    }

    fn count_hits(events: &[GameEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, GameEvent::BlockHit { .. }))
            .count()
    }

    #[test]
    fn test_free_flight() {
        let mut rig = Rig::new();
        let mut balls = vec![ball(Vec2::new(300.0, 400.0), Vec2::new(3.0, -4.0))];
        rig.step(&mut balls);
        assert_eq!(balls[0].pos, Vec2::new(303.0, 396.0));
        assert!(rig.events.is_empty());
    }

    #[test]
    fn test_fast_ball_hits_thin_block() {
        let mut rig = Rig::new();
        // 10 wide, left face 95 units right of the ball centre
        rig.field.blocks.push(crate::sim::Block {
            id: 7,
            pos: Vec2::new(395.0, 390.0),
            size: Vec2::new(10.0, 20.0),
            health: 5,
            special: SpecialKind::None,
            color: crate::sim::Hsl::new(0.0, 0.0, 0.0),
        });
        let mut balls = vec![ball(Vec2::new(300.0, 400.0), Vec2::new(90.0, 0.0))];
        rig.step(&mut balls);

        assert_eq!(count_hits(&rig.events), 1);
        assert_eq!(rig.field.block(7).unwrap().health, 4);
        assert!(balls[0].vel.x < 0.0);
        assert!(balls[0].pos.x < 395.0);
    }

    #[test]
    fn test_floor_landing_records_first_x() {
        let mut rig = Rig::new();
        let h = rig.settings.height;
        let mut balls = vec![
            ball(Vec2::new(100.0, h - 10.0), Vec2::new(0.0, 8.0)),
            Ball::new(2, Vec2::new(500.0, h - 10.0), Vec2::new(0.0, 8.0), 6.0, BallKind::Normal),
        ];
        let report = rig.step(&mut balls);
        assert!(balls.is_empty());
        assert_eq!(report.reclaimed, 2);
        assert_eq!(rig.landing_x, Some(100.0));
    }

    #[test]
    fn test_landing_x_is_clamped() {
        let mut rig = Rig::new();
        let h = rig.settings.height;
        // Heading down-left into the corner
        let mut balls = vec![ball(Vec2::new(7.0, h - 7.0), Vec2::new(-5.0, 5.0))];
        for _ in 0..4 {
            rig.step(&mut balls);
        }
        assert!(balls.is_empty());
        assert!(rig.landing_x.unwrap() >= 6.0);
    }

    #[test]
    fn test_bomb_is_consumed() {
        let mut rig = Rig::new();
        let id = rig.field.place(&rig.settings, 10, 100.0, 500, SpecialKind::None);
        let target = rig.field.block(id).unwrap().center();
        let mut balls = vec![Ball::new(
            1,
            Vec2::new(target.x, target.y + 40.0),
            Vec2::new(0.0, -10.0),
            9.0,
            BallKind::Bomb,
        )];
        let mut report = FlightReport::default();
        for _ in 0..5 {
            report = rig.step(&mut balls);
        }
        assert!(balls.is_empty());
        assert_eq!(report.reclaimed, 0);
        assert_eq!(rig.field.block(id).unwrap().health, 400);
    }

    #[test]
    fn test_magma_burns_through() {
        let mut rig = Rig::new();
        let a = rig.field.place(&rig.settings, 10, 100.0, 999, SpecialKind::None);
        let b = rig.field.place(&rig.settings, 10, 78.0, 999, SpecialKind::None);
        let x = rig.field.block(a).unwrap().center().x;
        let mut balls = vec![Ball::new(1, Vec2::new(x, 200.0), Vec2::new(0.0, -7.5), 7.2, BallKind::Magma)];

        for _ in 0..30 {
            rig.step(&mut balls);
        }
        assert!(rig.field.block(a).is_none());
        assert!(rig.field.block(b).is_none());
        // Burned without bouncing off the blocks
        assert_eq!(count_hits(&rig.events), 0);
        assert!(balls[0].vel.y > 0.0);
    }

    #[test]
    fn test_multiplier_spawns_ball() {
        let mut rig = Rig::new();
        let id = rig.field.place(&rig.settings, 10, 100.0, 5, SpecialKind::Multiplier);
        let c = rig.field.block(id).unwrap().center();
        let mut balls = vec![ball(Vec2::new(c.x, c.y + 20.0), Vec2::new(0.0, -10.0))];
        let report = rig.step(&mut balls);

        assert_eq!(report.spawned.len(), 1);
        let (_, vel) = report.spawned[0];
        assert!((vel.length() - 10.0).abs() < 1e-3);
        assert!(vel.y <= 0.0);
    }

    #[test]
    fn test_multiplier_respects_cap() {
        let mut rig = Rig::new();
        rig.settings.max_active_balls = 1;
        let id = rig.field.place(&rig.settings, 10, 100.0, 5, SpecialKind::Multiplier);
        let c = rig.field.block(id).unwrap().center();
        let mut balls = vec![ball(Vec2::new(c.x, c.y + 20.0), Vec2::new(0.0, -10.0))];
        let report = rig.step(&mut balls);
        assert!(report.spawned.is_empty());
    }

    #[test]
    fn test_multiplier_fills_cap_in_one_frame() {
        let mut rig = Rig::new();
        rig.settings.max_active_balls = 5;
        let mut balls = Vec::new();
        for (n, col) in [2, 10, 18].into_iter().enumerate() {
            let id = rig.field.place(&rig.settings, col, 100.0, 5, SpecialKind::Multiplier);
            let c = rig.field.block(id).unwrap().center();
            let mut b = ball(Vec2::new(c.x, c.y + 20.0), Vec2::new(0.0, -10.0));
            b.id = n as u32 + 1;
            balls.push(b);
        }
        let report = rig.step(&mut balls);

        // 3 flying + 2 spawned reaches the cap, the third hit spawns nothing
        assert_eq!(balls.len(), 3);
        assert_eq!(report.spawned.len(), 2);
        let multiplied = rig
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::BallMultiplied { .. }))
            .count();
        assert_eq!(multiplied, 2);
    }

    #[test]
    fn test_recall_credits_normal_balls_only() {
        let target = Vec2::new(300.0, 720.0);
        let mut balls = vec![
            ball(Vec2::new(300.0, 100.0), Vec2::ZERO),
            Ball::new(2, Vec2::new(250.0, 700.0), Vec2::ZERO, 9.0, BallKind::Bomb),
            Ball::new(3, Vec2::new(310.0, 710.0), Vec2::ZERO, 6.0, BallKind::Normal),
        ];
        let mut arrived = recall(&mut balls, target, 35.0);
        assert_eq!(arrived, 1);
        assert_eq!(balls.len(), 2);
        while !balls.is_empty() {
            arrived += recall(&mut balls, target, 35.0);
        }
        assert_eq!(arrived, 2);
    }

    #[test]
    fn test_boost_caps_speed() {
        let mut balls = vec![ball(Vec2::ZERO, Vec2::new(0.0, -8.0))];
        boost(&mut balls, 5.0, 20.0);
        assert!((balls[0].speed() - 20.0).abs() < 1e-4);
        boost(&mut balls, 0.5, 20.0);
        assert!((balls[0].speed() - 10.0).abs() < 1e-4);
    }

    proptest! {
        #[test]
        fn prop_speed_never_exceeds_cap(
            x in 20.0f32..650.0,
            y in 20.0f32..700.0,
            angle in 0.0f32..std::f32::consts::TAU,
            speed in 1.0f32..20.0,
        ) {
            let mut rig = Rig::new();
            rig.field.generate(&rig.settings, 1, 1, &mut Pcg32::seed_from_u64(3));
            let mut balls = vec![ball(Vec2::new(x, y), Vec2::from_angle(angle) * speed)];
            for _ in 0..60 {
                rig.step(&mut balls);
                for b in &balls {
                    prop_assert!(b.speed() <= rig.settings.max_speed + 1e-3);
                }
            }
        }

        #[test]
        fn prop_side_wall_reflection_is_elastic(
            y in 100.0f32..600.0,
            vx in 1.0f32..14.0,
            vy in -14.0f32..-1.0,
        ) {
            let mut rig = Rig::new();
            let w = rig.settings.width;
            let mut balls = vec![ball(Vec2::new(w - 6.5, y), Vec2::new(vx, vy))];
            rig.step(&mut balls);
            prop_assert_eq!(balls[0].vel, Vec2::new(-vx, vy));
        }
    }
}
