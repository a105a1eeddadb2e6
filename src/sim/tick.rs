//! Turn state machine and fixed-step tick
//!
//! Player commands are methods on `GameState` that check the current phase
//! and either apply or return `false` without touching anything. `tick`
//! feeds one frame's commands through them and then advances the volley,
//! the field animations and any scheduled work by a single frame.

use super::collision::cap_speed;
use super::physics::{self, FlightContext};
use super::schedule::Task;
use super::state::{
    AmmoKind, BallKind, DicePhase, DiceRoll, GameEvent, GamePhase, GameState, ShooterMove,
};
use crate::{clamp_aim_angle, direction, ease_out_quad};

/// Commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// New aim angle (radians, screen coordinates)
    pub aim: Option<f32>,
    /// Toggle an ammo kind
    pub select_ammo: Option<AmmoKind>,
    /// Fire the selected ammo
    pub fire: bool,
    /// Pull every ball back to the shooter
    pub recall: bool,
    /// Speed multiplier (2..=5) for balls in flight
    pub boost: Option<u32>,
    /// Start over with the same seed and settings
    pub reset: bool,
}

/// Advance the game state by one frame
pub fn tick(state: &mut GameState, input: &TickInput) {
    if input.reset {
        state.reset();
        return;
    }
    if state.is_game_over() {
        return;
    }

    if let Some(angle) = input.aim {
        state.set_aim(angle);
    }
    if let Some(kind) = input.select_ammo {
        state.select_ammo(kind);
    }
    if input.fire {
        state.fire();
    }
    if input.recall {
        state.recall();
    }
    if let Some(multiplier) = input.boost {
        state.boost_speed(multiplier);
    }

    state.time_ticks += 1;
    for task in state.schedule.take_due(state.time_ticks) {
        state.run_task(task);
    }

    match state.phase {
        GamePhase::Shooting => {
            state.release_ball();
            state.update_flight();
        }
        GamePhase::Recalling => state.update_recall(),
        GamePhase::BlocksDescending => state.update_descent(),
        _ => {}
    }

    state.update_shooter_move();
    let bonus = state.field.update_items(&state.settings, &mut state.events);
    state.total_ball_count += bonus;
    state.field.update_particles();
    state.update_dice();
}

impl GameState {
    // === Commands ===

    /// Point the shooter; flat or downward angles are clamped
    pub fn set_aim(&mut self, angle: f32) -> bool {
        if self.is_game_over() {
            return false;
        }
        self.aim_angle = clamp_aim_angle(angle);
        true
    }

    /// Toggle an ammo kind; an empty or reselected kind falls back to normal
    pub fn select_ammo(&mut self, kind: AmmoKind) -> bool {
        if self.is_shooting() || self.is_game_over() {
            return false;
        }
        let available = match kind {
            AmmoKind::Normal => 0,
            AmmoKind::Bomb => self.ammo.bomb,
            AmmoKind::Magma => self.ammo.magma,
            AmmoKind::Dice => self.ammo.dice,
        };
        self.selected_ammo = if kind == self.selected_ammo || available == 0 {
            AmmoKind::Normal
        } else {
            kind
        };
        true
    }

    /// True when a fire command would be accepted
    pub fn can_fire(&self) -> bool {
        self.phase == GamePhase::Aiming && self.shooter_move.is_none() && self.dice.is_none()
    }

    /// Fire the selected ammo
    ///
    /// Special balls go out as a single-ball volley and leave the normal ball
    /// count alone. Dice starts a reroll instead of a volley. Selected ammo
    /// that has run out fires a normal volley.
    pub fn fire(&mut self) -> bool {
        if !self.can_fire() {
            return false;
        }

        match self.selected_ammo {
            AmmoKind::Bomb if self.ammo.bomb > 0 => {
                self.ammo.bomb -= 1;
                self.start_volley(1, BallKind::Bomb);
            }
            AmmoKind::Magma if self.ammo.magma > 0 => {
                self.ammo.magma -= 1;
                self.start_volley(1, BallKind::Magma);
            }
            AmmoKind::Dice if self.ammo.dice > 0 => {
                let Some(healths) = self.field.plan_reroll(&mut self.rng) else {
                    return false;
                };
                self.ammo.dice -= 1;
                self.selected_ammo = AmmoKind::Normal;
                self.dice = Some(DiceRoll {
                    phase: DicePhase::Rolling,
                    life: self.settings.dice_roll_frames,
                    max_life: self.settings.dice_roll_frames,
                    healths,
                });
                self.events.push(GameEvent::DiceRolled);
                log::debug!("Dice roll started, {} charges left", self.ammo.dice);
            }
            _ => {
                if self.total_ball_count == 0 {
                    return false;
                }
                let count = self.total_ball_count;
                self.total_ball_count = 0;
                self.start_volley(count, BallKind::Normal);
            }
        }
        true
    }

    fn start_volley(&mut self, count: u32, kind: BallKind) {
        self.phase = GamePhase::Shooting;
        self.balls_to_shoot = count;
        self.volley_kind = kind;
        self.shoot_cooldown = 0;
        self.landing_x = None;
        log::debug!("Volley of {} {:?} ball(s) at {:.3} rad", count, kind, self.aim_angle);
    }

    /// Bring every ball home early
    pub fn recall(&mut self) -> bool {
        if self.phase != GamePhase::Shooting || (self.balls_to_shoot == 0 && self.balls.is_empty()) {
            return false;
        }
        self.begin_recall();
        true
    }

    /// Queued balls are credited at once, flying ones as they arrive
    fn begin_recall(&mut self) {
        if self.volley_kind == BallKind::Normal {
            self.total_ball_count += self.balls_to_shoot;
        }
        self.balls_to_shoot = 0;
        self.phase = GamePhase::Recalling;
        self.field.clear_items();
        self.events.push(GameEvent::Recall);
        log::debug!("Recall with {} ball(s) in flight", self.balls.len());
    }

    /// Multiply the speed of every ball in flight
    pub fn boost_speed(&mut self, multiplier: u32) -> bool {
        if self.phase != GamePhase::Shooting || self.balls.is_empty() {
            return false;
        }
        if !(2..=5).contains(&multiplier) {
            return false;
        }
        physics::boost(&mut self.balls, multiplier as f32, self.settings.max_speed);
        self.events.push(GameEvent::SpeedBoost { multiplier });
        true
    }

    /// Start over with the current seed; pending scheduled work is dropped
    pub fn reset(&mut self) {
        self.restart(self.seed);
    }

    pub fn restart(&mut self, seed: u64) {
        log::info!("Restarting game (seed {})", seed);
        *self = GameState::with_settings(seed, self.settings.clone());
    }

    // === Turn flow ===

    /// Close the turn: retarget the shooter, then advance the stage or lower the field
    pub(crate) fn end_turn(&mut self) {
        self.phase = GamePhase::Aiming;
        self.selected_ammo = AmmoKind::Normal;
        self.volley_kind = BallKind::Normal;
        self.balls_to_shoot = 0;

        if let Some(target) = self.landing_x.take() {
            if (target - self.shooter_x).abs() > 1.0 {
                self.shooter_move = Some(ShooterMove {
                    start_x: self.shooter_x,
                    target_x: target,
                    progress: 0,
                });
            }
        }

        if !self.clear_bonus_active {
            self.field.boost_items(3.0);
        }

        self.turn += 1;
        self.events.push(GameEvent::TurnEnded { turn: self.turn });

        if self.field.is_empty() {
            self.stage_index += 1;
            self.total_ball_count = self.settings.base_ball_count;
            self.turn_speed = self.settings.base_speed;
            let bonus = self.settings.stage_clear_ammo;
            self.ammo.bomb += bonus.bomb;
            self.ammo.magma += bonus.magma;
            self.ammo.dice += bonus.dice;
            self.phase = GamePhase::Regenerating;
            self.schedule.after(
                self.time_ticks,
                self.settings.regenerate_delay_frames,
                Task::RegenerateField,
            );
            self.events.push(GameEvent::StageCleared {
                stage: self.stage_index,
            });
            log::info!("Turn {}: field cleared, stage {} next", self.turn, self.stage_index);
        } else {
            self.field.start_descent(&self.settings);
            self.phase = GamePhase::BlocksDescending;
            log::info!("Turn {}: {} blocks descend", self.turn, self.field.blocks.len());
        }
    }

    fn game_over(&mut self) {
        self.phase = GamePhase::GameOver;
        self.schedule.clear();
        self.events.push(GameEvent::GameOver { turn: self.turn });
        log::info!("Game over on turn {}", self.turn);
    }

    /// A ball left the maze: take every normal ball back and blow up the field
    fn maze_escape(&mut self) {
        let flying = self.balls.iter().filter(|b| b.is_reclaimable()).count() as u32;
        let queued = if self.volley_kind == BallKind::Normal {
            self.balls_to_shoot
        } else {
            0
        };
        self.total_ball_count += flying + queued;
        self.balls.clear();
        self.balls_to_shoot = 0;
        self.phase = GamePhase::ChainClearing;
        self.events.push(GameEvent::MazeEscaped);

        if self.field.is_empty() {
            self.schedule
                .after(self.time_ticks, self.settings.chain_tail_frames, Task::EndTurn);
        } else {
            self.schedule
                .every(self.time_ticks, self.settings.chain_step_frames, Task::ChainClearStep);
        }
        log::debug!("Maze escaped, chain clearing {} blocks", self.field.blocks.len());
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::SpeedStep => self.step_turn_speed(),
            Task::RegenerateField => {
                self.generate_field();
                if self.phase == GamePhase::Regenerating {
                    self.phase = GamePhase::Aiming;
                }
            }
            Task::ChainClearStep => {
                let more = self
                    .field
                    .chain_clear_step(&self.settings, &mut self.rng, &mut self.events);
                if !more {
                    self.schedule.cancel(Task::ChainClearStep);
                    self.schedule
                        .after(self.time_ticks, self.settings.chain_tail_frames, Task::EndTurn);
                }
            }
            Task::EndTurn => self.end_turn(),
        }
    }

    /// Timer-driven ramp: only counts while a volley is out
    fn step_turn_speed(&mut self) {
        if self.phase != GamePhase::Shooting {
            return;
        }
        let old = self.turn_speed;
        let new = (old + self.settings.speed_step).min(self.settings.max_speed);
        if new <= old {
            return;
        }
        self.turn_speed = new;
        if old > 0.0 {
            let factor = new / old;
            for ball in &mut self.balls {
                ball.vel = cap_speed(ball.vel * factor, self.settings.max_speed);
            }
        }
        log::debug!("Turn speed {:.2} (x{} damage)", new, self.damage_multiplier());
    }

    // === Per-frame updates ===

    fn release_ball(&mut self) {
        if self.balls_to_shoot == 0 {
            return;
        }
        if self.shoot_cooldown > 0 {
            self.shoot_cooldown -= 1;
            return;
        }
        let vel = direction(self.aim_angle) * self.turn_speed;
        let kind = self.volley_kind;
        self.spawn_ball(self.shooter_pos(), vel, kind);
        self.events.push(GameEvent::BallFired { kind });
        self.balls_to_shoot -= 1;
        self.shoot_cooldown = self.settings.shoot_delay_frames;
    }

    fn update_flight(&mut self) {
        if self
            .balls
            .iter()
            .any(|b| self.field.exit_reached(b.pos, b.vel, &self.settings))
        {
            self.maze_escape();
            return;
        }

        if self.field.is_empty() && !self.clear_bonus_active {
            self.clear_bonus_active = true;
            physics::boost(&mut self.balls, 3.0, self.settings.max_speed);
            self.field.boost_items(3.0);
        }

        let damage = self.damage_multiplier();
        let mut ctx = FlightContext {
            settings: &self.settings,
            damage,
            rng: &mut self.rng,
            events: &mut self.events,
            landing_x: &mut self.landing_x,
        };
        let report = physics::advance(&mut self.balls, &mut self.field, &mut ctx);

        self.total_ball_count += report.reclaimed + report.credit;
        for (pos, vel) in report.spawned {
            self.spawn_ball(pos, vel, BallKind::Normal);
        }

        let in_play = self.balls_to_shoot > 0 || !self.balls.is_empty();
        if in_play && self.field.is_empty() && self.settings.recall_on_clear {
            self.begin_recall();
        } else if !in_play {
            self.end_turn();
        }
    }

    fn update_recall(&mut self) {
        let target = self.shooter_pos();
        self.total_ball_count += physics::recall(&mut self.balls, target, self.settings.recall_speed);
        if self.balls.is_empty() {
            self.end_turn();
        }
    }

    fn update_descent(&mut self) {
        if !self.field.update_descent() {
            return;
        }
        if self.field.crosses_line(self.settings.game_over_line()) {
            self.game_over();
        } else {
            self.phase = GamePhase::Aiming;
        }
    }

    fn update_shooter_move(&mut self) {
        let frames = self.settings.shooter_move_frames.max(1);
        let Some(mv) = self.shooter_move.as_mut() else {
            return;
        };
        mv.progress += 1;
        let t = ease_out_quad(mv.progress as f32 / frames as f32);
        self.shooter_x = mv.start_x + (mv.target_x - mv.start_x) * t;
        if mv.progress >= frames {
            self.shooter_x = mv.target_x;
            self.shooter_move = None;
        }
    }

    fn update_dice(&mut self) {
        let lead = self.settings.dice_reveal_lead_frames;
        let reveal = self.settings.dice_reveal_frames;
        let Some(dice) = self.dice.as_mut() else {
            return;
        };
        dice.life = dice.life.saturating_sub(1);

        match dice.phase {
            DicePhase::Rolling if dice.life <= lead => {
                let healths = std::mem::take(&mut dice.healths);
                dice.phase = DicePhase::Revealing;
                dice.life = reveal + lead;
                dice.max_life = reveal + lead;
                self.field.apply_reroll(&healths);
                self.events.push(GameEvent::DiceRevealed);
                log::debug!("Dice reroll applied to {} blocks", healths.len());
            }
            DicePhase::Revealing if dice.life == 0 => self.dice = None,
            _ => {}
        }
    }
}
