//! Game state and core simulation types
//!
//! `GameState` is the whole session: every flag, counter and entity the turn
//! loop touches lives here, so several games can run side by side and tests
//! can build one from a seed.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use super::field::BlockField;
use super::schedule::{Schedule, Task};
use crate::settings::{AmmoCounts, Settings};

/// Current phase of the turn cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for aim updates and a fire command
    Aiming,
    /// Releasing the volley and flying balls
    Shooting,
    /// Pulling every ball back to the shooter
    Recalling,
    /// Field sliding down one row
    BlocksDescending,
    /// Field cleared, next stage is about to be generated
    Regenerating,
    /// Maze exit reached, blocks detonating one by one
    ChainClearing,
    /// Run ended
    GameOver,
}

/// Ball variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BallKind {
    #[default]
    Normal,
    /// Detonates on the first block it touches
    Bomb,
    /// Burns straight through blocks
    Magma,
}

impl BallKind {
    /// Radius relative to the configured ball radius
    pub fn radius_scale(&self) -> f32 {
        match self {
            BallKind::Normal => 1.0,
            BallKind::Bomb => 1.5,
            BallKind::Magma => 1.2,
        }
    }
}

/// What the next fire command will use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AmmoKind {
    #[default]
    Normal,
    Bomb,
    Magma,
    /// Health reroll instead of a ball
    Dice,
}

/// A ball entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub kind: BallKind,
}

impl Ball {
    pub fn new(id: u32, pos: Vec2, vel: Vec2, radius: f32, kind: BallKind) -> Self {
        Self {
            id,
            pos,
            vel,
            radius,
            kind,
        }
    }

    pub fn speed(&self) -> f32 {
        self.vel.length()
    }

    /// Only normal balls are handed back to the player
    pub fn is_reclaimable(&self) -> bool {
        self.kind == BallKind::Normal
    }
}

/// Block special behaviours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpecialKind {
    #[default]
    None,
    /// Splash damage around the block whenever it is struck
    Explosion,
    /// Spawns an extra ball per hit, pays out its health when destroyed
    Multiplier,
}

/// HSL colour (hue in degrees, saturation/lightness in percent)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

impl Hsl {
    pub const fn new(h: f32, s: f32, l: f32) -> Self {
        Self { h, s, l }
    }
}

/// A rectangular block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: u32,
    /// Top-left corner
    pub pos: Vec2,
    pub size: Vec2,
    pub health: i32,
    pub special: SpecialKind,
    pub color: Hsl,
}

impl Block {
    pub fn rect(&self) -> Rect {
        Rect::from_pos_size(self.pos, self.size)
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    pub fn bottom(&self) -> f32 {
        self.pos.y + self.size.y
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }
}

/// Falling pickup worth extra balls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: u32,
    pub pos: Vec2,
    /// Downward speed (units/frame)
    pub fall_speed: f32,
    pub radius: f32,
}

/// A particle for visual effects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub color: Hsl,
    /// Remaining frames
    pub life: f32,
    pub size: f32,
}

/// Why a block left the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestroyCause {
    /// Direct ball hit
    Hit,
    /// Caught in an explosion
    Splash,
    /// Burned by a magma ball
    Magma,
    /// Popped by the maze chain clear
    ChainClear,
}

/// Events emitted by the simulation for the presentation layer
///
/// The audio side maps these through `sound()` and applies its own
/// cooldowns and voice pooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    BallFired { kind: BallKind },
    WallHit,
    BlockHit { block_id: u32, special: SpecialKind },
    BlockDestroyed {
        block_id: u32,
        pos: Vec2,
        special: SpecialKind,
        cause: DestroyCause,
    },
    Explosion { pos: Vec2, radius: f32 },
    BallMultiplied { pos: Vec2 },
    MagmaBurn { block_id: u32 },
    ItemDropped { pos: Vec2 },
    ItemCollected,
    BallLanded { x: f32 },
    Recall,
    MazeEscaped,
    SpeedBoost { multiplier: u32 },
    DiceRolled,
    DiceRevealed,
    TurnEnded { turn: u32 },
    StageCleared { stage: u32 },
    FieldGenerated { stage: u32, blocks: usize },
    GameOver { turn: u32 },
}

impl GameEvent {
    /// Sound cue for this event, if it has one
    pub fn sound(&self) -> Option<&'static str> {
        match self {
            GameEvent::BallFired { .. } => Some("shoot"),
            GameEvent::WallHit => Some("wall"),
            GameEvent::BlockHit { special, .. } => match special {
                SpecialKind::Explosion => None,
                _ => Some("hit"),
            },
            // An exploding block is already covered by the explosion cue
            GameEvent::BlockDestroyed { special, cause, .. } => match (special, cause) {
                (SpecialKind::Explosion, _) => None,
                (_, DestroyCause::Hit) => Some("break"),
                _ => None,
            },
            GameEvent::Explosion { .. } => Some("explosion"),
            GameEvent::BallMultiplied { .. } => Some("multiply"),
            GameEvent::MagmaBurn { .. } => Some("fire"),
            GameEvent::ItemCollected => Some("item"),
            GameEvent::Recall | GameEvent::MazeEscaped => Some("clear"),
            GameEvent::SpeedBoost { .. } => Some("boost"),
            GameEvent::DiceRolled => Some("dice"),
            GameEvent::DiceRevealed | GameEvent::StageCleared { .. } => Some("item"),
            GameEvent::GameOver { .. } => Some("gameOver"),
            GameEvent::ItemDropped { .. }
            | GameEvent::BallLanded { .. }
            | GameEvent::TurnEnded { .. }
            | GameEvent::FieldGenerated { .. } => None,
        }
    }
}

/// Eased shooter slide toward the first landing point
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ShooterMove {
    pub start_x: f32,
    pub target_x: f32,
    pub progress: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DicePhase {
    /// New values computed but hidden
    Rolling,
    /// New values applied, animation winding down
    Revealing,
}

/// Pending health reroll
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiceRoll {
    pub phase: DicePhase,
    pub life: u32,
    pub max_life: u32,
    /// New health per block id, applied on reveal
    pub healths: Vec<(u32, i32)>,
}

impl DiceRoll {
    /// 0 at the start of the current phase, 1 at its end
    pub fn progress(&self) -> f32 {
        if self.max_life == 0 {
            1.0
        } else {
            1.0 - self.life as f32 / self.max_life as f32
        }
    }
}

/// RNG seed wrapper: gameplay and cosmetics draw from separate streams
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn gameplay(&self) -> Pcg32 {
        Pcg32::seed_from_u64(self.seed)
    }

    /// Particle stream, so effects never shift gameplay rolls
    pub fn cosmetic(&self) -> Pcg32 {
        Pcg32::seed_from_u64(self.seed ^ 0x9E37_79B9_7F4A_7C15)
    }
}

/// Complete session state
#[derive(Debug, Clone)]
pub struct GameState {
    pub settings: Settings,
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    /// Turn counter shown to the player (1-based)
    pub turn: u32,
    /// Stage counter selecting the pattern (1-based)
    pub stage_index: u32,
    pub phase: GamePhase,
    /// Balls available for the next normal volley
    pub total_ball_count: u32,
    /// Balls still queued in the current volley
    pub balls_to_shoot: u32,
    pub volley_kind: BallKind,
    pub shoot_cooldown: u32,
    /// Launch speed, ramped by the speed timer
    pub turn_speed: f32,
    pub aim_angle: f32,
    pub shooter_x: f32,
    /// First landing x of this turn
    pub landing_x: Option<f32>,
    pub shooter_move: Option<ShooterMove>,
    pub selected_ammo: AmmoKind,
    pub ammo: AmmoCounts,
    pub clear_bonus_active: bool,
    pub dice: Option<DiceRoll>,
    /// Balls in flight
    pub balls: Vec<Ball>,
    /// Blocks, items and particles
    pub field: BlockField,
    pub schedule: Schedule,
    /// Events since the last drain
    pub events: Vec<GameEvent>,
    /// Simulation frame counter
    pub time_ticks: u64,
    next_id: u32,
}

impl GameState {
    /// New classic game with the given seed
    pub fn new(seed: u64) -> Self {
        Self::with_settings(seed, Settings::classic())
    }

    /// New game with explicit settings; the first field is generated at once
    pub fn with_settings(seed: u64, settings: Settings) -> Self {
        let rng_state = RngState::new(seed);
        let mut state = Self {
            seed,
            rng: rng_state.gameplay(),
            turn: 1,
            stage_index: 1,
            phase: GamePhase::Aiming,
            total_ball_count: settings.base_ball_count,
            balls_to_shoot: 0,
            volley_kind: BallKind::Normal,
            shoot_cooldown: 0,
            turn_speed: settings.base_speed,
            aim_angle: -std::f32::consts::FRAC_PI_2,
            shooter_x: settings.width / 2.0,
            landing_x: None,
            shooter_move: None,
            selected_ammo: AmmoKind::Normal,
            ammo: settings.starting_ammo,
            clear_bonus_active: false,
            dice: None,
            balls: Vec::new(),
            field: BlockField::new(rng_state.cosmetic()),
            schedule: Schedule::default(),
            events: Vec::new(),
            time_ticks: 0,
            next_id: 1,
            settings,
        };

        if state.settings.speed_step_frames > 0 {
            state
                .schedule
                .every(0, state.settings.speed_step_frames, Task::SpeedStep);
        }
        state.generate_field();
        log::info!(
            "New {} game with seed {}",
            state.settings.mode.as_str(),
            seed
        );
        state
    }

    /// Allocate a new ball ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn shooter_pos(&self) -> Vec2 {
        Vec2::new(self.shooter_x, self.settings.shooter_y())
    }

    /// Add a ball to the simulation
    pub fn spawn_ball(&mut self, pos: Vec2, vel: Vec2, kind: BallKind) -> u32 {
        let id = self.next_entity_id();
        let radius = self.settings.ball_radius * kind.radius_scale();
        self.balls.push(Ball::new(id, pos, vel, radius, kind));
        id
    }

    /// Extra per-hit damage earned by a fast turn speed
    pub fn damage_multiplier(&self) -> i32 {
        let base = self.settings.base_speed;
        let max = self.settings.max_speed;
        if self.turn_speed >= max {
            return 3;
        }
        if max <= base {
            return 1;
        }
        let ratio = (self.turn_speed - base) / (max - base);
        if ratio >= 0.5 { 2 } else { 1 }
    }

    /// (Re)build the block field for the current stage
    pub fn generate_field(&mut self) {
        self.clear_bonus_active = false;
        let count = self
            .field
            .generate(&self.settings, self.stage_index, self.turn, &mut self.rng);
        self.events.push(GameEvent::FieldGenerated {
            stage: self.stage_index,
            blocks: count,
        });
    }

    /// Take all events emitted since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_shooting(&self) -> bool {
        matches!(self.phase, GamePhase::Shooting | GamePhase::Recalling)
    }

    pub fn is_recalling(&self) -> bool {
        self.phase == GamePhase::Recalling
    }

    pub fn is_blocks_moving(&self) -> bool {
        self.phase == GamePhase::BlocksDescending
    }

    pub fn is_shooter_moving(&self) -> bool {
        self.shooter_move.is_some()
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    /// Read-only view for rendering
    pub fn snapshot(&self) -> RenderSnapshot<'_> {
        RenderSnapshot {
            phase: self.phase,
            turn: self.turn,
            stage_index: self.stage_index,
            total_ball_count: self.total_ball_count,
            balls_to_shoot: self.balls_to_shoot,
            shooter: self.shooter_pos(),
            landing_x: self.landing_x,
            aim_angle: self.aim_angle,
            selected_ammo: self.selected_ammo,
            ammo: self.ammo,
            turn_speed: self.turn_speed,
            damage_multiplier: self.damage_multiplier(),
            is_shooting: self.is_shooting(),
            is_recalling: self.is_recalling(),
            is_blocks_moving: self.is_blocks_moving(),
            is_shooter_moving: self.is_shooter_moving(),
            is_clear_bonus_active: self.clear_bonus_active,
            dice_phase: self.dice.as_ref().map(|d| d.phase),
            dice_progress: self.dice.as_ref().map(|d| d.progress()),
            maze_exit_col: self.field.maze_exit_col,
            balls: &self.balls,
            blocks: &self.field.blocks,
            items: &self.field.items,
            particles: &self.field.particles,
        }
    }
}

/// Everything a renderer needs for one frame
#[derive(Debug, Serialize)]
pub struct RenderSnapshot<'a> {
    pub phase: GamePhase,
    pub turn: u32,
    pub stage_index: u32,
    pub total_ball_count: u32,
    pub balls_to_shoot: u32,
    pub shooter: Vec2,
    pub landing_x: Option<f32>,
    pub aim_angle: f32,
    pub selected_ammo: AmmoKind,
    pub ammo: AmmoCounts,
    pub turn_speed: f32,
    pub damage_multiplier: i32,
    pub is_shooting: bool,
    pub is_recalling: bool,
    pub is_blocks_moving: bool,
    pub is_shooter_moving: bool,
    pub is_clear_bonus_active: bool,
    pub dice_phase: Option<DicePhase>,
    pub dice_progress: Option<f32>,
    pub maze_exit_col: Option<usize>,
    pub balls: &'a [Ball],
    pub blocks: &'a [Block],
    pub items: &'a [Item],
    pub particles: &'a [Particle],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_generates_field() {
        let state = GameState::new(7);
        assert_eq!(state.phase, GamePhase::Aiming);
        assert_eq!(state.turn, 1);
        assert_eq!(state.total_ball_count, 10);
        assert!(!state.field.blocks.is_empty());
        assert!(state.field.blocks.iter().all(|b| b.health > 0));
        assert!(matches!(
            state.events.last(),
            Some(GameEvent::FieldGenerated { stage: 1, .. })
        ));
    }

    #[test]
    fn test_damage_multiplier_thresholds() {
        let mut state = GameState::new(1);
        let base = state.settings.base_speed;
        let max = state.settings.max_speed;

        state.turn_speed = base;
        assert_eq!(state.damage_multiplier(), 1);

        state.turn_speed = base + (max - base) * 0.49;
        assert_eq!(state.damage_multiplier(), 1);

        state.turn_speed = base + (max - base) * 0.5;
        assert_eq!(state.damage_multiplier(), 2);

        state.turn_speed = max;
        assert_eq!(state.damage_multiplier(), 3);
    }

    #[test]
    fn test_spawn_ball_scales_radius() {
        let mut state = GameState::new(1);
        state.spawn_ball(Vec2::ZERO, Vec2::X, BallKind::Bomb);
        assert_eq!(state.balls[0].radius, state.settings.ball_radius * 1.5);
        assert!(!state.balls[0].is_reclaimable());
    }

    #[test]
    fn test_event_sounds() {
        assert_eq!(GameEvent::WallHit.sound(), Some("wall"));
        assert_eq!(
            GameEvent::BlockHit {
                block_id: 1,
                special: SpecialKind::Explosion
            }
            .sound(),
            None
        );
        assert_eq!(
            GameEvent::BlockDestroyed {
                block_id: 1,
                pos: Vec2::ZERO,
                special: SpecialKind::None,
                cause: DestroyCause::Splash
            }
            .sound(),
            None
        );
        assert_eq!(
            GameEvent::BlockDestroyed {
                block_id: 1,
                pos: Vec2::ZERO,
                special: SpecialKind::None,
                cause: DestroyCause::Hit
            }
            .sound(),
            Some("break")
        );
        assert_eq!(
            GameEvent::BlockDestroyed {
                block_id: 1,
                pos: Vec2::ZERO,
                special: SpecialKind::Explosion,
                cause: DestroyCause::Hit
            }
            .sound(),
            None
        );
        assert_eq!(GameEvent::GameOver { turn: 3 }.sound(), Some("gameOver"));
    }

    #[test]
    fn test_snapshot_serializes() {
        let state = GameState::new(3);
        let json = serde_json::to_string(&state.snapshot()).unwrap();
        assert!(json.contains("\"phase\":\"Aiming\""));
    }

    #[test]
    fn test_same_seed_same_field() {
        let a = GameState::new(99);
        let b = GameState::new(99);
        let ha: Vec<i32> = a.field.blocks.iter().map(|b| b.health).collect();
        let hb: Vec<i32> = b.field.blocks.iter().map(|b| b.health).collect();
        assert_eq!(ha, hb);
    }
}
