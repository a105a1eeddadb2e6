//! Game tuning and variant presets
//!
//! One parameterized core covers both shipped variants: the pattern stages
//! (`Settings::classic`) and the maze stages (`Settings::maze`). Settings are
//! plain JSON so a variant can be tuned without rebuilding.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// How the block field is generated each stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FieldMode {
    /// Boolean stencils (heart, clover, ...) with special blocks
    #[default]
    Pattern,
    /// Randomized DFS maze with a single entrance and exit
    Maze,
}

impl FieldMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldMode::Pattern => "classic",
            FieldMode::Maze => "maze",
        }
    }
}

impl std::str::FromStr for FieldMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "classic" | "pattern" => Ok(FieldMode::Pattern),
            "maze" => Ok(FieldMode::Maze),
            other => Err(format!("unknown field mode '{}'", other)),
        }
    }
}

/// Starting or bonus counts for the special ammo kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AmmoCounts {
    pub bomb: u32,
    pub magma: u32,
    pub dice: u32,
}

/// Game settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Field generation strategy
    pub mode: FieldMode,

    // === Field geometry ===
    pub width: f32,
    pub height: f32,
    pub cols: usize,
    pub block_height: f32,
    pub block_gap: f32,

    // === Balls ===
    pub ball_radius: f32,
    /// Launch speed at the start of a stage (units/frame)
    pub base_speed: f32,
    /// Absolute speed cap
    pub max_speed: f32,
    /// Per-frame velocity factor while shooting (1.0 = none)
    pub acceleration: f32,
    pub min_vertical_speed: f32,
    pub recall_speed: f32,
    pub base_ball_count: u32,
    pub shoot_delay_frames: u32,
    pub max_active_balls: usize,

    // === Turn speed ramp ===
    /// Frames between turn-speed steps (0 disables the ramp)
    pub speed_step_frames: u32,
    pub speed_step: f32,

    // === Collision ===
    pub collision_iterations: u32,
    pub collision_epsilon: f32,
    pub normal_epsilon: f32,

    // === Pattern stages ===
    pub pattern_scale: usize,
    pub pattern_start_row: usize,
    /// Fraction of pattern blocks promoted to a special variant
    pub special_block_chance: f32,
    /// Added to both health bounds for every cleared stage
    pub health_step_per_stage: u32,

    // === Maze stages ===
    pub maze_rows: usize,
    pub maze_top_offset: f32,

    // === Items ===
    pub item_chance: f32,
    pub item_ball_bonus: u32,
    pub item_fall_speed: f32,

    // === Ammo ===
    pub starting_ammo: AmmoCounts,
    pub stage_clear_ammo: AmmoCounts,

    // === Flow ===
    /// Recall automatically when the last block breaks mid-volley
    pub recall_on_clear: bool,
    pub block_move_frames: u32,
    pub shooter_move_frames: u32,
    pub regenerate_delay_frames: u32,
    pub dice_roll_frames: u32,
    pub dice_reveal_lead_frames: u32,
    pub dice_reveal_frames: u32,
    pub chain_step_frames: u32,
    pub chain_tail_frames: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self::classic()
    }
}

impl Settings {
    /// Pattern stages: hearts, clovers, diamonds, spades
    pub fn classic() -> Self {
        Self {
            mode: FieldMode::Pattern,

            width: 672.0,
            height: 750.0,
            cols: 24,
            block_height: 20.0,
            block_gap: 2.0,

            ball_radius: 6.0,
            base_speed: 7.5,
            max_speed: 20.0,
            acceleration: 1.0,
            min_vertical_speed: MIN_VERTICAL_SPEED,
            recall_speed: 35.0,
            base_ball_count: 10,
            shoot_delay_frames: 4,
            max_active_balls: MAX_ACTIVE_BALLS,

            // 500 ms at 60 Hz
            speed_step_frames: FRAMES_PER_SECOND / 2,
            speed_step: 0.05,

            collision_iterations: MAX_COLLISION_ITERATIONS,
            collision_epsilon: COLLISION_EPSILON,
            normal_epsilon: NORMAL_EPSILON,

            pattern_scale: 2,
            pattern_start_row: 3,
            special_block_chance: 0.2,
            health_step_per_stage: 5,

            maze_rows: 20,
            maze_top_offset: 60.0,

            item_chance: 0.15,
            item_ball_bonus: 1,
            item_fall_speed: 2.0,

            starting_ammo: AmmoCounts {
                bomb: 5,
                magma: 3,
                dice: 5,
            },
            stage_clear_ammo: AmmoCounts {
                bomb: 2,
                magma: 1,
                dice: 2,
            },

            recall_on_clear: true,
            block_move_frames: 30,
            shooter_move_frames: 25,
            regenerate_delay_frames: FRAMES_PER_SECOND,
            dice_roll_frames: 75,
            dice_reveal_lead_frames: 18,
            dice_reveal_frames: 30,
            chain_step_frames: 1,
            chain_tail_frames: FRAMES_PER_SECOND / 2,
        }
    }

    /// Maze stages: escape through the single exit to chain-clear the field
    pub fn maze() -> Self {
        Self {
            mode: FieldMode::Maze,
            width: 700.0,
            cols: 21,
            base_speed: 10.5,
            max_speed: 100.0,
            acceleration: 1.0005,
            base_ball_count: 20,
            speed_step_frames: 0,
            special_block_chance: 0.0,
            starting_ammo: AmmoCounts::default(),
            stage_clear_ammo: AmmoCounts::default(),
            recall_on_clear: false,
            ..Self::classic()
        }
    }

    /// Settings for a mode's preset
    pub fn for_mode(mode: FieldMode) -> Self {
        match mode {
            FieldMode::Pattern => Self::classic(),
            FieldMode::Maze => Self::maze(),
        }
    }

    /// Width of one grid column's block
    pub fn block_width(&self) -> f32 {
        (self.width - (self.cols as f32 + 1.0) * self.block_gap) / self.cols as f32
    }

    /// Horizontal distance between neighbouring column origins
    pub fn col_pitch(&self) -> f32 {
        self.block_width() + self.block_gap
    }

    /// Vertical distance between neighbouring rows (one descent step)
    pub fn row_pitch(&self) -> f32 {
        self.block_height + self.block_gap
    }

    pub fn shooter_y(&self) -> f32 {
        self.height - SHOOTER_FLOOR_OFFSET
    }

    /// Blocks whose bottom edge crosses this line end the run
    pub fn game_over_line(&self) -> f32 {
        self.shooter_y() - self.block_height / 2.0
    }

    /// Grid column containing `x`, if any
    pub fn column_at(&self, x: f32) -> Option<usize> {
        let col = ((x - self.block_gap) / self.col_pitch()).floor();
        if col >= 0.0 && (col as usize) < self.cols {
            Some(col as usize)
        } else {
            None
        }
    }

    /// Parse settings from JSON; missing fields take the classic defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load settings from a JSON file, falling back to the preset for `mode`
    pub fn load(path: impl AsRef<Path>, mode: FieldMode) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Invalid settings in {}: {} - using {} preset", path.display(), e, mode.as_str());
                    Self::for_mode(mode)
                }
            },
            Err(e) => {
                log::warn!("Could not read {}: {} - using {} preset", path.display(), e, mode.as_str());
                Self::for_mode(mode)
            }
        }
    }

    /// Write settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path.as_ref(), json)?;
        log::info!("Settings saved to {}", path.as_ref().display());
        Ok(())
    }
}
