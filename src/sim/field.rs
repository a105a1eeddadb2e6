//! Block field management
//!
//! Owns every block, falling item and particle on the board. Generation is
//! a strategy chosen by `Settings::mode`: pattern stages stamp an upscaled
//! stencil onto the column grid, maze stages carve a maze and wall it in.
//! All damage goes through here so destruction happens exactly once per
//! block and its side effects (items, explosions, multiplier payouts) fire
//! before physics moves on.

use std::collections::VecDeque;

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::maze::Maze;
use super::patterns::stencil_for_stage;
use super::state::{Block, DestroyCause, GameEvent, Hsl, Item, Particle, SpecialKind};
use crate::consts::{MAX_PARTICLES, PARTICLE_GRAVITY};
use crate::ease_out_quad;
use crate::settings::{FieldMode, Settings};

/// Health of the top and bottom maze rows
pub const MAZE_BORDER_HEALTH: i32 = 999;

const EXPLOSION_COLOR: Hsl = Hsl::new(0.0, 100.0, 50.0);
const MULTIPLIER_COLOR: Hsl = Hsl::new(210.0, 80.0, 75.0);

/// Area damage parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blast {
    /// Radius in column pitches
    pub radius_cells: f32,
    pub damage: i32,
    pub particles: usize,
}

impl Blast {
    /// Explosion block being struck or destroyed
    pub const SPECIAL_BLOCK: Blast = Blast {
        radius_cells: 2.0,
        damage: 1,
        particles: 20,
    };
    /// Bomb ball impact
    pub const BOMB: Blast = Blast {
        radius_cells: 2.5,
        damage: 100,
        particles: 60,
    };
    /// One step of the maze chain clear
    pub const CHAIN: Blast = Blast {
        radius_cells: 2.5,
        damage: 1,
        particles: 30,
    };

    pub fn radius(&self, settings: &Settings) -> f32 {
        self.radius_cells * settings.col_pitch()
    }
}

/// Result of a direct ball hit on a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strike {
    pub special: SpecialKind,
    pub destroyed: bool,
    /// Balls paid out by multiplier blocks destroyed as a result
    pub credit: u32,
}

/// One-row slide of the whole field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Descent {
    pub frame: u32,
    pub frames: u32,
    pub distance: f32,
    /// Offset already applied to the blocks
    applied: f32,
}

impl Descent {
    pub fn progress(&self) -> f32 {
        if self.frames == 0 {
            1.0
        } else {
            self.frame as f32 / self.frames as f32
        }
    }
}

/// Blocks, items and particles for one session
#[derive(Debug, Clone)]
pub struct BlockField {
    pub blocks: Vec<Block>,
    pub items: Vec<Item>,
    pub particles: Vec<Particle>,
    /// Exit column of the current maze stage
    pub maze_exit_col: Option<usize>,
    pub descent: Option<Descent>,
    /// Cosmetic randomness only
    fx_rng: Pcg32,
    next_id: u32,
}

impl BlockField {
    pub fn new(fx_rng: Pcg32) -> Self {
        Self {
            blocks: Vec::new(),
            items: Vec::new(),
            particles: Vec::new(),
            maze_exit_col: None,
            descent: None,
            fx_rng,
            next_id: 1,
        }
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn total_health(&self) -> i64 {
        self.blocks.iter().map(|b| b.health as i64).sum()
    }

    pub fn block(&self, id: u32) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    fn index_of(&self, id: u32) -> Option<usize> {
        self.blocks.iter().position(|b| b.id == id)
    }

    /// Top-left corner of a grid cell
    pub fn cell_origin(settings: &Settings, col: usize, y: f32) -> Vec2 {
        Vec2::new(settings.block_gap + col as f32 * settings.col_pitch(), y)
    }

    /// Add a single block at a grid column; returns its id
    pub fn place(
        &mut self,
        settings: &Settings,
        col: usize,
        y: f32,
        health: i32,
        special: SpecialKind,
    ) -> u32 {
        let id = self.next_id();
        let color = match special {
            SpecialKind::None => Hsl::new(0.0, 80.0, 60.0),
            SpecialKind::Explosion => EXPLOSION_COLOR,
            SpecialKind::Multiplier => MULTIPLIER_COLOR,
        };
        self.blocks.push(Block {
            id,
            pos: Self::cell_origin(settings, col, y),
            size: Vec2::new(settings.block_width(), settings.block_height),
            health,
            special,
            color,
        });
        id
    }

    // === Generation ===

    /// Replace the blocks with a fresh field; returns the block count
    pub fn generate(&mut self, settings: &Settings, stage: u32, turn: u32, rng: &mut Pcg32) -> usize {
        self.blocks.clear();
        self.descent = None;
        self.maze_exit_col = None;

        match settings.mode {
            FieldMode::Pattern => self.generate_pattern(settings, stage, rng),
            FieldMode::Maze => self.generate_maze(settings, turn, rng),
        }

        log::info!(
            "Stage {} generated: {} blocks ({})",
            stage,
            self.blocks.len(),
            settings.mode.as_str()
        );
        self.blocks.len()
    }

    fn generate_pattern(&mut self, settings: &Settings, stage: u32, rng: &mut Pcg32) {
        let stencil = stencil_for_stage(stage);
        let scale = settings.pattern_scale.max(1);
        let grid_width = (stencil.width() * scale) as i64;
        let col_offset = (settings.cols as i64 - grid_width).div_euclid(2);
        let bump = (settings.health_step_per_stage * stage.saturating_sub(1)) as i32;
        let size = Vec2::new(settings.block_width(), settings.block_height);

        for (r, c) in stencil.cells() {
            for sy in 0..scale {
                for sx in 0..scale {
                    let col = col_offset + (c * scale + sx) as i64;
                    let row = (settings.pattern_start_row + r * scale + sy) as i64;
                    if col < 0 || col >= settings.cols as i64 {
                        continue;
                    }

                    let hue = (stencil.hue + 2.0 * col as f32 - 2.0 * row as f32).rem_euclid(360.0);
                    let roll: i32 = if rng.random::<f32>() < 0.8 {
                        rng.random_range(20..=50)
                    } else {
                        rng.random_range(50..=99)
                    };
                    let health = roll + bump;

                    let id = self.next_id();
                    self.blocks.push(Block {
                        id,
                        pos: Vec2::new(
                            settings.block_gap + col as f32 * settings.col_pitch(),
                            settings.block_gap + row as f32 * settings.row_pitch(),
                        ),
                        size,
                        health,
                        special: SpecialKind::None,
                        color: Hsl::new(hue, 80.0, 60.0),
                    });
                }
            }
        }

        let count = (self.blocks.len() as f32 * settings.special_block_chance).floor() as usize;
        let count = count.min(self.blocks.len());
        for index in rand::seq::index::sample(rng, self.blocks.len(), count) {
            let explosion = rng.random_bool(0.5);
            let block = &mut self.blocks[index];
            if explosion {
                block.special = SpecialKind::Explosion;
                block.health = rng.random_range(1..=10);
                block.color = EXPLOSION_COLOR;
            } else {
                block.special = SpecialKind::Multiplier;
                block.health = rng.random_range(1..=5);
                block.color = MULTIPLIER_COLOR;
            }
        }
    }

    fn generate_maze(&mut self, settings: &Settings, turn: u32, rng: &mut Pcg32) {
        let maze = Maze::carve(settings.maze_rows, settings.cols, rng);
        let base_hue = ((turn * 40) % 360) as f32;
        let size = Vec2::new(settings.block_width(), settings.block_height);

        let walls: Vec<(usize, usize)> = maze.walls().collect();
        for (r, c) in walls {
            let health = if r == 0 || r == maze.rows - 1 {
                MAZE_BORDER_HEALTH
            } else {
                rng.random_range(100..=300)
            };
            let hue = (base_hue + 2.0 * c as f32 - 2.0 * r as f32).rem_euclid(360.0);
            let id = self.next_id();
            self.blocks.push(Block {
                id,
                pos: Vec2::new(
                    c as f32 * settings.col_pitch() + settings.block_gap,
                    settings.maze_top_offset + r as f32 * settings.row_pitch(),
                ),
                size,
                health,
                special: SpecialKind::None,
                color: Hsl::new(hue, 80.0, 60.0),
            });
        }

        self.maze_exit_col = Some(maze.exit_col());
        log::debug!("Maze exit at column {}", maze.exit_col());
    }

    // === Damage ===

    /// Apply a direct ball hit
    ///
    /// Explosion blocks detonate before their own health is checked, so the
    /// splash lands before anything it kills could be hit again.
    pub fn strike(
        &mut self,
        block_id: u32,
        damage: i32,
        settings: &Settings,
        rng: &mut Pcg32,
        events: &mut Vec<GameEvent>,
    ) -> Option<Strike> {
        let index = self.index_of(block_id)?;
        let block = &mut self.blocks[index];
        let before = block.health;
        block.health -= damage;
        let special = block.special;
        let center = block.center();
        events.push(GameEvent::BlockHit { block_id, special });

        let mut credit = 0;
        if special == SpecialKind::Explosion {
            credit += self.detonate(center, Blast::SPECIAL_BLOCK, Some(block_id), settings, rng, events);
        }

        // The splash may already have taken it
        let mut destroyed = true;
        if let Some(index) = self.index_of(block_id) {
            if self.blocks[index].health <= 0 {
                if special == SpecialKind::Multiplier {
                    credit += before.max(0) as u32;
                }
                self.destroy(index, DestroyCause::Hit, settings, rng, events);
            } else {
                destroyed = false;
            }
        }

        Some(Strike {
            special,
            destroyed,
            credit,
        })
    }

    /// Bomb impact centred on a block; the struck block takes the blast too
    pub fn bomb(
        &mut self,
        block_id: u32,
        settings: &Settings,
        rng: &mut Pcg32,
        events: &mut Vec<GameEvent>,
    ) -> u32 {
        match self.block(block_id) {
            Some(block) => {
                let center = block.center();
                self.detonate(center, Blast::BOMB, None, settings, rng, events)
            }
            None => 0,
        }
    }

    /// Area damage with cascading explosion blocks
    ///
    /// Blasts are processed first-in first-out. A blast never damages its
    /// source block or a block already at zero, and an explosion block only
    /// re-detonates when the splash destroys it. Returns the multiplier
    /// payout of every block destroyed along the way.
    pub fn detonate(
        &mut self,
        center: Vec2,
        blast: Blast,
        source: Option<u32>,
        settings: &Settings,
        rng: &mut Pcg32,
        events: &mut Vec<GameEvent>,
    ) -> u32 {
        let mut queue = VecDeque::from([(center, blast, source)]);
        let mut credit = 0;

        while let Some((center, blast, source)) = queue.pop_front() {
            let radius = blast.radius(settings);
            events.push(GameEvent::Explosion {
                pos: center,
                radius,
            });
            self.spawn_explosion_particles(center, blast.particles);

            let caught: Vec<u32> = self
                .blocks
                .iter()
                .filter(|b| Some(b.id) != source && b.is_alive())
                .filter(|b| b.center().distance(center) < radius)
                .map(|b| b.id)
                .collect();

            for id in caught {
                let Some(index) = self.index_of(id) else {
                    continue;
                };
                let block = &mut self.blocks[index];
                let before = block.health;
                block.health -= blast.damage;
                if block.health > 0 {
                    continue;
                }

                match block.special {
                    SpecialKind::Multiplier => credit += before as u32,
                    SpecialKind::Explosion => {
                        queue.push_back((block.center(), Blast::SPECIAL_BLOCK, Some(id)));
                    }
                    SpecialKind::None => {}
                }
                self.destroy(index, DestroyCause::Splash, settings, rng, events);
            }
        }

        credit
    }

    /// Burn a block away regardless of its health
    pub fn incinerate(
        &mut self,
        block_id: u32,
        settings: &Settings,
        rng: &mut Pcg32,
        events: &mut Vec<GameEvent>,
    ) -> bool {
        let Some(index) = self.index_of(block_id) else {
            return false;
        };
        let center = self.blocks[index].center();
        events.push(GameEvent::MagmaBurn { block_id });
        self.spawn_burn_particles(center);
        self.destroy(index, DestroyCause::Magma, settings, rng, events);
        true
    }

    /// Remove a block, rolling for an item drop
    fn destroy(
        &mut self,
        index: usize,
        cause: DestroyCause,
        settings: &Settings,
        rng: &mut Pcg32,
        events: &mut Vec<GameEvent>,
    ) {
        let block = self.blocks.remove(index);
        let center = block.center();

        if rng.random::<f32>() < settings.item_chance {
            let id = self.next_id();
            self.items.push(Item {
                id,
                pos: center,
                fall_speed: settings.item_fall_speed,
                radius: settings.ball_radius,
            });
            events.push(GameEvent::ItemDropped { pos: center });
        }

        events.push(GameEvent::BlockDestroyed {
            block_id: block.id,
            pos: center,
            special: block.special,
            cause,
        });
    }

    // === Maze exit ===

    /// True when an upward ball has cleared the maze through its exit column
    pub fn exit_reached(&self, pos: Vec2, vel: Vec2, settings: &Settings) -> bool {
        match self.maze_exit_col {
            Some(col) => {
                pos.y < settings.maze_top_offset
                    && vel.y < 0.0
                    && settings.column_at(pos.x) == Some(col)
            }
            None => false,
        }
    }

    /// Pop the newest block and blow it up; false once the field is empty
    pub fn chain_clear_step(
        &mut self,
        settings: &Settings,
        rng: &mut Pcg32,
        events: &mut Vec<GameEvent>,
    ) -> bool {
        let Some(block) = self.blocks.pop() else {
            return false;
        };
        let center = block.center();
        events.push(GameEvent::BlockDestroyed {
            block_id: block.id,
            pos: center,
            special: block.special,
            cause: DestroyCause::ChainClear,
        });
        self.detonate(center, Blast::CHAIN, None, settings, rng, events);
        !self.blocks.is_empty()
    }

    // === Descent ===

    pub fn start_descent(&mut self, settings: &Settings) {
        self.descent = Some(Descent {
            frame: 0,
            frames: settings.block_move_frames,
            distance: settings.row_pitch(),
            applied: 0.0,
        });
    }

    /// Advance the slide one frame; true when it has just finished
    pub fn update_descent(&mut self) -> bool {
        let Some(descent) = self.descent.as_mut() else {
            return false;
        };
        descent.frame += 1;
        let offset = ease_out_quad(descent.progress()) * descent.distance;
        let delta = offset - descent.applied;
        descent.applied = offset;
        let done = descent.frame >= descent.frames;

        for block in &mut self.blocks {
            block.pos.y += delta;
        }
        if done {
            self.descent = None;
        }
        done
    }

    pub fn is_descending(&self) -> bool {
        self.descent.is_some()
    }

    /// Bottom edge of the lowest block
    pub fn lowest_edge(&self) -> Option<f32> {
        self.blocks.iter().map(|b| b.bottom()).reduce(f32::max)
    }

    pub fn crosses_line(&self, line: f32) -> bool {
        self.lowest_edge().is_some_and(|bottom| bottom > line)
    }

    // === Dice ===

    /// New health per block: one each, the rest scattered uniformly
    pub fn plan_reroll(&self, rng: &mut Pcg32) -> Option<Vec<(u32, i32)>> {
        let total = self.total_health();
        let count = self.blocks.len();
        if count == 0 || total <= 0 {
            return None;
        }

        let mut healths = vec![1i32; count];
        let remaining = total - count as i64;
        for _ in 0..remaining.max(0) {
            healths[rng.random_range(0..count)] += 1;
        }

        Some(self.blocks.iter().map(|b| b.id).zip(healths).collect())
    }

    pub fn apply_reroll(&mut self, healths: &[(u32, i32)]) {
        for &(id, health) in healths {
            if let Some(block) = self.blocks.iter_mut().find(|b| b.id == id) {
                block.health = health;
            }
        }
    }

    // === Items ===

    /// Drop items one frame; returns the ball bonus for those that landed
    pub fn update_items(&mut self, settings: &Settings, events: &mut Vec<GameEvent>) -> u32 {
        let mut bonus = 0;
        self.items.retain_mut(|item| {
            item.pos.y += item.fall_speed;
            if item.pos.y > settings.height {
                bonus += settings.item_ball_bonus;
                events.push(GameEvent::ItemCollected);
                false
            } else {
                true
            }
        });
        bonus
    }

    pub fn boost_items(&mut self, factor: f32) {
        for item in &mut self.items {
            item.fall_speed *= factor;
        }
    }

    pub fn clear_items(&mut self) {
        self.items.clear();
    }

    // === Particles ===

    fn push_particle(&mut self, particle: Particle) {
        if self.particles.len() < MAX_PARTICLES {
            self.particles.push(particle);
        }
    }

    fn spawn_explosion_particles(&mut self, center: Vec2, count: usize) {
        for _ in 0..count {
            let angle = self.fx_rng.random_range(0.0..std::f32::consts::TAU);
            let speed = self.fx_rng.random_range(2.0..10.0);
            let color = Hsl::new(
                self.fx_rng.random_range(0.0..60.0),
                100.0,
                self.fx_rng.random_range(50.0..100.0),
            );
            let size = self.fx_rng.random_range(2.0..6.0);
            self.push_particle(Particle {
                pos: center,
                vel: Vec2::from_angle(angle) * speed,
                color,
                life: 45.0,
                size,
            });
        }
    }

    fn spawn_burn_particles(&mut self, center: Vec2) {
        for _ in 0..8 {
            let angle = self.fx_rng.random_range(0.0..std::f32::consts::TAU);
            let speed = self.fx_rng.random_range(1.0..4.0);
            let color = Hsl::new(
                self.fx_rng.random_range(15.0..45.0),
                100.0,
                self.fx_rng.random_range(50.0..90.0),
            );
            let size = self.fx_rng.random_range(1.0..3.5);
            let life = self.fx_rng.random_range(30.0..50.0);
            self.push_particle(Particle {
                pos: center,
                vel: Vec2::from_angle(angle) * speed - Vec2::new(0.0, 2.0),
                color,
                life,
                size,
            });
        }
    }

    pub fn update_particles(&mut self) {
        self.particles.retain_mut(|p| {
            p.pos += p.vel;
            p.vel.y += PARTICLE_GRAVITY;
            p.life -= 1.0;
            p.life > 0.0
        });
    }

    /// Drop everything, including any slide in progress
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.items.clear();
        self.particles.clear();
        self.descent = None;
        self.maze_exit_col = None;
    }
}
