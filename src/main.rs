//! Brick Volley headless driver
//!
//! Plays a seeded session without a window: aims with a slow sweep, fires
//! every turn, recalls volleys that drag on, and logs a summary per turn.
//!
//! Usage: `brick-volley [classic|maze] [seed] [turns] [settings.json]`

use std::collections::BTreeMap;

use brick_volley::sim::{AmmoKind, GameState, TickInput, tick};
use brick_volley::{FieldMode, Settings};

/// Ticks after which a volley is recalled
const RECALL_AFTER_TICKS: u32 = 60 * 60;
/// Hard stop for a single turn
const MAX_TURN_TICKS: u32 = RECALL_AFTER_TICKS * 2;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = match args.first() {
        Some(arg) => arg.parse().unwrap_or_else(|e| {
            log::warn!("{}, using classic", e);
            FieldMode::Pattern
        }),
        None => FieldMode::Pattern,
    };
    let seed = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(12345);
    let turns: u32 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(30);
    let settings = match args.get(3) {
        Some(path) => Settings::load(path, mode),
        None => Settings::for_mode(mode),
    };

    log::info!("Brick Volley (headless) starting: {} mode, seed {}", settings.mode.as_str(), seed);
    let mut state = GameState::with_settings(seed, settings);
    let mut sounds: BTreeMap<&'static str, u32> = BTreeMap::new();

    while state.turn <= turns && !state.is_game_over() {
        play_turn(&mut state, &mut sounds);
        log::info!(
            "Turn {:>3} | stage {} | balls {:>3} | blocks {:>3} | health {:>6} | speed {:.2}",
            state.turn,
            state.stage_index,
            state.total_ball_count,
            state.field.blocks.len(),
            state.field.total_health(),
            state.turn_speed
        );
    }

    if state.is_game_over() {
        log::info!("Game over after {} turns", state.turn);
    } else {
        log::info!("Stopped after {} turns", turns);
    }
    for (name, count) in &sounds {
        log::debug!("sound {:<10} x{}", name, count);
    }
}

/// Wait until firing is possible, pick ammo, fire and run the volley out
fn play_turn(state: &mut GameState, sounds: &mut BTreeMap<&'static str, u32>) {
    let idle = TickInput::default();
    let start_turn = state.turn;

    let mut waited = 0;
    while !state.can_fire() && !state.is_game_over() && waited < MAX_TURN_TICKS {
        tick(state, &idle);
        tally(state, sounds);
        waited += 1;
    }
    if state.is_game_over() {
        return;
    }

    let sweep = (state.turn as f32 * 0.7).sin() * 0.9;
    let ammo = if state.turn % 7 == 0 && state.ammo.dice > 0 {
        Some(AmmoKind::Dice)
    } else if state.turn % 5 == 0 && state.ammo.bomb > 0 {
        Some(AmmoKind::Bomb)
    } else if state.turn % 9 == 0 && state.ammo.magma > 0 {
        Some(AmmoKind::Magma)
    } else {
        None
    };
    tick(
        state,
        &TickInput {
            aim: Some(-std::f32::consts::FRAC_PI_2 + sweep),
            select_ammo: ammo,
            fire: true,
            ..Default::default()
        },
    );
    tally(state, sounds);

    let mut ticks = 0;
    while state.turn == start_turn && !state.is_game_over() && ticks < MAX_TURN_TICKS {
        let input = TickInput {
            recall: ticks == RECALL_AFTER_TICKS,
            ..Default::default()
        };
        tick(state, &input);
        tally(state, sounds);
        ticks += 1;

        // A dice roll never ends the turn on its own
        if state.can_fire() && state.balls.is_empty() && state.turn == start_turn {
            return;
        }
    }
}

fn tally(state: &mut GameState, sounds: &mut BTreeMap<&'static str, u32>) {
    for event in state.drain_events() {
        if let Some(name) = event.sound() {
            *sounds.entry(name).or_default() += 1;
        }
    }
}
