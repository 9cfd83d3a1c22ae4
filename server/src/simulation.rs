//! One simulation tick.
//!
//! Movement is simultaneous: every candidate head is computed and classified
//! against the board as it stood before the tick, so the order creatures are
//! stored in never decides who survives. Only after all deaths are known is
//! the world mutated.

use crate::config::GameConfig;
use crate::entity::{Fruit, Snake};
use crate::game::GameState;
use log::{debug, info, warn};
use rand::Rng;
use shared::{Direction, Phase, Position};
use std::collections::HashMap;

/// Point-in-time copy of the pending intents, keyed by creature id.
pub type Intents = HashMap<String, Direction>;

/// Why a creature was removed during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    /// The next head cell is off the board.
    Wall,
    /// The next head cell is part of its own body.
    SelfCollision,
    /// The next head cell is part of another creature's body.
    OtherCreature,
    /// Two or more heads claimed the same cell.
    HeadCollision,
}

impl DeathCause {
    /// Short phrase for log lines.
    pub fn describe(self) -> &'static str {
        match self {
            DeathCause::Wall => "hit a wall",
            DeathCause::SelfCollision => "ran into itself",
            DeathCause::OtherCreature => "ran into another snake",
            DeathCause::HeadCollision => "collided head-on",
        }
    }
}

/// What happened during a tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub deaths: Vec<(String, DeathCause)>,
    /// Creature id and value of the fruit it ate.
    pub eaten: Vec<(String, u32)>,
    pub fruits_spawned: usize,
    pub game_over: bool,
}

/// Advances the world by one tick. Does nothing outside `Phase::InProgress`.
pub fn step<R: Rng + ?Sized>(
    state: &mut GameState,
    intents: &Intents,
    config: &GameConfig,
    rng: &mut R,
) -> TickReport {
    let mut report = TickReport::default();
    if state.phase() != Phase::InProgress {
        return report;
    }

    // Propose
    let proposals: Vec<(String, Option<Position>)> = state
        .snakes()
        .iter()
        .map(|snake| {
            let candidate = resolve_direction(snake, intents.get(snake.id()).copied())
                .map(|direction| snake.head().offset(direction));
            (snake.id().to_string(), candidate)
        })
        .collect();

    // Classify against the pre-move board
    let mut dead: HashMap<String, DeathCause> = HashMap::new();
    for (snake, (_, candidate)) in state.snakes().iter().zip(&proposals) {
        if let Some(cell) = candidate {
            if let Some(cause) = classify_move(state, snake, *cell) {
                dead.insert(snake.id().to_string(), cause);
            }
        }
    }

    let mut claims: HashMap<Position, Vec<&str>> = HashMap::new();
    for (id, candidate) in &proposals {
        if let Some(cell) = candidate {
            if !dead.contains_key(id) {
                claims.entry(*cell).or_default().push(id.as_str());
            }
        }
    }
    for ids in claims.values().filter(|ids| ids.len() > 1) {
        for id in ids {
            dead.insert(id.to_string(), DeathCause::HeadCollision);
        }
    }

    // Apply deaths in one batch, in join order
    for (id, _) in &proposals {
        if let Some(cause) = dead.get(id) {
            if let Some(snake) = state.remove_snake(id) {
                info!(
                    "{} {} with score {} and length {}",
                    id,
                    cause.describe(),
                    snake.score,
                    snake.len()
                );
            }
            report.deaths.push((id.clone(), *cause));
        }
    }

    // Move survivors
    for (id, candidate) in &proposals {
        if dead.contains_key(id) {
            continue;
        }
        if let Some(cell) = candidate {
            if let Some(value) = state.apply_movement(id, *cell) {
                report.eaten.push((id.clone(), value));
            }
        }
    }

    report.fruits_spawned = replenish_fruit(state, config, rng);

    if state.snakes().is_empty() {
        state.set_phase(Phase::GameEnded);
        report.game_over = true;
    }

    report
}

/// Direction a creature moves in this tick.
///
/// An explicit direction wins. Otherwise the creature keeps its heading; a
/// single cell creature without an explicit direction stays where it is.
pub fn resolve_direction(snake: &Snake, intent: Option<Direction>) -> Option<Direction> {
    match intent {
        Some(direction) if direction.is_directional() => Some(direction),
        _ => snake.heading(),
    }
}

/// Classifies a single creature's candidate cell. Head-to-head collisions
/// need every candidate at once and are resolved by [`step`].
pub fn classify_move(state: &GameState, snake: &Snake, candidate: Position) -> Option<DeathCause> {
    if !state.in_bounds(candidate) {
        return Some(DeathCause::Wall);
    }
    if blocks(snake, candidate) {
        return Some(DeathCause::SelfCollision);
    }
    if state
        .snakes()
        .iter()
        .filter(|other| other.id() != snake.id())
        .any(|other| blocks(other, candidate))
    {
        return Some(DeathCause::OtherCreature);
    }
    None
}

/// True if `cell` is part of `snake` and stays occupied through this tick.
/// The tail of a creature that is not growing vacates its cell.
fn blocks(snake: &Snake, cell: Position) -> bool {
    if !snake.occupies(cell) {
        return false;
    }
    let vacates = cell == snake.tail() && snake.growth_pending == 0 && snake.len() > 1;
    !vacates
}

/// Number of fruits the board should hold for `live` creatures.
pub fn target_fruit_count(config: &GameConfig, live: usize) -> usize {
    let divisor = config.fruits_per_player_divisor.max(1);
    config.min_fruits.max(config.min_fruits + live / divisor)
}

/// Draws a fruit value from the configured cumulative thresholds.
pub fn roll_fruit_value<R: Rng + ?Sized>(config: &GameConfig, rng: &mut R) -> u32 {
    let roll = rng.gen_range(0..100);
    if roll < config.normal_fruit_chance {
        1
    } else if roll < config.normal_fruit_chance + config.good_fruit_chance {
        2
    } else {
        3
    }
}

/// Tops the fruit count up to [`target_fruit_count`] using free cells only.
/// Skipped entirely while the board has no creatures. Returns the number of
/// fruits placed.
pub fn replenish_fruit<R: Rng + ?Sized>(
    state: &mut GameState,
    config: &GameConfig,
    rng: &mut R,
) -> usize {
    let live = state.snakes().len();
    if live == 0 {
        return 0;
    }

    let target = target_fruit_count(config, live);
    if state.fruits().len() >= target {
        return 0;
    }

    let mut free = state.free_cells();
    let mut placed = 0;
    while state.fruits().len() < target {
        if free.is_empty() {
            warn!(
                "No free cell for fruit ({} of {} placed)",
                state.fruits().len(),
                target
            );
            break;
        }
        let cell = free.swap_remove(rng.gen_range(0..free.len()));
        let value = roll_fruit_value(config, rng);
        if state.add_fruit(Fruit::new(cell, value)) {
            placed += 1;
        }
    }

    if placed > 0 {
        debug!("Placed {} fruit(s), {} on board", placed, state.fruits().len());
    }
    placed
}
