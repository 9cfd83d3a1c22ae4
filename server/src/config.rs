//! Tunables consumed by the simulation and the network layer.

use shared::{Direction, Position};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 12350;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("board must be at least 1x1, got {0}x{1}")]
    EmptyBoard(i32, i32),
    #[error("tick interval must be non-zero")]
    ZeroTick,
    #[error("probe interval must be non-zero")]
    ZeroProbe,
    #[error("fruit chances add up to {0}%, more than 100%")]
    FruitOdds(u32),
    #[error("at least one spawn point is required")]
    NoSpawnPoints,
    #[error("spawn point {0} lies outside the board")]
    SpawnOutOfBounds(Position),
    #[error("outbound queue capacity must be non-zero")]
    ZeroQueue,
}

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub host: String,
    pub port: u16,
    pub admin_port: u16,

    pub width: i32,
    pub height: i32,
    pub tick_interval: Duration,

    pub min_fruits: usize,
    /// One extra fruit per this many live creatures.
    pub fruits_per_player_divisor: usize,
    /// Percent chance of a value 1 fruit.
    pub normal_fruit_chance: u32,
    /// Percent chance of a value 2 fruit; the remainder is value 3.
    pub good_fruit_chance: u32,

    pub spawn_points: Vec<Position>,
    pub initial_direction: Direction,

    pub probe_interval: Duration,
    pub telemetry_every_ticks: u64,
    pub max_clients: usize,
    /// Frames a session may have queued before it is evicted.
    pub outbound_queue: usize,
    pub write_timeout: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            admin_port: DEFAULT_PORT + 1,
            width: 30,
            height: 20,
            tick_interval: Duration::from_millis(150),
            min_fruits: 1,
            fruits_per_player_divisor: 2,
            normal_fruit_chance: 70,
            good_fruit_chance: 20,
            spawn_points: vec![
                Position::new(10, 5),
                Position::new(20, 5),
                Position::new(10, 15),
                Position::new(20, 15),
            ],
            initial_direction: Direction::Right,
            probe_interval: Duration::from_secs(5),
            telemetry_every_ticks: 10,
            max_clients: 32,
            outbound_queue: 64,
            write_timeout: Duration::from_millis(500),
        }
    }
}

impl GameConfig {
    /// Spawn point for the `index`-th creature, wrapping around the rotation.
    pub fn spawn_point(&self, index: usize) -> Position {
        if self.spawn_points.is_empty() {
            return Position::new(self.width / 2, self.height / 2);
        }
        self.spawn_points[index % self.spawn_points.len()]
    }

    /// First slot of the rotation, starting at `index`, that `taken` does not
    /// claim. When every slot is taken this is `spawn_point(index)`.
    pub fn free_spawn_point<F>(&self, index: usize, taken: F) -> Position
    where
        F: Fn(Position) -> bool,
    {
        let slots = self.spawn_points.len().max(1);
        (0..slots)
            .map(|offset| self.spawn_point(index + offset))
            .find(|&slot| !taken(slot))
            .unwrap_or_else(|| self.spawn_point(index))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width < 1 || self.height < 1 {
            return Err(ConfigError::EmptyBoard(self.width, self.height));
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::ZeroTick);
        }
        if self.probe_interval.is_zero() {
            return Err(ConfigError::ZeroProbe);
        }
        let odds = self.normal_fruit_chance + self.good_fruit_chance;
        if odds > 100 {
            return Err(ConfigError::FruitOdds(odds));
        }
        if self.spawn_points.is_empty() {
            return Err(ConfigError::NoSpawnPoints);
        }
        if let Some(outside) = self
            .spawn_points
            .iter()
            .find(|p| p.x < 0 || p.y < 0 || p.x >= self.width || p.y >= self.height)
        {
            return Err(ConfigError::SpawnOutOfBounds(*outside));
        }
        if self.outbound_queue == 0 {
            return Err(ConfigError::ZeroQueue);
        }
        Ok(())
    }
}
