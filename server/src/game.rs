//! Authoritative world model.
//!
//! `GameState` is owned by the tick task; nothing else holds a reference to
//! it. Observers only ever see a [`WorldSnapshot`] produced by
//! [`GameState::snapshot`], which copies every body and fruit.

use crate::entity::{Fruit, Snake};
use log::{debug, info};
use shared::{Phase, Position, WorldSnapshot};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct GameState {
    width: i32,
    height: i32,
    /// Number of snapshots published so far.
    pub tick: u64,
    /// Join order; used for spawn-slot rotation.
    snakes: Vec<Snake>,
    fruits: Vec<Fruit>,
    phase: Phase,
}

impl GameState {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            tick: 0,
            snakes: Vec::new(),
            fruits: Vec::new(),
            phase: Phase::WaitingForPlayers,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Sets the phase and returns the previous one.
    pub fn set_phase(&mut self, phase: Phase) -> Phase {
        let previous = std::mem::replace(&mut self.phase, phase);
        if previous != phase {
            info!("Phase changed: {} -> {}", previous, phase);
        }
        previous
    }

    pub fn snakes(&self) -> &[Snake] {
        &self.snakes
    }

    pub fn fruits(&self) -> &[Fruit] {
        &self.fruits
    }

    pub fn snake(&self, id: &str) -> Option<&Snake> {
        self.snakes.iter().find(|s| s.id() == id)
    }

    pub fn snake_mut(&mut self, id: &str) -> Option<&mut Snake> {
        self.snakes.iter_mut().find(|s| s.id() == id)
    }

    pub(crate) fn snakes_mut(&mut self) -> impl Iterator<Item = &mut Snake> {
        self.snakes.iter_mut()
    }

    pub fn in_bounds(&self, cell: Position) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    /// Appends a creature; join order is kept.
    pub fn add_snake(&mut self, snake: Snake) {
        info!("Added {} at {}", snake.id(), snake.head());
        self.snakes.push(snake);
    }

    /// Removes creature `id`, returning it if it was on the board.
    pub fn remove_snake(&mut self, id: &str) -> Option<Snake> {
        let index = self.snakes.iter().position(|s| s.id() == id)?;
        let snake = self.snakes.remove(index);
        info!("Removed {}", id);
        Some(snake)
    }

    pub fn is_snake_cell(&self, cell: Position) -> bool {
        self.snakes.iter().any(|s| s.occupies(cell))
    }

    pub fn fruit_at(&self, cell: Position) -> Option<&Fruit> {
        self.fruits.iter().find(|f| f.position == cell)
    }

    /// Places a fruit. Rejected when the cell is off the board, holds a fruit,
    /// or is part of any creature.
    pub fn add_fruit(&mut self, fruit: Fruit) -> bool {
        if !self.in_bounds(fruit.position)
            || self.fruit_at(fruit.position).is_some()
            || self.is_snake_cell(fruit.position)
        {
            return false;
        }
        debug!("New fruit at {} worth {}", fruit.position, fruit.value);
        self.fruits.push(fruit);
        true
    }

    pub fn remove_fruit_at(&mut self, cell: Position) -> Option<Fruit> {
        let index = self.fruits.iter().position(|f| f.position == cell)?;
        Some(self.fruits.remove(index))
    }

    pub fn clear_fruits(&mut self) {
        self.fruits.clear();
    }

    /// Cells holding neither a creature nor a fruit, in row-major order.
    pub fn free_cells(&self) -> Vec<Position> {
        let mut taken: HashSet<Position> = self.fruits.iter().map(|f| f.position).collect();
        for snake in &self.snakes {
            taken.extend(snake.body().copied());
        }

        let mut free = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                let cell = Position::new(x, y);
                if !taken.contains(&cell) {
                    free.push(cell);
                }
            }
        }
        free
    }

    /// Advances creature `id` onto `new_head`.
    ///
    /// Eats at most one fruit on the new head cell. Without a fruit, a pending
    /// growth is consumed instead of retracting the tail. Returns the value of
    /// the fruit eaten, if any.
    pub fn apply_movement(&mut self, id: &str, new_head: Position) -> Option<u32> {
        let index = self.snakes.iter().position(|s| s.id() == id)?;
        let eaten = self.remove_fruit_at(new_head);
        let snake = &mut self.snakes[index];
        snake.push_head(new_head);

        match eaten {
            Some(fruit) => {
                snake.score += fruit.value;
                snake.growth_pending += fruit.value;
                debug!("{} ate a fruit worth {}", id, fruit.value);
                Some(fruit.value)
            }
            None => {
                if snake.growth_pending > 0 {
                    snake.growth_pending -= 1;
                } else {
                    snake.pop_tail();
                }
                None
            }
        }
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick,
            width: self.width,
            height: self.height,
            phase: self.phase,
            creatures: self.snakes.iter().map(Snake::snapshot).collect(),
            fruits: self.fruits.iter().map(Fruit::snapshot).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32) -> Position {
        Position::new(x, y)
    }

    #[test]
    fn test_new_state_is_waiting() {
        let state = GameState::new(30, 20);
        assert_eq!(state.phase(), Phase::WaitingForPlayers);
        assert!(state.snakes().is_empty());
        assert!(state.fruits().is_empty());
    }

    #[test]
    fn test_bounds() {
        let state = GameState::new(10, 5);
        assert!(state.in_bounds(p(0, 0)));
        assert!(state.in_bounds(p(9, 4)));
        assert!(!state.in_bounds(p(10, 4)));
        assert!(!state.in_bounds(p(-1, 0)));
        assert!(!state.in_bounds(p(0, 5)));
    }

    #[test]
    fn test_add_and_remove_snake_keeps_join_order() {
        let mut state = GameState::new(10, 10);
        state.add_snake(Snake::new("a", p(1, 1)));
        state.add_snake(Snake::new("b", p(2, 2)));
        state.add_snake(Snake::new("c", p(3, 3)));

        assert!(state.remove_snake("b").is_some());
        assert!(state.remove_snake("b").is_none());

        let ids: Vec<&str> = state.snakes().iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_add_fruit_rejects_taken_cells() {
        let mut state = GameState::new(10, 10);
        state.add_snake(Snake::new("a", p(1, 1)));

        assert!(!state.add_fruit(Fruit::new(p(1, 1), 1)));
        assert!(state.add_fruit(Fruit::new(p(2, 2), 1)));
        assert!(!state.add_fruit(Fruit::new(p(2, 2), 3)));
        assert!(!state.add_fruit(Fruit::new(p(10, 0), 1)));
        assert_eq!(state.fruits().len(), 1);
    }

    #[test]
    fn test_free_cells_excludes_snakes_and_fruit() {
        let mut state = GameState::new(3, 3);
        state.add_snake(Snake::with_body("a", [p(0, 0), p(1, 0)]).unwrap());
        state.add_fruit(Fruit::new(p(2, 2), 1));

        let free = state.free_cells();
        assert_eq!(free.len(), 6);
        assert!(!free.contains(&p(0, 0)));
        assert!(!free.contains(&p(1, 0)));
        assert!(!free.contains(&p(2, 2)));
    }

    #[test]
    fn test_apply_movement_without_fruit_keeps_length() {
        let mut state = GameState::new(10, 10);
        state.add_snake(Snake::with_body("a", [p(2, 2), p(1, 2)]).unwrap());

        assert_eq!(state.apply_movement("a", p(3, 2)), None);

        let snake = state.snake("a").unwrap();
        assert_eq!(snake.len(), 2);
        assert_eq!(snake.head(), p(3, 2));
        assert_eq!(snake.tail(), p(2, 2));
        assert!(snake.is_consistent());
    }

    #[test]
    fn test_apply_movement_eats_fruit() {
        let mut state = GameState::new(10, 10);
        state.add_snake(Snake::new("a", p(2, 2)));
        state.add_fruit(Fruit::new(p(3, 2), 2));

        assert_eq!(state.apply_movement("a", p(3, 2)), Some(2));

        let snake = state.snake("a").unwrap();
        assert_eq!(snake.score, 2);
        assert_eq!(snake.growth_pending, 2);
        assert_eq!(snake.len(), 2);
        assert!(state.fruits().is_empty());
    }

    #[test]
    fn test_apply_movement_unknown_id_leaves_fruit() {
        let mut state = GameState::new(10, 10);
        state.add_snake(Snake::new("a", p(2, 2)));
        state.add_fruit(Fruit::new(p(3, 3), 1));

        assert_eq!(state.apply_movement("ghost", p(3, 3)), None);
        assert_eq!(state.fruits().len(), 1);
        assert_eq!(state.snake("a").unwrap().head(), p(2, 2));
    }

    #[test]
    fn test_apply_movement_consumes_pending_growth() {
        let mut state = GameState::new(10, 10);
        let mut snake = Snake::new("a", p(2, 2));
        snake.growth_pending = 1;
        state.add_snake(snake);

        state.apply_movement("a", p(3, 2));
        let snake = state.snake("a").unwrap();
        assert_eq!(snake.len(), 2);
        assert_eq!(snake.growth_pending, 0);

        state.apply_movement("a", p(4, 2));
        assert_eq!(state.snake("a").unwrap().len(), 2);
    }

    #[test]
    fn test_snapshot_survives_mutation() {
        let mut state = GameState::new(10, 10);
        state.add_snake(Snake::with_body("a", [p(2, 2), p(1, 2)]).unwrap());
        state.add_fruit(Fruit::new(p(5, 5), 1));

        let snapshot = state.snapshot();
        state.apply_movement("a", p(3, 2));
        state.clear_fruits();
        state.set_phase(Phase::GameEnded);

        assert_eq!(snapshot.phase, Phase::WaitingForPlayers);
        assert_eq!(snapshot.creatures[0].body, vec![p(2, 2), p(1, 2)]);
        assert_eq!(snapshot.fruits.len(), 1);
    }

    #[test]
    fn test_set_phase_returns_previous() {
        let mut state = GameState::new(10, 10);
        assert_eq!(state.set_phase(Phase::InProgress), Phase::WaitingForPlayers);
        assert_eq!(state.set_phase(Phase::GameEnded), Phase::InProgress);
        assert_eq!(state.phase(), Phase::GameEnded);
    }
}
