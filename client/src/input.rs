//! Client input management with change detection

use shared::Direction;

/// Turns typed commands into direction intents and only reports a direction
/// when it differs from the last one sent.
pub struct InputManager {
    current: Direction,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            current: Direction::None,
        }
    }

    /// Maps a typed word or WASD key to a direction.
    pub fn parse_direction(line: &str) -> Option<Direction> {
        match line.trim().to_ascii_lowercase().as_str() {
            "w" | "up" => Some(Direction::Up),
            "s" | "down" => Some(Direction::Down),
            "a" | "left" => Some(Direction::Left),
            "d" | "right" => Some(Direction::Right),
            "x" | "none" | "stop" => Some(Direction::None),
            _ => None,
        }
    }

    /// Returns the direction to send for `line`, or `None` if the line is not
    /// a direction or repeats the current one.
    pub fn update(&mut self, line: &str) -> Option<Direction> {
        let direction = Self::parse_direction(line)?;
        if direction == self.current {
            return None;
        }
        self.current = direction;
        Some(direction)
    }

    /// Forgets the last direction, e.g. after the server reset the game.
    pub fn reset(&mut self, direction: Direction) {
        self.current = direction;
    }

    pub fn current(&self) -> Direction {
        self.current
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_manager_creation() {
        let input_manager = InputManager::new();
        assert_eq!(input_manager.current(), Direction::None);
    }

    #[test]
    fn test_parse_direction() {
        assert_eq!(InputManager::parse_direction("W"), Some(Direction::Up));
        assert_eq!(InputManager::parse_direction(" left "), Some(Direction::Left));
        assert_eq!(InputManager::parse_direction("d"), Some(Direction::Right));
        assert_eq!(InputManager::parse_direction("none"), Some(Direction::None));
        assert_eq!(InputManager::parse_direction("jump"), None);
    }

    #[test]
    fn test_only_changes_are_sent() {
        let mut input_manager = InputManager::new();
        assert_eq!(input_manager.update("up"), Some(Direction::Up));
        assert_eq!(input_manager.update("w"), None);
        assert_eq!(input_manager.update("left"), Some(Direction::Left));
        assert_eq!(input_manager.update("???"), None);
        assert_eq!(input_manager.current(), Direction::Left);
    }

    #[test]
    fn test_reset_allows_resend() {
        let mut input_manager = InputManager::new();
        input_manager.update("right");
        input_manager.reset(Direction::None);
        assert_eq!(input_manager.update("right"), Some(Direction::Right));
    }
}
