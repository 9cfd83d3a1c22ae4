use shared::{CreatureSnapshot, Direction, FruitKind, FruitSnapshot, Position};
use std::collections::{HashSet, VecDeque};

/// A creature on the board.
///
/// `body` holds the cells head first and `occupied` mirrors it for O(1)
/// membership tests. Both are private so the two can never drift apart;
/// the body is never empty.
#[derive(Debug, Clone)]
pub struct Snake {
    id: String,
    body: VecDeque<Position>,
    occupied: HashSet<Position>,
    pub score: u32,
    /// Ticks left during which the tail does not retract.
    pub growth_pending: u32,
}

impl Snake {
    pub fn new(id: impl Into<String>, spawn: Position) -> Self {
        let mut body = VecDeque::with_capacity(8);
        body.push_back(spawn);
        Snake {
            id: id.into(),
            body,
            occupied: HashSet::from([spawn]),
            score: 0,
            growth_pending: 0,
        }
    }

    /// Builds a creature from explicit cells, head first. Returns `None` for an empty body.
    pub fn with_body(id: impl Into<String>, cells: impl IntoIterator<Item = Position>) -> Option<Self> {
        let body: VecDeque<Position> = cells.into_iter().collect();
        if body.is_empty() {
            return None;
        }
        let occupied = body.iter().copied().collect();
        Some(Snake {
            id: id.into(),
            body,
            occupied,
            score: 0,
            growth_pending: 0,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn head(&self) -> Position {
        self.body[0]
    }

    pub fn tail(&self) -> Position {
        self.body[self.body.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn body(&self) -> impl Iterator<Item = &Position> {
        self.body.iter()
    }

    pub fn occupies(&self, cell: Position) -> bool {
        self.occupied.contains(&cell)
    }

    /// Direction the creature last moved in, read off the neck-to-head segment.
    /// A single-cell creature has no heading.
    pub fn heading(&self) -> Option<Direction> {
        let neck = *self.body.get(1)?;
        Direction::between(neck, self.head())
    }

    pub fn push_head(&mut self, cell: Position) {
        self.body.push_front(cell);
        self.occupied.insert(cell);
    }

    /// Drops the tail cell. The only cell that may appear twice in the body is
    /// a new head laid over the outgoing tail, so that cell stays occupied.
    pub fn pop_tail(&mut self) -> Option<Position> {
        if self.body.len() < 2 {
            return None;
        }
        let tail = self.body.pop_back()?;
        if tail != self.head() {
            self.occupied.remove(&tail);
        }
        Some(tail)
    }

    /// Shrinks the creature back to a single cell with no score.
    pub fn respawn(&mut self, spawn: Position) {
        self.body.clear();
        self.body.push_back(spawn);
        self.occupied.clear();
        self.occupied.insert(spawn);
        self.score = 0;
        self.growth_pending = 0;
    }

    /// True when the occupancy set is exactly the set of body cells.
    pub fn is_consistent(&self) -> bool {
        let cells: HashSet<Position> = self.body.iter().copied().collect();
        !self.body.is_empty() && cells == self.occupied
    }

    pub fn snapshot(&self) -> CreatureSnapshot {
        CreatureSnapshot {
            id: self.id.clone(),
            score: self.score,
            body: self.body.iter().copied().collect(),
            growth_pending: self.growth_pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fruit {
    pub position: Position,
    pub value: u32,
    pub kind: FruitKind,
}

impl Fruit {
    /// Creates a fruit; the display tag follows from `value`.
    pub fn new(position: Position, value: u32) -> Self {
        Fruit {
            position,
            value,
            kind: FruitKind::for_value(value),
        }
    }

    pub fn snapshot(&self) -> FruitSnapshot {
        FruitSnapshot {
            position: self.position,
            value: self.value,
            kind: self.kind,
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
    fn test_new_snake_has_single_cell() {
        let snake = Snake::new("Player_1", p(3, 4));
        assert_eq!(snake.len(), 1);
        assert_eq!(snake.head(), p(3, 4));
        assert_eq!(snake.tail(), p(3, 4));
        assert!(snake.occupies(p(3, 4)));
        assert_eq!(snake.heading(), None);
        assert!(snake.is_consistent());
    }

    #[test]
    fn test_with_body_rejects_empty() {
        assert!(Snake::with_body("x", Vec::new()).is_none());
    }

    #[test]
    fn test_heading_follows_neck() {
        let snake = Snake::with_body("x", [p(5, 5), p(5, 6), p(5, 7)]).unwrap();
        assert_eq!(snake.heading(), Some(Direction::Up));
    }

    #[test]
    fn test_push_and_pop_keep_occupancy() {
        let mut snake = Snake::with_body("x", [p(2, 2), p(1, 2)]).unwrap();
        snake.push_head(p(3, 2));
        assert_eq!(snake.pop_tail(), Some(p(1, 2)));

        assert_eq!(snake.len(), 2);
        assert!(!snake.occupies(p(1, 2)));
        assert!(snake.is_consistent());
    }

    #[test]
    fn test_pop_tail_under_new_head_keeps_cell() {
        let mut snake = Snake::with_body("x", [p(5, 5), p(5, 6), p(6, 6), p(6, 5)]).unwrap();
        snake.push_head(p(6, 5));
        assert_eq!(snake.pop_tail(), Some(p(6, 5)));

        assert_eq!(snake.head(), p(6, 5));
        assert!(snake.occupies(p(6, 5)));
        assert!(snake.is_consistent());
    }

    #[test]
    fn test_pop_tail_never_empties_body() {
        let mut snake = Snake::new("x", p(0, 0));
        assert_eq!(snake.pop_tail(), None);
        assert_eq!(snake.len(), 1);
    }

    #[test]
    fn test_respawn_clears_progress() {
        let mut snake = Snake::with_body("x", [p(2, 2), p(1, 2), p(0, 2)]).unwrap();
        snake.score = 9;
        snake.growth_pending = 2;

        snake.respawn(p(10, 5));

        assert_eq!(snake.len(), 1);
        assert_eq!(snake.head(), p(10, 5));
        assert_eq!(snake.score, 0);
        assert_eq!(snake.growth_pending, 0);
        assert!(!snake.occupies(p(2, 2)));
        assert!(snake.is_consistent());
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut snake = Snake::with_body("x", [p(2, 2), p(1, 2)]).unwrap();
        let snapshot = snake.snapshot();

        snake.push_head(p(3, 2));
        snake.pop_tail();

        assert_eq!(snapshot.body, vec![p(2, 2), p(1, 2)]);
    }

    #[test]
    fn test_fruit_kind_follows_value() {
        assert_eq!(Fruit::new(p(0, 0), 2).kind, FruitKind::Good);
        assert_eq!(Fruit::new(p(0, 0), 3).snapshot().kind, FruitKind::Excellent);
    }
}
