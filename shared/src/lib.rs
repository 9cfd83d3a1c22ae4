use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod codec;

pub use codec::{decode_packet, encode_frame, read_packet, write_frame, write_packet, ProtocolError};

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_FRAME_LEN: usize = 1 << 20;

/// A cell on the board. `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the neighbouring cell in `direction`, or the same cell for `Direction::None`.
    pub fn offset(self, direction: Direction) -> Position {
        let (dx, dy) = direction.delta();
        Position::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl FromStr for Position {
    type Err = String;

    /// Parses `x,y`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| format!("expected `x,y`, got `{}`", s))?;
        let x = x.trim().parse().map_err(|e| format!("bad x in `{}`: {}", s, e))?;
        let y = y.trim().parse().map_err(|e| format!("bad y in `{}`: {}", s, e))?;
        Ok(Position::new(x, y))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::None => (0, 0),
        }
    }

    pub fn is_directional(self) -> bool {
        self != Direction::None
    }

    /// Direction of a unit step from `from` to `to`, if they are orthogonal neighbours.
    pub fn between(from: Position, to: Position) -> Option<Direction> {
        match (to.x - from.x, to.y - from.y) {
            (0, -1) => Some(Direction::Up),
            (0, 1) => Some(Direction::Down),
            (-1, 0) => Some(Direction::Left),
            (1, 0) => Some(Direction::Right),
            _ => None,
        }
    }
}

/// Coarse game state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    WaitingForPlayers,
    InProgress,
    GameEnded,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::WaitingForPlayers => "waiting for players",
            Phase::InProgress => "in progress",
            Phase::GameEnded => "game ended",
        };
        f.write_str(label)
    }
}

/// Display tag of a fruit, derived from its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FruitKind {
    Normal,
    Good,
    Excellent,
}

impl FruitKind {
    pub fn for_value(value: u32) -> Self {
        match value {
            0 | 1 => FruitKind::Normal,
            2 => FruitKind::Good,
            _ => FruitKind::Excellent,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            FruitKind::Normal => "red",
            FruitKind::Good => "blue",
            FruitKind::Excellent => "magenta",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatureSnapshot {
    pub id: String,
    pub score: u32,
    /// Head first.
    pub body: Vec<Position>,
    pub growth_pending: u32,
}

impl CreatureSnapshot {
    pub fn head(&self) -> Option<Position> {
        self.body.first().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FruitSnapshot {
    pub position: Position,
    pub value: u32,
    pub kind: FruitKind,
}

/// Immutable copy of the world taken at the end of a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub width: i32,
    pub height: i32,
    pub phase: Phase,
    pub creatures: Vec<CreatureSnapshot>,
    pub fruits: Vec<FruitSnapshot>,
}

impl WorldSnapshot {
    pub fn creature(&self, id: &str) -> Option<&CreatureSnapshot> {
        self.creatures.iter().find(|c| c.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Connecting,
    Alive,
    Dead,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionStatus::Connecting => "Connecting",
            SessionStatus::Alive => "Alive",
            SessionStatus::Dead => "Dead",
        };
        f.write_str(label)
    }
}

/// Per-session report row sent to spectators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerTelemetry {
    pub id: String,
    pub origin: String,
    pub rtt_ms: Option<u64>,
    /// Frame bytes queued for the session since it connected.
    pub bytes_sent: u64,
    /// Average outbound rate since the session connected.
    pub bytes_per_sec: u64,
    pub score: u32,
    pub status: SessionStatus,
    pub connected_secs: u64,
}

impl PlayerTelemetry {
    /// Outbound bandwidth in KB/s.
    pub fn kbps(&self) -> f64 {
        self.bytes_per_sec as f64 / 1024.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Packet {
    // client -> server
    Connect { client_version: u32, spectator: bool },
    Intent { direction: Direction },
    ProbeEcho { timestamp: u64 },
    Disconnect,

    // server -> client
    Connected { player_id: String },
    Snapshot(WorldSnapshot),
    Telemetry(Vec<PlayerTelemetry>),
    Probe { timestamp: u64 },
    Disconnected { reason: String },
}

impl Packet {
    pub fn kind(&self) -> &'static str {
        match self {
            Packet::Connect { .. } => "Connect",
            Packet::Intent { .. } => "Intent",
            Packet::ProbeEcho { .. } => "ProbeEcho",
            Packet::Disconnect => "Disconnect",
            Packet::Connected { .. } => "Connected",
            Packet::Snapshot(_) => "Snapshot",
            Packet::Telemetry(_) => "Telemetry",
            Packet::Probe { .. } => "Probe",
            Packet::Disconnected { .. } => "Disconnected",
        }
    }
}
