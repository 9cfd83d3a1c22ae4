//! Session registry.
//!
//! Tracks every connected peer: its id, origin address, role, status, last
//! measured round-trip time and the sending half of its outbound queue. The
//! registry never touches the world; it only decides who receives which
//! frame.

use log::{info, warn};
use shared::{PlayerTelemetry, SessionStatus};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// An encoded frame shared by every recipient of a broadcast.
pub type Frame = Arc<[u8]>;

/// One connected peer.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub addr: SocketAddr,
    pub spectator: bool,
    pub status: SessionStatus,
    pub rtt: Option<Duration>,
    pub connected_at: Instant,
    /// Frame bytes queued for this peer, length prefixes included.
    bytes_sent: AtomicU64,
    sender: mpsc::Sender<Frame>,
}

impl Session {
    pub fn new(id: String, addr: SocketAddr, spectator: bool, sender: mpsc::Sender<Frame>) -> Self {
        Self {
            id,
            addr,
            spectator,
            status: SessionStatus::Connecting,
            rtt: None,
            connected_at: Instant::now(),
            bytes_sent: AtomicU64::new(0),
            sender,
        }
    }

    /// Queues a frame without waiting. Fails if the queue is full or the
    /// writer has gone away.
    pub fn try_send(&self, frame: &Frame) -> Result<(), TrySendError<Frame>> {
        self.sender.try_send(Arc::clone(frame))?;
        self.bytes_sent.fetch_add(frame.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Average outbound rate since the session was created.
    pub fn bytes_per_sec(&self) -> u64 {
        let secs = self.connected_at.elapsed().as_secs_f64();
        if secs <= 0.0 {
            return 0;
        }
        (self.bytes_sent() as f64 / secs) as u64
    }
}

/// Which sessions a broadcast goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Everyone,
    Spectators,
}

/// Registry of all sessions, players and spectators alike.
pub struct ClientManager {
    sessions: HashMap<String, Session>,
    next_player_id: u32,
    next_spectator_id: u32,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            next_player_id: 1,
            next_spectator_id: 1,
            max_clients,
        }
    }

    /// Hands out the next id. Ids are never reused within a run.
    pub fn next_id(&mut self, spectator: bool) -> String {
        if spectator {
            let id = format!("Spectator_{}", self.next_spectator_id);
            self.next_spectator_id += 1;
            id
        } else {
            let id = format!("Player_{}", self.next_player_id);
            self.next_player_id += 1;
            id
        }
    }

    pub fn is_full(&self) -> bool {
        self.sessions.len() >= self.max_clients
    }

    /// Adds a session in the `Connecting` state. Returns false when the
    /// registry is full or the id is taken.
    pub fn register(&mut self, session: Session) -> bool {
        if self.is_full() || self.sessions.contains_key(&session.id) {
            return false;
        }
        info!(
            "{} connected from {}{}",
            session.id,
            session.addr,
            if session.spectator { " as spectator" } else { "" }
        );
        self.sessions.insert(session.id.clone(), session);
        true
    }

    /// Marks a `Connecting` session `Alive` once its id has reached the peer.
    /// A session whose creature already died stays `Dead`.
    pub fn promote(&mut self, id: &str) -> bool {
        match self.sessions.get_mut(id) {
            Some(session) if session.status == SessionStatus::Connecting => {
                session.status = SessionStatus::Alive;
                true
            }
            _ => false,
        }
    }

    /// Records that the session's creature died during a tick.
    pub fn mark_dead(&mut self, id: &str) -> bool {
        self.set_status(id, SessionStatus::Dead)
    }

    fn set_status(&mut self, id: &str, status: SessionStatus) -> bool {
        match self.sessions.get_mut(id) {
            Some(session) => {
                session.status = status;
                true
            }
            None => false,
        }
    }

    /// Drops a session. Its queue sender goes with it, which ends the writer.
    pub fn remove(&mut self, id: &str) -> Option<Session> {
        let session = self.sessions.remove(id)?;
        info!("{} disconnected", id);
        Some(session)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Looks up a session by id.
    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Stores the latest round-trip time measured for `id`.
    pub fn record_rtt(&mut self, id: &str, rtt: Duration) {
        if let Some(session) = self.sessions.get_mut(id) {
            session.rtt = Some(rtt);
        }
    }

    /// Number of sessions a broadcast to `audience` would be attempted for.
    pub fn recipients(&self, audience: Audience) -> usize {
        self.sessions
            .values()
            .filter(|session| Self::addressed(session, audience))
            .count()
    }

    fn addressed(session: &Session, audience: Audience) -> bool {
        session.status != SessionStatus::Connecting
            && (audience == Audience::Everyone || session.spectator)
    }

    /// Queues the same frame for every session in `audience` that has
    /// finished connecting. Returns the ids whose queue was full or closed;
    /// the caller is expected to evict them.
    pub fn broadcast(&self, frame: &Frame, audience: Audience) -> Vec<String> {
        let mut failed = Vec::new();
        for session in self.sessions.values() {
            if !Self::addressed(session, audience) {
                continue;
            }
            if let Err(e) = session.try_send(frame) {
                match e {
                    TrySendError::Full(_) => warn!("{} is not keeping up, evicting", session.id),
                    TrySendError::Closed(_) => warn!("{} writer has closed", session.id),
                }
                failed.push(session.id.clone());
            }
        }
        failed
    }

    /// Queues a frame for a single session regardless of its status.
    pub fn send_to(&self, id: &str, frame: &Frame) -> bool {
        self.sessions
            .get(id)
            .map(|session| session.try_send(frame).is_ok())
            .unwrap_or(false)
    }

    /// Telemetry rows for every player session, sorted by id. `score_of`
    /// looks up the current score of a live creature.
    pub fn telemetry<F>(&self, score_of: F) -> Vec<PlayerTelemetry>
    where
        F: Fn(&str) -> Option<u32>,
    {
        let mut rows: Vec<PlayerTelemetry> = self
            .sessions
            .values()
            .filter(|session| !session.spectator)
            .map(|session| PlayerTelemetry {
                id: session.id.clone(),
                origin: session.addr.to_string(),
                rtt_ms: session.rtt.map(|rtt| rtt.as_millis() as u64),
                bytes_sent: session.bytes_sent(),
                bytes_per_sec: session.bytes_per_sec(),
                score: score_of(&session.id).unwrap_or(0),
                status: session.status,
                connected_secs: session.connected_at.elapsed().as_secs(),
            })
            .collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        rows
    }

    /// Ids of all sessions, in no particular order.
    pub fn ids(&self) -> Vec<String> {
        self.sessions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops every session, closing their outbound queues.
    pub fn clear(&mut self) {
        self.sessions.clear();
    }
}
