use log::{debug, info};
use shared::{CreatureSnapshot, Phase, WorldSnapshot};

/// The client's view of the world: whatever snapshot arrived last.
#[derive(Debug, Clone, Default)]
pub struct ClientGameState {
    pub player_id: Option<String>,
    latest: Option<WorldSnapshot>,
    snapshots_received: u64,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_player_id(&mut self, id: String) {
        self.player_id = Some(id);
    }

    /// Stores `snapshot`, replacing the previous one. Returns the new phase if
    /// it differs from the phase of the previous snapshot. Snapshots older
    /// than the current one are dropped.
    pub fn apply_snapshot(&mut self, snapshot: WorldSnapshot) -> Option<Phase> {
        let previous = match &self.latest {
            Some(latest) if snapshot.tick <= latest.tick => {
                debug!("Dropping stale snapshot {} (have {})", snapshot.tick, latest.tick);
                return None;
            }
            Some(latest) => Some(latest.phase),
            None => None,
        };

        self.snapshots_received += 1;
        let phase = snapshot.phase;
        self.latest = Some(snapshot);

        if previous != Some(phase) {
            info!("Game is now {}", phase);
            Some(phase)
        } else {
            None
        }
    }

    pub fn latest(&self) -> Option<&WorldSnapshot> {
        self.latest.as_ref()
    }

    pub fn phase(&self) -> Option<Phase> {
        self.latest.as_ref().map(|s| s.phase)
    }

    pub fn snapshots_received(&self) -> u64 {
        self.snapshots_received
    }

    /// This client's creature in the latest snapshot, if it is alive.
    pub fn own_creature(&self) -> Option<&CreatureSnapshot> {
        let id = self.player_id.as_deref()?;
        self.latest.as_ref()?.creature(id)
    }

    pub fn is_alive(&self) -> bool {
        self.own_creature().is_some()
    }

    /// One-line scoreboard, highest score first.
    pub fn scoreboard(&self) -> String {
        let Some(snapshot) = &self.latest else {
            return "no snapshot yet".to_string();
        };
        let mut creatures: Vec<&CreatureSnapshot> = snapshot.creatures.iter().collect();
        creatures.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));

        let entries: Vec<String> = creatures
            .iter()
            .map(|c| format!("{}={} (len {})", c.id, c.score, c.body.len()))
            .collect();
        format!(
            "tick {} [{}] {} fruit(s): {}",
            snapshot.tick,
            snapshot.phase,
            snapshot.fruits.len(),
            if entries.is_empty() {
                "no snakes".to_string()
            } else {
                entries.join(", ")
            }
        )
    }
}
