//! Liveness probe.
//!
//! One timer per server sends a timestamped `Probe` to every connected
//! session and stores the round-trip time when the echo comes back. A lost or
//! bogus echo is ignored; only transport failures end a session.

use crate::client_manager::{Audience, ClientManager, Frame};
use crate::utils::{elapsed_since, get_timestamp};
use log::{debug, error};
use shared::{encode_frame, Packet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Sends one probe, encoded once, to every connected session. Returns how
/// many sessions it was actually queued for.
pub async fn send_probes(clients: &RwLock<ClientManager>, now_ms: u64) -> usize {
    let frame: Frame = match encode_frame(&Packet::Probe { timestamp: now_ms }) {
        Ok(bytes) => bytes.into(),
        Err(e) => {
            error!("Failed to encode probe: {}", e);
            return 0;
        }
    };

    let clients = clients.read().await;
    let addressed = clients.recipients(Audience::Everyone);
    let failed = clients.broadcast(&frame, Audience::Everyone);
    if !failed.is_empty() {
        // the next snapshot broadcast hits the same queues and evicts them
        debug!("Probe not queued for {}", failed.join(", "));
    }
    addressed - failed.len()
}

/// Stores the round-trip time for an echoed probe. Echoes carrying a
/// timestamp from the future are dropped.
pub async fn record_echo(clients: &RwLock<ClientManager>, id: &str, timestamp: u64) -> Option<Duration> {
    let rtt = elapsed_since(timestamp, get_timestamp())?;
    clients.write().await.record_rtt(id, rtt);
    debug!("{} rtt {}ms", id, rtt.as_millis());
    Some(rtt)
}

/// Runs the probe timer until `shutdown` flips to true.
pub fn spawn_probe(
    clients: Arc<RwLock<ClientManager>>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = interval(every);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    let sent = send_probes(&clients, get_timestamp()).await;
                    debug!("Probe sent to {} session(s)", sent);
                }
                _ = shutdown.changed() => break,
            }
        }
    })
}
