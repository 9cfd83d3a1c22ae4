//! Server network layer: session tasks and the game actor.
//!
//! `Server` owns the world. It runs a single `select!` loop that either
//! executes a queued [`GameCommand`] or runs a tick, so world mutations are
//! strictly serialized. Connection tasks never touch the world: they write
//! intents into the shared [`IntentTable`] and ask the actor for everything
//! else over a channel.

use crate::admin::{self, AdminCommand, SHUTDOWN_REPLY};
use crate::client_manager::{Audience, ClientManager, Frame, Session};
use crate::config::GameConfig;
use crate::entity::Snake;
use crate::game::GameState;
use crate::probe;
use crate::simulation;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{
    encode_frame, read_packet, write_frame, write_packet, Direction, Packet, Position,
    ProtocolError, PROTOCOL_VERSION,
};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};

/// Latest direction submitted by each player, written by reader tasks.
pub type IntentTable = Arc<RwLock<HashMap<String, Direction>>>;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);
const COMMAND_QUEUE: usize = 256;

/// Requests from connection tasks to the game actor.
#[derive(Debug)]
pub enum GameCommand {
    /// Create a creature for a freshly registered player.
    Spawn {
        id: String,
        reply: oneshot::Sender<Position>,
    },
    /// The session is gone; drop whatever is left of it.
    Leave { id: String },
    Admin {
        command: AdminCommand,
        reply: oneshot::Sender<String>,
    },
}

/// What a connection task needs from the server.
#[derive(Clone)]
struct SessionContext {
    clients: Arc<RwLock<ClientManager>>,
    intents: IntentTable,
    commands: mpsc::Sender<GameCommand>,
    outbound_queue: usize,
    write_timeout: Duration,
}

pub struct Server {
    config: GameConfig,
    listener: Option<TcpListener>,
    admin_listener: Option<TcpListener>,
    clients: Arc<RwLock<ClientManager>>,
    intents: IntentTable,
    game_state: GameState,
    rng: StdRng,
    command_tx: mpsc::Sender<GameCommand>,
    command_rx: mpsc::Receiver<GameCommand>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl Server {
    /// Validates `config` and binds both listeners. Port 0 picks a free port.
    pub async fn bind(config: GameConfig) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;

        let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
        let admin_listener = TcpListener::bind((config.host.as_str(), config.admin_port)).await?;
        info!(
            "Server listening on {} (admin on {})",
            listener.local_addr()?,
            admin_listener.local_addr()?
        );

        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (shutdown, _) = watch::channel(false);

        Ok(Server {
            clients: Arc::new(RwLock::new(ClientManager::new(config.max_clients))),
            intents: Arc::new(RwLock::new(HashMap::new())),
            game_state: GameState::new(config.width, config.height),
            rng: StdRng::from_entropy(),
            listener: Some(listener),
            admin_listener: Some(admin_listener),
            config,
            command_tx,
            command_rx,
            shutdown: Arc::new(shutdown),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        Self::addr_of(&self.listener)
    }

    pub fn admin_addr(&self) -> io::Result<SocketAddr> {
        Self::addr_of(&self.admin_listener)
    }

    fn addr_of(listener: &Option<TcpListener>) -> io::Result<SocketAddr> {
        listener
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "listener already running"))?
            .local_addr()
    }

    /// Sending `true` stops [`Server::run`].
    pub fn shutdown_handle(&self) -> Arc<watch::Sender<bool>> {
        Arc::clone(&self.shutdown)
    }

    fn context(&self) -> SessionContext {
        SessionContext {
            clients: Arc::clone(&self.clients),
            intents: Arc::clone(&self.intents),
            commands: self.command_tx.clone(),
            outbound_queue: self.config.outbound_queue,
            write_timeout: self.config.write_timeout,
        }
    }

    /// Main server loop. Returns after shutdown once sessions were notified.
    pub async fn run(mut self) {
        let mut shutdown_rx = self.shutdown.subscribe();
        let mut tasks: Vec<JoinHandle<()>> = Vec::new();

        if let Some(listener) = self.listener.take() {
            tasks.push(tokio::spawn(accept_players(
                listener,
                self.context(),
                self.shutdown.subscribe(),
            )));
        }
        if let Some(listener) = self.admin_listener.take() {
            tasks.push(tokio::spawn(admin::accept_admins(
                listener,
                self.command_tx.clone(),
                Arc::clone(&self.shutdown),
            )));
        }
        tasks.push(probe::spawn_probe(
            Arc::clone(&self.clients),
            self.config.probe_interval,
            self.shutdown.subscribe(),
        ));

        let mut tick_interval = interval(self.config.tick_interval);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Server started successfully");

        loop {
            tokio::select! {
                Some(command) = self.command_rx.recv() => {
                    self.handle_command(command).await;
                },
                _ = tick_interval.tick() => {
                    self.tick().await;
                },
                _ = shutdown_rx.changed() => {
                    info!("Server shutting down");
                    break;
                }
            }
        }

        self.notify_shutdown().await;
        for task in tasks {
            task.abort();
        }
    }

    /// One tick: simulate, then publish the snapshot to every session.
    async fn tick(&mut self) {
        let started = Instant::now();

        let intents = self.intents.read().await.clone();
        let report = simulation::step(&mut self.game_state, &intents, &self.config, &mut self.rng);

        if !report.deaths.is_empty() {
            let mut clients = self.clients.write().await;
            let mut table = self.intents.write().await;
            for (id, _) in &report.deaths {
                clients.mark_dead(id);
                table.remove(id);
            }
        }
        if report.game_over {
            info!("Game over at tick {}", self.game_state.tick);
        }

        self.game_state.tick += 1;
        let snapshot = Packet::Snapshot(self.game_state.snapshot());
        self.publish(&snapshot, Audience::Everyone).await;

        let every = self.config.telemetry_every_ticks;
        if every > 0 && self.game_state.tick % every == 0 {
            self.publish_telemetry().await;
        }

        let elapsed = started.elapsed();
        if elapsed > self.config.tick_interval {
            warn!(
                "Tick {} took {}ms, longer than the {}ms interval",
                self.game_state.tick,
                elapsed.as_millis(),
                self.config.tick_interval.as_millis()
            );
        } else if self.game_state.tick % 100 == 0 {
            debug!(
                "Tick {}: {} snake(s), {} fruit(s), {}us",
                self.game_state.tick,
                self.game_state.snakes().len(),
                self.game_state.fruits().len(),
                elapsed.as_micros()
            );
        }
    }

    /// Encodes `packet` once and queues the same bytes for every session in
    /// `audience`. Sessions that cannot take the frame are evicted.
    async fn publish(&mut self, packet: &Packet, audience: Audience) {
        let frame: Frame = match encode_frame(packet) {
            Ok(bytes) => bytes.into(),
            Err(e) => {
                error!("Failed to encode {}: {}", packet.kind(), e);
                return;
            }
        };

        let failed = self.clients.read().await.broadcast(&frame, audience);
        if !failed.is_empty() {
            self.evict(&failed).await;
        }
    }

    async fn publish_telemetry(&mut self) {
        let rows = {
            let clients = self.clients.read().await;
            let state = &self.game_state;
            clients.telemetry(|id| state.snake(id).map(|snake| snake.score))
        };
        self.publish(&Packet::Telemetry(rows), Audience::Spectators).await;
    }

    async fn evict(&mut self, ids: &[String]) {
        let mut clients = self.clients.write().await;
        let mut table = self.intents.write().await;
        for id in ids {
            clients.remove(id);
            table.remove(id);
            if self.game_state.remove_snake(id).is_some() {
                warn!("Evicted {} and removed its snake", id);
            } else {
                warn!("Evicted {}", id);
            }
        }
    }

    async fn handle_command(&mut self, command: GameCommand) {
        match command {
            GameCommand::Spawn { id, reply } => {
                let state = &self.game_state;
                let spawn = self
                    .config
                    .free_spawn_point(state.snakes().len(), |cell| state.is_snake_cell(cell));
                self.game_state.remove_fruit_at(spawn);
                self.game_state.add_snake(Snake::new(id.clone(), spawn));
                self.intents
                    .write()
                    .await
                    .insert(id.clone(), self.config.initial_direction);

                if reply.send(spawn).is_err() {
                    debug!("{} left before its spawn was confirmed", id);
                }
            }
            GameCommand::Leave { id } => {
                self.clients.write().await.remove(&id);
                self.intents.write().await.remove(&id);
                self.game_state.remove_snake(&id);
            }
            GameCommand::Admin { command, reply } => {
                let text = self.handle_admin(command).await;
                if reply.send(text).is_err() {
                    debug!("Admin connection closed before the reply");
                }
            }
        }
    }

    async fn handle_admin(&mut self, command: AdminCommand) -> String {
        info!("Admin command: {:?}", command);
        let result = match command {
            AdminCommand::StartGame => admin::start_game(&mut self.game_state),
            AdminCommand::ResetGame => {
                let mut table = self.intents.write().await;
                admin::reset_game(&mut self.game_state, &mut table, &self.config, &mut self.rng)
            }
            AdminCommand::ListPlayers => Ok(admin::list_players(&self.game_state)),
            AdminCommand::KickPlayer(id) => {
                let mut clients = self.clients.write().await;
                let mut table = self.intents.write().await;
                admin::kick_player(&mut self.game_state, &mut clients, &mut table, &id)
            }
            AdminCommand::Shutdown => Ok(SHUTDOWN_REPLY.to_string()),
        };
        admin::render(result)
    }

    /// Best-effort `Disconnected` to everyone, then drop all sessions so
    /// their writers flush and close.
    async fn notify_shutdown(&mut self) {
        let notice = Packet::Disconnected {
            reason: "Server shutting down".to_string(),
        };
        match encode_frame(&notice) {
            Ok(bytes) => {
                let frame: Frame = bytes.into();
                self.clients.read().await.broadcast(&frame, Audience::Everyone);
            }
            Err(e) => error!("Failed to encode shutdown notice: {}", e),
        }

        let sessions = {
            let mut clients = self.clients.write().await;
            let count = clients.len();
            clients.clear();
            count
        };
        self.intents.write().await.clear();
        info!("Closed {} session(s)", sessions);

        tokio::time::sleep(SHUTDOWN_GRACE).await;
    }
}

/// Accepts gameplay connections until shutdown.
async fn accept_players(listener: TcpListener, ctx: SessionContext, mut stop: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    tokio::spawn(handle_connection(stream, addr, ctx.clone()));
                }
                Err(e) => error!("Accept failed: {}", e),
            },
            _ = stop.changed() => break,
        }
    }
    debug!("Player listener stopped");
}

/// Drives one gameplay connection from handshake to cleanup.
async fn handle_connection(stream: TcpStream, addr: SocketAddr, ctx: SessionContext) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Could not set TCP_NODELAY for {}: {}", addr, e);
    }
    let (mut reader, mut writer) = stream.into_split();

    let spectator = match timeout(HANDSHAKE_TIMEOUT, read_packet(&mut reader)).await {
        Ok(Ok(Packet::Connect {
            client_version,
            spectator,
        })) => {
            if client_version != PROTOCOL_VERSION {
                warn!(
                    "{} uses protocol {}, expected {}",
                    addr, client_version, PROTOCOL_VERSION
                );
                refuse(&mut writer, "Protocol version mismatch").await;
                return;
            }
            spectator
        }
        Ok(Ok(other)) => {
            warn!("{} opened with {} instead of Connect", addr, other.kind());
            return;
        }
        Ok(Err(e)) => {
            debug!("Handshake with {} failed: {}", addr, e);
            return;
        }
        Err(_) => {
            warn!("{} did not complete the handshake in time", addr);
            return;
        }
    };

    let (queue_tx, queue_rx) = mpsc::channel(ctx.outbound_queue);
    let registered = {
        let mut clients = ctx.clients.write().await;
        if clients.is_full() {
            None
        } else {
            let id = clients.next_id(spectator);
            clients
                .register(Session::new(id.clone(), addr, spectator, queue_tx))
                .then_some(id)
        }
    };
    let id = match registered {
        Some(id) => id,
        None => {
            warn!("Refusing {}: server full", addr);
            refuse(&mut writer, "Server full").await;
            return;
        }
    };

    if let Err(e) = establish(&mut writer, &id, spectator, &ctx).await {
        warn!("Could not establish {}: {}", id, e);
        cleanup(&id, &ctx).await;
        return;
    }

    tokio::select! {
        result = read_loop(reader, &id, spectator, &ctx) => match result {
            Ok(()) => info!("{} left", id),
            Err(e) => warn!("Dropping {}: {}", id, e),
        },
        result = write_loop(writer, queue_rx, ctx.write_timeout) => match result {
            Ok(()) => debug!("{} outbound queue closed", id),
            Err(e) => warn!("Dropping {}: {}", id, e),
        },
    }

    cleanup(&id, &ctx).await;
}

/// Creates the creature (players only), delivers the id and marks the
/// session alive. Nothing is broadcast to the session before this returns.
async fn establish(
    writer: &mut OwnedWriteHalf,
    id: &str,
    spectator: bool,
    ctx: &SessionContext,
) -> Result<(), ProtocolError> {
    if !spectator {
        let (reply_tx, reply_rx) = oneshot::channel();
        ctx.commands
            .send(GameCommand::Spawn {
                id: id.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| ProtocolError::Closed)?;
        let spawn = reply_rx.await.map_err(|_| ProtocolError::Closed)?;
        debug!("{} spawned at {}", id, spawn);
    }

    let connected = Packet::Connected {
        player_id: id.to_string(),
    };
    match timeout(ctx.write_timeout, write_packet(writer, &connected)).await {
        Ok(result) => result?,
        Err(_) => return Err(timed_out()),
    }

    ctx.clients.write().await.promote(id);
    Ok(())
}

async fn refuse(writer: &mut OwnedWriteHalf, reason: &str) {
    let packet = Packet::Disconnected {
        reason: reason.to_string(),
    };
    if let Ok(Err(e)) = timeout(HANDSHAKE_TIMEOUT, write_packet(writer, &packet)).await {
        debug!("Could not deliver refusal: {}", e);
    }
}

async fn cleanup(id: &str, ctx: &SessionContext) {
    ctx.clients.write().await.remove(id);
    ctx.intents.write().await.remove(id);
    if ctx
        .commands
        .send(GameCommand::Leave { id: id.to_string() })
        .await
        .is_err()
    {
        debug!("Game actor already stopped, {} not handed over", id);
    }
}

/// Reads client packets until the peer leaves or breaks protocol.
async fn read_loop(
    mut reader: OwnedReadHalf,
    id: &str,
    spectator: bool,
    ctx: &SessionContext,
) -> Result<(), ProtocolError> {
    loop {
        match read_packet(&mut reader).await {
            Ok(Packet::Intent { direction }) => {
                if spectator {
                    debug!("Ignoring intent from spectator {}", id);
                    continue;
                }
                ctx.intents.write().await.insert(id.to_string(), direction);
            }
            Ok(Packet::ProbeEcho { timestamp }) => {
                if probe::record_echo(&ctx.clients, id, timestamp).await.is_none() {
                    debug!("Ignoring bogus probe echo from {}", id);
                }
            }
            Ok(Packet::Disconnect) | Err(ProtocolError::Closed) => return Ok(()),
            Ok(other) => return Err(ProtocolError::Unexpected(other.kind())),
            Err(e) => return Err(e),
        }
    }
}

/// Writes queued frames with a per-frame deadline. Ends when the queue is
/// closed, shutting down the write half so the peer sees end of stream.
async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut queue: mpsc::Receiver<Frame>,
    limit: Duration,
) -> Result<(), ProtocolError> {
    while let Some(frame) = queue.recv().await {
        match timeout(limit, write_frame(&mut writer, &frame)).await {
            Ok(result) => result?,
            Err(_) => return Err(timed_out()),
        }
    }
    if let Err(e) = writer.shutdown().await {
        debug!("Could not shut down the write half: {}", e);
    }
    Ok(())
}

fn timed_out() -> ProtocolError {
    ProtocolError::Io(io::Error::new(io::ErrorKind::TimedOut, "write timed out"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{decode_packet, Phase};

    fn test_config() -> GameConfig {
        GameConfig {
            port: 0,
            admin_port: 0,
            width: 10,
            height: 10,
            spawn_points: vec![Position::new(2, 2), Position::new(7, 7)],
            min_fruits: 0,
            fruits_per_player_divisor: 100,
            tick_interval: Duration::from_millis(20),
            ..GameConfig::default()
        }
    }

    async fn add_session(server: &Server, spectator: bool) -> (String, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(8);
        let mut clients = server.clients.write().await;
        let id = clients.next_id(spectator);
        clients.register(Session::new(id.clone(), "127.0.0.1:9000".parse().unwrap(), spectator, tx));
        clients.promote(&id);
        (id, rx)
    }

    async fn spawn(server: &mut Server, id: &str) -> Position {
        let (reply, rx) = oneshot::channel();
        server
            .handle_command(GameCommand::Spawn {
                id: id.to_string(),
                reply,
            })
            .await;
        rx.await.unwrap()
    }

    async fn admin(server: &mut Server, command: AdminCommand) -> String {
        let (reply, rx) = oneshot::channel();
        server.handle_command(GameCommand::Admin { command, reply }).await;
        rx.await.unwrap()
    }

    fn decode(frame: &Frame) -> Packet {
        decode_packet(&frame[4..]).unwrap()
    }

    #[tokio::test]
    async fn test_bind_rejects_invalid_config() {
        let config = GameConfig {
            width: 0,
            ..test_config()
        };
        assert!(Server::bind(config).await.is_err());
    }

    #[tokio::test]
    async fn test_spawn_uses_rotation_and_default_intent() {
        let mut server = Server::bind(test_config()).await.unwrap();

        assert_eq!(spawn(&mut server, "Player_1").await, Position::new(2, 2));
        assert_eq!(spawn(&mut server, "Player_2").await, Position::new(7, 7));
        assert_eq!(spawn(&mut server, "Player_3").await, Position::new(2, 2));

        let intents = server.intents.read().await;
        assert_eq!(intents.get("Player_1"), Some(&Direction::Right));
        assert_eq!(server.game_state.snakes().len(), 3);
    }

    #[tokio::test]
    async fn test_rejoin_after_leave_gets_an_unused_slot() {
        let mut server = Server::bind(test_config()).await.unwrap();
        assert_eq!(spawn(&mut server, "Player_1").await, Position::new(2, 2));
        assert_eq!(spawn(&mut server, "Player_2").await, Position::new(7, 7));
        server
            .handle_command(GameCommand::Leave {
                id: "Player_1".to_string(),
            })
            .await;

        assert_eq!(spawn(&mut server, "Player_3").await, Position::new(2, 2));

        admin(&mut server, AdminCommand::StartGame).await;
        server.tick().await;
        assert_eq!(server.game_state.snakes().len(), 2);
        assert_eq!(server.game_state.phase(), Phase::InProgress);
    }

    #[tokio::test]
    async fn test_tick_broadcasts_same_snapshot_to_all() {
        let mut server = Server::bind(test_config()).await.unwrap();
        let (player, mut rx_player) = add_session(&server, false).await;
        let (_spectator, mut rx_spectator) = add_session(&server, true).await;
        spawn(&mut server, &player).await;

        server.tick().await;

        let a = rx_player.recv().await.unwrap();
        let b = rx_spectator.recv().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        match decode(&a) {
            Packet::Snapshot(snapshot) => {
                assert_eq!(snapshot.tick, 1);
                assert_eq!(snapshot.phase, Phase::WaitingForPlayers);
                assert_eq!(snapshot.creatures.len(), 1);
            }
            other => panic!("Unexpected packet: {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_tick_moves_after_start() {
        let mut server = Server::bind(test_config()).await.unwrap();
        spawn(&mut server, "Player_1").await;

        assert_eq!(admin(&mut server, AdminCommand::StartGame).await, "Game started.");
        server.tick().await;
        server.tick().await;

        assert_eq!(
            server.game_state.snake("Player_1").unwrap().head(),
            Position::new(4, 2)
        );
        assert_eq!(server.game_state.tick, 2);
    }

    #[tokio::test]
    async fn test_death_marks_session_dead() {
        let mut server = Server::bind(test_config()).await.unwrap();
        let (id, _rx) = add_session(&server, false).await;
        spawn(&mut server, &id).await;
        server.intents.write().await.insert(id.clone(), Direction::Up);
        admin(&mut server, AdminCommand::StartGame).await;

        for _ in 0..3 {
            server.tick().await;
        }

        let clients = server.clients.read().await;
        assert_eq!(clients.get(&id).unwrap().status, shared::SessionStatus::Dead);
        assert!(server.game_state.snake(&id).is_none());
        assert_eq!(server.game_state.phase(), Phase::GameEnded);
        assert!(!server.intents.read().await.contains_key(&id));
    }

    #[tokio::test]
    async fn test_full_queue_is_evicted_without_blocking() {
        let mut server = Server::bind(test_config()).await.unwrap();
        let (slow, _rx_slow) = {
            let (tx, rx) = mpsc::channel(1);
            let mut clients = server.clients.write().await;
            let id = clients.next_id(false);
            clients.register(Session::new(id.clone(), "127.0.0.1:9001".parse().unwrap(), false, tx));
            clients.promote(&id);
            (id, rx)
        };
        spawn(&mut server, &slow).await;
        let (fine, mut rx_fine) = add_session(&server, true).await;

        server.tick().await;
        server.tick().await;

        assert!(!server.clients.read().await.contains(&slow));
        assert!(server.game_state.snake(&slow).is_none());
        assert!(server.clients.read().await.contains(&fine));
        assert!(rx_fine.recv().await.is_some());
        assert!(rx_fine.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_telemetry_goes_to_spectators_only() {
        let config = GameConfig {
            telemetry_every_ticks: 1,
            ..test_config()
        };
        let mut server = Server::bind(config).await.unwrap();
        let (player, mut rx_player) = add_session(&server, false).await;
        let (_spectator, mut rx_spectator) = add_session(&server, true).await;
        spawn(&mut server, &player).await;

        server.tick().await;

        assert!(matches!(decode(&rx_player.recv().await.unwrap()), Packet::Snapshot(_)));
        assert!(rx_player.try_recv().is_err());

        assert!(matches!(decode(&rx_spectator.recv().await.unwrap()), Packet::Snapshot(_)));
        match decode(&rx_spectator.recv().await.unwrap()) {
            Packet::Telemetry(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].id, player);
            }
            other => panic!("Unexpected packet: {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_leave_removes_everything() {
        let mut server = Server::bind(test_config()).await.unwrap();
        let (id, _rx) = add_session(&server, false).await;
        spawn(&mut server, &id).await;

        server
            .handle_command(GameCommand::Leave { id: id.clone() })
            .await;

        assert!(server.game_state.snake(&id).is_none());
        assert!(!server.clients.read().await.contains(&id));
        assert!(!server.intents.read().await.contains_key(&id));
    }

    #[tokio::test]
    async fn test_admin_replies_render_errors() {
        let mut server = Server::bind(test_config()).await.unwrap();

        admin(&mut server, AdminCommand::StartGame).await;
        assert_eq!(
            admin(&mut server, AdminCommand::StartGame).await,
            "Error: game is already in progress"
        );
        assert_eq!(
            admin(&mut server, AdminCommand::KickPlayer("Player_9".into())).await,
            "Error: no player with id `Player_9`"
        );
        assert_eq!(
            admin(&mut server, AdminCommand::Shutdown).await,
            SHUTDOWN_REPLY
        );
    }

    #[tokio::test]
    async fn test_shutdown_notifies_and_closes_queues() {
        let mut server = Server::bind(test_config()).await.unwrap();
        let (_id, mut rx) = add_session(&server, false).await;

        server.notify_shutdown().await;

        match decode(&rx.recv().await.unwrap()) {
            Packet::Disconnected { reason } => assert_eq!(reason, "Server shutting down"),
            other => panic!("Unexpected packet: {}", other.kind()),
        }
        assert!(rx.recv().await.is_none());
        assert!(server.clients.read().await.is_empty());
    }
}
