//! Administrative control channel.
//!
//! A plain text protocol on its own port: one command per line, exactly one
//! response line per command. Parsing happens on the connection task; the
//! command itself is executed by the game actor between ticks, so it can
//! never interleave with a simulation step.

use crate::client_manager::{ClientManager, Frame};
use crate::config::GameConfig;
use crate::game::GameState;
use crate::network::GameCommand;
use crate::simulation::{self, Intents};
use log::{debug, info, warn};
use rand::Rng;
use shared::{encode_frame, Packet, Phase};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, watch};

pub const WELCOME: &str =
    "Snake arena admin console. Commands: START_GAME, RESET_GAME, LIST_PLAYERS, KICK_PLAYER <id>, SHUTDOWN";
pub const SHUTDOWN_REPLY: &str = "Server shutting down.";
pub const KICK_REASON: &str = "Kicked by administrator";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    StartGame,
    ResetGame,
    ListPlayers,
    KickPlayer(String),
    Shutdown,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("{0} requires an argument")]
    MissingArgument(&'static str),
    #[error("game is already in progress")]
    AlreadyInProgress,
    #[error("no player with id `{0}`")]
    UnknownPlayer(String),
    #[error("server is not accepting commands")]
    Unavailable,
}

impl FromStr for AdminCommand {
    type Err = CommandError;

    /// Verbs are case-insensitive; ids are taken verbatim.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(CommandError::Empty)?;

        match verb.to_ascii_uppercase().as_str() {
            "START_GAME" => Ok(AdminCommand::StartGame),
            "RESET_GAME" => Ok(AdminCommand::ResetGame),
            "LIST_PLAYERS" => Ok(AdminCommand::ListPlayers),
            "KICK_PLAYER" => words
                .next()
                .map(|id| AdminCommand::KickPlayer(id.to_string()))
                .ok_or(CommandError::MissingArgument("KICK_PLAYER")),
            "SHUTDOWN" => Ok(AdminCommand::Shutdown),
            _ => Err(CommandError::Unknown(verb.to_string())),
        }
    }
}

pub fn start_game(state: &mut GameState) -> Result<String, CommandError> {
    if state.phase() == Phase::InProgress {
        return Err(CommandError::AlreadyInProgress);
    }
    state.set_phase(Phase::InProgress);
    Ok("Game started.".to_string())
}

/// Back to the lobby: fruit is cleared, every live creature is respawned on
/// the rotation and gets the default intent, then fruit is replenished.
pub fn reset_game<R: Rng + ?Sized>(
    state: &mut GameState,
    intents: &mut Intents,
    config: &GameConfig,
    rng: &mut R,
) -> Result<String, CommandError> {
    state.set_phase(Phase::WaitingForPlayers);
    state.clear_fruits();

    let mut respawned = 0;
    for (index, snake) in state.snakes_mut().enumerate() {
        snake.respawn(config.spawn_point(index));
        intents.insert(snake.id().to_string(), config.initial_direction);
        respawned += 1;
    }
    simulation::replenish_fruit(state, config, rng);

    Ok(format!("Game reset. {} player(s) respawned.", respawned))
}

pub fn list_players(state: &GameState) -> String {
    if state.snakes().is_empty() {
        return "No players connected.".to_string();
    }
    let entries: Vec<String> = state
        .snakes()
        .iter()
        .map(|snake| format!("{} (score {})", snake.id(), snake.score))
        .collect();
    format!("{} player(s): {}", entries.len(), entries.join(", "))
}

/// Removes the creature, intent and session of `id`. The session is sent a
/// `Disconnected` notice first; its writer closes the connection once the
/// notice is flushed.
pub fn kick_player(
    state: &mut GameState,
    clients: &mut ClientManager,
    intents: &mut Intents,
    id: &str,
) -> Result<String, CommandError> {
    let creature = state.remove_snake(id);
    intents.remove(id);
    let session = clients.remove(id);

    if creature.is_none() && session.is_none() {
        return Err(CommandError::UnknownPlayer(id.to_string()));
    }

    if let Some(session) = session {
        let notice = Packet::Disconnected {
            reason: KICK_REASON.to_string(),
        };
        match encode_frame(&notice) {
            Ok(bytes) => {
                let frame: Frame = bytes.into();
                if session.try_send(&frame).is_err() {
                    debug!("{} could not be notified of the kick", id);
                }
            }
            Err(e) => warn!("Failed to encode kick notice: {}", e),
        }
    }

    Ok(format!("Player {} kicked.", id))
}

/// Turns a command result into its single response line.
pub fn render(result: Result<String, CommandError>) -> String {
    match result {
        Ok(text) => text,
        Err(e) => format!("Error: {}", e),
    }
}

/// Accepts admin connections until shutdown.
pub async fn accept_admins(
    listener: TcpListener,
    commands: mpsc::Sender<GameCommand>,
    shutdown: Arc<watch::Sender<bool>>,
) {
    let mut stop = shutdown.subscribe();
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    tokio::spawn(handle_admin_connection(
                        stream,
                        addr,
                        commands.clone(),
                        Arc::clone(&shutdown),
                    ));
                }
                Err(e) => warn!("Admin accept failed: {}", e),
            },
            _ = stop.changed() => break,
        }
    }
    debug!("Admin listener stopped");
}

async fn handle_admin_connection(
    stream: TcpStream,
    addr: SocketAddr,
    commands: mpsc::Sender<GameCommand>,
    shutdown: Arc<watch::Sender<bool>>,
) {
    info!("Admin connected from {}", addr);
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    if writer.write_all(format!("{}\n", WELCOME).as_bytes()).await.is_err() {
        return;
    }

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                debug!("Admin {} read failed: {}", addr, e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let (reply, stop) = match line.parse::<AdminCommand>() {
            Ok(command) => {
                let stop = command == AdminCommand::Shutdown;
                (execute(&commands, command).await, stop)
            }
            Err(e) => (render(Err(e)), false),
        };

        if writer.write_all(format!("{}\n", reply).as_bytes()).await.is_err() {
            break;
        }
        if stop {
            if let Err(e) = writer.flush().await {
                debug!("Could not flush shutdown reply to {}: {}", addr, e);
            }
            info!("Shutdown requested by admin {}", addr);
            if shutdown.send(true).is_err() {
                debug!("Server already stopped");
            }
            break;
        }
    }
    info!("Admin {} disconnected", addr);
}

/// Hands a command to the game actor and waits for its response line.
async fn execute(commands: &mpsc::Sender<GameCommand>, command: AdminCommand) -> String {
    let (reply_tx, reply_rx) = oneshot::channel();
    if commands
        .send(GameCommand::Admin {
            command,
            reply: reply_tx,
        })
        .await
        .is_err()
    {
        return render(Err(CommandError::Unavailable));
    }
    reply_rx
        .await
        .unwrap_or_else(|_| render(Err(CommandError::Unavailable)))
}
