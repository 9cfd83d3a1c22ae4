use crate::game::ClientGameState;
use crate::input::InputManager;
use log::{debug, error, info, warn};
use shared::{
    read_packet, write_packet, Direction, Packet, Phase, PlayerTelemetry, ProtocolError, WorldSnapshot,
    PROTOCOL_VERSION,
};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("server refused the connection: {0}")]
    Refused(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Something the application should react to.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    Snapshot(WorldSnapshot),
    Telemetry(Vec<PlayerTelemetry>),
    Disconnected(String),
}

/// A gameplay connection. Probes are echoed transparently.
pub struct GameClient {
    reader: Option<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    player_id: String,
    spectator: bool,
    game_state: ClientGameState,
    input_manager: InputManager,
}

impl GameClient {
    /// Connects and completes the handshake. Fails if the server refuses.
    pub async fn connect(addr: &str, spectator: bool) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (mut reader, mut writer) = stream.into_split();

        info!("Connecting to {}{}", addr, if spectator { " as spectator" } else { "" });
        write_packet(
            &mut writer,
            &Packet::Connect {
                client_version: PROTOCOL_VERSION,
                spectator,
            },
        )
        .await?;

        let player_id = match read_packet(&mut reader).await? {
            Packet::Connected { player_id } => player_id,
            Packet::Disconnected { reason } => return Err(ClientError::Refused(reason)),
            other => return Err(ProtocolError::Unexpected(other.kind()).into()),
        };
        info!("Connected! Player ID: {}", player_id);

        let mut game_state = ClientGameState::new();
        game_state.set_player_id(player_id.clone());

        Ok(GameClient {
            reader: Some(reader),
            writer,
            player_id,
            spectator,
            game_state,
            input_manager: InputManager::new(),
        })
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn game_state(&self) -> &ClientGameState {
        &self.game_state
    }

    pub async fn send_intent(&mut self, direction: Direction) -> Result<(), ProtocolError> {
        write_packet(&mut self.writer, &Packet::Intent { direction }).await
    }

    /// Waits for the next snapshot, telemetry report or disconnect notice.
    pub async fn next_event(&mut self) -> Result<ClientEvent, ProtocolError> {
        loop {
            let reader = self.reader.as_mut().ok_or(ProtocolError::Closed)?;
            let packet = read_packet(reader).await?;
            if let Some(event) = self.handle_packet(packet).await? {
                return Ok(event);
            }
        }
    }

    async fn handle_packet(&mut self, packet: Packet) -> Result<Option<ClientEvent>, ProtocolError> {
        match packet {
            Packet::Probe { timestamp } => {
                write_packet(&mut self.writer, &Packet::ProbeEcho { timestamp }).await?;
                Ok(None)
            }
            Packet::Snapshot(snapshot) => {
                if self.game_state.apply_snapshot(snapshot.clone()) == Some(Phase::WaitingForPlayers) {
                    // intents were reset server-side
                    self.input_manager.reset(Direction::None);
                }
                Ok(Some(ClientEvent::Snapshot(snapshot)))
            }
            Packet::Telemetry(rows) => Ok(Some(ClientEvent::Telemetry(rows))),
            Packet::Disconnected { reason } => Ok(Some(ClientEvent::Disconnected(reason))),
            other => Err(ProtocolError::Unexpected(other.kind())),
        }
    }

    /// Interactive loop: directions typed on `input` become intents, server
    /// traffic is logged. Returns when either side closes.
    pub async fn run<I>(mut self, input: I) -> Result<(), ClientError>
    where
        I: AsyncBufRead + Unpin,
    {
        let mut reader = self.reader.take().ok_or(ProtocolError::Closed)?;
        let (packet_tx, mut packet_rx) = mpsc::channel(64);

        // read_packet is not cancel safe, so it gets a task of its own
        let reader_task = tokio::spawn(async move {
            loop {
                let result = read_packet(&mut reader).await;
                let done = result.is_err();
                if packet_tx.send(result).await.is_err() || done {
                    break;
                }
            }
        });

        if self.spectator {
            info!("Spectating; press Ctrl+D to leave");
        } else {
            info!("Type w/a/s/d (or up/down/left/right) and Enter to steer");
        }

        let mut lines = input.lines();
        let mut stdin_open = true;
        let result = loop {
            tokio::select! {
                received = packet_rx.recv() => {
                    let packet = match received {
                        Some(Ok(packet)) => packet,
                        Some(Err(ProtocolError::Closed)) | None => {
                            info!("Server closed the connection");
                            break Ok(());
                        }
                        Some(Err(e)) => break Err(e.into()),
                    };
                    match self.handle_packet(packet).await {
                        Ok(Some(event)) => {
                            if !self.report(event) {
                                break Ok(());
                            }
                        }
                        Ok(None) => {}
                        Err(e) => break Err(e.into()),
                    }
                }
                line = lines.next_line(), if stdin_open => match line {
                    Ok(Some(line)) => {
                        if self.spectator {
                            continue;
                        }
                        match self.input_manager.update(&line) {
                            Some(direction) => {
                                if let Err(e) = self.send_intent(direction).await {
                                    break Err(e.into());
                                }
                                debug!("Sent {:?}", direction);
                            }
                            None => debug!("Ignoring `{}`", line.trim()),
                        }
                    }
                    Ok(None) => {
                        info!("Input closed, leaving");
                        if let Err(e) = write_packet(&mut self.writer, &Packet::Disconnect).await {
                            warn!("Could not say goodbye: {}", e);
                        }
                        break Ok(());
                    }
                    Err(e) => {
                        error!("Failed to read input: {}", e);
                        stdin_open = false;
                    }
                },
            }
        };

        reader_task.abort();
        result
    }

    /// Logs an event. Returns false once the session is over.
    fn report(&mut self, event: ClientEvent) -> bool {
        match event {
            ClientEvent::Snapshot(snapshot) => {
                debug!("{}", self.game_state.scoreboard());
                if !self.spectator && snapshot.creature(&self.player_id).is_none() {
                    debug!("{} has no snake on the board", self.player_id);
                }
                true
            }
            ClientEvent::Telemetry(rows) => {
                for row in rows {
                    info!(
                        "{} from {}: score {}, {}, rtt {}, {:.2} KB/s, connected {}s",
                        row.id,
                        row.origin,
                        row.score,
                        row.status,
                        row.rtt_ms
                            .map(|ms| format!("{}ms", ms))
                            .unwrap_or_else(|| "n/a".to_string()),
                        row.kbps(),
                        row.connected_secs
                    );
                }
                true
            }
            ClientEvent::Disconnected(reason) => {
                warn!("Disconnected: {}", reason);
                false
            }
        }
    }
}
