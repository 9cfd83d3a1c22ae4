//! # Snake Arena Client Library
//!
//! Headless clients for the snake arena server. The server is authoritative;
//! a client only submits direction intents and keeps the latest snapshot it
//! was sent.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! `GameClient` performs the `Connect`/`Connected` handshake, answers latency
//! probes, sends intents and surfaces snapshots, telemetry reports and
//! disconnect notices as `ClientEvent`s.
//!
//! ### Game Module (`game`)
//! `ClientGameState` holds the most recent `WorldSnapshot`, drops stale ones
//! and reports phase changes.
//!
//! ### Input Module (`input`)
//! `InputManager` maps typed words (`w`, `left`, ...) to directions and only
//! lets a direction through when it changed.
//!
//! ### Admin Module (`admin`)
//! `AdminConsole` talks to the line-based admin port: one command out, one
//! response line back.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{ClientEvent, GameClient};
//! use shared::Direction;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = GameClient::connect("127.0.0.1:12350", false).await?;
//!     client.send_intent(Direction::Up).await?;
//!
//!     while let ClientEvent::Snapshot(snapshot) = client.next_event().await? {
//!         println!("tick {}: {} snake(s)", snapshot.tick, snapshot.creatures.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod game;
pub mod input;
pub mod network;
