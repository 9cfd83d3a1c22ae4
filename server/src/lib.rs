//! # Snake Arena Server Library
//!
//! This library provides the authoritative server for the multiplayer snake
//! arena. It owns the canonical world, advances it at a fixed tick rate and
//! replicates an immutable snapshot of it to every connected session.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Every movement, collision, growth and scoring decision is made here.
//! Clients only submit direction intents and render whatever snapshot they
//! last received.
//!
//! ### Session Management
//! Handles the lifecycle of gameplay connections:
//! - Handshake, id assignment and spawn-slot rotation
//! - Intent collection into a shared table read once per tick
//! - Eviction of slow or broken sessions without stalling the tick
//!
//! ### State Replication
//! Once per tick the world is copied into a `WorldSnapshot`, encoded once and
//! the same bytes are queued for every session and spectator.
//!
//! ## Architecture Design
//!
//! ### Single-Owner Actor
//! `network::Server` is the only owner of `game::GameState`. Its loop either
//! runs a tick or executes a queued `GameCommand` (join, leave, admin), so
//! world mutations never interleave. Connection tasks write nothing but
//! intents.
//!
//! ### TCP Transport
//! Gameplay frames are a `u32` length prefix followed by a bincode `Packet`.
//! Each session has a bounded outbound queue drained by its own writer task
//! with a write deadline.
//!
//! ## Module Organization
//!
//! - `config`: tunables and their validation
//! - `entity`: snakes and fruit
//! - `game`: the world model
//! - `simulation`: one tick of simultaneous movement
//! - `client_manager`: the session registry and broadcast fan-out
//! - `probe`: periodic round-trip measurement
//! - `admin`: the line-based control channel
//! - `network`: listeners, session tasks and the game actor
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::GameConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(GameConfig::default()).await?;
//!     let shutdown = server.shutdown_handle();
//!
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         let _ = shutdown.send(true);
//!     });
//!
//!     server.run().await;
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod client_manager;
pub mod config;
pub mod entity;
pub mod game;
pub mod network;
pub mod probe;
pub mod simulation;
pub mod utils;
