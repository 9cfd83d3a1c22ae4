use clap::Parser;
use log::{debug, error, info};
use server::config::{GameConfig, DEFAULT_PORT};
use server::network::Server;
use shared::Position;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Authoritative snake arena server")]
struct Args {
    /// Address to bind both listeners to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Gameplay port
    #[clap(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Admin console port
    #[clap(short, long, default_value_t = DEFAULT_PORT + 1)]
    admin_port: u16,

    /// Board width in cells
    #[clap(long, default_value_t = 30)]
    width: i32,

    /// Board height in cells
    #[clap(long, default_value_t = 20)]
    height: i32,

    /// Milliseconds per tick
    #[clap(short, long, default_value_t = 150)]
    tick_ms: u64,

    /// Fruit on the board regardless of player count
    #[clap(long, default_value_t = 1)]
    min_fruits: usize,

    /// One extra fruit per this many live snakes
    #[clap(long, default_value_t = 2)]
    fruit_divisor: usize,

    /// Percent chance of a value 1 fruit
    #[clap(long, default_value_t = 70)]
    normal_chance: u32,

    /// Percent chance of a value 2 fruit
    #[clap(long, default_value_t = 20)]
    good_chance: u32,

    /// Spawn slot as `x,y`; repeat for more slots
    #[clap(long = "spawn", value_name = "X,Y")]
    spawn_points: Vec<Position>,

    /// Seconds between latency probes
    #[clap(long, default_value_t = 5)]
    probe_secs: u64,

    /// Maximum concurrent sessions
    #[clap(short, long, default_value_t = 32)]
    max_clients: usize,
}

impl Args {
    fn into_config(self) -> GameConfig {
        let defaults = GameConfig::default();
        GameConfig {
            host: self.host,
            port: self.port,
            admin_port: self.admin_port,
            width: self.width,
            height: self.height,
            tick_interval: Duration::from_millis(self.tick_ms),
            min_fruits: self.min_fruits,
            fruits_per_player_divisor: self.fruit_divisor,
            normal_fruit_chance: self.normal_chance,
            good_fruit_chance: self.good_chance,
            spawn_points: if self.spawn_points.is_empty() {
                defaults.spawn_points.clone()
            } else {
                self.spawn_points
            },
            probe_interval: Duration::from_secs(self.probe_secs),
            max_clients: self.max_clients,
            ..defaults
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Args::parse().into_config();
    info!(
        "Board {}x{}, tick {}ms, {} spawn slot(s)",
        config.width,
        config.height,
        config.tick_interval.as_millis(),
        config.spawn_points.len()
    );

    let server = Server::bind(config).await?;
    let shutdown = server.shutdown_handle();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down gracefully...");
                if shutdown.send(true).is_err() {
                    debug!("Server already stopped");
                }
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    server.run().await;
    info!("Server stopped");
    Ok(())
}
