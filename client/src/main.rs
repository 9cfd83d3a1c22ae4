use clap::{Parser, ValueEnum};
use client::admin::AdminConsole;
use client::network::GameClient;
use log::info;
use tokio::io::BufReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Steer a snake from stdin
    Play,
    /// Watch snapshots and telemetry
    Spectate,
    /// Send admin commands from stdin
    Admin,
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// What to connect as
    #[clap(value_enum, default_value_t = Mode::Play)]
    mode: Mode,

    /// Gameplay address of the server
    #[clap(short = 's', long, default_value = "127.0.0.1:12350")]
    server: String,

    /// Admin address of the server
    #[clap(short = 'a', long, default_value = "127.0.0.1:12351")]
    admin: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let stdin = BufReader::new(tokio::io::stdin());

    match args.mode {
        Mode::Play | Mode::Spectate => {
            let client = GameClient::connect(&args.server, args.mode == Mode::Spectate).await?;
            info!("Playing as {}", client.player_id());
            client.run(stdin).await?;
        }
        Mode::Admin => {
            let console = AdminConsole::connect(&args.admin).await?;
            console.run(stdin).await?;
        }
    }

    Ok(())
}
