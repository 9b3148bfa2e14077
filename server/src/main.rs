use clap::Parser;
use log::{error, info};
use server::config::{ServerConfig, SessionConfig};
use server::network::{Server, ServerMessage};
use shared::Difficulty;
use std::time::Duration;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "12345")]
    port: u16,
    /// Tick delay in milliseconds at the lowest difficulty
    #[clap(short, long, default_value = "150")]
    tick_ms: u64,
    /// Maximum number of participants (at most 4)
    #[clap(short, long, default_value = "4")]
    max_players: usize,
    /// Difficulty the session starts with (low, medium, high)
    #[clap(short, long, default_value = "low")]
    difficulty: Difficulty,
    /// Upper bound on consumables present at once
    #[clap(long, default_value = "3")]
    max_food: usize,
    /// Ticks between timed consumable spawns, 0 to disable
    #[clap(long, default_value = "40")]
    spawn_interval: u32,
    /// Seconds of silence before a participant is dropped
    #[clap(long, default_value = "10")]
    client_timeout: u64,
    /// Fixed RNG seed for reproducible sessions
    #[clap(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    let config = ServerConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        client_timeout: Duration::from_secs(args.client_timeout),
        session: SessionConfig {
            max_participants: args.max_players.clamp(1, shared::MAX_PARTICIPANTS),
            base_tick: Duration::from_millis(args.tick_ms.max(1)),
            max_consumables: args.max_food,
            spawn_interval_ticks: args.spawn_interval,
            initial_difficulty: args.difficulty,
            seed: args.seed,
            ..SessionConfig::default()
        },
    };

    info!(
        "Starting snake arena on {} ({} players, {:?})",
        config.bind_addr, config.session.max_participants, config.session.initial_difficulty
    );

    let mut server = Server::new(&config).await?;

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down gracefully...");
                if shutdown.send(ServerMessage::Shutdown).is_err() {
                    error!("Server loop already stopped");
                }
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    server.run().await?;

    info!("Server stopped");
    Ok(())
}
