//! Headless participant that joins a server and steers greedily toward food.
//!
//! Handy for soak-testing a server or filling empty slots next to a human.

use bincode::{deserialize, serialize};
use clap::Parser;
use log::{debug, info, warn};
use shared::{in_bounds, Cell, Difficulty, Direction, Packet, Snapshot, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{interval, timeout};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server address to connect to
    #[clap(short, long, default_value = "127.0.0.1:12345")]
    server: SocketAddr,
    /// Ask the server to start a game once joined
    #[clap(long)]
    start: bool,
    /// Difficulty to request before starting
    #[clap(short, long)]
    difficulty: Option<Difficulty>,
    /// Seconds between heartbeats
    #[clap(long, default_value = "2")]
    heartbeat: u64,
}

/// Picks the safe heading that gets closest to the nearest consumable.
///
/// A heading is safe when the next cell is on the board, not a live wall and
/// not part of any actor's body. Returns `None` for dead or missing actors, or
/// when every heading is fatal.
fn choose_direction(snapshot: &Snapshot, participant_id: u32) -> Option<Direction> {
    let actor = snapshot.actor(participant_id)?;
    if !actor.alive {
        return None;
    }
    let head = actor.head();

    let target = snapshot
        .consumables
        .iter()
        .map(|c| c.position)
        .min_by_key(|position| head.distance(*position));

    let is_safe = |cell: Cell| {
        in_bounds(cell, snapshot.width, snapshot.height)
            && !snapshot.is_obstacle_at(cell)
            && !snapshot.actors.iter().flatten().any(|a| a.occupies(cell))
    };

    Direction::ALL
        .into_iter()
        .filter(|direction| *direction != actor.direction.opposite())
        .filter(|direction| is_safe(head.offset(*direction)))
        .min_by_key(|direction| {
            let next = head.offset(*direction);
            // keep heading when nothing is on the board
            let distance = target.map_or(0, |t| next.distance(t));
            (distance, *direction != actor.direction)
        })
}

async fn send(
    socket: &UdpSocket,
    packet: &Packet,
    server: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = serialize(packet)?;
    socket.send_to(&data, server).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    info!("Bot socket bound to {}", socket.local_addr()?);

    send(
        &socket,
        &Packet::Join {
            client_version: PROTOCOL_VERSION,
        },
        args.server,
    )
    .await?;

    // Snapshots of a full board exceed a typical MTU-sized buffer
    let mut buf = vec![0u8; 64 * 1024];

    let participant_id = loop {
        let (len, _) = timeout(Duration::from_secs(5), socket.recv_from(&mut buf)).await??;
        match deserialize::<Packet>(&buf[..len]) {
            Ok(Packet::Accepted { participant_id }) => break participant_id,
            Ok(Packet::Rejected { reason }) => {
                warn!("Join rejected: {}", reason);
                return Ok(());
            }
            Ok(other) => debug!("Ignoring {:?} while joining", other),
            Err(e) => warn!("Failed to deserialize response: {}", e),
        }
    };
    info!("Joined as player {}", participant_id);

    if let Some(difficulty) = args.difficulty {
        send(&socket, &Packet::SetDifficulty { difficulty }, args.server).await?;
    }
    if args.start {
        send(&socket, &Packet::StartGame, args.server).await?;
    }

    let mut heartbeat = interval(Duration::from_secs(args.heartbeat.max(1)));
    let mut last_requested: Option<Direction> = None;

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                send(&socket, &Packet::Heartbeat, args.server).await?;
            }
            result = socket.recv_from(&mut buf) => {
                let (len, _) = result?;
                let packet = match deserialize::<Packet>(&buf[..len]) {
                    Ok(packet) => packet,
                    Err(e) => {
                        warn!("Failed to deserialize packet: {}", e);
                        continue;
                    }
                };

                match packet {
                    Packet::State { snapshot } => {
                        let Some(direction) = choose_direction(&snapshot, participant_id) else {
                            continue;
                        };
                        let current = snapshot.actor(participant_id).map(|a| a.next_direction);
                        if Some(direction) != current && Some(direction) != last_requested {
                            send(&socket, &Packet::Move { direction }, args.server).await?;
                            last_requested = Some(direction);
                        }
                    }
                    Packet::SessionEnded { snapshot } => {
                        for actor in snapshot.actors.iter().flatten() {
                            info!(
                                "Player {} ({}): {} points, {}",
                                actor.id,
                                actor.color,
                                actor.score,
                                if actor.alive { "alive" } else { "dead" }
                            );
                        }
                        break;
                    }
                    Packet::Joined { participant_id: other } => info!("Player {} joined", other),
                    Packet::Left { participant_id: other } => info!("Player {} left", other),
                    Packet::ServerError { reason } => {
                        warn!("Server error: {}", reason);
                        return Ok(());
                    }
                    other => debug!("Ignoring {:?}", other),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    send(&socket, &Packet::Leave, args.server).await?;
    info!("Bot finished");
    Ok(())
}
