//! # Snake Arena Server Library
//!
//! Authoritative core of a multiplayer snake arena. Up to four participants
//! steer actors on a fixed grid, eat consumables to grow and score, and die
//! on contact with the board edge, walls, their own body or another actor.
//! The last actor standing wins.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The server owns the only writable copy of the world. Participants send
//! heading requests and lobby commands; everything they see comes back as
//! immutable snapshots.
//!
//! ### Participant Management
//! Handles the lifecycle of a connection:
//! - Join with protocol version check and actor slot assignment
//! - Heading, difficulty and start requests
//! - Leave, timeout and shutdown cleanup
//!
//! ### State Broadcasting
//! Every tick of a running game produces one snapshot that is sent to all
//! participants. The tick that ends a game is followed by a final
//! session-ended message.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The world and its step function: movement, growth, collision resolution,
//! consumable spawning and end-of-game detection.
//!
//! ### Collision Module (`collision`)
//! Pure head-versus-world checks in a fixed priority order.
//!
//! ### Session Module (`session`)
//! Serializes access to the world and runs the tick driver at the
//! difficulty-scaled interval.
//!
//! ### Client Manager Module (`client_manager`)
//! Participant ids, addresses and heartbeat timeouts.
//!
//! ### Network Module (`network`)
//! UDP socket, bincode codec and the tasks that glue the above together.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(&ServerConfig::default()).await?;
//!
//!     // Runs until a Shutdown message arrives on `server.shutdown_handle()`
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! The server uses an event-driven architecture with internal async tasks that handle:
//! - **Network Receiver**: Continuously listens for incoming packets
//! - **Network Sender**: Processes outgoing packet queue and broadcasts
//! - **Timeout Checker**: Monitors participant health and removes silent connections
//! - **Tick Driver**: Steps the running game and publishes snapshots

pub mod client_manager;
pub mod collision;
pub mod config;
pub mod error;
pub mod game;
pub mod network;
pub mod session;
pub mod utils;
