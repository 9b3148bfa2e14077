//! Runtime configuration for the session and the UDP server.
//!
//! Defaults mirror the constants in `shared`, which renderers rely on to draw
//! the same board the server simulates.

use shared::{Difficulty, BASE_TICK_MS, BOARD_HEIGHT, BOARD_WIDTH, MAX_PARTICIPANTS};
use std::time::Duration;

/// Settings for one simulated session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub board_width: i32,
    pub board_height: i32,
    /// Number of actor slots, capped at `MAX_PARTICIPANTS`; participant ids run from 1 to this value.
    pub max_participants: usize,
    /// Tick delay at the lowest difficulty.
    pub base_tick: Duration,
    /// Upper bound on consumables present at once.
    pub max_consumables: usize,
    /// Spawn one extra consumable every this many ticks; 0 disables timed spawning.
    pub spawn_interval_ticks: u32,
    pub initial_difficulty: Difficulty,
    /// Fixed RNG seed, entropy when absent.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            board_width: BOARD_WIDTH,
            board_height: BOARD_HEIGHT,
            max_participants: MAX_PARTICIPANTS,
            base_tick: Duration::from_millis(BASE_TICK_MS),
            max_consumables: 3,
            spawn_interval_ticks: 40,
            initial_difficulty: Difficulty::Low,
            seed: None,
        }
    }
}

/// Settings for the network layer wrapped around a session.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Connections silent for longer than this are dropped.
    pub client_timeout: Duration,
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:12345".to_string(),
            client_timeout: Duration::from_secs(10),
            session: SessionConfig::default(),
        }
    }
}
