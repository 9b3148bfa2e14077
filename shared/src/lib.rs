pub mod board;
pub mod entity;

use serde::{Deserialize, Serialize};

pub use board::{
    actor_color, in_bounds, is_obstacle, obstacle_cells, start_position, BOARD_HEIGHT,
    BOARD_WIDTH,
};
pub use entity::{Actor, Cell, Consumable, Difficulty, Direction, FoodKind, INITIAL_LENGTH};

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_PARTICIPANTS: usize = 4;
pub const BASE_TICK_MS: u64 = 150;

/// Wire message exchanged between participants and the server.
///
/// The first group is sent by participants, the second by the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Join {
        client_version: u32,
    },
    Leave,
    Heartbeat,
    Move {
        direction: Direction,
    },
    SetDifficulty {
        difficulty: Difficulty,
    },
    StartGame,

    Accepted {
        participant_id: u32,
    },
    Rejected {
        reason: String,
    },
    Joined {
        participant_id: u32,
    },
    Left {
        participant_id: u32,
    },
    State {
        snapshot: Snapshot,
    },
    SessionEnded {
        snapshot: Snapshot,
    },
    ServerError {
        reason: String,
    },
}

impl Packet {
    /// True for the kinds a participant is allowed to send.
    pub fn is_client_packet(&self) -> bool {
        matches!(
            self,
            Packet::Join { .. }
                | Packet::Leave
                | Packet::Heartbeat
                | Packet::Move { .. }
                | Packet::SetDifficulty { .. }
                | Packet::StartGame
        )
    }
}

/// Independent copy of the session state at one tick.
///
/// Owns all of its data, so the server can keep mutating its own state the
/// moment a snapshot has been taken.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Snapshot {
    pub tick: u32,
    pub timestamp: u64,
    pub width: i32,
    pub height: i32,
    pub difficulty: Difficulty,
    pub running: bool,
    /// Indexed by participant id minus one; `None` for empty slots.
    pub actors: Vec<Option<Actor>>,
    pub consumables: Vec<Consumable>,
}

impl Snapshot {
    pub fn actor(&self, participant_id: u32) -> Option<&Actor> {
        let index = (participant_id as usize).checked_sub(1)?;
        self.actors.get(index)?.as_ref()
    }

    pub fn living_count(&self) -> usize {
        self.actors.iter().flatten().filter(|a| a.alive).count()
    }

    /// Occupied actor slots, dead or alive.
    pub fn participant_count(&self) -> usize {
        self.actors.iter().flatten().count()
    }

    /// Obstacle test honouring the snapshot's difficulty.
    pub fn is_obstacle_at(&self, cell: Cell) -> bool {
        self.difficulty.obstacles_active() && is_obstacle(cell.x, cell.y, self.width, self.height)
    }
}
