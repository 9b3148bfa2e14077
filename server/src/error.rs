//! Error types for the server library.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

/// Failures of the transport around the simulation.
///
/// The simulation itself never fails: stale ids and invalid input are no-ops.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode or decode packet: {0}")]
    Codec(#[from] bincode::Error),
}
