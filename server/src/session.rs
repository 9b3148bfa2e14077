//! Session controller: the single owner of the authoritative game state
//!
//! Input handlers and the tick driver race for the same world. All of them go
//! through the controller, which keeps the state behind one mutex so that
//! exactly one writer runs at a time. A tick holds the lock for the whole
//! step plus snapshot, so input that lands mid-tick shows up on the next one,
//! never half-applied.

use crate::config::SessionConfig;
use crate::game::{GameState, StepReport};
use log::{debug, info, warn};
use shared::{Difficulty, Direction, Snapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::sleep;

/// Events handed from the tick driver to whoever broadcasts them
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Published after every tick while the game is running
    StateSnapshot(Snapshot),
    /// Published once when a game stops, carrying the final state
    SessionEnded(Snapshot),
}

/// Result of driving a single tick
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub report: StepReport,
    pub snapshot: Snapshot,
}

/// Cloneable handle to one session
///
/// Every clone refers to the same state, so one handle can live in the tick
/// driver while others are used by the network tasks.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<GameState>>,
    base_tick: Duration,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl SessionController {
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_state(GameState::new(config), config.base_tick)
    }

    /// Wraps an already prepared state, mostly useful for scripted scenarios
    pub fn with_state(state: GameState, base_tick: Duration) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            state: Arc::new(Mutex::new(state)),
            base_tick,
            shutdown_tx: Arc::new(shutdown_tx),
        }
    }

    /// Requests a new heading for a participant
    ///
    /// Ignored for empty slots and dead actors.
    pub async fn apply_direction(&self, participant_id: u32, direction: Direction) {
        let mut state = self.state.lock().await;
        if !state.apply_direction(participant_id, direction) {
            debug!(
                "Dropped {:?} from player {} without a living actor",
                direction, participant_id
            );
        }
    }

    /// Changes difficulty; speed and obstacles follow from the next tick
    pub async fn set_difficulty(&self, difficulty: Difficulty) {
        self.state.lock().await.set_difficulty(difficulty);
    }

    /// Starts a fresh game for the given participants
    ///
    /// A game already in progress is replaced. The lock guarantees the reset
    /// lands between two ticks.
    pub async fn start_game(&self, participant_ids: &[u32]) {
        let mut state = self.state.lock().await;
        if state.running {
            warn!("Restarting a game that is still running");
        }
        state.start_game(participant_ids);
    }

    /// Empties a participant's actor slot right away
    pub async fn remove_participant(&self, participant_id: u32) {
        self.state.lock().await.remove_participant(participant_id);
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.running
    }

    /// Delay before the next tick at the current difficulty
    pub async fn tick_interval(&self) -> Duration {
        let difficulty = self.state.lock().await.difficulty;
        difficulty.tick_interval(self.base_tick)
    }

    /// Runs one simulation step and snapshots the result
    ///
    /// Returns `None` without touching the state while no game is running.
    pub async fn tick(&self) -> Option<TickOutcome> {
        let mut state = self.state.lock().await;
        if !state.running {
            return None;
        }

        let report = state.step();
        let snapshot = state.snapshot();

        if state.tick % 60 == 0 {
            debug!(
                "Tick {}: {} of {} players alive, {} food on board",
                state.tick,
                state.living_count(),
                state.participant_count(),
                state.consumables.len()
            );
        }

        Some(TickOutcome { report, snapshot })
    }

    /// Stops the tick driver at its next sleep
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Tick driver loop
    ///
    /// Steps, snapshots and publishes while a game is running, then sleeps for
    /// the difficulty-scaled interval. While no game runs it keeps idling so a
    /// new game starts ticking immediately. Returns after `shutdown` or once the
    /// event receiver is gone.
    pub async fn run(&self, events: mpsc::UnboundedSender<SessionEvent>) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        info!("Tick driver started");

        loop {
            if *shutdown_rx.borrow_and_update() {
                break;
            }

            if let Some(outcome) = self.tick().await {
                let ended = outcome.report.ended;
                let published = events
                    .send(SessionEvent::StateSnapshot(outcome.snapshot.clone()))
                    .and_then(|_| {
                        if ended {
                            events.send(SessionEvent::SessionEnded(outcome.snapshot))
                        } else {
                            Ok(())
                        }
                    });

                if published.is_err() {
                    warn!("Session event receiver dropped, stopping tick driver");
                    break;
                }
            }

            let delay = self.tick_interval().await;
            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown_rx.changed() => {}
            }
        }

        info!("Tick driver stopped");
    }
}
