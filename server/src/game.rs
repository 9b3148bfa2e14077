use crate::collision::{detect_collision, CollisionKind};
use crate::config::SessionConfig;
use crate::utils::get_timestamp;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    actor_color, in_bounds, is_obstacle, start_position, Actor, Cell, Consumable, Difficulty,
    Direction, FoodKind, Snapshot, MAX_PARTICIPANTS,
};

/// What happened during one call to [`GameState::step`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StepReport {
    pub deaths: Vec<(u32, CollisionKind)>,
    pub consumed: Vec<(u32, Consumable)>,
    pub spawned: Vec<Consumable>,
    /// The session stopped running on this step.
    pub ended: bool,
}

/// Authoritative state of one session.
///
/// Only the session controller owns a `GameState`; everything that leaves it
/// goes through [`GameState::snapshot`].
#[derive(Debug, Clone)]
pub struct GameState {
    pub tick: u32,
    pub width: i32,
    pub height: i32,
    pub difficulty: Difficulty,
    /// Slot `n` holds participant `n + 1`, `None` once they left or before a game.
    pub actors: Vec<Option<Actor>>,
    pub consumables: Vec<Consumable>,
    pub running: bool,
    pub last_update: u64,
    max_consumables: usize,
    spawn_interval_ticks: u32,
    rng: StdRng,
}

impl GameState {
    pub fn new(config: &SessionConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            tick: 0,
            width: config.board_width,
            height: config.board_height,
            difficulty: config.initial_difficulty,
            actors: vec![None; config.max_participants.clamp(1, MAX_PARTICIPANTS)],
            consumables: Vec::new(),
            running: false,
            last_update: get_timestamp(),
            max_consumables: config.max_consumables.max(1),
            spawn_interval_ticks: config.spawn_interval_ticks,
            rng,
        }
    }

    pub fn actor(&self, participant_id: u32) -> Option<&Actor> {
        let index = (participant_id as usize).checked_sub(1)?;
        self.actors.get(index)?.as_ref()
    }

    fn actor_mut(&mut self, participant_id: u32) -> Option<&mut Actor> {
        let index = (participant_id as usize).checked_sub(1)?;
        self.actors.get_mut(index)?.as_mut()
    }

    /// Number of occupied actor slots, dead or alive.
    pub fn participant_count(&self) -> usize {
        self.actors.iter().flatten().count()
    }

    pub fn living_count(&self) -> usize {
        self.actors.iter().flatten().filter(|a| a.alive).count()
    }

    /// Queues a heading for the next move. Returns false for unknown or dead participants.
    pub fn apply_direction(&mut self, participant_id: u32, direction: Direction) -> bool {
        match self.actor_mut(participant_id) {
            Some(actor) if actor.alive => {
                actor.set_direction(direction);
                true
            }
            _ => false,
        }
    }

    /// Changes difficulty without moving or killing anyone.
    ///
    /// Consumables left on walls that just became active are dropped and
    /// replaced elsewhere.
    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        if self.difficulty != difficulty {
            info!("Difficulty set to {:?}", difficulty);
        }
        let walls_appeared = !self.difficulty.obstacles_active() && difficulty.obstacles_active();
        self.difficulty = difficulty;

        if walls_appeared {
            let (width, height) = (self.width, self.height);
            let before = self.consumables.len();
            self.consumables
                .retain(|c| !is_obstacle(c.position.x, c.position.y, width, height));
            let dropped = before - self.consumables.len();

            for _ in 0..dropped {
                self.spawn_consumable();
            }
            if dropped > 0 {
                debug!("Moved {} consumable(s) off the walls", dropped);
            }
        }
    }

    /// Resets the board for a new game with one actor per listed participant.
    pub fn start_game(&mut self, participant_ids: &[u32]) {
        let slots = self.actors.len();
        self.actors = vec![None; slots];

        for &id in participant_ids {
            let index = match (id as usize).checked_sub(1) {
                Some(index) if index < slots => index,
                _ => {
                    warn!("Ignoring participant {} outside of {} slots", id, slots);
                    continue;
                }
            };

            let head = start_position(index, self.width, self.height);
            self.actors[index] = Some(Actor::new(id, head, actor_color(index)));
        }

        self.tick = 0;
        self.consumables.clear();
        self.spawn_consumable();
        self.running = true;
        self.last_update = get_timestamp();

        info!(
            "Game started with {} players on {:?}",
            self.participant_count(),
            self.difficulty
        );
    }

    /// Empties a participant's slot. The id is not handed to anyone else mid-game.
    pub fn remove_participant(&mut self, participant_id: u32) -> bool {
        let removed = (participant_id as usize)
            .checked_sub(1)
            .and_then(|index| self.actors.get_mut(index))
            .and_then(Option::take)
            .is_some();

        if removed {
            info!("Removed player {}", participant_id);
        }
        removed
    }

    /// True if a consumable may be placed on `cell`.
    pub fn is_free(&self, cell: Cell) -> bool {
        in_bounds(cell, self.width, self.height)
            && !(self.difficulty.obstacles_active()
                && is_obstacle(cell.x, cell.y, self.width, self.height))
            && !self.actors.iter().flatten().any(|a| a.occupies(cell))
            && !self.consumables.iter().any(|c| c.position == cell)
    }

    /// Places a consumable at a known cell, refusing cells that are not free.
    pub fn place_consumable(&mut self, consumable: Consumable) -> bool {
        if !self.is_free(consumable.position) {
            return false;
        }
        self.consumables.push(consumable);
        true
    }

    /// Drops a consumable on a random free cell with a weighted random category.
    ///
    /// Returns `None` when the board has no free cell left.
    pub fn spawn_consumable(&mut self) -> Option<Consumable> {
        let max_attempts = (self.width * self.height).max(1) as usize * 4;
        let mut position = None;

        for _ in 0..max_attempts {
            let candidate = Cell::new(
                self.rng.gen_range(0..self.width),
                self.rng.gen_range(0..self.height),
            );
            if self.is_free(candidate) {
                position = Some(candidate);
                break;
            }
        }

        // Rejection sampling starves on a crowded board, pick from what is left
        if position.is_none() {
            let free: Vec<Cell> = (0..self.height)
                .flat_map(|y| (0..self.width).map(move |x| Cell::new(x, y)))
                .filter(|cell| self.is_free(*cell))
                .collect();
            if !free.is_empty() {
                position = Some(free[self.rng.gen_range(0..free.len())]);
            }
        }

        let Some(position) = position else {
            debug!("No free cell for a consumable");
            return None;
        };

        let kind = FoodKind::from_roll(self.rng.gen_range(0..100));
        let consumable = Consumable::new(position, kind);
        self.consumables.push(consumable);
        Some(consumable)
    }

    /// Advances the session by one tick. Does nothing while not running.
    pub fn step(&mut self) -> StepReport {
        let mut report = StepReport::default();
        if !self.running {
            return report;
        }

        self.tick += 1;

        for index in 0..self.actors.len() {
            let Some(mut actor) = self.actors[index].take() else {
                continue;
            };

            if actor.alive {
                self.step_actor(&mut actor, &mut report);
            }
            self.actors[index] = Some(actor);
        }

        for _ in 0..report.consumed.len() {
            if self.consumables.len() >= self.max_consumables {
                break;
            }
            if let Some(consumable) = self.spawn_consumable() {
                report.spawned.push(consumable);
            }
        }

        if self.spawn_interval_ticks > 0
            && self.tick % self.spawn_interval_ticks == 0
            && self.consumables.len() < self.max_consumables
        {
            if let Some(consumable) = self.spawn_consumable() {
                report.spawned.push(consumable);
            }
        }

        let alive = self.living_count();
        if alive == 0 || (alive == 1 && self.participant_count() > 1) {
            self.running = false;
            report.ended = true;
            info!(
                "Game over after {} ticks, {} player(s) left standing",
                self.tick, alive
            );
        }

        self.last_update = get_timestamp();
        report
    }

    /// Moves one living actor and resolves its collision or meal.
    /// `actor` is out of its slot while this runs.
    fn step_actor(&mut self, actor: &mut Actor, report: &mut StepReport) {
        actor.advance();

        let others = self.actors.iter().flatten();
        if let Some(kind) = detect_collision(actor, others, self.width, self.height, self.difficulty)
        {
            actor.alive = false;
            info!(
                "Player {} crashed into {} at {}",
                actor.id,
                kind,
                actor.head()
            );
            report.deaths.push((actor.id, kind));
            return;
        }

        let head = actor.head();
        match self.consumables.iter().position(|c| c.position == head) {
            Some(position) => {
                let consumable = self.consumables.remove(position);
                actor.grow(&consumable);
                debug!(
                    "Player {} ate {:?} food, score {}",
                    actor.id, consumable.kind, actor.score
                );
                report.consumed.push((actor.id, consumable));
            }
            None => actor.remove_tail(),
        }
    }

    /// Deep copy of the current state for publication.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.tick,
            timestamp: self.last_update,
            width: self.width,
            height: self.height,
            difficulty: self.difficulty,
            running: self.running,
            actors: self.actors.clone(),
            consumables: self.consumables.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{BOARD_HEIGHT, BOARD_WIDTH};

    fn test_config() -> SessionConfig {
        SessionConfig {
            spawn_interval_ticks: 0,
            seed: Some(7),
            ..SessionConfig::default()
        }
    }

    fn started(ids: &[u32], difficulty: Difficulty) -> GameState {
        let mut state = GameState::new(&test_config());
        state.set_difficulty(difficulty);
        state.start_game(ids);
        state.consumables.clear();
        state
    }

    fn assert_consumable_invariants(state: &GameState) {
        for (i, consumable) in state.consumables.iter().enumerate() {
            let cell = consumable.position;
            assert!(in_bounds(cell, state.width, state.height));
            assert!(!state.actors.iter().flatten().any(|a| a.occupies(cell)));
            if state.difficulty.obstacles_active() {
                assert!(!is_obstacle(cell.x, cell.y, state.width, state.height));
            }
            assert!(!state.consumables[i + 1..]
                .iter()
                .any(|other| other.position == cell));
        }
    }

    #[test]
    fn test_start_game_places_actors() {
        let mut state = GameState::new(&test_config());
        state.start_game(&[1, 2]);

        assert!(state.running);
        assert_eq!(state.tick, 0);
        assert_eq!(state.participant_count(), 2);
        assert_eq!(state.actor(1).map(|a| a.head()), Some(Cell::new(10, 8)));
        assert_eq!(
            state.actor(2).map(|a| a.head()),
            Some(Cell::new(BOARD_WIDTH - 8, 8))
        );
        assert!(state.actor(3).is_none());
        assert_eq!(state.consumables.len(), 1);
        assert_consumable_invariants(&state);
    }

    #[test]
    fn test_start_game_ignores_out_of_range_ids() {
        let mut state = GameState::new(&test_config());
        state.start_game(&[0, 1, 9]);
        assert_eq!(state.participant_count(), 1);
    }

    #[test]
    fn test_eating_small_food_scenario() {
        let mut state = started(&[1], Difficulty::Medium);
        assert!(state.place_consumable(Consumable::new(Cell::new(13, 8), FoodKind::Small)));

        for _ in 0..3 {
            state.step();
        }

        let actor = state.actor(1).unwrap();
        assert_eq!(actor.head(), Cell::new(13, 8));
        assert_eq!(actor.score, 10);
        assert_eq!(actor.len(), 4);
        assert!(state.running);

        let snapshot = state.snapshot();
        assert!(!snapshot
            .consumables
            .iter()
            .any(|c| c.position == Cell::new(13, 8)));
    }

    #[test]
    fn test_large_food_grows_three() {
        let mut state = started(&[1], Difficulty::Low);
        state.place_consumable(Consumable::new(Cell::new(11, 8), FoodKind::Large));

        let report = state.step();
        assert_eq!(report.consumed.len(), 1);
        assert_eq!(state.actor(1).unwrap().len(), 6);

        // the stacked tail cells unwind one per tick
        state.consumables.clear();
        state.step();
        state.step();
        let actor = state.actor(1).unwrap();
        assert_eq!(actor.len(), 6);
        assert_eq!(actor.body[4], Cell::new(9, 8));
        assert_eq!(actor.body[5], Cell::new(8, 8));
        assert_eq!(actor.score, 30);
    }

    #[test]
    fn test_reverse_request_ignored() {
        let mut state = started(&[1], Difficulty::Low);
        assert!(state.apply_direction(1, Direction::Left));
        state.step();

        let actor = state.actor(1).unwrap();
        assert_eq!(actor.direction, Direction::Right);
        assert_eq!(actor.head(), Cell::new(11, 8));
    }

    #[test]
    fn test_boundary_death_freezes_body() {
        let mut state = started(&[1, 2, 3], Difficulty::Low);
        state.actors[0] = Some(Actor::new(1, Cell::new(BOARD_WIDTH - 1, 5), "red"));

        let report = state.step();
        assert_eq!(report.deaths, vec![(1, CollisionKind::Boundary)]);
        assert!(state.running);

        let frozen = state.actor(1).unwrap().clone();
        assert!(!frozen.alive);
        assert_eq!(frozen.head(), Cell::new(BOARD_WIDTH, 5));

        state.step();
        state.step();
        assert_eq!(state.actor(1), Some(&frozen));
    }

    #[test]
    fn test_dead_actor_ignores_input() {
        let mut state = started(&[1, 2, 3], Difficulty::Low);
        state.actor_mut(1).unwrap().alive = false;
        assert!(!state.apply_direction(1, Direction::Up));
        assert!(!state.apply_direction(4, Direction::Up));
        assert!(!state.apply_direction(0, Direction::Up));
    }

    #[test]
    fn test_obstacle_death_on_medium_only() {
        let mut low = started(&[1], Difficulty::Low);
        low.actors[0] = Some(Actor::new(1, Cell::new(18, 15), "red"));
        low.step();
        assert!(low.actor(1).unwrap().alive);

        let mut medium = started(&[1], Difficulty::Medium);
        medium.actors[0] = Some(Actor::new(1, Cell::new(18, 15), "red"));
        let report = medium.step();
        assert_eq!(report.deaths, vec![(1, CollisionKind::Obstacle)]);
    }

    #[test]
    fn test_food_consumed_once() {
        let mut state = started(&[1, 2], Difficulty::Low);
        state.actors[1] = Some(Actor::new(2, Cell::new(11, 9), "blue"));
        state.apply_direction(2, Direction::Up);
        state.place_consumable(Consumable::new(Cell::new(11, 8), FoodKind::Medium));

        let report = state.step();

        assert_eq!(report.consumed.len(), 1);
        assert_eq!(report.consumed[0].0, 1);
        assert_eq!(state.actor(1).unwrap().score, 20);
        assert_eq!(state.actor(2).unwrap().score, 0);
        assert_eq!(report.deaths, vec![(2, CollisionKind::Actor(1))]);
    }

    #[test]
    fn test_last_survivor_ends_multiplayer_game() {
        let mut state = started(&[1, 2], Difficulty::Low);
        state.actors[1] = Some(Actor::new(2, Cell::new(BOARD_WIDTH - 1, 20), "blue"));

        let report = state.step();
        assert!(report.ended);
        assert!(!state.running);
        assert!(state.actor(1).unwrap().alive);

        // no further movement once stopped
        let before = state.snapshot();
        assert_eq!(state.step(), StepReport::default());
        assert_eq!(state.snapshot().actors, before.actors);
    }

    #[test]
    fn test_solo_game_runs_until_death() {
        let mut state = started(&[1], Difficulty::Low);
        for _ in 0..5 {
            state.step();
        }
        assert!(state.running);

        state.actors[0] = Some(Actor {
            body: vec![Cell::new(0, 0)],
            ..Actor::new(1, Cell::new(0, 0), "red")
        });
        state.apply_direction(1, Direction::Up);
        let report = state.step();
        assert!(report.ended);
        assert!(!state.running);
        assert_eq!(state.living_count(), 0);
    }

    #[test]
    fn test_zero_alive_ends_any_game() {
        for count in 1..=4u32 {
            let ids: Vec<u32> = (1..=count).collect();
            let mut state = started(&ids, Difficulty::Low);
            for actor in state.actors.iter_mut().flatten() {
                actor.alive = false;
            }
            assert!(state.step().ended, "{} players", count);
        }
    }

    #[test]
    fn test_empty_session_ends() {
        let mut state = started(&[1, 2], Difficulty::Low);
        assert!(state.remove_participant(1));
        assert!(state.remove_participant(2));
        assert!(!state.remove_participant(2));
        assert!(state.step().ended);
    }

    #[test]
    fn test_removed_slot_stays_empty() {
        let mut state = started(&[1, 2, 3], Difficulty::Low);
        state.remove_participant(2);
        state.step();
        assert!(state.actor(2).is_none());
        assert!(!state.apply_direction(2, Direction::Down));
        assert_eq!(state.participant_count(), 2);
    }

    #[test]
    fn test_spawn_avoids_occupied_cells() {
        let mut state = started(&[1, 2, 3, 4], Difficulty::High);
        for _ in 0..300 {
            assert!(state.spawn_consumable().is_some());
        }
        assert_eq!(state.consumables.len(), 300);
        assert_consumable_invariants(&state);
    }

    #[test]
    fn test_spawn_on_full_board() {
        let config = SessionConfig {
            board_width: 2,
            board_height: 1,
            ..test_config()
        };
        let mut state = GameState::new(&config);
        assert!(state.spawn_consumable().is_some());
        assert!(state.spawn_consumable().is_some());
        assert!(state.spawn_consumable().is_none());
        assert_eq!(state.consumables.len(), 2);
    }

    #[test]
    fn test_place_consumable_rejects_taken_cells() {
        let mut state = started(&[1], Difficulty::Medium);
        assert!(!state.place_consumable(Consumable::new(Cell::new(9, 8), FoodKind::Small)));
        assert!(!state.place_consumable(Consumable::new(
            Cell::new(BOARD_WIDTH / 2, BOARD_HEIGHT / 2),
            FoodKind::Small
        )));
        assert!(!state.place_consumable(Consumable::new(Cell::new(-1, 0), FoodKind::Small)));
        assert!(state.place_consumable(Consumable::new(Cell::new(1, 1), FoodKind::Small)));
        assert!(!state.place_consumable(Consumable::new(Cell::new(1, 1), FoodKind::Large)));
    }

    #[test]
    fn test_raising_difficulty_clears_food_off_walls() {
        let mut state = started(&[1], Difficulty::Low);
        let center = Cell::new(BOARD_WIDTH / 2, BOARD_HEIGHT / 2);
        assert!(state.place_consumable(Consumable::new(center, FoodKind::Small)));
        assert!(state.place_consumable(Consumable::new(Cell::new(1, 1), FoodKind::Medium)));

        state.set_difficulty(Difficulty::Medium);

        assert_eq!(state.consumables.len(), 2);
        assert!(!state.consumables.iter().any(|c| c.position == center));
        assert!(state.consumables.iter().any(|c| c.position == Cell::new(1, 1)));
        assert_consumable_invariants(&state);

        state.step();
        assert_consumable_invariants(&state);
    }

    #[test]
    fn test_raising_difficulty_spares_actor_on_wall() {
        let mut state = started(&[1], Difficulty::Low);
        let wall = Cell::new(BOARD_WIDTH / 2, 3);
        state.actors[0] = Some(Actor {
            body: vec![wall],
            ..Actor::new(1, wall, "red")
        });

        state.set_difficulty(Difficulty::High);

        let actor = state.actor(1).unwrap();
        assert!(actor.alive);
        assert_eq!(actor.head(), wall);
        assert!(state.running);
    }

    #[test]
    fn test_slot_count_is_capped() {
        let state = GameState::new(&SessionConfig {
            max_participants: 9,
            ..test_config()
        });
        assert_eq!(state.actors.len(), MAX_PARTICIPANTS);
    }

    #[test]
    fn test_timed_spawning_respects_cap() {
        let config = SessionConfig {
            spawn_interval_ticks: 1,
            max_consumables: 3,
            ..test_config()
        };
        let mut state = GameState::new(&config);
        state.start_game(&[1]);

        for _ in 0..10 {
            state.step();
            assert!(state.consumables.len() <= 3);
            assert!(!state.consumables.is_empty());
            assert_consumable_invariants(&state);
        }
    }

    #[test]
    fn test_living_actors_stay_on_board() {
        let mut state = started(&[1, 2, 3, 4], Difficulty::High);
        let mut rng = StdRng::seed_from_u64(99);

        for _ in 0..200 {
            for id in 1..=4 {
                let direction = Direction::ALL[rng.gen_range(0..4)];
                state.apply_direction(id, direction);
            }
            if state.consumables.is_empty() {
                state.spawn_consumable();
            }

            state.step();

            for actor in state.actors.iter().flatten().filter(|a| a.alive) {
                assert!(!actor.is_empty());
                for cell in &actor.body {
                    assert!(in_bounds(*cell, state.width, state.height));
                }
            }
            assert_consumable_invariants(&state);

            if !state.running {
                break;
            }
        }
    }

    #[test]
    fn test_snapshot_is_independent() {
        let state = started(&[1, 2], Difficulty::Medium);
        let first = state.snapshot();
        let mut second = state.snapshot();
        assert_eq!(first, second);

        second.actors[0].as_mut().unwrap().body.clear();
        second.consumables.push(Consumable::new(Cell::new(0, 0), FoodKind::Large));

        assert_ne!(first, second);
        assert_eq!(state.actor(1).unwrap().len(), 3);
        assert_eq!(state.snapshot(), first);
    }
}
