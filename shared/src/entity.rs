//! Board-level entities: cells, headings, difficulty tiers, consumables and actors.
//!
//! Everything in here is plain data plus the per-entity rules that do not need
//! to see the rest of the world. Whole-board decisions (boundaries, obstacles,
//! who eats what first) belong to the server's simulation step.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Number of cells a freshly spawned actor occupies.
pub const INITIAL_LENGTH: usize = 3;

/// A single board cell. Coordinates are signed so that a head which has just
/// left the board can still be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the neighbouring cell one step in `direction`.
    pub fn offset(self, direction: Direction) -> Cell {
        let (dx, dy) = direction.delta();
        Cell::new(self.x + dx, self.y + dy)
    }

    /// Manhattan distance between two cells.
    pub fn distance(self, other: Cell) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Heading of an actor. Screen coordinates: `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit vector of this heading.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            other => Err(format!("unknown direction '{}'", other)),
        }
    }
}

/// Difficulty tier of a session.
///
/// The tier fixes the tick speed multiplier and decides whether the obstacle
/// layout is consulted at all. The layout itself never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    #[default]
    Low,
    Medium,
    High,
}

impl Difficulty {
    pub fn speed_multiplier(self) -> f32 {
        match self {
            Difficulty::Low => 1.0,
            Difficulty::Medium => 1.25,
            Difficulty::High => 1.5,
        }
    }

    /// Obstacles are absent at the lowest tier only.
    pub fn obstacles_active(self) -> bool {
        self != Difficulty::Low
    }

    /// Delay between two ticks for a given base interval.
    pub fn tick_interval(self, base: Duration) -> Duration {
        base.div_f32(self.speed_multiplier())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" | "easy" => Ok(Difficulty::Low),
            "medium" => Ok(Difficulty::Medium),
            "high" | "hard" => Ok(Difficulty::High),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

/// Category of a consumable. Each category fixes its score and growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FoodKind {
    Small,
    Medium,
    Large,
}

impl FoodKind {
    pub fn points(self) -> u32 {
        match self {
            FoodKind::Small => 10,
            FoodKind::Medium => 20,
            FoodKind::Large => 30,
        }
    }

    /// Number of segments gained when eaten.
    pub fn growth(self) -> usize {
        match self {
            FoodKind::Small => 1,
            FoodKind::Medium => 2,
            FoodKind::Large => 3,
        }
    }

    /// Maps a roll in `0..100` onto the 60/30/10 category weights.
    pub fn from_roll(roll: u32) -> FoodKind {
        match roll {
            0..=59 => FoodKind::Small,
            60..=89 => FoodKind::Medium,
            _ => FoodKind::Large,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumable {
    pub position: Cell,
    pub kind: FoodKind,
}

impl Consumable {
    pub fn new(position: Cell, kind: FoodKind) -> Self {
        Self { position, kind }
    }

    pub fn points(&self) -> u32 {
        self.kind.points()
    }

    pub fn growth(&self) -> usize {
        self.kind.growth()
    }
}

/// A participant-controlled chain of cells.
///
/// `body[0]` is the head and the body is never empty: `advance` only prepends
/// and `remove_tail` refuses to drop the last cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: u32,
    pub body: Vec<Cell>,
    /// Heading used by the last move.
    pub direction: Direction,
    /// Heading requested by the participant, committed on the next move.
    pub next_direction: Direction,
    pub alive: bool,
    pub score: u32,
    pub color: String,
}

impl Actor {
    /// Creates an actor heading right with its tail trailing to the left of `head`.
    pub fn new(id: u32, head: Cell, color: impl Into<String>) -> Self {
        let body = (0..INITIAL_LENGTH as i32)
            .map(|i| Cell::new(head.x - i, head.y))
            .collect();

        Self {
            id,
            body,
            direction: Direction::Right,
            next_direction: Direction::Right,
            alive: true,
            score: 0,
            color: color.into(),
        }
    }

    pub fn head(&self) -> Cell {
        self.body[0]
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Records a requested heading. Reversal is only rejected when the move is applied.
    pub fn set_direction(&mut self, direction: Direction) {
        self.next_direction = direction;
    }

    /// Commits the requested heading unless it reverses the current one, then
    /// prepends the new head. The tail is left for the caller to trim.
    pub fn advance(&mut self) {
        if self.next_direction != self.direction.opposite() {
            self.direction = self.next_direction;
        }

        let new_head = self.head().offset(self.direction);
        self.body.insert(0, new_head);
    }

    /// Credits a consumable. The first segment of growth comes from the tail not
    /// being removed this tick, the rest are stacked on the last cell.
    pub fn grow(&mut self, consumable: &Consumable) {
        self.score += consumable.points();

        let tail = self.body[self.body.len() - 1];
        for _ in 1..consumable.growth() {
            self.body.push(tail);
        }
    }

    pub fn remove_tail(&mut self) {
        if self.body.len() > 1 {
            self.body.pop();
        }
    }

    pub fn check_self_collision(&self) -> bool {
        let head = self.head();
        self.body[1..].iter().any(|segment| *segment == head)
    }

    /// True if this actor's head sits on any cell of `other`.
    pub fn check_collision_with(&self, other: &Actor) -> bool {
        other.occupies(self.head())
    }

    pub fn occupies(&self, cell: Cell) -> bool {
        self.body.contains(&cell)
    }
}
