use shared::{in_bounds, is_obstacle, Actor, Cell, Difficulty};
use std::fmt;

///What an actor's head ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionKind {
    Boundary,
    Obstacle,
    OwnBody,
    ///Body of the actor with this id.
    Actor(u32),
}

impl fmt::Display for CollisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollisionKind::Boundary => write!(f, "the board edge"),
            CollisionKind::Obstacle => write!(f, "a wall"),
            CollisionKind::OwnBody => write!(f, "itself"),
            CollisionKind::Actor(id) => write!(f, "player {}", id),
        }
    }
}

///Returns true if the cell lies outside the board.
pub fn hits_boundary(cell: Cell, width: i32, height: i32) -> bool {
    !in_bounds(cell, width, height)
}

///Returns true if the cell is an obstacle at the given difficulty.
pub fn hits_obstacle(cell: Cell, width: i32, height: i32, difficulty: Difficulty) -> bool {
    difficulty.obstacles_active() && is_obstacle(cell.x, cell.y, width, height)
}

///Checks a just-moved actor against the board and the other actors.
///
///The order is fixed: boundary, obstacle, own body, then every other living
///actor in slot order. The first hit is returned.
pub fn detect_collision<'a>(
    actor: &Actor,
    others: impl IntoIterator<Item = &'a Actor>,
    width: i32,
    height: i32,
    difficulty: Difficulty,
) -> Option<CollisionKind> {
    let head = actor.head();

    if hits_boundary(head, width, height) {
        return Some(CollisionKind::Boundary);
    }

    if hits_obstacle(head, width, height, difficulty) {
        return Some(CollisionKind::Obstacle);
    }

    if actor.check_self_collision() {
        return Some(CollisionKind::OwnBody);
    }

    others
        .into_iter()
        .filter(|other| other.id != actor.id && other.alive)
        .find(|other| actor.check_collision_with(other))
        .map(|other| CollisionKind::Actor(other.id))
}
