//! Board geometry shared by the simulation and every renderer.
//!
//! Obstacles are never transmitted. Both sides recompute them from the board
//! size, so the layout here must be the only definition in the workspace.

use crate::entity::Cell;

pub const BOARD_WIDTH: i32 = 40;
pub const BOARD_HEIGHT: i32 = 30;

/// Depth of the walls hanging off the top and bottom borders.
const VERTICAL_WALL_DEPTH: i32 = 9;
/// Depth of the walls hanging off the left and right borders.
const HORIZONTAL_WALL_DEPTH: i32 = 11;

/// Returns true if `(x, y)` is part of the obstacle layout.
///
/// The layout is four border-attached walls plus a 3×3 block in the middle.
/// Whether obstacles are active at all is decided by the difficulty, not here.
pub fn is_obstacle(x: i32, y: i32, width: i32, height: i32) -> bool {
    let mid_x = width / 2;
    let mid_y = height / 2;

    let top_wall = x == mid_x && (0..VERTICAL_WALL_DEPTH).contains(&y);
    let bottom_wall = x == mid_x && (height - VERTICAL_WALL_DEPTH..height).contains(&y);
    let left_wall = y == mid_y && (0..HORIZONTAL_WALL_DEPTH).contains(&x);
    let right_wall = y == mid_y && (width - HORIZONTAL_WALL_DEPTH..width).contains(&x);
    let center_block = (mid_x - 1..=mid_x + 1).contains(&x) && (mid_y - 1..=mid_y + 1).contains(&y);

    top_wall || bottom_wall || left_wall || right_wall || center_block
}

pub fn in_bounds(cell: Cell, width: i32, height: i32) -> bool {
    (0..width).contains(&cell.x) && (0..height).contains(&cell.y)
}

/// Every obstacle cell of a board, row by row.
pub fn obstacle_cells(width: i32, height: i32) -> Vec<Cell> {
    (0..height)
        .flat_map(|y| (0..width).map(move |x| Cell::new(x, y)))
        .filter(|cell| is_obstacle(cell.x, cell.y, width, height))
        .collect()
}

/// Head cell for the participant in slot `index`.
///
/// The four corners leave room for the initial tail on the left and keep every
/// spawn clear of the obstacle layout.
pub fn start_position(index: usize, width: i32, height: i32) -> Cell {
    match index {
        0 => Cell::new(10, 8),
        1 => Cell::new(width - 8, 8),
        2 => Cell::new(10, height - 8),
        3 => Cell::new(width - 8, height - 8),
        _ => Cell::new(width / 2, height / 2),
    }
}

/// Visual tag for the participant in slot `index`.
pub fn actor_color(index: usize) -> &'static str {
    const COLORS: [&str; 4] = ["red", "blue", "green", "yellow"];
    COLORS[index % COLORS.len()]
}
