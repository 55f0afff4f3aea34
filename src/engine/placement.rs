use std::collections::HashSet;

use crate::arena::Arena;
use crate::constants::PLACEMENT_ATTEMPTS;
use crate::error::GameError;
use crate::rng::Rng;
use crate::types::{Cell, Direction};

/// Picks a uniformly random in-bounds cell outside `occupied`.
///
/// Sampling is bounded; once the attempts run out the remaining free cells are
/// enumerated so a nearly full arena still resolves. A full arena is reported as
/// `NoFreeSpace` up front.
pub fn find_free_cell(
    arena: &Arena,
    occupied: &HashSet<Cell>,
    rng: &mut Rng,
) -> Result<Cell, GameError> {
    let available = arena.total_cells();
    let taken = occupied
        .iter()
        .filter(|cell| arena.is_in_bounds(**cell))
        .count();
    if taken >= available {
        return Err(GameError::NoFreeSpace {
            occupied: taken,
            available,
        });
    }

    for _ in 0..PLACEMENT_ATTEMPTS {
        let cell = Cell::new(
            rng.int(arena.min_x(), arena.max_x()),
            rng.int(arena.min_y(), arena.max_y()),
        );
        if !occupied.contains(&cell) {
            return Ok(cell);
        }
    }

    let free: Vec<Cell> = arena
        .cells()
        .filter(|cell| !occupied.contains(cell))
        .collect();
    if free.is_empty() {
        return Err(GameError::NoFreeSpace {
            occupied: taken,
            available,
        });
    }
    Ok(free[rng.pick_index(free.len())])
}

/// Places a straight snake of `length` cells with a random heading. The body
/// trails behind the head so the first step never folds back onto it.
pub fn place_snake(
    arena: &Arena,
    length: usize,
    rng: &mut Rng,
) -> Result<(Vec<Cell>, Direction), GameError> {
    let length = length.max(1);

    for _ in 0..PLACEMENT_ATTEMPTS {
        let direction = Direction::ALL[rng.pick_index(Direction::ALL.len())];
        let head = Cell::new(
            rng.int(arena.min_x(), arena.max_x()),
            rng.int(arena.min_y(), arena.max_y()),
        );
        if let Some(body) = body_chain(arena, head, direction, length) {
            return Ok((body, direction));
        }
    }

    for head in arena.cells() {
        for direction in Direction::ALL {
            if let Some(body) = body_chain(arena, head, direction, length) {
                return Ok((body, direction));
            }
        }
    }

    Err(GameError::NoFreeSpace {
        occupied: length,
        available: arena.total_cells(),
    })
}

/// Places up to `count` obstacles outside `occupied`, adding each one to it.
pub fn place_obstacles(
    arena: &Arena,
    count: usize,
    occupied: &mut HashSet<Cell>,
    rng: &mut Rng,
) -> Result<HashSet<Cell>, GameError> {
    let mut obstacles = HashSet::with_capacity(count);
    for _ in 0..count {
        let cell = find_free_cell(arena, occupied, rng)?;
        occupied.insert(cell);
        obstacles.insert(cell);
    }
    Ok(obstacles)
}

fn body_chain(arena: &Arena, head: Cell, direction: Direction, length: usize) -> Option<Vec<Cell>> {
    let back = direction.opposite();
    let mut body = Vec::with_capacity(length);
    let mut cursor = head;
    for _ in 0..length {
        if !arena.is_in_bounds(cursor) {
            return None;
        }
        body.push(cursor);
        cursor = cursor.offset(back);
    }
    Some(body)
}
