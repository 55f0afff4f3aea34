use std::collections::{HashSet, VecDeque};

use crate::types::{Cell, Direction, Food};

/// Owns every entity of one life. Only the tick engine mutates it.
#[derive(Clone, Debug)]
pub struct EntityRegistry {
    snake: VecDeque<Cell>,
    direction: Direction,
    obstacles: HashSet<Cell>,
    food: Option<Food>,
    rare_pickup: Option<Cell>,
}

impl EntityRegistry {
    pub fn new(body: Vec<Cell>, direction: Direction, obstacles: HashSet<Cell>) -> Self {
        Self {
            snake: body.into(),
            direction,
            obstacles,
            food: None,
            rare_pickup: None,
        }
    }

    pub fn head(&self) -> Option<Cell> {
        self.snake.front().copied()
    }

    pub fn len(&self) -> usize {
        self.snake.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snake.is_empty()
    }

    pub fn body(&self) -> impl Iterator<Item = &Cell> {
        self.snake.iter()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn obstacles(&self) -> &HashSet<Cell> {
        &self.obstacles
    }

    pub fn food(&self) -> Option<Food> {
        self.food
    }

    pub fn set_food(&mut self, food: Option<Food>) {
        self.food = food;
    }

    pub fn rare_pickup(&self) -> Option<Cell> {
        self.rare_pickup
    }

    pub fn set_rare_pickup(&mut self, cell: Option<Cell>) {
        self.rare_pickup = cell;
    }

    /// Where the head would land; does not move anything.
    pub fn advance_head(&self, direction: Direction) -> Option<Cell> {
        self.head().map(|head| head.offset(direction))
    }

    pub fn commit_move(&mut self, new_head: Cell, grew: bool) {
        self.snake.push_front(new_head);
        if !grew {
            self.snake.pop_back();
        }
    }

    pub fn is_occupied_by_snake(&self, cell: Cell, include_head: bool) -> bool {
        let skip = usize::from(!include_head);
        self.snake.iter().skip(skip).any(|part| *part == cell)
    }

    /// Body hit test for a head moving into `cell`. The tail is vacated in the
    /// same step unless the snake grows, so it only counts when growing.
    pub fn hits_body(&self, cell: Cell, growing: bool) -> bool {
        let len = self.snake.len();
        let checked = if growing { len } else { len.saturating_sub(1) };
        self.snake.iter().take(checked).any(|part| *part == cell)
    }

    pub fn is_obstacle(&self, cell: Cell) -> bool {
        self.obstacles.contains(&cell)
    }

    /// Cells a new primary food may not use: snake, obstacles, rare pickup.
    pub fn blocked_for_food(&self) -> HashSet<Cell> {
        let mut blocked: HashSet<Cell> = self.snake.iter().copied().collect();
        blocked.extend(self.obstacles.iter().copied());
        blocked.extend(self.rare_pickup);
        blocked
    }

    /// Cells a rare pickup may not use: everything above plus the primary food.
    pub fn blocked_for_pickup(&self) -> HashSet<Cell> {
        let mut blocked: HashSet<Cell> = self.snake.iter().copied().collect();
        blocked.extend(self.obstacles.iter().copied());
        blocked.extend(self.food.map(|food| food.cell));
        blocked
    }

    pub fn snake_cells(&self) -> Vec<Cell> {
        self.snake.iter().copied().collect()
    }

    pub fn obstacle_cells(&self) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self.obstacles.iter().copied().collect();
        cells.sort_by_key(|cell| (cell.y, cell.x));
        cells
    }
}
