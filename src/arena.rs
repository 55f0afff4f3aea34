use crate::types::{ArenaView, Cell};

/// Bounded grid with a symmetric inset that grows as the score climbs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Arena {
    width: i32,
    height: i32,
    shrink_level: i32,
}

impl Arena {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            shrink_level: 0,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn shrink_level(&self) -> i32 {
        self.shrink_level
    }

    /// Deepest inset that still leaves at least one row and column.
    pub fn max_shrink_level(&self) -> i32 {
        (self.width.min(self.height) - 1) / 2
    }

    /// Sets the inset, clamped to `[0, max_shrink_level]`. Returns the applied level.
    pub fn apply_shrink(&mut self, level: i32) -> i32 {
        self.shrink_level = level.clamp(0, self.max_shrink_level());
        self.shrink_level
    }

    pub fn min_x(&self) -> i32 {
        self.shrink_level
    }

    pub fn max_x(&self) -> i32 {
        self.width - self.shrink_level - 1
    }

    pub fn min_y(&self) -> i32 {
        self.shrink_level
    }

    pub fn max_y(&self) -> i32 {
        self.height - self.shrink_level - 1
    }

    pub fn is_in_bounds(&self, cell: Cell) -> bool {
        cell.x >= self.min_x()
            && cell.x <= self.max_x()
            && cell.y >= self.min_y()
            && cell.y <= self.max_y()
    }

    pub fn total_cells(&self) -> usize {
        let cols = (self.max_x() - self.min_x() + 1).max(0) as usize;
        let rows = (self.max_y() - self.min_y() + 1).max(0) as usize;
        cols * rows
    }

    /// Row-major walk of the play region.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (self.min_y()..=self.max_y())
            .flat_map(move |y| (self.min_x()..=self.max_x()).map(move |x| Cell::new(x, y)))
    }

    pub fn view(&self) -> ArenaView {
        ArenaView {
            width: self.width,
            height: self.height,
            shrink_level: self.shrink_level,
        }
    }
}
