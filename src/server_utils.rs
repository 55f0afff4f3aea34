use crate::config::GameOptions;
use crate::constants::{GRID_CELL_PX, MAX_ARENA_SIDE, MIN_ARENA_SIDE};

/// Grid cells that fit in `px` pixels, clamped to the valid arena range.
pub fn cells_for_viewport(px: i64) -> i32 {
    let cells = px.max(0) / i64::from(GRID_CELL_PX);
    cells.clamp(i64::from(MIN_ARENA_SIDE), i64::from(MAX_ARENA_SIDE)) as i32
}

pub fn normalize_side(value: i64) -> i32 {
    value.clamp(i64::from(MIN_ARENA_SIDE), i64::from(MAX_ARENA_SIDE)) as i32
}

/// Board size for a new life. Explicit cell counts win over a pixel viewport;
/// missing axes keep the configured size.
pub fn resolve_arena_options(
    base: &GameOptions,
    cols: Option<i64>,
    rows: Option<i64>,
    viewport_width: Option<i64>,
    viewport_height: Option<i64>,
) -> GameOptions {
    let width = cols
        .map(normalize_side)
        .or_else(|| viewport_width.map(cells_for_viewport))
        .unwrap_or(base.width);
    let height = rows
        .map(normalize_side)
        .or_else(|| viewport_height.map(cells_for_viewport))
        .unwrap_or(base.height);
    base.with_arena(width, height)
}

pub fn parse_seed(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
}
