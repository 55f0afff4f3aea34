use crate::types::{FoodKind, SpeedPreference};

pub const GRID_CELL_PX: u32 = 20;

pub const MIN_ARENA_SIDE: i32 = 5;
pub const MAX_ARENA_SIDE: i32 = 200;
pub const DEFAULT_ARENA_WIDTH: i32 = 30;
pub const DEFAULT_ARENA_HEIGHT: i32 = 24;

pub const INITIAL_SNAKE_LENGTH: usize = 3;
pub const BASE_OBSTACLE_COUNT: usize = 5;

pub const COUNTDOWN_BEATS: u32 = 3;
pub const COUNTDOWN_BEAT_MS: u64 = 1_000;
pub const GO_MARKER_MS: u64 = 500;

pub const RARE_PICKUP_SCORE_STEP: u32 = 100;
pub const RARE_INVINCIBILITY_MS: u64 = 8_000;

pub const SHRINK_THRESHOLDS: [u32; 3] = [100, 250, 500];

pub const MAX_CATCH_UP_STEPS: usize = 8;
pub const PLACEMENT_ATTEMPTS: usize = 64;

pub const HIGH_SCORE_KEY: &str = "snakeHighScore";

pub fn base_interval_ms(speed: SpeedPreference) -> u64 {
    match speed {
        SpeedPreference::Slow => 200,
        SpeedPreference::Medium => 120,
        SpeedPreference::Fast => 80,
    }
}

pub fn food_score(kind: FoodKind) -> u32 {
    match kind {
        FoodKind::Normal => 10,
        FoodKind::Bonus => 50,
        FoodKind::SpeedUp => 10,
        FoodKind::SlowDown => 5,
        FoodKind::Invincible => 20,
    }
}

/// Effect attached to a food kind: `(tick multiplier, duration)` for tempo
/// kinds, `(1.0, duration)` for invincibility.
pub fn food_effect(kind: FoodKind) -> Option<(f32, u64)> {
    match kind {
        FoodKind::Normal | FoodKind::Bonus => None,
        FoodKind::SpeedUp => Some((0.7, 5_000)),
        FoodKind::SlowDown => Some((1.5, 5_000)),
        FoodKind::Invincible => Some((1.0, 5_000)),
    }
}

pub fn food_weight(kind: FoodKind) -> u32 {
    match kind {
        FoodKind::Normal => 65,
        FoodKind::Bonus => 20,
        FoodKind::SpeedUp => 10,
        FoodKind::SlowDown => 10,
        FoodKind::Invincible => 5,
    }
}

pub fn obstacle_count(score: u32) -> usize {
    BASE_OBSTACLE_COUNT + (score / 100) as usize
}

pub fn shrink_level_for_score(score: u32) -> i32 {
    SHRINK_THRESHOLDS
        .iter()
        .filter(|threshold| **threshold <= score)
        .count() as i32
}
