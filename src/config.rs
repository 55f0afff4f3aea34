use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    COUNTDOWN_BEATS, COUNTDOWN_BEAT_MS, DEFAULT_ARENA_HEIGHT, DEFAULT_ARENA_WIDTH, GO_MARKER_MS,
    MAX_ARENA_SIDE, MIN_ARENA_SIDE,
};
use crate::error::GameError;
use crate::types::{FoodKind, SpeedPreference};

/// Capabilities of one game: board size, which food kinds roll, and which
/// optional rules (obstacles, shrinking, rare pickup) are on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameOptions {
    pub width: i32,
    pub height: i32,
    pub speed: SpeedPreference,
    pub obstacles: bool,
    pub shrink_on_score: bool,
    pub rare_pickup: bool,
    pub enabled_food: Vec<FoodKind>,
    pub countdown_beats: u32,
    pub countdown_beat_ms: u64,
    pub go_marker_ms: u64,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_ARENA_WIDTH,
            height: DEFAULT_ARENA_HEIGHT,
            speed: SpeedPreference::default(),
            obstacles: true,
            shrink_on_score: true,
            rare_pickup: true,
            enabled_food: FoodKind::ALL.to_vec(),
            countdown_beats: COUNTDOWN_BEATS,
            countdown_beat_ms: COUNTDOWN_BEAT_MS,
            go_marker_ms: GO_MARKER_MS,
        }
    }
}

impl GameOptions {
    pub fn validate(&self) -> Result<(), GameError> {
        let sides = MIN_ARENA_SIDE..=MAX_ARENA_SIDE;
        if !sides.contains(&self.width) || !sides.contains(&self.height) {
            return Err(GameError::InvalidOptions(format!(
                "arena {}x{} outside {MIN_ARENA_SIDE}..={MAX_ARENA_SIDE}",
                self.width, self.height
            )));
        }
        if self.enabled_food.is_empty() {
            return Err(GameError::InvalidOptions(
                "at least one food kind must be enabled".to_string(),
            ));
        }
        if !self.enabled_food.contains(&FoodKind::Normal) {
            return Err(GameError::InvalidOptions(
                "normal food cannot be disabled".to_string(),
            ));
        }
        if self.countdown_beat_ms == 0 {
            return Err(GameError::InvalidOptions(
                "countdown beat must last longer than 0ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Same options on a board of a different size, clamped to the valid range.
    pub fn with_arena(&self, width: i32, height: i32) -> Self {
        Self {
            width: width.clamp(MIN_ARENA_SIDE, MAX_ARENA_SIDE),
            height: height.clamp(MIN_ARENA_SIDE, MAX_ARENA_SIDE),
            ..self.clone()
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub high_score_path: PathBuf,
    pub static_dir: Option<PathBuf>,
    pub game: GameOptions,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = GameOptions::default();
        let port = lookup("PORT")
            .and_then(|raw| raw.trim().parse::<u16>().ok())
            .unwrap_or(8080);
        let high_score_path = lookup("HIGH_SCORE_DB_PATH")
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".data/high_score.json"));
        let static_dir = lookup("STATIC_DIR")
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);

        let width = parse_side(lookup("ARENA_WIDTH")).unwrap_or(defaults.width);
        let height = parse_side(lookup("ARENA_HEIGHT")).unwrap_or(defaults.height);
        let game = GameOptions {
            width,
            height,
            obstacles: parse_flag(lookup("OBSTACLES")).unwrap_or(defaults.obstacles),
            shrink_on_score: parse_flag(lookup("SHRINK_ON_SCORE"))
                .unwrap_or(defaults.shrink_on_score),
            ..defaults
        };

        Self {
            port,
            high_score_path,
            static_dir,
            game,
        }
    }
}

fn parse_side(raw: Option<String>) -> Option<i32> {
    raw.and_then(|value| value.trim().parse::<i32>().ok())
        .filter(|side| (MIN_ARENA_SIDE..=MAX_ARENA_SIDE).contains(side))
}

fn parse_flag(raw: Option<String>) -> Option<bool> {
    match raw?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
