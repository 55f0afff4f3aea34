use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn is_adjacent(self, other: Cell) -> bool {
        (self.x - other.x).abs() + (self.y - other.y).abs() == 1
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
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

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    pub fn is_opposite(self, other: Direction) -> bool {
        self.opposite() == other
    }

    /// Grid delta; y grows downwards like canvas coordinates.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodKind {
    Normal,
    Bonus,
    SpeedUp,
    SlowDown,
    Invincible,
}

impl FoodKind {
    pub const ALL: [FoodKind; 5] = [
        FoodKind::Normal,
        FoodKind::Bonus,
        FoodKind::SpeedUp,
        FoodKind::SlowDown,
        FoodKind::Invincible,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "normal" => Some(Self::Normal),
            "bonus" => Some(Self::Bonus),
            "speed_up" => Some(Self::SpeedUp),
            "slow_down" => Some(Self::SlowDown),
            "invincible" => Some(Self::Invincible),
            _ => None,
        }
    }

    pub fn tempo(self) -> Option<TempoKind> {
        match self {
            Self::SpeedUp => Some(TempoKind::SpeedUp),
            Self::SlowDown => Some(TempoKind::SlowDown),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Food {
    pub cell: Cell,
    pub kind: FoodKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TempoKind {
    SpeedUp,
    SlowDown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    SpeedUp,
    SlowDown,
    Invincibility,
}

impl From<TempoKind> for EffectKind {
    fn from(kind: TempoKind) -> Self {
        match kind {
            TempoKind::SpeedUp => EffectKind::SpeedUp,
            TempoKind::SlowDown => EffectKind::SlowDown,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedPreference {
    Slow,
    #[default]
    Medium,
    Fast,
}

impl SpeedPreference {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "slow" => Some(Self::Slow),
            "medium" => Some(Self::Medium),
            "fast" => Some(Self::Fast),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Countdown,
    Running,
    Paused,
    Over,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    Wall,
    SelfCollision,
    Obstacle,
    Abandoned,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    Direction(Direction),
    PauseToggle,
    StartOrRestart,
    SpeedPreference(SpeedPreference),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CountdownView {
    Beat(u32),
    Go,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ArenaView {
    pub width: i32,
    pub height: i32,
    #[serde(rename = "shrinkLevel")]
    pub shrink_level: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TempoView {
    pub kind: TempoKind,
    #[serde(rename = "remainingMs")]
    pub remaining_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    Eat {
        kind: FoodKind,
        cell: Cell,
    },
    RarePickupTaken {
        cell: Cell,
    },
    EffectExpired {
        effect: EffectKind,
    },
    ShrinkLevelChanged {
        level: i32,
    },
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    GameOver {
        #[serde(rename = "finalScore")]
        final_score: u32,
        reason: GameOverReason,
    },
    NewHighScore {
        value: u32,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "nowMs")]
    pub now_ms: u64,
    pub state: SessionState,
    pub snake: Vec<Cell>,
    pub direction: Direction,
    pub food: Option<Food>,
    #[serde(rename = "secondaryPickup")]
    pub secondary_pickup: Option<Cell>,
    pub obstacles: Vec<Cell>,
    pub score: u32,
    #[serde(rename = "highScore")]
    pub high_score: u32,
    pub arena: ArenaView,
    pub invincible: bool,
    #[serde(rename = "invincibleRemainingMs")]
    pub invincible_remaining_ms: u64,
    pub tempo: Option<TempoView>,
    #[serde(rename = "tickIntervalMs")]
    pub tick_interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countdown: Option<CountdownView>,
}

#[derive(Clone, Debug, Serialize)]
pub struct LifeSummary {
    #[serde(rename = "finalScore")]
    pub final_score: u32,
    pub reason: GameOverReason,
    pub ticks: u64,
    #[serde(rename = "snakeLength")]
    pub snake_length: usize,
    #[serde(rename = "shrinkLevel")]
    pub shrink_level: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_pairs_are_symmetric() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            assert!(dir.is_opposite(dir.opposite()));
            assert!(!dir.is_opposite(dir));
        }
    }

    #[test]
    fn offset_moves_one_cell() {
        let origin = Cell::new(5, 5);
        assert_eq!(origin.offset(Direction::Up), Cell::new(5, 4));
        assert_eq!(origin.offset(Direction::Down), Cell::new(5, 6));
        assert_eq!(origin.offset(Direction::Left), Cell::new(4, 5));
        assert_eq!(origin.offset(Direction::Right), Cell::new(6, 5));
        for dir in Direction::ALL {
            assert!(origin.is_adjacent(origin.offset(dir)));
        }
    }

    #[test]
    fn parse_rejects_unknown_values() {
        assert_eq!(Direction::parse("left"), Some(Direction::Left));
        assert_eq!(Direction::parse("LEFT"), None);
        assert_eq!(FoodKind::parse("slow_down"), Some(FoodKind::SlowDown));
        assert_eq!(SpeedPreference::parse("turbo"), None);
    }

    #[test]
    fn countdown_serializes_as_beat_or_marker() {
        let beat = serde_json::to_value(CountdownView::Beat(2)).expect("serialize");
        assert_eq!(beat, serde_json::json!({ "beat": 2 }));
        let go = serde_json::to_value(CountdownView::Go).expect("serialize");
        assert_eq!(go, serde_json::json!("go"));
    }

    #[test]
    fn events_are_tagged_by_type() {
        let value = serde_json::to_value(GameEvent::GameOver {
            final_score: 40,
            reason: GameOverReason::Wall,
        })
        .expect("serialize");
        assert_eq!(value["type"], "game_over");
        assert_eq!(value["finalScore"], 40);
        assert_eq!(value["reason"], "wall");
    }
}
