use std::collections::{BTreeMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use clap::Parser;
use serde::Serialize;
use snake_arena_server::config::GameOptions;
use snake_arena_server::constants::shrink_level_for_score;
use snake_arena_server::engine::TickEngine;
use snake_arena_server::rng::Rng;
use snake_arena_server::session::GameSession;
use snake_arena_server::types::{
    Cell, Direction, FoodKind, GameEvent, GameOverReason, Intent, SessionState, SpeedPreference,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Runs seeded headless snake games and checks invariants")]
struct Cli {
    #[arg(long, default_value_t = 5)]
    games: u32,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    width: Option<i32>,
    #[arg(long)]
    height: Option<i32>,
    #[arg(long)]
    speed: Option<String>,
    #[arg(long)]
    no_obstacles: bool,
    #[arg(long)]
    no_shrink: bool,
    #[arg(long, default_value_t = 20_000)]
    max_ticks: u64,
    #[arg(long)]
    run_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct GameResultLine {
    game: u32,
    seed: u64,
    reason: Option<GameOverReason>,
    #[serde(rename = "finalScore")]
    final_score: u32,
    ticks: u64,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    #[serde(rename = "snakeLength")]
    snake_length: usize,
    #[serde(rename = "shrinkLevel")]
    shrink_level: i32,
    #[serde(rename = "foodEaten")]
    food_eaten: BTreeMap<String, u32>,
    #[serde(rename = "rarePickups")]
    rare_pickups: u32,
    #[serde(rename = "effectsExpired")]
    effects_expired: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(rename = "startedAt")]
    started_at: String,
    #[serde(rename = "finishedAt")]
    finished_at: String,
    options: GameOptions,
    #[serde(rename = "gameCount")]
    game_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageScore")]
    average_score: f64,
    #[serde(rename = "bestScore")]
    best_score: u32,
    #[serde(rename = "averageTicks")]
    average_ticks: u64,
    #[serde(rename = "reasonCounts")]
    reason_counts: BTreeMap<String, usize>,
    games: Vec<GameResultLine>,
}

struct GameRun {
    result: GameResultLine,
    anomaly_records: Vec<AnomalyRecord>,
}

/// Per-tick invariant checks over a running life.
struct InvariantWatch {
    shrink_on_score: bool,
    last_score: u32,
    recent_invincible: VecDeque<bool>,
}

impl InvariantWatch {
    fn new(shrink_on_score: bool) -> Self {
        Self {
            shrink_on_score,
            last_score: 0,
            recent_invincible: VecDeque::new(),
        }
    }

    fn check(&mut self, life: &TickEngine) -> Vec<String> {
        let mut anomalies = Vec::new();
        let registry = life.registry();
        let arena = life.arena();
        let snake = registry.snake_cells();

        self.recent_invincible
            .push_back(life.effects().has_invincibility());
        while self.recent_invincible.len() > snake.len().max(1) {
            self.recent_invincible.pop_front();
        }

        let expected_shrink = if self.shrink_on_score {
            shrink_level_for_score(life.score()).min(arena.max_shrink_level())
        } else {
            0
        };
        if arena.shrink_level() != expected_shrink {
            anomalies.push(format!(
                "shrink level {} does not match score {} (expected {expected_shrink})",
                arena.shrink_level(),
                life.score()
            ));
        }

        if life.score() < self.last_score {
            anomalies.push(format!(
                "score decreased: {} -> {}",
                self.last_score,
                life.score()
            ));
        }
        self.last_score = life.score();

        if !snake.windows(2).all(|pair| pair[0].is_adjacent(pair[1])) {
            anomalies.push("snake is not contiguous".to_string());
        }

        let unique: HashSet<Cell> = snake.iter().copied().collect();
        let invincible_lately = self.recent_invincible.iter().any(|flag| *flag);
        if unique.len() != snake.len() && !invincible_lately {
            anomalies.push("snake has duplicate cells".to_string());
        }

        if let Some(food) = registry.food() {
            if registry.is_occupied_by_snake(food.cell, true) {
                anomalies.push("food spawned on the snake".to_string());
            }
            if registry.is_obstacle(food.cell) {
                anomalies.push("food spawned on an obstacle".to_string());
            }
            if !arena.is_in_bounds(food.cell) {
                anomalies.push("food outside the play region".to_string());
            }
        }
        anomalies
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simulate=info,snake_arena_server=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let options = resolve_options(&cli);
    if let Err(error) = options.validate() {
        error!(%error, "invalid simulation options");
        std::process::exit(2);
    }

    let base_seed = cli.seed.unwrap_or_else(|| Rng::from_entropy().seed());
    let started_at = now_iso();
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| format!("sim-{base_seed}"));
    info!(%run_id, base_seed, games = cli.games, "run started");

    let mut results = Vec::new();
    let mut reason_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut anomaly_count = 0usize;
    let mut has_anomaly = false;

    for game in 0..cli.games {
        let seed = base_seed.wrapping_add(u64::from(game));
        let run = run_game(game, seed, &options, cli.max_ticks);

        for anomaly in &run.anomaly_records {
            warn!(game, seed, tick = anomaly.tick, message = %anomaly.message, "anomaly detected");
        }
        if !run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        anomaly_count += run.anomaly_records.len();
        *reason_counts
            .entry(reason_key(run.result.reason))
            .or_insert(0) += 1;

        info!(
            game,
            seed,
            score = run.result.final_score,
            ticks = run.result.ticks,
            reason = ?run.result.reason,
            "game finished"
        );
        match serde_json::to_string(&run.result) {
            Ok(line) => println!("{line}"),
            Err(error) => error!(%error, "failed to serialize game result"),
        }
        results.push(run.result);
    }

    let summary = build_run_summary(
        run_id.clone(),
        started_at,
        options,
        results,
        reason_counts,
        anomaly_count,
    );
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            error!(path = %path.display(), %error, "summary write failed");
            std::process::exit(2);
        }
    }
    info!(
        %run_id,
        games = summary.game_count,
        anomalies = summary.anomaly_count,
        average_score = summary.average_score,
        best_score = summary.best_score,
        "run finished"
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn resolve_options(cli: &Cli) -> GameOptions {
    let defaults = GameOptions::default();
    GameOptions {
        width: cli.width.unwrap_or(defaults.width),
        height: cli.height.unwrap_or(defaults.height),
        speed: cli
            .speed
            .as_deref()
            .and_then(SpeedPreference::parse)
            .unwrap_or(defaults.speed),
        obstacles: !cli.no_obstacles,
        shrink_on_score: !cli.no_shrink,
        ..defaults
    }
}

fn run_game(game: u32, seed: u64, options: &GameOptions, max_ticks: u64) -> GameRun {
    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut food_eaten: BTreeMap<String, u32> = BTreeMap::new();
    let mut rare_pickups = 0;
    let mut effects_expired = 0;
    let mut watch = InvariantWatch::new(options.shrink_on_score);

    let mut session = match GameSession::new(options.clone(), 0, Rng::new(seed)) {
        Ok(session) => session,
        Err(error) => {
            return GameRun {
                result: empty_result(game, seed, vec![error.to_string()]),
                anomaly_records: vec![AnomalyRecord {
                    tick: 0,
                    message: error.to_string(),
                }],
            };
        }
    };

    let mut now = 0u64;
    if let Err(error) = session.submit(Intent::StartOrRestart, now) {
        let message = format!("start failed: {error}");
        return GameRun {
            result: empty_result(game, seed, vec![message.clone()]),
            anomaly_records: vec![AnomalyRecord { tick: 0, message }],
        };
    }

    while session.state() != SessionState::Over {
        let Some(deadline) = session.next_deadline(now) else {
            break;
        };
        now = deadline;

        if session.state() == SessionState::Running {
            if let Some(dir) = session.life().and_then(choose_direction) {
                // Reversals are filtered by the session.
                let _ = session.submit(Intent::Direction(dir), now);
            }
        }
        let steps = session.advance(now);

        for event in session.drain_events() {
            match event {
                GameEvent::Eat { kind, .. } => {
                    *food_eaten.entry(food_key(kind)).or_insert(0) += 1;
                }
                GameEvent::RarePickupTaken { .. } => rare_pickups += 1,
                GameEvent::EffectExpired { .. } => effects_expired += 1,
                _ => {}
            }
        }

        let Some(life) = session.life() else {
            break;
        };
        if steps > 0 && !life.is_over() {
            for message in watch.check(life) {
                push_anomaly(
                    &mut anomalies,
                    &mut anomaly_records,
                    &mut anomaly_seen,
                    life.tick(),
                    message,
                );
            }
        }
        if life.tick() >= max_ticks {
            break;
        }
    }

    let (final_score, ticks, snake_length, shrink_level, reason) = match session.life() {
        Some(life) => (
            life.score(),
            life.tick(),
            life.registry().len(),
            life.arena().shrink_level(),
            life.over_reason(),
        ),
        None => (0, 0, 0, 0, None),
    };

    GameRun {
        result: GameResultLine {
            game,
            seed,
            reason,
            final_score,
            ticks,
            duration_ms: now,
            snake_length,
            shrink_level,
            food_eaten,
            rare_pickups,
            effects_expired,
            anomalies,
        },
        anomaly_records,
    }
}

/// Greedy autopilot: among safe non-reversing moves, head for the nearest item,
/// breaking ties toward cells with more open neighbours.
fn choose_direction(life: &TickEngine) -> Option<Direction> {
    let registry = life.registry();
    let arena = life.arena();
    let head = registry.head()?;
    let current = life.direction();
    let targets: Vec<Cell> = registry
        .food()
        .map(|food| food.cell)
        .into_iter()
        .chain(registry.rare_pickup())
        .collect();

    let is_safe = |cell: Cell, growing: bool| {
        arena.is_in_bounds(cell) && !registry.is_obstacle(cell) && !registry.hits_body(cell, growing)
    };

    Direction::ALL
        .into_iter()
        .filter(|dir| !dir.is_opposite(current))
        .filter_map(|dir| {
            let cell = head.offset(dir);
            let growing = registry.food().is_some_and(|food| food.cell == cell);
            if !is_safe(cell, growing) {
                return None;
            }
            let distance = targets
                .iter()
                .map(|target| (target.x - cell.x).abs() + (target.y - cell.y).abs())
                .min()
                .unwrap_or(0);
            let open = Direction::ALL
                .into_iter()
                .filter(|next| is_safe(cell.offset(*next), false))
                .count() as i32;
            let straight = i32::from(dir == current);
            Some((dir, (distance, -open, -straight)))
        })
        .min_by_key(|(_, rank)| *rank)
        .map(|(dir, _)| dir)
}

fn empty_result(game: u32, seed: u64, anomalies: Vec<String>) -> GameResultLine {
    GameResultLine {
        game,
        seed,
        reason: None,
        final_score: 0,
        ticks: 0,
        duration_ms: 0,
        snake_length: 0,
        shrink_level: 0,
        food_eaten: BTreeMap::new(),
        rare_pickups: 0,
        effects_expired: 0,
        anomalies,
    }
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn build_run_summary(
    run_id: String,
    started_at: String,
    options: GameOptions,
    games: Vec<GameResultLine>,
    reason_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
) -> RunSummary {
    let game_count = games.len();
    let total_score: u64 = games.iter().map(|game| u64::from(game.final_score)).sum();
    let total_ticks: u64 = games.iter().map(|game| game.ticks).sum();
    let (average_score, average_ticks) = if game_count == 0 {
        (0.0, 0)
    } else {
        (
            total_score as f64 / game_count as f64,
            total_ticks / game_count as u64,
        )
    };
    RunSummary {
        run_id,
        started_at,
        finished_at: now_iso(),
        options,
        game_count,
        anomaly_count,
        average_score,
        best_score: games.iter().map(|game| game.final_score).max().unwrap_or(0),
        average_ticks,
        reason_counts,
        games,
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, text)
}

fn reason_key(reason: Option<GameOverReason>) -> String {
    match reason {
        Some(GameOverReason::Wall) => "wall",
        Some(GameOverReason::SelfCollision) => "self_collision",
        Some(GameOverReason::Obstacle) => "obstacle",
        Some(GameOverReason::Abandoned) => "abandoned",
        None => "tick_limit",
    }
    .to_string()
}

fn food_key(kind: FoodKind) -> String {
    match kind {
        FoodKind::Normal => "normal",
        FoodKind::Bonus => "bonus",
        FoodKind::SpeedUp => "speed_up",
        FoodKind::SlowDown => "slow_down",
        FoodKind::Invincible => "invincible",
    }
    .to_string()
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
