use std::collections::HashSet;

use tracing::{debug, warn};

use crate::arena::Arena;
use crate::config::GameOptions;
use crate::constants::{
    food_effect, food_score, food_weight, obstacle_count, shrink_level_for_score,
    INITIAL_SNAKE_LENGTH, RARE_INVINCIBILITY_MS, RARE_PICKUP_SCORE_STEP,
};
use crate::error::GameError;
use crate::rng::Rng;
use crate::types::{Cell, Direction, Food, FoodKind, GameEvent, GameOverReason, LifeSummary};

pub mod effects;
pub mod placement;
pub mod registry;

use self::effects::EffectScheduler;
use self::placement::{find_free_cell, place_obstacles, place_snake};
use self::registry::EntityRegistry;

/// One life of the game: snake, board, effects and score, advanced one cell per step.
#[derive(Clone, Debug)]
pub struct TickEngine {
    arena: Arena,
    registry: EntityRegistry,
    effects: EffectScheduler,
    rng: Rng,
    enabled_food: Vec<FoodKind>,
    shrink_on_score: bool,
    rare_pickup_enabled: bool,

    score: u32,
    high_score: u32,
    tick: u64,
    events: Vec<GameEvent>,
    over: Option<GameOverReason>,
}

impl TickEngine {
    /// Lays out a fresh life: snake first, then obstacles, then the first food.
    pub fn new(options: &GameOptions, high_score: u32, mut rng: Rng) -> Result<Self, GameError> {
        let arena = Arena::new(options.width, options.height);
        let (body, direction) = place_snake(&arena, INITIAL_SNAKE_LENGTH, &mut rng)?;
        let mut occupied: HashSet<Cell> = body.iter().copied().collect();
        let obstacles = if options.obstacles {
            place_obstacles(&arena, obstacle_count(0), &mut occupied, &mut rng)?
        } else {
            HashSet::new()
        };
        let registry = EntityRegistry::new(body, direction, obstacles);

        let mut engine = Self::from_parts(options, arena, registry, high_score, rng);
        let food = engine.roll_food()?;
        engine.registry.set_food(Some(food));
        debug!(
            seed = engine.rng.seed(),
            head = ?engine.registry.head(),
            ?direction,
            obstacles = engine.registry.obstacles().len(),
            "life laid out"
        );
        Ok(engine)
    }

    fn from_parts(
        options: &GameOptions,
        arena: Arena,
        registry: EntityRegistry,
        high_score: u32,
        rng: Rng,
    ) -> Self {
        Self {
            arena,
            registry,
            effects: EffectScheduler::new(),
            rng,
            enabled_food: options.enabled_food.clone(),
            shrink_on_score: options.shrink_on_score,
            rare_pickup_enabled: options.rare_pickup,
            score: 0,
            high_score,
            tick: 0,
            events: Vec::new(),
            over: None,
        }
    }

    pub fn is_over(&self) -> bool {
        self.over.is_some()
    }

    pub fn over_reason(&self) -> Option<GameOverReason> {
        self.over
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn effects(&self) -> &EffectScheduler {
        &self.effects
    }

    #[cfg(test)]
    pub(crate) fn effects_mut(&mut self) -> &mut EffectScheduler {
        &mut self.effects
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn direction(&self) -> Direction {
        self.registry.direction()
    }

    /// Base interval scaled by the active tempo effect, if any.
    pub fn tick_interval_ms(&self, base_ms: u64) -> u64 {
        let scaled = (base_ms as f32 * self.effects.tempo_multiplier()).round() as u64;
        scaled.max(1)
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pause(&mut self, now: u64) {
        self.effects.freeze(now);
    }

    pub fn resume(&mut self, now: u64) {
        self.effects.resume(now);
    }

    /// Ends the life without a collision, e.g. on restart while paused.
    pub fn abandon(&mut self) {
        if self.over.is_none() {
            self.finish(GameOverReason::Abandoned);
        }
    }

    pub fn summary(&self) -> Option<LifeSummary> {
        self.over.map(|reason| LifeSummary {
            final_score: self.score,
            reason,
            ticks: self.tick,
            snake_length: self.registry.len(),
            shrink_level: self.arena.shrink_level(),
        })
    }

    /// Advances the snake one cell. `now` is the simulated time of this tick.
    pub fn step(&mut self, pending: Option<Direction>, now: u64) {
        if self.over.is_some() {
            return;
        }
        self.tick += 1;

        let current = self.registry.direction();
        if let Some(dir) = pending {
            if !dir.is_opposite(current) {
                self.registry.set_direction(dir);
            }
        }
        let direction = self.registry.direction();
        let Some(new_head) = self.registry.advance_head(direction) else {
            return;
        };

        let eats_food = self
            .registry
            .food()
            .is_some_and(|food| food.cell == new_head);

        if !self.effects.is_invincible_at(now) {
            if let Some(reason) = self.collision_at(new_head, eats_food) {
                self.finish(reason);
                return;
            }
        }

        if eats_food {
            if let Some(food) = self.registry.food() {
                self.consume_food(food, now);
            }
        } else if self.registry.rare_pickup() == Some(new_head) {
            self.registry.set_rare_pickup(None);
            self.effects.apply_invincibility(RARE_INVINCIBILITY_MS, now);
            self.events.push(GameEvent::RarePickupTaken { cell: new_head });
        }

        self.registry.commit_move(new_head, eats_food);

        // Shrink and respawns see the committed body so nothing lands on the new head.
        if eats_food && self.shrink_on_score {
            self.raise_shrink_level();
        }
        if self.registry.food().is_none() {
            self.respawn_food();
        }
        if eats_food {
            self.maybe_spawn_rare_pickup();
        }

        for effect in self.effects.tick(now) {
            self.events.push(GameEvent::EffectExpired { effect });
        }
    }

    fn collision_at(&self, cell: Cell, growing: bool) -> Option<GameOverReason> {
        if !self.arena.is_in_bounds(cell) {
            return Some(GameOverReason::Wall);
        }
        if self.registry.is_obstacle(cell) {
            return Some(GameOverReason::Obstacle);
        }
        if self.registry.hits_body(cell, growing) {
            return Some(GameOverReason::SelfCollision);
        }
        None
    }

    fn consume_food(&mut self, food: Food, now: u64) {
        self.score = self.score.saturating_add(food_score(food.kind));
        self.events.push(GameEvent::Eat {
            kind: food.kind,
            cell: food.cell,
        });

        if let Some((multiplier, duration_ms)) = food_effect(food.kind) {
            match food.kind.tempo() {
                Some(tempo) => self.effects.apply_tempo(tempo, multiplier, duration_ms, now),
                None => self.effects.apply_invincibility(duration_ms, now),
            }
        }

        if self.score > self.high_score {
            self.high_score = self.score;
            self.events.push(GameEvent::NewHighScore { value: self.score });
        }

        self.registry.set_food(None);
    }

    fn raise_shrink_level(&mut self) {
        let previous = self.arena.shrink_level();
        let target = previous.max(shrink_level_for_score(self.score));
        let applied = self.arena.apply_shrink(target);
        if applied == previous {
            return;
        }
        self.events.push(GameEvent::ShrinkLevelChanged { level: applied });
        debug!(level = applied, score = self.score, "arena shrank");

        // A pickup left outside the region could only be reached while invincible.
        if let Some(cell) = self.registry.rare_pickup() {
            if !self.arena.is_in_bounds(cell) {
                self.registry.set_rare_pickup(None);
                self.spawn_rare_pickup();
            }
        }
    }

    fn respawn_food(&mut self) {
        match self.roll_food() {
            Ok(food) => self.registry.set_food(Some(food)),
            Err(err) => {
                warn!(tick = self.tick, error = %err, "food respawn deferred");
            }
        }
    }

    fn roll_food(&mut self) -> Result<Food, GameError> {
        let blocked = self.registry.blocked_for_food();
        let cell = find_free_cell(&self.arena, &blocked, &mut self.rng)?;
        let weights: Vec<u32> = self.enabled_food.iter().map(|kind| food_weight(*kind)).collect();
        let kind = self
            .enabled_food
            .get(self.rng.pick_weighted(&weights))
            .copied()
            .unwrap_or(FoodKind::Normal);
        Ok(Food { cell, kind })
    }

    fn maybe_spawn_rare_pickup(&mut self) {
        if !self.rare_pickup_enabled || self.registry.rare_pickup().is_some() {
            return;
        }
        if self.score == 0 || self.score % RARE_PICKUP_SCORE_STEP != 0 {
            return;
        }
        self.spawn_rare_pickup();
    }

    fn spawn_rare_pickup(&mut self) {
        let blocked = self.registry.blocked_for_pickup();
        match find_free_cell(&self.arena, &blocked, &mut self.rng) {
            Ok(cell) => self.registry.set_rare_pickup(Some(cell)),
            Err(err) => debug!(error = %err, "no room for rare pickup"),
        }
    }

    fn finish(&mut self, reason: GameOverReason) {
        self.over = Some(reason);
        self.events.push(GameEvent::GameOver {
            final_score: self.score,
            reason,
        });
        debug!(score = self.score, ?reason, tick = self.tick, "life over");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EffectKind, TempoKind};

    fn open_options(width: i32, height: i32) -> GameOptions {
        GameOptions {
            width,
            height,
            obstacles: false,
            ..GameOptions::default()
        }
    }

    fn engine_with(
        width: i32,
        height: i32,
        body: &[(i32, i32)],
        direction: Direction,
        obstacles: &[(i32, i32)],
        food: Option<(i32, i32, FoodKind)>,
    ) -> TickEngine {
        let options = open_options(width, height);
        let registry = EntityRegistry::new(
            body.iter().map(|(x, y)| Cell::new(*x, *y)).collect(),
            direction,
            obstacles.iter().map(|(x, y)| Cell::new(*x, *y)).collect(),
        );
        let mut engine =
            TickEngine::from_parts(&options, Arena::new(width, height), registry, 0, Rng::new(17));
        engine.registry.set_food(food.map(|(x, y, kind)| Food {
            cell: Cell::new(x, y),
            kind,
        }));
        engine
    }

    fn has_duplicates(engine: &TickEngine) -> bool {
        let cells = engine.registry.snake_cells();
        let unique: HashSet<Cell> = cells.iter().copied().collect();
        unique.len() != cells.len()
    }

    #[test]
    fn eating_grows_scores_and_respawns_elsewhere() {
        let mut engine = engine_with(
            10,
            10,
            &[(5, 5), (4, 5), (3, 5)],
            Direction::Right,
            &[],
            Some((6, 5, FoodKind::Normal)),
        );
        engine.step(Some(Direction::Right), 120);

        assert_eq!(engine.score(), 10);
        assert_eq!(
            engine.registry.snake_cells(),
            vec![
                Cell::new(6, 5),
                Cell::new(5, 5),
                Cell::new(4, 5),
                Cell::new(3, 5)
            ]
        );
        let food = engine.registry.food().expect("food respawned");
        assert!(!engine.registry.is_occupied_by_snake(food.cell, true));
        assert!(engine.arena.is_in_bounds(food.cell));
        let events = engine.drain_events();
        assert!(events
            .iter()
            .any(|event| matches!(event, GameEvent::Eat { kind: FoodKind::Normal, .. })));
    }

    #[test]
    fn reversal_is_ignored_and_perpendicular_turn_commits() {
        let mut engine = engine_with(
            10,
            10,
            &[(5, 5), (4, 5), (3, 5)],
            Direction::Right,
            &[],
            Some((6, 5, FoodKind::Normal)),
        );
        engine.step(Some(Direction::Left), 120);
        assert_eq!(engine.direction(), Direction::Right);
        assert_eq!(engine.registry.head(), Some(Cell::new(6, 5)));

        engine.step(Some(Direction::Down), 240);
        assert_eq!(engine.direction(), Direction::Down);
        assert_eq!(engine.registry.head(), Some(Cell::new(6, 6)));

        engine.step(Some(Direction::Up), 360);
        assert_eq!(engine.direction(), Direction::Down);
        assert!(!engine.is_over());
    }

    #[test]
    fn invincible_snake_passes_through_obstacles() {
        let mut engine = engine_with(
            10,
            10,
            &[(5, 5), (4, 5), (3, 5)],
            Direction::Right,
            &[(6, 5)],
            Some((0, 0, FoodKind::Normal)),
        );
        engine.effects.apply_invincibility(5_000, 0);
        engine.step(None, 120);

        assert!(!engine.is_over());
        assert_eq!(
            engine.registry.snake_cells(),
            vec![Cell::new(6, 5), Cell::new(5, 5), Cell::new(4, 5)]
        );
    }

    #[test]
    fn obstacle_wall_and_body_end_the_life() {
        let mut engine = engine_with(
            10,
            10,
            &[(5, 5), (4, 5), (3, 5)],
            Direction::Right,
            &[(6, 5)],
            Some((0, 0, FoodKind::Normal)),
        );
        engine.step(None, 120);
        assert_eq!(engine.over_reason(), Some(GameOverReason::Obstacle));

        let mut engine = engine_with(
            10,
            10,
            &[(9, 5), (8, 5), (7, 5)],
            Direction::Right,
            &[],
            Some((0, 0, FoodKind::Normal)),
        );
        engine.step(None, 120);
        assert_eq!(engine.over_reason(), Some(GameOverReason::Wall));

        let mut engine = engine_with(
            10,
            10,
            &[(4, 4), (5, 4), (5, 5), (4, 5), (3, 5), (3, 4)],
            Direction::Left,
            &[],
            Some((0, 0, FoodKind::Normal)),
        );
        engine.step(Some(Direction::Down), 120);
        assert_eq!(engine.over_reason(), Some(GameOverReason::SelfCollision));
        let summary = engine.summary().expect("life is over");
        assert_eq!(summary.ticks, 1);
        assert_eq!(summary.snake_length, 6);
    }

    #[test]
    fn moving_into_the_vacated_tail_is_safe() {
        let mut engine = engine_with(
            10,
            10,
            &[(4, 4), (5, 4), (5, 5), (4, 5)],
            Direction::Left,
            &[],
            Some((0, 0, FoodKind::Normal)),
        );
        engine.step(Some(Direction::Down), 120);
        assert!(!engine.is_over());
        assert_eq!(engine.registry.head(), Some(Cell::new(4, 5)));
        assert!(!has_duplicates(&engine));
    }

    #[test]
    fn growing_into_the_tail_is_fatal() {
        // Food never spawns on the body; it is forced onto the tail here so the
        // tail stays put for this step.
        let mut engine = engine_with(
            10,
            10,
            &[(4, 4), (5, 4), (5, 5), (4, 5)],
            Direction::Left,
            &[],
            Some((4, 5, FoodKind::Normal)),
        );
        engine.step(Some(Direction::Down), 120);
        assert_eq!(engine.over_reason(), Some(GameOverReason::SelfCollision));
        assert_eq!(engine.score(), 0);
        assert_eq!(engine.registry.len(), 4);
    }

    #[test]
    fn reaching_one_hundred_shrinks_the_arena() {
        let mut engine = engine_with(
            10,
            10,
            &[(1, 5), (2, 5), (3, 5)],
            Direction::Left,
            &[],
            Some((0, 5, FoodKind::Normal)),
        );
        engine.score = 90;
        engine.step(None, 120);

        assert_eq!(engine.score(), 100);
        assert_eq!(engine.arena.shrink_level(), 1);
        assert_eq!(
            engine.arena.shrink_level(),
            shrink_level_for_score(engine.score())
        );
        let events = engine.drain_events();
        assert!(events
            .iter()
            .any(|event| matches!(event, GameEvent::ShrinkLevelChanged { level: 1 })));
        let pickup = engine.registry.rare_pickup().expect("rare pickup at 100");
        assert!(engine.arena.is_in_bounds(pickup));

        // Head now sits on the old border; moving along it leaves the region.
        engine.step(Some(Direction::Up), 240);
        assert_eq!(engine.over_reason(), Some(GameOverReason::Wall));
    }

    #[test]
    fn rare_pickup_waits_for_an_exact_hundred() {
        let mut engine = engine_with(
            10,
            10,
            &[(5, 5), (4, 5), (3, 5)],
            Direction::Right,
            &[],
            Some((6, 5, FoodKind::Bonus)),
        );
        engine.score = 60;
        engine.step(None, 120);
        assert_eq!(engine.score(), 110);
        assert_eq!(engine.registry.rare_pickup(), None);

        engine.score = 140;
        engine.registry.set_food(Some(Food {
            cell: Cell::new(7, 5),
            kind: FoodKind::Normal,
        }));
        engine.step(None, 240);
        assert_eq!(engine.score(), 150);
        assert_eq!(engine.registry.rare_pickup(), None);
        assert!(!engine
            .drain_events()
            .iter()
            .any(|event| matches!(event, GameEvent::RarePickupTaken { .. })));
    }

    #[test]
    fn active_rare_pickup_is_not_replaced() {
        let mut engine = engine_with(
            10,
            10,
            &[(5, 5), (4, 5), (3, 5)],
            Direction::Right,
            &[],
            Some((6, 5, FoodKind::Normal)),
        );
        engine.registry.set_rare_pickup(Some(Cell::new(2, 2)));
        engine.score = 90;
        engine.step(None, 120);

        assert_eq!(engine.score(), 100);
        assert_eq!(engine.arena.shrink_level(), 1);
        assert_eq!(engine.registry.rare_pickup(), Some(Cell::new(2, 2)));
    }

    #[test]
    fn shrink_moves_a_stranded_rare_pickup_inside() {
        let mut engine = engine_with(
            10,
            10,
            &[(5, 5), (4, 5), (3, 5)],
            Direction::Right,
            &[],
            Some((6, 5, FoodKind::Normal)),
        );
        let border = Cell::new(0, 3);
        engine.registry.set_rare_pickup(Some(border));
        engine.score = 90;
        engine.step(None, 120);

        assert_eq!(engine.arena.shrink_level(), 1);
        let pickup = engine.registry.rare_pickup().expect("pickup relocated");
        assert_ne!(pickup, border);
        assert!(engine.arena.is_in_bounds(pickup));
        assert!(!engine.registry.is_occupied_by_snake(pickup, true));
        assert_ne!(engine.registry.food().map(|food| food.cell), Some(pickup));
    }

    #[test]
    fn shrink_is_skipped_when_disabled() {
        let mut engine = engine_with(
            10,
            10,
            &[(5, 5), (4, 5), (3, 5)],
            Direction::Right,
            &[],
            Some((6, 5, FoodKind::Bonus)),
        );
        engine.shrink_on_score = false;
        engine.score = 250;
        engine.step(None, 120);
        assert_eq!(engine.score(), 300);
        assert_eq!(engine.arena.shrink_level(), 0);
    }

    #[test]
    fn tempo_foods_replace_each_other() {
        let mut engine = engine_with(
            12,
            12,
            &[(3, 5), (2, 5), (1, 5)],
            Direction::Right,
            &[],
            Some((4, 5, FoodKind::SpeedUp)),
        );
        engine.step(None, 100);
        assert_eq!(engine.tick_interval_ms(120), 84);

        engine.registry.set_food(Some(Food {
            cell: Cell::new(5, 5),
            kind: FoodKind::SlowDown,
        }));
        engine.step(None, 200);
        assert_eq!(engine.effects.tempo_kind(), Some(TempoKind::SlowDown));
        assert_eq!(engine.tick_interval_ms(120), 180);
        assert_eq!(engine.score(), 15);

        engine.registry.set_food(Some(Food {
            cell: Cell::new(0, 0),
            kind: FoodKind::Normal,
        }));
        engine.drain_events();
        engine.step(None, 5_200);
        assert_eq!(engine.tick_interval_ms(120), 120);
        let events = engine.drain_events();
        assert!(events.iter().any(|event| matches!(
            event,
            GameEvent::EffectExpired {
                effect: EffectKind::SlowDown
            }
        )));
        assert!(!events.iter().any(|event| matches!(
            event,
            GameEvent::EffectExpired {
                effect: EffectKind::SpeedUp
            }
        )));
    }

    #[test]
    fn rare_pickup_grants_long_invincibility() {
        let mut engine = engine_with(
            10,
            10,
            &[(5, 5), (4, 5), (3, 5)],
            Direction::Right,
            &[],
            Some((0, 0, FoodKind::Normal)),
        );
        engine.registry.set_rare_pickup(Some(Cell::new(6, 5)));
        engine.step(None, 1_000);

        assert_eq!(engine.registry.rare_pickup(), None);
        assert_eq!(engine.registry.len(), 3);
        assert_eq!(
            engine.effects.invincible_remaining_ms(1_000),
            RARE_INVINCIBILITY_MS
        );
        assert!(engine
            .drain_events()
            .iter()
            .any(|event| matches!(event, GameEvent::RarePickupTaken { .. })));
    }

    #[test]
    fn invincibility_lapse_outside_the_region_is_fatal() {
        let mut engine = engine_with(
            10,
            10,
            &[(9, 5), (8, 5), (7, 5)],
            Direction::Right,
            &[],
            Some((0, 0, FoodKind::Normal)),
        );
        engine.effects.apply_invincibility(200, 0);
        engine.step(None, 100);
        assert!(!engine.is_over());
        assert_eq!(engine.registry.head(), Some(Cell::new(10, 5)));

        engine.step(None, 200);
        assert_eq!(engine.over_reason(), Some(GameOverReason::Wall));
    }

    #[test]
    fn full_board_defers_food_without_ending_the_life() {
        let food_cell = (2, 0);
        let snake = [(1, 0), (0, 0)];
        let mut obstacles = Vec::new();
        for y in 0..5 {
            for x in 0..5 {
                if (x, y) != food_cell && !snake.contains(&(x, y)) {
                    obstacles.push((x, y));
                }
            }
        }
        let mut engine = engine_with(
            5,
            5,
            &snake,
            Direction::Right,
            &obstacles,
            Some((2, 0, FoodKind::Normal)),
        );
        engine.rare_pickup_enabled = false;
        engine.step(None, 120);

        assert!(!engine.is_over());
        assert_eq!(engine.registry.len(), 3);
        assert_eq!(engine.registry.food(), None);
    }

    #[test]
    fn new_high_score_is_announced_once_it_is_beaten() {
        let mut engine = engine_with(
            10,
            10,
            &[(5, 5), (4, 5), (3, 5)],
            Direction::Right,
            &[],
            Some((6, 5, FoodKind::Normal)),
        );
        engine.high_score = 15;
        engine.step(None, 120);
        assert_eq!(engine.high_score(), 15);

        engine.registry.set_food(Some(Food {
            cell: Cell::new(7, 5),
            kind: FoodKind::Normal,
        }));
        engine.step(None, 240);
        assert_eq!(engine.high_score(), 20);
        let events = engine.drain_events();
        let announced: Vec<u32> = events
            .iter()
            .filter_map(|event| match event {
                GameEvent::NewHighScore { value } => Some(*value),
                _ => None,
            })
            .collect();
        assert_eq!(announced, vec![20]);
    }

    #[test]
    fn same_seed_lays_out_the_same_life() {
        let options = GameOptions::default();
        let a = TickEngine::new(&options, 0, Rng::new(4242)).expect("layout");
        let b = TickEngine::new(&options, 0, Rng::new(4242)).expect("layout");
        assert_eq!(a.registry.snake_cells(), b.registry.snake_cells());
        assert_eq!(a.registry.obstacle_cells(), b.registry.obstacle_cells());
        assert_eq!(a.registry.food(), b.registry.food());
        assert_eq!(a.registry.obstacles().len(), obstacle_count(0));
    }

    #[test]
    fn fresh_life_keeps_items_apart() {
        for seed in 0..30 {
            let engine = TickEngine::new(&GameOptions::default(), 0, Rng::new(seed)).expect("layout");
            let food = engine.registry.food().expect("first food");
            assert!(!engine.registry.is_occupied_by_snake(food.cell, true));
            assert!(!engine.registry.is_obstacle(food.cell));
            for cell in engine.registry.body() {
                assert!(!engine.registry.is_obstacle(*cell));
            }
        }
    }

    #[test]
    fn random_walks_never_duplicate_cells() {
        for seed in 0..20 {
            let mut engine =
                TickEngine::new(&open_options(12, 12), 0, Rng::new(seed)).expect("layout");
            let mut turns = Rng::new(seed + 1_000);
            let mut now = 0;
            let mut last_invincible_tick = None;
            for _ in 0..300 {
                now += 120;
                let dir = Direction::ALL[turns.pick_index(4)];
                engine.step(Some(dir), now);
                if engine.is_over() {
                    break;
                }
                if engine.effects.has_invincibility() {
                    last_invincible_tick = Some(engine.tick());
                    continue;
                }
                let settled = last_invincible_tick
                    .is_none_or(|tick| engine.tick() - tick > engine.registry.len() as u64);
                if settled {
                    assert!(!has_duplicates(&engine), "seed {seed} duplicated a cell");
                }
            }
        }
    }
}
