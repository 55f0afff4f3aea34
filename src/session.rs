use tracing::{debug, info};

use crate::arena::Arena;
use crate::config::GameOptions;
use crate::constants::{base_interval_ms, MAX_CATCH_UP_STEPS};
use crate::engine::TickEngine;
use crate::error::GameError;
use crate::rng::Rng;
use crate::types::{
    CountdownView, Direction, GameEvent, Intent, LifeSummary, SessionState, Snapshot,
    SpeedPreference,
};

/// Top-level state machine: Idle -> Countdown -> Running <-> Paused -> Over.
///
/// The session is the only owner of simulation state. Drivers feed it intents
/// and an explicit clock and read snapshots and events back out.
#[derive(Debug)]
pub struct GameSession {
    options: GameOptions,
    state: SessionState,
    rng: Rng,
    life: Option<TickEngine>,
    high_score: u32,
    pending_direction: Option<Direction>,
    countdown_started_at: u64,
    next_tick_at: Option<u64>,
    paused_tick_remaining: Option<u64>,
    events: Vec<GameEvent>,
}

impl GameSession {
    pub fn new(options: GameOptions, high_score: u32, rng: Rng) -> Result<Self, GameError> {
        options.validate()?;
        Ok(Self {
            options,
            state: SessionState::Idle,
            rng,
            life: None,
            high_score,
            pending_direction: None,
            countdown_started_at: 0,
            next_tick_at: None,
            paused_tick_remaining: None,
            events: Vec::new(),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn options(&self) -> &GameOptions {
        &self.options
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn speed(&self) -> SpeedPreference {
        self.options.speed
    }

    pub fn life(&self) -> Option<&TickEngine> {
        self.life.as_ref()
    }

    pub fn last_summary(&self) -> Option<LifeSummary> {
        self.life.as_ref().and_then(TickEngine::summary)
    }

    /// New options take effect from the next life.
    pub fn set_options(&mut self, options: GameOptions) -> Result<(), GameError> {
        options.validate()?;
        self.options = options;
        Ok(())
    }

    pub fn submit(&mut self, intent: Intent, now: u64) -> Result<(), GameError> {
        match intent {
            Intent::Direction(dir) => self.submit_direction(dir),
            Intent::PauseToggle => self.toggle_pause(now),
            Intent::StartOrRestart => return self.start_or_restart(now),
            Intent::SpeedPreference(speed) => self.set_speed(speed, now),
        }
        Ok(())
    }

    fn submit_direction(&mut self, dir: Direction) {
        if self.state != SessionState::Running {
            return;
        }
        let Some(life) = self.life.as_ref() else {
            return;
        };
        // Checked against the committed heading; a rejected reversal must not
        // clobber a turn that is already queued.
        if life.direction().is_opposite(dir) {
            debug!(?dir, "reversal ignored");
            return;
        }
        self.pending_direction = Some(dir);
    }

    fn toggle_pause(&mut self, now: u64) {
        match self.state {
            SessionState::Running => {
                if let Some(life) = self.life.as_mut() {
                    life.pause(now);
                }
                self.paused_tick_remaining =
                    self.next_tick_at.take().map(|at| at.saturating_sub(now));
                self.transition(SessionState::Paused);
            }
            SessionState::Paused => {
                if let Some(life) = self.life.as_mut() {
                    life.resume(now);
                }
                let remaining = self
                    .paused_tick_remaining
                    .take()
                    .unwrap_or_else(|| self.tick_interval_ms());
                self.next_tick_at = Some(now.saturating_add(remaining));
                self.transition(SessionState::Running);
            }
            _ => {}
        }
    }

    fn set_speed(&mut self, speed: SpeedPreference, now: u64) {
        self.options.speed = speed;
        let interval = self.tick_interval_ms();
        match self.state {
            SessionState::Running => self.next_tick_at = Some(now.saturating_add(interval)),
            SessionState::Paused => {
                self.paused_tick_remaining = self
                    .paused_tick_remaining
                    .map(|remaining| remaining.min(interval));
            }
            _ => {}
        }
    }

    /// Starts a new life from `Idle` or `Over`. A paused life is abandoned
    /// first. Ignored while counting down or running.
    pub fn start_or_restart(&mut self, now: u64) -> Result<(), GameError> {
        match self.state {
            SessionState::Countdown | SessionState::Running => return Ok(()),
            SessionState::Paused => {
                if let Some(life) = self.life.as_mut() {
                    life.abandon();
                }
                self.collect_life_events();
                self.paused_tick_remaining = None;
                self.transition(SessionState::Over);
                self.transition(SessionState::Idle);
            }
            SessionState::Over => self.transition(SessionState::Idle),
            SessionState::Idle => {}
        }

        let seed = self.rng.next_seed();
        let life = TickEngine::new(&self.options, self.high_score, Rng::new(seed))?;
        self.life = Some(life);
        self.pending_direction = None;
        self.next_tick_at = None;
        self.countdown_started_at = now;
        info!(
            seed,
            width = self.options.width,
            height = self.options.height,
            "starting life"
        );
        self.transition(SessionState::Countdown);
        Ok(())
    }

    /// Runs every tick due at or before `now`. Returns the number of steps taken.
    pub fn advance(&mut self, now: u64) -> usize {
        if self.state == SessionState::Countdown {
            let running_at = self.countdown_started_at.saturating_add(self.countdown_total_ms());
            if now < running_at {
                return 0;
            }
            self.transition(SessionState::Running);
            self.next_tick_at = Some(running_at.saturating_add(self.tick_interval_ms()));
        }
        if self.state != SessionState::Running {
            return 0;
        }

        let mut steps = 0;
        while let Some(at) = self.next_tick_at {
            if at > now {
                break;
            }
            if steps >= MAX_CATCH_UP_STEPS {
                debug!(behind_ms = now - at, "tick clock re-armed after stall");
                self.next_tick_at = Some(now.saturating_add(self.tick_interval_ms()));
                break;
            }
            let pending = self.pending_direction.take();
            let Some(life) = self.life.as_mut() else {
                break;
            };
            life.step(pending, at);
            steps += 1;
            self.collect_life_events();

            if self.life.as_ref().is_some_and(TickEngine::is_over) {
                self.next_tick_at = None;
                if let Some(summary) = self.last_summary() {
                    info!(
                        score = summary.final_score,
                        reason = ?summary.reason,
                        ticks = summary.ticks,
                        "life over"
                    );
                }
                self.transition(SessionState::Over);
                break;
            }
            self.next_tick_at = Some(at.saturating_add(self.tick_interval_ms()));
        }
        steps
    }

    /// When the driver should call `advance` next: the next countdown beat
    /// after `now`, or the next tick while running.
    pub fn next_deadline(&self, now: u64) -> Option<u64> {
        match self.state {
            SessionState::Countdown => {
                let start = self.countdown_started_at;
                let beat_ms = self.options.countdown_beat_ms.max(1);
                let running_at = start.saturating_add(self.countdown_total_ms());
                let next_beat = (1..=u64::from(self.options.countdown_beats))
                    .map(|beat| start + beat * beat_ms)
                    .find(|deadline| *deadline > now);
                Some(next_beat.unwrap_or(running_at))
            }
            SessionState::Running => self.next_tick_at,
            _ => None,
        }
    }

    pub fn countdown_view(&self, now: u64) -> Option<CountdownView> {
        if self.state != SessionState::Countdown {
            return None;
        }
        let elapsed = now.saturating_sub(self.countdown_started_at);
        let beat = elapsed / self.options.countdown_beat_ms.max(1);
        let beats = u64::from(self.options.countdown_beats);
        if beat < beats {
            Some(CountdownView::Beat((beats - beat) as u32))
        } else {
            Some(CountdownView::Go)
        }
    }

    /// Effective tick interval: selected base speed scaled by any tempo effect.
    pub fn tick_interval_ms(&self) -> u64 {
        let base = base_interval_ms(self.options.speed);
        self.life
            .as_ref()
            .map_or(base, |life| life.tick_interval_ms(base))
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self, now: u64) -> Snapshot {
        let interval = self.tick_interval_ms();
        let countdown = self.countdown_view(now);
        match self.life.as_ref() {
            Some(life) => {
                let effects = life.effects();
                let invincible_remaining_ms = if life.is_over() {
                    0
                } else {
                    effects.invincible_remaining_ms(now)
                };
                let registry = life.registry();
                Snapshot {
                    tick: life.tick(),
                    now_ms: now,
                    state: self.state,
                    snake: registry.snake_cells(),
                    direction: life.direction(),
                    food: registry.food(),
                    secondary_pickup: registry.rare_pickup(),
                    obstacles: registry.obstacle_cells(),
                    score: life.score(),
                    high_score: self.high_score,
                    arena: life.arena().view(),
                    invincible: invincible_remaining_ms > 0,
                    invincible_remaining_ms,
                    tempo: effects.tempo_view(now).filter(|view| view.remaining_ms > 0),
                    tick_interval_ms: interval,
                    countdown,
                }
            }
            None => Snapshot {
                tick: 0,
                now_ms: now,
                state: self.state,
                snake: Vec::new(),
                direction: Direction::Right,
                food: None,
                secondary_pickup: None,
                obstacles: Vec::new(),
                score: 0,
                high_score: self.high_score,
                arena: Arena::new(self.options.width, self.options.height).view(),
                invincible: false,
                invincible_remaining_ms: 0,
                tempo: None,
                tick_interval_ms: interval,
                countdown,
            },
        }
    }

    fn countdown_total_ms(&self) -> u64 {
        u64::from(self.options.countdown_beats) * self.options.countdown_beat_ms
            + self.options.go_marker_ms
    }

    fn collect_life_events(&mut self) {
        let Some(life) = self.life.as_mut() else {
            return;
        };
        self.high_score = self.high_score.max(life.high_score());
        self.events.extend(life.drain_events());
    }

    fn transition(&mut self, to: SessionState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        debug!(?from, ?to, "session state changed");
        self.events.push(GameEvent::StateChanged { from, to });
    }
}
