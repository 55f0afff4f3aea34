use crate::types::{EffectKind, TempoKind, TempoView};

#[derive(Clone, Copy, Debug, PartialEq)]
struct TempoEffect {
    kind: TempoKind,
    multiplier: f32,
    expires_at: u64,
}

/// Deadline-based status effects. Deadlines are compared against the `now`
/// handed in by the caller, so nothing fires on its own.
#[derive(Clone, Debug, Default)]
pub struct EffectScheduler {
    tempo: Option<TempoEffect>,
    invincible_until: Option<u64>,
    frozen_at: Option<u64>,
}

impl EffectScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any running tempo effect; multipliers never stack.
    pub fn apply_tempo(&mut self, kind: TempoKind, multiplier: f32, duration_ms: u64, now: u64) {
        self.tempo = Some(TempoEffect {
            kind,
            multiplier,
            expires_at: now.saturating_add(duration_ms),
        });
    }

    pub fn apply_invincibility(&mut self, duration_ms: u64, now: u64) {
        self.invincible_until = Some(now.saturating_add(duration_ms));
    }

    /// Drops every effect whose deadline is at or before `now`.
    pub fn tick(&mut self, now: u64) -> Vec<EffectKind> {
        if self.frozen_at.is_some() {
            return Vec::new();
        }
        let mut expired = Vec::new();
        if let Some(tempo) = self.tempo {
            if tempo.expires_at <= now {
                self.tempo = None;
                expired.push(EffectKind::from(tempo.kind));
            }
        }
        if let Some(until) = self.invincible_until {
            if until <= now {
                self.invincible_until = None;
                expired.push(EffectKind::Invincibility);
            }
        }
        expired
    }

    pub fn freeze(&mut self, now: u64) {
        if self.frozen_at.is_none() {
            self.frozen_at = Some(now);
        }
    }

    /// Pushes every deadline back by the time spent frozen.
    pub fn resume(&mut self, now: u64) {
        let Some(frozen_at) = self.frozen_at.take() else {
            return;
        };
        let paused_for = now.saturating_sub(frozen_at);
        if let Some(tempo) = self.tempo.as_mut() {
            tempo.expires_at = tempo.expires_at.saturating_add(paused_for);
        }
        if let Some(until) = self.invincible_until.as_mut() {
            *until = until.saturating_add(paused_for);
        }
    }

    pub fn tempo_kind(&self) -> Option<TempoKind> {
        self.tempo.map(|tempo| tempo.kind)
    }

    pub fn tempo_multiplier(&self) -> f32 {
        self.tempo.map_or(1.0, |tempo| tempo.multiplier)
    }

    pub fn is_invincible_at(&self, now: u64) -> bool {
        self.invincible_until
            .is_some_and(|until| until > self.clock(now))
    }

    pub fn has_invincibility(&self) -> bool {
        self.invincible_until.is_some()
    }

    pub fn invincible_remaining_ms(&self, now: u64) -> u64 {
        self.invincible_until
            .map_or(0, |until| until.saturating_sub(self.clock(now)))
    }

    pub fn tempo_view(&self, now: u64) -> Option<TempoView> {
        self.tempo.map(|tempo| TempoView {
            kind: tempo.kind,
            remaining_ms: tempo.expires_at.saturating_sub(self.clock(now)),
        })
    }

    /// Time as seen by the effects: stops at the freeze point while paused.
    fn clock(&self, now: u64) -> u64 {
        self.frozen_at.unwrap_or(now)
    }
}
