use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::interval::Category;
use crate::storage::Repository;

/// Durations used whenever a configuration leaves a value unset (zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationDefaults {
    pub pomodoro: Duration,
    pub short_break: Duration,
    pub long_break: Duration,
}

impl Default for DurationDefaults {
    fn default() -> Self {
        Self {
            pomodoro: Duration::from_secs(25 * 60),
            short_break: Duration::from_secs(5 * 60),
            long_break: Duration::from_secs(15 * 60),
        }
    }
}

/// Engine configuration: durations plus the repository every operation
/// persists through.
///
/// Built once by the caller and passed by reference to
/// [`get_interval`](super::get_interval), [`Interval::start`](super::Interval::start)
/// and [`Interval::pause`](super::Interval::pause).
#[derive(Clone)]
pub struct IntervalConfig {
    repo: Arc<dyn Repository>,
    pub pomodoro_duration: Duration,
    pub short_break_duration: Duration,
    pub long_break_duration: Duration,
    /// Period of the running loop; every tick adds exactly this much.
    pub tick: Duration,
}

pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

impl IntervalConfig {
    /// Build a configuration with up to three positional overrides:
    /// pomodoro, short break, long break. Zero or missing values fall back
    /// to [`DurationDefaults::default`]; extra values are ignored.
    pub fn new(repo: Arc<dyn Repository>, overrides: &[Duration]) -> Self {
        Self::with_defaults(repo, DurationDefaults::default(), overrides)
    }

    pub fn with_defaults(
        repo: Arc<dyn Repository>,
        defaults: DurationDefaults,
        overrides: &[Duration],
    ) -> Self {
        let pick = |idx: usize, fallback: Duration| {
            overrides
                .get(idx)
                .copied()
                .filter(|d| !d.is_zero())
                .unwrap_or(fallback)
        };
        Self {
            pomodoro_duration: pick(0, defaults.pomodoro),
            short_break_duration: pick(1, defaults.short_break),
            long_break_duration: pick(2, defaults.long_break),
            tick: DEFAULT_TICK,
            repo,
        }
    }

    /// Replace the tick period. A zero period keeps the current one.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        if !tick.is_zero() {
            self.tick = tick;
        }
        self
    }

    pub fn repo(&self) -> &dyn Repository {
        self.repo.as_ref()
    }

    pub fn duration_for(&self, category: Category) -> Duration {
        match category {
            Category::Pomodoro => self.pomodoro_duration,
            Category::ShortBreak => self.short_break_duration,
            Category::LongBreak => self.long_break_duration,
        }
    }
}

impl fmt::Debug for IntervalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntervalConfig")
            .field("pomodoro_duration", &self.pomodoro_duration)
            .field("short_break_duration", &self.short_break_duration)
            .field("long_break_duration", &self.long_break_duration)
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}
