//! Which interval comes next.
//!
//! The cycle repeats every eight intervals:
//!
//! ```text
//! 1 P  2 S  3 P  4 S  5 P  6 S  7 P  8 L
//! ```

use tracing::debug;

use super::config::IntervalConfig;
use super::interval::{Category, Interval, IntervalState};
use crate::error::{CoreError, RepositoryError, Result};

const CYCLE_LEN: u64 = 8;

/// Category of the interval at 1-based `position` in the history.
pub fn category_for_position(position: u64) -> Category {
    if position % 2 == 1 {
        Category::Pomodoro
    } else if position % CYCLE_LEN == 0 {
        Category::LongBreak
    } else {
        Category::ShortBreak
    }
}

/// Create and persist the next interval in the cycle.
///
/// The returned interval is `NotStarted` and carries the id assigned by the
/// repository.
pub fn get_interval(config: &IntervalConfig) -> Result<Interval> {
    let repo = config.repo();
    let count = repo
        .count()
        .map_err(|e| CoreError::repository("counting intervals", e))?;
    let category = category_for_position(count + 1);

    let mut interval = Interval::new(category, config.duration_for(category));
    interval.id = repo
        .create(&interval)
        .map_err(|e| CoreError::repository("creating interval", e))?;

    debug!(id = interval.id, %category, position = count + 1, "created interval");
    Ok(interval)
}

/// The most recent interval if it can still be started, otherwise the next
/// one in the cycle.
pub fn resume_or_next(config: &IntervalConfig) -> Result<Interval> {
    match config.repo().last() {
        Ok(last) if matches!(last.state, IntervalState::NotStarted | IntervalState::Paused) => {
            debug!(id = last.id, state = %last.state, "resuming last interval");
            Ok(last)
        }
        Ok(_) | Err(RepositoryError::NoIntervals) => get_interval(config),
        Err(e) => Err(CoreError::repository("loading last interval", e)),
    }
}
