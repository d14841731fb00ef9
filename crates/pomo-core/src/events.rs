use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{Category, Interval, IntervalId, IntervalState};

/// Every callback from the interval engine can be rendered as an Event.
/// The CLI prints them as JSON lines; other front-ends may forward them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    IntervalStarted {
        id: IntervalId,
        category: Category,
        planned_secs: u64,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    IntervalTicked {
        id: IntervalId,
        elapsed_secs: u64,
        remaining_secs: u64,
        progress_pct: f64,
        at: DateTime<Utc>,
    },
    IntervalPaused {
        id: IntervalId,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    IntervalCompleted {
        id: IntervalId,
        category: Category,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    IntervalCancelled {
        id: IntervalId,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    /// Full state of one interval, as printed by `pomo-cli status`.
    StateSnapshot {
        id: IntervalId,
        category: Category,
        state: IntervalState,
        planned_secs: u64,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn started(i: &Interval) -> Self {
        Event::IntervalStarted {
            id: i.id,
            category: i.category,
            planned_secs: i.planned_duration.as_secs(),
            elapsed_secs: i.actual_duration.as_secs(),
            at: Utc::now(),
        }
    }

    pub fn ticked(i: &Interval) -> Self {
        Event::IntervalTicked {
            id: i.id,
            elapsed_secs: i.actual_duration.as_secs(),
            remaining_secs: i.remaining().as_secs(),
            progress_pct: (i.progress() * 100.0).min(100.0),
            at: Utc::now(),
        }
    }

    pub fn completed(i: &Interval) -> Self {
        Event::IntervalCompleted {
            id: i.id,
            category: i.category,
            duration_secs: i.actual_duration.as_secs(),
            at: Utc::now(),
        }
    }

    /// Event for wherever `start` left the interval, if it stopped early.
    pub fn stopped(i: &Interval) -> Option<Self> {
        let at = Utc::now();
        match i.state {
            IntervalState::Paused => Some(Event::IntervalPaused {
                id: i.id,
                elapsed_secs: i.actual_duration.as_secs(),
                at,
            }),
            IntervalState::Cancelled => Some(Event::IntervalCancelled {
                id: i.id,
                elapsed_secs: i.actual_duration.as_secs(),
                at,
            }),
            _ => None,
        }
    }

    pub fn snapshot(i: &Interval) -> Self {
        Event::StateSnapshot {
            id: i.id,
            category: i.category,
            state: i.state,
            planned_secs: i.planned_duration.as_secs(),
            elapsed_secs: i.actual_duration.as_secs(),
            at: Utc::now(),
        }
    }
}
