use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier assigned by the repository when an interval is created.
pub type IntervalId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Pomodoro,
    ShortBreak,
    LongBreak,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Pomodoro => "pomodoro",
            Category::ShortBreak => "short_break",
            Category::LongBreak => "long_break",
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, Category::Pomodoro)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pomodoro" => Ok(Category::Pomodoro),
            "short_break" => Ok(Category::ShortBreak),
            "long_break" => Ok(Category::LongBreak),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalState {
    NotStarted,
    Running,
    Paused,
    Done,
    Cancelled,
}

impl IntervalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalState::NotStarted => "not_started",
            IntervalState::Running => "running",
            IntervalState::Paused => "paused",
            IntervalState::Done => "done",
            IntervalState::Cancelled => "cancelled",
        }
    }

    /// `Done` and `Cancelled` never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, IntervalState::Done | IntervalState::Cancelled)
    }
}

impl fmt::Display for IntervalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntervalState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(IntervalState::NotStarted),
            "running" => Ok(IntervalState::Running),
            "paused" => Ok(IntervalState::Paused),
            "done" => Ok(IntervalState::Done),
            "cancelled" => Ok(IntervalState::Cancelled),
            other => Err(format!("unknown interval state: {other}")),
        }
    }
}

/// One timed unit of work or break.
///
/// Instances are created by [`get_interval`](super::get_interval) and driven
/// through [`start`](Interval::start) and [`pause`](Interval::pause). The
/// value held by the driver always matches the last record written to the
/// repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub id: IntervalId,
    pub category: Category,
    pub planned_duration: Duration,
    pub actual_duration: Duration,
    pub state: IntervalState,
    /// Most recent transition into `Running`.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Driver currently running this interval; only set while `Running`.
    #[serde(default)]
    pub lease: Option<Uuid>,
}

impl Interval {
    /// A fresh, not yet persisted interval. The id is assigned by the repository.
    pub fn new(category: Category, planned_duration: Duration) -> Self {
        Self {
            id: 0,
            category,
            planned_duration,
            actual_duration: Duration::ZERO,
            state: IntervalState::NotStarted,
            start_time: None,
            lease: None,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.planned_duration.saturating_sub(self.actual_duration)
    }

    /// 0.0 .. 1.0 progress within the interval.
    pub fn progress(&self) -> f64 {
        if self.planned_duration.is_zero() {
            return 1.0;
        }
        (self.actual_duration.as_secs_f64() / self.planned_duration.as_secs_f64()).min(1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.actual_duration >= self.planned_duration
    }
}
