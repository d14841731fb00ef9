//! Per-category reporting over stored intervals.
//!
//! Only intervals that have been started count: a `NotStarted` record has
//! no start time to place it in a date range and no elapsed time to add.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::timer::{Category, Interval, IntervalConfig};

/// Half-open range `[from, to)` over interval start times.
/// A missing bound is unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Whole UTC days from `first` through `last` inclusive. A missing day
    /// leaves that side unbounded.
    pub fn days(first: Option<NaiveDate>, last: Option<NaiveDate>) -> Self {
        let midnight = |d: NaiveDate| d.and_time(chrono::NaiveTime::MIN).and_utc();
        Self {
            from: first.map(midnight),
            to: last.and_then(|d| d.succ_opt()).map(midnight),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at < to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryStats {
    pub count: u64,
    pub total: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategorySummary {
    pub categories: BTreeMap<Category, CategoryStats>,
}

impl CategorySummary {
    pub fn from_intervals<'a>(
        intervals: impl IntoIterator<Item = &'a Interval>,
        range: Option<&DateRange>,
    ) -> Self {
        let mut summary = Self::default();
        for interval in intervals {
            let Some(started) = interval.start_time else {
                continue;
            };
            if range.is_some_and(|r| !r.contains(started)) {
                continue;
            }
            summary.add(interval.category, interval.actual_duration);
        }
        summary
    }

    pub fn add(&mut self, category: Category, actual: Duration) {
        let stats = self.categories.entry(category).or_default();
        stats.count += 1;
        stats.total = stats.total.saturating_add(actual);
    }

    pub fn get(&self, category: Category) -> Option<&CategoryStats> {
        self.categories.get(&category)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn total_count(&self) -> u64 {
        self.categories.values().map(|s| s.count).sum()
    }

    /// Time spent in pomodoros.
    pub fn focus_time(&self) -> Duration {
        self.get(Category::Pomodoro)
            .map(|s| s.total)
            .unwrap_or_default()
    }

    /// Time spent in short and long breaks.
    pub fn break_time(&self) -> Duration {
        self.categories
            .iter()
            .filter(|(c, _)| c.is_break())
            .map(|(_, s)| s.total)
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// Category summary from the configured repository.
pub fn category_summary(
    config: &IntervalConfig,
    range: Option<&DateRange>,
) -> Result<CategorySummary> {
    config
        .repo()
        .category_summary(range)
        .map_err(|e| CoreError::repository("summarizing intervals", e))
}

/// Category summary per UTC day of the start time.
pub fn daily_summary(
    config: &IntervalConfig,
    range: Option<&DateRange>,
) -> Result<BTreeMap<NaiveDate, CategorySummary>> {
    let intervals = config
        .repo()
        .list()
        .map_err(|e| CoreError::repository("listing intervals", e))?;

    let mut days: BTreeMap<NaiveDate, CategorySummary> = BTreeMap::new();
    for interval in &intervals {
        let Some(started) = interval.start_time else {
            continue;
        };
        if range.is_some_and(|r| !r.contains(started)) {
            continue;
        }
        days.entry(started.date_naive())
            .or_default()
            .add(interval.category, interval.actual_duration);
    }
    Ok(days)
}
