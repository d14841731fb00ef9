//! Reporting over completed and in-progress intervals.

mod summary;

pub use summary::{category_summary, daily_summary, CategoryStats, CategorySummary, DateRange};
