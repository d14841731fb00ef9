//! # pomo Core Library
//!
//! This library provides the interval timer engine behind the `pomo`
//! Pomodoro timer: one timed work or break interval at a time, driven on a
//! tokio task and persisted to a pluggable store on every tick.
//!
//! ## Architecture
//!
//! - **Timer Engine**: `Interval::start` runs a tick loop that can complete,
//!   be paused by its tick callback or another caller, or be cancelled
//! - **Selection**: `get_interval` picks the next category from history
//! - **Storage**: `Repository` trait with in-memory and SQLite backends, and
//!   TOML-based settings
//! - **Stats**: per-category and per-day summaries
//!
//! ## Key Components
//!
//! - [`Interval`]: the timed unit and its state machine
//! - [`IntervalConfig`]: durations plus the repository binding
//! - [`Repository`]: persistence contract
//! - [`CategorySummary`]: reporting aggregate

pub mod error;
pub mod events;
pub mod stats;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, RepositoryError};
pub use events::Event;
pub use stats::{category_summary, daily_summary, CategoryStats, CategorySummary, DateRange};
pub use storage::{InMemoryRepository, Repository, Settings, SqliteRepository};
pub use timer::{
    cancel_pair, get_interval, resume_or_next, CancelHandle, CancelToken, Category, Interval,
    IntervalConfig, IntervalId, IntervalState, TickDirective,
};
