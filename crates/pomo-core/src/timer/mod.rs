mod cancel;
mod config;
mod engine;
mod interval;
mod selection;

pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use config::{DurationDefaults, IntervalConfig, DEFAULT_TICK};
pub use engine::TickDirective;
pub use interval::{Category, Interval, IntervalId, IntervalState};
pub use selection::{category_for_position, get_interval, resume_or_next};
