//! Persistence contract for interval records.

use uuid::Uuid;

use crate::error::RepositoryError;
use crate::stats::{CategorySummary, DateRange};
use crate::timer::{Interval, IntervalId, IntervalState};

/// Storage backend for intervals.
///
/// Implementations must be safe to share between tasks: several intervals
/// may be driven concurrently against the same store, so every method takes
/// `&self` and serializes mutation internally.
pub trait Repository: Send + Sync {
    /// Persist a new interval and return its assigned id.
    ///
    /// The id already set on `interval` is ignored.
    fn create(&self, interval: &Interval) -> Result<IntervalId, RepositoryError>;

    /// Overwrite the stored interval carrying `interval.id`.
    ///
    /// # Errors
    /// [`RepositoryError::NotFound`] if no such record exists.
    fn update(&self, interval: &Interval) -> Result<(), RepositoryError>;

    /// Overwrite the stored interval only if it is still in `expected_state`
    /// and holds `expected_lease`, checking and writing in one step.
    ///
    /// Returns `false` and writes nothing when the stored record no longer
    /// matches.
    ///
    /// # Errors
    /// [`RepositoryError::NotFound`] if no such record exists.
    fn update_if(
        &self,
        interval: &Interval,
        expected_state: IntervalState,
        expected_lease: Option<Uuid>,
    ) -> Result<bool, RepositoryError>;

    /// # Errors
    /// [`RepositoryError::NotFound`] if no such record exists.
    fn by_id(&self, id: IntervalId) -> Result<Interval, RepositoryError>;

    /// The most recently created interval.
    ///
    /// # Errors
    /// [`RepositoryError::NoIntervals`] when the store is empty.
    fn last(&self) -> Result<Interval, RepositoryError>;

    /// Number of intervals ever created.
    fn count(&self) -> Result<u64, RepositoryError>;

    /// Every stored interval in creation order.
    fn list(&self) -> Result<Vec<Interval>, RepositoryError>;

    /// Count and total actual duration per category, limited to started
    /// intervals whose start time falls inside `range`.
    fn category_summary(
        &self,
        range: Option<&DateRange>,
    ) -> Result<CategorySummary, RepositoryError> {
        Ok(CategorySummary::from_intervals(self.list()?.iter(), range))
    }
}
