//! In-memory interval store.
//!
//! Used by tests and by the CLI when `storage.backend = "memory"`. Records
//! live in a mutex-guarded vector; ids are assigned sequentially from 1.

use std::sync::Mutex;

use uuid::Uuid;

use super::repository::Repository;
use crate::error::RepositoryError;
use crate::timer::{Interval, IntervalId, IntervalState};

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    intervals: Mutex<Vec<Interval>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn index_of(id: IntervalId, len: usize) -> Option<usize> {
    let idx = usize::try_from(id).ok()?.checked_sub(1)?;
    (idx < len).then_some(idx)
}

impl Repository for InMemoryRepository {
    fn create(&self, interval: &Interval) -> Result<IntervalId, RepositoryError> {
        let mut intervals = self.intervals.lock()?;
        let id = IntervalId::try_from(intervals.len() + 1)
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;
        let mut stored = interval.clone();
        stored.id = id;
        intervals.push(stored);
        Ok(id)
    }

    fn update(&self, interval: &Interval) -> Result<(), RepositoryError> {
        let mut intervals = self.intervals.lock()?;
        let idx = index_of(interval.id, intervals.len())
            .ok_or(RepositoryError::NotFound(interval.id))?;
        intervals[idx] = interval.clone();
        Ok(())
    }

    fn update_if(
        &self,
        interval: &Interval,
        expected_state: IntervalState,
        expected_lease: Option<Uuid>,
    ) -> Result<bool, RepositoryError> {
        let mut intervals = self.intervals.lock()?;
        let idx = index_of(interval.id, intervals.len())
            .ok_or(RepositoryError::NotFound(interval.id))?;
        let current = &intervals[idx];
        if current.state != expected_state || current.lease != expected_lease {
            return Ok(false);
        }
        intervals[idx] = interval.clone();
        Ok(true)
    }

    fn by_id(&self, id: IntervalId) -> Result<Interval, RepositoryError> {
        let intervals = self.intervals.lock()?;
        index_of(id, intervals.len())
            .and_then(|idx| intervals.get(idx))
            .cloned()
            .ok_or(RepositoryError::NotFound(id))
    }

    fn last(&self) -> Result<Interval, RepositoryError> {
        let intervals = self.intervals.lock()?;
        intervals.last().cloned().ok_or(RepositoryError::NoIntervals)
    }

    fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.intervals.lock()?.len() as u64)
    }

    fn list(&self) -> Result<Vec<Interval>, RepositoryError> {
        Ok(self.intervals.lock()?.clone())
    }
}
