//! Interval state machine and tick loop.
//!
//! ## State Transitions
//!
//! ```text
//! NotStarted -> Running -> (Done | Cancelled)
//!               Running <-> Paused
//! ```
//!
//! `start` drives the interval on the calling task, one tick per
//! `IntervalConfig::tick`, until it completes, is paused, or is cancelled.
//! Every transition is written to the repository before the in-memory value
//! changes, so the caller never holds a state the store rejected.
//!
//! ## Usage
//!
//! ```ignore
//! let (handle, token) = cancel_pair();
//! let mut interval = get_interval(&config)?;
//! interval
//!     .start(&token, &config, |_| {}, |_| TickDirective::Continue, |_| {})
//!     .await?;
//! ```

use chrono::{SubsecRound, Utc};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::cancel::CancelToken;
use super::config::{IntervalConfig, DEFAULT_TICK};
use super::interval::{Interval, IntervalState};
use crate::error::{CoreError, Result};

/// What the driver wants after observing a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickDirective {
    #[default]
    Continue,
    /// Stop ticking and leave the interval `Paused`.
    Pause,
    /// Stop ticking and mark the interval `Cancelled`.
    Cancel,
}

impl Interval {
    /// Run the interval until it is done, paused, or cancelled.
    ///
    /// `on_start` sees the interval just after it entered `Running`;
    /// `on_tick` sees it after every tick and steers the loop through its
    /// [`TickDirective`]; `on_end` runs only on natural completion.
    /// Callbacks run on the driving task and should return promptly.
    ///
    /// A `Paused` interval resumes from its accumulated duration.
    ///
    /// # Errors
    /// - [`CoreError::AlreadyFinished`] if the interval is `Done` or `Cancelled`.
    /// - [`CoreError::Leased`] if the stored record is already `Running`,
    ///   another caller claimed it first, or another driver took over while
    ///   this one was ticking. A write is only made while the record still
    ///   holds the state and lease this driver last saw.
    /// - [`CoreError::Cancelled`] after the token fired or `on_tick` asked to
    ///   cancel; the `Cancelled` state has been persisted.
    /// - [`CoreError::Repository`] if any read or write fails.
    pub async fn start<S, T, E>(
        &mut self,
        cancel: &CancelToken,
        config: &IntervalConfig,
        on_start: S,
        mut on_tick: T,
        on_end: E,
    ) -> Result<()>
    where
        S: FnOnce(&Interval),
        T: FnMut(&Interval) -> TickDirective,
        E: FnOnce(&Interval),
    {
        if self.state.is_terminal() {
            return Err(CoreError::AlreadyFinished { id: self.id });
        }

        let stored = self.load(config, "loading interval")?;
        if stored.state.is_terminal() {
            *self = stored;
            return Err(CoreError::AlreadyFinished { id: self.id });
        }
        if stored.state == IntervalState::Running {
            warn!(id = self.id, "interval already running under another driver");
            return Err(CoreError::Leased { id: self.id });
        }

        let (expected_state, expected_lease) = (stored.state, stored.lease);
        let mut next = stored;
        next.state = IntervalState::Running;
        next.start_time = Some(Utc::now().trunc_subsecs(3));
        next.lease = Some(Uuid::new_v4());
        on_start(&next);
        if !self.commit(config, expected_state, expected_lease, next, "starting interval")? {
            // Someone else claimed or finished the record since we loaded it.
            let stored = self.load(config, "reloading interval")?;
            warn!(id = self.id, state = %stored.state, "lost the race to start interval");
            return Err(if stored.state.is_terminal() {
                CoreError::AlreadyFinished { id: self.id }
            } else {
                CoreError::Leased { id: self.id }
            });
        }
        info!(
            id = self.id,
            category = %self.category,
            elapsed_ms = self.actual_duration.as_millis() as u64,
            planned_ms = self.planned_duration.as_millis() as u64,
            "interval running"
        );

        if self.is_complete() {
            return self.finish(config, self.clone(), on_end);
        }

        let tick = if config.tick.is_zero() {
            DEFAULT_TICK
        } else {
            config.tick
        };
        let mut ticker = interval_at(Instant::now() + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cancel = cancel.clone();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return self.cancel(config, self.clone());
                }
                _ = ticker.tick() => {}
            }

            let stored = self.load(config, "reloading interval")?;
            if stored.lease != self.lease {
                return self.yield_to(stored);
            }

            let mut next = self.clone();
            next.actual_duration = next
                .actual_duration
                .saturating_add(tick)
                .min(next.planned_duration);
            let directive = on_tick(&next);
            debug!(
                id = self.id,
                elapsed_ms = next.actual_duration.as_millis() as u64,
                ?directive,
                "tick"
            );

            // Reaching the plan on this tick wins over any directive.
            if next.is_complete() {
                return self.finish(config, next, on_end);
            }

            match directive {
                TickDirective::Continue => {
                    if !self.commit_held(config, next, "recording tick")? {
                        return self.reload_and_yield(config);
                    }
                }
                TickDirective::Pause => {
                    next.state = IntervalState::Paused;
                    next.lease = None;
                    if !self.commit_held(config, next, "pausing interval")? {
                        return self.reload_and_yield(config);
                    }
                    info!(
                        id = self.id,
                        elapsed_ms = self.actual_duration.as_millis() as u64,
                        "interval paused"
                    );
                    return Ok(());
                }
                TickDirective::Cancel => return self.cancel(config, next),
            }
        }
    }

    /// Pause a running interval.
    ///
    /// The accumulated duration stays at the last recorded tick. This is
    /// also how a caller other than the driver stops a running interval:
    /// the driver notices on its next tick, or when its next write is
    /// refused, and returns.
    ///
    /// # Errors
    /// [`CoreError::IntervalNotRunning`] unless both this value and the
    /// stored record are `Running` at the moment of the write; nothing is
    /// written in that case.
    pub fn pause(&mut self, config: &IntervalConfig) -> Result<()> {
        if self.state != IntervalState::Running {
            return Err(CoreError::IntervalNotRunning { id: self.id });
        }
        let mut next = self.load(config, "loading interval")?;
        if next.state != IntervalState::Running {
            return Err(CoreError::IntervalNotRunning { id: self.id });
        }
        let held_by = next.lease;
        next.state = IntervalState::Paused;
        next.lease = None;
        if !self.commit(config, IntervalState::Running, held_by, next, "pausing interval")? {
            return Err(CoreError::IntervalNotRunning { id: self.id });
        }
        info!(
            id = self.id,
            elapsed_ms = self.actual_duration.as_millis() as u64,
            "interval paused"
        );
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn load(&self, config: &IntervalConfig, context: &'static str) -> Result<Interval> {
        config
            .repo()
            .by_id(self.id)
            .map_err(|e| CoreError::repository(context, e))
    }

    /// Persist `next` if the stored record is still in `expected_state`
    /// under `expected_lease`, then adopt it. Returns `false` and leaves
    /// `self` untouched when the store refused the write.
    fn commit(
        &mut self,
        config: &IntervalConfig,
        expected_state: IntervalState,
        expected_lease: Option<Uuid>,
        next: Interval,
        context: &'static str,
    ) -> Result<bool> {
        let written = config
            .repo()
            .update_if(&next, expected_state, expected_lease)
            .map_err(|e| CoreError::repository(context, e))?;
        if written {
            *self = next;
        }
        Ok(written)
    }

    /// Commit while this driver holds the lease.
    fn commit_held(
        &mut self,
        config: &IntervalConfig,
        next: Interval,
        context: &'static str,
    ) -> Result<bool> {
        let lease = self.lease;
        self.commit(config, IntervalState::Running, lease, next, context)
    }

    fn finish<E>(&mut self, config: &IntervalConfig, mut next: Interval, on_end: E) -> Result<()>
    where
        E: FnOnce(&Interval),
    {
        next.state = IntervalState::Done;
        next.actual_duration = next.planned_duration;
        next.lease = None;
        on_end(&next);
        if !self.commit_held(config, next, "completing interval")? {
            return self.reload_and_yield(config);
        }
        info!(id = self.id, category = %self.category, "interval done");
        Ok(())
    }

    fn cancel(&mut self, config: &IntervalConfig, mut next: Interval) -> Result<()> {
        next.state = IntervalState::Cancelled;
        next.lease = None;
        if !self.commit_held(config, next, "cancelling interval")? {
            return self.reload_and_yield(config);
        }
        info!(
            id = self.id,
            elapsed_ms = self.actual_duration.as_millis() as u64,
            "interval cancelled"
        );
        Err(CoreError::Cancelled { id: self.id })
    }

    fn reload_and_yield(&mut self, config: &IntervalConfig) -> Result<()> {
        let stored = self.load(config, "reloading interval")?;
        self.yield_to(stored)
    }

    /// Another caller changed the record under us; stop driving it.
    fn yield_to(&mut self, stored: Interval) -> Result<()> {
        let state = stored.state;
        *self = stored;
        match state {
            IntervalState::Paused => {
                info!(id = self.id, "interval paused by another caller");
                Ok(())
            }
            s if s.is_terminal() => Err(CoreError::AlreadyFinished { id: self.id }),
            _ => {
                warn!(id = self.id, "interval taken over by another driver");
                Err(CoreError::Leased { id: self.id })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RepositoryError;
    use crate::storage::{InMemoryRepository, Repository};
    use crate::timer::{cancel_pair, get_interval, Category, IntervalId};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const TICK: Duration = Duration::from_secs(1);

    fn config(repo: Arc<dyn Repository>, secs: u32) -> IntervalConfig {
        let d = secs * TICK;
        IntervalConfig::new(repo, &[d, d, d]).with_tick(TICK)
    }

    fn setup(secs: u32) -> (Arc<InMemoryRepository>, IntervalConfig) {
        let repo = Arc::new(InMemoryRepository::new());
        let cfg = config(repo.clone(), secs);
        (repo, cfg)
    }

    #[tokio::test(start_paused = true)]
    async fn runs_to_completion() {
        let (repo, cfg) = setup(3);
        let mut interval = get_interval(&cfg).unwrap();
        let (_handle, token) = cancel_pair();

        let mut started = 0;
        let mut ticks = Vec::new();
        let mut ended = None;
        interval
            .start(
                &token,
                &cfg,
                |i| {
                    started += 1;
                    assert_eq!(i.state, IntervalState::Running);
                    assert!(i.actual_duration < i.planned_duration);
                    assert!(i.start_time.is_some());
                },
                |i| {
                    assert_eq!(i.state, IntervalState::Running);
                    ticks.push(i.actual_duration);
                    TickDirective::Continue
                },
                |i| ended = Some(i.clone()),
            )
            .await
            .unwrap();

        assert_eq!(started, 1);
        assert_eq!(ticks, vec![TICK, 2 * TICK, 3 * TICK]);
        let ended = ended.unwrap();
        assert_eq!(ended.state, IntervalState::Done);

        assert_eq!(interval.state, IntervalState::Done);
        assert_eq!(interval.actual_duration, interval.planned_duration);
        assert!(interval.lease.is_none());
        assert_eq!(repo.by_id(interval.id).unwrap(), interval);
    }

    #[tokio::test(start_paused = true)]
    async fn coarse_tick_truncates_to_plan() {
        let repo = Arc::new(InMemoryRepository::new());
        let cfg = IntervalConfig::new(repo.clone(), &[Duration::from_millis(3)])
            .with_tick(Duration::from_secs(1));
        let mut interval = get_interval(&cfg).unwrap();
        assert_eq!(interval.category, Category::Pomodoro);
        interval
            .start(&CancelToken::never(), &cfg, |_| {}, |_| TickDirective::Continue, |_| {})
            .await
            .unwrap();
        let stored = repo.by_id(interval.id).unwrap();
        assert_eq!(stored.state, IntervalState::Done);
        assert_eq!(stored.actual_duration, Duration::from_millis(3));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_token_stops_after_k_ticks() {
        let (repo, cfg) = setup(5);
        let mut interval = get_interval(&cfg).unwrap();
        let (handle, token) = cancel_pair();

        let mut ticks = 0;
        let err = interval
            .start(
                &token,
                &cfg,
                |_| {},
                |_| {
                    ticks += 1;
                    if ticks == 2 {
                        handle.cancel();
                    }
                    TickDirective::Continue
                },
                |_| panic!("end callback should not run on cancel"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Cancelled { id } if id == interval.id));
        assert_eq!(ticks, 2);
        let stored = repo.by_id(interval.id).unwrap();
        assert_eq!(stored.state, IntervalState::Cancelled);
        assert_eq!(stored.actual_duration, 2 * TICK);
        assert_eq!(stored, interval);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_directive_marks_cancelled() {
        let (repo, cfg) = setup(5);
        let mut interval = get_interval(&cfg).unwrap();
        let err = interval
            .start(
                &CancelToken::never(),
                &cfg,
                |_| {},
                |_| TickDirective::Cancel,
                |_| panic!("end callback should not run on cancel"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Cancelled { .. }));
        let stored = repo.by_id(interval.id).unwrap();
        assert_eq!(stored.state, IntervalState::Cancelled);
        assert_eq!(stored.actual_duration, TICK);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_interval_cannot_restart() {
        let (repo, cfg) = setup(5);
        let mut interval = get_interval(&cfg).unwrap();
        let (handle, token) = cancel_pair();
        handle.cancel();
        let err = interval
            .start(&token, &cfg, |_| {}, |_| TickDirective::Continue, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Cancelled { .. }));
        assert_eq!(interval.actual_duration, Duration::ZERO);

        let before = repo.by_id(interval.id).unwrap();
        let err = interval
            .start(&CancelToken::never(), &cfg, |_| {}, |_| TickDirective::Continue, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyFinished { .. }));
        assert_eq!(repo.by_id(interval.id).unwrap(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_from_tick_then_resume() {
        let (repo, cfg) = setup(4);
        let mut interval = get_interval(&cfg).unwrap();
        let token = CancelToken::never();

        let mut ticks = 0;
        interval
            .start(
                &token,
                &cfg,
                |_| {},
                |_| {
                    ticks += 1;
                    if ticks == 1 {
                        TickDirective::Pause
                    } else {
                        TickDirective::Continue
                    }
                },
                |_| panic!("end callback should not run on pause"),
            )
            .await
            .unwrap();

        assert_eq!(interval.state, IntervalState::Paused);
        assert_eq!(interval.actual_duration, TICK);
        assert_eq!(repo.by_id(interval.id).unwrap(), interval);

        let mut resumed = Vec::new();
        let mut ended = false;
        interval
            .start(
                &token,
                &cfg,
                |i| assert_eq!(i.actual_duration, TICK),
                |i| {
                    resumed.push(i.actual_duration);
                    TickDirective::Continue
                },
                |_| ended = true,
            )
            .await
            .unwrap();

        assert!(ended);
        assert_eq!(resumed, vec![2 * TICK, 3 * TICK, 4 * TICK]);
        assert_eq!(repo.by_id(interval.id).unwrap().state, IntervalState::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_wins_over_pause_on_last_tick() {
        let (_repo, cfg) = setup(1);
        let mut interval = get_interval(&cfg).unwrap();
        let mut ended = false;
        interval
            .start(
                &CancelToken::never(),
                &cfg,
                |_| {},
                |_| TickDirective::Pause,
                |_| ended = true,
            )
            .await
            .unwrap();
        assert!(ended);
        assert_eq!(interval.state, IntervalState::Done);
    }

    #[test]
    fn pause_requires_running() {
        let (repo, cfg) = setup(2);
        let mut interval = get_interval(&cfg).unwrap();
        let before = repo.by_id(interval.id).unwrap();

        let err = interval.pause(&cfg).unwrap_err();
        assert!(matches!(err, CoreError::IntervalNotRunning { id } if id == interval.id));
        assert_eq!(repo.by_id(interval.id).unwrap(), before);

        let mut done = before.clone();
        done.state = IntervalState::Done;
        done.actual_duration = done.planned_duration;
        repo.update(&done).unwrap();
        let mut stale = done.clone();
        assert!(matches!(
            stale.pause(&cfg),
            Err(CoreError::IntervalNotRunning { .. })
        ));
        assert_eq!(repo.by_id(interval.id).unwrap(), done);
    }

    #[test]
    fn stale_running_copy_cannot_pause_finished_record() {
        let (repo, cfg) = setup(2);
        let interval = get_interval(&cfg).unwrap();
        let mut running = interval.clone();
        running.state = IntervalState::Running;
        let mut done = interval.clone();
        done.state = IntervalState::Done;
        repo.update(&done).unwrap();

        assert!(matches!(
            running.pause(&cfg),
            Err(CoreError::IntervalNotRunning { .. })
        ));
        assert_eq!(repo.by_id(interval.id).unwrap().state, IntervalState::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn start_refuses_record_running_elsewhere() {
        let (repo, cfg) = setup(2);
        let interval = get_interval(&cfg).unwrap();
        let mut elsewhere = interval.clone();
        elsewhere.state = IntervalState::Running;
        elsewhere.lease = Some(Uuid::new_v4());
        repo.update(&elsewhere).unwrap();

        let mut mine = interval.clone();
        let err = mine
            .start(&CancelToken::never(), &cfg, |_| {}, |_| TickDirective::Continue, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Leased { .. }));
        assert_eq!(repo.by_id(interval.id).unwrap(), elsewhere);

        // Recovery: pause the stale record, then start normally.
        let mut stale = repo.by_id(interval.id).unwrap();
        stale.pause(&cfg).unwrap();
        mine.start(&CancelToken::never(), &cfg, |_| {}, |_| TickDirective::Continue, |_| {})
            .await
            .unwrap();
        assert_eq!(mine.state, IntervalState::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn external_pause_stops_the_driver() {
        let (repo, cfg) = setup(10);
        let mut interval = get_interval(&cfg).unwrap();
        let id = interval.id;

        let other_cfg = cfg.clone();
        let pauser = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            let mut copy = other_cfg.repo().by_id(id).unwrap();
            copy.pause(&other_cfg).unwrap();
        });

        interval
            .start(
                &CancelToken::never(),
                &cfg,
                |_| {},
                |_| TickDirective::Continue,
                |_| panic!("end callback should not run on pause"),
            )
            .await
            .unwrap();
        pauser.await.unwrap();

        assert_eq!(interval.state, IntervalState::Paused);
        assert_eq!(interval.actual_duration, 2 * TICK);
        assert_eq!(repo.by_id(id).unwrap(), interval);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_during_tick_callback_is_kept() {
        let (repo, cfg) = setup(4);
        let mut interval = get_interval(&cfg).unwrap();
        let id = interval.id;

        let mut ticks = 0;
        interval
            .start(
                &CancelToken::never(),
                &cfg,
                |_| {},
                |_| {
                    ticks += 1;
                    if ticks == 2 {
                        let mut copy = cfg.repo().by_id(id).unwrap();
                        copy.pause(&cfg).unwrap();
                    }
                    TickDirective::Continue
                },
                |_| panic!("end callback should not run on pause"),
            )
            .await
            .unwrap();

        assert_eq!(ticks, 2);
        let stored = repo.by_id(id).unwrap();
        assert_eq!(stored.state, IntervalState::Paused);
        assert_eq!(stored.actual_duration, TICK);
        assert!(stored.lease.is_none());
        assert_eq!(interval, stored);
    }

    #[tokio::test(start_paused = true)]
    async fn start_loses_to_a_rival_claim() {
        let (repo, cfg) = setup(3);
        let mut interval = get_interval(&cfg).unwrap();
        let before = interval.clone();
        let mut rival = interval.clone();
        rival.state = IntervalState::Running;
        rival.lease = Some(Uuid::new_v4());

        let err = interval
            .start(
                &CancelToken::never(),
                &cfg,
                |_| repo.update(&rival).unwrap(),
                |_| panic!("tick callback should not run for the losing driver"),
                |_| panic!("end callback should not run for the losing driver"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Leased { .. }));
        assert_eq!(repo.by_id(interval.id).unwrap(), rival);
        assert_eq!(interval, before);
    }

    /// Delegates to an in-memory store, applying a queued write from another
    /// caller just before the next conditional write lands.
    struct InterleavedRepository {
        inner: InMemoryRepository,
        queued: Mutex<Option<Interval>>,
    }

    impl Repository for InterleavedRepository {
        fn create(&self, interval: &Interval) -> Result<IntervalId, RepositoryError> {
            self.inner.create(interval)
        }
        fn update(&self, interval: &Interval) -> Result<(), RepositoryError> {
            self.inner.update(interval)
        }
        fn update_if(
            &self,
            interval: &Interval,
            expected_state: IntervalState,
            expected_lease: Option<Uuid>,
        ) -> Result<bool, RepositoryError> {
            if let Some(other) = self.queued.lock().unwrap().take() {
                self.inner.update(&other)?;
            }
            self.inner.update_if(interval, expected_state, expected_lease)
        }
        fn by_id(&self, id: IntervalId) -> Result<Interval, RepositoryError> {
            self.inner.by_id(id)
        }
        fn last(&self) -> Result<Interval, RepositoryError> {
            self.inner.last()
        }
        fn count(&self) -> Result<u64, RepositoryError> {
            self.inner.count()
        }
        fn list(&self) -> Result<Vec<Interval>, RepositoryError> {
            self.inner.list()
        }
    }

    #[test]
    fn pause_cannot_reopen_interval_finished_mid_call() {
        let repo = Arc::new(InterleavedRepository {
            inner: InMemoryRepository::new(),
            queued: Mutex::new(None),
        });
        let cfg = config(repo.clone(), 3);
        let interval = get_interval(&cfg).unwrap();

        let mut running = interval.clone();
        running.state = IntervalState::Running;
        running.lease = Some(Uuid::new_v4());
        running.actual_duration = 2 * TICK;
        repo.update(&running).unwrap();

        // The driver's final write lands between pause's read and its write.
        let mut done = running.clone();
        done.state = IntervalState::Done;
        done.actual_duration = done.planned_duration;
        done.lease = None;
        *repo.queued.lock().unwrap() = Some(done.clone());

        let mut copy = repo.by_id(interval.id).unwrap();
        let err = copy.pause(&cfg).unwrap_err();
        assert!(matches!(err, CoreError::IntervalNotRunning { .. }));
        assert_eq!(repo.by_id(interval.id).unwrap(), done);
        assert_eq!(copy, running);
    }

    /// Delegates to an in-memory store but fails conditional writes once
    /// `budget` of them have succeeded.
    struct FlakyRepository {
        inner: InMemoryRepository,
        budget: AtomicUsize,
    }

    impl Repository for FlakyRepository {
        fn create(&self, interval: &Interval) -> Result<IntervalId, RepositoryError> {
            self.inner.create(interval)
        }
        fn update(&self, interval: &Interval) -> Result<(), RepositoryError> {
            self.inner.update(interval)
        }
        fn update_if(
            &self,
            interval: &Interval,
            expected_state: IntervalState,
            expected_lease: Option<Uuid>,
        ) -> Result<bool, RepositoryError> {
            let left = self.budget.load(Ordering::SeqCst);
            if left == 0 {
                return Err(RepositoryError::QueryFailed("disk full".into()));
            }
            self.budget.store(left - 1, Ordering::SeqCst);
            self.inner.update_if(interval, expected_state, expected_lease)
        }
        fn by_id(&self, id: IntervalId) -> Result<Interval, RepositoryError> {
            self.inner.by_id(id)
        }
        fn last(&self) -> Result<Interval, RepositoryError> {
            self.inner.last()
        }
        fn count(&self) -> Result<u64, RepositoryError> {
            self.inner.count()
        }
        fn list(&self) -> Result<Vec<Interval>, RepositoryError> {
            self.inner.list()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_leaves_last_committed_state() {
        // Start plus two ticks succeed, the third tick's write fails.
        let repo = Arc::new(FlakyRepository {
            inner: InMemoryRepository::new(),
            budget: AtomicUsize::new(3),
        });
        let cfg = config(repo.clone(), 5);
        let mut interval = get_interval(&cfg).unwrap();

        let err = interval
            .start(&CancelToken::never(), &cfg, |_| {}, |_| TickDirective::Continue, |_| {})
            .await
            .unwrap_err();

        assert!(matches!(
            err.repository_error(),
            Some(RepositoryError::QueryFailed(_))
        ));
        assert_eq!(interval.state, IntervalState::Running);
        assert_eq!(interval.actual_duration, 2 * TICK);
        assert_eq!(repo.by_id(interval.id).unwrap(), interval);
    }

    #[tokio::test(start_paused = true)]
    async fn finished_interval_is_rejected_without_mutation() {
        let (repo, cfg) = setup(1);
        let mut interval = get_interval(&cfg).unwrap();
        interval
            .start(&CancelToken::never(), &cfg, |_| {}, |_| TickDirective::Continue, |_| {})
            .await
            .unwrap();
        let before = repo.by_id(interval.id).unwrap();
        let err = interval
            .start(
                &CancelToken::never(),
                &cfg,
                |_| panic!("start callback should not run"),
                |_| TickDirective::Continue,
                |_| {},
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyFinished { .. }));
        assert_eq!(repo.by_id(interval.id).unwrap(), before);
        assert_eq!(interval, before);
    }
}
