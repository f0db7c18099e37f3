//! Bounded fire-and-forget job dispatch.
//!
//! [`NotificationDispatcher`] caps how many notification jobs run at once.
//! Jobs handed to [`NotificationDispatcher::submit`] run on their own tokio
//! task: the caller never waits for a slot, and a job's failure is logged here
//! and never reported back to whoever submitted it.
//!
//! Slots are counted with a [`Semaphore`]. A [`DispatchSlot`] owns one permit
//! and gives it back when dropped, so a slot is released exactly once on every
//! exit path of a job, including errors and panics.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, warn};

use crate::error::NotificationError;

/// A reserved dispatcher slot. The slot is returned when this value is dropped.
#[derive(Debug)]
pub struct DispatchSlot {
    _permit: OwnedSemaphorePermit,
}

/// Snapshot of dispatcher activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherStats {
    pub capacity: usize,
    pub in_flight: usize,
    pub submitted: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    failed: AtomicU64,
    /// Jobs submitted and not yet finished, whether or not they hold a slot.
    pending: AtomicUsize,
    idle: Notify,
}

/// Counts a submitted job until its task ends, however it ends.
struct PendingJob(Arc<Counters>);

impl PendingJob {
    fn new(counters: &Arc<Counters>) -> Self {
        counters.pending.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counters))
    }
}

impl Drop for PendingJob {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Runs background jobs with at most `capacity` of them in flight.
///
/// Cloning is cheap; clones share the same slots.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    slots: Arc<Semaphore>,
    capacity: usize,
    counters: Arc<Counters>,
}

impl NotificationDispatcher {
    /// Creates a dispatcher with `capacity` slots. A capacity of zero is
    /// raised to one so submitted jobs can always make progress.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held.
    pub fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.slots.available_permits())
    }

    /// Number of submitted jobs that have not finished, including those
    /// still waiting for a slot.
    pub fn pending(&self) -> usize {
        self.counters.pending.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            capacity: self.capacity,
            in_flight: self.in_flight(),
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Waits until a slot is free and reserves it.
    ///
    /// # Errors
    /// Returns [`NotificationError::DispatcherClosed`] after [`shutdown`](Self::shutdown).
    pub async fn acquire(&self) -> Result<DispatchSlot, NotificationError> {
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| NotificationError::DispatcherClosed)?;
        Ok(DispatchSlot { _permit: permit })
    }

    /// Reserves a slot only if one is free right now.
    pub fn try_acquire(&self) -> Option<DispatchSlot> {
        Arc::clone(&self.slots)
            .try_acquire_owned()
            .ok()
            .map(|permit| DispatchSlot { _permit: permit })
    }

    /// Spawns `job` on its own task and returns without waiting for it.
    ///
    /// The task waits for a slot, runs the job and releases the slot. The job
    /// is not tied to the caller: dropping the returned handle detaches it and
    /// cancelling the caller does not cancel the job. The task runs inside the
    /// caller's current tracing span.
    pub fn submit<F>(&self, job: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), NotificationError>> + Send + 'static,
    {
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        let pending = PendingJob::new(&self.counters);
        let dispatcher = self.clone();

        tokio::spawn(async move {
            let _pending = pending;
            let _slot = match dispatcher.acquire().await {
                Ok(slot) => slot,
                Err(e) => {
                    warn!(error = %e, "Dropping notification job");
                    dispatcher.counters.failed.fetch_add(1, Ordering::Relaxed);
                    return;
                }
            };

            debug!(in_flight = dispatcher.in_flight(), "Notification job started");

            if let Err(e) = job.await {
                dispatcher.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "Notification job failed");
            }
        }
        .in_current_span())
    }

    /// Waits for every in-flight and queued job to finish, then closes the
    /// dispatcher. Later submissions are dropped.
    ///
    /// # Errors
    /// Returns [`NotificationError::DrainTimeout`] if jobs are still running
    /// after `timeout`. The dispatcher is closed either way.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), NotificationError> {
        let all = u32::try_from(self.capacity).unwrap_or(u32::MAX);

        // Queued jobs first, then any slot held outside `submit`
        let drain = async {
            self.wait_idle().await;
            self.slots.acquire_many(all).await
        };
        let drained = tokio::time::timeout(timeout, drain).await;
        let in_flight = self.in_flight().max(self.pending());
        self.slots.close();

        match drained {
            Ok(Ok(_permits)) => Ok(()),
            Ok(Err(_)) => Err(NotificationError::DispatcherClosed),
            Err(_) => Err(NotificationError::DrainTimeout { in_flight }),
        }
    }
}

impl NotificationDispatcher {
    async fn wait_idle(&self) {
        loop {
            let notified = self.counters.idle.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::watch;

    use super::*;

    #[tokio::test]
    async fn test_slot_released_on_drop() {
        let dispatcher = NotificationDispatcher::new(1);

        let slot = dispatcher.acquire().await.unwrap();
        assert_eq!(dispatcher.in_flight(), 1);
        assert!(dispatcher.try_acquire().is_none());

        drop(slot);
        assert_eq!(dispatcher.in_flight(), 0);
        assert!(dispatcher.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_zero_capacity_is_raised() {
        let dispatcher = NotificationDispatcher::new(0);
        assert_eq!(dispatcher.capacity(), 1);
    }

    #[tokio::test]
    async fn test_in_flight_never_exceeds_capacity() {
        let dispatcher = NotificationDispatcher::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                dispatcher.submit(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(dispatcher.stats().submitted, 6);
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_extra_job_waits_for_free_slot() {
        let dispatcher = NotificationDispatcher::new(2);
        let started = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = watch::channel(false);

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let started = Arc::clone(&started);
                let mut release_rx = release_rx.clone();
                dispatcher.submit(async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    release_rx
                        .wait_for(|released| *released)
                        .await
                        .map_err(|e| NotificationError::Internal(e.to_string()))?;
                    Ok(())
                })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(started.load(Ordering::SeqCst), 2);
        assert_eq!(dispatcher.in_flight(), 2);

        release_tx.send(true).unwrap();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(started.load(Ordering::SeqCst), 3);
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_submit_does_not_block_caller() {
        let dispatcher = NotificationDispatcher::new(1);
        let held = dispatcher.acquire().await.unwrap();

        // Every slot is taken, yet submit returns immediately.
        let handle = dispatcher.submit(async { Ok(()) });
        assert!(!handle.is_finished());

        drop(held);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_job_releases_slot() {
        let dispatcher = NotificationDispatcher::new(1);

        dispatcher
            .submit(async { Err(NotificationError::SendFailed("smtp down".into())) })
            .await
            .unwrap();

        assert_eq!(dispatcher.in_flight(), 0);
        assert_eq!(dispatcher.stats().failed, 1);

        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = Arc::clone(&ran);
        dispatcher
            .submit(async move {
                ran_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_job_releases_slot() {
        let dispatcher = NotificationDispatcher::new(1);

        let result = dispatcher
            .submit(async {
                if true {
                    panic!("template exploded");
                }
                Ok(())
            })
            .await;
        assert!(result.unwrap_err().is_panic());

        let slot = tokio::time::timeout(Duration::from_secs(1), dispatcher.acquire()).await;
        assert!(slot.is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_jobs() {
        let dispatcher = NotificationDispatcher::new(2);
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..4 {
            let done = Arc::clone(&done);
            dispatcher.submit(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        tokio::time::sleep(Duration::from_millis(1)).await;

        dispatcher.shutdown(Duration::from_secs(5)).await.unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 4);

        assert!(matches!(
            dispatcher.acquire().await,
            Err(NotificationError::DispatcherClosed)
        ));
    }

    #[tokio::test]
    async fn test_shutdown_runs_jobs_not_yet_started() {
        let dispatcher = NotificationDispatcher::new(1);
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let done = Arc::clone(&done);
            dispatcher.submit(async move {
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        assert_eq!(dispatcher.pending(), 3);

        // No yield between submit and shutdown
        dispatcher.shutdown(Duration::from_secs(5)).await.unwrap();

        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(dispatcher.pending(), 0);
        assert_eq!(dispatcher.stats().failed, 0);
    }

    #[tokio::test]
    async fn test_shutdown_times_out() {
        let dispatcher = NotificationDispatcher::new(1);
        let _stuck = dispatcher.acquire().await.unwrap();

        let err = dispatcher
            .shutdown(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::DrainTimeout { in_flight: 1 }));
    }
}
