//! ABOUTME: Fixed-interval driver for the poll cycle
//! ABOUTME: Skips a tick when the previous cycle is still in flight

use lg_core::{Error, Result};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing::{debug, info, warn};

use crate::cycle::{CycleOutcome, PollCycle};

/// Single-flight guard shared by scheduled ticks and manual triggers
#[derive(Debug, Clone, Default)]
pub struct CycleGuard {
    in_flight: Arc<AtomicBool>,
}

impl CycleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard, or `None` if a cycle already holds it
    pub fn try_acquire(&self) -> Option<CyclePermit> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CyclePermit {
                in_flight: Arc::clone(&self.in_flight),
            })
    }

    pub fn is_held(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Releases the guard when dropped, including on panic unwinds
#[derive(Debug)]
pub struct CyclePermit {
    in_flight: Arc<AtomicBool>,
}

impl Drop for CyclePermit {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

/// Runs the poll cycle every `interval`, at most one at a time
pub struct PollScheduler {
    /// Internal scheduler driving the repeated job
    cron_scheduler: Arc<Mutex<JobScheduler>>,
    cycle: Arc<PollCycle>,
    guard: CycleGuard,
    interval: Duration,
    /// Running status
    running: Arc<AtomicBool>,
    skipped: Arc<AtomicU64>,
}

impl PollScheduler {
    /// Create a scheduler with the repeated poll job registered but not started
    pub async fn new(cycle: Arc<PollCycle>, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::Config(
                "Refresh interval must be greater than zero".to_string(),
            ));
        }

        let cron_scheduler = JobScheduler::new()
            .await
            .map_err(|e| Error::Config(format!("Failed to create poll scheduler: {}", e)))?;

        let scheduler = Self {
            cron_scheduler: Arc::new(Mutex::new(cron_scheduler)),
            cycle,
            guard: CycleGuard::new(),
            interval,
            running: Arc::new(AtomicBool::new(false)),
            skipped: Arc::new(AtomicU64::new(0)),
        };
        scheduler.schedule_poll_job().await?;

        Ok(scheduler)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start ticking; calling it again while running is a no-op
    pub async fn start(&self) -> Result<()> {
        if self.running.load(Ordering::Relaxed) {
            return Ok(());
        }

        info!(interval_secs = self.interval.as_secs(), "Starting poll scheduler");

        let scheduler = self.cron_scheduler.lock().await;
        scheduler
            .start()
            .await
            .map_err(|e| Error::Config(format!("Failed to start poll scheduler: {}", e)))?;

        self.running.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Stop ticking; an in-flight cycle is left to finish
    pub async fn stop(&self) -> Result<()> {
        if !self.running.load(Ordering::Relaxed) {
            return Ok(());
        }

        info!("Stopping poll scheduler");

        let mut scheduler = self.cron_scheduler.lock().await;
        scheduler
            .shutdown()
            .await
            .map_err(|e| Error::Config(format!("Failed to stop poll scheduler: {}", e)))?;

        self.running.store(false, Ordering::Relaxed);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Run a cycle now, outside the interval
    ///
    /// Returns `None` when a cycle is already in flight.
    pub async fn trigger_now(&self) -> Option<CycleOutcome> {
        info!("Triggering poll cycle manually");
        run_guarded(&self.cycle, &self.guard, &self.skipped).await
    }

    /// Number of ticks dropped because the previous cycle had not finished
    pub fn skipped_ticks(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    async fn schedule_poll_job(&self) -> Result<()> {
        let cycle = Arc::clone(&self.cycle);
        let guard = self.guard.clone();
        let skipped = Arc::clone(&self.skipped);

        let cron_job = CronJob::new_repeated_async(self.interval, move |_uuid, _l| {
            let cycle = Arc::clone(&cycle);
            let guard = guard.clone();
            let skipped = Arc::clone(&skipped);

            Box::pin(async move {
                debug!("Poll tick");
                run_guarded(&cycle, &guard, &skipped).await;
            })
        })
        .map_err(|e| Error::Config(format!("Failed to create poll job: {}", e)))?;

        let scheduler = self.cron_scheduler.lock().await;
        scheduler
            .add(cron_job)
            .await
            .map_err(|e| Error::Config(format!("Failed to add poll job: {}", e)))?;

        debug!(interval_secs = self.interval.as_secs(), "Poll job scheduled");
        Ok(())
    }
}

/// Run one cycle if nothing else holds the guard
async fn run_guarded(
    cycle: &PollCycle,
    guard: &CycleGuard,
    skipped: &AtomicU64,
) -> Option<CycleOutcome> {
    let Some(_permit) = guard.try_acquire() else {
        let total = skipped.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(skipped_total = total, "Previous poll cycle still running, skipping tick");
        return None;
    };

    Some(cycle.run_cycle().await)
}
