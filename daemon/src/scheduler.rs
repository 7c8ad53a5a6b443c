//! Independent periodic timers for monitoring, cleanup and optimization

use crate::config::GeneralConfig;
use crate::error::GuardianError;
use crate::guardian::{CleanupRun, CycleReport, Guardian, OptimizationReport};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const EVENT_CAPACITY: usize = 256;

/// Period of each job. Cleanup and optimization are whole multiples of the
/// monitoring period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub monitor: Duration,
    pub cleanup: Duration,
    pub optimize: Duration,
    pub cooldown: Duration,
    pub job_timeout: Duration,
}

impl Cadence {
    pub fn from_config(general: &GeneralConfig) -> Self {
        let monitor = Duration::from_millis(general.sample_interval_ms);
        Self {
            monitor,
            cleanup: monitor.saturating_mul(general.cleanup_every),
            optimize: monitor.saturating_mul(general.optimize_every),
            cooldown: Duration::from_secs(general.cycle_cooldown_secs),
            job_timeout: Duration::from_secs(general.job_timeout_secs),
        }
    }
}

impl Default for Cadence {
    fn default() -> Self {
        Self::from_config(&GeneralConfig::default())
    }
}

#[derive(Debug, Clone)]
pub enum GuardianEvent {
    Cycle(CycleReport),
    Cleanup { cycle: u64, run: CleanupRun },
    Optimization { cycle: u64, report: OptimizationReport },
}

pub struct Scheduler {
    guardian: Arc<Guardian>,
    cadence: Cadence,
    events: broadcast::Sender<GuardianEvent>,
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new(guardian: Arc<Guardian>, cadence: Cadence) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            guardian,
            cadence,
            events,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GuardianEvent> {
        self.events.subscribe()
    }

    /// Cancelling this token stops every job after its current cycle.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn run(self) {
        info!(
            "Scheduler started: monitor every {:?}, cleanup every {:?}, optimize every {:?}",
            self.cadence.monitor, self.cadence.cleanup, self.cadence.optimize
        );

        let mut tasks = JoinSet::new();
        tasks.spawn(monitor_job(
            Arc::clone(&self.guardian),
            self.cadence,
            self.events.clone(),
            self.shutdown.clone(),
        ));
        tasks.spawn(cleanup_job(
            Arc::clone(&self.guardian),
            self.cadence,
            self.events.clone(),
            self.shutdown.clone(),
        ));
        tasks.spawn(optimize_job(
            Arc::clone(&self.guardian),
            self.cadence,
            self.events.clone(),
            self.shutdown.clone(),
        ));

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!("Scheduler task failed: {}", e);
            }
        }
        info!("Scheduler stopped");
    }
}

/// Runs `job` once per `period` until `shutdown` fires. The first run is
/// immediate.
async fn every<F, Fut>(period: Duration, shutdown: CancellationToken, mut job: F)
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cycle = 0u64;
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }
        job(cycle).await;
        cycle += 1;
    }
}

/// Why a blocking job produced no result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobFailure {
    #[error("panic: {0}")]
    Panicked(String),
    #[error("task cancelled")]
    Aborted,
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

impl From<JoinError> for JobFailure {
    fn from(err: JoinError) -> Self {
        if !err.is_panic() {
            return JobFailure::Aborted;
        }
        let payload = err.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown".to_string());
        JobFailure::Panicked(message)
    }
}

/// Runs `job` on the blocking pool for at most `limit`.
///
/// The job receives a clone of `cancel`. When the limit passes, `cancel` is
/// cancelled so the job can stop on its own; it is not awaited further.
pub async fn run_blocking<T, F>(
    limit: Duration,
    cancel: &CancellationToken,
    job: F,
) -> Result<T, JobFailure>
where
    F: FnOnce(CancellationToken) -> T + Send + 'static,
    T: Send + 'static,
{
    let token = cancel.clone();
    let task = tokio::task::spawn_blocking(move || job(token));
    match time::timeout(limit, task).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => {
            cancel.cancel();
            Err(JobFailure::TimedOut(limit))
        }
    }
}

async fn monitor_job(
    guardian: Arc<Guardian>,
    cadence: Cadence,
    events: broadcast::Sender<GuardianEvent>,
    shutdown: CancellationToken,
) {
    every(cadence.monitor, shutdown.clone(), |cycle| {
        let guardian = Arc::clone(&guardian);
        let events = events.clone();
        let shutdown = shutdown.clone();
        async move {
            let worker = Arc::clone(&guardian);
            match tokio::task::spawn_blocking(move || worker.monitor_cycle(cycle)).await {
                Ok(Some(report)) => {
                    let _ = events.send(GuardianEvent::Cycle(report));
                }
                Ok(None) => {}
                Err(e) => {
                    report_failure(&guardian, "monitor", cycle, e.into()).await;
                    cool_down(cadence.cooldown, &shutdown).await;
                }
            }
        }
    })
    .await;
}

async fn cleanup_job(
    guardian: Arc<Guardian>,
    cadence: Cadence,
    events: broadcast::Sender<GuardianEvent>,
    shutdown: CancellationToken,
) {
    every(cadence.cleanup, shutdown.clone(), |cycle| {
        let guardian = Arc::clone(&guardian);
        let events = events.clone();
        let shutdown = shutdown.clone();
        async move {
            let worker = Arc::clone(&guardian);
            let result = run_blocking(cadence.job_timeout, &shutdown.child_token(), move |cancel| {
                worker.cleanup_cycle(cycle, &cancel)
            })
            .await;

            match result {
                Ok(Ok(Some(run))) => {
                    let _ = events.send(GuardianEvent::Cleanup { cycle, run });
                }
                Ok(Ok(None)) => {}
                Ok(Err(GuardianError::Cancelled)) => {
                    info!(cycle, "Cleanup cancelled");
                }
                Ok(Err(e)) => {
                    warn!(cycle, "Cleanup cycle failed: {}", e);
                }
                Err(failure) => {
                    handle_failure(&guardian, "cleanup", cycle, failure, cadence, &shutdown).await
                }
            }
        }
    })
    .await;
}

async fn optimize_job(
    guardian: Arc<Guardian>,
    cadence: Cadence,
    events: broadcast::Sender<GuardianEvent>,
    shutdown: CancellationToken,
) {
    every(cadence.optimize, shutdown.clone(), |cycle| {
        let guardian = Arc::clone(&guardian);
        let events = events.clone();
        let shutdown = shutdown.clone();
        async move {
            let worker = Arc::clone(&guardian);
            let result = run_blocking(cadence.job_timeout, &shutdown.child_token(), move |cancel| {
                worker.optimize_cycle(cycle, &cancel)
            })
            .await;

            match result {
                Ok(report) => {
                    let _ = events.send(GuardianEvent::Optimization { cycle, report });
                }
                Err(failure) => {
                    handle_failure(&guardian, "optimize", cycle, failure, cadence, &shutdown).await
                }
            }
        }
    })
    .await;
}

/// Records the failure; panics and aborts are followed by the cool-down.
async fn handle_failure(
    guardian: &Arc<Guardian>,
    job: &'static str,
    cycle: u64,
    failure: JobFailure,
    cadence: Cadence,
    shutdown: &CancellationToken,
) {
    let timed_out = matches!(failure, JobFailure::TimedOut(_));
    report_failure(guardian, job, cycle, failure).await;
    if !timed_out {
        cool_down(cadence.cooldown, shutdown).await;
    }
}

/// Raising an alert may show a desktop notification, so it stays off the
/// async workers.
async fn report_failure(
    guardian: &Arc<Guardian>,
    job: &'static str,
    cycle: u64,
    failure: JobFailure,
) {
    let guardian = Arc::clone(guardian);
    let failure = failure.to_string();
    if let Err(e) =
        tokio::task::spawn_blocking(move || guardian.record_failure(job, cycle, failure)).await
    {
        error!(job, cycle, "Failed to record cycle failure: {}", e);
    }
}

async fn cool_down(delay: Duration, shutdown: &CancellationToken) {
    tokio::select! {
        _ = shutdown.cancelled() => {}
        _ = time::sleep(delay) => {}
    }
}
