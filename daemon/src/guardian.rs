//! Process-wide monitoring context and the per-cycle pipelines

use crate::alert::{Alert, AlertDetails, AlertLog};
use crate::collector::{walk_roots, Sample, SampleSource, Signal};
use crate::config::Config;
use crate::detector::{Anomaly, AnomalyDetector, TrendEstimator, TrendReport};
use crate::error::{GuardianError, Result};
use crate::evaluator::ThresholdEvaluator;
use crate::executor::{CleanupExecutor, CleanupOutcome};
use crate::health::{recommendations, sample_health};
use crate::learner::{BaselineStats, BaselineTracker};
use crate::notifier::Notifier;
use crate::optimizer::{OptimizationState, Optimizer};
use crate::planner::{CleanupCandidate, CleanupPlanner};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Everything one monitoring cycle derived from its sample.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub sample: Sample,
    pub health_score: f64,
    pub anomalies: Vec<Anomaly>,
    pub trends: TrendReport,
    pub recommendations: Vec<String>,
    pub alerts_raised: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupRun {
    pub candidates: usize,
    pub outcome: CleanupOutcome,
    pub efficiency: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationReport {
    pub improvements: Vec<String>,
    pub score: u8,
}

/// Owns all state that outlives a single cycle: the baseline windows, the
/// alert log and the optimization score. Shared between scheduler tasks
/// behind an `Arc`.
pub struct Guardian {
    source: Arc<dyn SampleSource>,
    cleanup_roots: Vec<PathBuf>,
    tracker: Mutex<BaselineTracker>,
    detector: AnomalyDetector,
    trends: TrendEstimator,
    evaluator: ThresholdEvaluator,
    alerts: AlertLog,
    notifier: Notifier,
    planner: CleanupPlanner,
    executor: CleanupExecutor,
    optimizer: Optimizer,
    optimization: Mutex<OptimizationState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Guardian {
    pub fn new(config: &Config, source: Arc<dyn SampleSource>) -> Self {
        Self {
            source,
            cleanup_roots: config.cleanup.cleanup_roots.clone(),
            tracker: Mutex::new(BaselineTracker::new(config.learning.ml_learning_window)),
            detector: AnomalyDetector::new(config.learning.anomaly_threshold),
            trends: TrendEstimator,
            evaluator: ThresholdEvaluator::new(config.thresholds.clone()),
            alerts: AlertLog::default(),
            notifier: Notifier::new(config.general.desktop_notifications),
            planner: CleanupPlanner::from_config(&config.cleanup),
            executor: CleanupExecutor::from_config(&config.cleanup),
            optimizer: Optimizer::new(config.cleanup.cache_roots.clone()),
            optimization: Mutex::new(OptimizationState::new()),
        }
    }

    pub fn alerts(&self) -> &AlertLog {
        &self.alerts
    }

    pub fn executor(&self) -> &CleanupExecutor {
        &self.executor
    }

    pub fn optimization_score(&self) -> u8 {
        lock(&self.optimization).score()
    }

    pub fn baseline(&self, signal: Signal) -> Vec<f64> {
        lock(&self.tracker).snapshot(signal)
    }

    pub fn baseline_stats(&self) -> Vec<BaselineStats> {
        let tracker = lock(&self.tracker);
        Signal::ALL.iter().filter_map(|&s| tracker.stats(s)).collect()
    }

    pub fn total_samples(&self) -> usize {
        lock(&self.tracker).total_samples()
    }

    pub fn raise(&self, alert: Alert) {
        self.notifier.notify(&alert);
        self.alerts.push(alert);
    }

    /// Pulls one sample from the source and runs it through the pipeline.
    /// A source failure raises an error alert and skips the cycle.
    pub fn monitor_cycle(&self, cycle: u64) -> Option<CycleReport> {
        match self.source.sample() {
            Ok(sample) => Some(self.observe(cycle, sample)),
            Err(e) => {
                self.raise(Alert::error(
                    format!("Metrics unavailable: {}", e),
                    AlertDetails::InputUnavailable {
                        source: "sample source".into(),
                        reason: e.to_string(),
                    },
                ));
                None
            }
        }
    }

    /// Anomalies and trends are judged against the baseline as it stood
    /// before this sample; thresholds see the baseline including it.
    pub fn observe(&self, cycle: u64, sample: Sample) -> CycleReport {
        let (anomalies, trends, hints, alerts) = {
            let mut tracker = lock(&self.tracker);
            let anomalies = self.detector.detect(&sample, &tracker);
            let trends = self.trends.analyze(&tracker);
            let hints = recommendations(&tracker);
            tracker.record_sample(&sample);
            let alerts = self.evaluator.evaluate(&sample, &tracker, &anomalies, &trends);
            (anomalies, trends, hints, alerts)
        };

        let health_score = sample_health(&sample);
        let alerts_raised = alerts.len();
        for alert in alerts {
            self.raise(alert);
        }
        debug!(
            cycle,
            health = health_score,
            anomalies = anomalies.len(),
            "Monitoring cycle complete"
        );

        CycleReport {
            cycle,
            sample,
            health_score,
            anomalies,
            trends,
            recommendations: hints,
            alerts_raised,
        }
    }

    /// Walks the cleanup roots and ranks what it finds.
    pub fn scan(&self, cancel: &CancellationToken) -> Result<Vec<CleanupCandidate>> {
        let records = walk_roots(&self.cleanup_roots, cancel)?;
        Ok(self.planner.plan(&records, SystemTime::now()))
    }

    /// Scan, then remove what policy allows. `None` means the cycle was
    /// skipped: enumeration failed (an error alert is raised) or another batch
    /// is still running. `Cancelled` is returned to the caller.
    pub fn cleanup_cycle(
        &self,
        cycle: u64,
        cancel: &CancellationToken,
    ) -> Result<Option<CleanupRun>> {
        let candidates = match self.scan(cancel) {
            Ok(candidates) => candidates,
            Err(GuardianError::Cancelled) => return Err(GuardianError::Cancelled),
            Err(e) => {
                self.raise(Alert::error(
                    format!("Cleanup scan failed: {}", e),
                    AlertDetails::InputUnavailable {
                        source: "file enumeration".into(),
                        reason: e.to_string(),
                    },
                ));
                return Ok(None);
            }
        };
        if candidates.is_empty() {
            debug!(cycle, "No cleanup candidates");
            return Ok(Some(CleanupRun {
                candidates: 0,
                outcome: CleanupOutcome::default(),
                efficiency: 0.0,
            }));
        }

        let outcome = match self.executor.execute(&candidates, cancel) {
            Ok(outcome) => outcome,
            Err(GuardianError::CleanupInProgress) => {
                warn!(cycle, "Previous cleanup still running, skipping");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let efficiency = outcome.efficiency(candidates.len());
        if outcome.removed > 0 {
            self.raise(Alert::info(
                format!(
                    "Cleanup: {} files, {:.1}MB (eff={}%)",
                    outcome.removed,
                    outcome.megabytes_removed(),
                    efficiency
                ),
                AlertDetails::CleanupCompleted {
                    removed: outcome.removed,
                    bytes_removed: outcome.bytes_removed,
                    safety_skipped: outcome.safety_skipped,
                    efficiency,
                },
            ));
        }

        Ok(Some(CleanupRun {
            candidates: candidates.len(),
            outcome,
            efficiency,
        }))
    }

    pub fn optimize_cycle(&self, cycle: u64, cancel: &CancellationToken) -> OptimizationReport {
        let pass = self.optimizer.run(cancel);
        let score = lock(&self.optimization).apply(pass.gain);
        if !pass.improvements.is_empty() {
            self.raise(Alert::info(
                format!(
                    "System optimized: {} improvements (score={}%)",
                    pass.improvements.len(),
                    score
                ),
                AlertDetails::Optimization {
                    improvements: pass.improvements.len(),
                    score,
                },
            ));
        }
        info!(cycle, score, "Optimization pass complete");
        OptimizationReport {
            improvements: pass.improvements,
            score,
        }
    }

    /// Records a cycle that died unexpectedly.
    pub fn record_failure(&self, job: &'static str, cycle: u64, failure: String) {
        self.raise(Alert::error(
            format!("Runtime error in {} cycle {}: {}", job, cycle, failure),
            AlertDetails::CycleFailure {
                job,
                cycle,
                failure,
            },
        ));
    }
}
