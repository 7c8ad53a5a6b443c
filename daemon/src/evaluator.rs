//! Turns the current sample and detector output into alerts

use crate::alert::{Alert, AlertDetails};
use crate::collector::{Sample, Signal};
use crate::config::ThresholdConfig;
use crate::detector::{Anomaly, TrendDirection, TrendReport, TWO_SIGMA_CONFIDENCE};
use crate::learner::BaselineTracker;

pub const ANOMALY_METHOD: &str = "2-std statistical analysis";
/// Predictive alerts fire when a rising trend exceeds this many points per cycle.
pub const PREDICTIVE_RATE: f64 = 2.0;

pub struct ThresholdEvaluator {
    thresholds: ThresholdConfig,
}

impl ThresholdEvaluator {
    pub fn new(thresholds: ThresholdConfig) -> Self {
        Self { thresholds }
    }

    /// Every trigger yields its own alert; a signal may appear more than once.
    ///
    /// `tracker` should already contain `sample`, so the cpu baseline mean
    /// includes the current reading.
    pub fn evaluate(
        &self,
        sample: &Sample,
        tracker: &BaselineTracker,
        anomalies: &[Anomaly],
        trends: &TrendReport,
    ) -> Vec<Alert> {
        let mut alerts = Vec::new();

        if sample.cpu_percent > self.thresholds.cpu_threshold {
            let baseline_mean = tracker.mean(Signal::Cpu);
            alerts.push(Alert::warning(
                format!(
                    "CPU threshold: {:.1}% (baseline avg={:.1}%)",
                    sample.cpu_percent, baseline_mean
                ),
                AlertDetails::CpuThreshold {
                    current: sample.cpu_percent,
                    baseline_mean: round2(baseline_mean),
                    deviation: round2((sample.cpu_percent - baseline_mean).abs()),
                },
            ));
        }

        if sample.memory_percent > self.thresholds.memory_threshold {
            alerts.push(Alert::warning(
                format!(
                    "Memory pressure: {:.1}% (available: {:.1}GB)",
                    sample.memory_percent, sample.memory_available_gb
                ),
                AlertDetails::MemoryPressure {
                    percent: sample.memory_percent,
                    available_gb: sample.memory_available_gb,
                },
            ));
        }

        if sample.disk_percent > self.thresholds.disk_threshold {
            alerts.push(Alert::warning(
                format!(
                    "Disk critical: {:.1}% (free: {:.1}GB)",
                    sample.disk_percent, sample.disk_free_gb
                ),
                AlertDetails::DiskCritical {
                    percent: sample.disk_percent,
                    free_gb: sample.disk_free_gb,
                },
            ));
        }

        for anomaly in anomalies {
            alerts.push(Alert::warning(
                format!("Statistical anomaly: {}", anomaly.describe()),
                AlertDetails::StatisticalAnomaly {
                    signal: anomaly.signal,
                    value: anomaly.value,
                    mean: anomaly.mean,
                    stdev: anomaly.stdev,
                    method: ANOMALY_METHOD,
                    confidence: TWO_SIGMA_CONFIDENCE,
                },
            ));
        }

        for (signal, trend) in trends {
            if trend.direction == TrendDirection::Increasing && trend.rate > PREDICTIVE_RATE {
                alerts.push(Alert::warning(
                    format!(
                        "Predictive alert: {} trending up (+{:.2}%/cycle)",
                        signal.as_str().to_uppercase(),
                        trend.rate
                    ),
                    AlertDetails::PredictiveTrend {
                        signal: *signal,
                        slope: trend.rate,
                    },
                ));
            }
        }

        alerts
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
