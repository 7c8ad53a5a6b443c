//! Statistical anomaly and trend detection over the baseline windows

use crate::collector::{Sample, Signal};
use crate::learner::{mean, sample_stdev, BaselineTracker};
use serde::Serialize;
use std::collections::BTreeMap;

/// Samples required before a window is trusted for anomaly detection.
pub const MIN_ANOMALY_SAMPLES: usize = 10;
/// Windows flatter than this never produce anomalies.
pub const MIN_STDEV: f64 = 0.5;
pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 2.0;
/// Two-tailed coverage of a 2σ band under a normal distribution.
pub const TWO_SIGMA_CONFIDENCE: f64 = 95.45;

pub const TREND_HORIZON: usize = 5;
const TREND_SLOPE_LIMIT: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub signal: Signal,
    pub value: f64,
    pub mean: f64,
    pub stdev: f64,
}

impl Anomaly {
    pub fn describe(&self) -> String {
        format!(
            "{} anomaly: {:.1}% (avg={:.1} +/- {:.1})",
            self.signal.as_str().to_uppercase(),
            self.value,
            self.mean,
            self.stdev
        )
    }
}

#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    threshold: f64,
}

impl AnomalyDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Tests `value` against a baseline window.
    pub fn check(&self, signal: Signal, value: f64, window: &[f64]) -> Option<Anomaly> {
        if window.len() < MIN_ANOMALY_SAMPLES {
            return None;
        }
        let mean = mean(window)?;
        let stdev = sample_stdev(window)?;
        if stdev > MIN_STDEV && (value - mean).abs() > self.threshold * stdev {
            Some(Anomaly {
                signal,
                value,
                mean,
                stdev,
            })
        } else {
            None
        }
    }

    /// Checks every signal of `sample` against the tracker's current windows.
    pub fn detect(&self, sample: &Sample, tracker: &BaselineTracker) -> Vec<Anomaly> {
        Signal::ALL
            .iter()
            .filter_map(|&signal| {
                let window = tracker.snapshot(signal);
                self.check(signal, sample.value(signal), &window)
            })
            .collect()
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(DEFAULT_ANOMALY_THRESHOLD)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trend {
    pub direction: TrendDirection,
    /// Slope per cycle, rounded to two decimals.
    pub rate: f64,
}

pub type TrendReport = BTreeMap<Signal, Trend>;

/// Finite-difference slope over the newest five samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrendEstimator;

impl TrendEstimator {
    pub fn estimate(&self, recent: &[f64]) -> Option<Trend> {
        if recent.len() < TREND_HORIZON {
            return None;
        }
        let last = &recent[recent.len() - TREND_HORIZON..];
        let slope = (last[TREND_HORIZON - 1] - last[0]) / TREND_HORIZON as f64;
        let direction = if slope > TREND_SLOPE_LIMIT {
            TrendDirection::Increasing
        } else if slope < -TREND_SLOPE_LIMIT {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };
        Some(Trend {
            direction,
            rate: (slope * 100.0).round() / 100.0,
        })
    }

    pub fn analyze(&self, tracker: &BaselineTracker) -> TrendReport {
        Signal::ALL
            .iter()
            .filter_map(|&signal| {
                self.estimate(&tracker.recent(signal, TREND_HORIZON))
                    .map(|trend| (signal, trend))
            })
            .collect()
    }
}
