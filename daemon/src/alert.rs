//! Alert records and the bounded alert log

use crate::collector::{unix_now, Signal};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

pub const ALERT_LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertLevel::Info => "info",
            AlertLevel::Warning => "warning",
            AlertLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// Technical context attached to an alert, one variant per trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertDetails {
    CpuThreshold {
        current: f64,
        baseline_mean: f64,
        deviation: f64,
    },
    MemoryPressure {
        percent: f64,
        available_gb: f64,
    },
    DiskCritical {
        percent: f64,
        free_gb: f64,
    },
    StatisticalAnomaly {
        signal: Signal,
        value: f64,
        mean: f64,
        stdev: f64,
        method: &'static str,
        confidence: f64,
    },
    PredictiveTrend {
        signal: Signal,
        slope: f64,
    },
    CleanupCompleted {
        removed: usize,
        bytes_removed: u64,
        safety_skipped: usize,
        efficiency: f64,
    },
    Optimization {
        improvements: usize,
        score: u8,
    },
    InputUnavailable {
        source: String,
        reason: String,
    },
    CycleFailure {
        job: &'static str,
        cycle: u64,
        failure: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub timestamp: u64,
    pub level: AlertLevel,
    pub message: String,
    pub details: AlertDetails,
}

impl Alert {
    pub fn new(level: AlertLevel, message: impl Into<String>, details: AlertDetails) -> Self {
        Self {
            timestamp: unix_now(),
            level,
            message: message.into(),
            details,
        }
    }

    pub fn warning(message: impl Into<String>, details: AlertDetails) -> Self {
        Self::new(AlertLevel::Warning, message, details)
    }

    pub fn info(message: impl Into<String>, details: AlertDetails) -> Self {
        Self::new(AlertLevel::Info, message, details)
    }

    pub fn error(message: impl Into<String>, details: AlertDetails) -> Self {
        Self::new(AlertLevel::Error, message, details)
    }
}

/// Ring buffer of the most recent alerts plus a live stream of new ones.
///
/// Appends and reads may come from any task; the buffer is guarded by a
/// mutex and subscribers receive every alert pushed after they subscribe.
pub struct AlertLog {
    entries: Mutex<VecDeque<Alert>>,
    capacity: usize,
    stream: broadcast::Sender<Alert>,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        let (stream, _) = broadcast::channel(capacity.max(1));
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            stream,
        }
    }

    pub fn push(&self, alert: Alert) {
        match alert.level {
            AlertLevel::Info => info!(details = ?alert.details, "{}", alert.message),
            AlertLevel::Warning => warn!(details = ?alert.details, "{}", alert.message),
            AlertLevel::Error => error!(details = ?alert.details, "{}", alert.message),
        }

        {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            if entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(alert.clone());
        }

        // No subscribers is fine
        let _ = self.stream.send(alert);
    }

    pub fn extend(&self, alerts: impl IntoIterator<Item = Alert>) {
        for alert in alerts {
            self.push(alert);
        }
    }

    /// The newest `n` alerts, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Alert> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .skip(entries.len().saturating_sub(n))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.stream.subscribe()
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new(ALERT_LOG_CAPACITY)
    }
}
