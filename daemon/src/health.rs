//! Composite health score

use crate::collector::{Sample, Signal};
use crate::learner::BaselineTracker;

const CPU_WEIGHT: f64 = 0.4;
const MEMORY_WEIGHT: f64 = 0.4;
const DISK_WEIGHT: f64 = 0.2;

const CPU_CRITICAL: f64 = 90.0;
const MEMORY_CRITICAL: f64 = 95.0;

/// Weighted headroom score in [0, 100], rounded to one decimal.
///
/// A single critical signal (cpu above 90 or memory above 95) halves the
/// score regardless of the other two.
pub fn health_score(cpu: f64, memory: f64, disk: f64) -> f64 {
    let cpu_score = (100.0 - cpu).max(0.0);
    let memory_score = (100.0 - memory).max(0.0);
    let disk_score = (100.0 - disk).max(0.0);

    let mut weighted =
        cpu_score * CPU_WEIGHT + memory_score * MEMORY_WEIGHT + disk_score * DISK_WEIGHT;
    if cpu > CPU_CRITICAL || memory > MEMORY_CRITICAL {
        weighted *= 0.5;
    }
    (weighted * 10.0).round() / 10.0
}

pub fn sample_health(sample: &Sample) -> f64 {
    health_score(sample.cpu_percent, sample.memory_percent, sample.disk_percent)
}

/// Hints derived from sustained baseline levels.
pub fn recommendations(tracker: &BaselineTracker) -> Vec<String> {
    let mut hints = Vec::new();
    if !tracker.is_empty(Signal::Memory) && tracker.mean(Signal::Memory) > 70.0 {
        hints.push("Memory cleanup recommended".to_string());
    }
    if !tracker.is_empty(Signal::Cpu) && tracker.mean(Signal::Cpu) > 60.0 {
        hints.push("Process optimization needed".to_string());
    }
    hints
}
