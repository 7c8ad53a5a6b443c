//! Rolling baseline of recent samples per signal

use crate::collector::{Sample, Signal};
use serde::Serialize;
use std::collections::VecDeque;

pub const DEFAULT_WINDOW: usize = 50;

/// Summary of one signal's baseline window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineStats {
    pub signal: Signal,
    pub samples: usize,
    pub mean: f64,
    pub stdev: f64,
    /// Coefficient of variation, in percent.
    pub cv: f64,
    pub stability: Stability,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stability {
    Stable,
    Moderate,
    Volatile,
}

impl Stability {
    fn from_cv(cv: f64) -> Self {
        if cv < 10.0 {
            Stability::Stable
        } else if cv < 25.0 {
            Stability::Moderate
        } else {
            Stability::Volatile
        }
    }
}

/// Fixed-capacity FIFO window for each of the tracked signals.
#[derive(Debug, Clone)]
pub struct BaselineTracker {
    capacity: usize,
    windows: [VecDeque<f64>; 3],
}

impl BaselineTracker {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "baseline window capacity must be positive");
        Self {
            capacity,
            windows: [
                VecDeque::with_capacity(capacity),
                VecDeque::with_capacity(capacity),
                VecDeque::with_capacity(capacity),
            ],
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&mut self, signal: Signal, value: f64) {
        let capacity = self.capacity;
        let window = &mut self.windows[signal as usize];
        while window.len() >= capacity {
            window.pop_front();
        }
        window.push_back(value);
    }

    pub fn record_sample(&mut self, sample: &Sample) {
        for signal in Signal::ALL {
            self.record(signal, sample.value(signal));
        }
    }

    pub fn window(&self, signal: Signal) -> &VecDeque<f64> {
        &self.windows[signal as usize]
    }

    /// Copy of the window, oldest first.
    pub fn snapshot(&self, signal: Signal) -> Vec<f64> {
        self.window(signal).iter().copied().collect()
    }

    /// The newest `n` values, oldest first. Shorter if the window holds fewer.
    pub fn recent(&self, signal: Signal, n: usize) -> Vec<f64> {
        let window = self.window(signal);
        window.iter().skip(window.len().saturating_sub(n)).copied().collect()
    }

    pub fn len(&self, signal: Signal) -> usize {
        self.window(signal).len()
    }

    pub fn is_empty(&self, signal: Signal) -> bool {
        self.window(signal).is_empty()
    }

    pub fn total_samples(&self) -> usize {
        self.windows.iter().map(VecDeque::len).sum()
    }

    /// Mean of the window, or 0 when nothing has been recorded.
    pub fn mean(&self, signal: Signal) -> f64 {
        mean(self.window(signal)).unwrap_or(0.0)
    }

    pub fn stdev(&self, signal: Signal) -> Option<f64> {
        sample_stdev(self.window(signal))
    }

    /// Needs at least five samples.
    pub fn stats(&self, signal: Signal) -> Option<BaselineStats> {
        let window = self.window(signal);
        if window.len() < 5 {
            return None;
        }
        let mean = mean(window)?;
        let stdev = self.stdev(signal).unwrap_or(0.0);
        let cv = if mean > 0.0 { stdev / mean * 100.0 } else { 0.0 };
        Some(BaselineStats {
            signal,
            samples: window.len(),
            mean,
            stdev,
            cv,
            stability: Stability::from_cv(cv),
        })
    }
}

impl Default for BaselineTracker {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

pub fn mean<'a, I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a f64>,
{
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Bessel-corrected standard deviation; needs two or more values.
pub fn sample_stdev<'a, I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a f64>,
    I::IntoIter: Clone,
{
    let iter = values.into_iter();
    let n = iter.clone().count();
    if n < 2 {
        return None;
    }
    let mean = mean(iter.clone())?;
    let sum_sq: f64 = iter.map(|v| (v - mean).powi(2)).sum();
    Some((sum_sq / (n - 1) as f64).sqrt())
}
