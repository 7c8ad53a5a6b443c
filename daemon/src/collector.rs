//! Resource samples and the sources that produce them

pub mod linux;
pub mod walker;

pub use linux::LinuxSampleSource;
pub use walker::{walk_roots, FileRecord};

use crate::error::{GuardianError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// The fixed set of signals the baseline tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Cpu,
    Memory,
    Disk,
}

impl Signal {
    pub const ALL: [Signal; 3] = [Signal::Cpu, Signal::Memory, Signal::Disk];

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Cpu => "cpu",
            Signal::Memory => "memory",
            Signal::Disk => "disk",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Signal {
    type Err = GuardianError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Signal::Cpu),
            "memory" | "mem" => Ok(Signal::Memory),
            "disk" => Ok(Signal::Disk),
            other => Err(GuardianError::UnknownSignal(other.to_string())),
        }
    }
}

/// One reading of host resource usage, produced once per monitoring cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: u64,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_available_gb: f64,
    pub disk_percent: f64,
    pub disk_free_gb: f64,
}

impl Sample {
    pub fn new(cpu_percent: f64, memory_percent: f64, disk_percent: f64) -> Self {
        Self {
            timestamp: unix_now(),
            cpu_percent,
            memory_percent,
            memory_available_gb: 0.0,
            disk_percent,
            disk_free_gb: 0.0,
        }
    }

    pub fn value(&self, signal: Signal) -> f64 {
        match signal {
            Signal::Cpu => self.cpu_percent,
            Signal::Memory => self.memory_percent,
            Signal::Disk => self.disk_percent,
        }
    }
}

pub trait SampleSource: Send + Sync {
    fn sample(&self) -> Result<Sample>;
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
