//! Configuration management (TOML)

use crate::error::{GuardianError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SECS_PER_DAY: u64 = 86_400;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub thresholds: ThresholdConfig,
    pub learning: LearningConfig,
    pub cleanup: CleanupConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Monitoring period; cleanup and optimization run on multiples of it.
    pub sample_interval_ms: u64,
    pub cleanup_every: u32,
    pub optimize_every: u32,
    pub cycle_cooldown_secs: u64,
    pub job_timeout_secs: u64,
    /// Forward warning and error alerts as desktop notifications.
    pub desktop_notifications: bool,
    /// Filesystem whose usage is reported as the disk signal.
    pub disk_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub cpu_threshold: f64,
    pub memory_threshold: f64,
    pub disk_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    pub ml_learning_window: usize,
    pub anomaly_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub auto_cleanup: bool,
    pub max_file_age_days: u64,
    pub cleanup_roots: Vec<PathBuf>,
    pub max_batch_size: usize,
    /// Trees searched for `.cache` directories during optimization passes.
    pub cache_roots: Vec<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 1000,
            cleanup_every: 6,
            optimize_every: 10,
            cycle_cooldown_secs: 5,
            job_timeout_secs: 30,
            desktop_notifications: false,
            disk_path: PathBuf::from("/"),
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            cpu_threshold: 80.0,
            memory_threshold: 85.0,
            disk_threshold: 90.0,
        }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            ml_learning_window: 50,
            anomaly_threshold: 2.0,
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        let mut cleanup_roots = vec![std::env::temp_dir()];
        if let Some(downloads) = directories::UserDirs::new()
            .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
        {
            cleanup_roots.push(downloads);
        }
        Self {
            auto_cleanup: false,
            max_file_age_days: 30,
            cleanup_roots,
            max_batch_size: 15,
            cache_roots: vec![],
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| GuardianError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        let io_err = |source| GuardianError::ConfigIo {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, content).map_err(io_err)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "host-guardian")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(GuardianError::InvalidConfig(msg));

        for (name, value) in [
            ("cpu_threshold", self.thresholds.cpu_threshold),
            ("memory_threshold", self.thresholds.memory_threshold),
            ("disk_threshold", self.thresholds.disk_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return invalid(format!("{} must be within 0..=100, got {}", name, value));
            }
        }
        if self.learning.ml_learning_window == 0 {
            return invalid("ml_learning_window must be positive".into());
        }
        if !(self.learning.anomaly_threshold > 0.0) {
            return invalid(format!(
                "anomaly_threshold must be positive, got {}",
                self.learning.anomaly_threshold
            ));
        }
        if self.general.sample_interval_ms == 0 {
            return invalid("sample_interval_ms must be positive".into());
        }
        if self.general.cleanup_every == 0 || self.general.optimize_every == 0 {
            return invalid("cleanup_every and optimize_every must be positive".into());
        }
        let monitor = Duration::from_millis(self.general.sample_interval_ms);
        let longest = self.general.cleanup_every.max(self.general.optimize_every);
        if monitor.checked_mul(longest).is_none() {
            return invalid(format!(
                "sample_interval_ms {} overflows the cleanup and optimize periods",
                self.general.sample_interval_ms
            ));
        }
        if self.general.job_timeout_secs == 0 {
            return invalid("job_timeout_secs must be positive".into());
        }
        if self.cleanup.max_file_age_days.checked_mul(SECS_PER_DAY).is_none() {
            return invalid(format!(
                "max_file_age_days is out of range, got {}",
                self.cleanup.max_file_age_days
            ));
        }
        if self.cleanup.max_batch_size == 0 {
            return invalid("max_batch_size must be positive".into());
        }
        Ok(())
    }
}
