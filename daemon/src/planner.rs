//! Cleanup candidate scoring and ranking

use crate::collector::FileRecord;
use crate::config::CleanupConfig;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

const SECS_PER_DAY: u64 = 86_400;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Candidates at or below this priority are dropped from the plan.
pub const MIN_PRIORITY: f64 = 0.2;

/// Disposable file groups, in match order.
pub const CATEGORY_PATTERNS: [(Category, &[&str]); 3] = [
    (Category::Temp, &[".tmp", ".cache"]),
    (Category::Logs, &[".log", ".out"]),
    (Category::Backup, &[".bak", ".old"]),
];

/// Path fragments that mark a file as unsafe to touch.
pub const PROTECTED_FRAGMENTS: [&str; 4] = ["system", "program", "windows", "config"];
pub const BINARY_EXTENSIONS: [&str; 3] = ["exe", "dll", "sys"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Temp,
    Logs,
    Backup,
    Unknown,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Temp => "temp",
            Category::Logs => "logs",
            Category::Backup => "backup",
            Category::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanupCandidate {
    pub path: PathBuf,
    pub size_mb: f64,
    pub age_days: u64,
    pub priority: f64,
    pub category: Category,
    pub safety_score: f64,
}

pub struct CleanupPlanner {
    max_file_age: Duration,
}

impl CleanupPlanner {
    pub fn new(max_file_age_days: u64) -> Self {
        Self {
            max_file_age: Duration::from_secs(max_file_age_days.saturating_mul(SECS_PER_DAY)),
        }
    }

    pub fn from_config(config: &CleanupConfig) -> Self {
        Self::new(config.max_file_age_days)
    }

    /// Scores every stale file and returns the worthwhile ones, highest
    /// priority first. Equal priorities keep their discovery order.
    pub fn plan(&self, records: &[FileRecord], now: SystemTime) -> Vec<CleanupCandidate> {
        let mut candidates: Vec<CleanupCandidate> = records
            .iter()
            .filter_map(|record| self.score(record, now))
            .collect();
        candidates.sort_by(|a, b| b.priority.total_cmp(&a.priority));
        candidates
    }

    /// `None` for files that are too young or not worth removing.
    pub fn score(&self, record: &FileRecord, now: SystemTime) -> Option<CleanupCandidate> {
        // Files from the future count as brand new
        let age = now.duration_since(record.modified).unwrap_or_default();
        if age <= self.max_file_age {
            return None;
        }
        let age_days = age.as_secs() / SECS_PER_DAY;
        let size_mb = record.size_bytes as f64 / BYTES_PER_MB;
        let priority = priority(&record.path, age_days, size_mb);
        if priority <= MIN_PRIORITY {
            return None;
        }
        Some(CleanupCandidate {
            path: record.path.clone(),
            size_mb,
            age_days,
            priority,
            category: categorize(&record.path),
            safety_score: safety_score(&record.path),
        })
    }
}

/// Weighted age, size, type and location score, rounded to three decimals.
pub fn priority(path: &Path, age_days: u64, size_mb: f64) -> f64 {
    let age_score = (age_days as f64 / 30.0).min(1.0);
    let size_score = (size_mb / 100.0).min(1.0);
    let type_score = if has_disposable_extension(path) { 0.8 } else { 0.3 };
    let location_score = if lowercase(path).contains("temp") { 0.9 } else { 0.5 };

    let raw = age_score * 0.4 + size_score * 0.3 + type_score * 0.2 + location_score * 0.1;
    (raw * 1000.0).round() / 1000.0
}

pub fn categorize(path: &Path) -> Category {
    let text = lowercase(path);
    CATEGORY_PATTERNS
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| text.contains(p)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Unknown)
}

pub fn safety_score(path: &Path) -> f64 {
    let text = lowercase(path);
    if PROTECTED_FRAGMENTS.iter().any(|f| text.contains(f)) {
        0.1
    } else if is_binary(path) {
        0.3
    } else {
        0.9
    }
}

/// Executables, libraries and drivers.
pub fn is_binary(path: &Path) -> bool {
    extension(path).is_some_and(|ext| BINARY_EXTENSIONS.contains(&ext.as_str()))
}

fn has_disposable_extension(path: &Path) -> bool {
    let Some(ext) = extension(path) else {
        return false;
    };
    let dotted = format!(".{}", ext);
    CATEGORY_PATTERNS
        .iter()
        .flat_map(|(_, patterns)| patterns.iter())
        .any(|p| dotted.contains(p))
}

fn extension(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

fn lowercase(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}
