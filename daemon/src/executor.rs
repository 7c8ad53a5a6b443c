//! Safety-gated file removal

use crate::config::CleanupConfig;
use crate::error::{GuardianError, Result};
use crate::planner::{is_binary, Category, CleanupCandidate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const MIN_SAFETY: f64 = 0.7;
pub const MIN_PRIORITY: f64 = 0.5;
/// Files above this size are never removed automatically.
pub const MAX_REMOVABLE_BYTES: u64 = 100 * 1024 * 1024;
const PROTECTED_DIRS: [&str; 2] = ["system32", "program files"];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanupOutcome {
    pub removed: usize,
    pub bytes_removed: u64,
    pub categories: BTreeMap<Category, usize>,
    /// Selected candidates rejected by the final safety check.
    pub safety_skipped: usize,
    /// Candidates that passed the check but could not be removed.
    pub failed: usize,
}

impl CleanupOutcome {
    /// Share of all planned candidates that were removed, in percent.
    pub fn efficiency(&self, candidates: usize) -> f64 {
        if candidates == 0 {
            return 0.0;
        }
        (self.removed as f64 / candidates as f64 * 1000.0).round() / 10.0
    }

    pub fn megabytes_removed(&self) -> f64 {
        self.bytes_removed as f64 / (1024.0 * 1024.0)
    }
}

/// Removes the safest, highest-priority candidates, a bounded batch at a time.
///
/// Only one batch may run at once; a second caller gets
/// [`GuardianError::CleanupInProgress`] instead of racing the first.
pub struct CleanupExecutor {
    enabled: bool,
    max_batch_size: usize,
    in_flight: AtomicBool,
}

/// Marks a batch as running until dropped.
pub struct BatchGuard<'a>(&'a AtomicBool);

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CleanupExecutor {
    pub fn new(enabled: bool, max_batch_size: usize) -> Self {
        Self {
            enabled,
            max_batch_size,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &CleanupConfig) -> Self {
        Self::new(config.auto_cleanup, config.max_batch_size)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Candidates eligible for removal, in ranked order, capped at the batch size.
    pub fn select<'a>(&self, candidates: &'a [CleanupCandidate]) -> Vec<&'a CleanupCandidate> {
        candidates
            .iter()
            .filter(|c| c.safety_score > MIN_SAFETY && c.priority > MIN_PRIORITY)
            .take(self.max_batch_size)
            .collect()
    }

    /// Claims the executor for one batch.
    pub fn begin(&self) -> Result<BatchGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| BatchGuard(&self.in_flight))
            .map_err(|_| GuardianError::CleanupInProgress)
    }

    pub fn execute(
        &self,
        candidates: &[CleanupCandidate],
        cancel: &CancellationToken,
    ) -> Result<CleanupOutcome> {
        if !self.enabled {
            return Ok(CleanupOutcome::default());
        }
        let _batch = self.begin()?;

        let mut outcome = CleanupOutcome::default();
        for candidate in self.select(candidates) {
            if cancel.is_cancelled() {
                debug!("Cleanup cancelled after {} removals", outcome.removed);
                break;
            }
            let Some(size) = vetted_size(&candidate.path) else {
                outcome.safety_skipped += 1;
                continue;
            };
            match fs::remove_file(&candidate.path) {
                Ok(()) => {
                    outcome.removed += 1;
                    outcome.bytes_removed += size;
                    *outcome.categories.entry(candidate.category).or_insert(0) += 1;
                }
                Err(e) => {
                    debug!("Failed to remove {:?}: {}", candidate.path, e);
                    outcome.failed += 1;
                }
            }
        }
        Ok(outcome)
    }
}

/// Last look at a file right before removal.
pub fn passes_final_check(path: &Path) -> bool {
    vetted_size(path).is_some()
}

/// Current size of `path` if it is still safe to remove.
fn vetted_size(path: &Path) -> Option<u64> {
    if is_binary(path) {
        return None;
    }
    let text = path.to_string_lossy().to_lowercase();
    if PROTECTED_DIRS.iter().any(|d| text.contains(d)) {
        return None;
    }
    let metadata = fs::metadata(path).ok()?;
    if !metadata.is_file() || metadata.len() > MAX_REMOVABLE_BYTES {
        return None;
    }
    Some(metadata.len())
}
