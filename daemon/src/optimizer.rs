//! Periodic optimization pass and the running optimization score

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use walkdir::WalkDir;

pub const CACHE_DIR_MARKER: &str = ".cache";
const CACHE_PURGE_GAIN: i32 = 20;
/// Charged on every pass, so a pass that finds nothing lowers the score.
const PASS_COST: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OptimizationState {
    score: u8,
}

impl OptimizationState {
    pub fn new() -> Self {
        Self { score: 100 }
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    /// Adds a pass gain (minus the pass cost), clamped to 0..=100.
    pub fn apply(&mut self, gain: i32) -> u8 {
        let next = (self.score as i32 + gain - PASS_COST).clamp(0, 100);
        self.score = next as u8;
        self.score
    }
}

impl Default for OptimizationState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptimizationPass {
    pub improvements: Vec<String>,
    pub gain: i32,
    pub cache_dirs_cleared: usize,
    pub bytes_cleared: u64,
}

pub struct Optimizer {
    cache_roots: Vec<PathBuf>,
}

impl Optimizer {
    pub fn new(cache_roots: Vec<PathBuf>) -> Self {
        Self { cache_roots }
    }

    pub fn run(&self, cancel: &CancellationToken) -> OptimizationPass {
        let mut pass = OptimizationPass::default();
        for root in &self.cache_roots {
            self.purge_caches(root, cancel, &mut pass);
        }
        if pass.cache_dirs_cleared > 0 {
            pass.improvements.push(format!(
                "Cache cleanup: {} items, {:.1}MB",
                pass.cache_dirs_cleared,
                pass.bytes_cleared as f64 / (1024.0 * 1024.0)
            ));
            pass.gain += CACHE_PURGE_GAIN;
        }
        pass
    }

    fn purge_caches(&self, root: &Path, cancel: &CancellationToken, pass: &mut OptimizationPass) {
        let mut entries = WalkDir::new(root).follow_links(false).into_iter();
        while let Some(entry) = entries.next() {
            if cancel.is_cancelled() {
                return;
            }
            let Ok(entry) = entry else { continue };
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                continue;
            }
            if !entry.file_name().to_string_lossy().contains(CACHE_DIR_MARKER) {
                continue;
            }
            let size = tree_size(entry.path());
            match fs::remove_dir_all(entry.path()) {
                Ok(()) => {
                    pass.cache_dirs_cleared += 1;
                    pass.bytes_cleared += size;
                }
                Err(e) => debug!("Failed to clear cache {:?}: {}", entry.path(), e),
            }
            entries.skip_current_dir();
        }
    }
}

fn tree_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}
