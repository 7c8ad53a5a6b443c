//! File enumeration under the cleanup roots

use crate::error::{GuardianError, Result};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use walkdir::WalkDir;

/// Metadata for one regular file found under a cleanup root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub size_bytes: u64,
}

/// Recursively enumerates regular files under each root.
///
/// Missing roots are skipped. Entries that vanish or cannot be stat'ed while
/// walking are skipped; only an unreadable root is reported as an error.
pub fn walk_roots(roots: &[PathBuf], cancel: &CancellationToken) -> Result<Vec<FileRecord>> {
    let mut records = Vec::new();
    for root in roots {
        if !root.exists() {
            debug!("Cleanup root {:?} does not exist, skipping", root);
            continue;
        }
        walk_root(root, cancel, &mut records)?;
    }
    Ok(records)
}

fn walk_root(root: &Path, cancel: &CancellationToken, out: &mut Vec<FileRecord>) -> Result<()> {
    for entry in WalkDir::new(root).follow_links(false) {
        if cancel.is_cancelled() {
            return Err(GuardianError::Cancelled);
        }
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(GuardianError::Walk {
                    root: root.to_path_buf(),
                    message: e.to_string(),
                })
            }
            Err(_) => continue,
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        out.push(FileRecord {
            path: entry.into_path(),
            modified,
            size_bytes: metadata.len(),
        });
    }
    Ok(())
}
