use guardian_daemon::error::GuardianError;
use guardian_daemon::executor::{
    passes_final_check, CleanupExecutor, CleanupOutcome, MAX_REMOVABLE_BYTES,
};
use guardian_daemon::planner::{categorize, Category, CleanupCandidate};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};
use tokio_util::sync::CancellationToken;

fn candidate(path: &Path, priority: f64, safety_score: f64) -> CleanupCandidate {
    CleanupCandidate {
        path: path.to_path_buf(),
        size_mb: 0.0,
        age_days: 60,
        priority,
        category: categorize(path),
        safety_score,
    }
}

/// `TempDir::new` names directories `.tmpXXXX`, which would put every
/// fixture in the temp category.
fn fixture_dir() -> TempDir {
    Builder::new().prefix("exec").tempdir().unwrap()
}

fn write_file(dir: &TempDir, name: &str, bytes: usize) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, vec![b'x'; bytes]).unwrap();
    path
}

#[test]
fn test_disabled_executor_removes_nothing() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "old.tmp", 16);
    let executor = CleanupExecutor::new(false, 15);

    let outcome = executor
        .execute(&[candidate(&path, 0.9, 0.9)], &CancellationToken::new())
        .unwrap();
    assert_eq!(outcome, CleanupOutcome::default());
    assert!(path.exists());
    assert!(!executor.is_enabled());
}

#[test]
fn test_select_applies_gates_and_batch_cap() {
    let executor = CleanupExecutor::new(true, 2);
    let candidates = vec![
        candidate(Path::new("/data/a.tmp"), 0.9, 0.9),
        // safety at the gate
        candidate(Path::new("/data/b.tmp"), 0.9, 0.7),
        // priority at the gate
        candidate(Path::new("/data/c.tmp"), 0.5, 0.9),
        candidate(Path::new("/data/d.log"), 0.8, 0.9),
        candidate(Path::new("/data/e.bak"), 0.7, 0.9),
    ];
    let selected: Vec<_> = executor.select(&candidates).iter().map(|c| c.path.clone()).collect();
    assert_eq!(selected, vec![PathBuf::from("/data/a.tmp"), PathBuf::from("/data/d.log")]);
}

#[test]
fn test_execute_removes_selected_files() {
    let dir = fixture_dir();
    let tmp = write_file(&dir, "build.tmp", 100);
    let log = write_file(&dir, "run.log", 50);
    let risky = write_file(&dir, "keep.tmp", 10);
    let executor = CleanupExecutor::new(true, 15);

    let candidates = vec![
        candidate(&tmp, 0.9, 0.9),
        candidate(&log, 0.8, 0.9),
        candidate(&risky, 0.8, 0.3),
    ];
    let outcome = executor.execute(&candidates, &CancellationToken::new()).unwrap();

    assert_eq!(outcome.removed, 2);
    assert_eq!(outcome.bytes_removed, 150);
    assert_eq!(outcome.safety_skipped, 0);
    assert_eq!(outcome.failed, 0);
    assert_eq!(outcome.categories.get(&Category::Temp), Some(&1));
    assert_eq!(outcome.categories.get(&Category::Logs), Some(&1));
    assert!(!tmp.exists());
    assert!(!log.exists());
    assert!(risky.exists());
    assert_eq!(outcome.efficiency(candidates.len()), 66.7);
    assert!(!executor.is_running());
}

#[test]
fn test_final_check_skips_unsafe_files() {
    let dir = TempDir::new().unwrap();
    let binary = write_file(&dir, "setup.exe", 10);
    let huge = dir.path().join("huge.tmp");
    File::create(&huge).unwrap().set_len(MAX_REMOVABLE_BYTES + 1).unwrap();
    let missing = dir.path().join("gone.tmp");
    let executor = CleanupExecutor::new(true, 15);

    // Scores are forced high so only the final check can stop removal
    let candidates = vec![
        candidate(&binary, 0.9, 0.9),
        candidate(&huge, 0.9, 0.9),
        candidate(&missing, 0.9, 0.9),
    ];
    let outcome = executor.execute(&candidates, &CancellationToken::new()).unwrap();

    assert_eq!(outcome.removed, 0);
    assert_eq!(outcome.safety_skipped, 3);
    assert!(binary.exists());
    assert!(huge.exists());
    assert!(!passes_final_check(&binary));
    assert!(!passes_final_check(&missing));
}

#[test]
fn test_final_check_accepts_limit_sized_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("edge.tmp");
    File::create(&path).unwrap().set_len(MAX_REMOVABLE_BYTES).unwrap();
    assert!(passes_final_check(&path));
    assert!(!passes_final_check(dir.path()));
}

#[test]
fn test_cancelled_execution_stops_before_removal() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "old.tmp", 8);
    let executor = CleanupExecutor::new(true, 15);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = executor.execute(&[candidate(&path, 0.9, 0.9)], &cancel).unwrap();
    assert_eq!(outcome.removed, 0);
    assert!(path.exists());
}

#[test]
fn test_executor_can_run_again_after_a_batch() {
    let dir = TempDir::new().unwrap();
    let first = write_file(&dir, "a.tmp", 4);
    let second = write_file(&dir, "b.tmp", 4);
    let executor = CleanupExecutor::new(true, 15);
    let cancel = CancellationToken::new();

    assert_eq!(executor.execute(&[candidate(&first, 0.9, 0.9)], &cancel).unwrap().removed, 1);
    assert_eq!(executor.execute(&[candidate(&second, 0.9, 0.9)], &cancel).unwrap().removed, 1);
}

#[test]
fn test_efficiency_without_candidates() {
    assert_eq!(CleanupOutcome::default().efficiency(0), 0.0);
}

#[test]
fn test_overlapping_batch_is_refused() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "old.tmp", 8);
    let executor = CleanupExecutor::new(true, 15);
    let cancel = CancellationToken::new();

    let batch = executor.begin().unwrap();
    assert!(executor.is_running());
    let result = executor.execute(&[candidate(&path, 0.9, 0.9)], &cancel);
    assert!(matches!(result, Err(GuardianError::CleanupInProgress)));
    assert!(path.exists());

    drop(batch);
    assert!(!executor.is_running());
    assert_eq!(executor.execute(&[candidate(&path, 0.9, 0.9)], &cancel).unwrap().removed, 1);
}

#[test]
fn test_category_follows_parent_directories() {
    let dir = TempDir::new().unwrap();
    let log = write_file(&dir, "run.log", 10);
    let executor = CleanupExecutor::new(true, 15);

    let outcome = executor
        .execute(&[candidate(&log, 0.9, 0.9)], &CancellationToken::new())
        .unwrap();
    // the `.tmp` directory name matches before the `.log` extension
    assert_eq!(outcome.categories.get(&Category::Temp), Some(&1));
    assert_eq!(outcome.categories.get(&Category::Logs), None);
}
