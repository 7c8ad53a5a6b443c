use guardian_daemon::collector::FileRecord;
use guardian_daemon::planner::{categorize, priority, safety_score, Category, CleanupPlanner};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

const DAY: u64 = 86_400;
const MB: u64 = 1024 * 1024;

fn record(path: &str, age_days: u64, size_bytes: u64, now: SystemTime) -> FileRecord {
    FileRecord {
        path: PathBuf::from(path),
        modified: now - Duration::from_secs(age_days * DAY + 60),
        size_bytes,
    }
}

#[test]
fn test_reference_priority() {
    let now = SystemTime::now();
    let planner = CleanupPlanner::new(30);
    let candidate = planner
        .score(&record("/home/u/temp/build.tmp", 31, 50 * MB, now), now)
        .unwrap();
    // 0.4 * 1 + 0.3 * 0.5 + 0.2 * 0.8 + 0.1 * 0.9
    assert!((candidate.priority - 0.80).abs() < 1e-9);
    assert_eq!(candidate.age_days, 31);
    assert!((candidate.size_mb - 50.0).abs() < 1e-9);
    assert_eq!(candidate.category, Category::Temp);
    assert_eq!(candidate.safety_score, 0.9);
}

#[test]
fn test_priority_factors() {
    // young, tiny, unknown type, ordinary location
    assert_eq!(priority(Path::new("/data/notes.txt"), 0, 0.0), 0.11);
    // age and size saturate at 1
    assert_eq!(priority(Path::new("/data/dump.bak"), 400, 5000.0), 0.91);
    // extension match is case-insensitive
    assert_eq!(priority(Path::new("/data/RUN.LOG"), 15, 0.0), 0.41);
}

#[test]
fn test_priority_is_rounded_to_three_decimals() {
    let p = priority(Path::new("/data/a.txt"), 7, 1.234);
    assert_eq!(p, (p * 1000.0).round() / 1000.0);
}

#[test]
fn test_young_files_are_ignored() {
    let now = SystemTime::now();
    let planner = CleanupPlanner::new(30);
    let young = FileRecord {
        path: PathBuf::from("/var/tmp/x.tmp"),
        modified: now - Duration::from_secs(29 * DAY),
        size_bytes: 10 * MB,
    };
    assert!(planner.score(&young, now).is_none());

    let future = FileRecord {
        path: PathBuf::from("/var/tmp/y.tmp"),
        modified: now + Duration::from_secs(DAY),
        size_bytes: 10 * MB,
    };
    assert!(planner.score(&future, now).is_none());
}

#[test]
fn test_low_priority_files_are_dropped() {
    let now = SystemTime::now();
    // age threshold of zero lets a day-old file through the age gate;
    // 0.4 * (1/30) + 0 + 0.06 + 0.05 is still below 0.2
    let planner = CleanupPlanner::new(0);
    assert!(planner.score(&record("/data/a.txt", 1, 0, now), now).is_none());
}

#[test]
fn test_categories() {
    assert_eq!(categorize(Path::new("/x/a.tmp")), Category::Temp);
    assert_eq!(categorize(Path::new("/x/thing.cache")), Category::Temp);
    assert_eq!(categorize(Path::new("/x/app.log")), Category::Logs);
    assert_eq!(categorize(Path::new("/x/nohup.out")), Category::Logs);
    assert_eq!(categorize(Path::new("/x/db.BAK")), Category::Backup);
    assert_eq!(categorize(Path::new("/x/site.old")), Category::Backup);
    assert_eq!(categorize(Path::new("/x/readme.md")), Category::Unknown);
    // path fragments count, first group wins
    assert_eq!(categorize(Path::new("/x/.cache/pkg/data.log")), Category::Temp);
}

#[test]
fn test_safety_scores() {
    assert_eq!(safety_score(Path::new("/home/u/Downloads/a.zip")), 0.9);
    assert_eq!(safety_score(Path::new("/home/u/Downloads/setup.exe")), 0.3);
    assert_eq!(safety_score(Path::new("/home/u/lib.DLL")), 0.3);
    assert_eq!(safety_score(Path::new("/home/u/.config/app/old.log")), 0.1);
    assert_eq!(safety_score(Path::new("C:/Windows/Temp/a.tmp")), 0.1);
    assert_eq!(safety_score(Path::new("/opt/Program Files/x.tmp")), 0.1);
    assert_eq!(safety_score(Path::new("/var/system/driver.sys")), 0.1);
}

#[test]
fn test_plan_sorts_by_priority_descending() {
    let now = SystemTime::now();
    let planner = CleanupPlanner::new(30);
    let records = vec![
        record("/data/small.txt", 40, MB, now),
        record("/data/temp/huge.tmp", 90, 200 * MB, now),
        record("/data/medium.log", 45, 40 * MB, now),
        record("/data/new.log", 2, 40 * MB, now),
    ];
    let plan = planner.plan(&records, now);
    let names: Vec<_> = plan
        .iter()
        .map(|c| c.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["huge.tmp", "medium.log", "small.txt"]);
    assert!(plan.windows(2).all(|w| w[0].priority >= w[1].priority));
}

#[test]
fn test_ties_keep_discovery_order() {
    let now = SystemTime::now();
    let planner = CleanupPlanner::new(30);
    let records = vec![
        record("/data/b.log", 60, 10 * MB, now),
        record("/data/a.log", 60, 10 * MB, now),
        record("/data/c.log", 60, 10 * MB, now),
    ];
    let plan = planner.plan(&records, now);
    let order: Vec<_> = plan.iter().map(|c| c.path.clone()).collect();
    let expected: Vec<_> = records.iter().map(|r| r.path.clone()).collect();
    assert_eq!(order, expected);
}

#[test]
fn test_plan_is_idempotent() {
    let now = SystemTime::now();
    let planner = CleanupPlanner::new(30);
    let records = vec![
        record("/data/temp/a.tmp", 31, 50 * MB, now),
        record("/data/b.bak", 100, 5 * MB, now),
        record("/data/c.txt", 35, 90 * MB, now),
    ];
    assert_eq!(planner.plan(&records, now), planner.plan(&records, now));
}

#[test]
fn test_huge_age_limit_does_not_overflow() {
    let now = SystemTime::now();
    let planner = CleanupPlanner::new(u64::MAX);
    assert!(planner.score(&record("/data/temp/a.tmp", 400, 50 * MB, now), now).is_none());
}
