use guardian_daemon::collector::{Sample, Signal};
use guardian_daemon::detector::{AnomalyDetector, TrendDirection, TrendEstimator};
use guardian_daemon::learner::BaselineTracker;

/// Alternates around 50 so the window has a small but non-trivial spread.
fn jittered(n: usize) -> Vec<f64> {
    (0..n).map(|i| if i % 2 == 0 { 49.0 } else { 51.0 }).collect()
}

#[test]
fn test_nine_samples_never_flag() {
    let detector = AnomalyDetector::default();
    let window = jittered(9);
    assert!(detector.check(Signal::Cpu, 99.0, &window).is_none());
}

#[test]
fn test_ten_samples_flag_outlier() {
    let detector = AnomalyDetector::default();
    let window = jittered(10);
    let anomaly = detector.check(Signal::Cpu, 99.0, &window).unwrap();
    assert_eq!(anomaly.signal, Signal::Cpu);
    assert_eq!(anomaly.value, 99.0);
    assert!((anomaly.mean - 50.0).abs() < 1e-9);
    assert!(anomaly.stdev > 0.5);
    assert!(anomaly.describe().starts_with("CPU anomaly: 99.0%"));
}

#[test]
fn test_values_inside_band_do_not_flag() {
    let detector = AnomalyDetector::default();
    let window = jittered(20);
    assert!(detector.check(Signal::Memory, 51.5, &window).is_none());
    assert!(detector.check(Signal::Memory, 48.5, &window).is_none());
}

#[test]
fn test_flat_window_never_flags() {
    let detector = AnomalyDetector::default();
    let window = vec![50.0; 30];
    assert!(detector.check(Signal::Disk, 100.0, &window).is_none());
}

#[test]
fn test_low_variance_floor() {
    let detector = AnomalyDetector::default();
    // stdev ~0.32, below the 0.5 floor
    let window: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 49.7 } else { 50.3 }).collect();
    assert!(detector.check(Signal::Cpu, 60.0, &window).is_none());
}

#[test]
fn test_threshold_is_configurable() {
    let window = jittered(10);
    // stdev is ~1.054, so 53 is about 2.85 sigma out
    assert!(AnomalyDetector::new(2.0).check(Signal::Cpu, 53.0, &window).is_some());
    assert!(AnomalyDetector::new(3.0).check(Signal::Cpu, 53.0, &window).is_none());
}

#[test]
fn test_detect_checks_each_signal_independently() {
    let mut tracker = BaselineTracker::new(50);
    for v in jittered(12) {
        tracker.record_sample(&Sample::new(v, v, v));
    }
    let detector = AnomalyDetector::default();
    let anomalies = detector.detect(&Sample::new(95.0, 50.0, 5.0), &tracker);
    let signals: Vec<Signal> = anomalies.iter().map(|a| a.signal).collect();
    assert_eq!(signals, vec![Signal::Cpu, Signal::Disk]);
}

#[test]
fn test_trend_needs_five_samples() {
    let estimator = TrendEstimator;
    assert!(estimator.estimate(&[1.0, 2.0, 3.0, 4.0]).is_none());
    assert!(estimator.estimate(&[1.0, 2.0, 3.0, 4.0, 5.0]).is_some());
}

#[test]
fn test_trend_slope_uses_last_five_entries() {
    let estimator = TrendEstimator;
    // Only [20, 22, 24, 26, 30] count: (30 - 20) / 5 = 2
    let trend = estimator.estimate(&[100.0, 0.0, 20.0, 22.0, 24.0, 26.0, 30.0]).unwrap();
    assert_eq!(trend.rate, 2.0);
    assert_eq!(trend.direction, TrendDirection::Increasing);
}

#[test]
fn test_trend_classification_boundaries() {
    let estimator = TrendEstimator;
    // slope exactly 1.0 is still stable
    let stable = estimator.estimate(&[10.0, 11.0, 12.0, 13.0, 15.0]).unwrap();
    assert_eq!(stable.rate, 1.0);
    assert_eq!(stable.direction, TrendDirection::Stable);

    let falling = estimator.estimate(&[80.0, 75.0, 70.0, 65.0, 60.0]).unwrap();
    assert_eq!(falling.rate, -4.0);
    assert_eq!(falling.direction, TrendDirection::Decreasing);
}

#[test]
fn test_trend_rate_is_rounded() {
    let estimator = TrendEstimator;
    let trend = estimator.estimate(&[0.0, 0.0, 0.0, 0.0, 10.123]).unwrap();
    assert_eq!(trend.rate, 2.02);
}

#[test]
fn test_analyze_reports_only_signals_with_enough_history() {
    let mut tracker = BaselineTracker::new(50);
    for v in [10.0, 20.0, 30.0, 40.0, 50.0] {
        tracker.record(Signal::Cpu, v);
    }
    tracker.record(Signal::Memory, 1.0);
    let report = TrendEstimator.analyze(&tracker);
    assert_eq!(report.len(), 1);
    assert_eq!(report[&Signal::Cpu].rate, 8.0);
}
