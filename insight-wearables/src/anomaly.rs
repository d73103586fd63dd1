//! Heart-rate anomaly detection against a trailing baseline.

use insight_core::{AnalysisConfig, Sample};
use serde::{Deserialize, Serialize};

use crate::stats::mean_std;

/// A sample that deviates from the preceding window by more than the sigma threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Anomaly {
    pub sample: Sample,
    pub baseline_mean: f64,
    pub z_score: f64,
}

/// Flag samples deviating from the mean of the previous `anomaly_window`
/// samples by more than `anomaly_sigma` standard deviations.
///
/// The baseline window includes earlier anomalies. Nothing is evaluated
/// until a full window has been seen.
pub fn detect_anomalies(samples: &[Sample], config: &AnalysisConfig) -> Vec<Anomaly> {
    let window = config.anomaly_window.max(2);
    let min_std = config.anomaly_min_std.max(f64::EPSILON);

    let mut ordered: Vec<Sample> = samples
        .iter()
        .filter(|sample| sample.value.is_finite())
        .copied()
        .collect();
    ordered.sort_by_key(|sample| sample.recorded_at);

    ordered
        .windows(window.saturating_add(1))
        .filter_map(|slice| {
            let (baseline, current) = slice.split_at(window);
            let sample = current[0];
            let (mean, std) = mean_std(baseline.iter().map(|s| s.value));
            let z_score = (sample.value - mean) / std.max(min_std);
            (z_score.abs() > config.anomaly_sigma).then(|| Anomaly {
                sample,
                baseline_mean: mean,
                z_score,
            })
        })
        .collect()
}

pub fn count_anomalies(samples: &[Sample], config: &AnalysisConfig) -> usize {
    detect_anomalies(samples, config).len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap()
    }

    fn minutes(values: &[f64]) -> Vec<Sample> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Sample::new(start() + Duration::minutes(i as i64), *v))
            .collect()
    }

    #[test]
    fn spike_after_steady_baseline_is_flagged() {
        let mut values = vec![60.0, 62.0, 61.0, 59.0, 60.0, 61.0, 62.0, 60.0, 59.0, 61.0];
        values.push(130.0);
        values.extend([61.0, 60.0]);

        let anomalies = detect_anomalies(&minutes(&values), &AnalysisConfig::default());
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].sample.value, 130.0);
        assert!(anomalies[0].z_score > 3.0);
    }

    #[test]
    fn warm_up_samples_are_never_flagged() {
        let values = [60.0, 60.0, 60.0, 200.0, 60.0, 60.0, 60.0, 60.0, 60.0, 60.0];
        assert_eq!(count_anomalies(&minutes(&values), &AnalysisConfig::default()), 0);
    }

    #[test]
    fn flat_baseline_uses_std_floor() {
        let mut values = vec![60.0; 10];
        values.push(62.5);
        assert_eq!(count_anomalies(&minutes(&values), &AnalysisConfig::default()), 0);

        values.push(63.0);
        // Baseline now includes 62.5; its spread is still under the floor.
        assert_eq!(count_anomalies(&minutes(&values), &AnalysisConfig::default()), 0);

        let mut spike = vec![60.0; 10];
        spike.push(63.5);
        assert_eq!(count_anomalies(&minutes(&spike), &AnalysisConfig::default()), 1);
    }

    #[test]
    fn each_flagged_sample_counts() {
        let mut values = vec![70.0; 10];
        values.extend([140.0, 150.0]);
        assert_eq!(count_anomalies(&minutes(&values), &AnalysisConfig::default()), 2);
    }

    #[test]
    fn oversized_window_flags_nothing() {
        let mut values = vec![70.0; 10];
        values.push(200.0);
        let config = AnalysisConfig {
            anomaly_window: usize::MAX,
            ..AnalysisConfig::default()
        };
        assert!(detect_anomalies(&minutes(&values), &config).is_empty());
    }
}
