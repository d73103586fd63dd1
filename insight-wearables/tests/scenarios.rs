use chrono::{DateTime, Duration, TimeZone, Utc};
use insight_core::{
    AnalysisConfig, AnalysisRequest, BiometricSource, DateRange, HeartRateSeries, Sample,
    SourceError, TrendDirection,
};
use insight_wearables::{
    analyze_glucose, analyze_glucose_for, analyze_heart_rate, analyze_heart_rate_for,
};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Five-minute CGM readings: `high_days` at 100 mg/dL, then 55 mg/dL until `total_days`.
fn cgm(high_days: i64, total_days: i64) -> Vec<Sample> {
    let cutoff = start() + Duration::days(high_days);
    (0..=total_days * 288)
        .map(|i| {
            let at = start() + Duration::minutes(5 * i);
            Sample::new(at, if at < cutoff { 100.0 } else { 55.0 })
        })
        .collect()
}

#[test]
fn prolonged_low_glucose_is_one_declining_episode() {
    let samples = cgm(6, 9);
    let range = DateRange::new(start(), start() + Duration::days(9));

    let analysis = analyze_glucose(&samples, &range, &AnalysisConfig::default())
        .expect("samples in window");

    assert_eq!(analysis.hypo_episodes, 1);
    assert_eq!(analysis.hyper_episodes, 0);
    assert_eq!(analysis.average_glucose_trend.data_points, 2593);
    assert_eq!(
        analysis.average_glucose_trend.trend_direction,
        TrendDirection::Declining
    );
    assert_eq!(
        analysis.time_in_range_trend.trend_direction,
        TrendDirection::Declining
    );
    assert!(analysis.average_glucose_trend.trend_percentage < 0.0);
    assert!(analysis.risk_factors.contains(&"low_time_in_range".to_string()));
    assert!(!analysis.risk_factors.contains(&"risk_of_hypoglycemia".to_string()));
    assert_eq!(analysis.dawn_phenomenon_severity, None);

    let json = serde_json::to_value(&analysis).unwrap();
    assert_eq!(json["average_glucose_trend"]["trend_direction"], "declining");
    assert_eq!(json["average_glucose_trend"]["metric_name"], "average_glucose");
    assert!(json["dawn_phenomenon_severity"].is_null());
}

#[test]
fn injected_hypo_runs_are_counted() {
    let range = DateRange::new(start(), start() + Duration::days(7));
    let mut samples = cgm(7, 7);
    for night in [1i64, 3] {
        let from = start() + Duration::days(night) + Duration::hours(2);
        for sample in samples
            .iter_mut()
            .filter(|s| s.recorded_at >= from && s.recorded_at < from + Duration::minutes(25))
        {
            sample.value = 58.0;
        }
    }
    // A single low reading is too short to count.
    samples[2000].value = 50.0;

    let analysis = analyze_glucose(&samples, &range, &AnalysisConfig::default()).unwrap();
    assert_eq!(analysis.hypo_episodes, 2);
    assert!(analysis.risk_factors.contains(&"risk_of_hypoglycemia".to_string()));
}

#[test]
fn constant_resting_rate_is_confidently_stable() {
    let range = DateRange::new(start(), start() + Duration::days(10));
    let resting: Vec<Sample> = (0..10)
        .map(|day| Sample::new(start() + Duration::days(day) + Duration::hours(6), 60.0))
        .collect();
    let series = HeartRateSeries {
        resting,
        ..HeartRateSeries::default()
    };

    let analysis = analyze_heart_rate(&series, &range, &AnalysisConfig::default()).unwrap();
    let trend = &analysis.resting_hr_trend;
    assert_eq!(trend.trend_direction, TrendDirection::Stable);
    assert!(trend.confidence_score > 0.8);
    assert!(trend.confidence_score <= 1.0);
    assert_eq!(trend.data_points, 10);
    assert_eq!(trend.last_updated, range.end);
    assert!(analysis.risk_factors.is_empty());
}

struct FixedSource {
    glucose: Option<Vec<Sample>>,
}

impl BiometricSource for FixedSource {
    fn heart_rate(&self, user_id: &str, _range: &DateRange) -> Result<HeartRateSeries, SourceError> {
        Err(SourceError::unavailable(user_id, "no wearable linked"))
    }

    fn glucose(&self, user_id: &str, _range: &DateRange) -> Result<Vec<Sample>, SourceError> {
        self.glucose
            .clone()
            .ok_or_else(|| SourceError::unavailable(user_id, "no CGM linked"))
    }
}

#[test]
fn source_requests_carry_identity_and_window() {
    let source = FixedSource {
        glucose: Some(cgm(3, 3)),
    };
    let request = AnalysisRequest::new("user-7", DateRange::new(start(), start() + Duration::days(3)));
    let config = AnalysisConfig::default();

    assert!(analyze_heart_rate_for(&source, &request, &config).is_none());
    let analysis = analyze_glucose_for(&source, &request, &config).unwrap();
    assert_eq!(analysis.hypo_episodes, 0);

    let unlinked = FixedSource { glucose: None };
    assert!(analyze_glucose_for(&unlinked, &request, &config).is_none());

    let dynamic: &dyn BiometricSource = &source;
    assert!(analyze_glucose_for(dynamic, &request, &config).is_some());
}
