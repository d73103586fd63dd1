//! Heart-rate and glucose reports composed from trends, episodes and anomalies.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use insight_core::{
    AnalysisConfig, AnalysisRequest, BiometricSource, BiometricTrend, DateRange, GlucoseAnalysis,
    HeartRateAnalysis, HeartRateSeries, MetricPolarity, Sample, SourceError,
};
use tracing::{debug, warn};

use crate::anomaly::count_anomalies;
use crate::episodes::{dawn_phenomenon_severity, find_episodes, Excursion};
use crate::risk::{evaluate, RuleContext, GLUCOSE_RULES, HEART_RATE_RULES};
use crate::stats::{coefficient_of_variation, mean_std};
use crate::trend::{analyze_trend, fitted_trend, SeriesSummary};

pub const RESTING_HEART_RATE: &str = "resting_heart_rate";
pub const MAX_HEART_RATE: &str = "max_heart_rate";
pub const HEART_RATE_VARIABILITY: &str = "heart_rate_variability";
pub const AVERAGE_GLUCOSE: &str = "average_glucose";
pub const TIME_IN_RANGE: &str = "time_in_range";
pub const GLUCOSE_VARIABILITY: &str = "glucose_variability";

/// Heart-rate report for `range`, or `None` when the window holds no samples.
///
/// Resting and max series fall back to daily rollups of the raw samples when
/// the source did not provide them.
pub fn analyze_heart_rate(
    series: &HeartRateSeries,
    range: &DateRange,
    config: &AnalysisConfig,
) -> Option<HeartRateAnalysis> {
    let raw = within(&series.samples, range);
    let mut resting = within(&series.resting, range);
    let mut max = within(&series.max, range);
    let hrv = within(&series.hrv, range);

    if raw.is_empty() && resting.is_empty() && max.is_empty() && hrv.is_empty() {
        debug!(start = %range.start, end = %range.end, "no heart-rate samples in window");
        return None;
    }

    if (resting.is_empty() || max.is_empty()) && !raw.is_empty() {
        let rollup = HeartRateSeries::from_raw(raw.clone(), config.local_offset_minutes);
        if resting.is_empty() {
            resting = rollup.resting;
        }
        if max.is_empty() {
            max = rollup.max;
        }
    }

    let anomaly_input = if raw.is_empty() { &resting } else { &raw };
    let anomaly_count = count_anomalies(anomaly_input, config);

    let mut analysis = HeartRateAnalysis {
        resting_hr_trend: analyze_trend(
            RESTING_HEART_RATE,
            &resting,
            MetricPolarity::LowerIsBetter,
            range,
            config,
        ),
        max_hr_trend: analyze_trend(MAX_HEART_RATE, &max, MetricPolarity::Neutral, range, config),
        hrv_trend: (!hrv.is_empty()).then(|| {
            analyze_trend(
                HEART_RATE_VARIABILITY,
                &hrv,
                MetricPolarity::HigherIsBetter,
                range,
                config,
            )
        }),
        anomaly_count,
        risk_factors: Vec::new(),
    };

    let context = RuleContext {
        thresholds: &config.risk,
        evaluated_samples: anomaly_input.len(),
    };
    analysis.risk_factors = evaluate(HEART_RATE_RULES, &analysis, &context);

    debug!(
        anomalies = analysis.anomaly_count,
        risk_factors = analysis.risk_factors.len(),
        "heart-rate analysis complete"
    );
    Some(analysis)
}

/// Glucose report for `range`, or `None` when the window holds no samples.
pub fn analyze_glucose(
    samples: &[Sample],
    range: &DateRange,
    config: &AnalysisConfig,
) -> Option<GlucoseAnalysis> {
    let usable = within(samples, range);
    if usable.is_empty() {
        debug!(start = %range.start, end = %range.end, "no glucose samples in window");
        return None;
    }

    let (low, high) = (config.hypo_threshold, config.hyper_threshold);
    let days = daily_buckets(&usable, config.local_offset_minutes);

    // One 0/100 point per reading, so the average is the share of readings in range.
    let in_range: Vec<Sample> = usable
        .iter()
        .map(|s| {
            let hit = s.value >= low && s.value <= high;
            Sample::new(s.recorded_at, if hit { 100.0 } else { 0.0 })
        })
        .collect();

    let mut analysis = GlucoseAnalysis {
        average_glucose_trend: analyze_trend(
            AVERAGE_GLUCOSE,
            &usable,
            MetricPolarity::TargetRange { low, high },
            range,
            config,
        ),
        time_in_range_trend: analyze_trend(
            TIME_IN_RANGE,
            &in_range,
            MetricPolarity::HigherIsBetter,
            range,
            config,
        ),
        variability_trend: variability_trend(&days, range, config),
        dawn_phenomenon_severity: dawn_phenomenon_severity(&usable, config),
        hypo_episodes: find_episodes(&usable, Excursion::Hypo, config).len(),
        hyper_episodes: find_episodes(&usable, Excursion::Hyper, config).len(),
        risk_factors: Vec::new(),
    };

    let context = RuleContext {
        thresholds: &config.risk,
        evaluated_samples: usable.len(),
    };
    analysis.risk_factors = evaluate(GLUCOSE_RULES, &analysis, &context);

    debug!(
        samples = usable.len(),
        days = days.len(),
        hypo = analysis.hypo_episodes,
        hyper = analysis.hyper_episodes,
        "glucose analysis complete"
    );
    Some(analysis)
}

/// Fetch heart-rate data for the request and analyze it.
pub fn analyze_heart_rate_for<S>(
    source: &S,
    request: &AnalysisRequest,
    config: &AnalysisConfig,
) -> Option<HeartRateAnalysis>
where
    S: BiometricSource + ?Sized,
{
    match source.heart_rate(&request.user_id, &request.range) {
        Ok(series) => analyze_heart_rate(&series, &request.range, config),
        Err(err) => {
            log_source_error("heart_rate", &request.user_id, &err);
            None
        }
    }
}

/// Fetch glucose data for the request and analyze it.
pub fn analyze_glucose_for<S>(
    source: &S,
    request: &AnalysisRequest,
    config: &AnalysisConfig,
) -> Option<GlucoseAnalysis>
where
    S: BiometricSource + ?Sized,
{
    match source.glucose(&request.user_id, &request.range) {
        Ok(samples) => analyze_glucose(&samples, &request.range, config),
        Err(err) => {
            log_source_error("glucose", &request.user_id, &err);
            None
        }
    }
}

/// Glucose CV as a percentage. The reported average is the CV of every reading
/// in the window; the direction comes from a line through the per-day CVs.
fn variability_trend(
    days: &[Vec<Sample>],
    range: &DateRange,
    config: &AnalysisConfig,
) -> BiometricTrend {
    let daily_cv: Vec<Sample> = days
        .iter()
        .filter(|day| day.len() >= 2)
        .map(|day| {
            let (mean, std) = mean_std(day.iter().map(|s| s.value));
            Sample::new(bucket_time(day), coefficient_of_variation(mean, std) * 100.0)
        })
        .collect();

    let readings = days.iter().flatten().map(|s| s.value);
    let (mean, std) = mean_std(readings);
    let (cv_mean, cv_std) = mean_std(daily_cv.iter().map(|s| s.value));
    let summary = SeriesSummary {
        average: coefficient_of_variation(mean, std) * 100.0,
        relative_spread: coefficient_of_variation(cv_mean, cv_std),
        data_points: days.iter().map(Vec::len).sum(),
    };

    fitted_trend(
        GLUCOSE_VARIABILITY,
        &daily_cv,
        summary,
        MetricPolarity::LowerIsBetter,
        range,
        config,
    )
}

fn log_source_error(metric: &str, user_id: &str, err: &SourceError) {
    match err {
        SourceError::Unavailable { .. } => {
            warn!(metric, user_id, error = %err, "biometric data unavailable")
        }
        SourceError::Malformed(_) => {
            warn!(metric, user_id, error = %err, "biometric source returned malformed data")
        }
    }
}

/// Finite samples inside the range, ordered by time.
fn within(samples: &[Sample], range: &DateRange) -> Vec<Sample> {
    let mut kept: Vec<Sample> = samples
        .iter()
        .filter(|sample| sample.value.is_finite() && range.contains(sample.recorded_at))
        .copied()
        .collect();
    kept.sort_by_key(|sample| sample.recorded_at);
    kept
}

/// Ordered samples grouped by the patient's local calendar day.
fn daily_buckets(samples: &[Sample], local_offset_minutes: i32) -> Vec<Vec<Sample>> {
    let offset = Duration::minutes(i64::from(local_offset_minutes));
    let mut days: BTreeMap<NaiveDate, Vec<Sample>> = BTreeMap::new();
    for sample in samples {
        let day = (sample.recorded_at + offset).date_naive();
        days.entry(day).or_default().push(*sample);
    }
    days.into_values().collect()
}

/// Mean timestamp of a non-empty bucket.
fn bucket_time(day: &[Sample]) -> DateTime<Utc> {
    let first = day[0].recorded_at;
    let total: i64 = day
        .iter()
        .map(|sample| (sample.recorded_at - first).num_seconds())
        .sum();
    first + Duration::seconds(total / day.len() as i64)
}
