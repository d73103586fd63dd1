//! Directional trend of one metric over an analysis window.
//!
//! The value series is fitted with an ordinary least squares line against
//! elapsed days. The fitted change across the window, relative to the mean,
//! is the trend percentage; polarity decides whether that change is good.

use insight_core::{AnalysisConfig, BiometricTrend, DateRange, MetricPolarity, Sample, TrendDirection};
use tracing::debug;

use crate::stats::{coefficient_of_variation, linear_fit, mean_std, LinearFit};

/// Trend of `samples` inside `range`. Samples outside the range or with
/// non-finite values are ignored.
pub fn analyze_trend(
    metric_name: &str,
    samples: &[Sample],
    polarity: MetricPolarity,
    range: &DateRange,
    config: &AnalysisConfig,
) -> BiometricTrend {
    let mut usable: Vec<Sample> = samples
        .iter()
        .filter(|sample| sample.value.is_finite() && range.contains(sample.recorded_at))
        .copied()
        .collect();
    usable.sort_by_key(|sample| sample.recorded_at);

    let summary = SeriesSummary::of(&usable);
    fitted_trend(metric_name, &usable, summary, polarity, range, config)
}

/// Reported statistics of the samples behind a trend, which may differ from
/// the series the line is fitted on (e.g. daily rollups of many readings).
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SeriesSummary {
    pub average: f64,
    pub relative_spread: f64,
    pub data_points: usize,
}

impl SeriesSummary {
    pub fn of(samples: &[Sample]) -> Self {
        let (mean, std) = mean_std(samples.iter().map(|sample| sample.value));
        Self {
            average: mean,
            relative_spread: coefficient_of_variation(mean, std),
            data_points: samples.len(),
        }
    }
}

/// Trend whose direction comes from a line fitted on `fit_series` (ordered,
/// already inside `range`) while average, count and spread come from `summary`.
pub(crate) fn fitted_trend(
    metric_name: &str,
    fit_series: &[Sample],
    summary: SeriesSummary,
    polarity: MetricPolarity,
    range: &DateRange,
    config: &AnalysisConfig,
) -> BiometricTrend {
    let SeriesSummary {
        average,
        relative_spread,
        data_points,
    } = summary;

    if data_points < config.min_trend_samples.max(2) {
        debug!(
            metric = metric_name,
            data_points,
            required = config.min_trend_samples,
            "not enough samples for a trend"
        );
        return BiometricTrend::insufficient(metric_name, average, data_points, range);
    }

    let Some(fit) = linear_fit(fit_series, range.start) else {
        debug!(metric = metric_name, points = fit_series.len(), "nothing to fit a line on");
        return BiometricTrend::insufficient(metric_name, average, data_points, range);
    };

    let window_days = range.days();
    let trend_percentage = if average.abs() < f64::EPSILON {
        0.0
    } else {
        fit.slope_per_day * f64::from(window_days) / average.abs() * 100.0
    };

    let within_band = trend_percentage.abs() < config.stability_band_pct;
    let trend_direction = if within_band {
        TrendDirection::Stable
    } else {
        classify_change(trend_percentage, polarity, &fit, range)
    };

    let magnitude_note = match polarity {
        MetricPolarity::Neutral if !within_band => {
            Some(describe_change(trend_percentage, window_days))
        }
        _ => None,
    };

    BiometricTrend {
        metric_name: metric_name.to_string(),
        trend_direction,
        confidence_score: confidence(data_points, relative_spread),
        average_value: average,
        trend_percentage,
        data_points,
        analysis_period_days: window_days,
        last_updated: range.end,
        magnitude_note,
    }
}

/// Confidence in `[0, 1]`: grows with sample count, shrinks with relative spread.
pub fn confidence(data_points: usize, cv: f64) -> f64 {
    let n = data_points as f64;
    let volume = 1.0 - (-n / 4.0).exp();
    let steadiness = (-2.0 * cv.max(0.0)).exp();
    let score = volume * steadiness;
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn classify_change(
    trend_percentage: f64,
    polarity: MetricPolarity,
    fit: &LinearFit,
    range: &DateRange,
) -> TrendDirection {
    let rising = trend_percentage > 0.0;
    match polarity {
        MetricPolarity::HigherIsBetter if rising => TrendDirection::Improving,
        MetricPolarity::HigherIsBetter => TrendDirection::Declining,
        MetricPolarity::LowerIsBetter if rising => TrendDirection::Declining,
        MetricPolarity::LowerIsBetter => TrendDirection::Improving,
        MetricPolarity::Neutral => TrendDirection::Stable,
        MetricPolarity::TargetRange { low, high } => {
            let start = fit.value_at(range.start);
            let end = fit.value_at(range.end);
            compare_to_range(start, end, low.min(high), low.max(high))
        }
    }
}

fn compare_to_range(start: f64, end: f64, low: f64, high: f64) -> TrendDirection {
    const TOLERANCE: f64 = 1e-9;

    let outside = |value: f64| {
        if value < low {
            low - value
        } else if value > high {
            value - high
        } else {
            0.0
        }
    };

    let (before, after) = (outside(start), outside(end));
    if after + TOLERANCE < before {
        return TrendDirection::Improving;
    }
    if after > before + TOLERANCE {
        return TrendDirection::Declining;
    }

    let midpoint = (low + high) / 2.0;
    let (before, after) = ((start - midpoint).abs(), (end - midpoint).abs());
    if after + TOLERANCE < before {
        TrendDirection::Improving
    } else if after > before + TOLERANCE {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    }
}

fn describe_change(trend_percentage: f64, window_days: u32) -> String {
    let verb = if trend_percentage > 0.0 { "rose" } else { "fell" };
    format!(
        "{verb} {:.1}% over {window_days} day(s)",
        trend_percentage.abs()
    )
}
