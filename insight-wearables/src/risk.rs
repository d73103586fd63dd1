//! Risk factor rule tables.
//!
//! Each rule is a label plus a predicate over a finished analysis. Rules that
//! read a trend skip it when the trend has insufficient data.

use insight_core::{BiometricTrend, GlucoseAnalysis, HeartRateAnalysis, RiskThresholds, TrendDirection};

/// Inputs a rule may consult besides the analysis itself.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub thresholds: &'a RiskThresholds,
    /// Samples the anomaly detector looked at.
    pub evaluated_samples: usize,
}

pub struct RiskRule<T> {
    pub label: &'static str,
    pub applies: fn(&T, &RuleContext<'_>) -> bool,
}

/// Labels of every rule that applies, in table order.
pub fn evaluate<T>(rules: &[RiskRule<T>], subject: &T, context: &RuleContext<'_>) -> Vec<String> {
    rules
        .iter()
        .filter(|rule| (rule.applies)(subject, context))
        .map(|rule| rule.label.to_string())
        .collect()
}

pub const HEART_RATE_RULES: &[RiskRule<HeartRateAnalysis>] = &[
    RiskRule {
        label: "irregular_heart_rate_pattern",
        applies: irregular_pattern,
    },
    RiskRule {
        label: "elevated_resting_heart_rate",
        applies: |a, ctx| average(&a.resting_hr_trend).is_some_and(|v| v > ctx.thresholds.elevated_resting_hr_bpm),
    },
    RiskRule {
        label: "low_resting_heart_rate",
        applies: |a, ctx| average(&a.resting_hr_trend).is_some_and(|v| v < ctx.thresholds.low_resting_hr_bpm),
    },
    RiskRule {
        label: "reduced_heart_rate_variability",
        applies: |a, _| {
            a.hrv_trend
                .as_ref()
                .is_some_and(|trend| trend.trend_direction == TrendDirection::Declining)
        },
    },
    RiskRule {
        label: "low_heart_rate_variability",
        applies: |a, ctx| {
            a.hrv_trend
                .as_ref()
                .and_then(average)
                .is_some_and(|v| v < ctx.thresholds.low_hrv_ms)
        },
    },
];

pub const GLUCOSE_RULES: &[RiskRule<GlucoseAnalysis>] = &[
    RiskRule {
        label: "risk_of_hypoglycemia",
        applies: |a, ctx| a.hypo_episodes >= ctx.thresholds.frequent_hypo_episodes,
    },
    RiskRule {
        label: "risk_of_hyperglycemia",
        applies: |a, ctx| a.hyper_episodes >= ctx.thresholds.frequent_hyper_episodes,
    },
    RiskRule {
        label: "low_time_in_range",
        applies: |a, ctx| average(&a.time_in_range_trend).is_some_and(|v| v < ctx.thresholds.low_time_in_range_pct),
    },
    RiskRule {
        label: "high_glucose_variability",
        applies: |a, ctx| average(&a.variability_trend).is_some_and(|v| v > ctx.thresholds.high_variability_cv_pct),
    },
    RiskRule {
        label: "elevated_average_glucose",
        applies: |a, ctx| average(&a.average_glucose_trend).is_some_and(|v| v > ctx.thresholds.elevated_average_glucose),
    },
    RiskRule {
        label: "dawn_phenomenon",
        applies: |a, _| a.dawn_phenomenon_severity.is_some(),
    },
];

fn irregular_pattern(analysis: &HeartRateAnalysis, ctx: &RuleContext<'_>) -> bool {
    if ctx.evaluated_samples == 0 {
        return false;
    }
    let ratio = analysis.anomaly_count as f64 / ctx.evaluated_samples as f64;
    ratio > ctx.thresholds.irregular_anomaly_ratio
}

fn average(trend: &BiometricTrend) -> Option<f64> {
    trend.has_data().then_some(trend.average_value)
}
