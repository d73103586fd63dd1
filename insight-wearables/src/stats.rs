//! Descriptive statistics over sample values.

use chrono::{DateTime, Utc};
use insight_core::Sample;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Mean and sample standard deviation in one pass (Welford).
pub(crate) fn mean_std(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    let mut count = 0usize;
    let mut mean = 0.0;
    let mut m2 = 0.0;
    for x in values {
        count += 1;
        let delta = x - mean;
        mean += delta / count as f64;
        m2 += delta * (x - mean);
    }
    if count < 2 {
        return (mean, 0.0);
    }
    (mean, (m2 / (count - 1) as f64).sqrt())
}

pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), x| (sum + x, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Coefficient of variation, σ / |mean|. Zero when the mean is zero.
pub(crate) fn coefficient_of_variation(mean: f64, std: f64) -> f64 {
    if mean.abs() < f64::EPSILON {
        0.0
    } else {
        std / mean.abs()
    }
}

/// Ordinary least squares line of value against elapsed days since `origin`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LinearFit {
    pub slope_per_day: f64,
    pub intercept: f64,
    pub origin: DateTime<Utc>,
}

impl LinearFit {
    pub fn value_at(&self, at: DateTime<Utc>) -> f64 {
        self.intercept + self.slope_per_day * elapsed_days(self.origin, at)
    }
}

pub(crate) fn linear_fit(samples: &[Sample], origin: DateTime<Utc>) -> Option<LinearFit> {
    let n = samples.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;

    let (sum_x, sum_y) = samples.iter().fold((0.0, 0.0), |(sx, sy), sample| {
        (sx + elapsed_days(origin, sample.recorded_at), sy + sample.value)
    });
    let x_mean = sum_x / nf;
    let y_mean = sum_y / nf;

    let (mut ss_xy, mut ss_xx) = (0.0, 0.0);
    for sample in samples {
        let dx = elapsed_days(origin, sample.recorded_at) - x_mean;
        ss_xy += dx * (sample.value - y_mean);
        ss_xx += dx * dx;
    }

    let slope_per_day = if ss_xx.abs() < 1e-12 { 0.0 } else { ss_xy / ss_xx };
    Some(LinearFit {
        slope_per_day,
        intercept: y_mean - slope_per_day * x_mean,
        origin,
    })
}

pub(crate) fn elapsed_days(origin: DateTime<Utc>, at: DateTime<Utc>) -> f64 {
    (at - origin).num_seconds() as f64 / SECONDS_PER_DAY
}
