//! Glucose excursions: hypo/hyperglycemic episodes and the dawn phenomenon.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use insight_core::{AnalysisConfig, Sample};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Excursion {
    Hypo,
    Hyper,
}

/// A sustained run of samples beyond one threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Episode {
    pub kind: Excursion,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Lowest value for hypo, highest for hyper.
    pub extreme_value: f64,
    pub samples: usize,
}

impl Episode {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Maximal runs beyond the threshold for `kind` lasting at least `episode_min_minutes`.
///
/// An in-range sample ends a run, and so does a gap longer than
/// `episode_max_gap_minutes` between consecutive samples.
pub fn find_episodes(samples: &[Sample], kind: Excursion, config: &AnalysisConfig) -> Vec<Episode> {
    let mut ordered: Vec<Sample> = samples
        .iter()
        .filter(|sample| sample.value.is_finite())
        .copied()
        .collect();
    ordered.sort_by_key(|sample| sample.recorded_at);

    let beyond = |value: f64| match kind {
        Excursion::Hypo => value < config.hypo_threshold,
        Excursion::Hyper => value > config.hyper_threshold,
    };
    let min_duration = config_minutes(config.episode_min_minutes);
    let max_gap = config_minutes(config.episode_max_gap_minutes);

    let mut episodes = Vec::new();
    let mut current: Option<Episode> = None;

    for sample in ordered {
        if !beyond(sample.value) {
            close_run(current.take(), min_duration, &mut episodes);
            continue;
        }

        match current.as_mut() {
            Some(run) if sample.recorded_at - run.end <= max_gap => {
                run.end = sample.recorded_at;
                run.samples += 1;
                run.extreme_value = match kind {
                    Excursion::Hypo => run.extreme_value.min(sample.value),
                    Excursion::Hyper => run.extreme_value.max(sample.value),
                };
            }
            _ => {
                close_run(current.take(), min_duration, &mut episodes);
                current = Some(Episode {
                    kind,
                    start: sample.recorded_at,
                    end: sample.recorded_at,
                    extreme_value: sample.value,
                    samples: 1,
                });
            }
        }
    }
    close_run(current, min_duration, &mut episodes);

    episodes
}

/// Minutes from user config; out-of-range values saturate instead of panicking.
fn config_minutes(minutes: i64) -> Duration {
    let saturated = if minutes < 0 { Duration::MIN } else { Duration::MAX };
    Duration::try_minutes(minutes).unwrap_or(saturated)
}

fn close_run(run: Option<Episode>, min_duration: Duration, episodes: &mut Vec<Episode>) {
    if let Some(run) = run {
        if run.duration() >= min_duration {
            episodes.push(run);
        }
    }
}

pub fn count_hypo_episodes(samples: &[Sample], config: &AnalysisConfig) -> usize {
    find_episodes(samples, Excursion::Hypo, config).len()
}

pub fn count_hyper_episodes(samples: &[Sample], config: &AnalysisConfig) -> usize {
    find_episodes(samples, Excursion::Hyper, config).len()
}

/// Mean early-morning rise over the days that exceeded the rise threshold,
/// when those days are a strict majority of the days with enough data.
pub fn dawn_phenomenon_severity(samples: &[Sample], config: &AnalysisConfig) -> Option<f64> {
    let (start_hour, end_hour) = (config.dawn_start_hour, config.dawn_end_hour);
    if start_hour >= end_hour || end_hour > 24 {
        debug!(start_hour, end_hour, "dawn window is empty, skipping");
        return None;
    }
    let last_hour = end_hour - 1;
    let offset = Duration::minutes(i64::from(config.local_offset_minutes));

    let mut days: BTreeMap<NaiveDate, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for sample in samples.iter().filter(|sample| sample.value.is_finite()) {
        let local = (sample.recorded_at + offset).naive_utc();
        let hour = local.hour();
        if hour < start_hour || hour >= end_hour {
            continue;
        }
        let (first, last) = days.entry(local.date()).or_default();
        if hour == start_hour {
            first.push(sample.value);
        }
        if hour == last_hour {
            last.push(sample.value);
        }
    }

    let rises: Vec<f64> = days
        .values()
        .filter_map(|(first, last)| {
            let early = crate::stats::mean(first.iter().copied())?;
            let late = crate::stats::mean(last.iter().copied())?;
            Some(late - early)
        })
        .collect();

    if rises.len() < config.dawn_min_days {
        debug!(days = rises.len(), "not enough mornings for dawn analysis");
        return None;
    }

    let exceeding: Vec<f64> = rises
        .iter()
        .copied()
        .filter(|rise| *rise > config.dawn_rise_threshold)
        .collect();

    if exceeding.len() * 2 <= rises.len() {
        return None;
    }
    crate::stats::mean(exceeding)
}
