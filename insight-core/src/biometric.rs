//! Kiểu dữ liệu cho chuỗi sinh trắc học và kết quả phân tích xu hướng.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Hướng xu hướng của một chỉ số.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
    InsufficientData,
}

/// Chiều "tốt" của một chỉ số, dùng để diễn giải dấu của độ dốc.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MetricPolarity {
    HigherIsBetter,
    LowerIsBetter,
    Neutral,
    /// Càng gần dải mục tiêu `[low, high]` càng tốt.
    TargetRange { low: f64, high: f64 },
}

/// Một điểm đo: (thời điểm, giá trị).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    pub recorded_at: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    pub fn new(recorded_at: DateTime<Utc>, value: f64) -> Self {
        Self { recorded_at, value }
    }
}

/// Khoảng thời gian phân tích, hai đầu đều tính.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Tạo khoảng; nếu truyền ngược thì tự đảo lại.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// `days` ngày tính ngược từ `end`.
    pub fn trailing_days(end: DateTime<Utc>, days: u32) -> Self {
        Self::new(end - Duration::days(i64::from(days)), end)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }

    /// Số ngày trọn (làm tròn lên, tối thiểu 1).
    pub fn days(&self) -> u32 {
        let seconds = (self.end - self.start).num_seconds().max(0);
        let days = (seconds + 86_399) / 86_400;
        days.max(1) as u32
    }
}

/// Kết quả xu hướng của một chỉ số sinh trắc.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BiometricTrend {
    pub metric_name: String,
    pub trend_direction: TrendDirection,
    pub confidence_score: f64,
    pub average_value: f64,
    pub trend_percentage: f64,
    pub data_points: usize,
    pub analysis_period_days: u32,
    pub last_updated: DateTime<Utc>,
    /// Ghi chú biên độ cho chỉ số trung tính (không xếp tốt/xấu).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnitude_note: Option<String>,
}

impl BiometricTrend {
    /// Xu hướng "không đủ dữ liệu": độ tin cậy luôn bằng 0.
    pub fn insufficient(
        metric_name: impl Into<String>,
        average_value: f64,
        data_points: usize,
        range: &DateRange,
    ) -> Self {
        Self {
            metric_name: metric_name.into(),
            trend_direction: TrendDirection::InsufficientData,
            confidence_score: 0.0,
            average_value: if average_value.is_finite() {
                average_value
            } else {
                0.0
            },
            trend_percentage: 0.0,
            data_points,
            analysis_period_days: range.days(),
            last_updated: range.end,
            magnitude_note: None,
        }
    }

    pub fn has_data(&self) -> bool {
        self.trend_direction != TrendDirection::InsufficientData
    }
}

/// Các chuỗi nhịp tim cho một người dùng trong một khoảng thời gian.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HeartRateSeries {
    /// Nhịp tim thô liên tục.
    #[serde(default)]
    pub samples: Vec<Sample>,
    #[serde(default)]
    pub resting: Vec<Sample>,
    #[serde(default)]
    pub max: Vec<Sample>,
    #[serde(default)]
    pub hrv: Vec<Sample>,
}

impl HeartRateSeries {
    /// Dựng chuỗi từ nhịp tim thô: nghỉ = min theo ngày, tối đa = max theo ngày.
    /// Ngày được cắt theo giờ địa phương (`local_offset_minutes` so với UTC).
    pub fn from_raw(mut samples: Vec<Sample>, local_offset_minutes: i32) -> Self {
        samples.retain(|sample| sample.value.is_finite());
        samples.sort_by_key(|sample| sample.recorded_at);

        let offset = Duration::minutes(i64::from(local_offset_minutes));
        let mut days: BTreeMap<NaiveDate, (Sample, Sample)> = BTreeMap::new();
        for sample in &samples {
            days.entry((sample.recorded_at + offset).date_naive())
                .and_modify(|(low, high)| {
                    if sample.value < low.value {
                        *low = *sample;
                    }
                    if sample.value > high.value {
                        *high = *sample;
                    }
                })
                .or_insert((*sample, *sample));
        }

        let (resting, max): (Vec<Sample>, Vec<Sample>) = days.into_values().unzip();
        Self {
            samples,
            resting,
            max,
            hrv: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() && self.resting.is_empty() && self.max.is_empty() && self.hrv.is_empty()
    }
}

/// Kết quả phân tích nhịp tim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeartRateAnalysis {
    pub resting_hr_trend: BiometricTrend,
    pub max_hr_trend: BiometricTrend,
    pub hrv_trend: Option<BiometricTrend>,
    pub anomaly_count: usize,
    pub risk_factors: Vec<String>,
}

/// Kết quả phân tích đường huyết (CGM).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlucoseAnalysis {
    pub average_glucose_trend: BiometricTrend,
    /// Phần trăm mẫu trong khoảng 70–180 mg/dL.
    pub time_in_range_trend: BiometricTrend,
    pub variability_trend: BiometricTrend,
    pub dawn_phenomenon_severity: Option<f64>,
    pub hypo_episodes: usize,
    pub hyper_episodes: usize,
    pub risk_factors: Vec<String>,
}
