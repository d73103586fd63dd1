//! Kiểu dữ liệu lõi cho trích xuất hồ sơ lâm sàng và phân tích xu hướng sinh trắc.

pub mod biometric;
pub mod clinical;
pub mod config;
pub mod error;
pub mod source;

pub use biometric::{
    BiometricTrend, DateRange, GlucoseAnalysis, HeartRateAnalysis, HeartRateSeries,
    MetricPolarity, Sample, TrendDirection,
};
pub use clinical::{
    ChronicCondition, ConditionStatus, HealthEvent, HealthEventType, Medication,
    PatientHealthProfile, UNKNOWN_PATIENT_ID,
};
pub use config::{AnalysisConfig, ClinicalConfig, InsightConfig, RiskThresholds};
pub use error::{InsightError, SourceError};
pub use source::{AnalysisRequest, BiometricSource};

use chrono::{DateTime, NaiveDate, Utc};

/// Đọc thời điểm RFC 3339 hoặc ngày `YYYY-MM-DD` (nửa đêm UTC).
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, InsightError> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| InsightError::InvalidTimestamp(trimmed.to_string()))
}
