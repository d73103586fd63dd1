//! Nguồn dữ liệu sinh trắc đọc từ file JSON.

use std::path::Path;

use anyhow::Context;
use insight_core::{BiometricSource, DateRange, HeartRateSeries, Sample, SourceError};
use serde::Deserialize;

/// Nội dung file mẫu: `{ "user_id"?, "heart_rate"?, "glucose"? }`.
#[derive(Debug, Deserialize)]
struct SamplesFile {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    heart_rate: Option<HeartRateSeries>,
    #[serde(default)]
    glucose: Option<Vec<Sample>>,
}

#[derive(Debug)]
pub struct JsonFileSource {
    data: SamplesFile,
}

impl JsonFileSource {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Không đọc được file mẫu {:?}", path))?;
        let data: SamplesFile = serde_json::from_str(&text)
            .with_context(|| format!("File mẫu {:?} không đúng định dạng", path))?;
        Ok(Self { data })
    }

    fn check_user(&self, user_id: &str) -> Result<(), SourceError> {
        match self.data.user_id.as_deref() {
            Some(owner) if owner != user_id => Err(SourceError::unavailable(
                user_id,
                format!("file mẫu thuộc về người dùng {owner}"),
            )),
            _ => Ok(()),
        }
    }
}

impl BiometricSource for JsonFileSource {
    fn heart_rate(&self, user_id: &str, range: &DateRange) -> Result<HeartRateSeries, SourceError> {
        self.check_user(user_id)?;
        let series = self
            .data
            .heart_rate
            .as_ref()
            .ok_or_else(|| SourceError::unavailable(user_id, "không có dữ liệu nhịp tim"))?;

        let scoped = HeartRateSeries {
            samples: in_range(&series.samples, range),
            resting: in_range(&series.resting, range),
            max: in_range(&series.max, range),
            hrv: in_range(&series.hrv, range),
        };
        if scoped.is_empty() {
            return Err(SourceError::unavailable(
                user_id,
                "không có mẫu nhịp tim trong khoảng thời gian",
            ));
        }
        Ok(scoped)
    }

    fn glucose(&self, user_id: &str, range: &DateRange) -> Result<Vec<Sample>, SourceError> {
        self.check_user(user_id)?;
        let samples = self
            .data
            .glucose
            .as_ref()
            .ok_or_else(|| SourceError::unavailable(user_id, "không có dữ liệu đường huyết"))?;

        let scoped = in_range(samples, range);
        if scoped.is_empty() {
            return Err(SourceError::unavailable(
                user_id,
                "không có mẫu đường huyết trong khoảng thời gian",
            ));
        }
        Ok(scoped)
    }
}

fn in_range(samples: &[Sample], range: &DateRange) -> Vec<Sample> {
    let mut scoped: Vec<Sample> = samples
        .iter()
        .filter(|sample| range.contains(sample.recorded_at))
        .copied()
        .collect();
    scoped.sort_by_key(|sample| sample.recorded_at);
    scoped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::io::Write;

    fn write_samples(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("tạo file tạm");
        file.write_all(json.as_bytes()).expect("ghi file tạm");
        file
    }

    fn range() -> DateRange {
        DateRange::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 8, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn serves_glucose_inside_window() {
        let file = write_samples(
            r#"{
                "glucose": [
                    { "recorded_at": "2024-03-02T08:00:00Z", "value": 104.0 },
                    { "recorded_at": "2024-02-20T08:00:00Z", "value": 250.0 },
                    { "recorded_at": "2024-03-01T08:00:00Z", "value": 98.0 }
                ]
            }"#,
        );

        let source = JsonFileSource::open(file.path()).unwrap();
        let samples = source.glucose("anyone", &range()).unwrap();
        let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![98.0, 104.0]);
    }

    #[test]
    fn missing_metric_is_unavailable() {
        let file = write_samples(r#"{ "glucose": [] }"#);
        let source = JsonFileSource::open(file.path()).unwrap();

        assert!(matches!(
            source.heart_rate("u1", &range()),
            Err(SourceError::Unavailable { .. })
        ));
        assert!(matches!(
            source.glucose("u1", &range()),
            Err(SourceError::Unavailable { .. })
        ));
    }

    #[test]
    fn other_users_data_is_not_served() {
        let file = write_samples(
            r#"{ "user_id": "u1", "heart_rate": { "resting": [ { "recorded_at": "2024-03-02T06:00:00Z", "value": 58.0 } ] } }"#,
        );
        let source = JsonFileSource::open(file.path()).unwrap();

        assert!(source.heart_rate("u1", &range()).is_ok());
        let err = source.heart_rate("u2", &range()).unwrap_err();
        assert!(matches!(err, SourceError::Unavailable { ref user_id, .. } if user_id == "u2"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let file = write_samples(r#"{ "glucose": "not a list" }"#);
        assert!(JsonFileSource::open(file.path()).is_err());
    }
}
