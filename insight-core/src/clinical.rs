//! Mô hình dữ liệu lâm sàng trích xuất từ bundle hồ sơ bệnh án.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trạng thái lâm sàng của một bệnh mạn tính.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConditionStatus {
    Active,
    Resolved,
    Other,
}

impl ConditionStatus {
    /// Ánh xạ mã `clinicalStatus` của FHIR sang tập trạng thái đã biết.
    pub fn from_clinical_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "active" | "recurrence" | "relapse" => ConditionStatus::Active,
            "resolved" | "inactive" | "remission" => ConditionStatus::Resolved,
            _ => ConditionStatus::Other,
        }
    }
}

/// Bệnh mạn tính đang còn ý nghĩa lâm sàng.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChronicCondition {
    pub code: String,
    pub description: String,
    pub onset_date: Option<DateTime<Utc>>,
    pub severity: Option<String>,
    pub status: ConditionStatus,
}

/// Phân loại sự kiện sức khỏe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HealthEventType {
    Hospitalization,
    Procedure,
    EmergencyVisit,
    Consultation,
    MedicationChange,
    Other,
}

/// Một sự kiện sức khỏe đáng chú ý. Ngày là bắt buộc để sắp xếp được.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthEvent {
    pub event_type: HealthEventType,
    pub description: String,
    pub date: DateTime<Utc>,
    pub code: Option<String>,
    pub provider: Option<String>,
}

impl HealthEvent {
    /// Khóa khử trùng lặp: (mã, ngày). Thiếu mã thì dùng mô tả thay thế.
    pub fn dedup_key(&self) -> (String, DateTime<Utc>) {
        let code = self
            .code
            .clone()
            .unwrap_or_else(|| self.description.clone());
        (code, self.date)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medication {
    pub status: String,
    pub code: Option<String>,
    pub display: String,
    pub dosage_instructions: Option<String>,
    pub prescribed_date: Option<DateTime<Utc>>,
}

/// Hồ sơ sức khỏe tổng hợp của một bệnh nhân, tạo một lần cho mỗi lần trích xuất.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientHealthProfile {
    pub patient_id: String,
    pub chronic_conditions: Vec<ChronicCondition>,
    pub health_events: Vec<HealthEvent>,
    pub medications: Vec<Medication>,
    pub last_updated: DateTime<Utc>,
}

impl PatientHealthProfile {
    /// Dựng hồ sơ từ các thành phần đã phân loại; sự kiện luôn được sắp theo ngày.
    pub fn new(
        patient_id: impl Into<String>,
        chronic_conditions: Vec<ChronicCondition>,
        mut health_events: Vec<HealthEvent>,
        medications: Vec<Medication>,
        extracted_at: DateTime<Utc>,
    ) -> Self {
        health_events.sort_by_key(|event| event.date);
        Self {
            patient_id: patient_id.into(),
            chronic_conditions,
            health_events,
            medications,
            last_updated: extracted_at,
        }
    }

    /// Hồ sơ rỗng khi bundle không có dữ liệu dùng được.
    pub fn empty(extracted_at: DateTime<Utc>) -> Self {
        Self::new(UNKNOWN_PATIENT_ID, Vec::new(), Vec::new(), Vec::new(), extracted_at)
    }

    pub fn conditions(&self) -> &[ChronicCondition] {
        &self.chronic_conditions
    }

    /// Danh sách sự kiện đã sắp xếp theo thời gian.
    pub fn timeline(&self) -> &[HealthEvent] {
        &self.health_events
    }
}

/// Định danh mặc định khi bundle không chứa thông tin bệnh nhân.
pub const UNKNOWN_PATIENT_ID: &str = "Unknown";
