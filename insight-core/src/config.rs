//! Cấu hình ngưỡng cho trích xuất lâm sàng và phân tích sinh trắc.

use serde::{Deserialize, Serialize};

/// Cấu hình tổng, đọc được từ JSON một phần (các trường thiếu lấy mặc định).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InsightConfig {
    pub clinical: ClinicalConfig,
    pub analysis: AnalysisConfig,
}

/// Ngưỡng phân loại hồ sơ lâm sàng.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClinicalConfig {
    /// Số ngày khởi phát tối thiểu để coi một bệnh là lâu dài.
    pub chronic_onset_days: u32,
    /// Ghi nhận khám chuyên khoa ngoại trú như một sự kiện.
    pub include_consultations: bool,
    /// Chỉ nhận mã "(finding)"/"(situation)" khi nằm trong danh mục mạn tính.
    pub exclude_non_disorder_findings: bool,
    /// Mã bổ sung được coi là mạn tính.
    pub extra_chronic_codes: Vec<String>,
}

impl Default for ClinicalConfig {
    fn default() -> Self {
        Self {
            chronic_onset_days: 180,
            include_consultations: true,
            exclude_non_disorder_findings: true,
            extra_chronic_codes: Vec::new(),
        }
    }
}

/// Ngưỡng phân tích xu hướng, cơn và bất thường.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Cửa sổ phân tích mặc định (ngày).
    pub window_days: u32,
    /// Số mẫu tối thiểu để tính xu hướng.
    pub min_trend_samples: usize,
    /// Dải ổn định (%): dưới ngưỡng này coi là ổn định.
    pub stability_band_pct: f64,
    /// Bội số độ lệch chuẩn để coi là bất thường.
    pub anomaly_sigma: f64,
    /// Số mẫu khởi động trước khi đánh giá bất thường.
    pub anomaly_window: usize,
    /// Độ lệch chuẩn sàn (bpm) khi chuỗi gần như phẳng.
    pub anomaly_min_std: f64,
    pub hypo_threshold: f64,
    pub hyper_threshold: f64,
    /// Thời lượng tối thiểu của một cơn (phút).
    pub episode_min_minutes: i64,
    /// Khoảng trống tối đa giữa hai mẫu liên tiếp trong cùng một cơn (phút).
    pub episode_max_gap_minutes: i64,
    pub dawn_start_hour: u32,
    pub dawn_end_hour: u32,
    /// Mức tăng tối thiểu (mg/dL) để tính là một buổi sáng có hiện tượng bình minh.
    pub dawn_rise_threshold: f64,
    /// Số ngày tối thiểu có đủ dữ liệu để kết luận tính lặp lại.
    pub dawn_min_days: usize,
    /// Lệch múi giờ của bệnh nhân so với UTC (phút).
    pub local_offset_minutes: i32,
    pub risk: RiskThresholds,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_days: 7,
            min_trend_samples: 5,
            stability_band_pct: 2.0,
            anomaly_sigma: 3.0,
            anomaly_window: 10,
            anomaly_min_std: 1.0,
            hypo_threshold: 70.0,
            hyper_threshold: 180.0,
            episode_min_minutes: 15,
            episode_max_gap_minutes: 30,
            dawn_start_hour: 4,
            dawn_end_hour: 8,
            dawn_rise_threshold: 20.0,
            dawn_min_days: 2,
            local_offset_minutes: 0,
            risk: RiskThresholds::default(),
        }
    }
}

/// Ngưỡng cho các luật yếu tố nguy cơ.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskThresholds {
    pub frequent_hypo_episodes: usize,
    pub frequent_hyper_episodes: usize,
    /// Tỷ lệ mẫu bất thường trên tổng số mẫu nhịp tim.
    pub irregular_anomaly_ratio: f64,
    pub elevated_resting_hr_bpm: f64,
    pub low_resting_hr_bpm: f64,
    pub low_hrv_ms: f64,
    pub low_time_in_range_pct: f64,
    pub high_variability_cv_pct: f64,
    pub elevated_average_glucose: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            frequent_hypo_episodes: 2,
            frequent_hyper_episodes: 2,
            irregular_anomaly_ratio: 0.05,
            elevated_resting_hr_bpm: 100.0,
            low_resting_hr_bpm: 40.0,
            low_hrv_ms: 20.0,
            low_time_in_range_pct: 70.0,
            high_variability_cv_pct: 36.0,
            elevated_average_glucose: 154.0,
        }
    }
}
