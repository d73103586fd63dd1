//! Giao diện nguồn dữ liệu sinh trắc (thiết bị đeo, CGM).

use serde::{Deserialize, Serialize};

use crate::biometric::{DateRange, HeartRateSeries, Sample};
use crate::error::SourceError;

/// Nguồn cung cấp mẫu sinh trắc. Lõi phân tích chỉ phụ thuộc vào trait này,
/// không phụ thuộc vào client API cụ thể.
pub trait BiometricSource: Send + Sync {
    /// Lấy các chuỗi nhịp tim của người dùng trong khoảng thời gian.
    fn heart_rate(&self, user_id: &str, range: &DateRange) -> Result<HeartRateSeries, SourceError>;

    /// Lấy các mẫu đường huyết đã sắp theo thời gian.
    fn glucose(&self, user_id: &str, range: &DateRange) -> Result<Vec<Sample>, SourceError>;
}

/// Yêu cầu phân tích: định danh và khoảng thời gian luôn được truyền tường minh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub user_id: String,
    pub range: DateRange,
}

impl AnalysisRequest {
    pub fn new(user_id: impl Into<String>, range: DateRange) -> Self {
        Self {
            user_id: user_id.into(),
            range,
        }
    }
}
