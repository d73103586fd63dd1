/// Lỗi chung khi trích xuất hồ sơ.
#[derive(Debug, thiserror::Error)]
pub enum InsightError {
    #[error("Không đọc được dữ liệu: {0}")]
    Parse(String),
    #[error("Thời điểm không hợp lệ: {0}")]
    InvalidTimestamp(String),
}

/// Lỗi từ nguồn dữ liệu sinh trắc bên ngoài.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Không có dữ liệu cho người dùng {user_id}: {reason}")]
    Unavailable { user_id: String, reason: String },
    #[error("Dữ liệu nguồn không hợp lệ: {0}")]
    Malformed(String),
}

impl SourceError {
    pub fn unavailable(user_id: &str, reason: impl Into<String>) -> Self {
        SourceError::Unavailable {
            user_id: user_id.to_string(),
            reason: reason.into(),
        }
    }
}
