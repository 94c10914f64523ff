use thiserror::Error;

/// Core error types for SensorGrid domain operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid date: {0} (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: String, end: String },

    #[error("Invalid export format: {0} (expected json or csv)")]
    InvalidExportFormat(String),

    #[error("Invalid device status: {0} (expected active or inactive)")]
    InvalidDeviceStatus(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Timestamp formatting error: {0}")]
    TimeFormat(#[from] time::error::Format),
}

impl CoreError {
    /// Create a new InvalidDate error
    pub fn invalid_date(raw: impl Into<String>) -> Self {
        Self::InvalidDate(raw.into())
    }

    /// Create a new InvalidDateRange error
    pub fn invalid_date_range(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self::InvalidDateRange {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Create a new InvalidId error
    pub fn invalid_id(id: impl Into<String>) -> Self {
        Self::InvalidId(id.into())
    }

    /// Check if this error is caused by bad caller input (4xx category)
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDate(_)
                | Self::InvalidDateRange { .. }
                | Self::InvalidExportFormat(_)
                | Self::InvalidDeviceStatus(_)
                | Self::InvalidId(_)
        )
    }
}
