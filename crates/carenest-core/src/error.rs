use thiserror::Error;

/// Errors raised while parsing or converting domain values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid date: {0}")]
    InvalidDateTime(String),

    #[error("Invalid {kind} value: {value}")]
    InvalidValue { kind: &'static str, value: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a new InvalidDateTime error
    pub fn invalid_date_time(message: impl Into<String>) -> Self {
        Self::InvalidDateTime(message.into())
    }

    /// Create a new InvalidValue error for an unknown enum string
    pub fn invalid_value(kind: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            kind,
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
