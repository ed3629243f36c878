use thiserror::Error;

#[derive(Debug, Error)]
pub enum SensorHubError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid listen address '{addr}': {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SensorHubError {
    /// Short, stable error code for log fields and health output.
    pub fn code(&self) -> &'static str {
        match self {
            SensorHubError::Config(_) => "CONFIG_ERROR",
            SensorHubError::InvalidAddress { .. } => "INVALID_ADDRESS",
            SensorHubError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, SensorHubError>;
