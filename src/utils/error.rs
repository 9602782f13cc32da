use thiserror::Error;

#[derive(Error, Debug)]
pub enum CourierError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Automation failed at {stage}")]
    Automation { stage: String },

    #[error("Configuration error: missing {}", .missing.join(", "))]
    Config { missing: Vec<String> },

    #[error("Configuration error: {field}={value}: {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Delivery error: {0}")]
    Delivery(String),
}

impl From<chromiumoxide::error::CdpError> for CourierError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        CourierError::Browser(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CourierError>;
