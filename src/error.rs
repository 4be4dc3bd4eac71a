use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No feed content provided")]
    EmptyPayload,

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Upstream rejected the configured group: {0}")]
    InvalidGroup(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Secondary fetch failed for {guid}: {message}")]
    Fetch { guid: String, message: String },

    #[error("HTTP status {status} from {url}")]
    Status { status: u16, url: String },
}

pub type Result<T> = std::result::Result<T, TransformError>;
