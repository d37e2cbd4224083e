use thiserror::Error;

#[derive(Error, Debug)]
pub enum NeoError {
    #[error("Feed request failed: {message}")]
    Fetch { message: String },

    #[error("Feed response malformed: {0}")]
    Parse(String),

    #[error("Invalid record '{name}': {reason}")]
    Record { name: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NeoError {
    pub fn record(name: impl Into<String>, reason: impl Into<String>) -> Self {
        NeoError::Record {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error voids the whole run rather than a single record.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, NeoError::Record { .. })
    }
}

impl From<reqwest::Error> for NeoError {
    fn from(e: reqwest::Error) -> Self {
        NeoError::Fetch {
            message: e.without_url().to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NeoError>;
