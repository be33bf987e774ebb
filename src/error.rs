use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChangelogError {
    #[error("Invalid configuration at {path}: {message}")]
    Config { path: String, message: String },

    #[error("Invalid branch_pattern regex: {pattern}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Missing run context: {0}")]
    Context(String),

    #[error("GitHub request failed: {0}")]
    GitHub(#[from] octocrab::Error),

    #[error("Platform request failed: {0}")]
    Platform(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ChangelogError>;

impl ChangelogError {
    pub fn config(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform(message.into())
    }
}
