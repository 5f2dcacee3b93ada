//! Error Handling
//!
//! Error type definitions used in gh-pr-triage

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error types for gh-pr-triage
#[derive(Error, Debug)]
pub enum Error {
    #[error("GitHub API error: {0}")]
    GitHubApi(#[from] octocrab::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration validation error: {0}")]
    ConfigValidation(String),

    #[error("Label validation error: {0}")]
    LabelValidation(String),

    #[error("Label name '{0}' is mapped by more than one status")]
    DuplicateLabelName(String),

    #[error("Pull request not found: #{0}")]
    PullRequestNotFound(u64),

    #[error("Label already exists: {0}")]
    LabelAlreadyExists(String),

    #[error("Label not found: {0}")]
    LabelNotFound(String),

    #[error("Invalid event payload: {0}")]
    EventPayload(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid repository format: {0} (expected 'owner/repo')")]
    InvalidRepositoryFormat(String),

    #[error("Invalid label color: {0} (expected '#' followed by 6 hex digits)")]
    InvalidLabelColor(String),
}

impl Error {
    /// Create a new configuration validation error
    pub fn config_validation<S: Into<String>>(message: S) -> Self {
        Error::ConfigValidation(message.into())
    }

    /// Create a new label validation error
    pub fn label_validation<S: Into<String>>(message: S) -> Self {
        Error::LabelValidation(message.into())
    }
}
