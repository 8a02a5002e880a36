use anchorage_core::XrError;
use thiserror::Error;

/// Errors that can occur while replaying a scenario
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Scenario file not found: {0}")]
    ScenarioNotFound(String),

    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("Session error: {0}")]
    Session(#[from] XrError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReplayError>;
