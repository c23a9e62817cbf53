use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid simulation request: {0}")]
    Validation(String),

    #[error("Unsupported simulation action: {0}")]
    UnsupportedAction(String),

    #[error("Topology store unavailable: {0}")]
    TopologyUnavailable(String),

    #[error("Impact analysis failed: {0}")]
    Analysis(String),

    #[error("Simulation not found: {0}")]
    NotFound(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("File not found or could not be read: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON payload: {0}")]
    Deserialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
