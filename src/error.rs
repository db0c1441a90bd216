//! Error types for Pulse

use thiserror::Error;

/// Result type alias for Pulse operations
pub type Result<T> = std::result::Result<T, PulseError>;

/// Main error type for Pulse
#[derive(Error, Debug)]
pub enum PulseError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    #[cfg(feature = "web")]
    Http(#[from] reqwest::Error),

    #[error("HTTP request error: {0}")]
    #[cfg(not(feature = "web"))]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PulseError {
    /// Get error code for MCP protocol
    pub fn code(&self) -> i64 {
        match self {
            PulseError::InvalidInput(_) => -32602,
            PulseError::NotFound(_) => -32001,
            PulseError::Credential(_) => -32003,
            PulseError::Timeout(_) => -32004,
            _ => -32000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(PulseError::InvalidInput("x".into()).code(), -32602);
        assert_eq!(PulseError::NotFound("x".into()).code(), -32001);
        assert_eq!(PulseError::Credential("x".into()).code(), -32003);
        assert_eq!(PulseError::Timeout(30).code(), -32004);
        assert_eq!(PulseError::Api("x".into()).code(), -32000);
    }
}
