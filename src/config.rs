//! Server settings shared by the binaries

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cost::{ProfilePaths, DEFAULT_CONCURRENCY, DEFAULT_FETCH_TIMEOUT};
use crate::error::{PulseError, Result};

/// How MCP messages reach the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// stdio when stdin is piped, http otherwise
    #[default]
    Auto,
    Stdio,
    Http,
}

impl std::str::FromStr for Transport {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Transport::Auto),
            "stdio" => Ok(Transport::Stdio),
            "http" => Ok(Transport::Http),
            other => Err(PulseError::Config(format!(
                "unknown transport {:?} (expected auto, stdio or http)",
                other
            ))),
        }
    }
}

impl Transport {
    /// Resolve `Auto` given whether stdin is an interactive terminal
    pub fn resolve(self, stdin_is_terminal: bool) -> Transport {
        match self {
            Transport::Auto if stdin_is_terminal => Transport::Http,
            Transport::Auto => Transport::Stdio,
            other => other,
        }
    }
}

/// Runtime configuration for the MCP server
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub transport: Transport,
    pub host: String,
    pub port: u16,
    pub aws_config: PathBuf,
    pub aws_credentials: PathBuf,
    pub fetch_timeout: Duration,
    pub fetch_concurrency: usize,
    pub openweather_api_key: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        let paths = ProfilePaths::default();
        Self {
            transport: Transport::Auto,
            host: "127.0.0.1".to_string(),
            port: 8000,
            aws_config: paths.config,
            aws_credentials: paths.credentials,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            fetch_concurrency: DEFAULT_CONCURRENCY,
            openweather_api_key: None,
        }
    }
}

impl ServerSettings {
    pub fn profile_paths(&self) -> ProfilePaths {
        ProfilePaths::new(self.aws_config.clone(), self.aws_credentials.clone())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| PulseError::Config(format!("invalid bind address: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch_concurrency == 0 {
            return Err(PulseError::Config(
                "fetch concurrency must be at least 1".to_string(),
            ));
        }
        if self.fetch_timeout.is_zero() {
            return Err(PulseError::Config(
                "fetch timeout must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expand `~` in a user-supplied path
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}
