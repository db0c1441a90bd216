//! Pulse - multi-account cloud cost analysis over MCP
//!
//! Discovers local AWS profiles, fetches per-service costs for each
//! account and ranks them across accounts. Estimates Snowflake warehouse
//! spend, and serves lookup tools (weather, web search, market data) to
//! MCP clients.

pub mod calc;
pub mod config;
pub mod cost;
pub mod error;
#[cfg(feature = "web")]
pub mod integrations;
pub mod market;
pub mod mcp;
pub mod warehouse;

pub use config::ServerSettings;
pub use error::{PulseError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
