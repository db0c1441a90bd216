//! Pulse MCP Server
//!
//! Run with: pulse-server [--transport stdio|http|auto]

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pulse::config::{expand_path, Transport};
use pulse::cost::CostProvider;
use pulse::error::Result;
use pulse::mcp::{http, McpServer, PulseHandler};
use pulse::ServerSettings;

#[derive(Parser, Debug)]
#[command(name = "pulse-server")]
#[command(about = "Pulse MCP server for multi-account AWS cost analysis")]
struct Args {
    /// Transport (auto, stdio or http)
    #[arg(long, env = "MCP_TRANSPORT", default_value = "auto")]
    transport: Transport,

    /// HTTP bind host
    #[arg(long, env = "MCP_HOST", default_value = "127.0.0.1")]
    host: String,

    /// HTTP bind port
    #[arg(long, env = "MCP_PORT", default_value = "8000")]
    port: u16,

    /// AWS config file (defaults to $AWS_CONFIG_FILE or ~/.aws/config)
    #[arg(long, env = "PULSE_AWS_CONFIG")]
    aws_config: Option<String>,

    /// AWS credentials file (defaults to $AWS_SHARED_CREDENTIALS_FILE or ~/.aws/credentials)
    #[arg(long, env = "PULSE_AWS_CREDENTIALS")]
    aws_credentials: Option<String>,

    /// Per-call timeout for billing requests, in seconds
    #[arg(long, env = "PULSE_FETCH_TIMEOUT_SECS", default_value = "30")]
    fetch_timeout_secs: u64,

    /// Profiles fetched at once
    #[arg(long, env = "PULSE_FETCH_CONCURRENCY", default_value = "4")]
    fetch_concurrency: usize,

    /// OpenWeather API key
    #[arg(long, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    openweather_key: Option<String>,
}

impl Args {
    fn into_settings(self) -> ServerSettings {
        let defaults = ServerSettings::default();
        ServerSettings {
            transport: self.transport,
            host: self.host,
            port: self.port,
            aws_config: self
                .aws_config
                .as_deref()
                .map(expand_path)
                .unwrap_or(defaults.aws_config),
            aws_credentials: self
                .aws_credentials
                .as_deref()
                .map(expand_path)
                .unwrap_or(defaults.aws_credentials),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            fetch_concurrency: self.fetch_concurrency,
            openweather_api_key: self.openweather_key,
        }
    }
}

#[cfg(feature = "aws")]
fn cost_provider(settings: &ServerSettings) -> Result<Arc<dyn CostProvider>> {
    Ok(Arc::new(pulse::cost::AwsCostProvider::new(
        settings.profile_paths(),
    )))
}

#[cfg(not(feature = "aws"))]
fn cost_provider(_settings: &ServerSettings) -> Result<Arc<dyn CostProvider>> {
    Err(pulse::PulseError::Config(
        "built without the `aws` feature; no cost provider available".to_string(),
    ))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging to stderr (stdout is for MCP protocol)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = Args::parse().into_settings();
    settings.validate()?;

    tracing::info!(
        "AWS config: {}, credentials: {}",
        settings.aws_config.display(),
        settings.aws_credentials.display()
    );
    if settings.openweather_api_key.is_some() {
        tracing::info!("OpenWeather API key found");
    } else {
        tracing::warn!("OPENWEATHER_API_KEY not set; get_weather will return mock data");
    }

    let handler = PulseHandler::from_settings(&settings, cost_provider(&settings)?)?;

    match settings.transport.resolve(std::io::stdin().is_terminal()) {
        Transport::Http => {
            let addr = settings.bind_addr()?;
            tracing::info!("Pulse MCP server starting (http on {})...", addr);
            http::serve(Arc::new(handler), addr, shutdown_signal()).await?;
        }
        Transport::Stdio | Transport::Auto => {
            tracing::info!("Pulse MCP server starting (stdio)...");
            McpServer::new(handler).run().await?;
        }
    }

    Ok(())
}
