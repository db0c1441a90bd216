//! Pulse CLI
//!
//! Command-line access to profile discovery, AWS and Snowflake cost
//! analysis, quotes and indicators.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pulse::config::expand_path;
use pulse::cost::{
    aggregate, discover_profiles, format_report, CostFetcher, CostProvider, Profile, ProfilePaths,
    DEFAULT_CONCURRENCY, MAX_DAYS,
};
use pulse::error::{PulseError, Result};

#[derive(Parser)]
#[command(name = "pulse")]
#[command(about = "Multi-account AWS and Snowflake cost analysis CLI")]
#[command(version)]
struct Cli {
    /// AWS config file
    #[arg(long, env = "PULSE_AWS_CONFIG")]
    aws_config: Option<String>,

    /// AWS credentials file
    #[arg(long, env = "PULSE_AWS_CREDENTIALS")]
    aws_credentials: Option<String>,

    /// Per-call timeout for billing requests, in seconds
    #[arg(long, env = "PULSE_FETCH_TIMEOUT_SECS", default_value = "30")]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List discovered AWS profiles
    Profiles {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Analyze costs and print the report as JSON
    Analyze {
        /// Number of days to analyze
        #[arg(short, long, default_value = "30")]
        days: u32,
        /// Only this profile
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// Print a formatted cost report
    Report {
        /// Number of days to analyze
        #[arg(short, long, default_value = "30")]
        days: u32,
        /// Report format (detailed, summary)
        #[arg(short, long, default_value = "detailed")]
        format: String,
    },
    /// Snowflake cost report for the account in SNOWFLAKE_ACCOUNT / SNOWFLAKE_TOKEN
    Snowflake {
        /// Number of days to analyze
        #[arg(short, long, default_value = "30")]
        days: u32,
        /// Print the summary as JSON instead of a report
        #[arg(long)]
        json: bool,
    },
    /// Latest quote for a stock symbol
    Quote {
        /// Ticker symbol
        symbol: String,
    },
    /// Technical indicators for a stock symbol
    Indicators {
        /// Ticker symbol
        symbol: String,
        /// History period
        #[arg(short, long, default_value = "6mo")]
        period: String,
    },
}

impl Cli {
    fn paths(&self) -> ProfilePaths {
        let defaults = ProfilePaths::default();
        ProfilePaths::new(
            self.aws_config
                .as_deref()
                .map(expand_path)
                .unwrap_or(defaults.config),
            self.aws_credentials
                .as_deref()
                .map(expand_path)
                .unwrap_or(defaults.credentials),
        )
    }
}

#[cfg(feature = "aws")]
fn cost_provider(paths: &ProfilePaths) -> Result<Arc<dyn CostProvider>> {
    Ok(Arc::new(pulse::cost::AwsCostProvider::new(paths.clone())))
}

#[cfg(not(feature = "aws"))]
fn cost_provider(_paths: &ProfilePaths) -> Result<Arc<dyn CostProvider>> {
    Err(PulseError::Config(
        "built without the `aws` feature; cost analysis is unavailable".to_string(),
    ))
}

fn check_days(days: u32) -> Result<u32> {
    if days == 0 || days > MAX_DAYS {
        return Err(PulseError::InvalidInput(format!(
            "days must be between 1 and {}, got {}",
            MAX_DAYS, days
        )));
    }
    Ok(days)
}

fn print_profiles(profiles: &[Profile]) {
    if profiles.is_empty() {
        println!("No AWS profiles found");
        return;
    }
    println!("{:<24} {:<16} {:<12} SOURCE", "PROFILE", "REGION", "CREDENTIALS");
    for profile in profiles {
        println!(
            "{:<24} {:<16} {:<12} {:?}",
            profile.name,
            profile.region.as_deref().unwrap_or("-"),
            if profile.has_credentials { "yes" } else { "no" },
            profile.source
        );
    }
}

#[cfg(feature = "web")]
async fn print_indicators(symbol: &str, period: &str) -> Result<()> {
    let history = pulse::market::MarketClient::new()?
        .history(symbol, period, "1d")
        .await?;
    let indicators = pulse::market::analyze(&history.closes()).ok_or_else(|| {
        PulseError::NotFound(format!("no price data for {}", history.symbol))
    })?;
    println!("{}", serde_json::to_string_pretty(&indicators)?);
    Ok(())
}

#[cfg(feature = "web")]
async fn print_quote(symbol: &str) -> Result<()> {
    let quote = pulse::market::MarketClient::new()?.quote(symbol).await?;
    println!("{}", pulse::market::format_stock_report(&quote));
    Ok(())
}

#[cfg(feature = "web")]
async fn print_snowflake(days: u32, json: bool, timeout: Duration) -> Result<()> {
    use pulse::warehouse::{format_warehouse_report, SnowflakeClient, SnowflakeConfig, WarehouseAnalyzer};

    let client = SnowflakeClient::new(SnowflakeConfig::from_env()?)?;
    let analyzer = WarehouseAnalyzer::new(Arc::new(client)).with_timeout(timeout);
    let summary = analyzer.summary(days).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", format_warehouse_report(&summary, analyzer.pricing()));
    }
    Ok(())
}

#[cfg(not(feature = "web"))]
fn web_unavailable() -> Result<()> {
    Err(PulseError::Config(
        "built without the `web` feature; market data and Snowflake are unavailable".to_string(),
    ))
}

#[cfg(not(feature = "web"))]
async fn print_indicators(_symbol: &str, _period: &str) -> Result<()> {
    web_unavailable()
}

#[cfg(not(feature = "web"))]
async fn print_quote(_symbol: &str) -> Result<()> {
    web_unavailable()
}

#[cfg(not(feature = "web"))]
async fn print_snowflake(_days: u32, _json: bool, _timeout: Duration) -> Result<()> {
    web_unavailable()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let paths = cli.paths();
    let timeout = Duration::from_secs(cli.timeout_secs.max(1));

    match cli.command {
        Commands::Profiles { json } => {
            let profiles = discover_profiles(&paths.config, &paths.credentials);
            if json {
                println!("{}", serde_json::to_string_pretty(&profiles)?);
            } else {
                print_profiles(&profiles);
            }
        }
        Commands::Analyze { days, profile } => {
            let days = check_days(days)?;
            let discovered = discover_profiles(&paths.config, &paths.credentials);
            let profiles = match profile {
                Some(name) => vec![discovered
                    .into_iter()
                    .find(|p| p.name == name)
                    .unwrap_or_else(|| Profile::named(name))],
                None => discovered,
            };
            let fetcher = CostFetcher::new(cost_provider(&paths)?).with_timeout(timeout);
            let report = aggregate(&fetcher, &profiles, days, DEFAULT_CONCURRENCY).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Report { days, format } => {
            let days = check_days(days)?;
            let profiles = discover_profiles(&paths.config, &paths.credentials);
            let fetcher = CostFetcher::new(cost_provider(&paths)?).with_timeout(timeout);
            let report = aggregate(&fetcher, &profiles, days, DEFAULT_CONCURRENCY).await;
            print!("{}", format_report(&report, &format));
        }
        Commands::Snowflake { days, json } => {
            print_snowflake(check_days(days)?, json, timeout).await?;
        }
        Commands::Quote { symbol } => {
            print_quote(&symbol).await?;
        }
        Commands::Indicators { symbol, period } => {
            print_indicators(&symbol, &period).await?;
        }
    }

    Ok(())
}
