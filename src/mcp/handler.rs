//! Request handler wiring the MCP methods to cost analysis and the lookup tools

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::protocol::{
    codes, methods, InitializeResult, McpHandler, McpRequest, McpResponse, ToolCallResult,
};
use super::resources::{
    get_prompt_definitions, get_resource_definitions, render_prompt, ResourceContent,
    PROFILES_URI, SETTINGS_URI, STATUS_URI,
};
#[cfg(feature = "web")]
use super::resources::MARKET_OVERVIEW_URI;
use super::tools::get_tool_definitions;
use crate::calc::{calculate, Operation};
use crate::config::ServerSettings;
use crate::cost::{
    aggregate, format_report, CostFetcher, CostProvider, Profile, ProfileCache, DEFAULT_CONCURRENCY,
    MAX_DAYS,
};
use crate::error::{PulseError, Result};
#[cfg(feature = "web")]
use crate::integrations::{SearchClient, Units, WeatherClient};
#[cfg(feature = "web")]
use crate::market::portfolio::validate_holdings;
#[cfg(feature = "web")]
use crate::market::{
    analyze, analyze_portfolio, format_stock_report, market_status, screen, CryptoQuote, Holding,
    HistoryReport, IndexSnapshot, MarketClient, MarketOverview, ScreenCriteria, StockQuote,
    DEFAULT_CRYPTO, MARKET_INDICES, SCREEN_UNIVERSE,
};
use crate::warehouse::{format_warehouse_report, WarehouseAnalyzer, DEFAULT_WAREHOUSE_LIMIT};
#[cfg(feature = "web")]
use crate::warehouse::{SnowflakeClient, SnowflakeConfig, TokenType};

const DEFAULT_DAYS: i64 = 30;

const NOT_CONNECTED: &str =
    "Not connected to Snowflake. Connect first with connect_snowflake or connect_snowflake_auto.";

fn default_days() -> i64 {
    DEFAULT_DAYS
}

fn default_warehouse_limit() -> i64 {
    DEFAULT_WAREHOUSE_LIMIT as i64
}

fn default_format() -> String {
    "detailed".to_string()
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct DiscoverArgs {
    refresh: bool,
}

#[derive(Deserialize)]
struct AnalyzeArgs {
    #[serde(default = "default_days")]
    days: i64,
    #[serde(default)]
    profile: Option<String>,
}

#[derive(Deserialize)]
struct ReportArgs {
    #[serde(default = "default_days")]
    days: i64,
    #[serde(default = "default_format")]
    format_type: String,
}

#[derive(Deserialize)]
struct CalculateArgs {
    operation: String,
    numbers: Vec<f64>,
}

#[derive(Deserialize)]
struct WarehouseArgs {
    #[serde(default = "default_days")]
    days: i64,
}

#[derive(Deserialize)]
struct TopWarehousesArgs {
    #[serde(default = "default_days")]
    days: i64,
    #[serde(default = "default_warehouse_limit")]
    limit: i64,
}

#[cfg(feature = "web")]
#[derive(Deserialize)]
struct ConnectSnowflakeArgs {
    account: String,
    token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    warehouse: Option<String>,
}

#[cfg(feature = "web")]
#[derive(Deserialize)]
struct SymbolArgs {
    symbol: String,
}

#[cfg(feature = "web")]
#[derive(Deserialize)]
struct ScreenArgs {
    #[serde(flatten)]
    criteria: ScreenCriteria,
    #[serde(default)]
    symbols: Option<Vec<String>>,
}

#[cfg(feature = "web")]
#[derive(Deserialize, Default)]
#[serde(default)]
struct CryptoArgs {
    symbols: Option<Vec<String>>,
}

#[cfg(feature = "web")]
#[derive(Deserialize)]
struct PortfolioArgs {
    holdings: Vec<Holding>,
}

#[cfg(feature = "web")]
#[derive(Deserialize)]
struct WeatherArgs {
    city: String,
    #[serde(default)]
    units: Option<String>,
}

#[cfg(feature = "web")]
#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[cfg(feature = "web")]
#[derive(Deserialize)]
struct HistoryArgs {
    symbol: String,
    #[serde(default)]
    period: Option<String>,
    #[serde(default)]
    interval: Option<String>,
}

#[cfg(feature = "web")]
#[derive(Deserialize)]
struct IndicatorArgs {
    symbol: String,
    #[serde(default)]
    period: Option<String>,
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| PulseError::InvalidInput(e.to_string()))
}

/// Reject out-of-range periods before any fetch starts
fn validate_days(days: i64) -> Result<u32> {
    match u32::try_from(days) {
        Ok(d) if (1..=MAX_DAYS).contains(&d) => Ok(d),
        _ => Err(PulseError::InvalidInput(format!(
            "days must be between 1 and {}, got {}",
            MAX_DAYS, days
        ))),
    }
}

/// Symbols from the caller, or `defaults` when none were given
#[cfg(feature = "web")]
fn symbols_or(symbols: Option<Vec<String>>, defaults: &[&str]) -> Vec<String> {
    let symbols: Vec<String> = symbols
        .unwrap_or_default()
        .iter()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    if symbols.is_empty() {
        defaults.iter().map(|s| s.to_string()).collect()
    } else {
        symbols
    }
}

/// MCP request handler
pub struct PulseHandler {
    profiles: ProfileCache,
    fetcher: CostFetcher,
    concurrency: usize,
    warehouse: RwLock<Option<Arc<WarehouseAnalyzer>>>,
    #[cfg(feature = "web")]
    weather: WeatherClient,
    #[cfg(feature = "web")]
    search: SearchClient,
    #[cfg(feature = "web")]
    market: MarketClient,
    started: Instant,
}

impl PulseHandler {
    pub fn new(profiles: ProfileCache, fetcher: CostFetcher) -> Result<Self> {
        Ok(Self {
            profiles,
            fetcher,
            concurrency: DEFAULT_CONCURRENCY,
            warehouse: RwLock::new(None),
            #[cfg(feature = "web")]
            weather: WeatherClient::new(None),
            #[cfg(feature = "web")]
            search: SearchClient::new(),
            #[cfg(feature = "web")]
            market: MarketClient::new()?,
            started: Instant::now(),
        })
    }

    /// Build a handler from server settings around `provider`
    pub fn from_settings(settings: &ServerSettings, provider: Arc<dyn CostProvider>) -> Result<Self> {
        settings.validate()?;
        let fetcher = CostFetcher::new(provider).with_timeout(settings.fetch_timeout);
        let handler = Self::new(ProfileCache::new(settings.profile_paths()), fetcher)?
            .with_concurrency(settings.fetch_concurrency);
        #[cfg(feature = "web")]
        let handler = handler.with_weather_api_key(settings.openweather_api_key.clone());
        Ok(handler)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[cfg(feature = "web")]
    pub fn with_weather_api_key(mut self, api_key: Option<String>) -> Self {
        self.weather = WeatherClient::new(api_key);
        self
    }

    #[cfg(feature = "web")]
    pub fn with_market_client(mut self, market: MarketClient) -> Self {
        self.market = market;
        self
    }

    /// Start with a warehouse account already connected
    pub fn with_warehouse(self, analyzer: WarehouseAnalyzer) -> Self {
        *self.warehouse.write() = Some(Arc::new(analyzer));
        self
    }

    fn warehouse(&self) -> Result<Arc<WarehouseAnalyzer>> {
        self.warehouse
            .read()
            .clone()
            .ok_or_else(|| PulseError::Config(NOT_CONNECTED.to_string()))
    }

    pub fn profiles(&self) -> &ProfileCache {
        &self.profiles
    }

    /// Run one tool. Tool failures come back as `isError` results.
    pub async fn call_tool(&self, name: &str, args: Value) -> ToolCallResult {
        let outcome = match name {
            "discover_aws_profiles" => self.tool_discover_profiles(args),
            "analyze_aws_costs" => self.tool_analyze_costs(args).await,
            "get_aws_cost_report" => self.tool_cost_report(args).await,
            "calculate" => self.tool_calculate(args),
            "get_snowflake_overall_costs" => self.tool_warehouse_overall(args).await,
            "get_snowflake_top_warehouses" => self.tool_top_warehouses(args).await,
            "get_snowflake_cost_summary" => self.tool_warehouse_summary(args).await,
            "get_snowflake_cost_report" => self.tool_warehouse_report(args).await,
            #[cfg(feature = "web")]
            "connect_snowflake" => self.tool_connect_snowflake(args).await,
            #[cfg(feature = "web")]
            "connect_snowflake_auto" => self.tool_connect_snowflake_auto().await,
            #[cfg(feature = "web")]
            "get_stock_info" => self.tool_stock_info(args).await,
            #[cfg(feature = "web")]
            "get_stock_report" => self.tool_stock_report(args).await,
            #[cfg(feature = "web")]
            "screen_stocks" => self.tool_screen_stocks(args).await,
            #[cfg(feature = "web")]
            "get_market_indices" => self.tool_market_indices().await,
            #[cfg(feature = "web")]
            "get_crypto_data" => self.tool_crypto(args).await,
            #[cfg(feature = "web")]
            "analyze_portfolio" => self.tool_portfolio(args).await,
            #[cfg(feature = "web")]
            "get_weather" => self.tool_weather(args).await,
            #[cfg(feature = "web")]
            "web_search" => self.tool_web_search(args).await,
            #[cfg(feature = "web")]
            "get_historical_stock_data" => self.tool_stock_history(args).await,
            #[cfg(feature = "web")]
            "get_technical_indicators" => self.tool_indicators(args).await,
            _ => Err(PulseError::NotFound(format!("tool {}", name))),
        };

        outcome.unwrap_or_else(|e| {
            tracing::warn!("Tool {} failed: {}", name, e);
            ToolCallResult::error(e.to_string())
        })
    }

    fn tool_discover_profiles(&self, args: Value) -> Result<ToolCallResult> {
        let args: DiscoverArgs = parse_args(args)?;
        let profiles = if args.refresh {
            self.profiles.refresh()
        } else {
            self.profiles.get()
        };
        let paths = self.profiles.paths();

        Ok(ToolCallResult::json(&json!({
            "total_profiles": profiles.len(),
            "profiles": profiles.as_slice(),
            "config_path": paths.config.display().to_string(),
            "credentials_path": paths.credentials.display().to_string(),
        })))
    }

    /// Profiles to analyze: every discovered profile, or just the named one.
    /// An undiscovered name is still attempted so the failure is reported.
    fn select_profiles(&self, name: Option<&str>) -> Vec<Profile> {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => vec![self
                .profiles
                .find(name)
                .unwrap_or_else(|| Profile::named(name))],
            None => self.profiles.get().as_ref().clone(),
        }
    }

    async fn tool_analyze_costs(&self, args: Value) -> Result<ToolCallResult> {
        let args: AnalyzeArgs = parse_args(args)?;
        let days = validate_days(args.days)?;
        let profiles = self.select_profiles(args.profile.as_deref());

        let report = aggregate(&self.fetcher, &profiles, days, self.concurrency).await;
        Ok(ToolCallResult::json(&report))
    }

    async fn tool_cost_report(&self, args: Value) -> Result<ToolCallResult> {
        let args: ReportArgs = parse_args(args)?;
        let days = validate_days(args.days)?;
        let profiles = self.select_profiles(None);

        let report = aggregate(&self.fetcher, &profiles, days, self.concurrency).await;
        Ok(ToolCallResult::text(format_report(&report, &args.format_type)))
    }

    fn tool_calculate(&self, args: Value) -> Result<ToolCallResult> {
        let args: CalculateArgs = parse_args(args)?;
        let operation: Operation = args.operation.parse()?;
        let result = calculate(operation, &args.numbers)?;
        Ok(ToolCallResult::json(&json!({
            "operation": operation,
            "count": args.numbers.len(),
            "result": result,
        })))
    }

    async fn tool_warehouse_overall(&self, args: Value) -> Result<ToolCallResult> {
        let args: WarehouseArgs = parse_args(args)?;
        let days = validate_days(args.days)?;
        let costs = self.warehouse()?.overall_costs(days).await?;
        Ok(ToolCallResult::json(&costs))
    }

    async fn tool_top_warehouses(&self, args: Value) -> Result<ToolCallResult> {
        let args: TopWarehousesArgs = parse_args(args)?;
        let days = validate_days(args.days)?;
        let limit = usize::try_from(args.limit).map_err(|_| {
            PulseError::InvalidInput(format!("limit must be positive, got {}", args.limit))
        })?;
        let ranking = self.warehouse()?.top_warehouses(days, limit).await?;
        Ok(ToolCallResult::json(&ranking))
    }

    async fn tool_warehouse_summary(&self, args: Value) -> Result<ToolCallResult> {
        let args: WarehouseArgs = parse_args(args)?;
        let days = validate_days(args.days)?;
        let summary = self.warehouse()?.summary(days).await?;
        Ok(ToolCallResult::json(&summary))
    }

    async fn tool_warehouse_report(&self, args: Value) -> Result<ToolCallResult> {
        let args: WarehouseArgs = parse_args(args)?;
        let days = validate_days(args.days)?;
        let analyzer = self.warehouse()?;
        let summary = analyzer.summary(days).await?;
        Ok(ToolCallResult::text(format_warehouse_report(
            &summary,
            analyzer.pricing(),
        )))
    }

    /// Verify `config` and make it the active warehouse connection. A failed
    /// attempt leaves no connection behind.
    #[cfg(feature = "web")]
    async fn connect_warehouse(&self, config: SnowflakeConfig) -> Result<ToolCallResult> {
        self.warehouse.write().take();
        let timeout = self.fetcher.timeout();
        let client = SnowflakeClient::new(config)?;
        let session = tokio::time::timeout(timeout, client.verify())
            .await
            .map_err(|_| PulseError::Timeout(timeout.as_secs()))??;

        let account = client.config().account.clone();
        let token_type = client.config().token_type;
        let analyzer = WarehouseAnalyzer::new(Arc::new(client)).with_timeout(timeout);
        *self.warehouse.write() = Some(Arc::new(analyzer));
        tracing::info!("Connected to Snowflake account {}", account);

        Ok(ToolCallResult::json(&json!({
            "connected": true,
            "account": account,
            "token_type": token_type,
            "session": session,
        })))
    }

    #[cfg(feature = "web")]
    async fn tool_connect_snowflake(&self, args: Value) -> Result<ToolCallResult> {
        let args: ConnectSnowflakeArgs = parse_args(args)?;
        let token_type = match args.token_type.as_deref() {
            Some(name) => TokenType::parse(name)?,
            None => TokenType::default(),
        };
        let config = SnowflakeConfig::new(&args.account, args.token, token_type)?
            .with_role(args.role)
            .with_warehouse(args.warehouse);
        self.connect_warehouse(config).await
    }

    #[cfg(feature = "web")]
    async fn tool_connect_snowflake_auto(&self) -> Result<ToolCallResult> {
        self.connect_warehouse(SnowflakeConfig::from_env()?).await
    }

    /// Quotes for `symbols` that could be fetched, plus the symbols that
    /// could not
    #[cfg(feature = "web")]
    async fn fetch_quotes(&self, symbols: &[String]) -> (Vec<StockQuote>, Vec<String>) {
        let mut quotes = Vec::new();
        let mut failed = Vec::new();
        for (symbol, result) in self.market.quotes(symbols, self.concurrency).await {
            match result {
                Ok(quote) => quotes.push(quote),
                Err(e) => {
                    tracing::debug!("No quote for {}: {}", symbol, e);
                    failed.push(symbol);
                }
            }
        }
        (quotes, failed)
    }

    #[cfg(feature = "web")]
    async fn market_indices(&self) -> Vec<IndexSnapshot> {
        let symbols: Vec<String> = MARKET_INDICES.iter().map(|(_, s)| s.to_string()).collect();
        let quotes = self.market.quotes(&symbols, self.concurrency).await;
        MARKET_INDICES
            .iter()
            .zip(quotes)
            .map(|((name, symbol), (_, result))| match result {
                Ok(quote) => IndexSnapshot::from_quote(name, &quote),
                Err(e) => {
                    tracing::debug!("No data for index {}: {}", symbol, e);
                    IndexSnapshot::unavailable(name, symbol)
                }
            })
            .collect()
    }

    #[cfg(feature = "web")]
    async fn market_overview(&self) -> MarketOverview {
        let crypto = symbols_or(None, DEFAULT_CRYPTO);
        let (market_indices, (quotes, _)) =
            tokio::join!(self.market_indices(), self.fetch_quotes(&crypto));
        let now = Utc::now();
        MarketOverview {
            market_indices,
            cryptocurrencies: quotes.iter().map(CryptoQuote::from).collect(),
            timestamp: now,
            market_status: market_status(now),
        }
    }

    #[cfg(feature = "web")]
    async fn tool_stock_info(&self, args: Value) -> Result<ToolCallResult> {
        let args: SymbolArgs = parse_args(args)?;
        let quote = self.market.quote(&args.symbol).await?;
        Ok(ToolCallResult::json(&quote))
    }

    #[cfg(feature = "web")]
    async fn tool_stock_report(&self, args: Value) -> Result<ToolCallResult> {
        let args: SymbolArgs = parse_args(args)?;
        let quote = self.market.quote(&args.symbol).await?;
        Ok(ToolCallResult::text(format_stock_report(&quote)))
    }

    #[cfg(feature = "web")]
    async fn tool_screen_stocks(&self, args: Value) -> Result<ToolCallResult> {
        let args: ScreenArgs = parse_args(args)?;
        args.criteria.validate()?;
        let symbols = symbols_or(args.symbols, SCREEN_UNIVERSE);
        let (quotes, _) = self.fetch_quotes(&symbols).await;
        Ok(ToolCallResult::json(&screen(
            args.criteria,
            symbols.len(),
            &quotes,
        )))
    }

    #[cfg(feature = "web")]
    async fn tool_market_indices(&self) -> Result<ToolCallResult> {
        let indices = self.market_indices().await;
        Ok(ToolCallResult::json(&json!({
            "indices": indices,
            "timestamp": Utc::now().to_rfc3339(),
        })))
    }

    #[cfg(feature = "web")]
    async fn tool_crypto(&self, args: Value) -> Result<ToolCallResult> {
        let args: CryptoArgs = parse_args(args)?;
        let symbols = symbols_or(args.symbols, DEFAULT_CRYPTO);
        let (quotes, failed) = self.fetch_quotes(&symbols).await;
        let cryptocurrencies: Vec<CryptoQuote> = quotes.iter().map(CryptoQuote::from).collect();
        Ok(ToolCallResult::json(&json!({
            "cryptocurrencies": cryptocurrencies,
            "unavailable": failed,
            "timestamp": Utc::now().to_rfc3339(),
        })))
    }

    #[cfg(feature = "web")]
    async fn tool_portfolio(&self, args: Value) -> Result<ToolCallResult> {
        let args: PortfolioArgs = parse_args(args)?;
        if args.holdings.is_empty() {
            return Err(PulseError::InvalidInput(
                "holdings must not be empty".to_string(),
            ));
        }
        validate_holdings(&args.holdings)?;

        let mut symbols: Vec<String> = args
            .holdings
            .iter()
            .map(|h| h.symbol.trim().to_uppercase())
            .collect();
        symbols.sort();
        symbols.dedup();
        let (quotes, _) = self.fetch_quotes(&symbols).await;
        let quotes: HashMap<String, StockQuote> =
            quotes.into_iter().map(|q| (q.symbol.clone(), q)).collect();

        Ok(ToolCallResult::json(&analyze_portfolio(&args.holdings, &quotes)))
    }

    #[cfg(feature = "web")]
    async fn tool_weather(&self, args: Value) -> Result<ToolCallResult> {
        let args: WeatherArgs = parse_args(args)?;
        let units = match args.units.as_deref() {
            Some(name) => Units::parse(name)?,
            None => Units::default(),
        };
        let report = self.weather.current(&args.city, units).await?;
        Ok(ToolCallResult::json(&report))
    }

    #[cfg(feature = "web")]
    async fn tool_web_search(&self, args: Value) -> Result<ToolCallResult> {
        let args: SearchArgs = parse_args(args)?;
        let limit = args.limit.unwrap_or(crate::integrations::search::DEFAULT_LIMIT);
        let results = self.search.search(&args.query, limit).await?;
        Ok(ToolCallResult::json(&results))
    }

    #[cfg(feature = "web")]
    async fn tool_stock_history(&self, args: Value) -> Result<ToolCallResult> {
        let args: HistoryArgs = parse_args(args)?;
        let history = self
            .market
            .history(
                &args.symbol,
                args.period.as_deref().unwrap_or("1y"),
                args.interval.as_deref().unwrap_or("1d"),
            )
            .await?;
        if history.candles.is_empty() {
            return Err(PulseError::NotFound(format!(
                "no historical data for {}",
                history.symbol
            )));
        }
        Ok(ToolCallResult::json(&HistoryReport::from_history(history)))
    }

    #[cfg(feature = "web")]
    async fn tool_indicators(&self, args: Value) -> Result<ToolCallResult> {
        let args: IndicatorArgs = parse_args(args)?;
        let history = self
            .market
            .history(&args.symbol, args.period.as_deref().unwrap_or("6mo"), "1d")
            .await?;
        let closes = history.closes();
        let indicators = analyze(&closes).ok_or_else(|| {
            PulseError::NotFound(format!(
                "no data available for technical analysis of {}",
                history.symbol
            ))
        })?;

        Ok(ToolCallResult::json(&json!({
            "symbol": history.symbol,
            "period": history.period,
            "data_points": closes.len(),
            "indicators": indicators,
        })))
    }

    fn settings_resource(&self) -> Value {
        json!({
            "app_name": "Pulse",
            "version": crate::VERSION,
            "features": {
                "aws_cost_analysis": cfg!(feature = "aws"),
                "web_tools": cfg!(feature = "web"),
                "snowflake_cost_analysis": cfg!(feature = "web"),
                "market_data": cfg!(feature = "web"),
            },
            "snowflake_account": self.warehouse.read().as_ref().map(|w| w.account().to_string()),
            "cost_provider": self.fetcher.provider_name(),
            "fetch_timeout_seconds": self.fetcher.timeout().as_secs(),
            "fetch_concurrency": self.concurrency,
            "max_days": MAX_DAYS,
            "aws_config": self.profiles.paths().config.display().to_string(),
            "aws_credentials": self.profiles.paths().credentials.display().to_string(),
        })
    }

    fn status_resource(&self) -> Value {
        let uptime = self.started.elapsed().as_secs();
        json!({
            "status": "online",
            "timestamp": Utc::now().to_rfc3339(),
            "uptime_seconds": uptime,
            "uptime": format!("{}h {}m {}s", uptime / 3600, (uptime % 3600) / 60, uptime % 60),
        })
    }

    async fn read_resource(&self, uri: &str) -> Result<ResourceContent> {
        let value = match uri {
            SETTINGS_URI => self.settings_resource(),
            STATUS_URI => self.status_resource(),
            PROFILES_URI => {
                let profiles = self.profiles.get();
                json!({
                    "total_profiles": profiles.len(),
                    "profiles": profiles.as_slice(),
                })
            }
            #[cfg(feature = "web")]
            MARKET_OVERVIEW_URI => json!(self.market_overview().await),
            _ => return Err(PulseError::NotFound(format!("resource {}", uri))),
        };
        Ok(ResourceContent {
            uri: uri.to_string(),
            mime_type: "application/json".to_string(),
            text: serde_json::to_string_pretty(&value)?,
        })
    }

    fn get_prompt(&self, params: &Value) -> Result<Value> {
        let name = params
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| PulseError::InvalidInput("Missing prompt name".to_string()))?;
        let args: HashMap<String, String> = params
            .get("arguments")
            .and_then(|v| v.as_object())
            .map(|map| {
                map.iter()
                    .map(|(k, v)| {
                        let text = match v {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (k.clone(), text)
                    })
                    .collect()
            })
            .unwrap_or_default();

        let prompt = render_prompt(name, &args)?;
        Ok(json!({
            "description": prompt.description,
            "messages": [{
                "role": "user",
                "content": {"type": "text", "text": prompt.text},
            }],
        }))
    }
}

#[async_trait]
impl McpHandler for PulseHandler {
    async fn handle_request(&self, request: McpRequest) -> McpResponse {
        tracing::debug!("Handling {}", request.method);
        match request.method.as_str() {
            methods::INITIALIZE => {
                let result = InitializeResult::default();
                McpResponse::success(request.id, json!(result))
            }
            methods::INITIALIZED | methods::PING => McpResponse::success(request.id, json!({})),
            methods::LIST_TOOLS => {
                let tools = get_tool_definitions();
                McpResponse::success(request.id, json!({"tools": tools}))
            }
            methods::CALL_TOOL => {
                let Some(name) = request.params.get("name").and_then(|v| v.as_str()) else {
                    return McpResponse::error(
                        request.id,
                        codes::INVALID_PARAMS,
                        "Missing tool name".to_string(),
                    );
                };
                let arguments = request
                    .params
                    .get("arguments")
                    .cloned()
                    .unwrap_or(json!({}));

                let tool_result = self.call_tool(name, arguments).await;
                McpResponse::success(request.id, json!(tool_result))
            }
            methods::LIST_RESOURCES => McpResponse::success(
                request.id,
                json!({"resources": get_resource_definitions()}),
            ),
            methods::READ_RESOURCE => {
                let uri = request
                    .params
                    .get("uri")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                match self.read_resource(uri).await {
                    Ok(content) => McpResponse::success(request.id, json!({"contents": [content]})),
                    Err(e) => McpResponse::from_error(request.id, e),
                }
            }
            methods::LIST_PROMPTS => McpResponse::success(
                request.id,
                json!({"prompts": get_prompt_definitions()}),
            ),
            methods::GET_PROMPT => match self.get_prompt(&request.params) {
                Ok(result) => McpResponse::success(request.id, result),
                Err(e) => McpResponse::from_error(request.id, e),
            },
            _ => McpResponse::error(
                request.id,
                codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        }
    }
}
