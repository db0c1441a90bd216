//! Snowflake SQL API v2 client
//!
//! Runs `SNOWFLAKE.ACCOUNT_USAGE` queries over HTTPS with a bearer token: a
//! programmatic access token, an OAuth access token or a key-pair JWT.
//! Long statements answer `202` and are polled by handle; large results
//! arrive in partitions that are fetched one by one.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, Response, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ComputeUsage, StorageUsage, WarehouseProvider, WarehouseUsage};
use crate::cost::DateRange;
use crate::error::{PulseError, Result};

const USER_AGENT: &str = concat!("pulse-mcp/", env!("CARGO_PKG_VERSION"));
const ACCOUNT_DOMAIN: &str = ".snowflakecomputing.com";
const TOKEN_TYPE_HEADER: &str = "X-Snowflake-Authorization-Token-Type";

/// Server-side limit for one statement
const STATEMENT_TIMEOUT_SECS: u64 = 60;
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// One result row; SQL `NULL` is `None`
pub type Row = Vec<Option<String>>;

/// How the bearer token was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    #[default]
    ProgrammaticAccessToken,
    Oauth,
    KeypairJwt,
}

impl TokenType {
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "pat" | "programmatic_access_token" => Ok(TokenType::ProgrammaticAccessToken),
            "oauth" => Ok(TokenType::Oauth),
            "jwt" | "keypair_jwt" => Ok(TokenType::KeypairJwt),
            other => Err(PulseError::InvalidInput(format!(
                "unknown token type {:?} (expected pat, oauth or keypair_jwt)",
                other
            ))),
        }
    }

    fn header_value(self) -> &'static str {
        match self {
            TokenType::ProgrammaticAccessToken => "PROGRAMMATIC_ACCESS_TOKEN",
            TokenType::Oauth => "OAUTH",
            TokenType::KeypairJwt => "KEYPAIR_JWT",
        }
    }
}

/// Account identifier from an identifier or a full URL.
///
/// `https://xy12345.us-east-1.snowflakecomputing.com/console` and
/// `xy12345.us-east-1` both give `xy12345.us-east-1`.
pub fn parse_account(input: &str) -> String {
    let input = input.trim();
    let host = match input.split_once("://") {
        Some((_, rest)) => rest.split(['/', '?', '#']).next().unwrap_or(rest),
        None => input.trim_end_matches('/'),
    };
    host.strip_suffix(ACCOUNT_DOMAIN).unwrap_or(host).to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Connection settings for one account
#[derive(Clone)]
pub struct SnowflakeConfig {
    pub account: String,
    token: String,
    pub token_type: TokenType,
    pub role: Option<String>,
    pub warehouse: Option<String>,
}

impl std::fmt::Debug for SnowflakeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnowflakeConfig")
            .field("account", &self.account)
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("role", &self.role)
            .field("warehouse", &self.warehouse)
            .finish()
    }
}

impl SnowflakeConfig {
    pub fn new(account: &str, token: impl Into<String>, token_type: TokenType) -> Result<Self> {
        let account = parse_account(account);
        if account.is_empty() {
            return Err(PulseError::InvalidInput("account is required".to_string()));
        }
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(PulseError::InvalidInput("token is required".to_string()));
        }
        Ok(Self {
            account,
            token,
            token_type,
            role: None,
            warehouse: None,
        })
    }

    pub fn with_role(mut self, role: Option<String>) -> Self {
        self.role = non_empty(role);
        self
    }

    pub fn with_warehouse(mut self, warehouse: Option<String>) -> Self {
        self.warehouse = non_empty(warehouse);
        self
    }

    /// Read `SNOWFLAKE_ACCOUNT` and `SNOWFLAKE_TOKEN`, plus the optional
    /// `SNOWFLAKE_TOKEN_TYPE`, `SNOWFLAKE_ROLE` and `SNOWFLAKE_WAREHOUSE`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let account = non_empty(get("SNOWFLAKE_ACCOUNT"));
        let token = non_empty(get("SNOWFLAKE_TOKEN"));
        let (Some(account), Some(token)) = (account.clone(), token.clone()) else {
            let missing: Vec<&str> = [("SNOWFLAKE_ACCOUNT", account), ("SNOWFLAKE_TOKEN", token)]
                .into_iter()
                .filter(|(_, value)| value.is_none())
                .map(|(key, _)| key)
                .collect();
            return Err(PulseError::Config(format!(
                "missing environment variables: {}",
                missing.join(", ")
            )));
        };
        let token_type = match non_empty(get("SNOWFLAKE_TOKEN_TYPE")) {
            Some(name) => TokenType::parse(&name)?,
            None => TokenType::default(),
        };

        Ok(Self::new(&account, token, token_type)?
            .with_role(get("SNOWFLAKE_ROLE"))
            .with_warehouse(get("SNOWFLAKE_WAREHOUSE")))
    }
}

#[derive(Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warehouse: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementStatus {
    statement_handle: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSet {
    statement_handle: Option<String>,
    result_set_meta_data: Option<ResultSetMetaData>,
    #[serde(default)]
    data: Vec<Row>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSetMetaData {
    #[serde(default)]
    partition_info: Vec<serde_json::Value>,
}

/// One page of a statement result
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage {
    pub handle: Option<String>,
    /// Total partitions; only the first page carries this
    pub partitions: usize,
    pub rows: Vec<Row>,
}

/// Parse a `200` statement body
pub fn parse_result_page(body: &str) -> Result<ResultPage> {
    let set: ResultSet = serde_json::from_str(body)?;
    Ok(ResultPage {
        handle: set.statement_handle,
        partitions: set
            .result_set_meta_data
            .map(|meta| meta.partition_info.len())
            .unwrap_or(0),
        rows: set.data,
    })
}

enum Statement {
    Running(String),
    Done(ResultPage),
}

fn transport(err: reqwest::Error) -> PulseError {
    PulseError::Transport(err.to_string())
}

async fn read_statement(response: Response) -> Result<Statement> {
    let status = response.status();
    let body = response.text().await?;
    match status {
        StatusCode::OK => Ok(Statement::Done(parse_result_page(&body)?)),
        StatusCode::ACCEPTED => {
            let running: StatementStatus = serde_json::from_str(&body)?;
            running
                .statement_handle
                .map(Statement::Running)
                .ok_or_else(|| PulseError::Api("statement accepted without a handle".to_string()))
        }
        _ => Err(status_error(status, &body)),
    }
}

fn status_error(status: StatusCode, body: &str) -> PulseError {
    let message = serde_json::from_str::<StatementStatus>(body)
        .ok()
        .and_then(|s| s.message)
        .unwrap_or_else(|| body.trim().to_string());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PulseError::Credential(message),
        StatusCode::REQUEST_TIMEOUT => PulseError::Timeout(STATEMENT_TIMEOUT_SECS),
        StatusCode::NOT_FOUND => PulseError::NotFound(message),
        _ => PulseError::Api(format!("Status {}: {}", status, message)),
    }
}

fn cell(row: &Row, index: usize) -> Option<&str> {
    row.get(index)?.as_deref()
}

fn unexpected(raw: &str, index: usize) -> PulseError {
    PulseError::Api(format!("unexpected value {:?} in column {}", raw, index))
}

fn decimal_cell(row: &Row, index: usize) -> Result<Decimal> {
    let Some(raw) = cell(row, index) else {
        return Ok(Decimal::ZERO);
    };
    raw.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| unexpected(raw, index))
}

fn count_cell(row: &Row, index: usize) -> Result<u64> {
    let Some(raw) = cell(row, index) else {
        return Ok(0);
    };
    raw.parse::<u64>().map_err(|_| unexpected(raw, index))
}

/// Timestamps come back as epoch seconds with a fraction, optionally
/// followed by a timezone offset in minutes
pub(crate) fn parse_epoch(raw: &str) -> Option<DateTime<Utc>> {
    let value = raw.split_whitespace().next()?;
    let (secs, fraction) = value.split_once('.').unwrap_or((value, ""));
    let secs: i64 = secs.parse().ok()?;
    let digits: String = fraction.chars().take(9).collect();
    let nanos: u32 = format!("{:0<9}", digits).parse().ok()?;
    DateTime::from_timestamp(secs, nanos)
}

pub(crate) fn compute_sql(range: &DateRange) -> String {
    format!(
        "SELECT SUM(CREDITS_USED), COUNT(DISTINCT WAREHOUSE_NAME), COUNT(*)
FROM SNOWFLAKE.ACCOUNT_USAGE.WAREHOUSE_METERING_HISTORY
WHERE START_TIME >= '{}' AND START_TIME < '{}'",
        range.start_str(),
        range.end_str()
    )
}

pub(crate) fn storage_sql(range: &DateRange) -> String {
    format!(
        "SELECT AVG(STORAGE_BYTES) / POWER(1024, 3), AVG(STAGE_BYTES) / POWER(1024, 3), AVG(FAILSAFE_BYTES) / POWER(1024, 3)
FROM SNOWFLAKE.ACCOUNT_USAGE.STORAGE_USAGE
WHERE USAGE_DATE >= '{}' AND USAGE_DATE < '{}'",
        range.start_str(),
        range.end_str()
    )
}

pub(crate) fn warehouse_sql(range: &DateRange) -> String {
    format!(
        "SELECT WAREHOUSE_NAME, SUM(CREDITS_USED), COUNT(*), AVG(CREDITS_USED), MAX(CREDITS_USED), MIN(START_TIME), MAX(END_TIME)
FROM SNOWFLAKE.ACCOUNT_USAGE.WAREHOUSE_METERING_HISTORY
WHERE START_TIME >= '{}' AND START_TIME < '{}' AND WAREHOUSE_NAME IS NOT NULL
GROUP BY WAREHOUSE_NAME
ORDER BY 2 DESC, 1",
        range.start_str(),
        range.end_str()
    )
}

/// Who the token authenticates as
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    pub account: Option<String>,
    pub user: Option<String>,
    pub role: Option<String>,
    pub warehouse: Option<String>,
}

/// SQL API client for one account
pub struct SnowflakeClient {
    http: reqwest::Client,
    base_url: String,
    config: SnowflakeConfig,
}

impl SnowflakeClient {
    pub fn new(config: SnowflakeConfig) -> Result<Self> {
        // Hostnames use hyphens where account names use underscores
        let base_url = format!(
            "https://{}{}",
            config.account.to_lowercase().replace('_', "-"),
            ACCOUNT_DOMAIN
        );
        Self::with_base_url(config, base_url)
    }

    pub fn with_base_url(config: SnowflakeConfig, base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            config,
        })
    }

    pub fn config(&self) -> &SnowflakeConfig {
        &self.config
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.config.token)
            .header(TOKEN_TYPE_HEADER, self.config.token_type.header_value())
            .header(reqwest::header::ACCEPT, "application/json")
    }

    fn statement_url(&self, handle: &str) -> String {
        format!("{}/api/v2/statements/{}", self.base_url, handle)
    }

    /// Run one statement and return all of its rows
    pub async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        tracing::debug!("Submitting statement for account {}", self.config.account);
        let request = StatementRequest {
            statement: sql,
            timeout: STATEMENT_TIMEOUT_SECS,
            role: self.config.role.as_deref(),
            warehouse: self.config.warehouse.as_deref(),
        };
        let response = self
            .authorized(self.http.post(format!("{}/api/v2/statements", self.base_url)))
            .json(&request)
            .send()
            .await
            .map_err(transport)?;

        let mut statement = read_statement(response).await?;
        let page = loop {
            match statement {
                Statement::Done(page) => break page,
                Statement::Running(handle) => {
                    tracing::debug!("Statement {} still running", handle);
                    tokio::time::sleep(POLL_INTERVAL).await;
                    let response = self
                        .authorized(self.http.get(self.statement_url(&handle)))
                        .send()
                        .await
                        .map_err(transport)?;
                    statement = read_statement(response).await?;
                }
            }
        };

        let mut rows = page.rows;
        if page.partitions > 1 {
            let handle = page.handle.ok_or_else(|| {
                PulseError::Api("partitioned result without a statement handle".to_string())
            })?;
            for partition in 1..page.partitions {
                let response = self
                    .authorized(self.http.get(self.statement_url(&handle)))
                    .query(&[("partition", partition)])
                    .send()
                    .await
                    .map_err(transport)?;
                match read_statement(response).await? {
                    Statement::Done(next) => rows.extend(next.rows),
                    Statement::Running(_) => {
                        return Err(PulseError::Api(format!(
                            "partition {} of statement {} is not ready",
                            partition, handle
                        )))
                    }
                }
            }
        }
        Ok(rows)
    }

    /// Check the token by asking who it belongs to
    pub async fn verify(&self) -> Result<SessionInfo> {
        let rows = self
            .query("SELECT CURRENT_ACCOUNT(), CURRENT_USER(), CURRENT_ROLE(), CURRENT_WAREHOUSE()")
            .await?;
        let row = rows.first();
        let text = |index: usize| row.and_then(|r| cell(r, index)).map(str::to_string);
        Ok(SessionInfo {
            account: text(0),
            user: text(1),
            role: text(2),
            warehouse: text(3),
        })
    }
}

#[async_trait]
impl WarehouseProvider for SnowflakeClient {
    fn name(&self) -> &str {
        "snowflake"
    }

    fn account(&self) -> &str {
        &self.config.account
    }

    async fn compute_usage(&self, range: &DateRange) -> Result<ComputeUsage> {
        let rows = self.query(&compute_sql(range)).await?;
        let Some(row) = rows.first() else {
            return Ok(ComputeUsage::default());
        };
        Ok(ComputeUsage {
            credits_used: decimal_cell(row, 0)?,
            warehouses_used: count_cell(row, 1)?,
            metering_records: count_cell(row, 2)?,
        })
    }

    async fn storage_usage(&self, range: &DateRange) -> Result<StorageUsage> {
        let rows = self.query(&storage_sql(range)).await?;
        let Some(row) = rows.first() else {
            return Ok(StorageUsage::default());
        };
        Ok(StorageUsage {
            avg_storage_gb: decimal_cell(row, 0)?,
            avg_stage_gb: decimal_cell(row, 1)?,
            avg_failsafe_gb: decimal_cell(row, 2)?,
        })
    }

    async fn warehouse_usage(&self, range: &DateRange) -> Result<Vec<WarehouseUsage>> {
        let rows = self.query(&warehouse_sql(range)).await?;
        rows.iter()
            .filter_map(|row| cell(row, 0).map(|name| (name, row)))
            .map(|(name, row)| {
                Ok(WarehouseUsage {
                    warehouse_name: name.to_string(),
                    credits_used: decimal_cell(row, 1)?,
                    metering_records: count_cell(row, 2)?,
                    avg_credits_per_record: decimal_cell(row, 3)?,
                    max_credits_per_record: decimal_cell(row, 4)?,
                    first_usage: cell(row, 5).and_then(parse_epoch),
                    last_usage: cell(row, 6).and_then(parse_epoch),
                })
            })
            .collect()
    }
}
