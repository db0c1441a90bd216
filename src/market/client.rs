//! Yahoo Finance chart API client

use chrono::DateTime;
use futures::stream::{self, StreamExt};
use serde::Deserialize;

use super::quotes::{QuoteMeta, StockQuote};
use super::{round2, Candle, PriceHistory};
use crate::error::{PulseError, Result};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const USER_AGENT: &str = concat!("pulse-mcp/", env!("CARGO_PKG_VERSION"));

/// Window fetched for a quote; long enough to span a weekend
const QUOTE_RANGE: &str = "5d";

/// Periods the chart API accepts as `range`
pub const VALID_PERIODS: &[&str] = &[
    "1d", "5d", "1mo", "3mo", "6mo", "1y", "2y", "5y", "10y", "ytd", "max",
];

/// Market data client
#[derive(Clone)]
pub struct MarketClient {
    client: reqwest::Client,
    base_url: String,
}

impl MarketClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Daily (or `interval`) bars for `symbol` over `period`
    pub async fn history(&self, symbol: &str, period: &str, interval: &str) -> Result<PriceHistory> {
        if !VALID_PERIODS.contains(&period) {
            return Err(PulseError::InvalidInput(format!(
                "unsupported period {:?}, expected one of {}",
                period,
                VALID_PERIODS.join(", ")
            )));
        }
        let symbol = normalize_symbol(symbol)?;
        let body = self.chart(&symbol, period, interval).await?;
        let candles = parse_chart(&body)?;
        Ok(PriceHistory {
            symbol,
            period: period.to_string(),
            interval: interval.to_string(),
            candles,
        })
    }

    /// Latest quote for `symbol`, from the last few daily bars
    pub async fn quote(&self, symbol: &str) -> Result<StockQuote> {
        let symbol = normalize_symbol(symbol)?;
        let body = self.chart(&symbol, QUOTE_RANGE, "1d").await?;
        let (meta, candles) = parse_chart_with_meta(&body)?;
        StockQuote::from_chart(&symbol, &meta, &candles)
            .ok_or_else(|| PulseError::NotFound(format!("no price data for {}", symbol)))
    }

    /// Quotes for several symbols, in input order. One failure does not
    /// affect the others.
    pub async fn quotes(
        &self,
        symbols: &[String],
        concurrency: usize,
    ) -> Vec<(String, Result<StockQuote>)> {
        stream::iter(
            symbols
                .iter()
                .map(|symbol| async move { (symbol.clone(), self.quote(symbol).await) })
                .collect::<Vec<_>>(),
        )
        .buffered(concurrency.max(1))
        .collect()
        .await
    }

    async fn chart(&self, symbol: &str, range: &str, interval: &str) -> Result<String> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        tracing::debug!("Fetching {} chart ({}, {})", symbol, range, interval);

        let response = self
            .client
            .get(&url)
            .query(&[("range", range), ("interval", interval)])
            .send()
            .await
            .map_err(|e| PulseError::Transport(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PulseError::NotFound(format!("symbol {}", symbol)));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PulseError::Api(format!("Status {}: {}", status, body)));
        }

        Ok(response.text().await?)
    }
}

fn normalize_symbol(symbol: &str) -> Result<String> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(PulseError::InvalidInput("symbol is required".to_string()));
    }
    Ok(symbol)
}

#[derive(Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: QuoteMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Deserialize, Default)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

/// Parse a chart API body into candles, oldest first.
///
/// Bars with a missing open/high/low/close (halts, partial sessions) are
/// skipped.
pub fn parse_chart(body: &str) -> Result<Vec<Candle>> {
    parse_chart_with_meta(body).map(|(_, candles)| candles)
}

/// Like [`parse_chart`], also returning the instrument metadata
pub fn parse_chart_with_meta(body: &str) -> Result<(QuoteMeta, Vec<Candle>)> {
    let envelope: ChartEnvelope = serde_json::from_str(body)?;

    if let Some(err) = envelope.chart.error {
        let description = err.description.unwrap_or_default();
        return Err(match err.code.as_deref() {
            Some("Not Found") => PulseError::NotFound(description),
            _ => PulseError::Api(description),
        });
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok((QuoteMeta::default(), Vec::new()));
    };
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let candles = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let date = DateTime::from_timestamp(*ts, 0)?.format("%Y-%m-%d").to_string();
            Some(Candle {
                date,
                open: round2((*quote.open.get(i)?)?),
                high: round2((*quote.high.get(i)?)?),
                low: round2((*quote.low.get(i)?)?),
                close: round2((*quote.close.get(i)?)?),
                volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
            })
        })
        .collect();

    Ok((result.meta, candles))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chart() {
        let body = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1704205800, 1704292200, 1704378600],
                    "indicators": {"quote": [{
                        "open": [185.0, null, 182.15],
                        "high": [188.44, 184.2, 183.0872],
                        "low": [183.886, 182.7, 180.88],
                        "close": [185.64, 184.25, 181.91],
                        "volume": [82488700, 58414500, null]
                    }]}
                }],
                "error": null
            }
        }"#;

        let candles = parse_chart(body).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].date, "2024-01-02");
        assert_eq!(candles[0].low, 183.89);
        assert_eq!(candles[0].volume, 82488700);
        assert_eq!(candles[1].high, 183.09);
        assert_eq!(candles[1].volume, 0);
    }

    #[test]
    fn test_parse_chart_error() {
        let body = r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#;
        assert!(matches!(parse_chart(body), Err(PulseError::NotFound(_))));
    }

    #[test]
    fn test_parse_chart_empty_result() {
        let body = r#"{"chart": {"result": [], "error": null}}"#;
        assert!(parse_chart(body).unwrap().is_empty());
    }

    #[test]
    fn test_parse_chart_meta() {
        let body = r#"{
            "chart": {
                "result": [{
                    "meta": {
                        "currency": "USD",
                        "symbol": "MSFT",
                        "exchangeName": "NMS",
                        "longName": "Microsoft Corporation",
                        "regularMarketPrice": 415.1,
                        "chartPreviousClose": 409.0,
                        "fiftyTwoWeekHigh": 468.35,
                        "fiftyTwoWeekLow": 366.5
                    },
                    "timestamp": [1717545600, 1717632000],
                    "indicators": {"quote": [{
                        "open": [410.0, 412.0],
                        "high": [413.0, 416.0],
                        "low": [408.0, 411.0],
                        "close": [411.5, 415.1],
                        "volume": [1000, 2000]
                    }]}
                }],
                "error": null
            }
        }"#;

        let (meta, candles) = parse_chart_with_meta(body).unwrap();
        assert_eq!(meta.long_name.as_deref(), Some("Microsoft Corporation"));
        assert_eq!(meta.chart_previous_close, Some(409.0));

        let quote = StockQuote::from_chart("MSFT", &meta, &candles).unwrap();
        assert_eq!(quote.current_price, 415.1);
        assert_eq!(quote.previous_close, 411.5);
        assert_eq!(quote.change, 3.6);
        assert_eq!(quote.volume, 2000);
        assert_eq!(quote.exchange.as_deref(), Some("NMS"));
    }

    #[tokio::test]
    async fn test_quote_requires_symbol() {
        let client = MarketClient::new().unwrap();
        let err = client.quote("  ").await.unwrap_err();
        assert!(matches!(err, PulseError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_rejects_unknown_period() {
        let client = MarketClient::new().unwrap();
        let err = client.history("AAPL", "3w", "1d").await.unwrap_err();
        assert!(matches!(err, PulseError::InvalidInput(_)));
    }
}
