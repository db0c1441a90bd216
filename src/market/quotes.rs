//! Quotes, indices and crypto snapshots derived from chart data

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::{round2, Candle};

/// Indices reported by the market overview, in display order
pub const MARKET_INDICES: &[(&str, &str)] = &[
    ("S&P 500", "^GSPC"),
    ("NASDAQ", "^IXIC"),
    ("Dow Jones", "^DJI"),
    ("Russell 2000", "^RUT"),
    ("VIX", "^VIX"),
];

/// Pairs returned by the crypto tool when none are requested
pub const DEFAULT_CRYPTO: &[&str] = &["BTC-USD", "ETH-USD", "ADA-USD", "DOT-USD", "LINK-USD"];

/// Instrument metadata carried alongside chart bars
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteMeta {
    pub currency: Option<String>,
    pub exchange_name: Option<String>,
    pub long_name: Option<String>,
    pub short_name: Option<String>,
    pub regular_market_price: Option<f64>,
    pub regular_market_volume: Option<u64>,
    pub regular_market_day_high: Option<f64>,
    pub regular_market_day_low: Option<f64>,
    pub chart_previous_close: Option<f64>,
    pub previous_close: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
}

/// Latest price and daily move for one symbol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockQuote {
    pub symbol: String,
    pub company_name: String,
    pub currency: Option<String>,
    pub exchange: Option<String>,
    pub current_price: f64,
    pub previous_close: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
}

impl StockQuote {
    /// Build a quote from chart metadata and recent daily bars.
    ///
    /// The previous close is the second-to-last bar when there are two,
    /// else the chart's own previous close. `None` when no price is known.
    pub fn from_chart(symbol: &str, meta: &QuoteMeta, candles: &[Candle]) -> Option<Self> {
        let last = candles.last();
        let current = meta
            .regular_market_price
            .or_else(|| last.map(|c| c.close))?;
        let previous = match candles {
            [.., before, _] => before.close,
            _ => meta
                .chart_previous_close
                .or(meta.previous_close)
                .unwrap_or(current),
        };
        let (change, change_percent) = daily_move(current, previous);

        Some(Self {
            symbol: symbol.to_uppercase(),
            company_name: meta
                .long_name
                .clone()
                .or_else(|| meta.short_name.clone())
                .unwrap_or_else(|| symbol.to_uppercase()),
            currency: meta.currency.clone(),
            exchange: meta.exchange_name.clone(),
            current_price: round2(current),
            previous_close: round2(previous),
            change,
            change_percent,
            volume: meta
                .regular_market_volume
                .or_else(|| last.map(|c| c.volume))
                .unwrap_or(0),
            day_high: meta.regular_market_day_high.or_else(|| last.map(|c| c.high)),
            day_low: meta.regular_market_day_low.or_else(|| last.map(|c| c.low)),
            fifty_two_week_high: meta.fifty_two_week_high,
            fifty_two_week_low: meta.fifty_two_week_low,
        })
    }
}

/// `(change, change_percent)`, both rounded to two decimals
fn daily_move(current: f64, previous: f64) -> (f64, f64) {
    let change = current - previous;
    let percent = if previous == 0.0 {
        0.0
    } else {
        change / previous * 100.0
    };
    (round2(change), round2(percent))
}

/// One entry of the indices table. Unavailable indices keep their slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexSnapshot {
    pub name: String,
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IndexSnapshot {
    pub fn from_quote(name: &str, quote: &StockQuote) -> Self {
        Self {
            name: name.to_string(),
            symbol: quote.symbol.clone(),
            current_value: Some(quote.current_price),
            change: Some(quote.change),
            change_percent: Some(quote.change_percent),
            volume: Some(quote.volume),
            error: None,
        }
    }

    pub fn unavailable(name: &str, symbol: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            current_value: None,
            change: None,
            change_percent: None,
            volume: None,
            error: Some("Data not available".to_string()),
        }
    }
}

/// Price snapshot for one crypto pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CryptoQuote {
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
}

impl From<&StockQuote> for CryptoQuote {
    fn from(quote: &StockQuote) -> Self {
        Self {
            name: quote
                .symbol
                .strip_suffix("-USD")
                .unwrap_or(&quote.symbol)
                .to_string(),
            symbol: quote.symbol.clone(),
            current_price: quote.current_price,
            change: quote.change,
            change_percent: quote.change_percent,
            volume: quote.volume,
        }
    }
}

/// Indices and crypto in one payload
#[derive(Debug, Clone, Serialize)]
pub struct MarketOverview {
    pub market_indices: Vec<IndexSnapshot>,
    pub cryptocurrencies: Vec<CryptoQuote>,
    pub timestamp: DateTime<Utc>,
    pub market_status: &'static str,
}

/// "open" on weekdays, "closed" on weekends. Holidays are not tracked.
pub fn market_status(now: DateTime<Utc>) -> &'static str {
    if now.weekday().num_days_from_monday() < 5 {
        "open"
    } else {
        "closed"
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn optional_price(value: Option<f64>) -> String {
    value
        .map(|v| format!("${:.2}", v))
        .unwrap_or_else(|| "n/a".to_string())
}

/// Plain-text report for one quote
pub fn format_stock_report(quote: &StockQuote) -> String {
    let direction = if quote.change >= 0.0 { "up" } else { "down" };
    let lines = vec![
        format!("{} ({})", quote.company_name, quote.symbol),
        "=".repeat(50),
        format!("Current Price: ${:.2}", quote.current_price),
        format!("Previous Close: ${:.2}", quote.previous_close),
        format!(
            "Change: {:+.2} ({:+.2}%, {})",
            quote.change, quote.change_percent, direction
        ),
        format!("Volume: {}", group_thousands(quote.volume)),
        format!(
            "Exchange: {} ({})",
            quote.exchange.as_deref().unwrap_or("n/a"),
            quote.currency.as_deref().unwrap_or("n/a")
        ),
        String::new(),
        "Day Range:".to_string(),
        format!("   High: {}", optional_price(quote.day_high)),
        format!("   Low: {}", optional_price(quote.day_low)),
        String::new(),
        "52-Week Range:".to_string(),
        format!("   High: {}", optional_price(quote.fifty_two_week_high)),
        format!("   Low: {}", optional_price(quote.fifty_two_week_low)),
    ];
    lines.join("\n")
}
