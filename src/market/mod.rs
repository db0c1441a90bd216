//! Market data and technical analysis

#[cfg(feature = "web")]
mod client;
pub mod indicators;
pub mod portfolio;
pub mod quotes;

#[cfg(feature = "web")]
pub use client::{parse_chart, parse_chart_with_meta, MarketClient, VALID_PERIODS};
pub use indicators::{analyze, BollingerBands, IndicatorSet, Macd, TrendAnalysis};
pub use portfolio::{
    analyze_portfolio, screen, Holding, PortfolioReport, ScreenCriteria, ScreenResult,
    SCREEN_UNIVERSE,
};
pub use quotes::{
    format_stock_report, market_status, CryptoQuote, IndexSnapshot, MarketOverview, QuoteMeta,
    StockQuote, DEFAULT_CRYPTO, MARKET_INDICES,
};

use serde::{Deserialize, Serialize};

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Candles returned by the historical data tool
pub const HISTORY_CANDLE_LIMIT: usize = 50;

/// One OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Price history for one symbol, oldest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceHistory {
    pub symbol: String,
    pub period: String,
    pub interval: String,
    pub candles: Vec<Candle>,
}

impl PriceHistory {
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }
}

/// Summary over the full history, not just the returned window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub highest_price: f64,
    pub lowest_price: f64,
    pub total_volume: u64,
}

/// Payload of the historical data tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryReport {
    pub symbol: String,
    pub period: String,
    pub interval: String,
    pub data_points: usize,
    pub data: Vec<Candle>,
    pub summary: HistorySummary,
}

impl HistoryReport {
    pub fn from_history(history: PriceHistory) -> Self {
        let candles = &history.candles;
        let summary = HistorySummary {
            start_date: candles.first().map(|c| c.date.clone()),
            end_date: candles.last().map(|c| c.date.clone()),
            highest_price: candles.iter().map(|c| c.high).fold(0.0, f64::max),
            lowest_price: candles
                .iter()
                .map(|c| c.low)
                .reduce(f64::min)
                .unwrap_or(0.0),
            total_volume: candles.iter().map(|c| c.volume).sum(),
        };
        let skip = candles.len().saturating_sub(HISTORY_CANDLE_LIMIT);

        Self {
            data_points: candles.len(),
            data: history.candles[skip..].to_vec(),
            summary,
            symbol: history.symbol,
            period: history.period,
            interval: history.interval,
        }
    }
}
