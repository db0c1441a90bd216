//! Portfolio valuation and price screening over fetched quotes

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::quotes::StockQuote;
use super::round2;
use crate::error::{PulseError, Result};

/// Symbols screened when the caller names none
pub const SCREEN_UNIVERSE: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "META", "NVDA", "NFLX", "AMD", "INTC",
];

/// Entries in the best and worst performer lists
pub const PERFORMER_LIMIT: usize = 3;

/// One position as supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub shares: f64,
    /// Price paid per share; zero means unknown
    #[serde(default)]
    pub cost_basis: f64,
}

/// Valuation of one priced position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionReport {
    pub symbol: String,
    pub company_name: String,
    pub shares: f64,
    pub cost_basis: f64,
    pub current_price: f64,
    pub current_value: f64,
    pub cost_value: f64,
    pub gain_loss: f64,
    pub gain_loss_percent: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub total_value: f64,
    pub total_cost: f64,
    pub total_gain_loss: f64,
    pub total_gain_loss_percent: f64,
    pub number_of_holdings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioReport {
    pub portfolio_summary: PortfolioSummary,
    pub holdings: Vec<PositionReport>,
    pub top_performers: Vec<PositionReport>,
    pub worst_performers: Vec<PositionReport>,
    /// Holdings left out because no quote was available
    pub unpriced: Vec<String>,
}

/// Reject holdings that cannot be valued
pub fn validate_holdings(holdings: &[Holding]) -> Result<()> {
    for holding in holdings {
        if holding.symbol.trim().is_empty() {
            return Err(PulseError::InvalidInput(
                "every holding needs a symbol".to_string(),
            ));
        }
        if !holding.shares.is_finite() || holding.shares < 0.0 {
            return Err(PulseError::InvalidInput(format!(
                "shares for {} must be a non-negative number",
                holding.symbol
            )));
        }
        if !holding.cost_basis.is_finite() || holding.cost_basis < 0.0 {
            return Err(PulseError::InvalidInput(format!(
                "cost_basis for {} must be a non-negative number",
                holding.symbol
            )));
        }
    }
    Ok(())
}

/// Value `holdings` at the quoted prices (keyed by upper-case symbol).
///
/// A holding without a cost basis is valued at cost = current value, so it
/// shows no gain or loss. Weights are shares of the total current value.
pub fn analyze_portfolio(
    holdings: &[Holding],
    quotes: &HashMap<String, StockQuote>,
) -> PortfolioReport {
    let mut positions = Vec::new();
    let mut unpriced = Vec::new();
    let mut total_value = 0.0;
    let mut total_cost = 0.0;

    for holding in holdings {
        let symbol = holding.symbol.trim().to_uppercase();
        let Some(quote) = quotes.get(&symbol) else {
            unpriced.push(symbol);
            continue;
        };
        let current_value = holding.shares * quote.current_price;
        let cost_value = if holding.cost_basis > 0.0 {
            holding.shares * holding.cost_basis
        } else {
            current_value
        };
        let gain_loss = current_value - cost_value;
        let gain_loss_percent = if cost_value > 0.0 {
            gain_loss / cost_value * 100.0
        } else {
            0.0
        };
        total_value += current_value;
        total_cost += cost_value;

        positions.push(PositionReport {
            symbol,
            company_name: quote.company_name.clone(),
            shares: holding.shares,
            cost_basis: holding.cost_basis,
            current_price: quote.current_price,
            current_value: round2(current_value),
            cost_value: round2(cost_value),
            gain_loss: round2(gain_loss),
            gain_loss_percent: round2(gain_loss_percent),
            weight: 0.0,
        });
    }

    for position in &mut positions {
        position.weight = if total_value > 0.0 {
            round2(position.current_value / total_value * 100.0)
        } else {
            0.0
        };
    }

    let total_gain_loss = total_value - total_cost;
    let summary = PortfolioSummary {
        total_value: round2(total_value),
        total_cost: round2(total_cost),
        total_gain_loss: round2(total_gain_loss),
        total_gain_loss_percent: if total_cost > 0.0 {
            round2(total_gain_loss / total_cost * 100.0)
        } else {
            0.0
        },
        number_of_holdings: positions.len(),
    };

    let mut best = positions.clone();
    best.sort_by(|a, b| b.gain_loss_percent.total_cmp(&a.gain_loss_percent));
    best.truncate(PERFORMER_LIMIT);

    let mut worst = positions.clone();
    worst.sort_by(|a, b| a.gain_loss_percent.total_cmp(&b.gain_loss_percent));
    worst.truncate(PERFORMER_LIMIT);

    PortfolioReport {
        portfolio_summary: summary,
        holdings: positions,
        top_performers: best,
        worst_performers: worst,
        unpriced,
    }
}

/// Price band for screening; bounds are inclusive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenCriteria {
    #[serde(default)]
    pub min_price: f64,
    #[serde(default)]
    pub max_price: Option<f64>,
}

impl Default for ScreenCriteria {
    fn default() -> Self {
        Self {
            min_price: 0.0,
            max_price: None,
        }
    }
}

impl ScreenCriteria {
    pub fn validate(&self) -> Result<()> {
        if let Some(max) = self.max_price {
            if max < self.min_price {
                return Err(PulseError::InvalidInput(format!(
                    "max_price {} is below min_price {}",
                    max, self.min_price
                )));
            }
        }
        Ok(())
    }

    pub fn matches(&self, price: f64) -> bool {
        price >= self.min_price && self.max_price.map_or(true, |max| price <= max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenMatch {
    pub symbol: String,
    pub company_name: String,
    pub price: f64,
    pub change_percent: f64,
    pub volume: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenResult {
    pub criteria: ScreenCriteria,
    pub total_screened: usize,
    pub matches_found: usize,
    pub results: Vec<ScreenMatch>,
}

/// Keep quotes inside the price band, strongest daily move first
pub fn screen(criteria: ScreenCriteria, screened: usize, quotes: &[StockQuote]) -> ScreenResult {
    let mut results: Vec<ScreenMatch> = quotes
        .iter()
        .filter(|q| criteria.matches(q.current_price))
        .map(|q| ScreenMatch {
            symbol: q.symbol.clone(),
            company_name: q.company_name.clone(),
            price: q.current_price,
            change_percent: q.change_percent,
            volume: q.volume,
        })
        .collect();
    results.sort_by(|a, b| b.change_percent.total_cmp(&a.change_percent));

    ScreenResult {
        criteria,
        total_screened: screened,
        matches_found: results.len(),
        results,
    }
}
