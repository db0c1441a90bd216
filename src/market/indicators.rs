//! Technical indicators over a closing-price series
//!
//! Every function looks at the series oldest-first and returns the value at
//! the latest point, or `None` when the series is too short.

use serde::{Deserialize, Serialize};

pub const RSI_PERIOD: usize = 14;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_WIDTH: f64 = 2.0;
const RSI_OVERBOUGHT: f64 = 70.0;
const RSI_OVERSOLD: f64 = 30.0;

/// Simple moving average of the last `window` values
pub fn sma(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    let tail = &values[values.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

/// Exponential moving average series with `alpha = 2 / (span + 1)`.
///
/// Uses the bias-adjusted form: each point is the weighted mean of all
/// values so far with weights `(1 - alpha)^age`, so early points are not
/// dragged toward zero.
pub fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    if span == 0 {
        return Vec::new();
    }
    let decay = 1.0 - 2.0 / (span as f64 + 1.0);
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    values
        .iter()
        .map(|value| {
            numerator = value + decay * numerator;
            denominator = 1.0 + decay * denominator;
            numerator / denominator
        })
        .collect()
}

/// Latest exponential moving average
pub fn ema(values: &[f64], span: usize) -> Option<f64> {
    ema_series(values, span).last().copied()
}

/// Relative strength index from the mean gain/loss over `period` changes
pub fn rsi(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period + 1 {
        return None;
    }
    let window = &values[values.len() - period - 1..];
    let (gains, losses) = window
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((0.0, 0.0), |(g, l), delta| {
            if delta > 0.0 {
                (g + delta, l)
            } else {
                (g, l - delta)
            }
        });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;
    if avg_loss == 0.0 {
        return Some(if avg_gain == 0.0 { 50.0 } else { 100.0 });
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// MACD line, signal line and histogram
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Macd {
    pub macd_line: f64,
    pub signal_line: f64,
    pub histogram: f64,
}

/// MACD(12, 26, 9): the signal is the 9-span EMA of the MACD series
pub fn macd(values: &[f64]) -> Option<Macd> {
    if values.is_empty() {
        return None;
    }
    let fast = ema_series(values, 12);
    let slow = ema_series(values, 26);
    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema_series(&line, 9);

    let macd_line = *line.last()?;
    let signal_line = *signal.last()?;
    Some(Macd {
        macd_line,
        signal_line,
        histogram: macd_line - signal_line,
    })
}

/// Bollinger Bands around the simple moving average
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Bands at `width` sample standard deviations over the last `window` values
pub fn bollinger(values: &[f64], window: usize, width: f64) -> Option<BollingerBands> {
    if window < 2 {
        return None;
    }
    let middle = sma(values, window)?;
    let tail = &values[values.len() - window..];
    let variance =
        tail.iter().map(|v| (v - middle).powi(2)).sum::<f64>() / (window as f64 - 1.0);
    let spread = variance.sqrt() * width;
    Some(BollingerBands {
        upper: middle + spread,
        middle,
        lower: middle - spread,
    })
}

/// Qualitative RSI reading
pub fn rsi_signal(rsi: f64) -> &'static str {
    if rsi > RSI_OVERBOUGHT {
        "Overbought"
    } else if rsi < RSI_OVERSOLD {
        "Oversold"
    } else {
        "Neutral"
    }
}

/// Where the price sits relative to the bands
pub fn band_position(price: f64, bands: &BollingerBands) -> &'static str {
    if price > bands.upper {
        "Above Upper"
    } else if price < bands.lower {
        "Below Lower"
    } else {
        "Within Bands"
    }
}

/// Trend comparisons between price and moving averages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendAnalysis {
    pub price_vs_sma20: Option<&'static str>,
    pub price_vs_sma50: Option<&'static str>,
    pub sma20_vs_sma50: Option<&'static str>,
}

fn above_below(a: f64, b: f64) -> &'static str {
    if a > b {
        "Above"
    } else {
        "Below"
    }
}

/// Full indicator set at the latest point of a series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSet {
    pub current_price: f64,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,
    pub rsi: Option<f64>,
    pub rsi_signal: Option<&'static str>,
    pub macd: Option<Macd>,
    pub bollinger_bands: Option<BollingerBands>,
    pub band_position: Option<&'static str>,
    pub trend: TrendAnalysis,
}

/// Compute every indicator for `closes` (oldest first)
pub fn analyze(closes: &[f64]) -> Option<IndicatorSet> {
    let current_price = *closes.last()?;
    let sma_20 = sma(closes, 20);
    let sma_50 = sma(closes, 50);
    let rsi_value = rsi(closes, RSI_PERIOD);
    let bands = bollinger(closes, BOLLINGER_PERIOD, BOLLINGER_WIDTH);

    Some(IndicatorSet {
        current_price,
        sma_20,
        sma_50,
        ema_12: ema(closes, 12),
        ema_26: ema(closes, 26),
        rsi: rsi_value,
        rsi_signal: rsi_value.map(rsi_signal),
        macd: macd(closes),
        bollinger_bands: bands,
        band_position: bands.as_ref().map(|b| band_position(current_price, b)),
        trend: TrendAnalysis {
            price_vs_sma20: sma_20.map(|s| above_below(current_price, s)),
            price_vs_sma50: sma_50.map(|s| above_below(current_price, s)),
            sma20_vs_sma50: sma_20.zip(sma_50).map(|(fast, slow)| {
                if fast > slow {
                    "Golden Cross"
                } else {
                    "Death Cross"
                }
            }),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_sma() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(sma(&values, 5), Some(3.0));
        assert_eq!(sma(&values, 2), Some(4.5));
        assert_eq!(sma(&values, 6), None);
        assert_eq!(sma(&values, 0), None);
    }

    #[test]
    fn test_ema_adjusted_weights() {
        // span 3 => alpha 0.5, decay 0.5
        let series = ema_series(&[1.0, 2.0, 3.0], 3);
        assert!(close(series[0], 1.0));
        assert!(close(series[1], (2.0 + 0.5) / 1.5));
        assert!(close(series[2], (3.0 + 1.0 + 0.25) / 1.75));
    }

    #[test]
    fn test_ema_of_constant_is_constant() {
        let values = vec![7.5; 40];
        assert!(close(ema(&values, 12).unwrap(), 7.5));
        assert!(close(ema(&values, 26).unwrap(), 7.5));
    }

    #[test]
    fn test_rsi_bounds() {
        let rising: Vec<f64> = (0..20).map(|i| i as f64).collect();
        assert_eq!(rsi(&rising, 14), Some(100.0));

        let falling: Vec<f64> = (0..20).rev().map(|i| i as f64).collect();
        assert!(close(rsi(&falling, 14).unwrap(), 0.0));

        let flat = vec![3.0; 20];
        assert_eq!(rsi(&flat, 14), Some(50.0));

        assert_eq!(rsi(&rising[..14], 14), None);
    }

    #[test]
    fn test_rsi_mixed() {
        // 7 gains of 2 and 7 losses of 1 => RS 2 => RSI 66.67
        let mut values = vec![100.0];
        for i in 0..14 {
            let last = *values.last().unwrap();
            values.push(if i % 2 == 0 { last + 2.0 } else { last - 1.0 });
        }
        let value = rsi(&values, 14).unwrap();
        assert!((value - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(rsi_signal(value), "Neutral");
    }

    #[test]
    fn test_macd_flat_series_is_zero() {
        let result = macd(&vec![10.0; 60]).unwrap();
        assert!(close(result.macd_line, 0.0));
        assert!(close(result.signal_line, 0.0));
        assert!(close(result.histogram, 0.0));
    }

    #[test]
    fn test_macd_rising_series_is_positive() {
        let values: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let result = macd(&values).unwrap();
        assert!(result.macd_line > 0.0);
        assert!(close(result.histogram, result.macd_line - result.signal_line));
    }

    #[test]
    fn test_bollinger_uses_sample_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let bands = bollinger(&values, 8, 2.0).unwrap();
        let std = (32.0f64 / 7.0).sqrt();
        assert!(close(bands.middle, 5.0));
        assert!(close(bands.upper, 5.0 + 2.0 * std));
        assert!(close(bands.lower, 5.0 - 2.0 * std));
        assert_eq!(band_position(20.0, &bands), "Above Upper");
        assert_eq!(band_position(5.0, &bands), "Within Bands");
    }

    #[test]
    fn test_analyze_short_series() {
        let set = analyze(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(set.current_price, 3.0);
        assert_eq!(set.sma_20, None);
        assert_eq!(set.rsi, None);
        assert_eq!(set.trend.sma20_vs_sma50, None);
        assert!(set.ema_12.is_some());
        assert!(analyze(&[]).is_none());
    }

    #[test]
    fn test_analyze_uptrend() {
        let values: Vec<f64> = (0..80).map(|i| 50.0 + i as f64 * 0.5).collect();
        let set = analyze(&values).unwrap();
        assert_eq!(set.trend.price_vs_sma20, Some("Above"));
        assert_eq!(set.trend.sma20_vs_sma50, Some("Golden Cross"));
        assert_eq!(set.rsi_signal, Some("Overbought"));
    }
}
