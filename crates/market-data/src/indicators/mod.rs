//! Pluggable technical indicator scoring.
//!
//! Providers that expose raw price history hand an ordered [`PriceSeries`]
//! (oldest first) to an [`IndicatorStrategy`], which returns a
//! [`TechnicalIndicators`] record. Strategies must be total: a series too
//! short for an indicator yields zero for that field, never a panic or NaN.

use crate::models::TechnicalIndicators;

/// Ordered price history, oldest sample first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PriceSeries {
    pub prices: Vec<f64>,
    /// Per-sample traded volume. May be empty; when present it must align
    /// with `prices`, otherwise volume-based indicators are zero.
    pub volumes: Vec<f64>,
}

impl PriceSeries {
    pub fn new(prices: Vec<f64>, volumes: Vec<f64>) -> Self {
        Self { prices, volumes }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    fn aligned_volumes(&self) -> Option<&[f64]> {
        (!self.volumes.is_empty() && self.volumes.len() == self.prices.len())
            .then_some(self.volumes.as_slice())
    }
}

/// Turns a price series into indicator values.
pub trait IndicatorStrategy: Send + Sync {
    fn score(&self, series: &PriceSeries) -> TechnicalIndicators;
}

/// Textbook indicator set with configurable periods.
#[derive(Clone, Debug)]
pub struct StandardIndicators {
    pub rsi_period: usize,
    pub ema_short: usize,
    pub ema_long: usize,
    pub signal_period: usize,
    pub sma_period: usize,
    pub bollinger_width: f64,
}

impl Default for StandardIndicators {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            ema_short: 12,
            ema_long: 26,
            signal_period: 9,
            sma_period: 20,
            bollinger_width: 2.0,
        }
    }
}

impl IndicatorStrategy for StandardIndicators {
    fn score(&self, series: &PriceSeries) -> TechnicalIndicators {
        let prices = &series.prices;

        let (macd, macd_signal, macd_histogram) = self.macd(prices);
        let (bollinger_upper, bollinger_middle, bollinger_lower) = self.bollinger(prices);
        let (obv, vwap) = match series.aligned_volumes() {
            Some(volumes) => (obv(prices, volumes), vwap(prices, volumes)),
            None => (0.0, 0.0),
        };

        TechnicalIndicators {
            rsi: rsi(prices, self.rsi_period),
            macd,
            macd_signal,
            macd_histogram,
            ema_short: last(&ema_series(prices, self.ema_short)),
            ema_long: last(&ema_series(prices, self.ema_long)),
            sma: sma(prices, self.sma_period),
            bollinger_upper,
            bollinger_middle,
            bollinger_lower,
            obv,
            vwap,
        }
    }
}

impl StandardIndicators {
    fn macd(&self, prices: &[f64]) -> (f64, f64, f64) {
        let short = ema_series(prices, self.ema_short);
        let long = ema_series(prices, self.ema_long);
        if short.is_empty() || long.is_empty() {
            return (0.0, 0.0, 0.0);
        }

        // Both series end at the latest price; align them from the back.
        let offset = short.len() - long.len().min(short.len());
        let line: Vec<f64> = long
            .iter()
            .zip(&short[offset..])
            .map(|(l, s)| s - l)
            .collect();

        let macd = last(&line);
        let signal_series = ema_series(&line, self.signal_period);
        if signal_series.is_empty() {
            return (macd, 0.0, 0.0);
        }
        let signal = last(&signal_series);
        (macd, signal, macd - signal)
    }

    fn bollinger(&self, prices: &[f64]) -> (f64, f64, f64) {
        let period = self.sma_period;
        if period == 0 || prices.len() < period {
            return (0.0, 0.0, 0.0);
        }
        let window = &prices[prices.len() - period..];
        let middle = mean(window);
        let variance = window.iter().map(|p| (p - middle).powi(2)).sum::<f64>() / period as f64;
        let band = self.bollinger_width * variance.sqrt();
        (middle + band, middle, middle - band)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn last(values: &[f64]) -> f64 {
    values.last().copied().unwrap_or(0.0)
}

/// Simple moving average of the last `period` samples.
pub fn sma(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period {
        return 0.0;
    }
    mean(&prices[prices.len() - period..])
}

/// Exponential moving average, seeded with the SMA of the first `period`
/// samples. The result has `len - period + 1` points, ending at the latest
/// sample, or is empty when the series is too short.
pub fn ema_series(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || prices.len() < period {
        return Vec::new();
    }
    let k = 2.0 / (period as f64 + 1.0);
    let mut current = mean(&prices[..period]);
    let mut out = Vec::with_capacity(prices.len() - period + 1);
    out.push(current);
    for price in &prices[period..] {
        current = price * k + current * (1.0 - k);
        out.push(current);
    }
    out
}

/// Wilder's relative strength index, bounded to `[0, 100]`.
pub fn rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() <= period {
        return 0.0;
    }

    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let (mut avg_gain, mut avg_loss) = changes[..period].iter().fold((0.0, 0.0), |(g, l), c| {
        if *c > 0.0 {
            (g + c, l)
        } else {
            (g, l - c)
        }
    });
    avg_gain /= period as f64;
    avg_loss /= period as f64;

    let p = period as f64;
    for change in &changes[period..] {
        let (gain, loss) = if *change > 0.0 {
            (*change, 0.0)
        } else {
            (0.0, -*change)
        };
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
    }

    if avg_loss == 0.0 {
        return if avg_gain == 0.0 { 50.0 } else { 100.0 };
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}

/// On-balance volume over the whole series.
pub fn obv(prices: &[f64], volumes: &[f64]) -> f64 {
    prices
        .windows(2)
        .zip(volumes.iter().skip(1))
        .fold(0.0, |acc, (w, v)| {
            if w[1] > w[0] {
                acc + v
            } else if w[1] < w[0] {
                acc - v
            } else {
                acc
            }
        })
}

/// Volume-weighted average price over the whole series.
pub fn vwap(prices: &[f64], volumes: &[f64]) -> f64 {
    let total_volume: f64 = volumes.iter().sum();
    if total_volume <= 0.0 {
        return 0.0;
    }
    prices.iter().zip(volumes).map(|(p, v)| p * v).sum::<f64>() / total_volume
}
