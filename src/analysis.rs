// =============================================================================
// Analyzer — fetch, reduce, describe
// =============================================================================
//
// Each request is a fresh round trip: fetch the needed prices, run one
// indicator over the closes, and describe the result twice (once for the
// result card, once for the session history). Nothing is cached.
// =============================================================================

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};

use crate::chart;
use crate::error::AnalysisError;
use crate::indicators::{current_rsi, latest_ema, latest_macd, latest_sma, MacdPoint};
use crate::market_data::{MarketDataClient, PriceSeries};
use crate::runtime_config::DashboardConfig;
use crate::types::{AnalysisKind, Ticker};

// =============================================================================
// Outcome
// =============================================================================

/// Result of a textual analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "analysis", rename_all = "lowercase")]
pub enum AnalysisOutcome {
    Price {
        ticker: Ticker,
        price: f64,
    },
    Sma {
        ticker: Ticker,
        window: usize,
        value: f64,
    },
    Ema {
        ticker: Ticker,
        window: usize,
        value: f64,
    },
    Rsi {
        ticker: Ticker,
        value: f64,
        label: &'static str,
    },
    Macd {
        ticker: Ticker,
        point: MacdPoint,
    },
}

impl AnalysisOutcome {
    /// Text of the result card.
    pub fn summary(&self) -> String {
        match self {
            Self::Price { ticker, price } => {
                format!("Latest Stock Price for {ticker}: ${}", format_value(*price))
            }
            Self::Sma { ticker, window, value } => {
                format!("SMA for {ticker} over {window} days: {}", format_value(*value))
            }
            Self::Ema { ticker, window, value } => {
                format!("EMA for {ticker} over {window} days: {}", format_value(*value))
            }
            Self::Rsi { ticker, value, .. } => {
                format!("RSI for {ticker}: {}", format_value(*value))
            }
            Self::Macd { ticker, point } => format!("MACD for {ticker}: {}", describe_macd(point)),
        }
    }

    /// Line appended to the session history.
    pub fn history_entry(&self) -> String {
        match self {
            Self::Price { ticker, price } => {
                format!("{ticker} - Stock Price: ${}", format_value(*price))
            }
            Self::Sma { ticker, window, value } => {
                format!("{ticker} - SMA ({window} days): {}", format_value(*value))
            }
            Self::Ema { ticker, window, value } => {
                format!("{ticker} - EMA ({window} days): {}", format_value(*value))
            }
            Self::Rsi { ticker, value, .. } => format!("{ticker} - RSI: {}", format_value(*value)),
            Self::Macd { ticker, point } => format!("{ticker} - MACD: {}", describe_macd(point)),
        }
    }
}

fn describe_macd(point: &MacdPoint) -> String {
    format!(
        "MACD: {}, Signal: {}, Histogram: {}",
        format_value(point.macd),
        format_value(point.signal),
        format_value(point.histogram)
    )
}

/// Render `v` the way result cards have always shown numbers: shortest
/// round-trip decimal, one decimal place for integral values (`100.0`), and
/// exponent form with a signed two-digit exponent (`3.2e-05`, `1e+16`) below
/// 1e-4 or from 1e16 up.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = v.abs();
    if v != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let sci = format!("{v:e}");
        return match sci.split_once('e').map(|(m, e)| (m, e.parse::<i32>())) {
            Some((mantissa, Ok(exp))) => {
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{:02}", exp.abs())
            }
            _ => sci,
        };
    }

    if v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

// =============================================================================
// Analyzer
// =============================================================================

pub struct Analyzer {
    client: MarketDataClient,
    config: Arc<DashboardConfig>,
}

impl Analyzer {
    pub fn new(client: MarketDataClient, config: Arc<DashboardConfig>) -> Self {
        Self { client, config }
    }

    /// Ensure `window` lies within the slider bounds.
    pub fn check_window(&self, window: usize) -> Result<usize, AnalysisError> {
        let (min, max) = (self.config.window_min, self.config.window_max);
        if (min..=max).contains(&window) {
            Ok(window)
        } else {
            Err(AnalysisError::WindowOutOfRange { got: window, min, max })
        }
    }

    /// Run one of the five textual analyses.
    ///
    /// `window` is only consulted for SMA and EMA. Chart mode is rejected;
    /// use [`Analyzer::chart_png`].
    #[instrument(skip(self, ticker, kind), fields(ticker = %ticker, kind = kind.slug()))]
    pub async fn run(
        &self,
        ticker: &Ticker,
        kind: AnalysisKind,
        window: usize,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let ticker = ticker.clone();
        let outcome = match kind {
            AnalysisKind::Price => {
                let price = self
                    .client
                    .latest_price(&ticker)
                    .await
                    .map_err(AnalysisError::Provider)?;
                AnalysisOutcome::Price { ticker, price }
            }
            AnalysisKind::Sma => {
                let window = self.check_window(window)?;
                let closes = self.closes(&ticker).await?;
                let value = latest_sma(&closes, window).ok_or(AnalysisError::InsufficientData {
                    what: "SMA",
                    needed: window,
                    have: closes.len(),
                })?;
                AnalysisOutcome::Sma { ticker, window, value }
            }
            AnalysisKind::Ema => {
                let window = self.check_window(window)?;
                let closes = self.closes(&ticker).await?;
                let value = latest_ema(&closes, window).ok_or(AnalysisError::InsufficientData {
                    what: "EMA",
                    needed: 1,
                    have: closes.len(),
                })?;
                AnalysisOutcome::Ema { ticker, window, value }
            }
            AnalysisKind::Rsi => {
                let closes = self.closes(&ticker).await?;
                let (value, label) = current_rsi(&closes, self.config.rsi_period).ok_or(
                    AnalysisError::InsufficientData {
                        what: "RSI",
                        needed: 2,
                        have: closes.len(),
                    },
                )?;
                AnalysisOutcome::Rsi { ticker, value, label }
            }
            AnalysisKind::Macd => {
                let closes = self.closes(&ticker).await?;
                let point = latest_macd(
                    &closes,
                    self.config.macd_fast,
                    self.config.macd_slow,
                    self.config.macd_signal,
                )
                .ok_or(AnalysisError::InsufficientData {
                    what: "MACD",
                    needed: 1,
                    have: closes.len(),
                })?;
                AnalysisOutcome::Macd { ticker, point }
            }
            AnalysisKind::Chart => return Err(AnalysisError::ChartNotTextual),
        };

        info!(result = %outcome.summary(), "analysis complete");
        Ok(outcome)
    }

    /// Render the one-year price chart as PNG bytes.
    #[instrument(skip(self, ticker), fields(ticker = %ticker))]
    pub async fn chart_png(&self, ticker: &Ticker) -> Result<Vec<u8>, AnalysisError> {
        let series = self.history(ticker).await?;

        let ticker = ticker.clone();
        let dir = self.config.chart_dir.clone();
        let size = (self.config.chart_width, self.config.chart_height);

        let bytes = tokio::task::spawn_blocking(move || {
            chart::price_chart_png(&series, &ticker, &dir, size)
        })
        .await
        .map_err(|e| AnalysisError::Chart(anyhow::anyhow!("chart task failed: {e}")))?
        .map_err(AnalysisError::Chart)?;

        info!(bytes = bytes.len(), "chart rendered");
        Ok(bytes)
    }

    async fn history(&self, ticker: &Ticker) -> Result<PriceSeries, AnalysisError> {
        self.client
            .daily_history(ticker)
            .await
            .map_err(AnalysisError::Provider)
    }

    async fn closes(&self, ticker: &Ticker) -> Result<Vec<f64>, AnalysisError> {
        Ok(self.history(ticker).await?.closes())
    }
}
