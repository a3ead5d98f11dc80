use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// One daily (or intraday) bar reduced to its close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

/// Time-ordered closes for a single symbol, oldest first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PriceSeries {
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series, sorting by timestamp and dropping non-finite closes.
    pub fn new(mut points: Vec<PricePoint>) -> Self {
        points.retain(|p| p.close.is_finite());
        points.sort_by_key(|p| p.timestamp);
        Self { points }
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.points.last().map(|p| p.close)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Parsed chart response: metadata plus the close series.
#[derive(Debug, Clone)]
pub struct ChartData {
    pub symbol: String,
    pub currency: Option<String>,
    pub regular_market_price: Option<f64>,
    pub series: PriceSeries,
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------
//
// {"chart": {"result": [{"meta": {...}, "timestamp": [...],
//            "indicators": {"quote": [{"close": [...]}]}}],
//            "error": null}}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: String,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    code: String,
    description: String,
}

/// Parse a chart response body.
///
/// A provider-reported error (for example an unknown symbol) is returned as an
/// `Err` carrying the provider's code and description. Bars whose close is
/// `null` (halted sessions, the still-open bar) are skipped.
pub fn parse_chart_response(body: &str) -> Result<ChartData> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).context("failed to parse chart response")?;

    if let Some(err) = envelope.chart.error {
        anyhow::bail!("provider error {}: {}", err.code, err.description);
    }

    let result = envelope
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .context("chart response contains no result")?;

    let timestamps = result.timestamp.unwrap_or_default();
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let mut points = Vec::with_capacity(timestamps.len());
    for (ts, close) in timestamps.iter().zip(closes.iter()) {
        let Some(close) = close else { continue };
        let Some(timestamp) = DateTime::<Utc>::from_timestamp(*ts, 0) else {
            continue;
        };
        points.push(PricePoint {
            timestamp,
            close: *close,
        });
    }

    let series = PriceSeries::new(points);
    debug!(symbol = %result.meta.symbol, bars = series.len(), "chart response parsed");

    Ok(ChartData {
        symbol: result.meta.symbol,
        currency: result.meta.currency,
        regular_market_price: result.meta.regular_market_price,
        series,
    })
}
