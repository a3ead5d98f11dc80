// =============================================================================
// Market Data Client — public chart endpoint
// =============================================================================
//
// Talks to a Yahoo-compatible `/v8/finance/chart/{symbol}` endpoint. No API key
// is needed; the endpoint rejects requests without a browser-like User-Agent,
// so one is set as a default header.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, instrument};

use super::series::{parse_chart_response, ChartData, PriceSeries};
use crate::types::Ticker;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) Finddy/1.0";

/// HTTP client for the chart endpoint.
#[derive(Clone)]
pub struct MarketDataClient {
    base_url: String,
    client: reqwest::Client,
}

impl MarketDataClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a new client.
    ///
    /// # Arguments
    /// * `base_url` — chart endpoint without a trailing slash, e.g.
    ///   `https://query1.finance.yahoo.com/v8/finance/chart`.
    /// * `timeout`  — per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %base_url, "MarketDataClient initialised");

        Ok(Self { base_url, client })
    }

    // -------------------------------------------------------------------------
    // Public market data
    // -------------------------------------------------------------------------

    /// Latest traded price from today's session.
    ///
    /// Uses the last non-null close of the one-day bar and falls back to the
    /// `regularMarketPrice` meta field when the bar has no close yet.
    #[instrument(skip(self, ticker), fields(ticker = %ticker), name = "market_data::latest_price")]
    pub async fn latest_price(&self, ticker: &Ticker) -> Result<f64> {
        let data = self.fetch_chart(ticker, "1d", "1d").await?;

        let price = data
            .series
            .last_close()
            .or(data.regular_market_price)
            .with_context(|| format!("no price available for {ticker}"))?;

        debug!(price, currency = ?data.currency, "latest price retrieved");
        Ok(price)
    }

    /// One year of daily closes, oldest first.
    #[instrument(skip(self, ticker), fields(ticker = %ticker), name = "market_data::daily_history")]
    pub async fn daily_history(&self, ticker: &Ticker) -> Result<PriceSeries> {
        let data = self.fetch_chart(ticker, "1y", "1d").await?;

        anyhow::ensure!(
            !data.series.is_empty(),
            "no daily history available for {ticker}"
        );

        debug!(symbol = %data.symbol, bars = data.series.len(), "daily history retrieved");
        Ok(data.series)
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    /// GET `{base}/{symbol}?range=..&interval=..`.
    async fn fetch_chart(&self, ticker: &Ticker, range: &str, interval: &str) -> Result<ChartData> {
        let url = format!("{}/{}", self.base_url, ticker.as_str());

        let resp = self
            .client
            .get(&url)
            .query(&[("range", range), ("interval", interval)])
            .send()
            .await
            .with_context(|| format!("GET chart for {ticker} failed"))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .with_context(|| format!("failed to read chart response for {ticker}"))?;

        // The provider reports unknown symbols as a 404 with a JSON error
        // body; prefer that message over the bare status code.
        match parse_chart_response(&body) {
            Ok(data) if status.is_success() => Ok(data),
            Ok(_) => anyhow::bail!("chart request for {ticker} returned {status}"),
            Err(e) if status.is_success() => Err(e),
            Err(e) => Err(e.context(format!("chart request for {ticker} returned {status}"))),
        }
    }
}

impl std::fmt::Debug for MarketDataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::market_data::series::tests::{chart_json, not_found_json};

    use axum::{
        extract::{Path, Query},
        http::StatusCode,
        response::IntoResponse,
        routing::get,
        Router,
    };
    use std::collections::HashMap;

    /// Serve a fake chart endpoint on an ephemeral port and return its base
    /// URL.
    ///
    /// `FLAT` returns a constant series, `UP` a rising one, `DOWN` a falling
    /// one, `SHORT` three bars, `BROKEN` a 500 with HTML; anything else is
    /// answered like an unknown symbol.
    pub(crate) async fn spawn_fake_provider() -> String {
        async fn chart(
            Path(symbol): Path<String>,
            Query(q): Query<HashMap<String, String>>,
        ) -> axum::response::Response {
            let bars = if q.get("range").map(String::as_str) == Some("1d") { 1 } else { 252 };
            let closes: Vec<Option<f64>> = match symbol.as_str() {
                "FLAT" => vec![Some(100.0); bars],
                "UP" => (1..=bars).map(|i| Some(100.0 + i as f64)).collect(),
                "DOWN" => (1..=bars).map(|i| Some(400.0 - i as f64)).collect(),
                "SHORT" => vec![Some(10.0), Some(11.0), Some(12.0)],
                "BROKEN" => {
                    return (StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>").into_response()
                }
                _ => return (StatusCode::NOT_FOUND, not_found_json()).into_response(),
            };
            (StatusCode::OK, chart_json(&symbol, &closes)).into_response()
        }

        let app = Router::new().route("/:symbol", get(chart));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn ticker(s: &str) -> Ticker {
        Ticker::parse(s).unwrap().unwrap()
    }

    async fn client() -> MarketDataClient {
        MarketDataClient::new(spawn_fake_provider().await, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn latest_price_uses_last_close() {
        let c = client().await;
        assert_eq!(c.latest_price(&ticker("UP")).await.unwrap(), 101.0);
    }

    #[tokio::test]
    async fn daily_history_returns_year_of_closes() {
        let c = client().await;
        let series = c.daily_history(&ticker("FLAT")).await.unwrap();
        assert_eq!(series.len(), 252);
        assert!(series.closes().iter().all(|&v| v == 100.0));
    }

    #[tokio::test]
    async fn unknown_symbol_reports_provider_message() {
        let c = client().await;
        let err = c.daily_history(&ticker("NOPE")).await.unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("Not Found"), "{msg}");
        assert!(msg.contains("404"), "{msg}");
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let c = client().await;
        let err = c.latest_price(&ticker("BROKEN")).await.unwrap_err();
        assert!(format!("{err:#}").contains("500"));
    }

    #[tokio::test]
    async fn unreachable_provider_is_error() {
        let c = MarketDataClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        assert!(c.latest_price(&ticker("AAPL")).await.is_err());
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let c = MarketDataClient::new("http://example.test/chart/", Duration::from_secs(1)).unwrap();
        assert_eq!(c.base_url, "http://example.test/chart");
    }
}
