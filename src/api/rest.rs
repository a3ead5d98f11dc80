// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// The dashboard page lives at `/` (see `page.rs`); machine-readable endpoints
// live under `/api/v1/`. Every endpoint is public: the only per-caller state is
// the session history, keyed by the session cookie.
//
// CORS is configured permissively so the JSON API can back other front ends.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Query, State},
    response::{AppendHeaders, IntoResponse},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::analysis::AnalysisOutcome;
use crate::api::page;
use crate::app_state::AppState;
use crate::error::AnalysisError;
use crate::runtime_config::DashboardConfig;
use crate::session::Session;
use crate::types::{AnalysisKind, Ticker};

// =============================================================================
// Router construction
// =============================================================================

/// Build the full router with tracing and CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Dashboard ───────────────────────────────────────────────
        .route("/", get(page::dashboard))
        .route("/chart.png", get(page::chart_png))
        // ── JSON API ────────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        .route("/api/v1/analysis", get(analysis))
        .route("/api/v1/history", get(history))
        .route("/api/v1/errors", get(errors))
        // ── Middleware & State ───────────────────────────────────────
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Shared query handling
// =============================================================================

/// Query parameters shared by the page and `/api/v1/analysis`.
#[derive(Debug, Default, Deserialize)]
pub struct AnalysisQuery {
    pub ticker: Option<String>,
    pub analysis: Option<String>,
    /// Kept as text so a malformed value reaches the handler's error path.
    pub window: Option<String>,
}

impl AnalysisQuery {
    /// Ticker text as typed; the configured default when the field is absent.
    pub fn raw_ticker<'a>(&'a self, config: &'a DashboardConfig) -> &'a str {
        self.ticker.as_deref().unwrap_or(&config.default_ticker)
    }

    pub fn kind(&self) -> Result<AnalysisKind, AnalysisError> {
        match &self.analysis {
            Some(slug) => AnalysisKind::from_slug(slug),
            None => Ok(AnalysisKind::default()),
        }
    }

    /// Requested window; the configured default when absent or blank.
    pub fn window(&self, config: &DashboardConfig) -> Result<usize, AnalysisError> {
        match self.window.as_deref().map(str::trim) {
            None | Some("") => Ok(config.window_default),
            Some(raw) => raw
                .parse()
                .map_err(|_| AnalysisError::InvalidWindow(raw.to_string())),
        }
    }
}

/// Log a failed analysis; upstream failures also go to the error log.
pub(crate) fn note_failure(state: &AppState, err: &AnalysisError, ticker: Option<&Ticker>) {
    let ticker = ticker.map(|t| t.to_string());
    if err.is_upstream() {
        warn!(ticker = ?ticker, error = %err, "analysis failed upstream");
        state.push_error(err.to_string(), ticker);
    } else {
        debug!(ticker = ?ticker, error = %err, "analysis rejected");
    }
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    sessions: usize,
    analyses_served: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.start_time.elapsed().as_secs(),
        sessions: state.sessions.len(),
        analyses_served: state.analyses_served(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Analysis
// =============================================================================

#[derive(Serialize)]
struct AnalysisResponse {
    summary: String,
    history_entry: String,
    result: AnalysisOutcome,
}

async fn analysis(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<AnalysisQuery>,
) -> Result<impl IntoResponse, AnalysisError> {
    let kind = query.kind()?;
    let ticker = Ticker::parse(query.raw_ticker(&state.config))?.ok_or(AnalysisError::MissingTicker)?;
    let window = query.window(&state.config)?;

    let outcome = state
        .analyzer
        .run(&ticker, kind, window)
        .await
        .map_err(|e| {
            note_failure(&state, &e, Some(&ticker));
            e
        })?;

    let history_entry = outcome.history_entry();
    state.sessions.append(session.id, history_entry.clone());
    state.record_success();

    let body = AnalysisResponse {
        summary: outcome.summary(),
        history_entry,
        result: outcome,
    };
    Ok((AppendHeaders(session.set_cookie()), Json(body)))
}

// =============================================================================
// Session history
// =============================================================================

#[derive(Serialize)]
struct HistoryResponse {
    session: uuid::Uuid,
    entries: Vec<String>,
}

async fn history(State(state): State<Arc<AppState>>, session: Session) -> impl IntoResponse {
    let body = HistoryResponse {
        session: session.id,
        entries: state.sessions.history(session.id),
    };
    (AppendHeaders(session.set_cookie()), Json(body))
}

// =============================================================================
// Error log
// =============================================================================

async fn errors(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.recent_errors())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::market_data::client::tests::spawn_fake_provider;
    use crate::session::SESSION_COOKIE;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use tower::ServiceExt;

    /// Router backed by a fake chart endpoint, plus the shared state.
    pub(crate) async fn test_app() -> (Router, Arc<AppState>) {
        let config = DashboardConfig {
            provider_base_url: spawn_fake_provider().await,
            chart_dir: std::env::temp_dir().join(format!("finddy-api-{}", uuid::Uuid::new_v4())),
            ..DashboardConfig::default()
        };
        let state = Arc::new(AppState::new(config).unwrap());
        (router(state.clone()), state)
    }

    pub(crate) async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response {
        let mut req = Request::get(uri);
        if let Some(c) = cookie {
            req = req.header(header::COOKIE, c);
        }
        app.clone()
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub(crate) async fn body_string(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        serde_json::from_str(&body_string(resp).await).unwrap()
    }

    /// `name=value` part of the response's `Set-Cookie` header.
    pub(crate) fn session_cookie(resp: &Response) -> String {
        let value = resp
            .headers()
            .get(header::SET_COOKIE)
            .expect("session cookie set")
            .to_str()
            .unwrap();
        value.split(';').next().unwrap().to_string()
    }

    #[test]
    fn query_defaults_come_from_config() {
        let config = DashboardConfig::default();
        let q = AnalysisQuery::default();
        assert_eq!(q.raw_ticker(&config), "AAPL");
        assert_eq!(q.kind().unwrap(), AnalysisKind::Price);
        assert_eq!(q.window(&config).unwrap(), 50);
    }

    #[test]
    fn window_text_is_parsed() {
        let config = DashboardConfig::default();
        let q = |w: &str| AnalysisQuery {
            window: Some(w.to_string()),
            ..AnalysisQuery::default()
        };
        assert_eq!(q(" 20 ").window(&config).unwrap(), 20);
        assert_eq!(q("").window(&config).unwrap(), 50);
        for bad in ["abc", "-3", "2.5"] {
            assert!(matches!(q(bad).window(&config), Err(AnalysisError::InvalidWindow(_))));
        }
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _) = test_app().await;
        let resp = get(&app, "/api/v1/health", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["analyses_served"], 0);
    }

    #[tokio::test]
    async fn analysis_returns_summary_and_sets_cookie() {
        let (app, state) = test_app().await;
        let resp = get(&app, "/api/v1/analysis?ticker=up&analysis=rsi", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = session_cookie(&resp);
        assert!(cookie.starts_with(SESSION_COOKIE));

        let json = body_json(resp).await;
        assert_eq!(json["summary"], "RSI for UP: 100.0");
        assert_eq!(json["history_entry"], "UP - RSI: 100.0");
        assert_eq!(json["result"]["analysis"], "rsi");
        assert_eq!(json["result"]["label"], "OVERBOUGHT");
        assert_eq!(state.analyses_served(), 1);
    }

    #[tokio::test]
    async fn history_follows_session_cookie() {
        let (app, _) = test_app().await;
        let first = get(&app, "/api/v1/analysis?ticker=FLAT&analysis=sma&window=20", None).await;
        let cookie = session_cookie(&first);

        get(&app, "/api/v1/analysis?ticker=FLAT&analysis=price", Some(&cookie)).await;

        let resp = get(&app, "/api/v1/history", Some(&cookie)).await;
        assert!(resp.headers().get(header::SET_COOKIE).is_none());
        let json = body_json(resp).await;
        assert_eq!(
            json["entries"],
            serde_json::json!(["FLAT - SMA (20 days): 100.0", "FLAT - Stock Price: $100.0"])
        );

        // A different browser sees nothing.
        let other = body_json(get(&app, "/api/v1/history", None).await).await;
        assert_eq!(other["entries"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn invalid_ticker_is_bad_request() {
        let (app, _) = test_app().await;
        let resp = get(&app, "/api/v1/analysis?ticker=%3Cscript%3E", None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert!(json["error"].as_str().unwrap().contains("not a valid ticker"));
    }

    #[tokio::test]
    async fn blank_ticker_is_bad_request() {
        let (app, _) = test_app().await;
        let resp = get(&app, "/api/v1/analysis?ticker=", None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn window_out_of_range_is_bad_request() {
        let (app, _) = test_app().await;
        let resp = get(&app, "/api/v1/analysis?ticker=FLAT&analysis=ema&window=500", None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_window_is_json_bad_request() {
        let (app, _) = test_app().await;
        let resp = get(&app, "/api/v1/analysis?ticker=FLAT&analysis=sma&window=abc", None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let json = body_json(resp).await;
        assert_eq!(json["error"], "'abc' is not a valid moving average window");
    }

    #[tokio::test]
    async fn chart_kind_is_rejected_by_json_api() {
        let (app, _) = test_app().await;
        let resp = get(&app, "/api/v1/analysis?ticker=FLAT&analysis=chart", None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn insufficient_history_is_unprocessable() {
        let (app, _) = test_app().await;
        let resp = get(&app, "/api/v1/analysis?ticker=SHORT&analysis=sma&window=50", None).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn unknown_symbol_is_bad_gateway_and_logged() {
        let (app, state) = test_app().await;
        let resp = get(&app, "/api/v1/analysis?ticker=NOPE&analysis=macd", None).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(state.analyses_served(), 0);

        let errors = body_json(get(&app, "/api/v1/errors", None).await).await;
        let errors = errors.as_array().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["ticker"], "NOPE");
    }

    #[tokio::test]
    async fn rejected_input_is_not_logged_as_error() {
        let (app, state) = test_app().await;
        get(&app, "/api/v1/analysis?ticker=FLAT&analysis=bogus", None).await;
        assert!(state.recent_errors().is_empty());
    }
}
