// =============================================================================
// Dashboard Page — server-rendered HTML
// =============================================================================
//
// One page, re-rendered on every submit. The form is a plain GET so that the
// ticker, analysis type and window are all in the URL:
//
//   /?ticker=AAPL&analysis=sma&window=50
//
// Textual results show in a card and are appended to the session history in
// the sidebar. Chart mode embeds `/chart.png`, which renders the image on its
// own request.
// =============================================================================

use std::fmt::Write as _;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header,
    response::{AppendHeaders, Html, IntoResponse, Response},
};
use serde::Deserialize;

use crate::api::rest::{note_failure, AnalysisQuery};
use crate::app_state::AppState;
use crate::error::AnalysisError;
use crate::session::Session;
use crate::types::{AnalysisKind, Ticker};

const PAGE_TITLE: &str = "Finddy Stock Analyzer";
const HEADING: &str = "📈 Finddy 😎❤️ - Stock Analysis Assistant";
const FOOTER: &str = "Created with ❤️ by ARES";

const STYLE: &str = r#"
body { margin: 0; background-color: #f0f2f6; color: #343a40; font-family: Arial, Helvetica, sans-serif; }
.layout { display: flex; min-height: 100vh; }
.sidebar { width: 300px; flex-shrink: 0; box-sizing: border-box; padding: 24px; background-color: #f8f9fa; border-right: 1px solid #e9ecef; }
.main { flex: 1; max-width: 760px; margin: 0 auto; padding: 24px; }
h1, h2, h3 { color: #343a40; text-align: center; font-family: 'Arial Black', sans-serif; margin-bottom: 15px; }
.sidebar h2, .sidebar h3 { text-align: left; }
label { display: block; margin: 12px 0 6px; font-size: 14px; }
.centered-input { display: flex; justify-content: center; align-items: center; gap: 8px; margin: 10px 0; }
.centered-input input { flex: 1; background-color: #ffffff; color: #495057; padding: 10px; font-size: 18px; border-radius: 8px; border: 1px solid #ced4da; }
.centered-input button { padding: 10px 18px; font-size: 16px; border: none; border-radius: 8px; background-color: #6c5ce7; color: #ffffff; cursor: pointer; }
select, input[type=range] { width: 100%; }
.result-card { background-color: #ffffff; padding: 20px; border-radius: 12px; box-shadow: 0 4px 8px rgba(0, 0, 0, 0.05); margin-bottom: 20px; font-size: 18px; text-align: center; word-break: break-word; }
.error-card { background-color: #fff5f5; color: #c0392b; border: 1px solid #f5c6cb; padding: 20px; border-radius: 12px; margin-bottom: 20px; text-align: center; }
.history-box { background-color: #ffffff; padding: 15px; border-radius: 10px; box-shadow: 0 4px 8px rgba(0, 0, 0, 0.1); margin: 20px 0; font-size: 16px; }
.history-box p { margin: 6px 0; }
.center-img { display: block; margin-left: auto; margin-right: auto; width: 80%; }
footer { color: #6c757d; font-size: 12px; text-align: center; margin-top: 20px; }
"#;

// =============================================================================
// View model
// =============================================================================

/// What the main panel shows below the results header.
#[derive(Debug, Clone, PartialEq)]
pub enum Panel {
    /// No ticker entered.
    Empty,
    /// Result card text.
    Card(String),
    /// Chart image for the ticker.
    Chart(Ticker),
    /// User-facing failure message.
    Error(String),
}

/// Everything needed to draw the page.
#[derive(Debug, Clone)]
pub struct PageView {
    /// Ticker text as it goes back into the input field.
    pub ticker_input: String,
    pub kind: AnalysisKind,
    pub window: usize,
    pub window_min: usize,
    pub window_max: usize,
    pub panel: Panel,
    pub history: Vec<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /` — the dashboard.
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<AnalysisQuery>,
) -> Response {
    let config = &state.config;
    let ticker_input = query.raw_ticker(config).trim().to_uppercase();

    let (kind, window, panel) = match query.kind().and_then(|k| Ok((k, query.window(config)?))) {
        Ok((kind, window)) => {
            let panel = evaluate(&state, session, &ticker_input, kind, window).await;
            (kind, window, panel)
        }
        Err(e) => (
            query.kind().unwrap_or_default(),
            config.window_default,
            Err(e),
        ),
    };

    let (status, panel) = match panel {
        Ok(panel) => (axum::http::StatusCode::OK, panel),
        Err(e) => (e.status(), Panel::Error(e.to_string())),
    };

    let view = PageView {
        ticker_input,
        kind,
        window,
        window_min: config.window_min,
        window_max: config.window_max,
        panel,
        history: state.sessions.history(session.id),
    };

    (status, AppendHeaders(session.set_cookie()), Html(render_page(&view))).into_response()
}

/// Run the selected analysis and decide what the panel shows.
async fn evaluate(
    state: &AppState,
    session: Session,
    raw_ticker: &str,
    kind: AnalysisKind,
    window: usize,
) -> Result<Panel, AnalysisError> {
    let Some(ticker) = Ticker::parse(raw_ticker)? else {
        return Ok(Panel::Empty);
    };

    if kind == AnalysisKind::Chart {
        return Ok(Panel::Chart(ticker));
    }

    let outcome = state
        .analyzer
        .run(&ticker, kind, window)
        .await
        .map_err(|e| {
            note_failure(state, &e, Some(&ticker));
            e
        })?;

    state.sessions.append(session.id, outcome.history_entry());
    state.record_success();
    Ok(Panel::Card(outcome.summary()))
}

#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    ticker: Option<String>,
}

/// `GET /chart.png?ticker=..` — the one-year price chart.
pub async fn chart_png(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChartQuery>,
) -> Result<Response, AnalysisError> {
    let raw = query.ticker.as_deref().unwrap_or(&state.config.default_ticker);
    let ticker = Ticker::parse(raw)?.ok_or(AnalysisError::MissingTicker)?;

    let bytes = state.analyzer.chart_png(&ticker).await.map_err(|e| {
        note_failure(&state, &e, Some(&ticker));
        e
    })?;
    state.record_success();

    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        bytes,
    )
        .into_response())
}

// =============================================================================
// Rendering
// =============================================================================

/// Render the full HTML document.
pub fn render_page(view: &PageView) -> String {
    let mut html = String::with_capacity(8 * 1024);

    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{PAGE_TITLE}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <form method=\"get\" action=\"/\" class=\"layout\">\n"
    );

    render_sidebar(&mut html, view);
    render_main(&mut html, view);

    html.push_str("</form>\n</body>\n</html>\n");
    html
}

fn render_sidebar(html: &mut String, view: &PageView) {
    html.push_str("<aside class=\"sidebar\">\n<h2>Stock Analyzer Options</h2>\n");
    html.push_str("<label for=\"analysis\">Choose Analysis Type</label>\n");
    html.push_str(
        "<select id=\"analysis\" name=\"analysis\" onchange=\"this.form.submit()\">\n",
    );
    for kind in AnalysisKind::ALL {
        let selected = if kind == view.kind { " selected" } else { "" };
        let _ = writeln!(
            html,
            "<option value=\"{}\"{selected}>{}</option>",
            kind.slug(),
            kind.label()
        );
    }
    html.push_str("</select>\n");

    if view.kind.uses_window() {
        let window = view.window.clamp(view.window_min, view.window_max);
        let _ = write!(
            html,
            "<label for=\"window\">Select Moving Average Window (days): \
             <span id=\"window-value\">{window}</span></label>\n\
             <input type=\"range\" id=\"window\" name=\"window\" min=\"{}\" max=\"{}\" value=\"{window}\" \
             oninput=\"document.getElementById('window-value').textContent=this.value\" \
             onchange=\"this.form.submit()\">\n",
            view.window_min, view.window_max
        );
    }

    html.push_str("<h3>Stock Query History</h3>\n");
    if !view.history.is_empty() {
        html.push_str("<div class=\"history-box\">\n");
        for entry in &view.history {
            let _ = writeln!(html, "<p>{}</p>", escape_html(entry));
        }
        html.push_str("</div>\n");
    }

    let _ = write!(html, "<hr>\n<footer>{FOOTER}</footer>\n</aside>\n");
}

fn render_main(html: &mut String, view: &PageView) {
    let ticker = escape_html(&view.ticker_input);

    let _ = write!(
        html,
        "<main class=\"main\">\n<h1>{HEADING}</h1>\n\
         <label for=\"ticker\">Enter Stock Ticker (e.g., AAPL)</label>\n\
         <div class=\"centered-input\">\n\
         <input type=\"text\" id=\"ticker\" name=\"ticker\" value=\"{ticker}\" autocomplete=\"off\">\n\
         <button type=\"submit\">Analyze</button>\n</div>\n\
         <h2>Analysis Results for {ticker}</h2>\n"
    );

    match &view.panel {
        Panel::Empty => {}
        Panel::Card(text) => {
            let _ = writeln!(html, "<div class=\"result-card\">{}</div>", escape_html(text));
        }
        Panel::Error(message) => {
            let _ = writeln!(html, "<div class=\"error-card\">{}</div>", escape_html(message));
        }
        Panel::Chart(t) => {
            let name = escape_html(t.as_str());
            let _ = write!(
                html,
                "<h3>{name} Stock Price Over the Last Year</h3>\n\
                 <img class=\"center-img\" src=\"/chart.png?ticker={}\" alt=\"{name} closing prices\">\n",
                encode_query_value(t.as_str())
            );
        }
    }

    html.push_str("</main>\n");
}

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Percent-encode a query-string value (unreserved characters pass through).
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
            out.push(b as char);
        } else {
            let _ = write!(out, "%{b:02X}");
        }
    }
    out
}

// =============================================================================
// Tests
// =============================================================================
