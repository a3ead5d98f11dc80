// =============================================================================
// Request-boundary errors
// =============================================================================
//
// Library code returns `anyhow::Result`; handlers translate everything into an
// `AnalysisError` so the page and the JSON API can pick a status code and a
// message the user can act on.
// =============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("enter a ticker symbol")]
    MissingTicker,

    #[error("'{0}' is not a valid ticker symbol")]
    InvalidTicker(String),

    #[error("unknown analysis type '{0}'")]
    UnknownAnalysis(String),

    #[error("'{0}' is not a valid moving average window")]
    InvalidWindow(String),

    #[error("moving average window must be between {min} and {max} days (got {got})")]
    WindowOutOfRange { got: usize, min: usize, max: usize },

    #[error("not enough price history for {what}: need {needed} closes, have {have}")]
    InsufficientData {
        what: &'static str,
        needed: usize,
        have: usize,
    },

    #[error("chart mode returns an image; request /chart.png instead")]
    ChartNotTextual,

    #[error("could not fetch market data: {0:#}")]
    Provider(anyhow::Error),

    #[error("could not render chart: {0:#}")]
    Chart(anyhow::Error),
}

impl AnalysisError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingTicker
            | Self::InvalidTicker(_)
            | Self::UnknownAnalysis(_)
            | Self::InvalidWindow(_)
            | Self::WindowOutOfRange { .. }
            | Self::ChartNotTextual => StatusCode::BAD_REQUEST,
            Self::InsufficientData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Provider(_) | Self::Chart(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Upstream failures worth keeping in the server's error log.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Chart(_))
    }
}

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}
