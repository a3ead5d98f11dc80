// =============================================================================
// Central Application State — Finddy dashboard
// =============================================================================
//
// Ties the analyzer, the session store and the error log together behind one
// `Arc<AppState>` handed to every request handler.
//
// Thread safety:
//   - Atomic counter for lock-free request accounting.
//   - parking_lot::RwLock for the mutable collections (sessions, errors).
// =============================================================================

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::analysis::Analyzer;
use crate::market_data::MarketDataClient;
use crate::runtime_config::DashboardConfig;
use crate::session::SessionStore;

// =============================================================================
// Error Record
// =============================================================================

/// A recorded upstream failure for the error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// Ticker the failing request was about, if any.
    pub ticker: Option<String>,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

// =============================================================================
// AppState
// =============================================================================

pub struct AppState {
    pub config: Arc<DashboardConfig>,
    pub analyzer: Analyzer,
    pub sessions: SessionStore,

    /// Successful analyses (text and chart) served since start.
    pub analyses_served: AtomicU64,

    pub recent_errors: RwLock<VecDeque<ErrorRecord>>,

    /// Instant when the server was started. Used for uptime calculations.
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct the state from a validated configuration.
    pub fn new(config: DashboardConfig) -> Result<Self> {
        let config = Arc::new(config);
        let client = MarketDataClient::new(
            config.provider_base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )?;

        Ok(Self {
            analyzer: Analyzer::new(client, config.clone()),
            sessions: SessionStore::new(config.max_sessions),
            analyses_served: AtomicU64::new(0),
            recent_errors: RwLock::new(VecDeque::with_capacity(MAX_RECENT_ERRORS)),
            start_time: std::time::Instant::now(),
            config,
        })
    }

    pub fn record_success(&self) -> u64 {
        self.analyses_served.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn analyses_served(&self) -> u64 {
        self.analyses_served.load(Ordering::Relaxed)
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error message. The log is capped at [`MAX_RECENT_ERRORS`];
    /// oldest entries are evicted when the limit is reached.
    pub fn push_error(&self, message: String, ticker: Option<String>) {
        let record = ErrorRecord {
            message,
            ticker,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        if errors.len() >= MAX_RECENT_ERRORS {
            errors.pop_front();
        }
        errors.push_back(record);
    }

    /// Recorded errors, oldest first.
    pub fn recent_errors(&self) -> Vec<ErrorRecord> {
        self.recent_errors.read().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_empty() {
        let state = AppState::new(DashboardConfig::default()).unwrap();
        assert_eq!(state.analyses_served(), 0);
        assert_eq!(state.sessions.len(), 0);
        assert!(state.recent_errors().is_empty());
    }

    #[test]
    fn error_log_is_bounded() {
        let state = AppState::new(DashboardConfig::default()).unwrap();
        for i in 0..(MAX_RECENT_ERRORS + 7) {
            state.push_error(format!("failure {i}"), Some("AAPL".into()));
        }
        let errors = state.recent_errors();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        assert_eq!(errors[0].message, "failure 7");
        assert_eq!(errors.last().unwrap().ticker.as_deref(), Some("AAPL"));
    }

    #[test]
    fn success_counter_increments() {
        let state = AppState::new(DashboardConfig::default()).unwrap();
        assert_eq!(state.record_success(), 1);
        assert_eq!(state.record_success(), 2);
        assert_eq!(state.analyses_served(), 2);
    }
}
