// =============================================================================
// Runtime Configuration — dashboard settings with atomic save
// =============================================================================
//
// Every tunable parameter of the dashboard lives here: where to listen, which
// market-data endpoint to call, the bounds of the moving-average slider, the
// indicator periods and the chart geometry.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry `#[serde(default)]` so that adding new fields never
// breaks loading an older config file.
//
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::indicators::{macd, rsi};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:8501".to_string()
}

fn default_ticker() -> String {
    "AAPL".to_string()
}

fn default_window_min() -> usize {
    5
}

fn default_window_max() -> usize {
    200
}

fn default_window() -> usize {
    50
}

fn default_rsi_period() -> usize {
    rsi::DEFAULT_RSI_PERIOD
}

fn default_macd_fast() -> usize {
    macd::DEFAULT_FAST
}

fn default_macd_slow() -> usize {
    macd::DEFAULT_SLOW
}

fn default_macd_signal() -> usize {
    macd::DEFAULT_SIGNAL
}

fn default_provider_base_url() -> String {
    "https://query1.finance.yahoo.com/v8/finance/chart".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_chart_width() -> u32 {
    1000
}

fn default_chart_height() -> u32 {
    500
}

fn default_chart_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_max_sessions() -> usize {
    1000
}

// =============================================================================
// DashboardConfig
// =============================================================================

/// Top-level configuration for the Finddy dashboard.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    // --- Server -------------------------------------------------------------

    /// Socket address the HTTP server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Ticker pre-filled in the input field.
    #[serde(default = "default_ticker")]
    pub default_ticker: String,

    // --- Moving-average slider ----------------------------------------------

    #[serde(default = "default_window_min")]
    pub window_min: usize,

    #[serde(default = "default_window_max")]
    pub window_max: usize,

    #[serde(default = "default_window")]
    pub window_default: usize,

    // --- Indicator periods --------------------------------------------------

    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,

    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,

    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,

    // --- Market data --------------------------------------------------------

    /// Base URL of the chart endpoint; the ticker is appended as a path
    /// segment.
    #[serde(default = "default_provider_base_url")]
    pub provider_base_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    // --- Chart --------------------------------------------------------------

    #[serde(default = "default_chart_width")]
    pub chart_width: u32,

    #[serde(default = "default_chart_height")]
    pub chart_height: u32,

    /// Directory the rendered PNG is written to before being served.
    #[serde(default = "default_chart_dir")]
    pub chart_dir: PathBuf,

    // --- Sessions -----------------------------------------------------------

    /// Upper bound on concurrently tracked browser sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            default_ticker: default_ticker(),
            window_min: default_window_min(),
            window_max: default_window_max(),
            window_default: default_window(),
            rsi_period: default_rsi_period(),
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
            provider_base_url: default_provider_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            chart_width: default_chart_width(),
            chart_height: default_chart_height(),
            chart_dir: default_chart_dir(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dashboard config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse dashboard config from {}", path.display()))?;

        info!(
            path = %path.display(),
            bind_addr = %config.bind_addr,
            provider = %config.provider_base_url,
            "dashboard config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise dashboard config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "dashboard config saved (atomic)");
        Ok(())
    }

    /// Apply `FINDDY_*` environment overrides on top of the loaded values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("FINDDY_BIND_ADDR") {
            if !addr.trim().is_empty() {
                self.bind_addr = addr.trim().to_string();
            }
        }
        if let Ok(url) = std::env::var("FINDDY_PROVIDER_URL") {
            if !url.trim().is_empty() {
                self.provider_base_url = url.trim().trim_end_matches('/').to_string();
            }
        }
    }

    /// Reject settings the dashboard cannot operate with.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.window_min >= 1, "window_min must be at least 1");
        anyhow::ensure!(
            self.window_min <= self.window_max,
            "window_min ({}) exceeds window_max ({})",
            self.window_min,
            self.window_max
        );
        anyhow::ensure!(
            (self.window_min..=self.window_max).contains(&self.window_default),
            "window_default ({}) outside {}..={}",
            self.window_default,
            self.window_min,
            self.window_max
        );
        anyhow::ensure!(self.rsi_period >= 1, "rsi_period must be at least 1");
        anyhow::ensure!(
            self.macd_fast >= 1 && self.macd_signal >= 1,
            "MACD spans must be at least 1"
        );
        anyhow::ensure!(
            self.macd_fast < self.macd_slow,
            "macd_fast ({}) must be shorter than macd_slow ({})",
            self.macd_fast,
            self.macd_slow
        );
        anyhow::ensure!(
            self.chart_width >= 100 && self.chart_height >= 100,
            "chart must be at least 100x100 pixels"
        );
        anyhow::ensure!(self.max_sessions >= 1, "max_sessions must be at least 1");
        anyhow::ensure!(
            !self.provider_base_url.trim().is_empty(),
            "provider_base_url must not be empty"
        );
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = DashboardConfig::default();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8501");
        assert_eq!(cfg.default_ticker, "AAPL");
        assert_eq!((cfg.window_min, cfg.window_max, cfg.window_default), (5, 200, 50));
        assert_eq!(cfg.rsi_period, 14);
        assert_eq!((cfg.macd_fast, cfg.macd_slow, cfg.macd_signal), (12, 26, 9));
        assert_eq!((cfg.chart_width, cfg.chart_height), (1000, 500));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: DashboardConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.window_default, 50);
        assert_eq!(cfg.max_sessions, 1000);
        assert!(cfg.provider_base_url.starts_with("https://"));
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "default_ticker": "MSFT", "window_max": 100 }"#;
        let cfg: DashboardConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.default_ticker, "MSFT");
        assert_eq!(cfg.window_max, 100);
        assert_eq!(cfg.window_min, 5);
        assert_eq!(cfg.rsi_period, 14);
    }

    #[test]
    fn validate_rejects_inverted_window_bounds() {
        let cfg = DashboardConfig {
            window_min: 100,
            window_max: 10,
            ..DashboardConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_default_outside_bounds() {
        let cfg = DashboardConfig {
            window_default: 250,
            ..DashboardConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_macd_spans() {
        let cfg = DashboardConfig {
            macd_fast: 26,
            macd_slow: 12,
            ..DashboardConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn save_then_load_preserves_fields() {
        let dir = std::env::temp_dir().join(format!("finddy-cfg-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("finddy_config.json");

        let cfg = DashboardConfig {
            default_ticker: "NVDA".into(),
            window_default: 20,
            ..DashboardConfig::default()
        };
        cfg.save(&path).unwrap();
        let loaded = DashboardConfig::load(&path).unwrap();
        assert_eq!(loaded.default_ticker, "NVDA");
        assert_eq!(loaded.window_default, 20);
        assert!(!path.with_extension("json.tmp").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn load_missing_file_is_error() {
        assert!(DashboardConfig::load("/definitely/not/here/finddy.json").is_err());
    }
}
