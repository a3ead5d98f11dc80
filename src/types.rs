// =============================================================================
// Shared types used across the Finddy dashboard
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Longest ticker accepted from user input.
const MAX_TICKER_LEN: usize = 16;

/// A normalised ticker symbol: trimmed, upper-cased, non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    /// Normalise raw user input.
    ///
    /// Blank input yields `Ok(None)`: nothing is analysed until a symbol is
    /// entered. Accepted characters are ASCII letters, digits and `. - ^ =`,
    /// with at least one letter or digit. This covers share classes
    /// (`BRK-B`), indices (`^GSPC`) and FX pairs (`EURUSD=X`).
    pub fn parse(raw: &str) -> Result<Option<Self>, AnalysisError> {
        let symbol = raw.trim().to_uppercase();
        if symbol.is_empty() {
            return Ok(None);
        }

        let valid_chars = symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));

        let has_alphanumeric = symbol.chars().any(|c| c.is_ascii_alphanumeric());

        if !valid_chars || !has_alphanumeric || symbol.len() > MAX_TICKER_LEN {
            return Err(AnalysisError::InvalidTicker(raw.trim().to_string()));
        }

        Ok(Some(Self(symbol)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The six analysis modes offered in the sidebar, in menu order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    Price,
    Sma,
    Ema,
    Rsi,
    Macd,
    Chart,
}

impl Default for AnalysisKind {
    fn default() -> Self {
        Self::Price
    }
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 6] = [
        Self::Price,
        Self::Sma,
        Self::Ema,
        Self::Rsi,
        Self::Macd,
        Self::Chart,
    ];

    /// Menu label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Price => "Get Stock Price",
            Self::Sma => "Simple Moving Average (SMA)",
            Self::Ema => "Exponential Moving Average (EMA)",
            Self::Rsi => "Relative Strength Index (RSI)",
            Self::Macd => "Moving Average Convergence Divergence (MACD)",
            Self::Chart => "Plot Stock Price",
        }
    }

    /// Short identifier used in query strings.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Sma => "sma",
            Self::Ema => "ema",
            Self::Rsi => "rsi",
            Self::Macd => "macd",
            Self::Chart => "chart",
        }
    }

    pub fn from_slug(slug: &str) -> Result<Self, AnalysisError> {
        let wanted = slug.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.slug() == wanted)
            .ok_or_else(|| AnalysisError::UnknownAnalysis(slug.to_string()))
    }

    /// Whether the moving-average window slider applies.
    pub fn uses_window(self) -> bool {
        matches!(self, Self::Sma | Self::Ema)
    }
}

impl std::fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_is_trimmed_and_uppercased() {
        let t = Ticker::parse("  aapl ").unwrap().unwrap();
        assert_eq!(t.as_str(), "AAPL");
        assert_eq!(t.to_string(), "AAPL");
    }

    #[test]
    fn blank_ticker_is_none() {
        assert!(Ticker::parse("").unwrap().is_none());
        assert!(Ticker::parse("   ").unwrap().is_none());
    }

    #[test]
    fn ticker_accepts_exchange_notation() {
        for raw in ["brk-b", "^gspc", "eurusd=x", "shop.to"] {
            assert!(Ticker::parse(raw).unwrap().is_some(), "{raw} rejected");
        }
    }

    #[test]
    fn ticker_rejects_bad_characters() {
        for raw in ["AAPL/../x", "<script>", "A B", "AAPL?range=max"] {
            assert!(
                matches!(Ticker::parse(raw), Err(AnalysisError::InvalidTicker(_))),
                "{raw} accepted"
            );
        }
    }

    #[test]
    fn ticker_needs_a_letter_or_digit() {
        for raw in [".", "..", "-", "^=", "..."] {
            assert!(
                matches!(Ticker::parse(raw), Err(AnalysisError::InvalidTicker(_))),
                "{raw} accepted"
            );
        }
        assert!(Ticker::parse("^N225").unwrap().is_some());
    }

    #[test]
    fn ticker_rejects_overlong_input() {
        assert!(Ticker::parse(&"A".repeat(17)).is_err());
        assert!(Ticker::parse(&"A".repeat(16)).is_ok());
    }

    #[test]
    fn slugs_resolve_back_to_kinds() {
        for kind in AnalysisKind::ALL {
            assert_eq!(AnalysisKind::from_slug(kind.slug()).unwrap(), kind);
        }
        assert_eq!(AnalysisKind::from_slug(" RSI ").unwrap(), AnalysisKind::Rsi);
    }

    #[test]
    fn unknown_slug_is_rejected() {
        assert!(matches!(
            AnalysisKind::from_slug("bollinger"),
            Err(AnalysisError::UnknownAnalysis(_))
        ));
    }

    #[test]
    fn only_moving_averages_use_window() {
        let with_window: Vec<_> = AnalysisKind::ALL.into_iter().filter(|k| k.uses_window()).collect();
        assert_eq!(with_window, vec![AnalysisKind::Sma, AnalysisKind::Ema]);
    }

    #[test]
    fn display_is_menu_label() {
        assert_eq!(
            AnalysisKind::Macd.to_string(),
            "Moving Average Convergence Divergence (MACD)"
        );
    }

    #[test]
    fn serde_uses_slug() {
        assert_eq!(serde_json::to_string(&AnalysisKind::Sma).unwrap(), "\"sma\"");
        let k: AnalysisKind = serde_json::from_str("\"chart\"").unwrap();
        assert_eq!(k, AnalysisKind::Chart);
    }
}
