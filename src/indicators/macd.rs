// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
//   macd      = EMA(close, fast) - EMA(close, slow)
//   signal    = EMA(macd, signal)
//   histogram = macd - signal
//
// Classic parameters are 12 / 26 / 9.
// =============================================================================

use serde::Serialize;

use super::ema::calculate_ema;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

/// One MACD reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Compute the MACD series, one point per close.
///
/// Returns an empty `Vec` when any span is zero or `closes` is empty.
pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<MacdPoint> {
    if fast == 0 || slow == 0 || signal == 0 {
        return Vec::new();
    }

    let fast_ema = calculate_ema(closes, fast);
    let slow_ema = calculate_ema(closes, slow);

    let macd_line: Vec<f64> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = calculate_ema(&macd_line, signal);

    macd_line
        .iter()
        .zip(signal_line.iter())
        .map(|(&macd, &signal)| MacdPoint {
            macd,
            signal,
            histogram: macd - signal,
        })
        .collect()
}

/// Most recent MACD reading.
pub fn latest_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Option<MacdPoint> {
    calculate_macd(closes, fast, slow, signal).last().copied()
}
