// =============================================================================
// Relative Strength Index (RSI) — Wilder's Smoothing
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an asset is overbought or oversold.
//
// Step 1 — Compute price changes (deltas) from consecutive closes.
// Step 2 — Split each delta into a gain (max(d, 0)) and a loss (max(-d, 0)).
// Step 3 — Smooth both with the exponential recurrence, alpha = 1 / period,
//          seeded with the first gain / loss:
//            avg = avg_prev * (1 - 1/period) + current / period
// Step 4 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// Thresholds:  RSI >= 70 => OVERBOUGHT,  RSI <= 30 => OVERSOLD.
// =============================================================================

use super::ema::ewm_alpha;

/// Conventional look-back period.
pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Compute the full RSI series for the given `closes` and `period`.
///
/// The returned vector has one RSI value per delta, i.e. one for each close
/// starting at index 1.
///
/// # Edge cases
/// - `period == 0` => empty vec
/// - fewer than two closes => empty vec
/// - average loss zero with gains => 100.0
/// - no movement at all => 50.0
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < 2 {
        return Vec::new();
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let gains: Vec<f64> = deltas.iter().map(|d| d.max(0.0)).collect();
    let losses: Vec<f64> = deltas.iter().map(|d| (-d).max(0.0)).collect();

    let alpha = 1.0 / period as f64;
    let avg_gains = ewm_alpha(&gains, alpha);
    let avg_losses = ewm_alpha(&losses, alpha);

    let mut result = Vec::with_capacity(deltas.len());
    for (&g, &l) in avg_gains.iter().zip(avg_losses.iter()) {
        match rsi_from_averages(g, l) {
            Some(rsi) => result.push(rsi),
            None => break,
        }
    }

    result
}

/// Return the most recent RSI value together with a human-readable label.
pub fn current_rsi(closes: &[f64], period: usize) -> Option<(f64, &'static str)> {
    let series = calculate_rsi(closes, period);
    let value = *series.last()?;
    Some((value, rsi_label(value)))
}

/// Classify an RSI reading.
pub fn rsi_label(value: f64) -> &'static str {
    if value >= 70.0 {
        "OVERBOUGHT"
    } else if value <= 30.0 {
        "OVERSOLD"
    } else {
        "NEUTRAL"
    }
}

/// Convert average gain / average loss into an RSI value in [0, 100].
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    let rsi = if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    rsi.is_finite().then_some(rsi)
}
