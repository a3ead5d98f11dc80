// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula (recursive, no bias adjustment):
//   alpha  = 2 / (span + 1)
//   EMA_0  = close_0
//   EMA_t  = close_t * alpha + EMA_{t-1} * (1 - alpha)
//
// The series is seeded with the first close rather than an SMA, so every input
// close has a matching output value.
// =============================================================================

/// Apply the exponential weighting recurrence with smoothing factor `alpha`.
///
/// Returns one value per input element. The output is empty when `values` is
/// empty or `alpha` is outside `(0, 1]`. A non-finite intermediate value
/// truncates the series.
pub fn ewm_alpha(values: &[f64], alpha: f64) -> Vec<f64> {
    if values.is_empty() || !(alpha > 0.0 && alpha <= 1.0) {
        return Vec::new();
    }

    let seed = values[0];
    if !seed.is_finite() {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(values.len());
    result.push(seed);

    let mut prev = seed;
    for &value in &values[1..] {
        let next = value * alpha + prev * (1.0 - alpha);
        if !next.is_finite() {
            break;
        }
        result.push(next);
        prev = next;
    }

    result
}

/// Compute the EMA series for the given `closes` and `span`.
///
/// # Edge cases
/// - `span == 0` => empty vec
/// - empty input => empty vec
pub fn calculate_ema(closes: &[f64], span: usize) -> Vec<f64> {
    if span == 0 {
        return Vec::new();
    }
    ewm_alpha(closes, 2.0 / (span as f64 + 1.0))
}

/// Most recent EMA value, or `None` when no value can be produced.
pub fn latest_ema(closes: &[f64], span: usize) -> Option<f64> {
    calculate_ema(closes, span).last().copied()
}
