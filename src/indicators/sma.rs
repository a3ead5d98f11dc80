// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// Unweighted mean of the trailing `window` closes. Maintained as a running sum
// so the whole series costs O(n).
// =============================================================================

/// Compute the rolling SMA series.
///
/// Each output element corresponds to a close starting at index `window - 1`.
/// Returns an empty `Vec` when `window == 0` or `closes.len() < window`.
pub fn calculate_sma(closes: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || closes.len() < window {
        return Vec::new();
    }

    let w = window as f64;
    let mut sum: f64 = closes[..window].iter().sum();
    let mut result = Vec::with_capacity(closes.len() - window + 1);

    let first = sum / w;
    if !first.is_finite() {
        return Vec::new();
    }
    result.push(first);

    for i in window..closes.len() {
        sum += closes[i] - closes[i - window];
        let mean = sum / w;
        if !mean.is_finite() {
            break;
        }
        result.push(mean);
    }

    result
}

/// Mean of the most recent `window` closes.
///
/// Runs the rolling mean over the tail only, so no floating-point drift
/// accumulates over a long series.
pub fn latest_sma(closes: &[f64], window: usize) -> Option<f64> {
    let tail = closes.get(closes.len().checked_sub(window)?..)?;
    calculate_sma(tail, window).first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_insufficient_data() {
        assert!(calculate_sma(&[1.0, 2.0], 3).is_empty());
        assert!(latest_sma(&[1.0, 2.0], 3).is_none());
    }

    #[test]
    fn sma_window_zero() {
        assert!(calculate_sma(&[1.0], 0).is_empty());
        assert!(latest_sma(&[1.0], 0).is_none());
    }

    #[test]
    fn sma_known_values() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(calculate_sma(&closes, 3), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn sma_constant_series_equals_constant() {
        let closes = vec![17.25; 60];
        for v in calculate_sma(&closes, 50) {
            assert!((v - 17.25).abs() < 1e-9);
        }
        assert!((latest_sma(&closes, 50).unwrap() - 17.25).abs() < 1e-9);
    }

    #[test]
    fn latest_matches_series_tail() {
        let closes: Vec<f64> = (0..300).map(|i| 100.0 + (i as f64 * 0.37).sin()).collect();
        let series = calculate_sma(&closes, 50);
        let latest = latest_sma(&closes, 50).unwrap();
        assert!((series.last().unwrap() - latest).abs() < 1e-9);
    }

    #[test]
    fn window_equal_to_length_yields_single_mean() {
        let closes = [2.0, 4.0, 6.0];
        assert_eq!(calculate_sma(&closes, 3), vec![4.0]);
    }
}
