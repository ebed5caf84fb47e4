/// Calculate RSI from simple (non-exponential) averages of gains and losses
///
/// The value at index `i` uses the `period` close-to-close changes ending at
/// `i`, so the first value is at index `period`.
///
/// # Arguments
/// * `prices` - Slice of closing prices
/// * `period` - RSI period (14 and 7 are used by the strategies)
///
/// # Returns
/// Vector the same length as `prices`, `None` during warmup
pub fn calculate_rsi(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = prices.len();
    let mut rsi = vec![None; n];

    if period == 0 || n < period + 1 {
        return rsi;
    }

    let gains: Vec<f64> = prices.windows(2).map(|w| (w[1] - w[0]).max(0.0)).collect();
    let losses: Vec<f64> = prices.windows(2).map(|w| (w[0] - w[1]).max(0.0)).collect();

    // Window sums are recomputed per bar; a running sum drifts and can leave
    // a tiny residual loss where the true value is exactly zero.
    for i in period..n {
        let window = (i - period)..i;
        let avg_gain = gains[window.clone()].iter().sum::<f64>() / period as f64;
        let avg_loss = losses[window].iter().sum::<f64>() / period as f64;
        rsi[i] = Some(rsi_from_averages(avg_gain, avg_loss));
    }

    rsi
}

/// RSI from average gain and loss; 100 when there were no losses
pub fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_rsi_warmup() {
        let prices = vec![44.0, 44.25, 44.5, 43.75, 44.5, 44.25, 44.0, 43.5, 44.25, 44.5];
        let rsi = calculate_rsi(&prices, 2);

        assert_eq!(rsi.len(), prices.len());
        assert!(rsi[0].is_none());
        assert!(rsi[1].is_none());
        assert!(rsi[2].is_some());
    }

    #[test]
    fn test_rsi_simple_average() {
        // changes: +1, -1, +2 -> gains 3 over 3 bars, losses 1
        let prices = vec![10.0, 11.0, 10.0, 12.0];
        let rsi = calculate_rsi(&prices, 3);

        // RS = 1.0 / (1/3) = 3 -> RSI = 75
        assert_relative_eq!(rsi[3].unwrap(), 75.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rsi_all_gains() {
        let prices = vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0];
        let rsi = calculate_rsi(&prices, 2);

        assert_eq!(rsi[rsi.len() - 1], Some(100.0));
    }

    #[test]
    fn test_rsi_flat_is_100() {
        let prices = vec![5.0; 10];
        let rsi = calculate_rsi(&prices, 3);

        assert_eq!(rsi[9], Some(100.0));
    }

    #[test]
    fn test_rsi_all_losses() {
        let prices = vec![15.0, 14.0, 13.0, 12.0, 11.0, 10.0];
        let rsi = calculate_rsi(&prices, 2);

        assert_eq!(rsi[rsi.len() - 1], Some(0.0));
    }

    #[test]
    fn test_rsi_too_short() {
        let rsi = calculate_rsi(&[1.0, 2.0], 14);
        assert!(rsi.iter().all(Option::is_none));
    }

    proptest! {
        #[test]
        fn prop_rsi_bounded(
            prices in prop::collection::vec(0.01f64..10_000.0, 2..200),
            period in 1usize..30,
        ) {
            for value in calculate_rsi(&prices, period).into_iter().flatten() {
                prop_assert!((0.0..=100.0).contains(&value));
            }
        }
    }
}
