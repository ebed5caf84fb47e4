/// Calculate Exponential Moving Average
///
/// Seeded with the first price, then
/// `ema[i] = price[i] * k + ema[i - 1] * (1 - k)` with `k = 2 / (period + 1)`.
///
/// # Arguments
/// * `prices` - Slice of prices
/// * `period` - EMA period
///
/// # Returns
/// Vector of EMA values
pub fn calculate_ema(prices: &[f64], period: usize) -> Vec<f64> {
    let n = prices.len();
    if n == 0 || period == 0 {
        return vec![];
    }

    let mut ema = vec![0.0; n];
    let multiplier = ema_multiplier(period);

    ema[0] = prices[0];

    for i in 1..n {
        ema[i] = prices[i] * multiplier + ema[i - 1] * (1.0 - multiplier);
    }

    ema
}

pub fn ema_multiplier(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ema_basic() {
        let prices = vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0];
        let ema = calculate_ema(&prices, 3);

        assert_eq!(ema.len(), prices.len());
        assert_eq!(ema[0], 10.0);
        // k = 0.5 -> 11 * 0.5 + 10 * 0.5
        assert_eq!(ema[1], 10.5);
        for i in 1..prices.len() {
            assert!(ema[i] > ema[i - 1]);
        }
    }

    #[test]
    fn test_ema_empty() {
        let prices: Vec<f64> = vec![];
        let ema = calculate_ema(&prices, 3);
        assert!(ema.is_empty());
    }

    proptest! {
        #[test]
        fn prop_ema_recurrence_holds(
            prices in prop::collection::vec(0.01f64..1_000.0, 1..150),
            period in 1usize..60,
        ) {
            let ema = calculate_ema(&prices, period);
            let k = 2.0 / (period as f64 + 1.0);

            prop_assert_eq!(ema[0], prices[0]);
            for i in 1..prices.len() {
                prop_assert_eq!(ema[i], prices[i] * k + ema[i - 1] * (1.0 - k));
            }
        }
    }
}
