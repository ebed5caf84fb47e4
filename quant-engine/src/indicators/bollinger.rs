/// Bollinger Bands result
///
/// Entries before `period - 1` are `None`.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// Calculate Bollinger Bands
///
/// # Arguments
/// * `prices` - Slice of closing prices
/// * `period` - Period for moving average (typically 20)
/// * `std_dev` - Number of standard deviations (typically 2.0)
///
/// # Returns
/// BollingerBands struct containing upper, middle (SMA), and lower bands.
/// The deviation is the population standard deviation of the window.
pub fn calculate_bollinger_bands(prices: &[f64], period: usize, std_dev: f64) -> BollingerBands {
    let n = prices.len();
    let mut bb = BollingerBands {
        upper: vec![None; n],
        middle: vec![None; n],
        lower: vec![None; n],
    };

    if n < period || period == 0 {
        return bb;
    }

    for i in (period - 1)..n {
        let start = i + 1 - period;
        let window = &prices[start..=i];

        let mean: f64 = window.iter().sum::<f64>() / period as f64;
        let variance: f64 = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / period as f64;
        let std = variance.sqrt();

        bb.middle[i] = Some(mean);
        bb.upper[i] = Some(mean + std * std_dev);
        bb.lower[i] = Some(mean - std * std_dev);
    }

    bb
}

/// Calculate bandwidth (volatility indicator)
pub fn bandwidth(upper: f64, middle: f64, lower: f64) -> f64 {
    if middle == 0.0 {
        return 0.0;
    }
    (upper - lower) / middle
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bollinger_bands_basic() {
        let prices = vec![
            22.27, 22.19, 22.08, 22.17, 22.18, 22.13, 22.23, 22.43, 22.24, 22.29, 22.15, 22.39,
            22.38, 22.61, 23.36, 24.05, 23.75, 23.83, 23.95, 23.63,
        ];
        let bb = calculate_bollinger_bands(&prices, 20, 2.0);

        assert_eq!(bb.middle.len(), prices.len());
        assert!(bb.middle[18].is_none());

        let middle = bb.middle[19].unwrap();
        assert!(bb.upper[19].unwrap() > middle);
        assert!(bb.lower[19].unwrap() < middle);
    }

    #[test]
    fn test_population_deviation() {
        // mean 5, population variance 4 -> std 2
        let prices = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let bb = calculate_bollinger_bands(&prices, 8, 2.0);

        assert_relative_eq!(bb.middle[7].unwrap(), 5.0, epsilon = 1e-12);
        assert_relative_eq!(bb.upper[7].unwrap(), 9.0, epsilon = 1e-12);
        assert_relative_eq!(bb.lower[7].unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bandwidth() {
        let bw = bandwidth(110.0, 100.0, 90.0);
        assert_eq!(bw, 0.2); // (110-90)/100 = 0.2
    }
}
