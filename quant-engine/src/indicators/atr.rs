/// Share of the bar range used as a stand-in for Average True Range
pub const RANGE_ATR_FACTOR: f64 = 0.7;

/// Approximate ATR from a single bar: `(high - low) * 0.7`
///
/// Stop and target distances are multiples of this value. It is cheaper
/// than a smoothed true range and needs no history.
pub fn approximate_atr(high: f64, low: f64) -> f64 {
    (high - low) * RANGE_ATR_FACTOR
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_approximate_atr() {
        assert_relative_eq!(approximate_atr(50.0, 48.0), 1.4, epsilon = 1e-12);
    }

    #[test]
    fn test_approximate_atr_zero_range() {
        assert_eq!(approximate_atr(10.0, 10.0), 0.0);
    }
}
