pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;

pub use atr::approximate_atr;
pub use bollinger::{bandwidth, calculate_bollinger_bands, BollingerBands};
pub use ema::calculate_ema;
pub use macd::{calculate_macd, Macd};
pub use rsi::calculate_rsi;

use common::{Bar, EnrichedBar};
use tracing::warn;

/// Shorter series are returned without indicators
pub const MIN_BARS: usize = 100;

const RSI_DECIMALS: i32 = 2;
const PRICE_DECIMALS: i32 = 5;
const WIDTH_DECIMALS: i32 = 4;

const EMA_PERIODS: [usize; 4] = [5, 10, 20, 50];
const MACD_STANDARD: (usize, usize, usize) = (12, 26, 9);
const MACD_FAST: (usize, usize, usize) = (5, 12, 3);
const BB_PERIOD: usize = 20;
const BB_STD_DEV: f64 = 2.0;

/// Round for display; computation always runs at full precision first
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Pre-computed indicators for all bars, at full precision
#[derive(Debug)]
pub struct IndicatorSeries {
    pub rsi14: Vec<Option<f64>>,
    pub rsi7: Vec<Option<f64>>,
    /// EMA(5), EMA(10), EMA(20), EMA(50)
    pub ema: [Vec<f64>; 4],
    pub macd: Macd,
    pub fast_macd: Macd,
    pub bb: BollingerBands,
}

impl IndicatorSeries {
    /// Calculate all indicators from closing prices
    pub fn calculate(closes: &[f64]) -> Self {
        Self {
            rsi14: calculate_rsi(closes, 14),
            rsi7: calculate_rsi(closes, 7),
            ema: EMA_PERIODS.map(|p| calculate_ema(closes, p)),
            macd: calculate_macd(closes, MACD_STANDARD.0, MACD_STANDARD.1, MACD_STANDARD.2),
            fast_macd: calculate_macd(closes, MACD_FAST.0, MACD_FAST.1, MACD_FAST.2),
            bb: calculate_bollinger_bands(closes, BB_PERIOD, BB_STD_DEV),
        }
    }

    /// Build the enriched record for bar `idx`, attaching each indicator only
    /// once its own warmup has passed
    pub fn enrich(&self, idx: usize, bar: &Bar) -> EnrichedBar {
        let mut out = EnrichedBar::from(bar.clone());

        out.rsi14 = self.rsi14[idx].map(|v| round_to(v, RSI_DECIMALS));
        out.rsi7 = self.rsi7[idx].map(|v| round_to(v, RSI_DECIMALS));

        let ema_at = |slot: usize| {
            (idx + 1 >= EMA_PERIODS[slot]).then(|| round_to(self.ema[slot][idx], PRICE_DECIMALS))
        };
        out.ema5 = ema_at(0);
        out.ema10 = ema_at(1);
        out.ema20 = ema_at(2);
        out.ema50 = ema_at(3);

        // the signal line needs `signal` MACD values on top of the slow warmup
        if idx + 1 >= MACD_STANDARD.1 {
            out.macd = Some(round_to(self.macd.macd[idx], PRICE_DECIMALS));
        }
        if idx + 2 >= MACD_STANDARD.1 + MACD_STANDARD.2 {
            out.macd_signal = Some(round_to(self.macd.signal[idx], PRICE_DECIMALS));
            out.macd_histogram = Some(round_to(self.macd.histogram[idx], PRICE_DECIMALS));
        }

        if idx + 1 >= MACD_FAST.1 {
            out.fast_macd = Some(round_to(self.fast_macd.macd[idx], PRICE_DECIMALS));
        }
        if idx + 2 >= MACD_FAST.1 + MACD_FAST.2 {
            out.fast_macd_signal = Some(round_to(self.fast_macd.signal[idx], PRICE_DECIMALS));
        }

        if let (Some(upper), Some(middle), Some(lower)) =
            (self.bb.upper[idx], self.bb.middle[idx], self.bb.lower[idx])
        {
            out.bb_upper = Some(round_to(upper, PRICE_DECIMALS));
            out.bb_middle = Some(round_to(middle, PRICE_DECIMALS));
            out.bb_lower = Some(round_to(lower, PRICE_DECIMALS));
            out.bb_width = Some(round_to(bandwidth(upper, middle, lower), WIDTH_DECIMALS));
        }

        out
    }
}

/// Attaches the indicator set used by every strategy
pub struct IndicatorEngine;

impl IndicatorEngine {
    /// Enrich a time-ordered bar sequence.
    ///
    /// With fewer than [`MIN_BARS`] bars nothing is computed and the bars
    /// come back bare; callers must check before trusting the output.
    pub fn enrich(bars: &[Bar]) -> Vec<EnrichedBar> {
        if bars.len() < MIN_BARS {
            warn!(
                bars = bars.len(),
                required = MIN_BARS,
                "not enough history, indicators skipped"
            );
            return bars.iter().cloned().map(EnrichedBar::from).collect();
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let series = IndicatorSeries::calculate(&closes);

        bars.iter()
            .enumerate()
            .map(|(i, bar)| series.enrich(i, bar))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn wave_bars(n: usize) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let price = 100.0 + (i as f64 * 0.2).sin() * 3.0 + i as f64 * 0.01;
                Bar::new(
                    start + Duration::hours(i as i64),
                    price - 0.1,
                    price + 0.4,
                    price - 0.4,
                    price,
                    1000.0 + i as f64,
                )
            })
            .collect()
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(12.345678, 2), 12.35);
        assert_eq!(round_to(1.234567891, 5), 1.23457);
        assert_eq!(round_to(0.01994, 4), 0.0199);
    }

    #[test]
    fn test_short_series_untouched() {
        let bars = wave_bars(99);
        let enriched = IndicatorEngine::enrich(&bars);

        assert_eq!(enriched.len(), 99);
        assert!(enriched.iter().all(|b| !b.has_indicators()));
        assert_eq!(enriched[50].bar, bars[50]);
    }

    #[test]
    fn test_warmup_offsets() {
        let enriched = IndicatorEngine::enrich(&wave_bars(120));

        assert!(enriched[3].ema5.is_none());
        assert!(enriched[4].ema5.is_some());
        assert!(enriched[8].ema10.is_none());
        assert!(enriched[9].ema10.is_some());
        assert!(enriched[18].ema20.is_none());
        assert!(enriched[19].ema20.is_some());
        assert!(enriched[48].ema50.is_none());
        assert!(enriched[49].ema50.is_some());
        assert!(enriched[6].rsi7.is_none());
        assert!(enriched[7].rsi7.is_some());
        assert!(enriched[13].rsi14.is_none());
        assert!(enriched[14].rsi14.is_some());
        assert!(enriched[10].fast_macd.is_none());
        assert!(enriched[11].fast_macd.is_some());
        assert!(enriched[24].macd.is_none());
        assert!(enriched[25].macd.is_some());
        assert!(enriched[12].fast_macd_signal.is_none());
        assert!(enriched[13].fast_macd_signal.is_some());
        assert!(enriched[32].macd_signal.is_none());
        assert!(enriched[32].macd_histogram.is_none());
        assert!(enriched[33].macd_signal.is_some());
        assert!(enriched[33].macd_histogram.is_some());
        assert!(enriched[18].bb_width.is_none());
        assert!(enriched[19].bb_width.is_some());
    }

    #[test]
    fn test_values_consistent() {
        let enriched = IndicatorEngine::enrich(&wave_bars(150));

        for bar in &enriched {
            if let Some(rsi) = bar.rsi14 {
                assert!((0.0..=100.0).contains(&rsi));
            }
            if let (Some(m), Some(s), Some(h)) = (bar.macd, bar.macd_signal, bar.macd_histogram) {
                // each term is rounded on its own
                assert!((h - (m - s)).abs() <= 2e-5);
            }
            if let (Some(u), Some(mid), Some(l), Some(w)) =
                (bar.bb_upper, bar.bb_middle, bar.bb_lower, bar.bb_width)
            {
                assert!(u >= mid && mid >= l);
                assert!((w - (u - l) / mid).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_input_not_modified() {
        let bars = wave_bars(120);
        let snapshot = bars.clone();
        let _ = IndicatorEngine::enrich(&bars);
        assert_eq!(bars, snapshot);
    }
}
