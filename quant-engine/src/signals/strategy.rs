//! Strategy scoring rules
//!
//! Each rule looks at the current enriched bar and the one before it and
//! either proposes a direction with a strength and setup label, or stays
//! silent. Rules only read indicator fields; a missing field never scores.

use common::{EnrichedBar, PositionSide, StrategyKind};

/// Raw strategy verdict before the sentiment filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub side: PositionSide,
    pub strength: i32,
    pub setup_type: &'static str,
}

impl Score {
    fn long(strength: i32, setup_type: &'static str) -> Self {
        Self {
            side: PositionSide::Long,
            strength,
            setup_type,
        }
    }

    fn short(strength: i32, setup_type: &'static str) -> Self {
        Self {
            side: PositionSide::Short,
            strength,
            setup_type,
        }
    }
}

/// Scores a pair of consecutive bars
pub trait ScoringRule: Send + Sync {
    fn score(&self, current: &EnrichedBar, previous: &EnrichedBar) -> Option<Score>;
}

/// Rule implementing the given strategy
pub fn rule_for(kind: StrategyKind) -> &'static dyn ScoringRule {
    match kind {
        StrategyKind::Scalping => &Scalping,
        StrategyKind::Momentum => &Momentum,
        StrategyKind::MeanReversion => &MeanReversion,
        StrategyKind::Breakout => &Breakout,
    }
}

/// Shorter averages above longer ones: present and strictly decreasing
fn bullish_stack(values: &[Option<f64>]) -> bool {
    values.iter().all(Option::is_some)
        && values.windows(2).all(|w| w[0] > w[1])
}

/// Shorter averages below longer ones: present and strictly increasing
fn bearish_stack(values: &[Option<f64>]) -> bool {
    values.iter().all(Option::is_some)
        && values.windows(2).all(|w| w[0] < w[1])
}

/// Volume expanded by more than `factor` over the previous bar
fn volume_spike(current: &EnrichedBar, previous: &EnrichedBar, factor: f64) -> bool {
    current.bar.volume > previous.bar.volume * factor
}

/// Fast MACD crossover, oversold/overbought RSI(7) and a short EMA stack
pub struct Scalping;

impl ScoringRule for Scalping {
    fn score(&self, current: &EnrichedBar, previous: &EnrichedBar) -> Option<Score> {
        let mut long_score = 0;
        let mut short_score = 0;

        if let (Some(macd), Some(signal), Some(prev_macd), Some(prev_signal)) = (
            current.fast_macd,
            current.fast_macd_signal,
            previous.fast_macd,
            previous.fast_macd_signal,
        ) {
            if macd > signal && prev_macd <= prev_signal {
                long_score += 2;
            }
            if macd < signal && prev_macd >= prev_signal {
                short_score += 2;
            }
        }

        if let Some(rsi7) = current.rsi7 {
            if rsi7 < 35.0 {
                long_score += 1;
            }
            if rsi7 > 65.0 {
                short_score += 1;
            }
        }

        let emas = [current.ema5, current.ema10, current.ema20];
        if bullish_stack(&emas) {
            long_score += 1;
        }
        if bearish_stack(&emas) {
            short_score += 1;
        }

        if long_score >= 3 {
            Some(Score::long(long_score.min(5), "Scalp_Long"))
        } else if short_score >= 3 {
            Some(Score::short(short_score.min(5), "Scalp_Short"))
        } else {
            None
        }
    }
}

/// Aligned RSI strength and a full EMA stack, confirmed by MACD
pub struct Momentum;

impl ScoringRule for Momentum {
    fn score(&self, current: &EnrichedBar, _previous: &EnrichedBar) -> Option<Score> {
        let emas = [current.ema5, current.ema10, current.ema20, current.ema50];
        let mut long_score = 0;
        let mut short_score = 0;

        if let (Some(rsi14), Some(rsi7)) = (current.rsi14, current.rsi7) {
            if rsi14 > 60.0 && rsi7 > 65.0 && bullish_stack(&emas) {
                long_score += 3;
            }
            if rsi14 < 40.0 && rsi7 < 35.0 && bearish_stack(&emas) {
                short_score += 3;
            }
        }

        if let (Some(macd), Some(signal)) = (current.macd, current.macd_signal) {
            if macd > signal && macd > 0.0 {
                long_score += 1;
            }
            if macd < signal && macd < 0.0 {
                short_score += 1;
            }
        }

        if long_score >= 3 {
            Some(Score::long(long_score, "Momentum_Long"))
        } else if short_score >= 3 {
            Some(Score::short(short_score, "Momentum_Short"))
        } else {
            None
        }
    }
}

/// Band touch with extreme RSI(14) on rising volume
pub struct MeanReversion;

impl ScoringRule for MeanReversion {
    fn score(&self, current: &EnrichedBar, previous: &EnrichedBar) -> Option<Score> {
        let (lower, upper, rsi14) = (current.bb_lower?, current.bb_upper?, current.rsi14?);
        if !volume_spike(current, previous, 1.1) {
            return None;
        }

        let close = current.bar.close;
        if close <= lower && rsi14 < 30.0 {
            Some(Score::long(4, "MeanRev_Long"))
        } else if close >= upper && rsi14 > 70.0 {
            Some(Score::short(4, "MeanRev_Short"))
        } else {
            None
        }
    }
}

/// Close outside a tight band on a volume surge
pub struct Breakout;

/// Band width below which the bands count as a squeeze
pub const SQUEEZE_WIDTH: f64 = 0.02;

impl ScoringRule for Breakout {
    fn score(&self, current: &EnrichedBar, previous: &EnrichedBar) -> Option<Score> {
        let (width, lower, upper, rsi14) = (
            current.bb_width?,
            current.bb_lower?,
            current.bb_upper?,
            current.rsi14?,
        );
        if width >= SQUEEZE_WIDTH || !volume_spike(current, previous, 1.5) {
            return None;
        }

        let close = current.bar.close;
        if close > upper && rsi14 > 50.0 {
            Some(Score::long(4, "Breakout_Long"))
        } else if close < lower && rsi14 < 50.0 {
            Some(Score::short(4, "Breakout_Short"))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::Bar;

    fn bar(close: f64, volume: f64) -> EnrichedBar {
        let ts = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();
        EnrichedBar::from(Bar::new(ts, close, close + 0.5, close - 0.5, close, volume))
    }

    fn with_emas(mut b: EnrichedBar, emas: [f64; 4]) -> EnrichedBar {
        b.ema5 = Some(emas[0]);
        b.ema10 = Some(emas[1]);
        b.ema20 = Some(emas[2]);
        b.ema50 = Some(emas[3]);
        b
    }

    #[test]
    fn test_scalping_long_cross() {
        let mut prev = bar(100.0, 1000.0);
        prev.fast_macd = Some(-0.02);
        prev.fast_macd_signal = Some(0.0);

        let mut cur = with_emas(bar(100.5, 1000.0), [101.0, 100.5, 100.0, 99.0]);
        cur.fast_macd = Some(0.03);
        cur.fast_macd_signal = Some(0.01);
        cur.rsi7 = Some(30.0);

        assert_eq!(Scalping.score(&cur, &prev), Some(Score::long(4, "Scalp_Long")));
    }

    #[test]
    fn test_scalping_needs_three_points() {
        let prev = bar(100.0, 1000.0);
        let mut cur = with_emas(bar(100.5, 1000.0), [101.0, 100.5, 100.0, 99.0]);
        cur.rsi7 = Some(30.0);

        // RSI + EMA stack is only 2 points without the crossover
        assert_eq!(Scalping.score(&cur, &prev), None);
    }

    #[test]
    fn test_scalping_short_cross() {
        let mut prev = bar(100.0, 1000.0);
        prev.fast_macd = Some(0.02);
        prev.fast_macd_signal = Some(0.02);

        let mut cur = with_emas(bar(99.5, 1000.0), [99.0, 99.5, 100.0, 101.0]);
        cur.fast_macd = Some(-0.01);
        cur.fast_macd_signal = Some(0.0);
        cur.rsi7 = Some(70.0);

        assert_eq!(Scalping.score(&cur, &prev), Some(Score::short(4, "Scalp_Short")));
    }

    #[test]
    fn test_momentum_long_with_macd() {
        let prev = bar(100.0, 1000.0);
        let mut cur = with_emas(bar(105.0, 1000.0), [104.0, 103.0, 102.0, 100.0]);
        cur.rsi14 = Some(65.0);
        cur.rsi7 = Some(70.0);
        cur.macd = Some(0.5);
        cur.macd_signal = Some(0.3);

        assert_eq!(Momentum.score(&cur, &prev), Some(Score::long(4, "Momentum_Long")));

        cur.macd = Some(0.2);
        assert_eq!(Momentum.score(&cur, &prev), Some(Score::long(3, "Momentum_Long")));
    }

    #[test]
    fn test_momentum_macd_alone_is_not_enough() {
        let prev = bar(100.0, 1000.0);
        let mut cur = with_emas(bar(105.0, 1000.0), [104.0, 103.0, 102.0, 100.0]);
        cur.rsi14 = Some(55.0);
        cur.rsi7 = Some(70.0);
        cur.macd = Some(0.5);
        cur.macd_signal = Some(0.3);

        assert_eq!(Momentum.score(&cur, &prev), None);
    }

    #[test]
    fn test_momentum_short() {
        let prev = bar(100.0, 1000.0);
        let mut cur = with_emas(bar(95.0, 1000.0), [96.0, 97.0, 98.0, 100.0]);
        cur.rsi14 = Some(30.0);
        cur.rsi7 = Some(20.0);
        cur.macd = Some(-0.5);
        cur.macd_signal = Some(-0.3);

        assert_eq!(Momentum.score(&cur, &prev), Some(Score::short(4, "Momentum_Short")));
    }

    #[test]
    fn test_mean_reversion() {
        let prev = bar(100.0, 1000.0);
        let mut cur = bar(97.0, 1200.0);
        cur.bb_lower = Some(97.5);
        cur.bb_upper = Some(102.5);
        cur.rsi14 = Some(25.0);

        assert_eq!(MeanReversion.score(&cur, &prev), Some(Score::long(4, "MeanRev_Long")));

        // Volume must grow by more than 10%
        cur.bar.volume = 1100.0;
        assert_eq!(MeanReversion.score(&cur, &prev), None);

        let mut top = bar(103.0, 1200.0);
        top.bb_lower = Some(97.5);
        top.bb_upper = Some(102.5);
        top.rsi14 = Some(75.0);
        assert_eq!(MeanReversion.score(&top, &prev), Some(Score::short(4, "MeanRev_Short")));
    }

    #[test]
    fn test_breakout_requires_squeeze() {
        let prev = bar(100.0, 1000.0);
        let mut cur = bar(100.6, 2000.0);
        cur.bb_upper = Some(100.3);
        cur.bb_lower = Some(99.7);
        cur.bb_width = Some(0.006);
        cur.rsi14 = Some(62.0);

        assert_eq!(Breakout.score(&cur, &prev), Some(Score::long(4, "Breakout_Long")));

        cur.bb_width = Some(0.02);
        assert_eq!(Breakout.score(&cur, &prev), None);

        cur.bb_width = Some(0.006);
        cur.bar.volume = 1500.0;
        assert_eq!(Breakout.score(&cur, &prev), None);
    }

    #[test]
    fn test_breakout_short() {
        let prev = bar(100.0, 1000.0);
        let mut cur = bar(99.2, 1600.0);
        cur.bb_upper = Some(100.3);
        cur.bb_lower = Some(99.7);
        cur.bb_width = Some(0.006);
        cur.rsi14 = Some(38.0);

        assert_eq!(Breakout.score(&cur, &prev), Some(Score::short(4, "Breakout_Short")));
    }

    #[test]
    fn test_missing_fields_never_score() {
        let prev = bar(100.0, 1000.0);
        let cur = bar(150.0, 9000.0);

        for kind in StrategyKind::ALL {
            assert_eq!(rule_for(kind).score(&cur, &prev), None);
        }
    }
}
