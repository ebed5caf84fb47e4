use common::{BacktestParameters, EnrichedBar, SignalType, StrategyKind};
use tracing::debug;

use super::strategy::{rule_for, Score, ScoringRule};

/// Bars before this index never carry a signal
pub const SIGNAL_WARMUP: usize = 50;

const NO_SETUP: &str = "None";
const FILTERED_SETUP: &str = "Filtered";

/// Scores enriched bars with one strategy, then applies the sentiment filter
pub struct SignalGenerator {
    strategy: StrategyKind,
    rule: &'static dyn ScoringRule,
    sentiment: f64,
}

impl SignalGenerator {
    pub fn new(strategy: StrategyKind, sentiment: f64) -> Self {
        Self {
            strategy,
            rule: rule_for(strategy),
            sentiment,
        }
    }

    pub fn from_params(params: &BacktestParameters) -> Self {
        Self::new(params.strategy, params.fundamental_sentiment)
    }

    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    /// Return a copy of `bars` with `signal`, `signalStrength` and
    /// `setupType` filled in. Any incoming signal fields are overwritten.
    pub fn generate(&self, bars: &[EnrichedBar]) -> Vec<EnrichedBar> {
        let mut out = Vec::with_capacity(bars.len());
        let mut active = 0usize;

        for (i, bar) in bars.iter().enumerate() {
            let mut scored = bar.clone();
            let (signal, strength, setup_type) = if i < SIGNAL_WARMUP || !has_required_fields(bar)
            {
                (SignalType::StayOut, 0, NO_SETUP.to_string())
            } else {
                match self.rule.score(bar, &bars[i - 1]) {
                    Some(score) => apply_sentiment(score, self.sentiment),
                    None => (SignalType::StayOut, 0, NO_SETUP.to_string()),
                }
            };

            if signal != SignalType::StayOut {
                active += 1;
            }
            scored.signal = signal;
            scored.signal_strength = strength;
            scored.setup_type = setup_type;
            out.push(scored);
        }

        debug!(strategy = %self.strategy, bars = bars.len(), signals = active, "signals generated");
        out
    }
}

/// Fields every strategy needs before it may score a bar
fn has_required_fields(bar: &EnrichedBar) -> bool {
    bar.rsi14.is_some()
        && bar.rsi7.is_some()
        && bar.ema5.is_some()
        && bar.ema10.is_some()
        && bar.ema20.is_some()
}

/// Adjust a raw score by the fundamental sentiment bias.
///
/// Agreeing sentiment (beyond ±0.2) adds a point, opposing sentiment (beyond
/// ∓0.3) removes one. A signal left with no strength becomes `STAY_OUT`
/// with setup `"Filtered"`.
pub fn apply_sentiment(score: Score, sentiment: f64) -> (SignalType, u32, String) {
    let signal = SignalType::from(score.side);
    let mut strength = score.strength;

    match signal {
        SignalType::Long if sentiment > 0.2 => strength += 1,
        SignalType::Short if sentiment < -0.2 => strength += 1,
        SignalType::Long if sentiment < -0.3 => strength -= 1,
        SignalType::Short if sentiment > 0.3 => strength -= 1,
        _ => {}
    }

    if strength <= 0 {
        return (SignalType::StayOut, 0, FILTERED_SETUP.to_string());
    }

    // strength is positive here
    (signal, strength as u32, score.setup_type.to_string())
}
