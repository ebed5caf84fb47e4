use common::{BacktestParameters, BacktestResult, Bar};
use rayon::prelude::*;
use tracing::info;

use crate::indicators::IndicatorEngine;
use crate::metrics::PerformanceAnalyzer;
use crate::signals::SignalGenerator;
use crate::simulator::BacktestSimulator;

/// Runs the full research pipeline for one configuration
pub struct ResearchEngine {
    params: BacktestParameters,
}

impl ResearchEngine {
    pub fn new(params: BacktestParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &BacktestParameters {
        &self.params
    }

    /// Run backtest on provided bar data.
    ///
    /// Fewer than 100 bars come back without indicators, signals or trades;
    /// check [`BacktestResult::has_indicators`] before trusting the metrics.
    pub fn run(&self, bars: &[Bar]) -> BacktestResult {
        let enriched = IndicatorEngine::enrich(bars);
        let signaled = SignalGenerator::from_params(&self.params).generate(&enriched);
        let outcome = BacktestSimulator::new(&self.params).run(&signaled);

        let metrics = PerformanceAnalyzer::analyze(
            self.params.initial_capital,
            outcome.final_capital,
            &outcome.trades,
        );
        let equity_curve = match bars.first() {
            Some(first) => PerformanceAnalyzer::equity_curve(
                self.params.initial_capital,
                first.timestamp,
                &outcome.trades,
            ),
            None => Vec::new(),
        };
        let drawdown_curve = PerformanceAnalyzer::drawdown_curve(&equity_curve);

        info!(
            symbol = %self.params.symbol,
            strategy = %self.params.strategy,
            bars = bars.len(),
            trades = metrics.total_trades,
            total_return = metrics.total_return,
            "backtest complete"
        );

        BacktestResult {
            symbol: self.params.symbol.clone(),
            strategy: self.params.strategy,
            metrics,
            trades: outcome.trades,
            bars: signaled,
            equity_curve,
            drawdown_curve,
            start_date: bars.first().map(|b| b.timestamp.date_naive()),
            end_date: bars.last().map(|b| b.timestamp.date_naive()),
            initial_capital: self.params.initial_capital,
            final_capital: outcome.final_capital,
        }
    }
}

/// Evaluate several configurations over the same bars in parallel.
/// Results come back in the order of `configs`.
pub fn run_batch(bars: &[Bar], configs: &[BacktestParameters]) -> Vec<BacktestResult> {
    configs
        .par_iter()
        .map(|params| ResearchEngine::new(params.clone()).run(bars))
        .collect()
}
