use common::{BacktestParameters, EnrichedBar, ExitReason, PositionSide, Trade};
use tracing::debug;

use crate::indicators::approximate_atr;
use crate::portfolio::{EntryPlan, Portfolio};

/// Ledger and capital left after a simulation
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    pub trades: Vec<Trade>,
    pub final_capital: f64,
}

/// Sequential single-position simulation over signaled bars.
///
/// Flat, a LONG/SHORT signal on bar `i` opens a position at bar `i + 1`'s
/// open. Open, each later bar is checked for stop then target. Signals seen
/// while a position is open are ignored.
pub struct BacktestSimulator {
    initial_capital: f64,
    risk_per_trade: f64,
    max_trades_per_day: u32,
    atr_multiplier: f64,
    target_multiplier: f64,
}

impl BacktestSimulator {
    pub fn new(params: &BacktestParameters) -> Self {
        Self {
            initial_capital: params.initial_capital,
            risk_per_trade: params.risk_per_trade,
            max_trades_per_day: params.max_trades_per_day,
            atr_multiplier: params.atr_multiplier,
            target_multiplier: params.target_multiplier,
        }
    }

    pub fn run(&self, bars: &[EnrichedBar]) -> SimulationOutcome {
        let mut portfolio = Portfolio::new(self.initial_capital);

        for (i, current) in bars.iter().enumerate() {
            if portfolio.has_position() {
                if let Some((price, reason)) = portfolio.check_exit(&current.bar) {
                    portfolio.close_position(price, current.bar.timestamp, reason);
                }
                continue;
            }

            let Some(side) = current.signal.side() else {
                continue;
            };
            // Entry needs the following bar's open
            let Some(next) = bars.get(i + 1) else {
                continue;
            };

            let day = current.bar.timestamp.date_naive();
            if portfolio.trades_on(day) >= self.max_trades_per_day {
                debug!(%day, "daily trade cap reached, signal ignored");
                continue;
            }

            let plan = self.plan_entry(side, current, next, portfolio.capital());
            portfolio.open_position(plan);
        }

        if let Some(last) = bars.last() {
            if portfolio.has_position() {
                portfolio.close_position(
                    last.bar.close,
                    last.bar.timestamp,
                    ExitReason::EndOfPeriod,
                );
            }
        }

        let (trades, final_capital) = portfolio.into_parts();
        SimulationOutcome {
            trades,
            final_capital,
        }
    }

    /// Price the entry from the signal bar's range and the next bar's open
    fn plan_entry(
        &self,
        side: PositionSide,
        signal_bar: &EnrichedBar,
        next: &EnrichedBar,
        capital: f64,
    ) -> EntryPlan {
        let entry_price = next.bar.open;
        let atr = approximate_atr(signal_bar.bar.high, signal_bar.bar.low);
        let stop_distance = atr * self.atr_multiplier;
        let target_distance = atr * self.target_multiplier;

        let (stop_loss, take_profit) = match side {
            PositionSide::Long => (entry_price - stop_distance, entry_price + target_distance),
            PositionSide::Short => (entry_price + stop_distance, entry_price - target_distance),
        };

        EntryPlan {
            side,
            trade_day: signal_bar.bar.timestamp.date_naive(),
            entry_date: next.bar.timestamp,
            entry_price,
            stop_loss,
            take_profit,
            risk_amount: capital * self.risk_per_trade,
            signal_strength: signal_bar.signal_strength,
            setup_type: signal_bar.setup_type.clone(),
        }
    }
}
