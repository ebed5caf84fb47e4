use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use common::{Bar, ExitReason, PositionSide, Trade, TradeExit};
use tracing::debug;

/// Everything needed to open a position
#[derive(Debug, Clone)]
pub struct EntryPlan {
    pub side: PositionSide,
    /// Calendar day of the signal bar, counted against the daily cap
    pub trade_day: NaiveDate,
    pub entry_date: DateTime<Utc>,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub risk_amount: f64,
    pub signal_strength: u32,
    pub setup_type: String,
}

/// Single-position book: realized capital, the open trade and the ledger
#[derive(Debug)]
pub struct Portfolio {
    capital: f64,
    position: Option<Trade>,
    trades: Vec<Trade>,
    daily_trades: BTreeMap<NaiveDate, u32>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            capital: initial_capital,
            position: None,
            trades: Vec::new(),
            daily_trades: BTreeMap::new(),
        }
    }

    /// Capital as of the most recent close
    pub fn capital(&self) -> f64 {
        self.capital
    }

    /// Check if there's an open position
    pub fn has_position(&self) -> bool {
        self.position.is_some()
    }

    /// Closed trades in the order they were opened
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Number of trades opened on signals from `day`
    pub fn trades_on(&self, day: NaiveDate) -> u32 {
        self.daily_trades.get(&day).copied().unwrap_or(0)
    }

    /// Open a position sized so that hitting the stop loses `risk_amount`.
    ///
    /// Returns `None`, leaving the book unchanged, when entry and stop
    /// coincide and no size can be computed.
    pub fn open_position(&mut self, plan: EntryPlan) -> Option<&Trade> {
        if self.position.is_some() {
            return None;
        }

        let quantity = position_size(plan.risk_amount, plan.entry_price, plan.stop_loss);
        if quantity <= 0.0 {
            debug!(
                entry = plan.entry_price,
                stop = plan.stop_loss,
                "zero stop distance, signal skipped"
            );
            return None;
        }

        *self.daily_trades.entry(plan.trade_day).or_insert(0) += 1;
        debug!(
            side = ?plan.side,
            entry = plan.entry_price,
            stop = plan.stop_loss,
            target = plan.take_profit,
            size = quantity,
            "position opened"
        );

        self.position = Some(Trade {
            entry_date: plan.entry_date,
            side: plan.side,
            entry_price: plan.entry_price,
            stop_loss: plan.stop_loss,
            take_profit: plan.take_profit,
            position_size: quantity,
            signal_strength: plan.signal_strength,
            setup_type: plan.setup_type,
            risk_amount: plan.risk_amount,
            exit: None,
        });
        self.position.as_ref()
    }

    /// Stop or target hit within `bar`. The stop is checked first, so a bar
    /// that spans both closes at the stop.
    pub fn check_exit(&self, bar: &Bar) -> Option<(f64, ExitReason)> {
        let pos = self.position.as_ref()?;
        match pos.side {
            PositionSide::Long => {
                if bar.low <= pos.stop_loss {
                    Some((pos.stop_loss, ExitReason::StopLoss))
                } else if bar.high >= pos.take_profit {
                    Some((pos.take_profit, ExitReason::TakeProfit))
                } else {
                    None
                }
            }
            PositionSide::Short => {
                if bar.high >= pos.stop_loss {
                    Some((pos.stop_loss, ExitReason::StopLoss))
                } else if bar.low <= pos.take_profit {
                    Some((pos.take_profit, ExitReason::TakeProfit))
                } else {
                    None
                }
            }
        }
    }

    /// Close current position, realizing its pnl into capital
    pub fn close_position(
        &mut self,
        price: f64,
        timestamp: DateTime<Utc>,
        reason: ExitReason,
    ) -> Option<&Trade> {
        let mut trade = self.position.take()?;
        let pnl = trade.pnl_at(price);
        self.capital += pnl;

        debug!(price, pnl, reason = ?reason, capital = self.capital, "position closed");

        trade.exit = Some(TradeExit {
            exit_date: timestamp,
            exit_price: price,
            pnl,
            exit_reason: reason,
        });
        self.trades.push(trade);
        self.trades.last()
    }

    /// Consume the book, returning the ledger and final capital
    pub fn into_parts(self) -> (Vec<Trade>, f64) {
        (self.trades, self.capital)
    }
}

/// Units such that a move from entry to stop costs `risk_amount`; 0 when the
/// stop sits on the entry
pub fn position_size(risk_amount: f64, entry_price: f64, stop_loss: f64) -> f64 {
    let price_diff = (entry_price - stop_loss).abs();
    if price_diff > 0.0 {
        risk_amount / price_diff
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
    }

    fn plan(side: PositionSide, entry: f64, stop: f64, target: f64) -> EntryPlan {
        EntryPlan {
            side,
            trade_day: at(9).date_naive(),
            entry_date: at(10),
            entry_price: entry,
            stop_loss: stop,
            take_profit: target,
            risk_amount: 200.0,
            signal_strength: 3,
            setup_type: "Scalp_Long".to_string(),
        }
    }

    fn bar(high: f64, low: f64) -> Bar {
        Bar::new(at(11), (high + low) / 2.0, high, low, (high + low) / 2.0, 1000.0)
    }

    #[test]
    fn test_portfolio_new() {
        let portfolio = Portfolio::new(10000.0);
        assert_eq!(portfolio.capital(), 10000.0);
        assert!(!portfolio.has_position());
        assert!(portfolio.trades().is_empty());
    }

    #[test]
    fn test_position_sizing() {
        assert_eq!(position_size(200.0, 100.0, 98.0), 100.0);
        assert_eq!(position_size(200.0, 100.0, 102.0), 100.0);
        assert_eq!(position_size(200.0, 100.0, 100.0), 0.0);
    }

    #[test]
    fn test_open_and_close_long() {
        let mut portfolio = Portfolio::new(10000.0);
        let trade = portfolio
            .open_position(plan(PositionSide::Long, 100.0, 98.0, 105.0))
            .unwrap();
        assert_eq!(trade.position_size, 100.0);
        assert_eq!(portfolio.trades_on(at(9).date_naive()), 1);

        let trade = portfolio
            .close_position(105.0, at(12), ExitReason::TakeProfit)
            .unwrap();
        assert_eq!(trade.pnl(), Some(500.0));
        assert_eq!(portfolio.capital(), 10500.0);
        assert!(!portfolio.has_position());
    }

    #[test]
    fn test_short_pnl() {
        let mut portfolio = Portfolio::new(10000.0);
        portfolio.open_position(plan(PositionSide::Short, 100.0, 102.0, 95.0));

        let trade = portfolio
            .close_position(102.0, at(12), ExitReason::StopLoss)
            .unwrap();
        assert_relative_eq!(trade.pnl().unwrap(), -200.0);
        assert_relative_eq!(portfolio.capital(), 9800.0);
    }

    #[test]
    fn test_zero_distance_skipped() {
        let mut portfolio = Portfolio::new(10000.0);

        assert!(portfolio
            .open_position(plan(PositionSide::Long, 100.0, 100.0, 100.0))
            .is_none());
        assert!(!portfolio.has_position());
        assert_eq!(portfolio.trades_on(at(9).date_naive()), 0);
    }

    #[test]
    fn test_stop_has_priority() {
        let mut portfolio = Portfolio::new(10000.0);
        portfolio.open_position(plan(PositionSide::Long, 100.0, 98.0, 105.0));

        // Range covers both levels
        assert_eq!(
            portfolio.check_exit(&bar(106.0, 97.0)),
            Some((98.0, ExitReason::StopLoss))
        );
        assert_eq!(
            portfolio.check_exit(&bar(105.5, 99.0)),
            Some((105.0, ExitReason::TakeProfit))
        );
        assert_eq!(portfolio.check_exit(&bar(104.0, 98.5)), None);
    }

    #[test]
    fn test_short_exit_levels() {
        let mut portfolio = Portfolio::new(10000.0);
        portfolio.open_position(plan(PositionSide::Short, 100.0, 102.0, 95.0));

        assert_eq!(
            portfolio.check_exit(&bar(102.0, 94.0)),
            Some((102.0, ExitReason::StopLoss))
        );
        assert_eq!(
            portfolio.check_exit(&bar(101.0, 95.0)),
            Some((95.0, ExitReason::TakeProfit))
        );
    }
}
