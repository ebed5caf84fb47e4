use chrono::{DateTime, Utc};
use common::{PerformanceMetrics, Trade};

/// Aggregate statistics over a trade ledger
pub struct PerformanceAnalyzer;

impl PerformanceAnalyzer {
    /// Calculate all performance metrics.
    ///
    /// Only closed trades count. With none, every metric is zero.
    pub fn analyze(
        initial_capital: f64,
        final_capital: f64,
        trades: &[Trade],
    ) -> PerformanceMetrics {
        let pnls: Vec<f64> = trades.iter().filter_map(Trade::pnl).collect();
        if pnls.is_empty() {
            return PerformanceMetrics::default();
        }

        let total_return = if initial_capital != 0.0 {
            (final_capital - initial_capital) / initial_capital * 100.0
        } else {
            0.0
        };

        let stats = TradeStats::from_pnls(&pnls);
        let max_drawdown = Self::calculate_max_drawdown(initial_capital, &pnls);
        let sharpe_ratio = Self::calculate_sharpe_ratio(&pnls);

        PerformanceMetrics {
            total_return,
            win_rate: stats.win_rate,
            profit_factor: stats.profit_factor,
            avg_win: stats.avg_win,
            avg_loss: stats.avg_loss,
            max_drawdown,
            sharpe_ratio,
            total_trades: pnls.len() as u32,
            winning_trades: stats.winning,
            losing_trades: stats.losing,
            expectancy: stats.expectancy,
            best_trade: stats.best,
            worst_trade: stats.worst,
        }
    }

    /// Largest peak-to-trough decline, in percent, walking the ledger in order
    fn calculate_max_drawdown(initial_capital: f64, pnls: &[f64]) -> f64 {
        let mut running = initial_capital;
        let mut peak = initial_capital;
        let mut max_drawdown = 0.0;

        for pnl in pnls {
            running += pnl;
            if running > peak {
                peak = running;
            }
            if peak > 0.0 {
                let drawdown = (peak - running) / peak * 100.0;
                if drawdown > max_drawdown {
                    max_drawdown = drawdown;
                }
            }
        }

        max_drawdown
    }

    /// Mean trade pnl over its population standard deviation
    fn calculate_sharpe_ratio(pnls: &[f64]) -> f64 {
        if pnls.is_empty() {
            return 0.0;
        }

        let n = pnls.len() as f64;
        let mean = pnls.iter().sum::<f64>() / n;
        let variance = pnls.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        if std_dev == 0.0 {
            0.0
        } else {
            mean / std_dev
        }
    }

    /// Capital after each closed trade, starting with `initial_capital` at
    /// `start`
    pub fn equity_curve(
        initial_capital: f64,
        start: DateTime<Utc>,
        trades: &[Trade],
    ) -> Vec<(DateTime<Utc>, f64)> {
        let mut capital = initial_capital;
        let mut curve = Vec::with_capacity(trades.len() + 1);
        curve.push((start, capital));

        for exit in trades.iter().filter_map(|t| t.exit.as_ref()) {
            capital += exit.pnl;
            curve.push((exit.exit_date, capital));
        }

        curve
    }

    /// Calculate drawdown curve
    pub fn drawdown_curve(equity_curve: &[(DateTime<Utc>, f64)]) -> Vec<(DateTime<Utc>, f64)> {
        let Some(&(_, first)) = equity_curve.first() else {
            return vec![];
        };

        let mut max_equity = first;
        equity_curve
            .iter()
            .map(|(ts, equity)| {
                if *equity > max_equity {
                    max_equity = *equity;
                }
                let drawdown = if max_equity > 0.0 {
                    (max_equity - equity) / max_equity * 100.0
                } else {
                    0.0
                };
                (*ts, drawdown)
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct TradeStats {
    winning: u32,
    losing: u32,
    win_rate: f64,
    avg_win: f64,
    avg_loss: f64,
    profit_factor: f64,
    expectancy: f64,
    best: f64,
    worst: f64,
}

impl TradeStats {
    fn from_pnls(pnls: &[f64]) -> Self {
        if pnls.is_empty() {
            return Self::default();
        }

        let mut winning = 0u32;
        let mut losing = 0u32;
        let mut total_wins = 0.0;
        let mut total_losses = 0.0;
        let mut best = f64::MIN;
        let mut worst = f64::MAX;

        for &pnl in pnls {
            if pnl > 0.0 {
                winning += 1;
                total_wins += pnl;
            } else if pnl < 0.0 {
                losing += 1;
                total_losses += pnl.abs();
            }
            best = best.max(pnl);
            worst = worst.min(pnl);
        }

        let win_rate = winning as f64 / pnls.len() as f64 * 100.0;

        let avg_win = if winning > 0 {
            total_wins / winning as f64
        } else {
            0.0
        };

        let avg_loss = if losing > 0 {
            total_losses / losing as f64
        } else {
            0.0
        };

        let profit_factor = if losing > 0 {
            total_wins / total_losses
        } else if winning > 0 {
            f64::INFINITY
        } else {
            0.0
        };

        let expectancy = (win_rate / 100.0 * avg_win) - ((1.0 - win_rate / 100.0) * avg_loss);

        Self {
            winning,
            losing,
            win_rate,
            avg_win,
            avg_loss,
            profit_factor,
            expectancy,
            best,
            worst,
        }
    }
}
