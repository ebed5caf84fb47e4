use chrono::{DateTime, Utc};
use common::{
    BacktestError, BacktestParameters, Bar, EnrichedBar, ExitReason, PositionSide, Result,
    SignalType,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::indicators::{approximate_atr, IndicatorEngine};
use crate::signals::SignalGenerator;

/// Supplies the latest bars for a symbol
pub trait MarketDataSource {
    fn fetch_bars(&self, symbol: &str, timeframe: &str) -> Result<Vec<Bar>>;
}

/// Forwards monitor events (chat webhook, log, queue)
pub trait TradeNotifier {
    fn notify(&self, event: &MonitorEvent) -> Result<()>;
}

/// Notifier that writes events to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl TradeNotifier for LogNotifier {
    fn notify(&self, event: &MonitorEvent) -> Result<()> {
        match event {
            MonitorEvent::Entry(trade) => info!(
                symbol = %trade.symbol,
                side = ?trade.side,
                entry = trade.entry_price,
                stop = trade.stop_loss,
                target = trade.take_profit,
                setup = %trade.setup_type,
                "live entry"
            ),
            MonitorEvent::Exit {
                trade,
                exit_price,
                reason,
                ..
            } => info!(
                symbol = %trade.symbol,
                side = ?trade.side,
                entry = trade.entry_price,
                exit = exit_price,
                reason = ?reason,
                pnl_per_unit = event.pnl_per_unit(),
                "live exit"
            ),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorState {
    Stopped,
    Running,
}

/// Position tracked by the live monitor. Unsized: it exists to be reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveTrade {
    pub symbol: String,
    #[serde(rename = "type")]
    pub side: PositionSide,
    pub entry_date: DateTime<Utc>,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub signal_strength: u32,
    pub setup_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum MonitorEvent {
    Entry(LiveTrade),
    #[serde(rename_all = "camelCase")]
    Exit {
        trade: LiveTrade,
        exit_date: DateTime<Utc>,
        exit_price: f64,
        reason: ExitReason,
    },
}

impl MonitorEvent {
    /// Price move in the trade's favor, per unit; 0 for entries
    pub fn pnl_per_unit(&self) -> f64 {
        match self {
            MonitorEvent::Entry(_) => 0.0,
            MonitorEvent::Exit {
                trade, exit_price, ..
            } => match trade.side {
                PositionSide::Long => exit_price - trade.entry_price,
                PositionSide::Short => trade.entry_price - exit_price,
            },
        }
    }
}

/// Explicit polling job around the signal pipeline.
///
/// The monitor owns no timer: a scheduler calls [`LiveMonitor::poll`] once
/// per cycle while the job is running.
#[derive(Debug)]
pub struct LiveMonitor {
    state: MonitorState,
    params: BacktestParameters,
    active: Option<LiveTrade>,
}

impl Default for LiveMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveMonitor {
    pub fn new() -> Self {
        Self {
            state: MonitorState::Stopped,
            params: BacktestParameters::default(),
            active: None,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn params(&self) -> &BacktestParameters {
        &self.params
    }

    pub fn active_trade(&self) -> Option<&LiveTrade> {
        self.active.as_ref()
    }

    /// Validate `params` and start running. Restarting drops any tracked
    /// trade.
    pub fn start(&mut self, params: BacktestParameters) -> Result<()> {
        params.validate()?;
        info!(symbol = %params.symbol, strategy = %params.strategy, "live monitor started");
        self.params = params;
        self.active = None;
        self.state = MonitorState::Running;
        Ok(())
    }

    /// Stop running and discard the tracked trade
    pub fn stop(&mut self) -> Result<()> {
        if self.state == MonitorState::Stopped {
            return Err(BacktestError::MonitorNotRunning);
        }
        if let Some(trade) = self.active.take() {
            warn!(symbol = %trade.symbol, "live monitor stopped with an open trade");
        }
        self.state = MonitorState::Stopped;
        info!("live monitor stopped");
        Ok(())
    }

    /// Run one monitoring cycle.
    ///
    /// Returns the event emitted this cycle, if any. Fetch and notify errors
    /// are passed through untouched; when notifying fails the tracked trade
    /// has already been updated.
    pub fn poll(
        &mut self,
        source: &dyn MarketDataSource,
        notifier: &dyn TradeNotifier,
    ) -> Result<Option<MonitorEvent>> {
        if self.state == MonitorState::Stopped {
            return Ok(None);
        }

        let bars = source.fetch_bars(&self.params.symbol, &self.params.timeframe)?;
        let enriched = IndicatorEngine::enrich(&bars);
        let signaled = SignalGenerator::from_params(&self.params).generate(&enriched);

        let Some(latest) = signaled.last() else {
            debug!(symbol = %self.params.symbol, "no bars fetched");
            return Ok(None);
        };

        let event = match self.active.take() {
            Some(trade) => match close_exit(&trade, latest.bar.close) {
                Some(reason) => Some(MonitorEvent::Exit {
                    trade,
                    exit_date: latest.bar.timestamp,
                    exit_price: latest.bar.close,
                    reason,
                }),
                None => {
                    self.active = Some(trade);
                    None
                }
            },
            None => {
                let previous = signaled.len().checked_sub(2).map(|i| &signaled[i]);
                match previous.and_then(|prev| self.entry(latest, prev)) {
                    Some(trade) => {
                        self.active = Some(trade.clone());
                        Some(MonitorEvent::Entry(trade))
                    }
                    None => None,
                }
            }
        };

        if let Some(event) = &event {
            notifier.notify(event)?;
        }
        Ok(event)
    }

    /// Fresh LONG/SHORT on the latest bar, entered at its close
    fn entry(&self, latest: &EnrichedBar, previous: &EnrichedBar) -> Option<LiveTrade> {
        let side = latest.signal.side()?;
        if previous.signal != SignalType::StayOut {
            return None;
        }

        let entry_price = latest.bar.close;
        let atr = approximate_atr(latest.bar.high, latest.bar.low);
        let stop_distance = atr * self.params.atr_multiplier;
        if stop_distance <= 0.0 {
            debug!(symbol = %self.params.symbol, "zero stop distance, live signal skipped");
            return None;
        }
        let target_distance = atr * self.params.target_multiplier;

        let (stop_loss, take_profit) = match side {
            PositionSide::Long => (entry_price - stop_distance, entry_price + target_distance),
            PositionSide::Short => (entry_price + stop_distance, entry_price - target_distance),
        };

        Some(LiveTrade {
            symbol: self.params.symbol.clone(),
            side,
            entry_date: latest.bar.timestamp,
            entry_price,
            stop_loss,
            take_profit,
            signal_strength: latest.signal_strength,
            setup_type: latest.setup_type.clone(),
        })
    }
}

/// Close-based exit test, stop before target
fn close_exit(trade: &LiveTrade, close: f64) -> Option<ExitReason> {
    match trade.side {
        PositionSide::Long if close <= trade.stop_loss => Some(ExitReason::StopLoss),
        PositionSide::Long if close >= trade.take_profit => Some(ExitReason::TakeProfit),
        PositionSide::Short if close >= trade.stop_loss => Some(ExitReason::StopLoss),
        PositionSide::Short if close <= trade.take_profit => Some(ExitReason::TakeProfit),
        _ => None,
    }
}
