use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::StrategyKind;

/// OHLCV bar data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Directional signal attached to a bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    Long,
    Short,
    #[default]
    StayOut,
}

impl SignalType {
    /// Position side this signal would open, if any
    pub fn side(self) -> Option<PositionSide> {
        match self {
            SignalType::Long => Some(PositionSide::Long),
            SignalType::Short => Some(PositionSide::Short),
            SignalType::StayOut => None,
        }
    }
}

/// Position side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Long,
    Short,
}

impl From<PositionSide> for SignalType {
    fn from(side: PositionSide) -> Self {
        match side {
            PositionSide::Long => SignalType::Long,
            PositionSide::Short => SignalType::Short,
        }
    }
}

/// Bar plus indicator and signal fields.
///
/// Indicator fields stay `None` until their warmup has passed. Signal fields
/// default to `STAY_OUT` / 0 / `"None"` until a generator has scored the bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedBar {
    #[serde(flatten)]
    pub bar: Bar,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsi14: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsi7: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ema5: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ema10: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ema20: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ema50: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macd_signal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macd_histogram: Option<f64>,
    #[serde(rename = "fastMACD", default, skip_serializing_if = "Option::is_none")]
    pub fast_macd: Option<f64>,
    #[serde(rename = "fastMACDSignal", default, skip_serializing_if = "Option::is_none")]
    pub fast_macd_signal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bb_upper: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bb_lower: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bb_middle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bb_width: Option<f64>,
    #[serde(default)]
    pub signal: SignalType,
    #[serde(default)]
    pub signal_strength: u32,
    #[serde(default = "default_setup_type")]
    pub setup_type: String,
}

fn default_setup_type() -> String {
    "None".to_string()
}

impl From<Bar> for EnrichedBar {
    fn from(bar: Bar) -> Self {
        Self {
            bar,
            rsi14: None,
            rsi7: None,
            ema5: None,
            ema10: None,
            ema20: None,
            ema50: None,
            macd: None,
            macd_signal: None,
            macd_histogram: None,
            fast_macd: None,
            fast_macd_signal: None,
            bb_upper: None,
            bb_lower: None,
            bb_middle: None,
            bb_width: None,
            signal: SignalType::StayOut,
            signal_strength: 0,
            setup_type: default_setup_type(),
        }
    }
}

impl EnrichedBar {
    /// True once any indicator has been attached
    pub fn has_indicators(&self) -> bool {
        self.rsi14.is_some() || self.ema5.is_some() || self.bb_middle.is_some()
    }
}

/// Why a trade was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    EndOfPeriod,
}

/// Exit half of a trade, present only once the trade is closed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeExit {
    pub exit_date: DateTime<Utc>,
    pub exit_price: f64,
    pub pnl: f64,
    pub exit_reason: ExitReason,
}

/// Individual trade record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub entry_date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub side: PositionSide,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub position_size: f64,
    pub signal_strength: u32,
    pub setup_type: String,
    pub risk_amount: f64,
    #[serde(flatten)]
    pub exit: Option<TradeExit>,
}

impl Trade {
    pub fn is_closed(&self) -> bool {
        self.exit.is_some()
    }

    /// Realized pnl, `None` while the trade is open
    pub fn pnl(&self) -> Option<f64> {
        self.exit.as_ref().map(|e| e.pnl)
    }

    /// Pnl of closing this trade at `price`
    pub fn pnl_at(&self, price: f64) -> f64 {
        match self.side {
            PositionSide::Long => (price - self.entry_price) * self.position_size,
            PositionSide::Short => (self.entry_price - price) * self.position_size,
        }
    }
}

/// Performance metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    /// Percent change from initial to final capital
    pub total_return: f64,
    pub win_rate: f64,
    /// `f64::INFINITY` when there are wins and no losses
    #[serde(with = "profit_factor")]
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub max_drawdown: f64,
    /// Mean trade pnl over its standard deviation, unannualized
    pub sharpe_ratio: f64,
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub expectancy: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
}

/// JSON has no infinity literal, so an unbounded profit factor travels as
/// the string token `"Infinity"`.
mod profit_factor {
    use serde::{Deserialize, Deserializer, Serializer};

    pub const INFINITY_TOKEN: &str = "Infinity";

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() && value.is_sign_positive() {
            serializer.serialize_str(INFINITY_TOKEN)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Token(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(v),
            Repr::Token(t) if t == INFINITY_TOKEN => Ok(f64::INFINITY),
            Repr::Token(t) => Err(serde::de::Error::custom(format!(
                "invalid profit factor token: {}",
                t
            ))),
        }
    }
}

/// Backtest result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResult {
    pub symbol: String,
    pub strategy: StrategyKind,
    pub metrics: PerformanceMetrics,
    pub trades: Vec<Trade>,
    pub bars: Vec<EnrichedBar>,
    pub equity_curve: Vec<(DateTime<Utc>, f64)>,
    pub drawdown_curve: Vec<(DateTime<Utc>, f64)>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub initial_capital: f64,
    pub final_capital: f64,
}

impl BacktestResult {
    /// False when the input was too short for any indicator to attach
    pub fn has_indicators(&self) -> bool {
        self.bars.iter().any(EnrichedBar::has_indicators)
    }

    /// Last `n` enriched bars, for a chart
    pub fn chart_tail(&self, n: usize) -> &[EnrichedBar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }
}
