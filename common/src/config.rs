use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BacktestError, Result};

/// Rule set used to score bars into signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Scalping,
    Momentum,
    MeanReversion,
    Breakout,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::Scalping,
        StrategyKind::Momentum,
        StrategyKind::MeanReversion,
        StrategyKind::Breakout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Scalping => "scalping",
            StrategyKind::Momentum => "momentum",
            StrategyKind::MeanReversion => "mean_reversion",
            StrategyKind::Breakout => "breakout",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "scalping" => Ok(StrategyKind::Scalping),
            "momentum" => Ok(StrategyKind::Momentum),
            "mean_reversion" => Ok(StrategyKind::MeanReversion),
            "breakout" => Ok(StrategyKind::Breakout),
            other => Err(BacktestError::InvalidParameter(format!(
                "unknown strategy '{}' (expected scalping, momentum, mean_reversion or breakout)",
                other
            ))),
        }
    }
}

/// Backtest parameters
///
/// Field names follow the dashboard's configuration document, so a JSON
/// config posted by a caller deserializes directly. Missing fields fall back
/// to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BacktestParameters {
    /// Opaque instrument identifier, never interpreted by the engine
    pub symbol: String,
    /// Bar interval requested from the data collaborator
    pub timeframe: String,
    /// History span requested from the data collaborator
    pub period: String,
    pub strategy: StrategyKind,
    pub initial_capital: f64,
    /// Fraction of current capital risked per trade
    pub risk_per_trade: f64,
    pub max_trades_per_day: u32,
    /// Stop distance in units of the range approximation
    pub atr_multiplier: f64,
    /// Target distance in units of the range approximation
    pub target_multiplier: f64,
    /// Fundamental bias in [-1, 1] applied after strategy scoring
    pub fundamental_sentiment: f64,
    /// Accepted for compatibility; the simulation does not apply it
    pub slippage: f64,
    /// Accepted for compatibility; the simulation does not apply it
    pub commission: f64,
}

impl Default for BacktestParameters {
    fn default() -> Self {
        Self {
            symbol: "EURUSD=X".to_string(),
            timeframe: "1h".to_string(),
            period: "3mo".to_string(),
            strategy: StrategyKind::Scalping,
            initial_capital: 10000.0,
            risk_per_trade: 0.02,
            max_trades_per_day: 5,
            atr_multiplier: 1.0,
            target_multiplier: 2.5,
            fundamental_sentiment: 0.0,
            slippage: 1.5,
            commission: 4.0,
        }
    }
}

impl BacktestParameters {
    /// Load parameters from a JSON document
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| BacktestError::DataLoadError(e.to_string()))?;
        let params: Self = serde_json::from_reader(BufReader::new(file))?;
        Ok(params)
    }

    pub fn with_capital(mut self, capital: f64) -> Self {
        self.initial_capital = capital;
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_risk(mut self, risk_per_trade: f64) -> Self {
        self.risk_per_trade = risk_per_trade;
        self
    }

    pub fn with_sentiment(mut self, sentiment: f64) -> Self {
        self.fundamental_sentiment = sentiment;
        self
    }

    pub fn with_multipliers(mut self, atr_multiplier: f64, target_multiplier: f64) -> Self {
        self.atr_multiplier = atr_multiplier;
        self.target_multiplier = target_multiplier;
        self
    }

    pub fn with_max_trades_per_day(mut self, max_trades: u32) -> Self {
        self.max_trades_per_day = max_trades;
        self
    }

    /// Check the configuration contract before handing it to the engine
    pub fn validate(&self) -> Result<()> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(BacktestError::InvalidParameter(format!(
                "initialCapital must be positive, got {}",
                self.initial_capital
            )));
        }
        if !(self.risk_per_trade > 0.0 && self.risk_per_trade <= 1.0) {
            return Err(BacktestError::InvalidParameter(format!(
                "riskPerTrade must be in (0, 1], got {}",
                self.risk_per_trade
            )));
        }
        if self.max_trades_per_day == 0 {
            return Err(BacktestError::InvalidParameter(
                "maxTradesPerDay must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("atrMultiplier", self.atr_multiplier),
            ("targetMultiplier", self.target_multiplier),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(BacktestError::InvalidParameter(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !(-1.0..=1.0).contains(&self.fundamental_sentiment) {
            return Err(BacktestError::InvalidParameter(format!(
                "fundamentalSentiment must be in [-1, 1], got {}",
                self.fundamental_sentiment
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(BacktestParameters::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{"symbol":"AAPL","strategy":"mean_reversion","riskPerTrade":0.01}"#;
        let params: BacktestParameters = serde_json::from_str(json).unwrap();

        assert_eq!(params.symbol, "AAPL");
        assert_eq!(params.strategy, StrategyKind::MeanReversion);
        assert_eq!(params.risk_per_trade, 0.01);
        assert_eq!(params.initial_capital, 10000.0);
        assert_eq!(params.target_multiplier, 2.5);
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("breakout".parse::<StrategyKind>().unwrap(), StrategyKind::Breakout);
        assert_eq!(" Momentum ".parse::<StrategyKind>().unwrap(), StrategyKind::Momentum);
        assert!("grid".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(BacktestParameters::default().with_capital(0.0).validate().is_err());
        assert!(BacktestParameters::default().with_risk(1.5).validate().is_err());
        assert!(BacktestParameters::default().with_max_trades_per_day(0).validate().is_err());
        assert!(BacktestParameters::default().with_multipliers(1.0, 0.0).validate().is_err());
        assert!(BacktestParameters::default().with_sentiment(-1.2).validate().is_err());
    }
}
