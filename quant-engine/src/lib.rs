pub mod data;
pub mod engine;
pub mod indicators;
pub mod metrics;
pub mod monitor;
pub mod portfolio;
pub mod signals;
pub mod simulator;

pub use data::{generate_squeeze_breakout_bars, generate_synthetic_bars, load_file};
pub use engine::{run_batch, ResearchEngine};
pub use indicators::{IndicatorEngine, MIN_BARS};
pub use metrics::PerformanceAnalyzer;
pub use monitor::{
    LiveMonitor, LiveTrade, LogNotifier, MarketDataSource, MonitorEvent, MonitorState,
    TradeNotifier,
};
pub use portfolio::Portfolio;
pub use signals::{ScoringRule, SignalGenerator};
pub use simulator::{BacktestSimulator, SimulationOutcome};

// Re-export common types
pub use common::{
    BacktestError, BacktestParameters, BacktestResult, Bar, EnrichedBar, ExitReason,
    PerformanceMetrics, PositionSide, Result, SignalType, StrategyKind, Trade,
};
