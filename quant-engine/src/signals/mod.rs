pub mod generator;
pub mod strategy;

pub use generator::{apply_sentiment, SignalGenerator, SIGNAL_WARMUP};
pub use strategy::{rule_for, Breakout, MeanReversion, Momentum, Scalping, Score, ScoringRule};
