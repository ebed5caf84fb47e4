use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use quant_engine::{
    generate_squeeze_breakout_bars, generate_synthetic_bars, load_file, run_batch,
    BacktestError, BacktestParameters, BacktestResult, Bar, PerformanceMetrics, ResearchEngine,
    StrategyKind, MIN_BARS,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Pattern {
    /// Seeded random walk
    Random,
    /// Band squeeze followed by one breakout
    Breakout,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Parser, Debug)]
#[command(name = "quant-engine")]
#[command(version)]
#[command(about = "Indicator, signal and backtest engine for intraday FX strategies", long_about = None)]
struct Args {
    /// Data file path (CSV/JSON). If not provided, uses synthetic data.
    #[arg(short = 'f', long)]
    data_file: Option<PathBuf>,

    /// Number of synthetic bars to generate
    #[arg(short, long, default_value = "500")]
    bars: usize,

    /// Seed for synthetic data
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Initial price for synthetic data
    #[arg(long, default_value = "1.085")]
    initial_price: f64,

    /// Shape of the synthetic data
    #[arg(long, value_enum, default_value = "random")]
    pattern: Pattern,

    /// JSON configuration document; flags below override its fields
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Symbol label carried into the report
    #[arg(short, long)]
    symbol: Option<String>,

    /// Strategy: scalping, momentum, mean_reversion or breakout
    #[arg(long)]
    strategy: Option<String>,

    /// Initial capital
    #[arg(short, long)]
    capital: Option<f64>,

    /// Fraction of capital risked per trade (0.02 = 2%)
    #[arg(long)]
    risk_per_trade: Option<f64>,

    #[arg(long)]
    max_trades_per_day: Option<u32>,

    /// Stop distance in range-approximation units
    #[arg(long)]
    atr_multiplier: Option<f64>,

    /// Target distance in range-approximation units
    #[arg(long)]
    target_multiplier: Option<f64>,

    /// Fundamental sentiment bias in [-1, 1]
    #[arg(long, allow_hyphen_values = true)]
    sentiment: Option<f64>,

    /// Accepted and reported, not applied
    #[arg(long)]
    slippage: Option<f64>,

    /// Accepted and reported, not applied
    #[arg(long)]
    commission: Option<f64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    output: OutputFormat,

    /// Pretty print JSON output
    #[arg(long)]
    pretty: bool,

    /// Enriched bars included in JSON output
    #[arg(long, default_value = "300")]
    chart_bars: usize,

    /// Run every strategy in parallel and print a comparison
    #[arg(long)]
    compare: bool,

    /// trace, debug, info, warn or error
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn parameters(&self) -> Result<BacktestParameters> {
        let mut params = match &self.config {
            Some(path) => BacktestParameters::from_json_file(path)
                .with_context(|| format!("failed to read config {}", path.display()))?,
            None => BacktestParameters::default(),
        };

        if let Some(symbol) = &self.symbol {
            params.symbol = symbol.clone();
        }
        if let Some(strategy) = &self.strategy {
            params.strategy = StrategyKind::from_str(strategy)?;
        }
        if let Some(capital) = self.capital {
            params.initial_capital = capital;
        }
        if let Some(risk) = self.risk_per_trade {
            params.risk_per_trade = risk;
        }
        if let Some(max_trades) = self.max_trades_per_day {
            params.max_trades_per_day = max_trades;
        }
        if let Some(atr) = self.atr_multiplier {
            params.atr_multiplier = atr;
        }
        if let Some(target) = self.target_multiplier {
            params.target_multiplier = target;
        }
        if let Some(sentiment) = self.sentiment {
            params.fundamental_sentiment = sentiment;
        }
        if let Some(slippage) = self.slippage {
            params.slippage = slippage;
        }
        if let Some(commission) = self.commission {
            params.commission = commission;
        }

        params.validate()?;
        Ok(params)
    }

    fn load_bars(&self) -> Result<Vec<Bar>> {
        if let Some(path) = &self.data_file {
            info!(path = %path.display(), "loading data");
            return Ok(load_file(path)?);
        }

        info!(bars = self.bars, pattern = ?self.pattern, "generating synthetic data");
        Ok(match self.pattern {
            Pattern::Random => generate_synthetic_bars(self.bars, self.initial_price, self.seed),
            Pattern::Breakout => {
                generate_squeeze_breakout_bars(self.bars, self.bars.saturating_sub(50))
            }
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StrategySummary<'a> {
    strategy: StrategyKind,
    final_capital: f64,
    metrics: &'a PerformanceMetrics,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = Level::from_str(&args.log_level)
        .map_err(|_| anyhow::anyhow!("invalid log level: {}", args.log_level))?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install log subscriber")?;

    let params = args.parameters()?;
    let bars = args.load_bars()?;

    // The engine silently skips short inputs, so reject them here
    if bars.len() < MIN_BARS {
        return Err(BacktestError::InsufficientData {
            required: MIN_BARS,
            actual: bars.len(),
        }
        .into());
    }

    if args.compare {
        let configs: Vec<BacktestParameters> = StrategyKind::ALL
            .iter()
            .map(|&strategy| params.clone().with_strategy(strategy))
            .collect();
        let results = run_batch(&bars, &configs);
        return print_comparison(&args, &results);
    }

    info!(bars = bars.len(), strategy = %params.strategy, "running backtest");
    let mut result = ResearchEngine::new(params).run(&bars);

    match args.output {
        OutputFormat::Json => {
            result.bars = result.chart_tail(args.chart_bars).to_vec();
            let json = if args.pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            println!("{}", json);
        }
        OutputFormat::Text => print_text_report(&result),
    }

    Ok(())
}

fn print_comparison(args: &Args, results: &[BacktestResult]) -> Result<()> {
    match args.output {
        OutputFormat::Json => {
            let summaries: Vec<StrategySummary> = results
                .iter()
                .map(|r| StrategySummary {
                    strategy: r.strategy,
                    final_capital: r.final_capital,
                    metrics: &r.metrics,
                })
                .collect();
            let json = if args.pretty {
                serde_json::to_string_pretty(&summaries)?
            } else {
                serde_json::to_string(&summaries)?
            };
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!();
            println!(
                "  {:<16}{:>8}{:>10}{:>10}{:>10}{:>10}",
                "STRATEGY", "TRADES", "RETURN%", "WIN%", "PF", "MAX DD%"
            );
            println!("----------------------------------------------------------------");
            for r in results {
                let m = &r.metrics;
                println!(
                    "  {:<16}{:>8}{:>10.2}{:>10.1}{:>10}{:>10.2}",
                    r.strategy.as_str(),
                    m.total_trades,
                    m.total_return,
                    m.win_rate,
                    format_profit_factor(m.profit_factor),
                    m.max_drawdown
                );
            }
            println!();
        }
    }
    Ok(())
}

fn format_profit_factor(value: f64) -> String {
    if value.is_infinite() {
        "inf".to_string()
    } else {
        format!("{:.3}", value)
    }
}

fn print_text_report(result: &BacktestResult) {
    let period = match (result.start_date, result.end_date) {
        (Some(start), Some(end)) => format!("{} to {}", start, end),
        _ => "n/a".to_string(),
    };

    println!();
    println!("================================================================");
    println!("  BACKTEST REPORT - {} / {}", result.symbol, result.strategy);
    println!("================================================================");
    println!();
    println!("  Period: {}", period);
    println!("  Bars:   {}", result.bars.len());
    println!();
    println!("----------------------------------------------------------------");
    println!("  CAPITAL");
    println!("----------------------------------------------------------------");
    println!("  Initial Capital:  ${:>12.2}", result.initial_capital);
    println!("  Final Capital:    ${:>12.2}", result.final_capital);
    println!("  Total Return:     {:>12.2}%", result.metrics.total_return);
    println!();
    println!("----------------------------------------------------------------");
    println!("  RISK METRICS");
    println!("----------------------------------------------------------------");
    println!("  Sharpe (trade):   {:>12.3}", result.metrics.sharpe_ratio);
    println!("  Max Drawdown:     {:>12.2}%", result.metrics.max_drawdown);
    println!();
    println!("----------------------------------------------------------------");
    println!("  TRADE STATISTICS");
    println!("----------------------------------------------------------------");
    println!("  Total Trades:     {:>12}", result.metrics.total_trades);
    println!("  Winning Trades:   {:>12}", result.metrics.winning_trades);
    println!("  Losing Trades:    {:>12}", result.metrics.losing_trades);
    println!("  Win Rate:         {:>12.1}%", result.metrics.win_rate);
    println!("  Avg Win:          ${:>12.2}", result.metrics.avg_win);
    println!("  Avg Loss:         ${:>12.2}", result.metrics.avg_loss);
    println!(
        "  Profit Factor:    {:>12}",
        format_profit_factor(result.metrics.profit_factor)
    );
    println!("  Expectancy:       ${:>12.2}", result.metrics.expectancy);
    println!("  Best Trade:       ${:>12.2}", result.metrics.best_trade);
    println!("  Worst Trade:      ${:>12.2}", result.metrics.worst_trade);
    println!();
    println!("================================================================");

    if !result.trades.is_empty() {
        println!();
        println!("  RECENT TRADES (last 5)");
        println!("----------------------------------------------------------------");
        for trade in result.trades.iter().rev().take(5) {
            let (exit_date, pnl, reason) = match &trade.exit {
                Some(exit) => (
                    exit.exit_date.format("%Y-%m-%d %H:%M").to_string(),
                    exit.pnl,
                    format!("{:?}", exit.exit_reason),
                ),
                None => ("open".to_string(), 0.0, String::new()),
            };
            println!(
                "  {:?} {} -> {} | P&L: ${:+.2} | {} | {}",
                trade.side,
                trade.entry_date.format("%Y-%m-%d %H:%M"),
                exit_date,
                pnl,
                trade.setup_type,
                reason
            );
        }
        println!();
    }
}
