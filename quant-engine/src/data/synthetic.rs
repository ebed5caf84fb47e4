use chrono::{DateTime, Duration, Utc};
use common::Bar;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Fixed so that generated series never depend on the clock
fn series_start() -> DateTime<Utc> {
    // 2024-01-01T00:00:00Z
    DateTime::from_timestamp(1_704_067_200, 0).unwrap_or_default()
}

/// Generate hourly FX-like bars from a seeded random walk.
///
/// The same `seed` always yields the same series.
pub fn generate_synthetic_bars(count: usize, initial_price: f64, seed: u64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bars = Vec::with_capacity(count);
    let start = series_start();

    let mut price = initial_price;
    let bar_volatility = 0.0015;
    let drift = 0.00002;

    for i in 0..count {
        let random_return: f64 = rng.gen_range(-1.0..1.0);
        let bar_return = drift + bar_volatility * random_return;
        let close = price * (1.0 + bar_return);
        let open = price;

        let intrabar_range = price * rng.gen_range(0.0005..0.002);
        let high = open.max(close) + rng.gen_range(0.0..intrabar_range / 2.0);
        let low = open.min(close) - rng.gen_range(0.0..intrabar_range / 2.0);

        // busier on larger moves
        let volume_multiplier = 1.0 + bar_return.abs() * 200.0;
        let volume = (1000.0 * volume_multiplier * rng.gen_range(0.8..1.2)).round();

        bars.push(Bar::new(start + Duration::hours(i as i64), open, high, low, close, volume));
        price = close;
    }

    bars
}

/// Generate a band squeeze followed by a single breakout.
///
/// Before `breakout_at` closes alternate tightly around 100 on flat volume.
/// Bar `breakout_at` closes at 100.5 on five times the volume, and every
/// later bar closes 0.1 higher than the one before.
pub fn generate_squeeze_breakout_bars(count: usize, breakout_at: usize) -> Vec<Bar> {
    let start = series_start();
    let mut bars = Vec::with_capacity(count);
    let mut prev_close = 100.0;

    for i in 0..count {
        let timestamp = start + Duration::hours(i as i64);
        let bar = if i < breakout_at {
            let close = if i % 2 == 0 { 100.05 } else { 99.95 };
            let open = prev_close;
            Bar::new(
                timestamp,
                open,
                open.max(close) + 0.02,
                open.min(close) - 0.02,
                close,
                1000.0,
            )
        } else if i == breakout_at {
            Bar::new(timestamp, 100.0, 100.6, 99.98, 100.5, 5000.0)
        } else {
            let close = 100.5 + 0.1 * (i - breakout_at) as f64;
            let open = prev_close;
            Bar::new(timestamp, open, close + 0.05, open - 0.05, close, 1000.0)
        };

        prev_close = bar.close;
        bars.push(bar);
    }

    bars
}
