use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use common::{BacktestError, Bar, Result};

/// Load bars from CSV file.
///
/// Expected columns: timestamp, open, high, low, close, volume. A header row
/// is required; rows with fewer than six fields are skipped.
pub fn load_csv(path: &Path) -> Result<Vec<Bar>> {
    let file = File::open(path).map_err(|e| BacktestError::DataLoadError(e.to_string()))?;
    let reader = BufReader::new(file);
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut bars = Vec::new();

    for result in csv_reader.records() {
        let record = result.map_err(|e| BacktestError::CsvError(e.to_string()))?;
        if record.len() < 6 {
            continue;
        }

        bars.push(Bar {
            timestamp: parse_timestamp(&record[0])?,
            open: parse_field(&record[1], "open")?,
            high: parse_field(&record[2], "high")?,
            low: parse_field(&record[3], "low")?,
            close: parse_field(&record[4], "close")?,
            volume: parse_field(&record[5], "volume")?,
        });
    }

    Ok(bars)
}

fn parse_field(raw: &str, name: &str) -> Result<f64> {
    raw.parse()
        .map_err(|_| BacktestError::CsvError(format!("Invalid {}: {}", name, raw)))
}

/// Load bars from JSON file
pub fn load_json(path: &Path) -> Result<Vec<Bar>> {
    let file = File::open(path).map_err(|e| BacktestError::DataLoadError(e.to_string()))?;
    let reader = BufReader::new(file);
    let bars: Vec<Bar> = serde_json::from_reader(reader)?;
    Ok(bars)
}

/// Parse timestamp from various formats
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    const DATETIME_FORMATS: [&str; 3] =
        ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];
    const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
        }
    }

    // Unix seconds
    if let Ok(ts) = s.parse::<i64>() {
        if let Some(dt) = DateTime::from_timestamp(ts, 0) {
            return Ok(dt);
        }
    }

    Err(BacktestError::CsvError(format!(
        "Unable to parse timestamp: {}",
        s
    )))
}
