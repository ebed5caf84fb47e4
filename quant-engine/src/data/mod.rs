pub mod loader;
pub mod synthetic;

pub use loader::{load_csv, load_json};
pub use synthetic::{generate_squeeze_breakout_bars, generate_synthetic_bars};

use std::path::Path;

use common::{BacktestError, Bar, Result};
use tracing::debug;

/// Load bars from file, detecting format from extension
pub fn load_file(path: &Path) -> Result<Vec<Bar>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let bars = match ext.as_str() {
        "csv" => load_csv(path)?,
        "json" => load_json(path)?,
        _ => {
            return Err(BacktestError::DataLoadError(format!(
                "Unsupported file format: {}",
                ext
            )))
        }
    };

    debug!(path = %path.display(), bars = bars.len(), "bars loaded");
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_extension() {
        let err = load_file(Path::new("bars.parquet")).unwrap_err();
        assert!(matches!(err, BacktestError::DataLoadError(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_file(Path::new("/nonexistent/bars.csv")).unwrap_err();
        assert!(matches!(err, BacktestError::DataLoadError(_)));
    }
}
