use thiserror::Error;

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Insufficient data: need at least {required} bars, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Data loading error: {0}")]
    DataLoadError(String),

    #[error("Notification error: {0}")]
    NotifyError(String),

    #[error("Live monitor is not running")]
    MonitorNotRunning,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parse error: {0}")]
    CsvError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BacktestError>;
