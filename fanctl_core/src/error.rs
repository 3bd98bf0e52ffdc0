use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FanError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("sensor error: {0}")]
    Sensor(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("watchdog expired after {stalled_ms} ms without refresh")]
    WatchdogExpired { stalled_ms: u64 },
    #[error("invalid state: {0}")]
    State(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
