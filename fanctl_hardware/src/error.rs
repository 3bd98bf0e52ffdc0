use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("pwm error: {0}")]
    Pwm(String),
    #[error("sensor error: {0}")]
    Sensor(String),
    #[error("malformed sensor value: {0}")]
    Parse(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
