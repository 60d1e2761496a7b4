use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("sensor timeout")]
    Timeout,
    #[error("ultrasonic echo timeout")]
    EchoTimeout,
    #[error("reading out of range: {0}")]
    OutOfRange(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
