use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("sensor read failed: {0}")]
    SensorRead(String),
    #[error("timeout waiting for sensor")]
    SensorTimeout,
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timed out waiting for shared state lock")]
    LockTimeout,
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("resource exhausted: {0}")]
    ResourceExhausted(&'static str),
}

impl CoreError {
    /// Transient errors are retried on the next period; the rest indicate a
    /// misbehaving driver.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::SensorTimeout | Self::LockTimeout | Self::ResourceExhausted(_)
        )
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing accelerometer")]
    MissingAccelerometer,
    #[error("missing presence sensor")]
    MissingPresenceSensor,
    #[error("missing light sensor")]
    MissingLightSensor,
    #[error("missing range finder")]
    MissingRangeFinder,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    #[error("failed to spawn {task} task: {reason}")]
    Spawn { task: &'static str, reason: String },
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
