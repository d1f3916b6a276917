use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum TrackerError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("timeout waiting for hardware")]
    Timeout,
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing horizontal axis")]
    MissingAxisH,
    #[error("missing vertical axis")]
    MissingAxisV,
    #[error("missing limit switches")]
    MissingLimits,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
