use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BanderError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("invalid analog channel {0} (valid: 0..=7)")]
    InvalidChannel(u8),
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
