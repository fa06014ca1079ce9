use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("invalid analog channel {0} (valid: 0..=7)")]
    InvalidChannel(u8),
    #[error("input not wired: {0}")]
    Unwired(&'static str),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
