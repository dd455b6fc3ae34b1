use thiserror::Error;

/// Unified error type for device and local operations
#[derive(Error, Debug)]
pub enum XbeeError {
    #[error("Invalid location: {0}")]
    Parse(String),

    #[error("Serial port error on '{port}': {message}")]
    Transport { port: String, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Exchange already in progress on '{port}'")]
    Busy { port: String },

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Output error: {0}")]
    Output(String),
}

impl XbeeError {
    pub fn transport(port: &str, message: impl std::fmt::Display) -> Self {
        XbeeError::Transport {
            port: port.to_string(),
            message: message.to_string(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        XbeeError::Protocol(message.into())
    }
}

pub type XbeeResult<T> = Result<T, XbeeError>;
