//! Transport error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("bind failed: {0}")]
    BindFailed(String),

    #[error("accept failed: {0}")]
    AcceptFailed(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("not connected")]
    NotConnected,

    #[error("invalid framing: {0}")]
    InvalidFraming(String),

    /// A peer sent more than the framer's maximum message size without a delimiter
    #[error("message too large: {size} > {max}")]
    MessageTooLarge { size: usize, max: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
