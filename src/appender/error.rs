//! Errors raised while configuring or activating a forwarder.

use thiserror::Error;

/// Invalid forwarder configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("host must be specified and non-empty")]
    EmptyHost,
    #[error("port must be a value in the range [1-65535], got {0}")]
    PortOutOfRange(u32),
    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
    #[error("invalid value {value:?} for option {key}")]
    InvalidValue { key: String, value: String },
    #[error("unknown option: {0}")]
    UnknownOption(String),
}

/// Reasons [`ForwarderAppender::activate`](super::ForwarderAppender::activate)
/// refused to run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActivationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("forwarder has already been activated")]
    AlreadyActivated,
    #[error("forwarder has been closed")]
    Closed,
}
