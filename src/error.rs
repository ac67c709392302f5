//! Error types for configuration and construction.
//!
//! Runtime faults (a port that will not bind, a listener that dies) are not
//! errors in this sense: they are reported through the verbose sink and only
//! disable the introspection server.

use thiserror::Error;

/// Errors raised while building or loading a monitor configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("sampling interval must be greater than zero")]
    ZeroInterval,

    #[error("request timeout must be greater than zero")]
    ZeroRequestTimeout,

    #[error("unknown metric category '{0}'")]
    UnknownCategory(String),

    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Load(Box::new(err))
    }
}
