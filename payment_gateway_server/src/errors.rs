use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl From<payment_gateway_engine::ConfigError> for ServerError {
    fn from(e: payment_gateway_engine::ConfigError) -> Self {
        Self::ConfigurationError(e.to_string())
    }
}
