use std::error::Error as StdError;

#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    /// Missing or invalid client configuration; never reaches the network
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// The server answered with a non-success status
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },
    /// No response headers arrived within the configured deadline
    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },
    /// Success status but the response cannot be streamed
    #[error("Protocol error: {0}")]
    Protocol(String),
    /// Connection-level failure passed through from the transport
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn StdError + Send + Sync>),
    /// The caller cancelled the request
    #[error("Request cancelled")]
    Cancelled,
    /// I/O error
    #[error("I/O error: {0}")]
    IOError(String),
}

impl LLMError {
    /// Short, stable name recorded as the telemetry `errorType`.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "ConfigurationError",
            Self::Http { .. } => "HTTPError",
            Self::Timeout { .. } => "TimeoutError",
            Self::Protocol(_) => "ProtocolError",
            Self::Transport(_) => "TransportError",
            Self::Cancelled => "Cancelled",
            Self::IOError(_) => "IOError",
        }
    }

    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn transport(err: impl StdError + Send + Sync + 'static) -> Self {
        Self::Transport(Box::new(err))
    }
}

impl From<std::io::Error> for LLMError {
    fn from(err: std::io::Error) -> Self {
        Self::IOError(err.to_string())
    }
}

impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::ConfigError(format!("Invalid request: {err}"))
        } else {
            Self::transport(err)
        }
    }
}
