/// Core error type for livegauge
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not authorized: no stored credential")]
    NotAuthorized,

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Unknown {kind} status: {value:?}")]
    UnknownStatus { kind: &'static str, value: String },

    #[error("Authorization error: {0}")]
    Auth(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an upstream error tagged with the call that produced it
    pub fn upstream(call: &str, detail: impl std::fmt::Display) -> Self {
        Error::Upstream(format!("{}: {}", call, detail))
    }

    /// Whether this error should abort the remainder of a poll cycle
    pub fn is_upstream(&self) -> bool {
        matches!(self, Error::Upstream(_))
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
