use thiserror::Error;

/// Unified error type for Egress.
///
/// Transport failures are absent: the interceptor hands the
/// wrapped transport's own error back to the caller untouched.
#[derive(Error, Debug)]
pub enum EgressError {
    #[error("Interception is already active on this client")]
    AlreadyActive,

    #[error("Interception scope is not active")]
    NotActive,

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl EgressError {
    /// Misuse of the activation lifecycle rather than a data-path failure.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, EgressError::AlreadyActive | EgressError::NotActive)
    }
}

pub type EgressResult<T> = Result<T, EgressError>;
