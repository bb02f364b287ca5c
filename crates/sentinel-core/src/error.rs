use thiserror::Error;

/// Crate-wide error taxonomy. Every fallible operation in the simulation
/// core returns one of these variants so callers can match on kind instead
/// of parsing messages.
#[derive(Error, Debug)]
pub enum SentinelError {
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("validation error: {reason}")]
    Validation { reason: String },

    #[error("transient storage error (retryable): {reason}")]
    Transient { reason: String },

    #[error("fatal storage error: {reason}")]
    Fatal { reason: String },

    #[error("broadcast failed for node {node_id}: {reason}")]
    Broadcast { node_id: String, reason: String },

    #[error("blacklist io error for node {node_id}: {reason}")]
    Io { node_id: String, reason: String },

    #[error("worker error: {reason}")]
    Worker { reason: String },
}

impl SentinelError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration { reason: reason.into() }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation { reason: reason.into() }
    }

    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient { reason: reason.into() }
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::Fatal { reason: reason.into() }
    }

    /// The transient-error policy: "locked", "busy", and "timeout" are the
    /// retryable signatures, everything else is fatal.
    pub fn is_retryable_text(text: &str) -> bool {
        let lower = text.to_ascii_lowercase();
        lower.contains("locked") || lower.contains("busy") || lower.contains("timeout")
    }
}

pub type Result<T> = std::result::Result<T, SentinelError>;
