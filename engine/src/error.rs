use thiserror::Error;

/// Errors surfaced by the search engine.
///
/// Empty results are not errors: a query with no matches (or no published
/// snapshot) comes back as a normal response with `total = 0`. Only store
/// misconfiguration and data corruption are worth failing a request over;
/// single-key lookup failures during retrieval are logged and degrade
/// relevance instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Backing store unreachable or not configured. Fatal to the caller.
    #[error("store not configured: {0}")]
    Configuration(String),

    #[error("store error: {0}")]
    Store(#[from] sled::Error),

    #[error("corrupt value under key {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("encode error: {0}")]
    Encode(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
