use thiserror::Error;

/// Errors from the similarity store boundary.
///
/// All of these are treated as transient by the memory layer: writes are
/// dropped and reads are treated as "no memories found".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection error: {0}")]
    Connection(String),

    #[error("store operation timed out after {0} ms")]
    Timeout(u64),

    #[error("query error: {0}")]
    Query(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("store unavailable")]
    Unavailable,
}

/// Errors from the base conversational agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent request failed: {0}")]
    Request(String),

    #[error("agent returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed agent stream: {0}")]
    Stream(String),
}

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("memory_threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f32),

    #[error("memory_top_k must be at least 1")]
    InvalidTopK,

    #[error("user_id must not be empty")]
    EmptyUserId,

    #[error("unsupported embedder provider '{0}' (only \"ollama\" is available)")]
    UnsupportedProvider(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("failed to read config: {0}")]
    Io(String),
}

/// Fatal errors while bringing the memory layer up.
///
/// The layer must not run partially initialized, so these surface to the
/// caller at startup.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot create data directory '{path}': {reason}")]
    DataDir { path: String, reason: String },

    #[error("cannot open memory store: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Timeout(3000);
        assert_eq!(err.to_string(), "store operation timed out after 3000 ms");
    }

    #[test]
    fn test_init_error_wraps_sources() {
        let err: InitError = ConfigError::InvalidThreshold(1.5).into();
        assert_eq!(
            err.to_string(),
            "invalid configuration: memory_threshold must be within [0, 1], got 1.5"
        );

        let err: InitError = StoreError::Connection("refused".to_string()).into();
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_agent_status_error_display() {
        let err = AgentError::Status {
            status: 404,
            body: "model not found".to_string(),
        };
        assert_eq!(err.to_string(), "agent returned status 404: model not found");
    }
}
