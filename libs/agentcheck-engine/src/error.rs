use agentcheck_common::types::ValidationError;
use uuid::Uuid;

/// Failure of a single provider call. Never aborts a suite: the executor
/// maps it onto an `error` test result.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed provider response: {0}")]
    Malformed(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Execution id collision: {0}")]
    Collision(Uuid),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure of a whole executor call, as opposed to a failed test
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to record execution: {0}")]
    Store(#[from] StoreError),

    #[error("Execution not found: {0}")]
    NotFound(Uuid),
}
