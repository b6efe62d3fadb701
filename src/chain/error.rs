use thiserror::Error;

/// Failure of a single chain read.
///
/// The variants are distinguished so the valuation fallback ladder can tell a
/// wrong identifier apart from an unreachable node or a garbled response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    /// The call reverted or the target holds no contract code
    #[error("not found: {0}")]
    NotFound(String),

    /// Transport-level failure (connection refused, HTTP error, ...)
    #[error("network error: {0}")]
    Network(String),

    /// The node answered but the payload could not be decoded
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The read did not complete within the configured timeout
    #[error("timed out: {0}")]
    Timeout(String),

    /// No endpoint or contract address configured for the chain
    #[error("not configured: {0}")]
    Unconfigured(String),
}

impl ChainError {
    /// Provider/network unavailability, as opposed to a negative answer
    pub fn is_network(&self) -> bool {
        matches!(self, ChainError::Network(_) | ChainError::Timeout(_))
    }
}
