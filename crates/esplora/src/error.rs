//! Errors from the explorer service.

use escrow_types::EscrowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EsploraError {
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Expected exactly one funding transaction for {address}, found {count}")]
    UnexpectedFundingCount { address: String, count: usize },

    #[error(transparent)]
    Escrow(#[from] EscrowError),
}

impl EsploraError {
    /// True for failures a caller may retry (transport errors and 5xx replies).
    pub fn is_transient(&self) -> bool {
        match self {
            EsploraError::Request { .. } => true,
            EsploraError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let timeout = EsploraError::Request {
            url: "https://mempool.space/api/tx".to_string(),
            reason: "timed out".to_string(),
        };
        assert!(timeout.is_transient());

        let unavailable = EsploraError::Api {
            status: 503,
            body: String::new(),
        };
        assert!(unavailable.is_transient());

        let rejected = EsploraError::from(EscrowError::BroadcastRejected("dust".to_string()));
        assert!(!rejected.is_transient());
        assert_eq!(rejected.to_string(), "Broadcast rejected: dust");
    }
}
