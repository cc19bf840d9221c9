//! Error types for the domain client.

use crate::classify::RATE_LIMIT_STATUSES;
use crate::transport::TransportError;
use rategate_core::DomainKey;
use rategate_store::StoreError;
use std::time::Duration;

/// Errors returned by a [`DomainClient`](crate::DomainClient).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The domain answered with a status that is not retried.
    #[error("{domain}: request failed with status {status}")]
    Status {
        domain: DomainKey,
        status: u16,
        body: String,
    },

    /// The transport failed before a response arrived.
    #[error("{domain}: {source}")]
    Transport {
        domain: DomainKey,
        #[source]
        source: TransportError,
    },

    /// Every attempt ended in a retryable status.
    #[error("{domain}: failed after {attempts} attempts, last status {last_status}")]
    RetriesExhausted {
        domain: DomainKey,
        attempts: usize,
        last_status: u16,
    },

    /// The domain's rate-limit configuration could not be read.
    #[error("{domain}: failed to read rate-limit config: {source}")]
    Config {
        domain: DomainKey,
        #[source]
        source: StoreError,
    },

    /// The caller cancelled the request.
    #[error("{domain}: request cancelled")]
    Cancelled { domain: DomainKey },

    /// The request did not finish within the client's deadline.
    #[error("{domain}: deadline of {deadline:?} exceeded")]
    DeadlineExceeded { domain: DomainKey, deadline: Duration },
}

impl ClientError {
    /// The domain the failed request was sent to.
    pub fn domain(&self) -> &DomainKey {
        match self {
            ClientError::Status { domain, .. }
            | ClientError::Transport { domain, .. }
            | ClientError::RetriesExhausted { domain, .. }
            | ClientError::Config { domain, .. }
            | ClientError::Cancelled { domain }
            | ClientError::DeadlineExceeded { domain, .. } => domain,
        }
    }

    /// The last HTTP status seen, if the domain answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::RetriesExhausted { last_status, .. } => Some(*last_status),
            _ => None,
        }
    }

    /// Returns true if the request ultimately failed on a rate-limit status.
    pub fn is_rate_limited(&self) -> bool {
        self.status()
            .is_some_and(|status| RATE_LIMIT_STATUSES.contains(&status))
    }

    /// Returns true if the request ran out of attempts.
    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, ClientError::RetriesExhausted { .. })
    }

    /// Returns true if the request was cancelled or hit its deadline.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            ClientError::Cancelled { .. } | ClientError::DeadlineExceeded { .. }
        )
    }
}
