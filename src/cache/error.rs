use thiserror::Error;

use crate::models::FilterKey;

/// Failures surfaced by [`ContentCache`](super::ContentCache).
///
/// Cloneable because one coalesced fetch hands the same outcome to every
/// caller awaiting it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// A read could not reach the provider and nothing was cached
    #[error("remote unavailable: {reason}")]
    RemoteUnavailable {
        /// Provider failure
        reason: String,
    },

    /// Fetching a feed page failed; pages already loaded are untouched
    #[error("failed to fetch page {page} of feed {key}: {reason}")]
    FetchFailed {
        /// Feed being paged
        key: FilterKey,
        /// Page that failed
        page: u32,
        /// Provider failure
        reason: String,
    },

    /// A write was attempted without a session token
    #[error("authentication required")]
    AuthenticationRequired,

    /// The local store did not confirm a write
    #[error("failed to persist local state: {reason}")]
    PersistenceFailed {
        /// Store failure
        reason: String,
    },

    /// The fetch finished after its feed was reset or the session changed
    #[error("page {page} of feed {key} was superseded")]
    Superseded {
        /// Feed the fetch belonged to
        key: FilterKey,
        /// Page that was discarded
        page: u32,
    },

    /// Page numbers start at 1
    #[error("invalid page number {0}")]
    InvalidPage(u32),

    /// Caller input was rejected before any I/O
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A write or login reached the provider and was refused
    #[error("request failed: {reason}")]
    RequestFailed {
        /// Provider failure
        reason: String,
    },
}

impl CacheError {
    pub(crate) fn persistence(err: impl std::fmt::Display) -> Self {
        Self::PersistenceFailed {
            reason: err.to_string(),
        }
    }

    /// Whether retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RemoteUnavailable { .. }
                | Self::FetchFailed { .. }
                | Self::PersistenceFailed { .. }
                | Self::Superseded { .. }
                | Self::RequestFailed { .. }
        )
    }
}
