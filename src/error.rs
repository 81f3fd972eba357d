//! Error taxonomy for the ingestion pipeline

use thiserror::Error;

/// Failures surfaced by the external stats / identity API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API rejected a burst of requests. The rate limiter has been told
    /// to cool down; callers retry after the cooldown.
    #[error("rate limited by upstream API")]
    RateLimited,

    /// Connection-level or 5xx failure worth retrying.
    #[error("transient API failure: {0}")]
    Transient(String),

    /// The requested resource does not exist. Asset and profile lookups map
    /// this to an absent value instead of propagating it.
    #[error("resource not found")]
    NotFound,

    /// The auth session has expired (401/403); the caller must refresh the
    /// token pair before retrying.
    #[error("API session expired")]
    SessionExpired,

    /// The response body could not be decoded into the expected shape.
    #[error("failed to decode API response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether a bounded retry is worth attempting for this failure.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Transient(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transient(err.to_string())
        }
    }
}

/// Failure of a single unit of ingestion work (one match, one profile batch).
/// A unit failure is recorded in the run summary, never aborts the run.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] crate::store::StoreError),

    #[error("failed to fetch match {match_id}: {source}")]
    Match {
        match_id: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to resolve profiles for {count} players: {source}")]
    ProfileBatch {
        count: usize,
        #[source]
        source: ApiError,
    },
}

/// Result of a conflict-tolerant insert. Duplicate keys are an expected
/// outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    AlreadyExists,
}

impl UpsertOutcome {
    pub fn created(&self) -> bool {
        matches!(self, UpsertOutcome::Created)
    }
}
