//! Error types for topic synchronization.
//!
//! Two layers: [`ForumClientError`] describes what went wrong talking to a
//! remote HTTP API, while [`SyncError`] classifies a whole run for the caller
//! (authorization, dependency, or mutation failure).

use std::fmt;
use thiserror::Error;

use crate::identity::TopicId;
use crate::report::SyncReport;

/// Result alias for HTTP client operations.
pub type ForumClientResult<T> = Result<T, ForumClientError>;

/// Result alias for a sync run.
pub type SyncResult<T> = Result<T, SyncError>;

/// Error returned by the forum and roster HTTP clients.
#[derive(Debug, Error)]
pub enum ForumClientError {
    /// The requested resource does not exist (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller is not allowed to access the resource (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Credentials were rejected (401).
    #[error("authentication failed: {0}")]
    AuthError(String),

    /// The remote API is throttling requests (429).
    #[error("rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Any other non-success status.
    #[error("API error {status}: {detail}")]
    ApiError { status: u16, detail: String },

    /// Transport failure (connect, timeout, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body could not be decoded.
    #[error("parse error: {0}")]
    ParseError(String),

    /// The client was configured with unusable settings.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for ForumClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl ForumClientError {
    /// Whether a transport-level retry could plausibly succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Whether the remote API answered with a 5xx status.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }
}

/// Error returned by a [`crate::traits::RosterSource`].
#[derive(Debug, Error)]
pub enum RosterError {
    /// The caller has no access to the reference entity.
    #[error("access to the reference entity was denied: {0}")]
    Forbidden(String),

    /// No endpoint is registered for the reference type.
    #[error("unknown reference type: {0}")]
    UnknownReference(String),

    /// Any other failure fetching or decoding the roster.
    #[error("roster fetch failed: {0}")]
    Other(String),
}

impl From<ForumClientError> for RosterError {
    fn from(err: ForumClientError) -> Self {
        match err {
            ForumClientError::Forbidden(msg) => Self::Forbidden(msg),
            other => Self::Other(other.to_string()),
        }
    }
}

/// Error returned by a [`crate::traits::TopicLinkStore`] or
/// [`crate::traits::ReferenceLookup`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid stored value: {0}")]
    InvalidData(String),
}

/// Stage of a run at which a dependency failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Roster,
    Linkage,
    AllowList(TopicId),
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Roster => f.write_str("roster"),
            Self::Linkage => f.write_str("topic linkage"),
            Self::AllowList(topic) => write!(f, "allow-list of topic {topic}"),
        }
    }
}

/// Coarse classification used to pick a transport-level response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    Forbidden,
    BadRequest,
    Internal,
}

/// Failure of a whole sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The roster source denied access to the reference entity.
    #[error("authorization error: {message}")]
    Authorization { message: String },

    /// No roster endpoint is registered for the reference type.
    #[error("unknown reference type '{reference}'")]
    UnknownReference { reference: String },

    /// A roster, linkage, or allow-list fetch failed; nothing was mutated.
    #[error("dependency error while fetching {stage}: {message}")]
    Dependency { stage: FetchStage, message: String },

    /// One or more grant/revoke calls failed after all work was dispatched.
    #[error("{failed} of {attempted} access changes failed")]
    Mutation {
        failed: usize,
        attempted: usize,
        report: Box<SyncReport>,
    },
}

impl SyncError {
    pub(crate) fn dependency(stage: FetchStage, message: impl fmt::Display) -> Self {
        Self::Dependency {
            stage,
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            Self::Authorization { .. } => SyncErrorKind::Forbidden,
            Self::UnknownReference { .. } => SyncErrorKind::BadRequest,
            Self::Dependency { .. } | Self::Mutation { .. } => SyncErrorKind::Internal,
        }
    }

    /// The partial report of a run whose mutations failed.
    #[must_use]
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            Self::Mutation { report, .. } => Some(report),
            _ => None,
        }
    }
}

impl From<RosterError> for SyncError {
    fn from(err: RosterError) -> Self {
        match err {
            RosterError::Forbidden(message) => Self::Authorization { message },
            RosterError::UnknownReference(reference) => Self::UnknownReference { reference },
            RosterError::Other(message) => Self::Dependency {
                stage: FetchStage::Roster,
                message,
            },
        }
    }
}
