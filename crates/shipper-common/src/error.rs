//! Error types for the Shipper controllers
//!
//! Errors are structured with fields to aid debugging in production.
//! Each variant carries the release or object it concerns so that a
//! stalled rollout can be diagnosed from the log line alone.

use thiserror::Error;

/// Main error type for Shipper operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Validation error for a release or one of its target objects
    #[error("validation error for {release}: {message}")]
    Validation {
        /// Namespaced key of the release with invalid data
        release: String,
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g., "metadata.annotations")
        field: Option<String>,
    },

    /// The release's strategy cannot be executed as declared.
    ///
    /// Never retried: a human or upstream system must fix the release spec.
    #[error("unrecoverable strategy error for {release}: {message}")]
    UnrecoverableStrategy {
        /// Namespaced key of the release
        release: String,
        /// Description of what's wrong with the strategy
        message: String,
    },

    /// Optimistic concurrency failure while writing an object
    #[error("conflict writing {kind} {name}: object changed since it was read")]
    Conflict {
        /// Kind of the object being written (Release, CapacityTarget, ...)
        kind: String,
        /// Name of the object being written
        name: String,
    },

    /// A required object is missing
    #[error("{kind} {name} not found")]
    NotFound {
        /// Kind of the missing object
        kind: String,
        /// Name of the missing object (or the owning application)
        name: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },
}

impl Error {
    /// Create a validation error with release context and field path
    pub fn validation_for_field(
        release: impl Into<String>,
        field: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Validation {
            release: release.into(),
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create an unrecoverable strategy error for a release
    pub fn unrecoverable_strategy(release: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::UnrecoverableStrategy {
            release: release.into(),
            message: msg.into(),
        }
    }

    /// Create a write-conflict error
    pub fn conflict(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Conflict {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Map a kube error raised while writing `kind/name`.
    ///
    /// HTTP 409 becomes [`Error::Conflict`] so callers can tell a stale read
    /// apart from other API failures.
    pub fn from_write(kind: &str, name: &str, err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 409 => Self::conflict(kind, name),
            other => Self::Kube { source: other },
        }
    }

    /// Check if this error is retryable
    ///
    /// Validation, strategy and serialization errors are not retryable
    /// (they require a spec fix). Conflicts are retried with a fresh read.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => !matches!(
                source,
                kube::Error::Api(ae) if (400..500).contains(&ae.code) && ae.code != 409
            ),
            Error::Validation { .. } => false,
            Error::UnrecoverableStrategy { .. } => false,
            Error::Conflict { .. } => true,
            Error::NotFound { .. } => true,
            Error::Serialization { .. } => false,
        }
    }

    /// Get the release key if this error is associated with a specific release
    pub fn release(&self) -> Option<&str> {
        match self {
            Error::Validation { release, .. } => Some(release),
            Error::UnrecoverableStrategy { release, .. } => Some(release),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}
