//! Error types for Filament
//!
//! Explicit error types with context, using thiserror. Every failure mode an
//! invocation caller can observe is a distinct variant.

use thiserror::Error;

/// Result type alias for Filament operations
pub type Result<T> = std::result::Result<T, Error>;

/// Filament error types
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Identity / Registration Errors
    // =========================================================================
    #[error("Invalid actor id: {id}, reason: {reason}")]
    InvalidActorId { id: String, reason: String },

    #[error("Unknown actor type: {actor_type}")]
    UnknownActorType { actor_type: String },

    // =========================================================================
    // Lifecycle Errors
    // =========================================================================
    #[error("Actor activation failed: {id}, reason: {reason}")]
    ActivationFailed { id: String, reason: String },

    // =========================================================================
    // Invocation Errors
    // =========================================================================
    #[error("Method not found: {method} on actor type {actor_type}")]
    MethodNotFound { actor_type: String, method: String },

    #[error("Actor method failed: {id}, method: {method}")]
    MethodFailed {
        id: String,
        method: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Reentrant call rejected: {id}, method: {method} (reentrancy disabled for this actor type)")]
    ReentrancyRejected { id: String, method: String },

    #[error("Invocation payload too large: {size} bytes, limit: {limit}")]
    PayloadTooLarge { size: usize, limit: usize },

    // =========================================================================
    // State Store Errors
    // =========================================================================
    #[error("State read failed: {key}, reason: {reason}")]
    StateReadFailed { key: String, reason: String },

    #[error("State commit failed: {reason}")]
    StateCommitFailed { reason: String },

    #[error("Invalid state field name: {field}, reason: {reason}")]
    InvalidFieldName { field: String, reason: String },

    // =========================================================================
    // Scheduler Errors
    // =========================================================================
    #[error("Scheduler persistence failed: {id}, name: {name}, reason: {reason}")]
    SchedulerPersistenceFailed {
        id: String,
        name: String,
        reason: String,
    },

    #[error("Invalid schedule: {name}, reason: {reason}")]
    InvalidSchedule { name: String, reason: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {field}, reason: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Serialization failed: {reason}")]
    SerializationFailed { reason: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create an activation failure error
    pub fn activation_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ActivationFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a method-not-found error
    pub fn method_not_found(actor_type: impl Into<String>, method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            actor_type: actor_type.into(),
            method: method.into(),
        }
    }

    /// Wrap a handler error as a method failure
    pub fn method_failed(id: impl Into<String>, method: impl Into<String>, source: Error) -> Self {
        Self::MethodFailed {
            id: id.into(),
            method: method.into(),
            source: Box::new(source),
        }
    }

    /// Create a state read failure error
    pub fn state_read_failed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StateReadFailed {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a state commit failure error
    pub fn state_commit_failed(reason: impl Into<String>) -> Self {
        Self::StateCommitFailed {
            reason: reason.into(),
        }
    }

    /// Create a scheduler persistence failure error
    pub fn scheduler_persistence_failed(
        id: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::SchedulerPersistenceFailed {
            id: id.into(),
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is retriable by the caller
    ///
    /// Retry policy itself is a caller concern; the core only classifies.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::StateReadFailed { .. }
                | Self::StateCommitFailed { .. }
                | Self::SchedulerPersistenceFailed { .. }
        )
    }
}
