//! Error types for the change-watcher.

use crate::models::{NotificationKind, ResumeToken};
use thiserror::Error;

/// Errors returned by an [`crate::ObjectStore`] or read from a watch session.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection-level failure (timeout, reset, TLS, etc.)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Store answered with a non-success status
    #[error("Store API error ({code}): {message}")]
    Api {
        /// Status code
        code: u16,
        /// Status message
        message: String,
    },

    /// Resume token is no longer served by the store
    #[error("Resume token expired: {0}")]
    TokenExpired(String),

    /// Payload for the watched object could not be understood
    #[error("Malformed store payload: {0}")]
    Decode(String),
}

impl StoreError {
    /// Whether this error asks for a full resync instead of a retry.
    #[must_use]
    pub fn is_token_expired(&self) -> bool {
        matches!(self, Self::TokenExpired(_))
    }

    /// Whether retrying cannot help.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

impl From<kube::Error> for StoreError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(status) if status.code == 410 => {
                Self::TokenExpired(status.message.clone())
            }
            kube::Error::Api(status) => Self::Api {
                code: status.code,
                message: status.message.clone(),
            },
            kube::Error::SerdeError(e) => Self::Decode(e.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Raised by the [`crate::Dispatcher`] when a notification does not fit the
/// tracked state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// Modified/Deleted arrived while nothing was tracked
    #[error("{kind} received with no prior tracked state")]
    MissingPriorState {
        /// Offending notification kind
        kind: NotificationKind,
    },

    /// Added arrived while an object was already tracked
    #[error("ADDED received while object at version {tracked} is still tracked")]
    UnexpectedPriorState {
        /// Version of the tracked snapshot
        tracked: ResumeToken,
    },

    /// Notification repeats the tracked snapshot's version
    #[error("{kind} at version {resource_version} was already delivered")]
    Duplicate {
        /// Offending notification kind
        kind: NotificationKind,
        /// Repeated version
        resource_version: ResumeToken,
    },

    /// Notification is about a different object
    #[error("Notification for {actual} does not match watched object {expected}")]
    ForeignObject {
        /// Watched identity
        expected: String,
        /// Identity carried by the notification
        actual: String,
    },
}

impl DispatchError {
    /// Whether the loop should discard its session and resync.
    #[must_use]
    pub fn requires_resync(&self) -> bool {
        matches!(
            self,
            Self::MissingPriorState { .. } | Self::UnexpectedPriorState { .. }
        )
    }
}

/// Fatal conditions that end [`crate::ChangeWatcher::run`].
#[derive(Debug, Error)]
pub enum WatchError {
    /// Non-retryable store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Event stream contradicted the tracked state
    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),
}
