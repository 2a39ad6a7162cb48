//! Controller-specific error types.
//!
//! This module defines error types specific to the Secret Watcher binary
//! that are not covered by the watch library's errors.

use kube::Error as KubeError;
use secret_watch::WatchError;
use thiserror::Error;

/// Errors that can occur in the Secret Watcher.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes client setup error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Watch ended on a fatal condition
    #[error("Secret watch failed: {0}")]
    Watch(#[from] WatchError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Shutdown signal handler could not be installed
    #[error("Signal handling failed: {0}")]
    Signal(#[from] std::io::Error),

    /// Watcher task panicked or was aborted
    #[error("Watcher task failed: {0}")]
    TaskFailed(String),
}
