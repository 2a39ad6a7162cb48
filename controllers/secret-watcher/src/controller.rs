//! Main controller implementation.
//!
//! This module contains the `Controller` struct that owns the change-watcher
//! task and ties it to process shutdown.

use crate::config::WatcherConfig;
use crate::error::ControllerError;
use crate::presenter::SecretPresenter;
use kube::Client;
use secret_watch::{ChangeWatcher, KubeSecretStore, ObjectStore, WatchError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Main controller for the Secret Watcher.
pub struct Controller {
    secret_watcher: JoinHandle<Result<(), WatchError>>,
    shutdown: CancellationToken,
}

impl Controller {
    /// Creates a new controller instance and starts the watcher task.
    pub async fn new(config: WatcherConfig) -> Result<Self, ControllerError> {
        info!("Initializing Secret Watcher");

        // Create Kubernetes client
        let kube_client = Client::try_default().await?;

        Ok(Self::with_store(KubeSecretStore::new(kube_client), config))
    }

    /// Starts the watcher task against an arbitrary store.
    pub fn with_store<S>(store: S, config: WatcherConfig) -> Self
    where
        S: ObjectStore + 'static,
    {
        let mut watcher = ChangeWatcher::new(store, config.selector, config.watch);
        let shutdown = CancellationToken::new();

        // Start watcher in background task
        let cancel = shutdown.clone();
        let secret_watcher = tokio::spawn(async move {
            let presenter = SecretPresenter;
            watcher.run(&presenter, &cancel).await
        });

        Self {
            secret_watcher,
            shutdown,
        }
    }

    /// Runs the controller until shutdown or a fatal watch error.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Secret watcher is running...");

        let result = tokio::select! {
            result = &mut self.secret_watcher => result,
            signal = shutdown_signal() => {
                signal?;
                self.shutdown.cancel();
                (&mut self.secret_watcher).await
            }
        };

        result
            .map_err(|e| ControllerError::TaskFailed(format!("Secret watcher panicked: {e}")))?
            .map_err(|e| {
                error!("Secret watcher stopped: {}", e);
                ControllerError::Watch(e)
            })?;

        info!("Secret watcher shut down");
        Ok(())
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("cancelled", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Graceful shutdown handler
///
/// Resolves on SIGTERM (Kubernetes) or Ctrl+C.
async fn shutdown_signal() -> Result<(), std::io::Error> {
    use tokio::signal;

    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("Received Ctrl+C signal, shutting down gracefully...");
            }
            _ = terminate.recv() => {
                info!("Received SIGTERM signal, shutting down gracefully...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C signal, shutting down gracefully...");
    }

    Ok(())
}
