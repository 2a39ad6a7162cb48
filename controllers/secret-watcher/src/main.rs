//! Secret Watcher
//!
//! Watches a single Kubernetes Secret and logs when it is created, updated or
//! deleted, printing its decoded data.
//!
//! The Secret is identified by `SECRET_NAMESPACE` and `SECRET_NAME`; both are
//! required.

mod config;
mod controller;
mod error;
mod presenter;

use crate::config::WatcherConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    // kube's TLS stack may link more than one rustls provider; pin ring
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        debug!("rustls crypto provider already installed");
    }

    // Load configuration from environment variables
    let config = WatcherConfig::from_env()?;

    info!(
        "Starting secret watcher for secret '{}' in namespace '{}'",
        config.selector.name, config.selector.namespace
    );
    config.log();

    // Initialize and run controller
    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
