//! Secret Change-Watcher
//!
//! Keeps a live, resumable view of one Kubernetes Secret and turns the API
//! server's change feed into an ordered sequence of lifecycle events.
//!
//! # Example
//!
//! ```no_run
//! use kube::Client;
//! use secret_watch::{ChangeEvent, ChangeWatcher, KubeSecretStore, ObjectSelector, WatchConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::try_default().await?;
//! let selector = ObjectSelector::new("default", "app-credentials");
//!
//! let mut watcher = ChangeWatcher::new(
//!     KubeSecretStore::new(client),
//!     selector,
//!     WatchConfig::default(),
//! );
//!
//! let handler = |event: ChangeEvent| println!("{} {}", event.kind(), event.object().name);
//! watcher.run(&handler, &CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Guarantees
//!
//! - **Full sync on every (re)connect**: the object is listed before each watch
//!   session and diffed against the last delivered state, so changes missed
//!   while disconnected surface as synthetic `Modified`/`Deleted` events
//! - **Ordering**: events reach the handler in the order they were observed,
//!   one at a time
//! - **Retry**: transport failures are retried forever with capped,
//!   jittered exponential backoff
//! - **Cancellation**: every blocking point observes a `CancellationToken`

pub mod backoff;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod kube_store;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod models;
pub mod presentation;
pub mod store;
pub mod tracker;
pub mod watcher;


pub use backoff::ExponentialBackoff;
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, StoreError, WatchError};
pub use handler::EventHandler;
pub use kube_store::KubeSecretStore;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockObjectStore, MockSession};
pub use models::*;
pub use presentation::{FieldValue, RenderedField, decode_field, render_fields};
pub use store::{ObjectStore, WatchSession};
pub use tracker::ResumeTokenTracker;
pub use watcher::{ChangeWatcher, WatchConfig};
