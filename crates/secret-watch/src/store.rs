//! Object store boundary.
//!
//! The change-watcher only talks to the store through [`ObjectStore`], so the
//! Kubernetes-backed implementation can be swapped for a scripted one in tests.

use crate::error::StoreError;
use crate::models::{Listing, ObjectSelector, RawEvent, ResumeToken};
use futures::StreamExt;
use futures::stream::BoxStream;

/// Point-in-time reads and streaming change feeds for one object.
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read the current state of the selected object.
    async fn list(&self, selector: &ObjectSelector) -> Result<Listing, StoreError>;

    /// Open a change feed for the selected object starting after `token`.
    async fn watch(
        &self,
        selector: &ObjectSelector,
        token: &ResumeToken,
    ) -> Result<WatchSession, StoreError>;
}

/// One open streaming connection to the change feed.
///
/// Dropping the session closes the connection.
pub struct WatchSession {
    events: BoxStream<'static, Result<RawEvent, StoreError>>,
}

impl WatchSession {
    /// Wrap a stream of raw events.
    pub fn new(events: BoxStream<'static, Result<RawEvent, StoreError>>) -> Self {
        Self { events }
    }

    /// Wait for the next item; `None` once the store closed the stream.
    pub async fn next_event(&mut self) -> Option<Result<RawEvent, StoreError>> {
        self.events.next().await
    }
}

impl std::fmt::Debug for WatchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSession").finish_non_exhaustive()
    }
}
