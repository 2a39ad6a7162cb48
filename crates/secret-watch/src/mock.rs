//! Mock object store for unit testing
//!
//! Scripted, in-memory implementation of [`ObjectStore`]: tests queue list
//! results and watch sessions up front, then run the change-watcher against
//! it without a cluster.

use crate::error::StoreError;
use crate::models::{Listing, ObjectSelector, RawEvent, ResumeToken, WatchedObject};
use crate::store::{ObjectStore, WatchSession};
use futures::StreamExt;
use futures::stream;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

/// One scripted watch session.
#[derive(Debug)]
pub struct MockSession {
    events: Vec<Result<RawEvent, StoreError>>,
    hang: bool,
}

impl MockSession {
    /// Session that yields `events` and then closes (end of stream).
    #[must_use]
    pub fn closing(events: Vec<Result<RawEvent, StoreError>>) -> Self {
        Self { events, hang: false }
    }

    /// Session that yields `events` and then stays open forever.
    #[must_use]
    pub fn hanging(events: Vec<Result<RawEvent, StoreError>>) -> Self {
        Self { events, hang: true }
    }

    fn into_session(self) -> WatchSession {
        let events = stream::iter(self.events);
        if self.hang {
            WatchSession::new(events.chain(stream::pending()).boxed())
        } else {
            WatchSession::new(events.boxed())
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    listings: VecDeque<Result<Listing, StoreError>>,
    last_listing: Option<Listing>,
    sessions: VecDeque<Result<MockSession, StoreError>>,
    list_calls: usize,
    watch_tokens: Vec<ResumeToken>,
    on_exhausted: Option<CancellationToken>,
}

/// Mock object store for testing
///
/// When the list queue is empty the last successful listing is repeated.
/// When the session queue is empty `watch` returns a session that never
/// yields, after cancelling the token registered with
/// [`MockObjectStore::cancel_when_exhausted`].
#[derive(Debug, Clone, Default)]
pub struct MockObjectStore {
    state: Arc<Mutex<MockState>>,
}

impl MockObjectStore {
    /// Create an empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a successful list result.
    pub fn push_listing(&self, object: Option<WatchedObject>, token: &str) -> &Self {
        self.state().listings.push_back(Ok(Listing {
            object,
            token: ResumeToken::new(token),
        }));
        self
    }

    /// Queue a failing list call.
    pub fn push_list_error(&self, error: StoreError) -> &Self {
        self.state().listings.push_back(Err(error));
        self
    }

    /// Queue a watch session.
    pub fn push_session(&self, session: MockSession) -> &Self {
        self.state().sessions.push_back(Ok(session));
        self
    }

    /// Queue a failing watch call.
    pub fn push_watch_error(&self, error: StoreError) -> &Self {
        self.state().sessions.push_back(Err(error));
        self
    }

    /// Cancel `token` once every scripted session has been handed out.
    pub fn cancel_when_exhausted(&self, token: CancellationToken) -> &Self {
        self.state().on_exhausted = Some(token);
        self
    }

    /// Number of list calls made so far.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.state().list_calls
    }

    /// Tokens passed to `watch`, in call order.
    #[must_use]
    pub fn watch_tokens(&self) -> Vec<ResumeToken> {
        self.state().watch_tokens.clone()
    }
}

#[async_trait::async_trait]
impl ObjectStore for MockObjectStore {
    async fn list(&self, _selector: &ObjectSelector) -> Result<Listing, StoreError> {
        let mut state = self.state();
        state.list_calls += 1;
        match state.listings.pop_front() {
            Some(Ok(listing)) => {
                state.last_listing = Some(listing.clone());
                Ok(listing)
            }
            Some(Err(err)) => Err(err),
            None => Ok(state.last_listing.clone().unwrap_or_else(|| Listing {
                object: None,
                token: ResumeToken::new("0"),
            })),
        }
    }

    async fn watch(
        &self,
        _selector: &ObjectSelector,
        token: &ResumeToken,
    ) -> Result<WatchSession, StoreError> {
        let mut state = self.state();
        state.watch_tokens.push(token.clone());
        match state.sessions.pop_front() {
            Some(Ok(session)) => Ok(session.into_session()),
            Some(Err(err)) => Err(err),
            None => {
                if let Some(cancel) = &state.on_exhausted {
                    cancel.cancel();
                }
                Ok(WatchSession::new(stream::pending().boxed()))
            }
        }
    }
}
