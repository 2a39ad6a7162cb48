//! Change-watcher loop.
//!
//! Keeps one object's view current for as long as the process runs:
//!
//! 1. **Full sync**: list the object, reconcile against the last delivered
//!    state and emit whatever synthetic events close the gap
//! 2. **Watch**: open a session at the listing's token and dispatch each
//!    notification to the handler in order
//! 3. **Reconnect**: when the session ends, go back to 1, after a backoff
//!    delay if the store misbehaved
//!
//! Transient failures never leave `run`; malformed payloads and a store that
//! contradicts its own listing do.

use crate::backoff::ExponentialBackoff;
use crate::dispatcher::Dispatcher;
use crate::error::{DispatchError, StoreError, WatchError};
use crate::handler::EventHandler;
use crate::models::{ObjectSelector, RawEvent};
use crate::store::ObjectStore;
use crate::tracker::ResumeTokenTracker;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Back-to-back token expiries resynced immediately before backing off
const EXPIRY_RESYNC_LIMIT: u32 = 3;

/// Reconnect tuning for [`ChangeWatcher`].
#[derive(Debug, Clone, PartialEq)]
pub struct WatchConfig {
    /// First reconnect delay
    pub initial_backoff: Duration,
    /// Longest reconnect delay
    pub max_backoff: Duration,
    /// Random extra delay as a fraction of the base delay
    pub jitter: f64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(800),
            max_backoff: Duration::from_secs(30),
            jitter: 0.25,
        }
    }
}

/// How a sync/watch cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cycle {
    /// Cancellation observed
    Cancelled,
    /// Reconnect now
    Resync,
    /// Reconnect after a backoff delay
    Retry,
}

/// Watches one object and feeds its lifecycle events to a handler.
#[derive(Debug)]
pub struct ChangeWatcher<S> {
    store: S,
    selector: ObjectSelector,
    dispatcher: Dispatcher,
    tracker: ResumeTokenTracker,
    backoff: ExponentialBackoff,
    expiries: u32,
}

impl<S: ObjectStore> ChangeWatcher<S> {
    /// Create a watcher for `selector` backed by `store`.
    pub fn new(store: S, selector: ObjectSelector, config: WatchConfig) -> Self {
        Self {
            store,
            dispatcher: Dispatcher::new(selector.clone()),
            selector,
            tracker: ResumeTokenTracker::new(),
            backoff: ExponentialBackoff::new(config.initial_backoff, config.max_backoff, config.jitter),
            expiries: 0,
        }
    }

    /// Tracked token and last delivered state.
    #[must_use]
    pub fn tracker(&self) -> &ResumeTokenTracker {
        &self.tracker
    }

    /// Reconnect delays taken since the last healthy session.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.backoff.attempt()
    }

    /// Run until `cancel` fires, delivering events to `handler`.
    ///
    /// Calling `run` again after it returned keeps the tracked state, so the
    /// next full sync reconciles against what the handler last saw.
    ///
    /// # Errors
    ///
    /// - [`WatchError::Store`] for a malformed store payload
    /// - [`WatchError::Dispatch`] when the stream contradicts the state
    ///   established by the full sync that preceded it, or names another object
    pub async fn run<H>(&mut self, handler: &H, cancel: &CancellationToken) -> Result<(), WatchError>
    where
        H: EventHandler + ?Sized,
    {
        info!("Starting change watcher for {}", self.selector);

        loop {
            match self.cycle(handler, cancel).await? {
                Cycle::Cancelled => break,
                Cycle::Resync => {}
                Cycle::Retry => {
                    let delay = self.backoff.next_backoff();
                    info!(
                        "Reconnecting to {} in {:?} (attempt {})",
                        self.selector,
                        delay,
                        self.backoff.attempt()
                    );
                    if until_cancelled(cancel, tokio::time::sleep(delay)).await.is_none() {
                        break;
                    }
                }
            }
        }

        info!("Change watcher for {} stopped", self.selector);
        Ok(())
    }

    /// One full sync followed by one watch session.
    async fn cycle<H>(&mut self, handler: &H, cancel: &CancellationToken) -> Result<Cycle, WatchError>
    where
        H: EventHandler + ?Sized,
    {
        let listing = match until_cancelled(cancel, self.store.list(&self.selector)).await {
            None => return Ok(Cycle::Cancelled),
            Some(Ok(listing)) => listing,
            Some(Err(err)) => return self.absorb(err),
        };
        let token = listing.token.clone();

        let synthetic = self.dispatcher.reconcile(listing, &mut self.tracker)?;
        debug!(
            "Full sync of {} at {} produced {} event(s)",
            self.selector,
            token,
            synthetic.len()
        );
        for event in synthetic {
            handler.on_event(event);
        }

        let mut session = match until_cancelled(cancel, self.store.watch(&self.selector, &token)).await {
            None => return Ok(Cycle::Cancelled),
            Some(Ok(session)) => session,
            Some(Err(err)) => return self.absorb(err),
        };
        debug!("Watch session for {} opened at {}", self.selector, token);

        // Events handed to the handler / any item read, this session
        let mut delivered = 0usize;
        let mut healthy = false;
        loop {
            let raw = match until_cancelled(cancel, session.next_event()).await {
                None => return Ok(Cycle::Cancelled),
                Some(None) => {
                    debug!("Watch session for {} closed by store", self.selector);
                    return Ok(if healthy { Cycle::Resync } else { Cycle::Retry });
                }
                Some(Some(Err(err))) => return self.absorb(err),
                Some(Some(Ok(raw))) => raw,
            };

            if !healthy && matches!(raw, RawEvent::Object(_) | RawEvent::Bookmark(_)) {
                healthy = true;
                self.backoff.reset();
                self.expiries = 0;
            }

            match raw {
                RawEvent::Object(notification) => {
                    match self.dispatcher.dispatch(notification, &mut self.tracker) {
                        Ok(event) => {
                            handler.on_event(event);
                            delivered += 1;
                        }
                        Err(DispatchError::Duplicate { kind, resource_version }) => {
                            debug!("Suppressed duplicate {} at {}", kind, resource_version);
                        }
                        Err(err) if err.requires_resync() && delivered > 0 => {
                            warn!("Forcing resync of {}: {}", self.selector, err);
                            self.tracker.clear_token();
                            return Ok(Cycle::Resync);
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                RawEvent::Bookmark(token) => self.tracker.advance(token),
                RawEvent::TokenExpired(reason) => {
                    info!("Resume token for {} expired ({})", self.selector, reason);
                    return Ok(self.expired());
                }
                RawEvent::Error { code, message } => {
                    warn!(
                        "Watch stream for {} reported error (code {:?}): {}",
                        self.selector, code, message
                    );
                    return Ok(Cycle::Retry);
                }
            }
        }
    }

    /// Classify a store failure: fatal errors propagate, expiry resyncs,
    /// everything else waits and retries.
    fn absorb(&mut self, err: StoreError) -> Result<Cycle, WatchError> {
        if err.is_fatal() {
            return Err(err.into());
        }
        if err.is_token_expired() {
            info!("Resume token for {} expired", self.selector);
            return Ok(self.expired());
        }
        info!("Transient error watching {}: {}", self.selector, err);
        Ok(Cycle::Retry)
    }

    /// Drop the expired token and resync; a store that keeps expiring fresh
    /// listings gets the backoff delay instead.
    fn expired(&mut self) -> Cycle {
        self.tracker.clear_token();
        self.expiries = self.expiries.saturating_add(1);
        if self.expiries > EXPIRY_RESYNC_LIMIT {
            warn!(
                "Resume token for {} expired {} times in a row, backing off",
                self.selector, self.expiries
            );
            Cycle::Retry
        } else {
            Cycle::Resync
        }
    }
}

/// Await `future` unless `cancel` fires first.
async fn until_cancelled<F: Future>(cancel: &CancellationToken, future: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        output = future => Some(output),
    }
}
