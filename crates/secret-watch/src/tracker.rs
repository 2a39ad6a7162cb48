//! Resume token tracking.
//!
//! Holds the position to resume the change feed from and the last object
//! snapshot handed to the handler. Purely in-memory; a restart starts empty and
//! the next full sync repopulates it.
//!
//! Resource versions are opaque and cannot be ordered, so every reconnect
//! resumes from the fresh listing's token rather than the tracked one. The
//! tracked token (advanced by bookmarks between notifications) is the
//! position the loop last observed, exposed for callers and diagnostics.

use crate::models::{ResumeToken, WatchedObject};

/// Last resume token plus last delivered snapshot.
#[derive(Debug, Default, Clone)]
pub struct ResumeTokenTracker {
    token: Option<ResumeToken>,
    last_object: Option<WatchedObject>,
}

impl ResumeTokenTracker {
    /// Empty tracker: no token, nothing delivered yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current token and last delivered snapshot.
    #[must_use]
    pub fn get(&self) -> (Option<&ResumeToken>, Option<&WatchedObject>) {
        (self.token.as_ref(), self.last_object.as_ref())
    }

    /// Record a newly observed position together with the state the handler
    /// now holds (`None` once the object is gone).
    pub fn set(&mut self, token: ResumeToken, object: Option<WatchedObject>) {
        self.token = Some(token);
        self.last_object = object;
    }

    /// Move the token forward without touching the delivered snapshot.
    ///
    /// Used for bookmarks; the next full sync replaces it with the listing's
    /// token.
    pub fn advance(&mut self, token: ResumeToken) {
        self.token = Some(token);
    }

    /// Drop the token so the next connect starts from a full resync.
    ///
    /// The snapshot survives: reconciliation diffs against it.
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Current resume token.
    #[must_use]
    pub fn token(&self) -> Option<&ResumeToken> {
        self.token.as_ref()
    }

    /// Last snapshot handed to the handler.
    #[must_use]
    pub fn last_object(&self) -> Option<&WatchedObject> {
        self.last_object.as_ref()
    }
}
