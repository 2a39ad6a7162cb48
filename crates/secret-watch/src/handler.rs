//! Event handler capability.

use crate::models::ChangeEvent;

/// Receives lifecycle events from the change-watcher.
///
/// Invoked synchronously, one event at a time, in delivery order; the next
/// event is not dispatched until `on_event` returns. Implementations must not
/// block for long or the watch stalls.
pub trait EventHandler: Send + Sync {
    /// Consume one event.
    fn on_event(&self, event: ChangeEvent);
}

impl<F> EventHandler for F
where
    F: Fn(ChangeEvent) + Send + Sync,
{
    fn on_event(&self, event: ChangeEvent) {
        self(event);
    }
}
