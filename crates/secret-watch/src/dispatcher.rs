//! Event dispatch.
//!
//! Turns raw notifications (and full-sync listings) into [`ChangeEvent`]s,
//! checking each one against the tracked state so nothing is skipped,
//! duplicated or fabricated.

use crate::error::DispatchError;
use crate::models::{ChangeEvent, Listing, Notification, NotificationKind, ObjectSelector, WatchedObject};
use crate::tracker::ResumeTokenTracker;

/// Converts store output into ordered lifecycle events for one object.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    selector: ObjectSelector,
}

impl Dispatcher {
    /// Create a dispatcher for the given object.
    #[must_use]
    pub fn new(selector: ObjectSelector) -> Self {
        Self { selector }
    }

    /// Turn one stream notification into exactly one event and record it in
    /// the tracker.
    ///
    /// For `Modified`, `old` is the tracker's snapshot as it was before this
    /// call. The tracker is left untouched on error.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::ForeignObject`] if the notification is about another object
    /// - [`DispatchError::Duplicate`] if it repeats the tracked version
    /// - [`DispatchError::MissingPriorState`] for Modified/Deleted with nothing tracked
    /// - [`DispatchError::UnexpectedPriorState`] for Added while something is tracked
    pub fn dispatch(
        &self,
        notification: Notification,
        tracker: &mut ResumeTokenTracker,
    ) -> Result<ChangeEvent, DispatchError> {
        let Notification { kind, object } = notification;
        self.ensure_identity(&object)?;

        if let Some(prev) = tracker.last_object()
            && prev.resource_version == object.resource_version
        {
            return Err(DispatchError::Duplicate {
                kind,
                resource_version: object.resource_version,
            });
        }

        let token = object.resource_version.clone();
        let (event, snapshot) = match (kind, tracker.last_object()) {
            (NotificationKind::Added, None) => {
                (ChangeEvent::Added(object.clone()), Some(object))
            }
            (NotificationKind::Added, Some(prev)) => {
                return Err(DispatchError::UnexpectedPriorState {
                    tracked: prev.resource_version.clone(),
                });
            }
            (NotificationKind::Modified | NotificationKind::Deleted, None) => {
                return Err(DispatchError::MissingPriorState { kind });
            }
            (NotificationKind::Modified, Some(prev)) => (
                ChangeEvent::Modified {
                    old: prev.clone(),
                    new: object.clone(),
                },
                Some(object),
            ),
            (NotificationKind::Deleted, Some(_)) => (ChangeEvent::Deleted(object), None),
        };

        tracker.set(token, snapshot);
        Ok(event)
    }

    /// Diff a fresh listing against the last delivered state and return the
    /// synthetic events that bring the handler up to date.
    ///
    /// | tracked | listed            | events              |
    /// |---------|-------------------|---------------------|
    /// | none    | none              | -                   |
    /// | none    | obj               | Added               |
    /// | prev    | none              | Deleted             |
    /// | prev    | recreated (uid)   | Deleted, Added      |
    /// | prev    | fields differ     | Modified            |
    /// | prev    | fields equal      | -                   |
    ///
    /// The tracker's token always becomes the listing's token.
    ///
    /// # Errors
    ///
    /// [`DispatchError::ForeignObject`] if the listing returned another object.
    pub fn reconcile(
        &self,
        listing: Listing,
        tracker: &mut ResumeTokenTracker,
    ) -> Result<Vec<ChangeEvent>, DispatchError> {
        let Listing { object, token } = listing;
        if let Some(fresh) = &object {
            self.ensure_identity(fresh)?;
        }

        let mut events = Vec::with_capacity(2);
        match (tracker.last_object().cloned(), object) {
            (None, None) => tracker.advance(token),
            (None, Some(fresh)) => {
                events.push(ChangeEvent::Added(fresh.clone()));
                tracker.set(token, Some(fresh));
            }
            (Some(prev), None) => {
                events.push(ChangeEvent::Deleted(prev));
                tracker.set(token, None);
            }
            (Some(prev), Some(fresh)) if prev.is_recreated_as(&fresh) => {
                events.push(ChangeEvent::Deleted(prev));
                events.push(ChangeEvent::Added(fresh.clone()));
                tracker.set(token, Some(fresh));
            }
            (Some(prev), Some(fresh)) if prev.fields != fresh.fields => {
                events.push(ChangeEvent::Modified {
                    old: prev,
                    new: fresh.clone(),
                });
                tracker.set(token, Some(fresh));
            }
            // Nothing the handler can see changed; keep the delivered snapshot.
            (Some(_), Some(_)) => tracker.advance(token),
        }

        Ok(events)
    }

    fn ensure_identity(&self, object: &WatchedObject) -> Result<(), DispatchError> {
        if self.selector.matches(object) {
            Ok(())
        } else {
            Err(DispatchError::ForeignObject {
                expected: self.selector.to_string(),
                actual: format!("{}/{}", object.namespace, object.name),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResumeToken;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(ObjectSelector::new("ns", "s"))
    }

    fn object(version: &str, value: &str) -> WatchedObject {
        WatchedObject::new("ns", "s", version)
            .with_uid("uid-1")
            .with_field("k", value)
    }

    fn tracked(version: &str, value: &str) -> ResumeTokenTracker {
        let mut tracker = ResumeTokenTracker::new();
        tracker.set(ResumeToken::new(version), Some(object(version, value)));
        tracker
    }

    #[test]
    fn test_added_with_empty_tracker() {
        let mut tracker = ResumeTokenTracker::new();
        let event = dispatcher()
            .dispatch(
                Notification::new(NotificationKind::Added, object("5", "dGVzdA==")),
                &mut tracker,
            )
            .unwrap();

        assert_eq!(event, ChangeEvent::Added(object("5", "dGVzdA==")));
        assert_eq!(tracker.token(), Some(&ResumeToken::new("5")));
        assert_eq!(tracker.last_object(), Some(&object("5", "dGVzdA==")));
    }

    #[test]
    fn test_modified_old_is_prior_snapshot() {
        let mut tracker = tracked("5", "b2xk");
        let event = dispatcher()
            .dispatch(
                Notification::new(NotificationKind::Modified, object("6", "bmV3")),
                &mut tracker,
            )
            .unwrap();

        assert_eq!(
            event,
            ChangeEvent::Modified {
                old: object("5", "b2xk"),
                new: object("6", "bmV3"),
            }
        );
        assert_eq!(tracker.last_object(), Some(&object("6", "bmV3")));
    }

    #[test]
    fn test_deleted_clears_snapshot() {
        let mut tracker = tracked("5", "djE=");
        let event = dispatcher()
            .dispatch(
                Notification::new(NotificationKind::Deleted, object("7", "djE=")),
                &mut tracker,
            )
            .unwrap();

        assert_eq!(event, ChangeEvent::Deleted(object("7", "djE=")));
        assert_eq!(tracker.get(), (Some(&ResumeToken::new("7")), None));
    }

    #[test]
    fn test_modified_without_prior_state_fails() {
        let mut tracker = ResumeTokenTracker::new();
        let err = dispatcher()
            .dispatch(
                Notification::new(NotificationKind::Modified, object("6", "bmV3")),
                &mut tracker,
            )
            .unwrap_err();

        assert_eq!(
            err,
            DispatchError::MissingPriorState {
                kind: NotificationKind::Modified
            }
        );
        assert_eq!(tracker.get(), (None, None));
    }

    #[test]
    fn test_replayed_modified_is_rejected() {
        let mut tracker = tracked("5", "b2xk");
        let notification = Notification::new(NotificationKind::Modified, object("6", "bmV3"));

        dispatcher().dispatch(notification.clone(), &mut tracker).unwrap();
        let err = dispatcher().dispatch(notification, &mut tracker).unwrap_err();

        assert!(matches!(err, DispatchError::Duplicate { .. }));
        assert_eq!(tracker.last_object(), Some(&object("6", "bmV3")));
    }

    #[test]
    fn test_replayed_deleted_is_rejected() {
        let mut tracker = tracked("5", "djE=");
        let notification = Notification::new(NotificationKind::Deleted, object("7", "djE="));

        dispatcher().dispatch(notification.clone(), &mut tracker).unwrap();
        let err = dispatcher().dispatch(notification, &mut tracker).unwrap_err();

        assert!(err.requires_resync());
    }

    #[test]
    fn test_replayed_added_is_rejected() {
        let mut tracker = ResumeTokenTracker::new();
        let notification = Notification::new(NotificationKind::Added, object("5", "eA=="));

        dispatcher().dispatch(notification.clone(), &mut tracker).unwrap();
        let err = dispatcher().dispatch(notification, &mut tracker).unwrap_err();

        assert!(matches!(err, DispatchError::Duplicate { .. }));
    }

    #[test]
    fn test_added_over_tracked_object_fails() {
        let mut tracker = tracked("5", "eA==");
        let err = dispatcher()
            .dispatch(
                Notification::new(NotificationKind::Added, object("9", "eQ==")),
                &mut tracker,
            )
            .unwrap_err();

        assert_eq!(
            err,
            DispatchError::UnexpectedPriorState {
                tracked: ResumeToken::new("5")
            }
        );
    }

    #[test]
    fn test_foreign_object_is_rejected() {
        let mut tracker = ResumeTokenTracker::new();
        let stranger = WatchedObject::new("ns", "other", "3");
        let err = dispatcher()
            .dispatch(
                Notification::new(NotificationKind::Added, stranger),
                &mut tracker,
            )
            .unwrap_err();

        assert!(matches!(err, DispatchError::ForeignObject { .. }));
    }

    #[test]
    fn test_stream_order_is_preserved() {
        let mut tracker = ResumeTokenTracker::new();
        let notifications = vec![
            Notification::new(NotificationKind::Added, object("1", "YQ==")),
            Notification::new(NotificationKind::Modified, object("2", "Yg==")),
            Notification::new(NotificationKind::Modified, object("3", "Yw==")),
            Notification::new(NotificationKind::Deleted, object("4", "Yw==")),
            Notification::new(NotificationKind::Added, object("5", "ZA==")),
        ];

        let events: Vec<ChangeEvent> = notifications
            .into_iter()
            .map(|n| dispatcher().dispatch(n, &mut tracker).unwrap())
            .collect();

        let kinds: Vec<NotificationKind> = events.iter().map(ChangeEvent::kind).collect();
        assert_eq!(
            kinds,
            vec![
                NotificationKind::Added,
                NotificationKind::Modified,
                NotificationKind::Modified,
                NotificationKind::Deleted,
                NotificationKind::Added,
            ]
        );
        // Each Modified.old is the previous event's resulting object
        for pair in events.windows(2) {
            if let ChangeEvent::Modified { old, .. } = &pair[1] {
                assert_eq!(old, pair[0].object());
            }
        }
    }

    #[test]
    fn test_reconcile_absent_to_present_adds() {
        let mut tracker = ResumeTokenTracker::new();
        let events = dispatcher()
            .reconcile(
                Listing {
                    object: Some(object("5", "b2xk")),
                    token: ResumeToken::new("20"),
                },
                &mut tracker,
            )
            .unwrap();

        assert_eq!(events, vec![ChangeEvent::Added(object("5", "b2xk"))]);
        assert_eq!(tracker.token(), Some(&ResumeToken::new("20")));
    }

    #[test]
    fn test_reconcile_absent_to_absent_is_silent() {
        let mut tracker = ResumeTokenTracker::new();
        let events = dispatcher()
            .reconcile(
                Listing {
                    object: None,
                    token: ResumeToken::new("20"),
                },
                &mut tracker,
            )
            .unwrap();

        assert!(events.is_empty());
        assert_eq!(tracker.get(), (Some(&ResumeToken::new("20")), None));
    }

    #[test]
    fn test_reconcile_disappeared_deletes_last_known() {
        let mut tracker = tracked("5", "djE=");
        let events = dispatcher()
            .reconcile(
                Listing {
                    object: None,
                    token: ResumeToken::new("30"),
                },
                &mut tracker,
            )
            .unwrap();

        assert_eq!(events, vec![ChangeEvent::Deleted(object("5", "djE="))]);
        assert_eq!(tracker.last_object(), None);
    }

    #[test]
    fn test_reconcile_changed_fields_modifies() {
        let mut tracker = tracked("5", "djE=");
        let events = dispatcher()
            .reconcile(
                Listing {
                    object: Some(object("9", "djI=")),
                    token: ResumeToken::new("30"),
                },
                &mut tracker,
            )
            .unwrap();

        assert_eq!(
            events,
            vec![ChangeEvent::Modified {
                old: object("5", "djE="),
                new: object("9", "djI="),
            }]
        );
    }

    #[test]
    fn test_reconcile_same_fields_keeps_delivered_snapshot() {
        let mut tracker = tracked("5", "djE=");
        let events = dispatcher()
            .reconcile(
                Listing {
                    object: Some(object("9", "djE=")),
                    token: ResumeToken::new("30"),
                },
                &mut tracker,
            )
            .unwrap();

        assert!(events.is_empty());
        assert_eq!(tracker.token(), Some(&ResumeToken::new("30")));
        assert_eq!(tracker.last_object(), Some(&object("5", "djE=")));
    }

    #[test]
    fn test_reconcile_recreated_deletes_then_adds() {
        let mut tracker = tracked("5", "djE=");
        let replacement = WatchedObject::new("ns", "s", "40")
            .with_uid("uid-2")
            .with_field("k", "djE=");
        let events = dispatcher()
            .reconcile(
                Listing {
                    object: Some(replacement.clone()),
                    token: ResumeToken::new("41"),
                },
                &mut tracker,
            )
            .unwrap();

        assert_eq!(
            events,
            vec![
                ChangeEvent::Deleted(object("5", "djE=")),
                ChangeEvent::Added(replacement),
            ]
        );
    }
}
