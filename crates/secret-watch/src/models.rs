//! Data model for the watched object and the events derived from it.

use std::collections::BTreeMap;
use std::fmt;

/// Identifies the single object being watched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectSelector {
    /// Namespace holding the object
    pub namespace: String,
    /// Object name within the namespace
    pub name: String,
}

impl ObjectSelector {
    /// Create a selector for `namespace/name`.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Field selector expression scoping list/watch calls to this object.
    #[must_use]
    pub fn field_selector(&self) -> String {
        format!("metadata.name={}", self.name)
    }

    /// Whether `object` carries this selector's identity.
    #[must_use]
    pub fn matches(&self, object: &WatchedObject) -> bool {
        object.namespace == self.namespace && object.name == self.name
    }
}

impl fmt::Display for ObjectSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Opaque version marker handed out by the store.
///
/// Only ever compared for equality; the store owns its ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResumeToken(String);

impl ResumeToken {
    /// Wrap a store-issued version string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw version string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResumeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of the watched object as observed from the store.
///
/// `fields` holds each value in the store's text encoding; see
/// [`crate::presentation`] for decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedObject {
    /// Namespace of the object
    pub namespace: String,
    /// Name of the object
    pub name: String,
    /// Store-assigned UID, changes when the object is recreated
    pub uid: Option<String>,
    /// Version of this snapshot
    pub resource_version: ResumeToken,
    /// Field map: key to encoded value
    pub fields: BTreeMap<String, Vec<u8>>,
}

impl WatchedObject {
    /// Create a snapshot with no fields.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        resource_version: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            uid: None,
            resource_version: ResumeToken::new(resource_version),
            fields: BTreeMap::new(),
        }
    }

    /// Builder: set the UID.
    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Builder: add a field with an already-encoded value.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Whether `other` is a different incarnation of the same name
    /// (deleted and recreated in between).
    #[must_use]
    pub fn is_recreated_as(&self, other: &WatchedObject) -> bool {
        match (&self.uid, &other.uid) {
            (Some(a), Some(b)) => a != b,
            _ => false,
        }
    }
}

/// Result of a point-in-time read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// The object, if it currently exists
    pub object: Option<WatchedObject>,
    /// Position to start watching from
    pub token: ResumeToken,
}

/// Lifecycle kind of an object notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Object was created
    Added,
    /// Object changed
    Modified,
    /// Object was removed
    Deleted,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Added => "ADDED",
            Self::Modified => "MODIFIED",
            Self::Deleted => "DELETED",
        })
    }
}

/// An object-carrying notification from a watch session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// What happened
    pub kind: NotificationKind,
    /// Object state after the change (last state for deletions)
    pub object: WatchedObject,
}

impl Notification {
    /// Shorthand constructor.
    #[must_use]
    pub fn new(kind: NotificationKind, object: WatchedObject) -> Self {
        Self { kind, object }
    }
}

/// Item read from an open watch session, before dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEvent {
    /// Added/Modified/Deleted for the watched object
    Object(Notification),
    /// Progress marker with no object change
    Bookmark(ResumeToken),
    /// Store reported an error inside the stream
    Error {
        /// Store status code, when provided
        code: Option<u16>,
        /// Store message
        message: String,
    },
    /// The resume token is too old to continue from
    TokenExpired(String),
}

/// Lifecycle event delivered to the registered handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// Object appeared
    Added(WatchedObject),
    /// Object changed from `old` to `new`
    Modified {
        /// Previously delivered state
        old: WatchedObject,
        /// Current state
        new: WatchedObject,
    },
    /// Object disappeared
    Deleted(WatchedObject),
}

impl ChangeEvent {
    /// Lifecycle kind of this event.
    #[must_use]
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::Added(_) => NotificationKind::Added,
            Self::Modified { .. } => NotificationKind::Modified,
            Self::Deleted(_) => NotificationKind::Deleted,
        }
    }

    /// The object as it stands after this event.
    #[must_use]
    pub fn object(&self) -> &WatchedObject {
        match self {
            Self::Added(object) | Self::Deleted(object) => object,
            Self::Modified { new, .. } => new,
        }
    }
}
