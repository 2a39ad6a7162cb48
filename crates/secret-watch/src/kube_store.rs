//! Kubernetes-backed object store.
//!
//! Lists and watches a single `Secret` through the API server using a
//! `metadata.name` field selector. Secret data is carried in its wire form
//! (standard base64) so the field map holds the store's text encoding.

use crate::error::StoreError;
use crate::models::{Listing, Notification, NotificationKind, ObjectSelector, RawEvent, ResumeToken, WatchedObject};
use crate::store::{ObjectStore, WatchSession};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::StreamExt;
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{ListParams, WatchEvent, WatchParams};
use kube::{Api, Client};
use tracing::debug;

/// HTTP status the API server uses for an expired resource version
const GONE: u16 = 410;

/// [`ObjectStore`] over the Kubernetes `Secret` API.
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl KubeSecretStore {
    /// Create a store using the given Kubernetes client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, selector: &ObjectSelector) -> Api<Secret> {
        Api::namespaced(self.client.clone(), &selector.namespace)
    }
}

impl std::fmt::Debug for KubeSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretStore").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ObjectStore for KubeSecretStore {
    async fn list(&self, selector: &ObjectSelector) -> Result<Listing, StoreError> {
        let params = ListParams::default().fields(&selector.field_selector());
        let list = self.api(selector).list(&params).await?;

        let token = list
            .metadata
            .resource_version
            .filter(|version| !version.is_empty())
            .map(ResumeToken::new)
            .ok_or_else(|| {
                StoreError::Decode(format!("list of {selector} carried no resourceVersion"))
            })?;

        let object = list
            .items
            .into_iter()
            .find(|secret| secret.metadata.name.as_deref() == Some(selector.name.as_str()))
            .map(secret_to_object)
            .transpose()?;

        debug!(
            "Listed {} at {}: {}",
            selector,
            token,
            if object.is_some() { "present" } else { "absent" }
        );
        Ok(Listing { object, token })
    }

    async fn watch(
        &self,
        selector: &ObjectSelector,
        token: &ResumeToken,
    ) -> Result<WatchSession, StoreError> {
        let stream = self
            .api(selector)
            .watch(&watch_params(selector), token.as_str())
            .await?;

        let events = stream
            .map(|item| match item {
                Ok(event) => raw_event(event),
                Err(err) => Err(StoreError::from(err)),
            })
            .boxed();
        Ok(WatchSession::new(events))
    }
}

/// Watch parameters for `selector`. Bookmarks are on by default in kube.
fn watch_params(selector: &ObjectSelector) -> WatchParams {
    WatchParams::default().fields(&selector.field_selector())
}

/// Map one API server watch event onto the store-neutral [`RawEvent`].
///
/// # Errors
///
/// [`StoreError::Decode`] if an object event carries a malformed `Secret`.
pub fn raw_event(event: WatchEvent<Secret>) -> Result<RawEvent, StoreError> {
    let notification = |kind, secret| -> Result<RawEvent, StoreError> {
        Ok(RawEvent::Object(Notification::new(kind, secret_to_object(secret)?)))
    };

    match event {
        WatchEvent::Added(secret) => notification(NotificationKind::Added, secret),
        WatchEvent::Modified(secret) => notification(NotificationKind::Modified, secret),
        WatchEvent::Deleted(secret) => notification(NotificationKind::Deleted, secret),
        WatchEvent::Bookmark(bookmark) => Ok(RawEvent::Bookmark(ResumeToken::new(
            bookmark.metadata.resource_version,
        ))),
        WatchEvent::Error(status) if status.code == GONE => {
            Ok(RawEvent::TokenExpired(status.message.clone()))
        }
        WatchEvent::Error(status) => Ok(RawEvent::Error {
            code: Some(status.code),
            message: status.message.clone(),
        }),
    }
}

/// Snapshot a `Secret` as a [`WatchedObject`].
///
/// # Errors
///
/// [`StoreError::Decode`] when namespace, name or resourceVersion is missing.
pub fn secret_to_object(secret: Secret) -> Result<WatchedObject, StoreError> {
    let meta = secret.metadata;
    let missing = |field: &str| StoreError::Decode(format!("Secret without metadata.{field}"));

    let namespace = meta.namespace.ok_or_else(|| missing("namespace"))?;
    let name = meta.name.ok_or_else(|| missing("name"))?;
    let resource_version = meta
        .resource_version
        .filter(|version| !version.is_empty())
        .ok_or_else(|| missing("resourceVersion"))?;

    let fields = secret
        .data
        .unwrap_or_default()
        .into_iter()
        .map(|(key, ByteString(bytes))| (key, STANDARD.encode(bytes).into_bytes()))
        .collect();

    Ok(WatchedObject {
        namespace,
        name,
        uid: meta.uid,
        resource_version: ResumeToken::new(resource_version),
        fields,
    })
}
