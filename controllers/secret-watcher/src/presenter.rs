//! Logging event handler.
//!
//! Prints every lifecycle event for the watched Secret together with its
//! decoded data.

use secret_watch::{ChangeEvent, EventHandler, WatchedObject, render_fields};
use tracing::info;

/// Builds the log lines for one event.
pub fn describe(event: &ChangeEvent) -> Vec<String> {
    let mut lines = Vec::new();
    match event {
        ChangeEvent::Added(secret) => {
            lines.push(format!("Secret ADDED: {}/{}", secret.namespace, secret.name));
            describe_data(secret, &mut lines);
        }
        ChangeEvent::Modified { old, new } => {
            lines.push(format!("Secret UPDATED: {}/{}", new.namespace, new.name));
            lines.push("Old Data:".to_string());
            describe_data(old, &mut lines);
            lines.push("New Data:".to_string());
            describe_data(new, &mut lines);
        }
        ChangeEvent::Deleted(secret) => {
            lines.push(format!("Secret DELETED: {}/{}", secret.namespace, secret.name));
        }
    }
    lines
}

fn describe_data(secret: &WatchedObject, lines: &mut Vec<String>) {
    if secret.fields.is_empty() {
        lines.push("  No data in secret.".to_string());
        return;
    }
    lines.extend(render_fields(&secret.fields).iter().map(|field| format!("  {field}")));
}

/// [`EventHandler`] that logs each event at `info`.
#[derive(Debug, Default)]
pub struct SecretPresenter;

impl EventHandler for SecretPresenter {
    fn on_event(&self, event: ChangeEvent) {
        for line in describe(&event) {
            info!("{}", line);
        }
    }
}
