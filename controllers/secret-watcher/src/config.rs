//! Process configuration from environment variables.

use crate::error::ControllerError;
use secret_watch::{ObjectSelector, WatchConfig};
use std::time::Duration;
use tracing::info;

const SECRET_NAMESPACE: &str = "SECRET_NAMESPACE";
const SECRET_NAME: &str = "SECRET_NAME";
const BACKOFF_INITIAL_MS: &str = "WATCH_BACKOFF_INITIAL_MS";
const BACKOFF_MAX_MS: &str = "WATCH_BACKOFF_MAX_MS";

/// Resolved startup configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct WatcherConfig {
    /// Secret to watch
    pub selector: ObjectSelector,
    /// Reconnect tuning
    pub watch: WatchConfig,
}

impl WatcherConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup` (key -> value).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| {
                    ControllerError::InvalidConfig(format!(
                        "{SECRET_NAMESPACE} and {SECRET_NAME} environment variables must be set ({key} is missing)"
                    ))
                })
        };
        let namespace = required(SECRET_NAMESPACE)?;
        let name = required(SECRET_NAME)?;

        let defaults = WatchConfig::default();
        let initial_backoff = millis(&lookup, BACKOFF_INITIAL_MS)?.unwrap_or(defaults.initial_backoff);
        let max_backoff = millis(&lookup, BACKOFF_MAX_MS)?.unwrap_or(defaults.max_backoff);
        if max_backoff < initial_backoff {
            return Err(ControllerError::InvalidConfig(format!(
                "{BACKOFF_MAX_MS} ({}ms) must not be below {BACKOFF_INITIAL_MS} ({}ms)",
                max_backoff.as_millis(),
                initial_backoff.as_millis()
            )));
        }

        Ok(Self {
            selector: ObjectSelector::new(namespace, name),
            watch: WatchConfig {
                initial_backoff,
                max_backoff,
                ..defaults
            },
        })
    }

    /// Log the resolved configuration.
    pub fn log(&self) {
        info!("Configuration:");
        info!("  Namespace: {}", self.selector.namespace);
        info!("  Secret: {}", self.selector.name);
        info!(
            "  Reconnect backoff: {:?} - {:?}",
            self.watch.initial_backoff, self.watch.max_backoff
        );
    }
}

fn millis<F>(lookup: &F, key: &str) -> Result<Option<Duration>, ControllerError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Some(Duration::from_millis(ms))),
        _ => Err(ControllerError::InvalidConfig(format!(
            "{key} must be a positive number of milliseconds, got '{raw}'"
        ))),
    }
}
