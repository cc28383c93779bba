//! Live-reloadable configuration for the sponsors service.
//!
//! The host server can change these values at runtime (console variables,
//! a reloaded settings file). Every layer reads them through a
//! [`ConfigReader`] handed to it at construction time, never through a
//! global, so tests can run with their own isolated config.
//!
//! Under the hood this is a `tokio::sync::watch` channel:
//!
//! ```text
//! ConfigWatch (one writer) ──send_replace──→ ConfigReader (many readers)
//! ```
//!
//! Readers always see the latest snapshot. A request that already took a
//! snapshot keeps using it; nothing is retried because the config moved.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::UnknownRolePolicy;

// ---------------------------------------------------------------------------
// SponsorsConfig
// ---------------------------------------------------------------------------

/// All settings of the sponsors service.
///
/// Server-side only: these values (the API key in particular) must never be
/// sent to game clients. `Debug` redacts the key so it can't leak through
/// log lines either.
///
/// `#[serde(default)]` lets a settings file specify only the keys it wants
/// to change.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SponsorsConfig {
    /// Master switch. When `false`, verification does nothing at all.
    pub enabled: bool,

    /// Base URL of the entitlement service, without a trailing slash.
    pub api_url: String,

    /// Static API key sent as the `api_token` query parameter.
    pub api_key: String,

    /// Guild whose roles decide the sponsor level.
    pub guild_id: String,

    /// Per-request timeout for calls to the entitlement service. Values
    /// below one second are treated as one second.
    pub request_timeout_secs: u64,

    /// Capacity of the remote write queue. Read once at startup.
    pub write_queue_capacity: usize,

    /// Maximum number of verification lookups in flight at once.
    pub max_concurrent_lookups: usize,

    /// How unmapped role ids are treated during resolution.
    pub unknown_roles: UnknownRolePolicy,
}

impl SponsorsConfig {
    /// The request timeout as a `Duration`, at least one second.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// The base URL with any trailing `/` removed.
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

impl Default for SponsorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: "http://127.0.0.1:2424/api".to_string(),
            api_key: "key".to_string(),
            guild_id: "1126278315364339712".to_string(),
            request_timeout_secs: 10,
            write_queue_capacity: 64,
            max_concurrent_lookups: 16,
            unknown_roles: UnknownRolePolicy::Skip,
        }
    }
}

impl fmt::Debug for SponsorsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SponsorsConfig")
            .field("enabled", &self.enabled)
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("guild_id", &self.guild_id)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("write_queue_capacity", &self.write_queue_capacity)
            .field("max_concurrent_lookups", &self.max_concurrent_lookups)
            .field("unknown_roles", &self.unknown_roles)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ConfigWatch / ConfigReader
// ---------------------------------------------------------------------------

/// The writing side of the live configuration.
///
/// Owned by whoever loads settings (the service builder, a console-variable
/// bridge). Dropping it freezes the config at its last value; readers keep
/// working.
#[derive(Debug)]
pub struct ConfigWatch {
    sender: watch::Sender<Arc<SponsorsConfig>>,
}

impl ConfigWatch {
    /// Creates a watch holding `initial`.
    pub fn new(initial: SponsorsConfig) -> Self {
        let (sender, _) = watch::channel(Arc::new(initial));
        Self { sender }
    }

    /// Replaces the whole config and notifies readers.
    pub fn update(&self, config: SponsorsConfig) {
        // `send_replace` succeeds even with no live receivers.
        self.sender.send_replace(Arc::new(config));
    }

    /// Edits a copy of the current config in place and publishes it.
    pub fn modify(&self, edit: impl FnOnce(&mut SponsorsConfig)) {
        let mut next = SponsorsConfig::clone(&self.sender.borrow());
        edit(&mut next);
        self.update(next);
    }

    /// Returns the latest snapshot.
    pub fn current(&self) -> Arc<SponsorsConfig> {
        Arc::clone(&self.sender.borrow())
    }

    /// Creates a new reader subscribed to this watch.
    pub fn reader(&self) -> ConfigReader {
        ConfigReader {
            receiver: self.sender.subscribe(),
        }
    }
}

/// The reading side of the live configuration.
///
/// Cheap to clone; each clone tracks change notifications on its own.
#[derive(Debug, Clone)]
pub struct ConfigReader {
    receiver: watch::Receiver<Arc<SponsorsConfig>>,
}

impl ConfigReader {
    /// A reader over a config that will never change. Useful in tests.
    pub fn fixed(config: SponsorsConfig) -> Self {
        ConfigWatch::new(config).reader()
    }

    /// Returns the latest snapshot without waiting.
    pub fn current(&self) -> Arc<SponsorsConfig> {
        Arc::clone(&self.receiver.borrow())
    }

    /// Waits until the config changes and returns the new snapshot.
    ///
    /// Returns `None` once the [`ConfigWatch`] has been dropped, meaning
    /// no further changes can happen.
    pub async fn changed(&mut self) -> Option<Arc<SponsorsConfig>> {
        self.receiver.changed().await.ok()?;
        Some(Arc::clone(&self.receiver.borrow_and_update()))
    }
}

// =========================================================================
// Tests
// =========================================================================
