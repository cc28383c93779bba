//! `SponsorsService` builder and handle.
//!
//! This is the entry point for embedding sponsor tracking in a server. It
//! ties together all the layers: config → remote client → cache → lifecycle.

use std::sync::Arc;

use sponsors_cache::SponsorsManager;
use sponsors_protocol::{ConfigWatch, RoleMapping, SponsorsConfig};
use sponsors_remote::{EntitlementService, HttpEntitlementService};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::SponsorsError;
use crate::handler::{SessionEvent, run_lifecycle};

/// Builder for configuring and starting the sponsors service.
///
/// # Example
///
/// ```rust,ignore
/// use sponsors::prelude::*;
///
/// let service = SponsorsService::builder()
///     .config(settings.sponsors)
///     .build()?;
/// let lifecycle = service.spawn_lifecycle(session_events);
/// ```
pub struct SponsorsServiceBuilder {
    config: SponsorsConfig,
    roles: RoleMapping,
}

impl SponsorsServiceBuilder {
    /// Creates a new builder with default settings and the built-in role
    /// mapping.
    pub fn new() -> Self {
        Self {
            config: SponsorsConfig::default(),
            roles: RoleMapping::builtin(),
        }
    }

    /// Sets the initial configuration.
    pub fn config(mut self, config: SponsorsConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the role-to-level mapping.
    pub fn roles(mut self, roles: RoleMapping) -> Self {
        self.roles = roles;
        self
    }

    /// Builds the service with the HTTP entitlement client.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// [`SponsorsError::Remote`] if the HTTP client cannot be created.
    pub fn build(
        self,
    ) -> Result<SponsorsService<HttpEntitlementService>, SponsorsError> {
        let watch = ConfigWatch::new(self.config);
        let client = HttpEntitlementService::new(watch.reader())?;
        Ok(Self::assemble(watch, self.roles, client))
    }

    /// Builds the service around any [`EntitlementService`].
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build_with<S: EntitlementService>(self, service: S) -> SponsorsService<S> {
        let watch = ConfigWatch::new(self.config);
        Self::assemble(watch, self.roles, service)
    }

    fn assemble<S: EntitlementService>(
        watch: ConfigWatch,
        roles: RoleMapping,
        service: S,
    ) -> SponsorsService<S> {
        let current = watch.current();
        tracing::info!(
            enabled = current.enabled,
            roles = roles.len(),
            "sponsors service configured"
        );

        let manager = Arc::new(SponsorsManager::new(service, watch.reader(), roles));
        SponsorsService { watch, manager }
    }
}

impl Default for SponsorsServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A configured sponsors service.
///
/// Hand its [`manager`](Self::manager) to gameplay code for lookups, feed
/// session events through [`spawn_lifecycle`](Self::spawn_lifecycle), and
/// push settings changes with [`reload`](Self::reload).
pub struct SponsorsService<S: EntitlementService> {
    watch: ConfigWatch,
    manager: Arc<SponsorsManager<S>>,
}

impl SponsorsService<HttpEntitlementService> {
    /// Creates a new builder.
    pub fn builder() -> SponsorsServiceBuilder {
        SponsorsServiceBuilder::new()
    }
}

impl<S: EntitlementService> SponsorsService<S> {
    /// The shared manager: cache lookups and admin mutations.
    pub fn manager(&self) -> &Arc<SponsorsManager<S>> {
        &self.manager
    }

    /// The configuration currently in effect.
    pub fn config(&self) -> Arc<SponsorsConfig> {
        self.watch.current()
    }

    /// Applies new settings.
    ///
    /// Requests already in flight keep the settings they started with;
    /// everything after this call sees the new ones. The write queue
    /// capacity and lookup concurrency are fixed at startup.
    pub fn reload(&self, config: SponsorsConfig) {
        tracing::info!(enabled = config.enabled, "sponsors settings reloaded");
        self.watch.update(config);
    }

    /// Starts consuming session events in a background task.
    ///
    /// The task ends once every sender for `events` is dropped and the
    /// outstanding lookups have finished.
    pub fn spawn_lifecycle(
        &self,
        events: mpsc::Receiver<SessionEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(run_lifecycle(
            Arc::clone(&self.manager),
            self.watch.reader(),
            events,
        ))
    }

    /// Flushes queued remote writes and stops the write worker.
    pub async fn shutdown(&self) {
        tracing::info!("sponsors service shutting down");
        self.manager.shutdown().await;
    }
}
