//! The sponsors manager: keeps the cache in step with player lifecycles.
//!
//! This is the central piece of the cache layer. It's responsible for:
//! - Resolving a player's sponsor level when they are verified
//! - Evicting their record when they disconnect
//! - Answering synchronous entitlement lookups for the rest of the server
//! - Marking rewards as granted and wiping the granted flags
//!
//! ## Lifecycle
//!
//! ```text
//!  on_player_verified() ──(level > None)──→ [Entitled] ──on_player_disconnected()──→ [Gone]
//!          │                                   │  ↑
//!          └──(level = None / lookup failed)   │  └── wipe_all_granted()  (granted = false)
//!                      ↓                       └───── grant()             (granted = true)
//!                   [Gone]
//! ```

use std::sync::Arc;

use sponsors_protocol::{ConfigReader, RoleMapping, SponsorLevel, SponsorRecord, UserId};
use sponsors_remote::EntitlementService;

use crate::cache::{CommitOutcome, SponsorCache, VerificationTicket};
use crate::writer::{PendingWrite, RemoteWrite, WriteQueue};

/// How a verification ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Sponsorship is switched off; no remote call was made.
    Disabled,
    /// The roles lookup failed; nothing was cached.
    RolesUnavailable,
    /// An unmapped role was found under the strict policy; nothing was
    /// cached.
    RolesRejected,
    /// The player holds no sponsor role.
    NotSponsor,
    /// The player is a sponsor and this record is now cached.
    Entitled(SponsorRecord),
    /// The player disconnected (or verified again) before the lookup
    /// finished, so its result was discarded.
    Superseded,
}

/// Result of [`SponsorsManager::wipe_all_granted`].
#[derive(Debug)]
pub struct WipeReceipt {
    /// How many cached records had their granted flag cleared.
    pub reset: usize,
    /// The queued remote wipe.
    pub write: PendingWrite,
}

/// Owns the entitlement cache and drives it from lifecycle events and
/// admin actions.
///
/// Share it as `Arc<SponsorsManager<S>>`: every method takes `&self`, and
/// the cache does its own locking.
pub struct SponsorsManager<S: EntitlementService> {
    cache: SponsorCache,
    service: Arc<S>,
    config: ConfigReader,
    roles: RoleMapping,
    writer: WriteQueue,
}

impl<S: EntitlementService> SponsorsManager<S> {
    /// Creates a manager and starts its remote write worker.
    ///
    /// The write queue capacity is read from the config once, here. Must be
    /// called from within a Tokio runtime.
    pub fn new(service: S, config: ConfigReader, roles: RoleMapping) -> Self {
        let service = Arc::new(service);
        let capacity = config.current().write_queue_capacity;
        let writer = WriteQueue::spawn(Arc::clone(&service), capacity);

        Self {
            cache: SponsorCache::new(),
            service,
            config,
            roles,
            writer,
        }
    }

    /// The entitlement service this manager talks to.
    pub fn service(&self) -> &S {
        &self.service
    }

    // =====================================================================
    // Verification
    // =====================================================================

    /// Handles a "player verified" notification from start to finish.
    pub async fn on_player_verified(&self, user_id: UserId) -> VerifyOutcome {
        match self.begin_verification(user_id) {
            Some(ticket) => self.complete_verification(ticket).await,
            None => VerifyOutcome::Disabled,
        }
    }

    /// First, synchronous half of a verification.
    ///
    /// Registers the verification so that a disconnect arriving while the
    /// lookup runs cancels its result. Returns `None` when sponsorship is
    /// disabled.
    pub fn begin_verification(
        &self,
        user_id: UserId,
    ) -> Option<VerificationTicket> {
        if !self.config.current().enabled {
            tracing::trace!(%user_id, "sponsorship disabled, skipping lookup");
            return None;
        }
        Some(self.cache.begin(user_id))
    }

    /// Second half of a verification: remote lookups, resolution, commit.
    ///
    /// Roles and granted status are fetched concurrently; the record is
    /// built only after both have answered, and inserted in one step.
    pub async fn complete_verification(
        &self,
        ticket: VerificationTicket,
    ) -> VerifyOutcome {
        let user_id = ticket.user_id();

        let (roles, granted) = tokio::join!(
            self.service.fetch_roles(user_id),
            self.service.fetch_granted(user_id),
        );

        let roles = match roles {
            Ok(roles) => roles,
            Err(e) => {
                tracing::error!(%user_id, error = %e, "failed to retrieve roles");
                self.cache.abandon(ticket);
                return VerifyOutcome::RolesUnavailable;
            }
        };

        let granted = granted.unwrap_or_else(|e| {
            tracing::warn!(
                %user_id,
                error = %e,
                timeout = e.is_timeout(),
                "granted status lookup failed, assuming not granted"
            );
            false
        });

        let policy = self.config.current().unknown_roles;
        let level = match self.roles.resolve(&roles, policy) {
            Ok(level) => level,
            Err(e) => {
                tracing::error!(%user_id, error = %e, "failed to resolve roles");
                self.cache.abandon(ticket);
                return VerifyOutcome::RolesRejected;
            }
        };

        if level == SponsorLevel::None {
            if let CommitOutcome::Applied { replaced: true, .. } =
                self.cache.commit(ticket, None)
            {
                tracing::info!(%user_id, "player is no longer a sponsor");
            }
            return VerifyOutcome::NotSponsor;
        }

        let record = SponsorRecord::new(user_id, level, granted);
        match self.cache.commit(ticket, Some(record.clone())) {
            CommitOutcome::Applied { replaced, stored } => {
                // A grant or wipe during the lookup may have overridden the
                // fetched granted flag.
                let record = stored.unwrap_or(record);
                let granted = record.is_granted;
                tracing::info!(
                    %user_id,
                    %level,
                    rank = level.as_u8(),
                    granted,
                    replaced,
                    "{user_id} is sponsor now"
                );
                VerifyOutcome::Entitled(record)
            }
            CommitOutcome::Superseded => {
                tracing::debug!(
                    %user_id,
                    "player left before the lookup finished, discarding result"
                );
                VerifyOutcome::Superseded
            }
        }
    }

    // =====================================================================
    // Disconnect / lookup
    // =====================================================================

    /// Handles a "connection closed" notification.
    ///
    /// Removes the record and cancels any in-flight verification. A player
    /// without a record is not an error.
    pub fn on_player_disconnected(
        &self,
        user_id: UserId,
    ) -> Option<SponsorRecord> {
        let removed = self.cache.remove(user_id);
        if removed.is_some() {
            tracing::debug!(%user_id, "sponsor record evicted");
        }
        removed
    }

    /// Returns the player's cached entitlement.
    ///
    /// Never performs I/O and never waits on a remote call; safe to call
    /// from any hot path.
    pub fn try_get_record(&self, user_id: UserId) -> Option<SponsorRecord> {
        self.cache.get(user_id)
    }

    /// Returns the cached granted flag, or `None` if the player has no
    /// record.
    pub fn check_granted_status(&self, user_id: UserId) -> Option<bool> {
        self.cache.get(user_id).map(|record| record.is_granted)
    }

    /// A snapshot of every cached record.
    pub fn records(&self) -> Vec<SponsorRecord> {
        self.cache.records()
    }

    /// Number of cached sponsors.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns `true` if no sponsors are cached.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    // =====================================================================
    // Admin mutations
    // =====================================================================

    /// Marks the player's reward as granted.
    ///
    /// The cached flag flips right away; the remote write is queued and may
    /// still fail later. Returns `None` (and makes no remote call) if the
    /// player has no record.
    pub fn grant(&self, user_id: UserId) -> Option<PendingWrite> {
        if !self.cache.set_granted(user_id, true) {
            tracing::debug!(%user_id, "no sponsor record, grant ignored");
            return None;
        }

        tracing::info!(%user_id, "sponsor reward marked as granted");
        Some(self.writer.submit(RemoteWrite::SetGranted {
            user_id,
            granted: true,
        }))
    }

    /// Clears the granted flag on every cached record and queues the
    /// matching remote wipe.
    ///
    /// The cached flags are cleared whatever the remote outcome.
    pub fn wipe_all_granted(&self) -> WipeReceipt {
        let reset = self.cache.reset_all_granted();
        tracing::info!(reset, "granted flags wiped");

        WipeReceipt {
            reset,
            write: self.writer.submit(RemoteWrite::WipeGranted),
        }
    }

    /// Applies every queued remote write, then stops the write worker.
    ///
    /// Later `grant` / `wipe_all_granted` calls still update the cache,
    /// but their remote writes fail with
    /// [`SponsorError::WriterClosed`](crate::SponsorError::WriterClosed).
    pub async fn shutdown(&self) {
        self.writer.shutdown().await;
    }
}

// =========================================================================
// Tests
// =========================================================================
