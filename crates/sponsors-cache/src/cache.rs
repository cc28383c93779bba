//! The entitlement cache: who is a sponsor right now.
//!
//! # Concurrency note
//!
//! Unlike a single-owner registry, `SponsorCache` IS shared between tasks:
//! verification lookups, disconnect handling, admin commands, and hot-path
//! readers elsewhere in the server all hit it at the same time. Everything
//! lives behind one `std::sync::RwLock`:
//!
//! - critical sections are a few map operations, never an `.await`
//! - readers take the read lock just long enough to clone a record
//! - a record is inserted fully built, so readers never see half of one
//!
//! # Verification tickets
//!
//! A remote lookup can take seconds, and the player may disconnect in the
//! meantime. To keep a late answer from resurrecting a record for a player
//! who is already gone, every verification starts by taking a
//! [`VerificationTicket`]. Disconnecting (or verifying again) invalidates
//! outstanding tickets, and [`SponsorCache::commit`] drops the result of an
//! invalidated one.
//!
//! ```text
//! begin() ──→ [pending] ──commit()──→ [record]   (ticket still current)
//!                 │
//!                 └── remove() / begin() again ──→ commit() is Superseded
//! ```
//!
//! # Granted flag
//!
//! The granted flag in a lookup result was read from the remote side when
//! the lookup started. If `set_granted` or `reset_all_granted` touched the
//! player's flag after [`SponsorCache::begin`], that local write is newer,
//! and [`SponsorCache::commit`] keeps it instead of the fetched value.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use sponsors_protocol::{SponsorRecord, UserId};

/// Proof that a verification for `user_id` was started.
///
/// Deliberately not `Clone`: a ticket is spent exactly once, by
/// [`SponsorCache::commit`] or [`SponsorCache::abandon`].
#[derive(Debug, PartialEq, Eq)]
pub struct VerificationTicket {
    user_id: UserId,
    serial: u64,
    granted_epoch: u64,
}

impl VerificationTicket {
    /// The player being verified.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}

/// What [`SponsorCache::commit`] did with a verification result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The result was applied. `replaced` is `true` if an older record for
    /// the same player was overwritten or removed; `stored` is the record
    /// now in the cache.
    Applied {
        replaced: bool,
        stored: Option<SponsorRecord>,
    },
    /// The ticket was no longer current; nothing changed.
    Superseded,
}

#[derive(Debug, Default)]
struct CacheState {
    records: HashMap<UserId, SponsorRecord>,
    /// Current ticket serial per player with a verification in flight.
    pending: HashMap<UserId, u64>,
    next_serial: u64,
    /// Bumped by every local write to a granted flag.
    granted_epoch: u64,
    /// `granted_epoch` of the last wipe.
    wiped_at: u64,
    /// `granted_epoch` of each player's last `set_granted`.
    granted_at: HashMap<UserId, u64>,
}

impl CacheState {
    /// The player's locally known granted flag, if it was written after
    /// `epoch`.
    fn local_granted_since(&self, user_id: UserId, epoch: u64) -> Option<bool> {
        let granted_later = self
            .granted_at
            .get(&user_id)
            .is_some_and(|&at| at > epoch);
        if granted_later || self.wiped_at > epoch {
            Some(self.records.get(&user_id).is_some_and(|r| r.is_granted))
        } else {
            None
        }
    }
}

/// Thread-safe map from player to cached sponsor entitlement.
///
/// Holds at most one record per player, and only for players resolved above
/// [`SponsorLevel::None`](sponsors_protocol::SponsorLevel::None).
#[derive(Debug, Default)]
pub struct SponsorCache {
    state: RwLock<CacheState>,
}

impl SponsorCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    // A panic elsewhere can't leave the maps half-updated (every write is a
    // single insert/remove), so a poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a verification for `user_id`, invalidating any older ticket
    /// for the same player.
    pub fn begin(&self, user_id: UserId) -> VerificationTicket {
        let mut state = self.write();
        state.next_serial += 1;
        let serial = state.next_serial;
        state.pending.insert(user_id, serial);
        VerificationTicket {
            user_id,
            serial,
            granted_epoch: state.granted_epoch,
        }
    }

    /// Applies a finished verification.
    ///
    /// - `Some(record)` inserts it, overwriting an existing record.
    /// - `None` means the player resolved to no entitlement: any existing
    ///   record is removed.
    ///
    /// If the player's granted flag was written locally since `begin`, the
    /// local value replaces the one in `record`.
    ///
    /// If the ticket was invalidated in the meantime nothing happens and
    /// [`CommitOutcome::Superseded`] is returned.
    pub fn commit(
        &self,
        ticket: VerificationTicket,
        record: Option<SponsorRecord>,
    ) -> CommitOutcome {
        let mut state = self.write();
        if state.pending.get(&ticket.user_id) != Some(&ticket.serial) {
            return CommitOutcome::Superseded;
        }
        state.pending.remove(&ticket.user_id);

        match record {
            Some(mut record) => {
                debug_assert_eq!(record.user_id(), ticket.user_id);
                if let Some(local) =
                    state.local_granted_since(ticket.user_id, ticket.granted_epoch)
                {
                    record.is_granted = local;
                }
                let replaced = state
                    .records
                    .insert(ticket.user_id, record.clone())
                    .is_some();
                CommitOutcome::Applied {
                    replaced,
                    stored: Some(record),
                }
            }
            None => {
                state.granted_at.remove(&ticket.user_id);
                CommitOutcome::Applied {
                    replaced: state.records.remove(&ticket.user_id).is_some(),
                    stored: None,
                }
            }
        }
    }

    /// Gives up on a verification without touching the player's record.
    pub fn abandon(&self, ticket: VerificationTicket) {
        let mut state = self.write();
        if state.pending.get(&ticket.user_id) == Some(&ticket.serial) {
            state.pending.remove(&ticket.user_id);
        }
    }

    /// Returns `true` if a verification for `user_id` is in flight.
    pub fn is_pending(&self, user_id: UserId) -> bool {
        self.read().pending.contains_key(&user_id)
    }

    /// Removes the player's record and invalidates their pending
    /// verification. Returns the removed record, if any.
    pub fn remove(&self, user_id: UserId) -> Option<SponsorRecord> {
        let mut state = self.write();
        state.pending.remove(&user_id);
        state.granted_at.remove(&user_id);
        state.records.remove(&user_id)
    }

    /// Returns a copy of the player's record.
    pub fn get(&self, user_id: UserId) -> Option<SponsorRecord> {
        self.read().records.get(&user_id).cloned()
    }

    /// Sets the granted flag of an existing record.
    ///
    /// Returns `false` (and does nothing) if the player has no record.
    pub fn set_granted(&self, user_id: UserId, granted: bool) -> bool {
        let mut guard = self.write();
        let state = &mut *guard;
        let Some(record) = state.records.get_mut(&user_id) else {
            return false;
        };
        record.is_granted = granted;
        state.granted_epoch += 1;
        state.granted_at.insert(user_id, state.granted_epoch);
        true
    }

    /// Clears the granted flag on every record. Returns how many records
    /// were in the cache.
    pub fn reset_all_granted(&self) -> usize {
        let mut state = self.write();
        state.granted_epoch += 1;
        state.wiped_at = state.granted_epoch;
        // Every earlier grant is overridden by the wipe.
        state.granted_at.clear();
        for record in state.records.values_mut() {
            record.is_granted = false;
        }
        state.records.len()
    }

    /// A snapshot of all records, in no particular order.
    pub fn records(&self) -> Vec<SponsorRecord> {
        self.read().records.values().cloned().collect()
    }

    /// Number of cached records.
    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    /// Returns `true` if no records are cached.
    pub fn is_empty(&self) -> bool {
        self.read().records.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
