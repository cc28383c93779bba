//! Core types: player identity, provider roles, and sponsor entitlements.
//!
//! These are the values that flow between the session layer, the cache,
//! and the remote entitlement service.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The stable identity of a player, as assigned by the host's network layer.
///
/// This is a newtype wrapper around a `Uuid`, so a `UserId` can never be
/// mixed up with any other UUID-shaped value in the server. It is `Copy`
/// and `Hash`, which makes it a cheap cache key.
///
/// `Display` prints the plain hyphenated UUID, which is also the exact
/// form the entitlement service expects in its `userid` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generates a fresh random id. Handy for tests and tooling.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// An opaque role identifier from the identity provider (a guild role id).
///
/// The service never interprets the contents; it only looks them up in a
/// [`RoleMapping`](crate::RoleMapping).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(pub String);

impl RoleId {
    /// Returns the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoleId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for RoleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// SponsorLevel
// ---------------------------------------------------------------------------

/// A ranked sponsorship tier.
///
/// The variants are declared lowest-first, so the derived `Ord` gives the
/// total order `None < Normal < Lord`. Role resolution relies on this: a
/// player holding several sponsor roles gets the *highest* one.
///
/// `#[repr(u8)]` pins the numeric values (0, 1, 2) used in log lines and
/// by other subsystems that store the level as a number.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
)]
#[repr(u8)]
pub enum SponsorLevel {
    /// Not a sponsor. Never stored in the cache.
    #[default]
    None = 0,
    /// Regular sponsor.
    Normal = 1,
    /// Top sponsor tier.
    Lord = 2,
}

impl SponsorLevel {
    /// Returns the numeric value of this level.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns `true` for any level above [`SponsorLevel::None`].
    pub fn is_sponsor(self) -> bool {
        self > SponsorLevel::None
    }
}

impl fmt::Display for SponsorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "None",
            Self::Normal => "Normal",
            Self::Lord => "Lord",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// SponsorRecord
// ---------------------------------------------------------------------------

/// The cached entitlement of one connected, verified sponsor.
///
/// A record is built in one go once both remote lookups have finished, and
/// its `level` is fixed for its whole life. If the player verifies again a
/// brand-new record replaces this one.
///
/// `is_granted` tracks whether the sponsor reward has already been handed
/// out this epoch. The remote service is the durable store for it; the
/// copy here is updated optimistically by the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorRecord {
    user_id: UserId,
    level: SponsorLevel,
    /// Whether the reward has been dispensed.
    pub is_granted: bool,
}

impl SponsorRecord {
    /// Creates a record. `level` should be above `None`; the cache never
    /// stores non-sponsors.
    pub fn new(user_id: UserId, level: SponsorLevel, is_granted: bool) -> Self {
        Self {
            user_id,
            level,
            is_granted,
        }
    }

    /// The player this record belongs to.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// The resolved sponsor level.
    pub fn level(&self) -> SponsorLevel {
        self.level
    }
}

// =========================================================================
// Tests
// =========================================================================
