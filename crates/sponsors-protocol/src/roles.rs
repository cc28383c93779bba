//! Role resolution: turning provider role ids into a sponsor level.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, RoleId, SponsorLevel};

/// Guild role that grants the [`SponsorLevel::Normal`] tier.
pub const NORMAL_SPONSOR_ROLE: &str = "1150745050196738169";

/// Guild role that grants the [`SponsorLevel::Lord`] tier.
pub const LORD_SPONSOR_ROLE: &str = "1150488411447242844";

/// What to do with a role id that is not in the [`RoleMapping`].
///
/// A player usually holds plenty of roles that have nothing to do with
/// sponsorship, so skipping is the default. `Reject` makes resolution fail
/// outright, which aborts the player's verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownRolePolicy {
    /// Ignore the role and log a warning.
    #[default]
    Skip,
    /// Fail with [`ProtocolError::UnknownRole`].
    Reject,
}

/// An immutable lookup table from role id to sponsor level.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleMapping {
    levels: HashMap<RoleId, SponsorLevel>,
}

impl RoleMapping {
    /// The production mapping for the sponsor guild.
    pub fn builtin() -> Self {
        [
            (RoleId::from(NORMAL_SPONSOR_ROLE), SponsorLevel::Normal),
            (RoleId::from(LORD_SPONSOR_ROLE), SponsorLevel::Lord),
        ]
        .into_iter()
        .collect()
    }

    /// Looks up the level granted by a single role.
    pub fn level_of(&self, role: &RoleId) -> Option<SponsorLevel> {
        self.levels.get(role).copied()
    }

    /// Number of mapped roles.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Returns `true` if no roles are mapped.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Resolves a player's roles to the highest sponsor level they grant.
    ///
    /// Starts at [`SponsorLevel::None`] and keeps the maximum seen, so the
    /// result does not depend on the order of `roles`. An empty slice
    /// resolves to `None`.
    ///
    /// # Errors
    /// With [`UnknownRolePolicy::Reject`], the first unmapped role yields
    /// [`ProtocolError::UnknownRole`].
    pub fn resolve(
        &self,
        roles: &[RoleId],
        policy: UnknownRolePolicy,
    ) -> Result<SponsorLevel, ProtocolError> {
        let mut highest = SponsorLevel::None;

        for role in roles {
            match (self.level_of(role), policy) {
                (Some(level), _) => highest = highest.max(level),
                (None, UnknownRolePolicy::Skip) => {
                    tracing::warn!(%role, "ignoring unmapped role");
                }
                (None, UnknownRolePolicy::Reject) => {
                    return Err(ProtocolError::UnknownRole(role.clone()));
                }
            }
        }

        Ok(highest)
    }
}

impl Default for RoleMapping {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FromIterator<(RoleId, SponsorLevel)> for RoleMapping {
    fn from_iter<I: IntoIterator<Item = (RoleId, SponsorLevel)>>(
        iter: I,
    ) -> Self {
        Self {
            levels: iter.into_iter().collect(),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
