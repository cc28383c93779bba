//! Decoding of entitlement service response bodies.
//!
//! The service speaks JSON. Only one endpoint (`/roles`) returns a body we
//! care about; the others are judged purely by their HTTP status.

#![cfg(feature = "json")]

use serde::Deserialize;

use crate::{ProtocolError, RoleId};

/// Body of a successful `GET /roles` response: `{"roles": ["…", …]}`.
///
/// `roles` is required. If the service answers `{}` or `{"roles": null}`
/// the decode fails, because an absent list means "something went wrong",
/// not "this player has no roles".
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RolesResponse {
    /// The player's role ids in the configured guild.
    pub roles: Vec<RoleId>,
}

/// Parses a `/roles` response body into the list of role ids.
///
/// # Errors
/// Returns [`ProtocolError::Decode`] for invalid JSON or a body without a
/// `roles` string array.
pub fn decode_roles(body: &[u8]) -> Result<Vec<RoleId>, ProtocolError> {
    serde_json::from_slice::<RolesResponse>(body)
        .map(|response| response.roles)
        .map_err(ProtocolError::Decode)
}
