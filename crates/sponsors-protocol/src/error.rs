//! Error types for the protocol layer.

use crate::RoleId;

/// Errors that can occur while decoding service responses or resolving
/// roles.
///
/// Neither variant is fatal to the server: the cache logs them and skips
/// creating a record for the affected player.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The response body was not the JSON shape we expected.
    ///
    /// Covers invalid JSON as well as a missing or mistyped `"roles"`
    /// field. A missing field is never read as "no roles".
    #[cfg(feature = "json")]
    #[error("malformed response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// A role id is not present in the
    /// [`RoleMapping`](crate::RoleMapping) and the strict policy is active.
    #[error("unknown role id {0}")]
    UnknownRole(RoleId),
}
