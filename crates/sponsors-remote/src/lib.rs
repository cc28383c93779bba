//! Entitlement service abstraction for the sponsors service.
//!
//! Provides the [`EntitlementService`] trait, the four remote operations the
//! cache depends on, and an HTTP implementation of it.
//!
//! # Feature Flags
//!
//! - `http` (default): [`HttpEntitlementService`] via `reqwest`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "http")]
mod http;

pub use error::RemoteError;
#[cfg(feature = "http")]
pub use http::HttpEntitlementService;

use std::future::Future;

use sponsors_protocol::{RoleId, UserId};

/// The remote system of record for roles and the "granted" flag.
///
/// The four operations are independent requests with no transactional
/// coupling. Callers must cope with any one of them failing while the
/// others succeed.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static` → one instance is shared by every verification
///   task and by the write queue worker.
/// - The returned futures are `Send` so they can run inside `tokio::spawn`.
pub trait EntitlementService: Send + Sync + 'static {
    /// Fetches the player's role ids in the configured guild.
    ///
    /// # Errors
    /// [`RemoteError::Status`] on a non-2xx answer,
    /// [`RemoteError::Malformed`] if the body has no `roles` array,
    /// [`RemoteError::Request`] on network failure.
    fn fetch_roles(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<RoleId>, RemoteError>> + Send;

    /// Asks whether the player's reward has already been granted.
    ///
    /// `Ok(true)` only for HTTP 200; every other status is `Ok(false)`.
    /// Only a failure to get any answer at all is an `Err`.
    fn fetch_granted(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<bool, RemoteError>> + Send;

    /// Persists the player's granted flag.
    fn set_granted(
        &self,
        user_id: UserId,
        granted: bool,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Resets the granted flag of every player on the remote side.
    fn wipe_granted(
        &self,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;
}
