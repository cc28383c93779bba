//! Error types for the cache layer.

use sponsors_remote::RemoteError;

/// Errors reported by a [`PendingWrite`](crate::PendingWrite).
///
/// Lookups on players without a record are not errors; those return
/// `None` or `false`. The variants here are only about remote writes that
/// did not make it to the entitlement service.
#[derive(Debug, thiserror::Error)]
pub enum SponsorError {
    /// The entitlement service rejected or never received the write.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The write queue was full and the write was dropped.
    #[error("remote write queue is full")]
    WriteQueueFull,

    /// The write worker has stopped (the manager was shut down).
    #[error("remote write worker is not running")]
    WriterClosed,
}
