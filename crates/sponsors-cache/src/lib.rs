//! Sponsor entitlement cache for the sponsors service.
//!
//! This crate sits between the session layer's lifecycle notifications and
//! the unreliable remote entitlement service:
//!
//! 1. **Cache** ([`SponsorCache`]): the in-memory map from player to
//!    [`SponsorRecord`](sponsors_protocol::SponsorRecord), safe for
//!    concurrent readers and writers.
//! 2. **Manager** ([`SponsorsManager`]): the verify / disconnect / grant /
//!    wipe protocol on top of the cache.
//! 3. **Write queue** ([`PendingWrite`]): a bounded, single-worker queue
//!    for remote writes, so admin actions never spawn unbounded requests.
//!
//! # How it fits in the stack
//!
//! ```text
//! Lifecycle glue (above)  ← forwards "verified" / "disconnected" events
//!     ↕
//! Cache layer (this crate)  ← owns every cached entitlement
//!     ↕
//! Remote layer (below)  ← fetches roles, reads and writes the granted flag
//! ```

mod cache;
mod error;
mod manager;
mod writer;

pub use cache::{CommitOutcome, SponsorCache, VerificationTicket};
pub use error::SponsorError;
pub use manager::{SponsorsManager, VerifyOutcome, WipeReceipt};
pub use writer::{PendingWrite, RemoteWrite};
