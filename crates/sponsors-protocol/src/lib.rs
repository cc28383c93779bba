//! Shared vocabulary for the sponsors service.
//!
//! This crate defines the types every other layer speaks:
//!
//! - **Types** ([`UserId`], [`RoleId`], [`SponsorLevel`], [`SponsorRecord`]):
//!   who a player is and what they are entitled to.
//! - **Roles** ([`RoleMapping`], [`UnknownRolePolicy`]): how provider role
//!   identifiers turn into a sponsor level.
//! - **Codec** ([`decode_roles`]): how the entitlement service's response
//!   bodies are turned into Rust values.
//! - **Config** ([`SponsorsConfig`], [`ConfigWatch`], [`ConfigReader`]):
//!   the live-reloadable settings shared by the client and the cache.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! ```text
//! Lifecycle glue (sponsors) → Cache (sponsors-cache) → Remote (sponsors-remote)
//!                                   ↘        ↓        ↙
//!                                 Protocol (this crate)
//! ```
//!
//! Nothing in here performs I/O.

mod codec;
mod config;
mod error;
mod roles;
mod types;

#[cfg(feature = "json")]
pub use codec::{RolesResponse, decode_roles};
pub use config::{ConfigReader, ConfigWatch, SponsorsConfig};
pub use error::ProtocolError;
pub use roles::{LORD_SPONSOR_ROLE, NORMAL_SPONSOR_ROLE, RoleMapping, UnknownRolePolicy};
pub use types::{RoleId, SponsorLevel, SponsorRecord, UserId};
