//! # Sponsors
//!
//! Sponsor entitlement tracking for game servers.
//!
//! When a player is verified, their roles in the community guild are looked
//! up on a remote entitlement service and turned into a [`SponsorLevel`].
//! Sponsors are cached for as long as they stay connected, so gameplay code
//! can ask "is this player a sponsor?" without ever waiting on the network.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sponsors::prelude::*;
//!
//! # async fn run() -> Result<(), SponsorsError> {
//! let settings = Settings::load("server.toml").await?;
//! let service = SponsorsService::builder()
//!     .config(settings.sponsors)
//!     .build()?;
//!
//! let (events, rx) = tokio::sync::mpsc::channel(256);
//! let lifecycle = service.spawn_lifecycle(rx);
//!
//! // Forward session events from the connection layer:
//! // events.send(SessionEvent::Verified(user_id)).await;
//! # drop(events);
//! # let _ = lifecycle.await;
//! # service.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod admin;
mod error;
mod handler;
mod service;
pub mod settings;
pub mod telemetry;

pub use admin::{AdminCommand, AdminPrivilege, AdminReply};
pub use error::SponsorsError;
pub use handler::SessionEvent;
pub use service::{SponsorsService, SponsorsServiceBuilder};

/// Everything needed to embed the sponsors service.
pub mod prelude {
    pub use crate::settings::Settings;
    pub use crate::{
        AdminCommand, AdminPrivilege, AdminReply, SessionEvent,
        SponsorsError, SponsorsService, SponsorsServiceBuilder,
    };
    pub use sponsors_cache::{
        PendingWrite, SponsorError, SponsorsManager, VerifyOutcome,
        WipeReceipt,
    };
    pub use sponsors_protocol::{
        ConfigReader, ConfigWatch, RoleId, RoleMapping, SponsorLevel,
        SponsorRecord, SponsorsConfig, UnknownRolePolicy, UserId,
    };
    pub use sponsors_remote::{
        EntitlementService, HttpEntitlementService, RemoteError,
    };
}
