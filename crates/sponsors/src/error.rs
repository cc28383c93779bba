//! Unified error type for the sponsors service.

use std::path::PathBuf;

use sponsors_cache::SponsorError;
use sponsors_protocol::ProtocolError;
use sponsors_remote::RemoteError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `sponsors` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant generates the `From` impls, so `?` converts
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum SponsorsError {
    /// A protocol-level error (decoding, role resolution).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A remote-level error (transport, status, malformed body).
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// A cache-level error (dropped or rejected remote write).
    #[error(transparent)]
    Sponsor(#[from] SponsorError),

    /// The settings file could not be read.
    #[error("failed to read settings file {path}")]
    ReadSettings {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid TOML for [`Settings`](crate::settings::Settings).
    #[error("failed to parse settings file {path}")]
    ParseSettings {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// An admin command name that does not exist.
    #[error("unknown admin command: {0}")]
    UnknownCommand(String),
}
