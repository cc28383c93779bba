//! Settings file loading.
//!
//! The sponsors settings live in a `[sponsors]` table of the server's TOML
//! file. Every key is optional:
//!
//! ```toml
//! [sponsors]
//! enabled = true
//! api_url = "https://sponsors.example.net/api"
//! api_key = "…"
//! guild_id = "1126278315364339712"
//! request_timeout_secs = 10
//! unknown_roles = "skip"
//! ```
//!
//! Other tables in the same file are ignored.

use std::path::Path;

use serde::Deserialize;
use sponsors_protocol::SponsorsConfig;

use crate::SponsorsError;

/// The parts of the server settings file this crate reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub sponsors: SponsorsConfig,
}

impl Settings {
    /// Loads settings from a TOML file.
    ///
    /// # Errors
    /// [`SponsorsError::ReadSettings`] if the file cannot be read,
    /// [`SponsorsError::ParseSettings`] if it is not valid.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SponsorsError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|source| {
            SponsorsError::ReadSettings {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let settings: Settings =
            toml::from_str(&content).map_err(|source| SponsorsError::ParseSettings {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!(path = %path.display(), config = ?settings.sponsors, "settings loaded");
        Ok(settings)
    }
}
