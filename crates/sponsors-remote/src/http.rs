//! HTTP implementation of [`EntitlementService`] using `reqwest`.
//!
//! Endpoints, relative to the configured base URL:
//!
//! ```text
//! GET  /roles?userid=…&guildid=…&api_token=…   → 200 {"roles": [...]}
//! GET  /is_given?userid=…&api_token=…          → 200 means granted
//! POST /given?userid=…&given=0|1&api_token=…   → 2xx
//! POST /wipe_given?api_token=…                 → 2xx
//! ```
//!
//! The API key travels in the query string, so full request URLs are never
//! logged.

use sponsors_protocol::{
    ConfigReader, RoleId, SponsorsConfig, UserId, decode_roles,
};

use crate::{EntitlementService, RemoteError};

/// Talks to the entitlement service over HTTP.
///
/// Holds a single `reqwest::Client`, whose connection pool is shared by
/// every request. The client is internally reference-counted and safe to
/// use from many tasks at once.
///
/// Each request takes a fresh config snapshot, so a changed URL, key,
/// guild, or timeout applies from the next request on.
#[derive(Debug, Clone)]
pub struct HttpEntitlementService {
    client: reqwest::Client,
    config: ConfigReader,
}

impl HttpEntitlementService {
    /// Creates a service with a default `reqwest` client.
    ///
    /// # Errors
    /// Returns [`RemoteError::Request`] if the TLS backend fails to
    /// initialize.
    pub fn new(config: ConfigReader) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sponsors/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(RemoteError::Request)?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a service around an existing client.
    pub fn with_client(client: reqwest::Client, config: ConfigReader) -> Self {
        Self { client, config }
    }
}

fn endpoint(config: &SponsorsConfig, path: &str) -> String {
    format!("{}/{path}", config.base_url())
}

/// Maps a non-2xx answer to [`RemoteError::Status`].
fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(RemoteError::Status(status.as_u16()))
    }
}

impl EntitlementService for HttpEntitlementService {
    async fn fetch_roles(
        &self,
        user_id: UserId,
    ) -> Result<Vec<RoleId>, RemoteError> {
        let config = self.config.current();
        let user = user_id.to_string();

        let response = self
            .client
            .get(endpoint(&config, "roles"))
            .query(&[
                ("userid", user.as_str()),
                ("guildid", config.guild_id.as_str()),
                ("api_token", config.api_key.as_str()),
            ])
            .timeout(config.request_timeout())
            .send()
            .await
            .map_err(RemoteError::Request)?;
        let response = ensure_success(response)?;

        let body = response.bytes().await.map_err(RemoteError::Request)?;
        let roles = decode_roles(&body)?;

        tracing::debug!(%user_id, count = roles.len(), "fetched roles");
        Ok(roles)
    }

    async fn fetch_granted(&self, user_id: UserId) -> Result<bool, RemoteError> {
        let config = self.config.current();
        let user = user_id.to_string();

        let response = self
            .client
            .get(endpoint(&config, "is_given"))
            .query(&[
                ("userid", user.as_str()),
                ("api_token", config.api_key.as_str()),
            ])
            .timeout(config.request_timeout())
            .send()
            .await
            .map_err(RemoteError::Request)?;

        // Exactly 200, not "any 2xx". The service answers 404 for
        // "not granted" and we can't tell that apart from other failures.
        let granted = response.status() == reqwest::StatusCode::OK;
        tracing::debug!(
            %user_id,
            status = response.status().as_u16(),
            granted,
            "fetched granted status"
        );
        Ok(granted)
    }

    async fn set_granted(
        &self,
        user_id: UserId,
        granted: bool,
    ) -> Result<(), RemoteError> {
        let config = self.config.current();
        let user = user_id.to_string();
        let flag = if granted { "1" } else { "0" };

        let response = self
            .client
            .post(endpoint(&config, "given"))
            .query(&[
                ("userid", user.as_str()),
                ("given", flag),
                ("api_token", config.api_key.as_str()),
            ])
            .timeout(config.request_timeout())
            .send()
            .await
            .map_err(RemoteError::Request)?;
        ensure_success(response)?;

        tracing::debug!(%user_id, granted, "stored granted status");
        Ok(())
    }

    async fn wipe_granted(&self) -> Result<(), RemoteError> {
        let config = self.config.current();

        let response = self
            .client
            .post(endpoint(&config, "wipe_given"))
            .query(&[("api_token", config.api_key.as_str())])
            .timeout(config.request_timeout())
            .send()
            .await
            .map_err(RemoteError::Request)?;
        ensure_success(response)?;

        tracing::debug!("wiped granted status on the remote side");
        Ok(())
    }
}
