use sponsors_protocol::ProtocolError;

/// Errors that can occur when talking to the entitlement service.
///
/// Callers treat all variants the same way (log, abort the operation, leave
/// the cache alone), but keeping them apart makes the logs useful.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The HTTP request itself failed: connection refused, DNS, timeout.
    #[cfg(feature = "http")]
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The service could not be reached for a reason other than an HTTP
    /// error (used by non-HTTP implementations).
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with a non-success status code.
    #[error("unexpected status {0}")]
    Status(u16),

    /// The service answered 2xx but the body was not what we expected.
    #[error(transparent)]
    Malformed(#[from] ProtocolError),
}

impl RemoteError {
    /// Returns `true` if the request timed out.
    pub fn is_timeout(&self) -> bool {
        match self {
            #[cfg(feature = "http")]
            Self::Request(e) => e.is_timeout(),
            _ => false,
        }
    }
}
