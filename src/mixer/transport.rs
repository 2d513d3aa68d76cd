//! HTTP transport to the vMix web controller
//!
//! The transport performs exactly one GET per call with the connection timeout
//! applied. It never retries; retry policy belongs to the caller.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, trace};

use super::types::Connection;
use crate::error::TransportError;

/// Raw request seam between the engine/dispatcher and the network
///
/// `path` is the absolute path including any query string, e.g.
/// `/api/?Function=Cut&Input=3`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, connection: &Connection, path: &str) -> Result<String, TransportError>;
}

/// reqwest-backed transport
///
/// One client (and connection pool) is shared across reconnects; the per-request
/// timeout comes from the [`Connection`].
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, connection: &Connection, path: &str) -> Result<String, TransportError> {
        let url = format!("{}{}", connection.base_url(), path);
        trace!(url = %url, timeout_ms = connection.timeout.as_millis() as u64, "vMix GET");

        let mut request = self.client.get(&url).timeout(connection.timeout);
        if connection.credentials.is_set() {
            request = request.basic_auth(
                &connection.credentials.username,
                Some(&connection.credentials.password),
            );
        }

        let response = request.send().await.map_err(|e| {
            debug!(url = %url, error = %e, "vMix request failed");
            TransportError::from(e)
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!(url = %url, status = status.as_u16(), "vMix answered with error status");
            return Err(TransportError::HttpError(status.as_u16()));
        }

        response.text().await.map_err(TransportError::from)
    }
}
