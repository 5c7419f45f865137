//! Backend endpoint description.
//!
//! An [`Endpoint`] is the fixed WebSocket URL one role talks to, plus the
//! connect and reply timeouts applied to every connection opened against it.

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for awaiting the single reply of an exchange.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Endpoint
// ============================================================================

/// WebSocket backend address and per-connection timeouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Backend URL (`ws://`).
    url: Url,
    /// Limit on TCP connect plus WebSocket handshake. `None` waits forever.
    connect_timeout: Option<Duration>,
    /// Limit on waiting for a reply. `None` waits forever.
    reply_timeout: Option<Duration>,
}

impl Endpoint {
    /// Parses and validates a backend URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL does not parse, is not `ws`, or
    /// has no host.
    pub fn parse(url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| Error::config(format!("Invalid backend URL '{url}': {e}")))?;

        if url.scheme() != "ws" {
            return Err(Error::config(format!(
                "Backend URL must use ws://, got '{}'",
                url.scheme()
            )));
        }

        if url.host_str().is_none() {
            return Err(Error::config(format!("Backend URL has no host: {url}")));
        }

        Ok(Self {
            url,
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            reply_timeout: Some(DEFAULT_REPLY_TIMEOUT),
        })
    }

    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the reply timeout.
    #[inline]
    #[must_use]
    pub fn with_reply_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// Returns the backend URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the connect timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// Returns the reply timeout.
    #[inline]
    #[must_use]
    pub fn reply_timeout(&self) -> Option<Duration> {
        self.reply_timeout
    }

    /// Resolves the URL host to every socket address, in resolver order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if resolution fails or yields nothing.
    pub fn resolve(&self) -> Result<Vec<SocketAddr>> {
        let addrs = self
            .url
            .socket_addrs(|| None)
            .map_err(|e| Error::connection(format!("Cannot resolve {}: {e}", self.url)))?;

        if addrs.is_empty() {
            return Err(Error::connection(format!("No address for {}", self.url)));
        }

        Ok(addrs)
    }
}

/// Converts a duration to whole milliseconds, saturating.
pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Tests
// ============================================================================
