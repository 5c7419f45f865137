//! Relay configuration.
//!
//! [`RelayOptions`] is the plain-data form of the relay settings. It derives
//! `Deserialize` so hosts can load it from their own config files; every
//! field has a default.
//!
//! # Example
//!
//! ```ignore
//! use wsrelay::{RelayOptions, Role};
//!
//! let options: RelayOptions = serde_json::from_str(r#"{
//!     "role": "receiver",
//!     "pre_warm": 10,
//!     "reply_timeout_ms": null
//! }"#)?;
//!
//! assert_eq!(options.role, Role::Receiver);
//! assert_eq!(options.reply_timeout(), None);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::codec::DEFAULT_MAX_CAPACITY;

// ============================================================================
// Constants
// ============================================================================

/// Default backend for the sender role.
pub const DEFAULT_SENDER_BACKEND: &str = "ws://localhost:8081/prj2/websocket/b";

/// Default backend for the receiver role.
pub const DEFAULT_RECEIVER_BACKEND: &str = "ws://localhost:8081/prj2/websocket/a";

/// Connections opened in the background when a receiver relay starts.
pub const DEFAULT_PRE_WARM: usize = 75;

/// Receiver sessions allowed to run at once.
pub const DEFAULT_MAX_WORKERS: usize = 64;

/// Default connect and reply timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

// ============================================================================
// Role
// ============================================================================

/// Which side of the transfer a relay plays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Compresses host payloads and forwards the backend's reply.
    Sender,
    /// Requests files by name and decompresses the backend's reply.
    #[default]
    Receiver,
}

impl Role {
    /// Returns the backend URL used when none is configured.
    #[inline]
    #[must_use]
    pub const fn default_backend(self) -> &'static str {
        match self {
            Self::Sender => DEFAULT_SENDER_BACKEND,
            Self::Receiver => DEFAULT_RECEIVER_BACKEND,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sender => f.write_str("sender"),
            Self::Receiver => f.write_str("receiver"),
        }
    }
}

// ============================================================================
// RelayOptions
// ============================================================================

/// Relay settings.
///
/// Timeouts are in milliseconds; `None` waits without limit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RelayOptions {
    /// Role of the relay.
    pub role: Role,

    /// Backend URL. `None` uses [`Role::default_backend`].
    pub backend_url: Option<String>,

    /// Connections to open in the background at startup (receiver only).
    pub pre_warm: usize,

    /// Largest decompressed reply accepted, in bytes (receiver only).
    pub max_capacity: usize,

    /// Concurrent receiver sessions.
    pub max_workers: usize,

    /// Limit on TCP connect plus WebSocket handshake.
    pub connect_timeout_ms: Option<u64>,

    /// Limit on waiting for the backend's reply.
    pub reply_timeout_ms: Option<u64>,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            role: Role::default(),
            backend_url: None,
            pre_warm: DEFAULT_PRE_WARM,
            max_capacity: DEFAULT_MAX_CAPACITY,
            max_workers: DEFAULT_MAX_WORKERS,
            connect_timeout_ms: Some(DEFAULT_TIMEOUT_MS),
            reply_timeout_ms: Some(DEFAULT_TIMEOUT_MS),
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl RelayOptions {
    /// Creates default options for the sender role.
    #[must_use]
    pub fn sender() -> Self {
        Self {
            role: Role::Sender,
            ..Default::default()
        }
    }

    /// Creates default options for the receiver role.
    #[must_use]
    pub fn receiver() -> Self {
        Self {
            role: Role::Receiver,
            ..Default::default()
        }
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl RelayOptions {
    /// Returns the configured backend URL or the role default.
    #[inline]
    #[must_use]
    pub fn backend(&self) -> &str {
        self.backend_url
            .as_deref()
            .unwrap_or_else(|| self.role.default_backend())
    }

    /// Returns the connect timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    /// Returns the reply timeout.
    #[inline]
    #[must_use]
    pub fn reply_timeout(&self) -> Option<Duration> {
        self.reply_timeout_ms.map(Duration::from_millis)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RelayOptions::default();
        assert_eq!(options.role, Role::Receiver);
        assert_eq!(options.pre_warm, 75);
        assert_eq!(options.max_capacity, DEFAULT_MAX_CAPACITY);
        assert_eq!(options.connect_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(options.reply_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_backend_falls_back_to_role_default() {
        assert_eq!(RelayOptions::sender().backend(), DEFAULT_SENDER_BACKEND);
        assert_eq!(RelayOptions::receiver().backend(), DEFAULT_RECEIVER_BACKEND);

        let options = RelayOptions {
            backend_url: Some("ws://example.test/x".into()),
            ..RelayOptions::sender()
        };
        assert_eq!(options.backend(), "ws://example.test/x");
    }

    #[test]
    fn test_deserialize_partial() {
        let options: RelayOptions =
            serde_json::from_str(r#"{"role": "sender", "max_workers": 4}"#).unwrap();
        assert_eq!(options.role, Role::Sender);
        assert_eq!(options.max_workers, 4);
        assert_eq!(options.pre_warm, DEFAULT_PRE_WARM);
    }

    #[test]
    fn test_deserialize_null_timeout_is_unbounded() {
        let options: RelayOptions =
            serde_json::from_str(r#"{"reply_timeout_ms": null}"#).unwrap();
        assert_eq!(options.reply_timeout(), None);
        assert_eq!(options.connect_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_deserialize_rejects_unknown_role() {
        let result: Result<RelayOptions, _> = serde_json::from_str(r#"{"role": "proxy"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Sender.to_string(), "sender");
        assert_eq!(Role::Receiver.to_string(), "receiver");
    }
}
