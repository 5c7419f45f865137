//! Error types for the relay.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use wsrelay::{Codec, Result};
//!
//! fn roundtrip(codec: &Codec, data: &[u8]) -> Result<Vec<u8>> {
//!     let compressed = codec.compress(data)?;
//!     codec.decompress(&compressed, data.len())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Codec | [`Error::Initialization`], [`Error::CodecUnavailable`], [`Error::Compression`], [`Error::Decompression`], [`Error::CapacityExceeded`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`], [`Error::ReplyTimeout`], [`Error::InvalidState`] |
//! | External | [`Error::Io`], [`Error::WebSocket`] |
//!
//! No variant is fatal to the process. Sessions surface every error to the
//! host as a tagged text message and end.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::ConnectionId;
use crate::transport::ConnectionState;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when relay configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Codec Errors
    // ========================================================================
    /// The compression codec failed its startup self-test.
    ///
    /// Reported once to the host as `"failed to load"`.
    #[error("Codec initialization failed: {message}")]
    Initialization {
        /// Description of the initialization failure.
        message: String,
    },

    /// A session needed the codec but it never initialized.
    #[error("Codec unavailable")]
    CodecUnavailable,

    /// Compression pass failed.
    #[error("Compression failed: {message}")]
    Compression {
        /// Description of the compression failure.
        message: String,
    },

    /// Compressed input is corrupt or truncated.
    #[error("Decompression failed: {message}")]
    Decompression {
        /// Description of the decoding failure.
        message: String,
    },

    /// Decompressed output would not fit in the allocated buffer.
    #[error("Decompressed size exceeds capacity of {capacity} bytes")]
    CapacityExceeded {
        /// Capacity of the output buffer in bytes.
        capacity: usize,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when a connection cannot be established or an I/O step fails.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection establishment timed out.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// WebSocket connection closed by the backend.
    #[error("Connection closed")]
    ConnectionClosed,

    /// No reply arrived within the configured reply timeout.
    #[error("No reply on {connection_id} after {timeout_ms}ms")]
    ReplyTimeout {
        /// Connection that was waiting.
        connection_id: ConnectionId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Operation not allowed in the connection's current state.
    #[error("Invalid state transition on {connection_id}: {from} -> {to}")]
    InvalidState {
        /// Connection the transition was attempted on.
        connection_id: ConnectionId,
        /// Current state.
        from: ConnectionState,
        /// Requested state.
        to: ConnectionState,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a codec initialization error.
    #[inline]
    pub fn initialization(message: impl Into<String>) -> Self {
        Self::Initialization {
            message: message.into(),
        }
    }

    /// Creates a compression error.
    #[inline]
    pub fn compression(message: impl Into<String>) -> Self {
        Self::Compression {
            message: message.into(),
        }
    }

    /// Creates a decompression error.
    #[inline]
    pub fn decompression(message: impl Into<String>) -> Self {
        Self::Decompression {
            message: message.into(),
        }
    }

    /// Creates a capacity exceeded error.
    #[inline]
    pub fn capacity_exceeded(capacity: usize) -> Self {
        Self::CapacityExceeded { capacity }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a reply timeout error.
    #[inline]
    pub fn reply_timeout(connection_id: ConnectionId, timeout_ms: u64) -> Self {
        Self::ReplyTimeout {
            connection_id,
            timeout_ms,
        }
    }

    /// Creates an invalid state transition error.
    #[inline]
    pub fn invalid_state(
        connection_id: ConnectionId,
        from: ConnectionState,
        to: ConnectionState,
    ) -> Self {
        Self::InvalidState {
            connection_id,
            from,
            to,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::ReplyTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    ///
    /// A connection involved in one of these must be discarded, never pooled.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::ReplyTimeout { .. }
                | Self::WebSocket(_)
                | Self::Io(_)
        )
    }

    /// Returns `true` if this error came from the compression codec.
    #[inline]
    #[must_use]
    pub fn is_codec_error(&self) -> bool {
        matches!(
            self,
            Self::Initialization { .. }
                | Self::CodecUnavailable
                | Self::Compression { .. }
                | Self::Decompression { .. }
                | Self::CapacityExceeded { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("refused");
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_capacity_display() {
        let err = Error::capacity_exceeded(64);
        assert_eq!(
            err.to_string(),
            "Decompressed size exceeds capacity of 64 bytes"
        );
    }

    #[test]
    fn test_invalid_state_display() {
        let id = ConnectionId::from_raw(7);
        let err = Error::invalid_state(id, ConnectionState::Closed, ConnectionState::Busy);
        assert_eq!(
            err.to_string(),
            "Invalid state transition on conn-7: closed -> busy"
        );
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::reply_timeout(ConnectionId::from_raw(1), 500);
        let other_err = Error::connection("test");

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::connection_timeout(10).is_connection_error());
        assert!(!Error::config("test").is_connection_error());
        assert!(!Error::decompression("bad").is_connection_error());
    }

    #[test]
    fn test_is_codec_error() {
        assert!(Error::capacity_exceeded(1).is_codec_error());
        assert!(Error::CodecUnavailable.is_codec_error());
        assert!(Error::initialization("probe").is_codec_error());
        assert!(!Error::ConnectionClosed.is_codec_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::ConnectionRefused, "refused");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_connection_error());
    }
}
