//! Host messages and wire payloads.
//!
//! The host hands the relay one [`HostMessage`] per invocation and receives
//! [`HostMessage`] values back on the outbound channel. The backend speaks
//! in [`Payload`]s: one WebSocket text or binary message per direction.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::error::Error;

// ============================================================================
// Constants
// ============================================================================

/// Emitted by a sender session before compressing.
pub const COMPRESSING: &str = "compressing";

/// Emitted by a sender session after compressing.
pub const DONE_COMPRESSING: &str = "done compressing";

/// Emitted once when the codec fails to initialize.
pub const FAILED_TO_LOAD: &str = "failed to load";

/// Status tag for a successful receiver exchange.
const STATUS_OK: &str = "OK";

/// Status tag for a failed receiver exchange.
const STATUS_ERROR: &str = "ERROR";

// ============================================================================
// HostMessage
// ============================================================================

/// A value crossing the host boundary in either direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMessage {
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Binary(Vec<u8>),
    /// No value. Hosts may deliver this; the relay ignores it.
    Null,
}

impl HostMessage {
    /// Returns the text if this is a [`HostMessage::Text`].
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns `true` if this is a [`HostMessage::Text`].
    #[inline]
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

impl fmt::Display for HostMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Binary(data) => write!(f, "<{} bytes>", data.len()),
            Self::Null => f.write_str("<null>"),
        }
    }
}

impl From<&str> for HostMessage {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for HostMessage {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<u8>> for HostMessage {
    fn from(data: Vec<u8>) -> Self {
        Self::Binary(data)
    }
}

impl From<Payload> for HostMessage {
    fn from(payload: Payload) -> Self {
        match payload {
            Payload::Text(text) => Self::Text(text),
            Payload::Binary(data) => Self::Binary(data),
        }
    }
}

// ============================================================================
// Payload
// ============================================================================

/// Data of one WebSocket message received from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
}

impl Payload {
    /// Returns the payload bytes regardless of frame type.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(data) => data,
        }
    }

    /// Consumes the payload and returns its bytes.
    #[inline]
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(text) => text.into_bytes(),
            Self::Binary(data) => data,
        }
    }

    /// Returns the payload length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns `true` if the payload is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Status Lines
// ============================================================================

/// Builds `"<filename>:OK:<content>"`.
///
/// Content is decoded as UTF-8; invalid sequences become U+FFFD.
#[must_use]
pub fn ok_status(filename: &str, content: &[u8]) -> String {
    format!(
        "{filename}:{STATUS_OK}:{}",
        String::from_utf8_lossy(content)
    )
}

/// Builds `"<filename>:ERROR:"`.
#[must_use]
pub fn error_status(filename: &str) -> String {
    format!("{filename}:{STATUS_ERROR}:")
}

/// Builds the sender-side failure line `"ERROR:<reason>"`.
#[must_use]
pub fn session_error(error: &Error) -> String {
    format!("{STATUS_ERROR}:{error}")
}

// ============================================================================
// Tests
// ============================================================================
