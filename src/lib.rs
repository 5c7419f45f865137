//! wsrelay - Compressing WebSocket relay with a reusable connection pool.
//!
//! This library sits between a host application and a WebSocket backend and
//! moves one request/response exchange per inbound host message.
//!
//! # Architecture
//!
//! The relay plays one of two roles:
//!
//! - **Sender**: compresses a host payload, sends it on a fresh connection,
//!   forwards the single reply back to the host unchanged
//! - **Receiver**: sends a filename on a pooled connection, decompresses the
//!   single reply, reports `"<filename>:OK:<content>"`
//!
//! Key design principles:
//!
//! - A connection is owned by exactly one session or by the pool, never both
//! - Failed connections are discarded, never pooled
//! - Every failure is reported to the host once; nothing is retried
//! - The dispatcher never blocks the caller
//!
//! # Quick Start
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use wsrelay::{HostMessage, Relay, Result, Role};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let (tx, mut rx) = mpsc::unbounded_channel();
//!
//!     // Receiver relay against the default backend
//!     let relay = Relay::builder()
//!         .role(Role::Receiver)
//!         .pre_warm(8)
//!         .outbound(tx)
//!         .build()?;
//!
//!     // One session per text message
//!     relay.handle_message(HostMessage::from("a.txt"));
//!
//!     if let Some(line) = rx.recv().await {
//!         println!("{line}");
//!     }
//!
//!     relay.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`codec`] | LZ4 block compression with bounded output |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Host message types and status lines |
//! | [`relay`] | Dispatcher, builder and options |
//! | [`session`] | Sender and receiver exchanges |
//! | [`transport`] | WebSocket connections and pool |

// ============================================================================
// Modules
// ============================================================================

/// Lossless block compression.
pub mod codec;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for connections and sessions.
pub mod identifiers;

/// Host-facing message types.
pub mod protocol;

/// Relay dispatcher and configuration.
///
/// Use [`Relay::builder()`] to create a configured relay.
pub mod relay;

/// Request/response sessions for both roles.
pub mod session;

/// WebSocket transport layer.
///
/// Connection state machine and the receiver connection pool.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Codec types
pub use codec::{Codec, DEFAULT_MAX_CAPACITY};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ConnectionId, SessionId};

// Protocol types
pub use protocol::{HostMessage, Payload};

// Relay types
pub use relay::{Relay, RelayBuilder, RelayOptions, Role};

// Transport types
pub use transport::{ConnectionPool, ConnectionState, Endpoint};
