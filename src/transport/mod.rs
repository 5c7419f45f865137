//! WebSocket transport layer.
//!
//! This module handles communication between the relay and the backend
//! over WebSocket client connections.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                              ┌─────────────────┐
//! │  Relay (Rust)    │                              │  Backend        │
//! │                  │         WebSocket            │                 │
//! │  Connection ─────┼─────────────────────────────►│  /websocket/b   │
//! │  ConnectionPool ─┼─────────────────────────────►│  /websocket/a   │
//! │                  │   one message each way       │                 │
//! └──────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Connection::new` - Bind to an [`Endpoint`], state `Disconnected`
//! 2. `Connection::connect` - Handshake, state `Open`
//! 3. Session claims it, state `Busy`
//! 4. `ConnectionPool::release` - Back to the pool as `Idle`, or
//! 5. `Connection::close` / failure - `Closed` or `Failed`, dropped
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Connection state machine, blocking and async I/O |
//! | `endpoint` | Backend URL and timeouts |
//! | `pool` | LIFO pool of idle blocking connections |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and lifecycle.
pub mod connection;

/// Backend endpoint configuration.
pub mod endpoint;

/// Pool of reusable blocking connections.
pub mod pool;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{AsyncConnection, BlockingConnection, Connection, ConnectionState};
pub use endpoint::Endpoint;
pub use pool::ConnectionPool;
