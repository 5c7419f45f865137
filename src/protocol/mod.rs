//! Host-facing message types.
//!
//! This module defines what crosses the two boundaries of the relay:
//!
//! | Type | Direction | Purpose |
//! |------|-----------|---------|
//! | `HostMessage` | Host ↔ Relay | Inbound request / outbound progress and results |
//! | `Payload` | Backend → Relay | One received WebSocket message |
//!
//! # Outbound Lines
//!
//! | Role | Line |
//! |------|------|
//! | receiver | `<filename>:OK:<content>` or `<filename>:ERROR:` |
//! | sender | `compressing`, `done compressing`, then the forwarded reply |
//! | sender | `ERROR:<reason>` when a session fails |
//! | both | `failed to load` once, if the codec did not initialize |

// ============================================================================
// Submodules
// ============================================================================

/// Host message and payload types.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::{
    COMPRESSING, DONE_COMPRESSING, FAILED_TO_LOAD, HostMessage, Payload, error_status,
    ok_status, session_error,
};
