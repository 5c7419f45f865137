//! Transfer sessions.
//!
//! A session is one request/response exchange with the backend, started by
//! one inbound text message. Sessions never share a connection and never
//! retry; a failed session reports once and ends.
//!
//! | Role | Type | Runs on | Connection |
//! |------|------|---------|------------|
//! | sender | [`SenderSession`] | tokio task | fresh, closed after the exchange |
//! | receiver | [`ReceiverSession`] | blocking worker | taken from the pool |

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;
use tracing::debug;

use crate::identifiers::SessionId;
use crate::protocol::HostMessage;

// ============================================================================
// Submodules
// ============================================================================

/// Receiver role: filename in, decompressed content out.
pub mod receiver;

/// Sender role: payload in, forwarded reply out.
pub mod sender;

// ============================================================================
// Re-exports
// ============================================================================

pub use receiver::ReceiverSession;
pub use sender::SenderSession;

// ============================================================================
// Outbound
// ============================================================================

/// Channel on which sessions report to the host.
pub type Outbound = mpsc::UnboundedSender<HostMessage>;

/// Sends `message` to the host. A host that stopped listening is not an error.
pub(crate) fn emit(outbound: &Outbound, session_id: SessionId, message: impl Into<HostMessage>) {
    if outbound.send(message.into()).is_err() {
        debug!(session_id = %session_id, "Host receiver dropped, message discarded");
    }
}

// ============================================================================
// Tests
// ============================================================================
