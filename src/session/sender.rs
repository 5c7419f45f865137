//! Sender role session.
//!
//! Compresses a user payload, ships it to the backend on a fresh connection,
//! and forwards the backend's single reply to the host unchanged.
//!
//! # Outbound Sequence
//!
//! ```text
//! "compressing"  ->  "done compressing"  ->  <reply>
//!                          or
//! "ERROR:<reason>"   (once, at whichever step failed)
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::{debug, warn};

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::protocol::{COMPRESSING, DONE_COMPRESSING, HostMessage, session_error};
use crate::transport::{AsyncConnection, Connection, Endpoint};

use super::{Outbound, emit};

// ============================================================================
// SenderSession
// ============================================================================

/// One compress-send-forward exchange.
///
/// The connection is opened for this session only and closed once the reply
/// has been forwarded.
#[derive(Debug)]
pub struct SenderSession {
    id: SessionId,
    payload: String,
    endpoint: Endpoint,
    codec: Option<Arc<Codec>>,
    outbound: Outbound,
}

impl SenderSession {
    /// Creates a session for `payload`. Nothing happens until [`run`](Self::run).
    ///
    /// `codec` is `None` when the codec failed to initialize; the session
    /// then reports [`Error::CodecUnavailable`].
    #[must_use]
    pub fn new(
        payload: impl Into<String>,
        endpoint: Endpoint,
        codec: Option<Arc<Codec>>,
        outbound: Outbound,
    ) -> Self {
        Self {
            id: SessionId::generate(),
            payload: payload.into(),
            endpoint,
            codec,
            outbound,
        }
    }

    /// Returns the session ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Runs the exchange to completion.
    ///
    /// Any failure is reported to the host as `"ERROR:<reason>"` before it
    /// is returned.
    ///
    /// # Errors
    ///
    /// - [`Error::CodecUnavailable`] if the codec failed to initialize
    /// - [`Error::Connection`] / [`Error::ConnectionTimeout`] if connecting fails
    /// - [`Error::ReplyTimeout`] / [`Error::ConnectionClosed`] if no reply arrives
    pub async fn run(self) -> Result<()> {
        debug!(session_id = %self.id, len = self.payload.len(), "Sender session started");

        let result = self.exchange().await;

        match &result {
            Ok(()) => debug!(session_id = %self.id, "Sender session finished"),
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Sender session failed");
                emit(&self.outbound, self.id, session_error(e));
            }
        }

        result
    }

    async fn exchange(&self) -> Result<()> {
        let codec = self.codec.as_deref().ok_or(Error::CodecUnavailable)?;

        let mut conn: AsyncConnection = Connection::new(self.endpoint.clone());
        conn.connect().await?;

        let result = self.exchange_on(&mut conn, codec).await;
        conn.close().await;
        result
    }

    async fn exchange_on(&self, conn: &mut AsyncConnection, codec: &Codec) -> Result<()> {
        emit(&self.outbound, self.id, COMPRESSING);
        let compressed = codec.compress(self.payload.as_bytes())?;
        emit(&self.outbound, self.id, DONE_COMPRESSING);

        debug!(
            session_id = %self.id,
            connection_id = %conn.id(),
            len = self.payload.len(),
            compressed_len = compressed.len(),
            "Payload compressed"
        );

        conn.send(&compressed).await?;
        let reply = conn.receive_one().await?;

        emit(&self.outbound, self.id, HostMessage::from(reply));
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
