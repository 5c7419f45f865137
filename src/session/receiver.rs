//! Receiver role session.
//!
//! Sends a filename over a pooled connection, decompresses the single reply,
//! and reports `"<filename>:OK:<content>"` or `"<filename>:ERROR:"`.
//!
//! Blocking throughout. Run it on a blocking worker, never on an async task.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::{debug, warn};

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::protocol::{error_status, ok_status};
use crate::transport::{BlockingConnection, ConnectionPool};

use super::{Outbound, emit};

// ============================================================================
// ReceiverSession
// ============================================================================

/// One filename-request exchange on a pooled connection.
#[derive(Debug)]
pub struct ReceiverSession {
    id: SessionId,
    filename: String,
    pool: Arc<ConnectionPool>,
    codec: Option<Arc<Codec>>,
    max_capacity: usize,
    outbound: Outbound,
}

impl ReceiverSession {
    /// Creates a session requesting `filename`.
    ///
    /// `max_capacity` bounds the decompressed size of the reply.
    #[must_use]
    pub fn new(
        filename: impl Into<String>,
        pool: Arc<ConnectionPool>,
        codec: Option<Arc<Codec>>,
        max_capacity: usize,
        outbound: Outbound,
    ) -> Self {
        Self {
            id: SessionId::generate(),
            filename: filename.into(),
            pool,
            codec,
            max_capacity,
            outbound,
        }
    }

    /// Returns the session ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the requested filename.
    #[inline]
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Runs the exchange, blocking the calling thread.
    ///
    /// On success the connection goes back to the pool and the decoded
    /// content is returned. On any failure the connection is discarded and
    /// `"<filename>:ERROR:"` is reported.
    ///
    /// # Errors
    ///
    /// - [`Error::CodecUnavailable`] if the codec failed to initialize
    /// - any connect, send or receive error from the transport
    /// - [`Error::Decompression`] / [`Error::CapacityExceeded`] for a bad reply
    pub fn run(self) -> Result<String> {
        debug!(session_id = %self.id, filename = %self.filename, "Receiver session started");

        match self.exchange() {
            Ok(content) => {
                let line = ok_status(&self.filename, &content);
                debug!(session_id = %self.id, filename = %self.filename, len = content.len(), "Receiver session finished");
                emit(&self.outbound, self.id, line);
                Ok(String::from_utf8_lossy(&content).into_owned())
            }
            Err(e) => {
                warn!(session_id = %self.id, filename = %self.filename, error = %e, "Receiver session failed");
                emit(&self.outbound, self.id, error_status(&self.filename));
                Err(e)
            }
        }
    }

    /// Reports failure without touching the pool or the backend.
    ///
    /// Used when the session could not be scheduled at all.
    pub fn abandon(self, error: &Error) {
        warn!(session_id = %self.id, filename = %self.filename, error = %error, "Receiver session abandoned");
        emit(&self.outbound, self.id, error_status(&self.filename));
    }

    fn exchange(&self) -> Result<Vec<u8>> {
        let codec = self.codec.as_deref().ok_or(Error::CodecUnavailable)?;

        let mut conn = self.pool.acquire()?;

        match self.transfer(&mut conn, codec) {
            Ok(content) => {
                self.pool.release(conn);
                Ok(content)
            }
            Err(e) => {
                self.pool.discard(conn);
                Err(e)
            }
        }
    }

    fn transfer(&self, conn: &mut BlockingConnection, codec: &Codec) -> Result<Vec<u8>> {
        conn.send(self.filename.as_bytes())?;
        let reply = conn.receive_one()?;

        debug!(
            session_id = %self.id,
            connection_id = %conn.id(),
            compressed_len = reply.len(),
            "Reply received"
        );

        codec.decompress(reply.as_bytes(), self.max_capacity)
    }
}

// ============================================================================
// Tests
// ============================================================================
