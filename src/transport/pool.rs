//! Pool of idle, reusable blocking connections.
//!
//! Used by the receiver role. Connections move in and out by value, so a
//! pooled connection cannot also be held by a session.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │             ConnectionPool               │
//! │  Mutex<Vec<BlockingConnection>> (LIFO)   │
//! │   top ─► conn-9 (Idle)                   │
//! │          conn-4 (Idle)                   │
//! │          conn-2 (Idle)                   │
//! └──────────────────────────────────────────┘
//!   acquire(): pop top, or connect outside the lock
//!   release(): push healthy connection back as Idle
//! ```
//!
//! The lock is held only for the push or pop. Network I/O never happens
//! under it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;

use super::{BlockingConnection, Connection, Endpoint};

// ============================================================================
// ConnectionPool
// ============================================================================

/// LIFO collection of idle connections for one endpoint.
///
/// Grows without bound as connections are released. Thread-safe.
///
/// # Example
///
/// ```ignore
/// let pool = ConnectionPool::new(endpoint);
///
/// let mut conn = pool.acquire()?;
/// conn.send(b"a.txt")?;
/// let reply = conn.receive_one()?;
/// pool.release(conn);
/// ```
pub struct ConnectionPool {
    /// Backend every pooled connection targets.
    endpoint: Endpoint,

    /// Idle connections, most recently released last.
    idle: Mutex<Vec<BlockingConnection>>,
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("url", &self.endpoint.url().as_str())
            .field("idle", &self.idle_count())
            .finish()
    }
}

// ============================================================================
// ConnectionPool - Constructor
// ============================================================================

impl ConnectionPool {
    /// Creates an empty pool for `endpoint`.
    #[must_use]
    pub fn new(endpoint: Endpoint) -> Arc<Self> {
        debug!(url = %endpoint.url(), "ConnectionPool created");

        Arc::new(Self {
            endpoint,
            idle: Mutex::new(Vec::new()),
        })
    }
}

// ============================================================================
// ConnectionPool - Public API
// ============================================================================

impl ConnectionPool {
    /// Returns the endpoint of this pool.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns the number of idle connections.
    #[inline]
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Takes a connection for exclusive use, blocking if one must be created.
    ///
    /// Pops the most recently released idle connection. If none is idle, a
    /// new connection is opened outside the lock; it is not added to the
    /// pool until released.
    ///
    /// The returned connection is `Busy`.
    ///
    /// # Errors
    ///
    /// Returns the connect error if a new connection could not be opened.
    pub fn acquire(&self) -> Result<BlockingConnection> {
        let pooled = self.idle.lock().pop();

        let mut conn = match pooled {
            Some(conn) => {
                debug!(connection_id = %conn.id(), "Reusing pooled connection");
                conn
            }
            None => {
                debug!(url = %self.endpoint.url(), "Pool empty, connecting");
                let mut conn: BlockingConnection = Connection::new(self.endpoint.clone());
                conn.connect()?;
                conn
            }
        };

        conn.mark_busy()?;
        Ok(conn)
    }

    /// Returns a connection after a successful exchange.
    ///
    /// A connection that is no longer healthy is closed and dropped instead.
    pub fn release(&self, mut conn: BlockingConnection) {
        if !conn.is_healthy() {
            warn!(connection_id = %conn.id(), state = %conn.state(), "Unhealthy connection not pooled");
            self.discard(conn);
            return;
        }

        if let Err(e) = conn.mark_idle() {
            warn!(connection_id = %conn.id(), error = %e, "Connection not pooled");
            self.discard(conn);
            return;
        }

        let id = conn.id();
        let idle = {
            let mut idle = self.idle.lock();
            debug_assert!(
                idle.iter().all(|pooled| pooled.id() != id),
                "connection pooled twice"
            );
            idle.push(conn);
            idle.len()
        };

        debug!(connection_id = %id, idle, "Connection released");
    }

    /// Closes a connection without pooling it.
    pub fn discard(&self, mut conn: BlockingConnection) {
        let id = conn.id();
        let state = conn.state();
        conn.close();
        debug!(connection_id = %id, %state, "Connection discarded");
    }

    /// Opens `count` connections in the background and pools each on success.
    ///
    /// Returns immediately. Each connection is pushed independently as its
    /// handshake completes; `acquire` during this window falls back to
    /// on-demand creation. The handles resolve to `true` for each
    /// connection that made it into the pool.
    pub fn pre_warm(self: &Arc<Self>, runtime: &Handle, count: usize) -> Vec<JoinHandle<bool>> {
        info!(count, url = %self.endpoint.url(), "Pre-warming connection pool");

        (0..count)
            .map(|_| {
                let pool = Arc::clone(self);
                runtime.spawn_blocking(move || {
                    let mut conn: BlockingConnection = Connection::new(pool.endpoint.clone());
                    match conn.connect() {
                        Ok(()) => {
                            pool.release(conn);
                            true
                        }
                        Err(e) => {
                            warn!(error = %e, "Pre-warm connection failed");
                            false
                        }
                    }
                })
            })
            .collect()
    }

    /// Closes every idle connection.
    pub fn shutdown(&self) {
        let drained: Vec<_> = self.idle.lock().drain(..).collect();
        let count = drained.len();

        for conn in drained {
            self.discard(conn);
        }

        info!(count, "ConnectionPool drained");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transport::ConnectionState;

    fn closed_port_endpoint() -> Endpoint {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        Endpoint::parse(&format!("ws://127.0.0.1:{port}/a")).unwrap()
    }

    #[test]
    fn test_new_pool_is_empty() {
        let pool = ConnectionPool::new(closed_port_endpoint());
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_acquire_propagates_connect_error() {
        let pool = ConnectionPool::new(closed_port_endpoint());
        let err = pool.acquire().unwrap_err();
        assert!(err.is_connection_error());
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_release_unconnected_is_discarded() {
        let pool = ConnectionPool::new(closed_port_endpoint());
        let conn: BlockingConnection = Connection::new(pool.endpoint().clone());
        pool.release(conn);
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_release_failed_is_discarded() {
        let pool = ConnectionPool::new(closed_port_endpoint());
        let mut conn: BlockingConnection = Connection::new(pool.endpoint().clone());
        assert!(conn.connect().is_err());
        assert_eq!(conn.state(), ConnectionState::Failed);

        pool.release(conn);
        assert_eq!(pool.idle_count(), 0);
    }

    #[tokio::test]
    async fn test_pre_warm_failures_leave_pool_empty() {
        let pool = ConnectionPool::new(closed_port_endpoint());
        let handles = pool.pre_warm(&Handle::current(), 3);
        assert_eq!(handles.len(), 3);

        for handle in handles {
            assert!(!handle.await.unwrap());
        }
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_shutdown_empty_pool() {
        let pool = ConnectionPool::new(closed_port_endpoint());
        pool.shutdown();
        assert_eq!(pool.idle_count(), 0);
    }
}
