//! Relay dispatcher.
//!
//! The [`Relay`] is the object a host owns. It turns each inbound text
//! message into exactly one session and returns at once; results arrive on
//! the outbound channel.
//!
//! # Example
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use wsrelay::{HostMessage, Relay, Role};
//!
//! # async fn example() -> wsrelay::Result<()> {
//! let (tx, mut rx) = mpsc::unbounded_channel();
//!
//! let relay = Relay::builder()
//!     .role(Role::Receiver)
//!     .backend("ws://localhost:8081/prj2/websocket/a")
//!     .outbound(tx)
//!     .build()?;
//!
//! relay.handle_message(HostMessage::from("a.txt"));
//! let line = rx.recv().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::protocol::{FAILED_TO_LOAD, HostMessage};
use crate::session::{Outbound, ReceiverSession, SenderSession};
use crate::transport::{ConnectionPool, Endpoint};

use super::builder::RelayBuilder;
use super::options::Role;

// ============================================================================
// Types
// ============================================================================

/// Role-specific resources.
pub(crate) enum RoleState {
    /// Sender sessions open their own connections.
    Sender,
    /// Receiver sessions share a pool and a bounded set of workers.
    Receiver {
        pool: Arc<ConnectionPool>,
        workers: Arc<Semaphore>,
    },
}

/// Internal shared state for the relay.
pub(crate) struct RelayInner {
    /// Role resources.
    pub role: RoleState,

    /// Backend for every session.
    pub endpoint: Endpoint,

    /// Largest decompressed reply accepted.
    pub max_capacity: usize,

    /// `None` if the codec failed to initialize.
    pub codec: Option<Arc<Codec>>,

    /// Host-facing sink.
    pub outbound: Outbound,

    /// Runtime sessions are spawned on.
    pub runtime: Handle,

    /// Sessions spawned and not yet finished.
    pub active: Arc<AtomicUsize>,
}

// ============================================================================
// Relay
// ============================================================================

/// Dispatcher between a host and one backend.
///
/// Cheap to clone; clones share the pool, codec and outbound channel.
/// [`handle_message`](Self::handle_message) may be called from any thread.
#[derive(Clone)]
pub struct Relay {
    /// Shared inner state.
    pub(crate) inner: Arc<RelayInner>,
}

// ============================================================================
// Relay - Display
// ============================================================================

impl fmt::Debug for Relay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relay")
            .field("role", &self.role())
            .field("url", &self.inner.endpoint.url().as_str())
            .field("codec_loaded", &self.codec_loaded())
            .field("active_sessions", &self.active_sessions())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Relay - Public API
// ============================================================================

impl Relay {
    /// Creates a configuration builder for the relay.
    #[inline]
    #[must_use]
    pub fn builder() -> RelayBuilder {
        RelayBuilder::new()
    }

    /// Returns the role of this relay.
    #[inline]
    #[must_use]
    pub fn role(&self) -> Role {
        match self.inner.role {
            RoleState::Sender => Role::Sender,
            RoleState::Receiver { .. } => Role::Receiver,
        }
    }

    /// Returns the backend endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.inner.endpoint
    }

    /// Returns the connection pool of a receiver relay.
    #[inline]
    #[must_use]
    pub fn pool(&self) -> Option<&Arc<ConnectionPool>> {
        match &self.inner.role {
            RoleState::Sender => None,
            RoleState::Receiver { pool, .. } => Some(pool),
        }
    }

    /// Returns `true` if the codec passed its startup self-test.
    #[inline]
    #[must_use]
    pub fn codec_loaded(&self) -> bool {
        self.inner.codec.is_some()
    }

    /// Returns the number of sessions that have not finished yet.
    #[inline]
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Starts one session for an inbound host message.
    ///
    /// Text is treated as the sender payload or the receiver filename,
    /// depending on the role. Anything else is ignored and `None` is
    /// returned. Never blocks; the returned handle may be dropped.
    pub fn handle_message(&self, message: HostMessage) -> Option<JoinHandle<()>> {
        let text = match message {
            HostMessage::Text(text) => text,
            other => {
                trace!(message = %other, "Ignoring non-text host message");
                return None;
            }
        };

        let guard = ActiveGuard::enter(&self.inner.active);

        let handle = match &self.inner.role {
            RoleState::Sender => self.spawn_sender(text, guard),
            RoleState::Receiver { pool, workers } => {
                self.spawn_receiver(text, Arc::clone(pool), Arc::clone(workers), guard)
            }
        };

        Some(handle)
    }

    /// Stops accepting receiver work and closes every idle connection.
    ///
    /// Sessions already running finish normally. Later receiver requests
    /// are answered with `"<filename>:ERROR:"`.
    pub fn shutdown(&self) {
        if let RoleState::Receiver { pool, workers } = &self.inner.role {
            workers.close();
            pool.shutdown();
        }

        info!(role = %self.role(), active = self.active_sessions(), "Relay shut down");
    }
}

// ============================================================================
// Relay - Internal API
// ============================================================================

impl Relay {
    /// Creates a relay from validated settings.
    ///
    /// A failed codec is reported once as `"failed to load"`; the relay is
    /// still returned and its sessions report the failure individually.
    pub(crate) fn new(
        role: Role,
        endpoint: Endpoint,
        codec: Result<Codec>,
        settings: RelaySettings,
    ) -> Self {
        let RelaySettings {
            pre_warm,
            max_capacity,
            max_workers,
            outbound,
            runtime,
        } = settings;

        let codec = match codec {
            Ok(codec) => Some(Arc::new(codec)),
            Err(e) => {
                error!(error = %e, "Codec failed to load");
                if outbound.send(HostMessage::from(FAILED_TO_LOAD)).is_err() {
                    debug!("Host receiver dropped before codec report");
                }
                None
            }
        };

        let role_state = match role {
            Role::Sender => RoleState::Sender,
            Role::Receiver => {
                let pool = ConnectionPool::new(endpoint.clone());
                if pre_warm > 0 {
                    drop(pool.pre_warm(&runtime, pre_warm));
                }
                RoleState::Receiver {
                    pool,
                    workers: Arc::new(Semaphore::new(max_workers)),
                }
            }
        };

        info!(
            %role,
            url = %endpoint.url(),
            codec_loaded = codec.is_some(),
            pre_warm,
            max_workers,
            "Relay started"
        );

        Self {
            inner: Arc::new(RelayInner {
                role: role_state,
                endpoint,
                max_capacity,
                codec,
                outbound,
                runtime,
                active: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    fn spawn_sender(&self, payload: String, guard: ActiveGuard) -> JoinHandle<()> {
        let session = SenderSession::new(
            payload,
            self.inner.endpoint.clone(),
            self.inner.codec.clone(),
            self.inner.outbound.clone(),
        );

        debug!(session_id = %session.id(), "Spawning sender session");

        self.inner.runtime.spawn(async move {
            let _guard = guard;
            // Failures are already reported to the host by the session.
            let _ = session.run().await;
        })
    }

    fn spawn_receiver(
        &self,
        filename: String,
        pool: Arc<ConnectionPool>,
        workers: Arc<Semaphore>,
        guard: ActiveGuard,
    ) -> JoinHandle<()> {
        let session = ReceiverSession::new(
            filename,
            pool,
            self.inner.codec.clone(),
            self.inner.max_capacity,
            self.inner.outbound.clone(),
        );

        debug!(session_id = %session.id(), filename = %session.filename(), "Spawning receiver session");

        let runtime = self.inner.runtime.clone();
        self.inner.runtime.spawn(async move {
            let _guard = guard;

            let Ok(permit) = workers.acquire_owned().await else {
                session.abandon(&Error::config("relay is shut down"));
                return;
            };

            let worker = runtime.spawn_blocking(move || {
                let _permit = permit;
                // Failures are already reported to the host by the session.
                let _ = session.run();
            });

            if let Err(e) = worker.await {
                warn!(error = %e, "Receiver worker panicked");
            }
        })
    }
}

// ============================================================================
// RelaySettings
// ============================================================================

/// Validated settings handed from the builder to [`Relay::new`].
pub(crate) struct RelaySettings {
    pub pre_warm: usize,
    pub max_capacity: usize,
    pub max_workers: usize,
    pub outbound: Outbound,
    pub runtime: Handle,
}

// ============================================================================
// ActiveGuard
// ============================================================================

/// Counts a session as active until dropped.
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(counter))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

// ============================================================================
// Tests
// ============================================================================
