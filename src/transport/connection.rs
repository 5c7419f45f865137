//! WebSocket client connection and its lifecycle.
//!
//! A [`Connection`] is one endpoint to the backend. It is generic over the
//! socket so the same identity and state machine serve both session shapes:
//!
//! - [`BlockingConnection`] wraps a blocking `tungstenite` socket. Used by
//!   receiver workers and held in the [`ConnectionPool`](super::ConnectionPool).
//! - [`AsyncConnection`] wraps a `tokio-tungstenite` stream. Used by sender
//!   sessions, never pooled.
//!
//! # State Machine
//!
//! ```text
//! Disconnected ─► Connecting ─┬─► Open ─┬─► Busy ◄──► Idle
//!                             │         │     │         │
//!                             └─► Failed ◄────┴─────────┘
//!                                       Closed ◄── (any live state)
//! ```
//!
//! `Failed` and `Closed` are terminal. A connection is not `Clone`: moving
//! it between pool and session is the only way to change its owner.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream as AsyncTcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{self, Error as WsError, HandshakeError, Message, WebSocket};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::Payload;

use super::Endpoint;
use super::endpoint::duration_ms;

// ============================================================================
// Types
// ============================================================================

/// Blocking WebSocket socket.
pub type BlockingSocket = WebSocket<TcpStream>;

/// Async WebSocket stream.
pub type AsyncSocket = WebSocketStream<MaybeTlsStream<AsyncTcpStream>>;

/// Connection driven by blocking calls on a worker thread.
pub type BlockingConnection = Connection<BlockingSocket>;

/// Connection driven by `.await` on the async runtime.
pub type AsyncConnection = Connection<AsyncSocket>;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Created, no socket yet.
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Handshake done, not yet claimed.
    Open,
    /// Owned by exactly one session.
    Busy,
    /// Owned by the pool.
    Idle,
    /// An I/O step failed. Terminal, never pooled.
    Failed,
    /// Closed by its owner or the backend. Terminal.
    Closed,
}

impl ConnectionState {
    /// Returns `true` if moving from `self` to `next` is legal.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        use ConnectionState::{Busy, Closed, Connecting, Disconnected, Failed, Idle, Open};

        matches!(
            (self, next),
            (Disconnected, Connecting | Closed)
                | (Connecting, Open | Failed)
                | (Open, Busy | Idle | Failed | Closed)
                | (Busy, Open | Idle | Failed | Closed)
                | (Idle, Busy | Failed | Closed)
        )
    }

    /// Returns `true` for `Failed` and `Closed`.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Closed)
    }

    /// Returns `true` if the socket is established and usable.
    #[inline]
    #[must_use]
    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Open | Self::Busy | Self::Idle)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Busy => "busy",
            Self::Idle => "idle",
            Self::Failed => "failed",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Connection
// ============================================================================

/// One WebSocket connection to the backend.
///
/// Created in [`ConnectionState::Disconnected`]; call `connect` to open it.
pub struct Connection<S> {
    /// Stable identity across pool round-trips.
    id: ConnectionId,
    /// Backend this connection targets.
    endpoint: Endpoint,
    /// Current lifecycle state.
    state: ConnectionState,
    /// Socket, present from `Open` until a terminal state.
    socket: Option<S>,
}

impl<S> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("url", &self.endpoint.url().as_str())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<S> Connection<S> {
    /// Creates an unconnected connection for `endpoint`.
    #[must_use]
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            id: ConnectionId::next(),
            endpoint,
            state: ConnectionState::Disconnected,
            socket: None,
        }
    }

    /// Returns the connection ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns the endpoint this connection targets.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns `true` if the connection may be used or pooled.
    #[inline]
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.state.is_healthy() && self.socket.is_some()
    }

    /// Claims the connection for one session.
    pub(crate) fn mark_busy(&mut self) -> Result<()> {
        self.transition(ConnectionState::Busy)
    }

    /// Hands the connection to the pool.
    pub(crate) fn mark_idle(&mut self) -> Result<()> {
        self.transition(ConnectionState::Idle)
    }

    /// Moves to `next` if the state machine allows it.
    fn transition(&mut self, next: ConnectionState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            warn!(connection_id = %self.id, from = %self.state, to = %next, "Illegal state transition");
            return Err(Error::invalid_state(self.id, self.state, next));
        }

        trace!(connection_id = %self.id, from = %self.state, to = %next, "State transition");
        self.state = next;
        Ok(())
    }

    /// Records a failed I/O step and drops the socket.
    fn fail(&mut self, error: &Error) {
        let next = if matches!(error, Error::ConnectionClosed) {
            ConnectionState::Closed
        } else {
            ConnectionState::Failed
        };

        debug!(connection_id = %self.id, from = %self.state, to = %next, error = %error, "Connection unusable");
        self.state = next;
        self.socket = None;
    }

    /// Returns the socket if the connection is `Open` or `Busy`.
    fn usable_socket(&mut self) -> Result<&mut S> {
        if !matches!(self.state, ConnectionState::Open | ConnectionState::Busy) {
            return Err(Error::invalid_state(self.id, self.state, ConnectionState::Busy));
        }
        self.socket.as_mut().ok_or(Error::ConnectionClosed)
    }

    /// Marks a terminal `Closed` state after the socket was handed off.
    fn finish_close(&mut self) {
        self.state = ConnectionState::Closed;
        debug!(connection_id = %self.id, "Connection closed");
    }
}

// ============================================================================
// Connection - Blocking
// ============================================================================

impl Connection<BlockingSocket> {
    /// Connects and completes the WebSocket handshake, blocking the caller.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if the TCP connect exceeds the endpoint limit
    /// - [`Error::Connection`] if the connect or handshake fails
    /// - [`Error::InvalidState`] if the connection was already used
    pub fn connect(&mut self) -> Result<()> {
        self.transition(ConnectionState::Connecting)?;

        match open_blocking(&self.endpoint) {
            Ok(socket) => {
                self.socket = Some(socket);
                self.transition(ConnectionState::Open)?;
                debug!(connection_id = %self.id, url = %self.endpoint.url(), "Connection open");
                Ok(())
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Sends `payload` as one binary message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WebSocket`] on write failure; the connection is then `Failed`.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        let id = self.id;
        let reply_timeout = self.endpoint.reply_timeout();
        let socket = self.usable_socket()?;
        let result = socket.send(Message::binary(payload.to_vec()));

        match result {
            Ok(()) => {
                trace!(connection_id = %id, len = payload.len(), "Message sent");
                Ok(())
            }
            Err(e) => {
                let error = map_ws_error(e, id, reply_timeout);
                self.fail(&error);
                Err(error)
            }
        }
    }

    /// Blocks until the next text or binary message arrives.
    ///
    /// Ping and pong frames are skipped.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the backend closed the connection
    /// - [`Error::ReplyTimeout`] if the endpoint reply timeout elapsed
    /// - [`Error::WebSocket`] on any other read failure
    pub fn receive_one(&mut self) -> Result<Payload> {
        let id = self.id;
        let reply_timeout = self.endpoint.reply_timeout();
        let socket = self.usable_socket()?;

        let result = loop {
            match socket.read() {
                Ok(message) => match into_payload(message) {
                    Ok(Some(payload)) => break Ok(payload),
                    Ok(None) => continue,
                    Err(e) => break Err(e),
                },
                Err(e) => break Err(map_ws_error(e, id, reply_timeout)),
            }
        };

        match result {
            Ok(payload) => {
                trace!(connection_id = %id, len = payload.len(), "Message received");
                Ok(payload)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Sends a close frame and drops the socket. Errors are logged, not returned.
    pub fn close(&mut self) {
        if self.state.is_terminal() {
            return;
        }

        if let Some(mut socket) = self.socket.take() {
            if let Err(e) = socket.close(None) {
                trace!(connection_id = %self.id, error = %e, "Close frame not sent");
            }
            if let Err(e) = socket.flush() {
                trace!(connection_id = %self.id, error = %e, "Close flush failed");
            }
        }

        self.finish_close();
    }
}

// ============================================================================
// Connection - Async
// ============================================================================

impl Connection<AsyncSocket> {
    /// Connects and completes the WebSocket handshake without blocking.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if the handshake exceeds the endpoint limit
    /// - [`Error::Connection`] if the connect or handshake fails
    /// - [`Error::InvalidState`] if the connection was already used
    pub async fn connect(&mut self) -> Result<()> {
        self.transition(ConnectionState::Connecting)?;

        match open_async(&self.endpoint).await {
            Ok(socket) => {
                self.socket = Some(socket);
                self.transition(ConnectionState::Open)?;
                debug!(connection_id = %self.id, url = %self.endpoint.url(), "Connection open");
                Ok(())
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Sends `payload` as one binary message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WebSocket`] on write failure; the connection is then `Failed`.
    pub async fn send(&mut self, payload: &[u8]) -> Result<()> {
        let id = self.id;
        let reply_timeout = self.endpoint.reply_timeout();
        let socket = self.usable_socket()?;
        let result = socket.send(Message::binary(payload.to_vec())).await;

        match result {
            Ok(()) => {
                trace!(connection_id = %id, len = payload.len(), "Message sent");
                Ok(())
            }
            Err(e) => {
                let error = map_ws_error(e, id, reply_timeout);
                self.fail(&error);
                Err(error)
            }
        }
    }

    /// Waits for the next text or binary message.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the backend closed the connection
    /// - [`Error::ReplyTimeout`] if the endpoint reply timeout elapsed
    /// - [`Error::WebSocket`] on any other read failure
    pub async fn receive_one(&mut self) -> Result<Payload> {
        let id = self.id;
        let reply_timeout = self.endpoint.reply_timeout();
        let socket = self.usable_socket()?;

        let result = match reply_timeout {
            Some(limit) => timeout(limit, next_payload(socket))
                .await
                .unwrap_or_else(|_| Err(Error::reply_timeout(id, duration_ms(limit)))),
            None => next_payload(socket).await,
        };

        match result {
            Ok(payload) => {
                trace!(connection_id = %id, len = payload.len(), "Message received");
                Ok(payload)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Sends a close frame and drops the stream. Errors are logged, not returned.
    pub async fn close(&mut self) {
        if self.state.is_terminal() {
            return;
        }

        if let Some(mut socket) = self.socket.take()
            && let Err(e) = socket.close(None).await
        {
            trace!(connection_id = %self.id, error = %e, "Close frame not sent");
        }

        self.finish_close();
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Opens a blocking socket: TCP connect, then WebSocket handshake.
///
/// The connect timeout bounds each TCP attempt and the handshake. The reply
/// timeout takes over once the socket is open.
fn open_blocking(endpoint: &Endpoint) -> Result<BlockingSocket> {
    let addrs = endpoint.resolve()?;
    let connect_timeout = endpoint.connect_timeout();

    let stream = connect_any(&addrs, connect_timeout)?;
    stream.set_nodelay(true)?;
    stream.set_read_timeout(connect_timeout)?;
    stream.set_write_timeout(connect_timeout)?;

    let (socket, _response) =
        tungstenite::client(endpoint.url().as_str(), stream).map_err(|e| match e {
            HandshakeError::Interrupted(_) => {
                Error::connection_timeout(connect_timeout.map_or(0, duration_ms))
            }
            HandshakeError::Failure(WsError::Io(ref io))
                if matches!(io.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                Error::connection_timeout(connect_timeout.map_or(0, duration_ms))
            }
            HandshakeError::Failure(e) => {
                Error::connection(format!("WebSocket handshake failed: {e}"))
            }
        })?;

    socket.get_ref().set_read_timeout(endpoint.reply_timeout())?;
    socket.get_ref().set_write_timeout(None)?;

    Ok(socket)
}

/// Tries each address in order and returns the first stream that connects.
///
/// Fails with the error of the last address tried.
fn connect_any(addrs: &[SocketAddr], limit: Option<Duration>) -> Result<TcpStream> {
    let mut last_error = Error::connection("No address to connect to");

    for addr in addrs {
        let attempt = match limit {
            Some(limit) => TcpStream::connect_timeout(addr, limit),
            None => TcpStream::connect(addr),
        };

        match attempt {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                trace!(%addr, error = %e, "Connect attempt failed");
                last_error = match (e.kind(), limit) {
                    (ErrorKind::TimedOut | ErrorKind::WouldBlock, Some(limit)) => {
                        Error::connection_timeout(duration_ms(limit))
                    }
                    _ => Error::connection(format!("Connect to {addr} failed: {e}")),
                };
            }
        }
    }

    Err(last_error)
}

/// Opens an async socket via `connect_async`.
async fn open_async(endpoint: &Endpoint) -> Result<AsyncSocket> {
    let handshake = tokio_tungstenite::connect_async(endpoint.url().as_str());

    let outcome = match endpoint.connect_timeout() {
        Some(limit) => timeout(limit, handshake)
            .await
            .map_err(|_| Error::connection_timeout(duration_ms(limit)))?,
        None => handshake.await,
    };

    let (socket, _response) = outcome.map_err(|e| {
        Error::connection(format!("WebSocket connect to {} failed: {e}", endpoint.url()))
    })?;

    Ok(socket)
}

/// Reads frames until a data message arrives.
async fn next_payload(socket: &mut AsyncSocket) -> Result<Payload> {
    loop {
        match socket.next().await {
            Some(Ok(message)) => {
                if let Some(payload) = into_payload(message)? {
                    return Ok(payload);
                }
            }
            Some(Err(e)) => return Err(Error::WebSocket(e)),
            None => return Err(Error::ConnectionClosed),
        }
    }
}

/// Classifies a frame: data, control (`None`), or close (`Err`).
fn into_payload(message: Message) -> Result<Option<Payload>> {
    match message {
        Message::Text(text) => Ok(Some(Payload::Text(text.as_str().to_owned()))),
        Message::Binary(data) => Ok(Some(Payload::Binary(data.to_vec()))),
        Message::Close(_) => Err(Error::ConnectionClosed),
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Ok(None),
    }
}

/// Maps a socket error, recognizing read timeouts and orderly closes.
fn map_ws_error(error: WsError, id: ConnectionId, reply_timeout: Option<Duration>) -> Error {
    match error {
        WsError::ConnectionClosed | WsError::AlreadyClosed => Error::ConnectionClosed,
        WsError::Io(ref io)
            if matches!(io.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
        {
            let timeout_ms = reply_timeout.map_or(0, duration_ms);
            Error::reply_timeout(id, timeout_ms)
        }
        other => Error::WebSocket(other),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io;

    fn endpoint() -> Endpoint {
        Endpoint::parse("ws://127.0.0.1:9/unused").unwrap()
    }

    #[test]
    fn test_new_connection_is_disconnected() {
        let conn = BlockingConnection::new(endpoint());
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(!conn.is_healthy());
    }

    #[test]
    fn test_ids_differ() {
        let a = BlockingConnection::new(endpoint());
        let b = BlockingConnection::new(endpoint());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_legal_transitions() {
        use ConnectionState::*;

        assert!(Disconnected.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Open));
        assert!(Connecting.can_transition_to(Failed));
        assert!(Open.can_transition_to(Busy));
        assert!(Busy.can_transition_to(Idle));
        assert!(Idle.can_transition_to(Busy));
        assert!(Busy.can_transition_to(Closed));
    }

    #[test]
    fn test_illegal_transitions() {
        use ConnectionState::*;

        assert!(!Disconnected.can_transition_to(Busy));
        assert!(!Connecting.can_transition_to(Idle));
        assert!(!Failed.can_transition_to(Idle));
        assert!(!Failed.can_transition_to(Busy));
        assert!(!Closed.can_transition_to(Open));
        assert!(!Idle.can_transition_to(Idle));
    }

    #[test]
    fn test_terminal_and_healthy() {
        assert!(ConnectionState::Failed.is_terminal());
        assert!(ConnectionState::Closed.is_terminal());
        assert!(!ConnectionState::Idle.is_terminal());
        assert!(ConnectionState::Idle.is_healthy());
        assert!(!ConnectionState::Connecting.is_healthy());
    }

    #[test]
    fn test_mark_busy_requires_open() {
        let mut conn = BlockingConnection::new(endpoint());
        let err = conn.mark_busy().unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_send_before_connect_is_rejected() {
        let mut conn = BlockingConnection::new(endpoint());
        let err = conn.send(b"early").unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
    }

    #[test]
    fn test_connect_refused_marks_failed() {
        // Bind then drop to get a port nothing listens on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let endpoint = Endpoint::parse(&format!("ws://127.0.0.1:{port}/a")).unwrap();
        let mut conn = BlockingConnection::new(endpoint);

        let err = conn.connect().unwrap_err();
        assert!(err.is_connection_error());
        assert_eq!(conn.state(), ConnectionState::Failed);
        assert!(conn.connect().is_err());
    }

    #[test]
    fn test_close_on_unconnected() {
        let mut conn = BlockingConnection::new(endpoint());
        conn.close();
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_into_payload_classification() {
        assert!(matches!(
            into_payload(Message::text("hi".to_string())),
            Ok(Some(Payload::Text(ref t))) if t == "hi"
        ));
        assert!(matches!(
            into_payload(Message::binary(vec![1u8, 2])),
            Ok(Some(Payload::Binary(ref b))) if b == &[1, 2]
        ));
        assert!(matches!(into_payload(Message::Ping(Vec::new().into())), Ok(None)));
        assert!(matches!(
            into_payload(Message::Close(None)),
            Err(Error::ConnectionClosed)
        ));
    }

    #[test]
    fn test_read_timeout_maps_to_reply_timeout() {
        let id = ConnectionId::from_raw(3);
        let err = map_ws_error(
            WsError::Io(io::Error::new(ErrorKind::WouldBlock, "timed out")),
            id,
            Some(Duration::from_millis(50)),
        );
        assert!(matches!(err, Error::ReplyTimeout { timeout_ms: 50, .. }));
    }

    #[test]
    fn test_stalled_handshake_hits_connect_timeout() {
        // Accepted by the kernel backlog, never upgraded.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let endpoint = Endpoint::parse(&format!("ws://127.0.0.1:{port}/a"))
            .unwrap()
            .with_connect_timeout(Some(Duration::from_millis(200)))
            .with_reply_timeout(None);
        let mut conn = BlockingConnection::new(endpoint);

        let started = std::time::Instant::now();
        let err = conn.connect().unwrap_err();

        assert!(err.is_timeout(), "unexpected error: {err}");
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(conn.state(), ConnectionState::Failed);
        drop(listener);
    }

    #[test]
    fn test_connect_any_falls_through_to_next_address() {
        let refused = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let open = listener.local_addr().unwrap();

        let stream = connect_any(&[refused, open], Some(Duration::from_secs(1))).unwrap();
        assert_eq!(stream.peer_addr().unwrap(), open);
    }

    #[test]
    fn test_connect_any_reports_last_error() {
        let refused = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };

        let err = connect_any(&[refused], None).unwrap_err();
        assert!(err.to_string().contains(&refused.to_string()));
        assert!(connect_any(&[], None).is_err());
    }

    #[tokio::test]
    async fn test_async_connect_refused_marks_failed() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let endpoint = Endpoint::parse(&format!("ws://127.0.0.1:{port}/b")).unwrap();
        let mut conn = AsyncConnection::new(endpoint);

        assert!(conn.connect().await.is_err());
        assert_eq!(conn.state(), ConnectionState::Failed);
    }
}
