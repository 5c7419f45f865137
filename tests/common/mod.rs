//! Shared utilities for integration tests.
//!
//! Provides a local WebSocket backend that runs on its own thread and
//! runtime, so blocking and async clients can both talk to it.

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tracing_subscriber::EnvFilter;
use wsrelay::{Codec, DEFAULT_MAX_CAPACITY, HostMessage};

// ============================================================================
// Logging
// ============================================================================

/// Installs a test subscriber once. Filter with `RUST_LOG`.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Backend
// ============================================================================

/// What the backend does with one inbound message.
pub enum Reply {
    /// Send this message back.
    Send(Message),
    /// Send nothing and keep the connection open.
    Silent,
    /// Drop the connection.
    Close,
}

type Handler = dyn Fn(Vec<u8>) -> Reply + Send + Sync;

/// Local WebSocket backend. Shut down on drop.
pub struct Backend {
    addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Backend {
    /// Starts a backend calling `handler` for every text or binary message.
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(Vec<u8>) -> Reply + Send + Sync + 'static,
    {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind backend");
        listener.set_nonblocking(true).expect("nonblocking listener");
        let addr = listener.local_addr().expect("backend address");

        let connections = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handler: Arc<Handler> = Arc::new(handler);

        let counter = Arc::clone(&connections);
        let thread = thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .expect("backend runtime");

            runtime.block_on(serve(listener, handler, counter, shutdown_rx));
        });

        Self {
            addr,
            connections,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        }
    }

    /// Backend that decompresses each message and replies with the text.
    pub fn decompressing_echo() -> Self {
        let codec = Codec::init().expect("codec");
        Self::start(move |data| match codec.decompress(&data, DEFAULT_MAX_CAPACITY) {
            Ok(plain) => Reply::Send(Message::text(String::from_utf8_lossy(&plain).into_owned())),
            Err(_) => Reply::Close,
        })
    }

    /// Backend that answers a filename with compressed `content of <filename>`.
    pub fn file_server() -> Self {
        let codec = Codec::init().expect("codec");
        Self::start(move |data| {
            let content = format!("content of {}", String::from_utf8_lossy(&data));
            match codec.compress(content.as_bytes()) {
                Ok(packed) => Reply::Send(Message::binary(packed)),
                Err(_) => Reply::Close,
            }
        })
    }

    /// Returns the backend URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    /// Returns the number of TCP connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for Backend {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

async fn serve(
    listener: std::net::TcpListener,
    handler: Arc<Handler>,
    connections: Arc<AtomicUsize>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let listener = TcpListener::from_std(listener).expect("tokio listener");

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => {
                let Ok((stream, _)) = accepted else { continue };
                connections.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(handle_connection(stream, Arc::clone(&handler)));
            }
        }
    }
}

async fn handle_connection(stream: tokio::net::TcpStream, handler: Arc<Handler>) {
    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };

    while let Some(Ok(message)) = ws.next().await {
        let data = match message {
            Message::Binary(data) => data.to_vec(),
            Message::Text(text) => text.as_str().as_bytes().to_vec(),
            Message::Close(_) => break,
            _ => continue,
        };

        match handler(data) {
            Reply::Send(reply) => {
                if ws.send(reply).await.is_err() {
                    break;
                }
            }
            Reply::Silent => {}
            Reply::Close => break,
        }
    }
}

// ============================================================================
// Host Helpers
// ============================================================================

/// Returns a `ws://` URL on a port nothing listens on.
pub fn closed_port_url() -> String {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe");
        listener.local_addr().expect("probe address").port()
    };
    format!("ws://127.0.0.1:{port}/a")
}

/// Waits for the next host message, failing after five seconds.
pub async fn next_line(rx: &mut mpsc::UnboundedReceiver<HostMessage>) -> anyhow::Result<HostMessage> {
    let message = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await?
        .ok_or_else(|| anyhow::anyhow!("outbound channel closed"))?;
    Ok(message)
}

/// Polls `condition` every 10ms for up to five seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> anyhow::Result<()> {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;
    Ok(())
}
