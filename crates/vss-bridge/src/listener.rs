//! Single-client TCP listener for the telemetry feed.
//!
//! The listener owns the bind/listen endpoint and a dedicated read loop
//! task. At most one client is served at a time; on peer close or a
//! transport error the client is detached and the loop returns to
//! accepting. Framed messages are handed to the sink synchronously from
//! the loop, so a slow sink throttles the socket read rate - that is the
//! intended backpressure.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use vss_protocol::{FrameError, LineFramer};

/// Default telemetry feed port.
pub const DEFAULT_PORT: u16 = 33452;

/// Per-accept and per-read timeout.
pub const SOCKET_TIMEOUT: Duration = Duration::from_secs(5);

/// Backoff after a timed-out accept, to avoid busy-spinning.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Read chunk size.
const READ_BUF_SIZE: usize = 1024;

/// Configuration for the telemetry listener.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Address to bind to. Port 0 picks an ephemeral port.
    pub bind_addr: SocketAddr,
    /// Bounded wait applied to accept and read calls.
    pub socket_timeout: Duration,
    /// Maximum bytes a single frame may span without a newline.
    pub max_frame_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            socket_timeout: SOCKET_TIMEOUT,
            max_frame_bytes: 4096,
        }
    }
}

/// Errors that can occur when binding the listener.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("failed to bind telemetry listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Receiver for framed telemetry messages.
///
/// Implemented by the ingestion pipeline; the listener holds a shared
/// handle and calls it synchronously from the read loop.
pub trait MessageSink: Send + Sync {
    fn on_message(&self, message: &str);

    /// A frame was dropped before it became a message (oversize tail,
    /// invalid UTF-8).
    fn on_frame_error(&self, error: &FrameError);
}

/// TCP listener that accepts one telemetry client at a time.
pub struct SignalListener {
    config: ListenerConfig,
    sink: Arc<dyn MessageSink>,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl SignalListener {
    /// Create a stopped listener.
    pub fn new(config: ListenerConfig, sink: Arc<dyn MessageSink>) -> Self {
        Self {
            config,
            sink,
            shutdown_tx: None,
            task: None,
            local_addr: None,
        }
    }

    /// Bind the endpoint and launch the read loop.
    ///
    /// Idempotent: calling start on a running listener is a no-op.
    pub async fn start(&mut self) -> Result<(), BindError> {
        if self.task.is_some() {
            warn!("telemetry listener already running");
            return Ok(());
        }

        let listener =
            TcpListener::bind(self.config.bind_addr)
                .await
                .map_err(|source| BindError::Bind {
                    addr: self.config.bind_addr,
                    source,
                })?;
        let local_addr = listener.local_addr().map_err(|source| BindError::Bind {
            addr: self.config.bind_addr,
            source,
        })?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let config = self.config.clone();
        let sink = self.sink.clone();
        let task = tokio::spawn(read_loop(listener, config, sink, shutdown_rx));

        self.shutdown_tx = Some(shutdown_tx);
        self.task = Some(task);
        self.local_addr = Some(local_addr);

        info!("telemetry listener started on {}", local_addr);
        Ok(())
    }

    /// Signal the read loop to stop and wait for it to exit.
    ///
    /// Idempotent; safe to call while the loop is blocked in a timed wait.
    pub async fn stop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(true);
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("telemetry read loop task failed: {}", e);
            }
        }
        self.local_addr = None;
    }

    /// Whether the read loop is running.
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// The bound address while running (useful with port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

/// The accept/read loop. Runs until the shutdown flag is set.
async fn read_loop(
    listener: TcpListener,
    config: ListenerConfig,
    sink: Arc<dyn MessageSink>,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("telemetry read loop started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let (stream, peer) = tokio::select! {
            _ = shutdown.changed() => break,
            accepted = timeout(config.socket_timeout, listener.accept()) => {
                match accepted {
                    Ok(Ok(pair)) => pair,
                    Ok(Err(e)) => {
                        error!("failed to accept telemetry connection: {}", e);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                    Err(_) => {
                        // Timed-out accept is not an error; back off and retry
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                }
            }
        };

        info!("accepted telemetry client from {}", peer);
        serve_client(stream, &config, sink.as_ref(), &mut shutdown).await;
        if !*shutdown.borrow() {
            info!("telemetry client detached, waiting for new connection");
        }
    }

    info!("telemetry read loop ended");
}

/// Read from one client until it closes, errors, or shutdown is signaled.
///
/// A partial message left in the framer when the connection goes away is
/// discarded with it.
async fn serve_client(
    mut stream: TcpStream,
    config: &ListenerConfig,
    sink: &dyn MessageSink,
    shutdown: &mut watch::Receiver<bool>,
) {
    let mut framer = LineFramer::new(config.max_frame_bytes);
    let mut buf = vec![0u8; READ_BUF_SIZE];

    loop {
        if *shutdown.borrow() {
            break;
        }

        let n = tokio::select! {
            _ = shutdown.changed() => break,
            read = timeout(config.socket_timeout, stream.read(&mut buf)) => {
                match read {
                    Ok(Ok(0)) => {
                        info!("telemetry client disconnected");
                        break;
                    }
                    Ok(Ok(n)) => n,
                    Ok(Err(e)) => {
                        warn!("telemetry read error: {}", e);
                        break;
                    }
                    // Read timeout, keep waiting
                    Err(_) => continue,
                }
            }
        };

        if let Err(e) = framer.extend(&buf[..n]) {
            sink.on_frame_error(&e);
        }

        loop {
            match framer.next_message() {
                Ok(Some(message)) => {
                    debug!("received telemetry message: {}", message);
                    sink.on_message(&message);
                }
                Ok(None) => break,
                Err(e) => sink.on_frame_error(&e),
            }
        }
    }
}
