//! HTTP server bootstrap.
//!
//! Serves the router over HTTP/1 with bounded read, write and idle times,
//! and drains open connections on shutdown.

use crate::config::ServerConfig;
use axum::Router;
use hyper::Request;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Notify, watch};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tower::Service;
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Pause after a failed accept before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Adds request tracing and the read/write timeouts to a router.
///
/// A response not produced within the write timeout is replaced by
/// `408 Request Timeout`.
pub fn apply_layers(router: Router, config: &ServerConfig) -> Router {
    router
        .layer(RequestBodyTimeoutLayer::new(config.read_timeout()))
        .layer(TimeoutLayer::new(config.write_timeout()))
        .layer(TraceLayer::new_for_http())
}

/// Serves `app` on `listener` until `signal` resolves, then shuts down gracefully.
///
/// After the signal no new connections are accepted and open ones close once
/// their in-flight request is answered.
///
/// # Errors
/// Returns [`io::ErrorKind::TimedOut`] if connections are still open when the
/// shutdown grace period ends; they are aborted.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    config: &ServerConfig,
    signal: F,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send,
{
    let limits = ConnectionLimits::from(config);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut connections = JoinSet::new();
    tokio::pin!(signal);

    loop {
        tokio::select! {
            () = &mut signal => break,
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        warn!(error = %err, "failed to accept connection");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                };
                connections.spawn(serve_connection(
                    stream,
                    peer,
                    app.clone(),
                    limits,
                    shutdown_rx.clone(),
                ));
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    drop(listener);
    // Receivers only look for a change; a send error means none are left.
    let _ = shutdown_tx.send(true);

    info!(open_connections = connections.len(), "draining connections");
    let drain = async { while connections.join_next().await.is_some() {} };
    if tokio::time::timeout(config.shutdown_grace(), drain).await.is_err() {
        warn!(
            open_connections = connections.len(),
            "shutdown grace period elapsed, aborting connections"
        );
        connections.abort_all();
        return Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "graceful shutdown timed out",
        ));
    }

    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        () = ctrl_c => "SIGINT",
        () = terminate => "SIGTERM",
    };

    info!(signal, "shutting down the server");
}

#[derive(Debug, Clone, Copy)]
struct ConnectionLimits {
    read_timeout: Duration,
    idle_timeout: Duration,
}

impl From<&ServerConfig> for ConnectionLimits {
    fn from(config: &ServerConfig) -> Self {
        Self {
            read_timeout: config.read_timeout(),
            idle_timeout: config.idle_timeout(),
        }
    }
}

// ============================================================================
// Connection Activity
// ============================================================================

/// What the connection is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No request in progress since `since`.
    Idle { since: Instant },
    /// First bytes of a request arrived at `since`; headers are not complete.
    Reading { since: Instant },
    /// At least one request is being answered.
    Busy { in_flight: usize },
}

/// Request lifecycle of one connection, shared between the socket, the
/// service and the connection task.
#[derive(Debug)]
struct ConnectionActivity {
    phase: Mutex<Phase>,
    changed: Notify,
}

impl ConnectionActivity {
    fn new() -> Self {
        Self {
            phase: Mutex::new(Phase::Idle {
                since: Instant::now(),
            }),
            changed: Notify::new(),
        }
    }

    fn update(&self, step: impl FnOnce(Phase) -> Phase) {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        let next = step(*phase);
        if next != *phase {
            *phase = next;
            self.changed.notify_one();
        }
    }

    fn phase(&self) -> Phase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bytes arrived on the socket.
    fn bytes_received(&self) {
        self.update(|phase| match phase {
            Phase::Idle { .. } => Phase::Reading {
                since: Instant::now(),
            },
            other => other,
        });
    }

    /// Request headers are complete and the request is handed to the router.
    fn request_started(&self) {
        self.update(|phase| match phase {
            Phase::Busy { in_flight } => Phase::Busy {
                in_flight: in_flight + 1,
            },
            _ => Phase::Busy { in_flight: 1 },
        });
    }

    fn request_finished(&self) {
        self.update(|phase| match phase {
            Phase::Busy { in_flight } if in_flight > 1 => Phase::Busy {
                in_flight: in_flight - 1,
            },
            _ => Phase::Idle {
                since: Instant::now(),
            },
        });
    }

    /// Next deadline for the connection, if any.
    fn deadline(&self, limits: ConnectionLimits) -> Option<(Instant, Expiry)> {
        match self.phase() {
            Phase::Idle { since } => Some((since + limits.idle_timeout, Expiry::Idle)),
            Phase::Reading { since } => Some((since + limits.read_timeout, Expiry::Read)),
            Phase::Busy { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expiry {
    Idle,
    Read,
}

/// Marks the request finished when dropped, including on cancellation.
struct InFlight(Arc<ConnectionActivity>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.request_finished();
    }
}

/// Socket that reports incoming bytes to its connection's activity.
struct TrackedStream {
    inner: TcpStream,
    activity: Arc<ConnectionActivity>,
}

impl AsyncRead for TrackedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
        if matches!(poll, Poll::Ready(Ok(()))) && buf.filled().len() > before {
            self.activity.bytes_received();
        }
        poll
    }
}

impl AsyncWrite for TrackedStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

// ============================================================================
// Connection Task
// ============================================================================

/// Serves one connection.
///
/// A request must deliver its headers within the read timeout counted from
/// its first byte; a stalled request is dropped. A connection with no request
/// in progress for the idle timeout is closed gracefully.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    app: Router,
    limits: ConnectionLimits,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!(%peer, "accepted connection");

    let activity = Arc::new(ConnectionActivity::new());
    let stream = TrackedStream {
        inner: stream,
        activity: Arc::clone(&activity),
    };
    let service = service_fn({
        let activity = Arc::clone(&activity);
        move |request: Request<Incoming>| {
            activity.request_started();
            let in_flight = InFlight(Arc::clone(&activity));
            let response = app.clone().call(request);
            async move {
                let response = response.await;
                drop(in_flight);
                response
            }
        }
    });

    // Header reads are timed by `ConnectionActivity`, which leaves idle
    // keep-alive time to the idle timeout.
    let conn = http1::Builder::new()
        .header_read_timeout(None)
        .serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let mut closing = false;
    loop {
        let deadline = activity
            .deadline(limits)
            .filter(|(_, expiry)| !(closing && *expiry == Expiry::Idle));
        let wake_at = deadline.map(|(at, _)| at);

        tokio::select! {
            result = conn.as_mut() => {
                if let Err(err) = result {
                    debug!(%peer, error = %err, "connection ended with error");
                }
                break;
            }
            () = activity.changed.notified() => {}
            () = sleep_until_deadline(wake_at), if wake_at.is_some() => {
                // The phase may have moved on while sleeping.
                if activity.deadline(limits) != deadline {
                    continue;
                }
                match deadline.map(|(_, expiry)| expiry) {
                    Some(Expiry::Read) => {
                        debug!(%peer, "request headers not received in time, dropping connection");
                        break;
                    }
                    _ => {
                        debug!(%peer, "closing idle connection");
                        closing = true;
                        conn.as_mut().graceful_shutdown();
                    }
                }
            }
            _ = shutdown.changed(), if !closing => {
                closing = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    }

    debug!(%peer, "connection closed");
}

async fn sleep_until_deadline(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
