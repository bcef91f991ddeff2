//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! When the shutdown future passed to [`Server::serve`] resolves, the server:
//! 1. Stops `listener.accept()`, so no new connections are made.
//! 2. Asks every open connection to finish its current request and close.
//! 3. Waits up to the shutdown timeout. Past that, in-flight request
//!    contexts are canceled and the connection tasks aborted.
//!
//! Keep the shutdown timeout below `terminationGracePeriodSeconds`.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::web::request::BodyError;
use crate::web::{App, Request, Response};

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("invalid socket address `{0}`")]
    Addr(String),
    #[error("binding {addr}: {source}")]
    Bind { addr: SocketAddr, #[source] source: std::io::Error },
}

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
    shutdown_timeout: Duration,
    body_limit: usize,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust
    /// use sales::web::Server;
    /// let server = Server::bind("0.0.0.0:3000").unwrap();
    /// assert!(Server::bind("not an address").is_err());
    /// ```
    pub fn bind(addr: &str) -> Result<Self, ServeError> {
        let addr = addr.parse().map_err(|_| ServeError::Addr(addr.to_owned()))?;
        Ok(Self { addr, shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT, body_limit: DEFAULT_BODY_LIMIT })
    }

    /// How long in-flight requests get to finish once shutdown starts.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// The largest request body accepted, in bytes. Larger bodies are
    /// answered with `413` before any handler runs. Defaults to 2 MiB.
    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Accepts connections and dispatches them through `app` until
    /// `shutdown` resolves, then drains.
    pub async fn serve(self, app: App, shutdown: impl Future<Output = ()>) -> Result<(), ServeError> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|source| ServeError::Bind { addr: self.addr, source })?;

        let app = Arc::new(app);
        let builder = ConnBuilder::new(TokioExecutor::new());
        let graceful = GracefulShutdown::new();
        let mut tasks = JoinSet::new();

        info!(addr = %self.addr, "listening");

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting new
                // connections even if more are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown started, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let app = Arc::clone(&app);
                    let body_limit = self.body_limit;
                    let svc = service_fn(move |req| {
                        let app = Arc::clone(&app);
                        async move { dispatch(&app, req, remote_addr, body_limit).await }
                    });

                    let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), svc);
                    let conn = graceful.watch(conn.into_owned());

                    tasks.spawn(async move {
                        if let Err(e) = conn.await {
                            debug!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        drop(listener);

        match tokio::time::timeout(self.shutdown_timeout, graceful.shutdown()).await {
            Ok(()) => info!("all connections drained"),
            Err(_) => {
                warn!(in_flight = tasks.len(), timeout = ?self.shutdown_timeout, "drain timed out, canceling in-flight requests");
                app.cancel_in_flight();
                tasks.abort_all();
            }
        }
        while tasks.join_next().await.is_some() {}

        info!(addr = %self.addr, "stopped");
        Ok(())
    }
}

/// Routes one hyper request. Every failure becomes a response, so hyper
/// never sees an error.
async fn dispatch(
    app: &App,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
    body_limit: usize,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let req = match Request::from_hyper(req, remote_addr, body_limit).await {
        Ok(req) => req,
        Err(e) => {
            debug!(peer = %remote_addr, "{e}");
            let status = match e {
                BodyError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                BodyError::Read(_) => StatusCode::BAD_REQUEST,
            };
            return Ok(Response::status(status).into_inner());
        }
    };

    let response = match app.dispatch(req).await {
        Some(response) => response,
        None => Response::status(StatusCode::NOT_FOUND),
    };

    Ok(response.into_inner())
}
