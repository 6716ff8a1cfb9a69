//! HTTP server and graceful shutdown.
//!
//! [`Server::listen`] binds, spawns the accept loop and hands back a
//! [`ServerHandle`] right away, so the caller can run setup code against a
//! live socket. [`Server::listen_shared`] serves a [`SharedRouter`]: every
//! request loads the router currently stored in it. [`Server::serve`] is the blocking form for `main`: listen,
//! wait for SIGTERM or Ctrl-C, then drain.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//! On shutdown the server stops accepting, lets in-flight connections finish
//! (up to the configured drain timeout), and returns.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// A router a running server reads on every request. Storing a new router
/// takes effect for the next request.
pub type SharedRouter = Arc<ArcSwap<Router>>;

/// The HTTP server.
#[derive(Clone, Debug)]
pub struct Server {
    addr: SocketAddr,
    drain_timeout: Option<Duration>,
}

impl Server {
    /// Configures the server to bind to `addr` (`host:port`).
    ///
    /// ```rust
    /// use tsu_services::Server;
    /// let server = Server::bind("0.0.0.0:3000").unwrap();
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let addr = addr.parse().map_err(|_| Error::InvalidAddress(addr.to_owned()))?;
        Ok(Self { addr, drain_timeout: None })
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self { addr: config.addr, drain_timeout: config.drain_timeout() }
    }

    /// Binds and starts accepting connections in the background.
    ///
    /// `router` is moved into the server; registrations made on other
    /// copies afterwards are not served. Use [`listen_shared`](Self::listen_shared)
    /// to keep registering.
    pub async fn listen(self, router: Router) -> Result<ServerHandle, Error> {
        self.listen_shared(Arc::new(ArcSwap::from_pointee(router))).await
    }

    /// [`listen`](Self::listen) on a router the caller can still replace.
    pub async fn listen_shared(self, router: SharedRouter) -> Result<ServerHandle, Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        let (shutdown, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(accept_loop(
            listener,
            router,
            shutdown_rx,
            self.drain_timeout,
        ));

        info!(addr = %local_addr, "tsu listening");
        Ok(ServerHandle { local_addr, shutdown, task })
    }

    /// Serves `router` until SIGTERM or Ctrl-C, then drains and returns.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        let handle = self.listen(router).await?;
        shutdown_signal().await;
        handle.close().await;
        Ok(())
    }
}

/// A running server.
///
/// Dropping the handle leaves the server running for the rest of the
/// process; [`close`](Self::close) stops it.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// The bound address, with the real port when bound to port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting and waits for in-flight connections to finish.
    pub async fn close(self) {
        // The loop may already be gone; there is nothing left to stop then.
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            error!("server task failed: {e}");
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    router: SharedRouter,
    mut shutdown: oneshot::Receiver<()>,
    drain_timeout: Option<Duration>,
) {
    // JoinSet tracks every spawned connection task so shutdown can wait for
    // them all.
    let mut tasks = JoinSet::new();
    let mut detached = false;

    loop {
        tokio::select! {
            // Check shutdown first so a stop request wins over queued
            // connections.
            biased;

            res = &mut shutdown, if !detached => {
                if res.is_ok() {
                    info!(in_flight = tasks.len(), "shutdown requested, draining connections");
                    break;
                }
                // Handle dropped without close: keep serving.
                detached = true;
            }

            res = listener.accept() => {
                let (stream, remote_addr) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let router = Arc::clone(&router);
                let io = TokioIo::new(stream);

                tasks.spawn(async move {
                    // Called once per request on the connection.
                    let svc = service_fn(move |req| {
                        let router = Arc::clone(&router);
                        async move { dispatch(router, req).await }
                    });

                    // HTTP/1.1 or HTTP/2, whatever the client negotiates.
                    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                        .serve_connection(io, svc)
                        .await
                    {
                        error!(peer = %remote_addr, "connection error: {e}");
                    }
                });
            }

            // Reap finished connection tasks so the JoinSet does not grow
            // without bound.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    let drain = async { while tasks.join_next().await.is_some() {} };
    match drain_timeout {
        Some(limit) => {
            if tokio::time::timeout(limit, drain).await.is_err() {
                warn!(?limit, "drain timeout elapsed, aborting remaining connections");
            }
        }
        None => drain.await,
    }

    info!("tsu stopped");
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Reads the body, runs the router, and renders any error that escaped it.
async fn dispatch(
    router: SharedRouter,
    req: hyper::Request<Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("failed to read request body: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_inner());
        }
    };

    let outcome = router.load().handle(Request::from_parts(parts, body));
    let response = match outcome.await {
        Ok(response) => response,
        Err(err) => err.to_response(),
    };
    Ok(response.into_inner())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on SIGTERM or SIGINT (Ctrl-C). On Windows only Ctrl-C.
///
/// A signal that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_addresses() {
        assert!(matches!(Server::bind("nope"), Err(Error::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn listens_on_an_ephemeral_port_and_closes() {
        let handle = Server::bind("127.0.0.1:0").unwrap().listen(Router::new()).await.unwrap();
        let addr = handle.local_addr();
        assert_ne!(addr.port(), 0);
        handle.close().await;
    }

    #[tokio::test]
    async fn serves_whatever_router_is_stored() {
        use http::Method;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let shared: SharedRouter = Arc::new(ArcSwap::from_pointee(Router::new()));
        let handle = Server::bind("127.0.0.1:0")
            .unwrap()
            .listen_shared(Arc::clone(&shared))
            .await
            .unwrap();

        let get = |addr: SocketAddr| async move {
            let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
            stream
                .write_all(b"GET /ping HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
            let mut raw = String::new();
            stream.read_to_string(&mut raw).await.unwrap();
            raw
        };

        assert!(get(handle.local_addr()).await.starts_with("HTTP/1.1 404"));
        shared.store(Arc::new(Router::new().on(Method::GET, "/ping", |_req: Request| async { "pong" })));
        let raw = get(handle.local_addr()).await;
        assert!(raw.starts_with("HTTP/1.1 200"));
        assert!(raw.ends_with("pong"));

        handle.close().await;
    }
}
