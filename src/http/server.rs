//! Web server serving the route table
//!
//! One hyper HTTP/1 connection task per accepted socket. Readiness is read
//! from the host's lifecycle watch on every request.

use anyhow::Result;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::{message_response, RouteRequest, RouteTable};
use crate::module::traits::LifecycleState;

/// HTTP server for module routers
pub struct WebServer {
    addr: SocketAddr,
    routes: Arc<RouteTable>,
    state: watch::Receiver<LifecycleState>,
}

impl WebServer {
    pub fn new(
        addr: SocketAddr,
        routes: RouteTable,
        state: watch::Receiver<LifecycleState>,
    ) -> Self {
        Self {
            addr,
            routes: Arc::new(routes),
            state,
        }
    }

    /// Listen on all interfaces at `port`
    pub fn on_port(
        port: u16,
        routes: RouteTable,
        state: watch::Receiver<LifecycleState>,
    ) -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], port)), routes, state)
    }

    /// Bind and serve until shutdown is signalled
    pub async fn start(self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(
            "Web server listening on {} ({} routers mounted)",
            self.addr,
            self.routes.len()
        );
        self.serve(listener, shutdown).await
    }

    /// Serve connections from an already bound listener
    pub async fn serve(self, listener: TcpListener, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!("New HTTP connection from {}", peer);
                            let routes = Arc::clone(&self.routes);
                            let state = self.state.clone();
                            tokio::spawn(async move {
                                let service = service_fn(move |request| {
                                    let routes = Arc::clone(&routes);
                                    let ready = state.borrow().is_ready();
                                    async move {
                                        Ok::<_, Infallible>(handle_request(&routes, ready, request).await)
                                    }
                                });
                                if let Err(e) = http1::Builder::new()
                                    .serve_connection(TokioIo::new(stream), service)
                                    .await
                                {
                                    debug!("HTTP connection from {} ended with error: {}", peer, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept HTTP connection: {}", e);
                        }
                    }
                }
                _ = wait_for_shutdown(&mut shutdown) => {
                    info!("Web server stopping");
                    return Ok(());
                }
            }
        }
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        // Sender dropped without ever signalling; serve forever
        std::future::pending::<()>().await;
    }
}

async fn handle_request(
    routes: &RouteTable,
    ready: bool,
    request: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let (parts, body) = request.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("Failed to read request body: {}", e);
            return message_response(StatusCode::BAD_REQUEST, "Bad request").map(Full::new);
        }
    };

    let request = RouteRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body,
    };
    routes.route(ready, request).await.map(Full::new)
}
