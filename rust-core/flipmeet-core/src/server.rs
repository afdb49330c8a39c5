//! # HTTP Server
//!
//! Hyper/Tokio host for a [`Dispatcher`].
//! Implements graceful shutdown with signal handling.
//!
//! ## Key Features
//!
//! - Async request handling with Tokio runtime
//! - Graceful shutdown on Ctrl-C with a drain timeout
//! - Connection keep-alive support
//! - Body size limit enforced before parsing
//! - Every response carries an `x-request-id`
//!
//! [`Server::handle`] runs the same pipeline without a socket.

use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::reply::{Response, ResponseFormatter};
use crate::request::RequestContext;
use hyper::body::Incoming;
use hyper::header::HeaderValue;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{HeaderMap, Request};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const REQUEST_ID: &str = "x-request-id";

/// Pause after an accept failure that is not tied to a single peer
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Delay before the next accept, `None` when only one peer was affected
///
/// Descriptor exhaustion and similar listener errors would otherwise spin.
fn accept_backoff(err: &std::io::Error) -> Option<Duration> {
    use std::io::ErrorKind as Io;
    match err.kind() {
        Io::ConnectionRefused | Io::ConnectionAborted | Io::ConnectionReset | Io::Interrupted => None,
        _ => Some(ACCEPT_BACKOFF),
    }
}

/// HTTP Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub address: SocketAddr,
    /// Public prefix stripped from every path
    pub base_path: String,
    /// Enable keep-alive connections
    pub keep_alive: bool,
    /// Shutdown timeout for graceful shutdown (default: 30 seconds)
    pub shutdown_timeout: Duration,
    /// Max request body size in bytes
    pub max_body_size: usize,
    /// Answer unmatched routes with a formatted 404 instead of an empty 200
    pub strict_routing: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 8000).into(),
            base_path: "/".to_string(),
            keep_alive: true,
            shutdown_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024,
            strict_routing: false,
        }
    }
}

struct Shared {
    config: ServerConfig,
    dispatcher: Dispatcher,
    formatter: Arc<dyn ResponseFormatter>,
}

/// HTTP front end for a dispatcher
#[derive(Clone)]
pub struct Server {
    shared: Arc<Shared>,
}

impl Server {
    /// Create a server
    pub fn new<F: ResponseFormatter + 'static>(
        config: ServerConfig,
        dispatcher: Dispatcher,
        formatter: F,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                dispatcher,
                formatter: Arc::new(formatter),
            }),
        }
    }

    /// Server configuration
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }

    /// The dispatcher requests go to
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.shared.dispatcher
    }

    /// Start the server with graceful shutdown
    ///
    /// # Errors
    ///
    /// Returns `Error::Bind` if the listener cannot be set up. Failed
    /// accepts are logged and the loop keeps running.
    pub async fn serve(&self) -> Result<()> {
        let addr = self.shared.config.address;
        let bind_err = |source| Error::Bind {
            address: addr.to_string(),
            source,
        };

        let socket = if addr.is_ipv4() {
            tokio::net::TcpSocket::new_v4()
        } else {
            tokio::net::TcpSocket::new_v6()
        }
        .map_err(bind_err)?;
        socket.set_reuseaddr(true).map_err(bind_err)?;
        #[cfg(not(windows))]
        {
            socket.set_reuseport(true).map_err(bind_err)?;
        }
        socket.bind(addr).map_err(bind_err)?;

        let listener = socket.listen(1024).map_err(bind_err)?;

        info!(
            address = %addr,
            base_path = %self.shared.config.base_path,
            routes = self.shared.dispatcher.routes().len(),
            "Server listening"
        );

        let active = Arc::new(AtomicUsize::new(0));
        let keep_alive = self.shared.config.keep_alive;

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, remote_addr) = match accept_result {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!(error = %e, "Failed to accept connection");
                            if let Some(delay) = accept_backoff(&e) {
                                tokio::time::sleep(delay).await;
                            }
                            continue;
                        }
                    };
                    let io = TokioIo::new(stream);

                    let shared = self.shared.clone();
                    let active = active.clone();

                    tokio::task::spawn(async move {
                        active.fetch_add(1, Ordering::Relaxed);

                        if let Err(err) = http1::Builder::new()
                            .keep_alive(keep_alive)
                            .serve_connection(io, service_fn(move |req| {
                                let shared = shared.clone();
                                async move {
                                    let method = req.method().clone();
                                    let path = req.uri().path().to_string();

                                    let response = handle_request(req, &shared).await;
                                    info!(
                                        remote = %remote_addr,
                                        method = %method,
                                        path = %path,
                                        status = response.status,
                                        "Request served"
                                    );
                                    Ok::<_, Infallible>(response.into_hyper())
                                }
                            }))
                            .await
                        {
                            error!(error = ?err, "Error serving connection");
                        }
                        active.fetch_sub(1, Ordering::Relaxed);
                    });
                }
                () = shutdown_signal() => {
                    info!("Shutdown signal received, stopping server...");
                    break;
                }
            }
        }

        let timeout = self.shared.config.shutdown_timeout;
        let drain = async {
            while active.load(Ordering::Relaxed) > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!(
                open = active.load(Ordering::Relaxed),
                "Shutdown timeout reached with connections still open"
            );
        }
        Ok(())
    }

    /// Run one request through the pipeline without the network stack
    ///
    /// `uri` is the absolute path as received, query string included.
    pub async fn handle(
        &self,
        method: &str,
        uri: &str,
        mut headers: HeaderMap,
        body: Option<&[u8]>,
    ) -> Response {
        let shared = &self.shared;
        let request_id = ensure_request_id(&mut headers);

        let request = match body {
            Some(bytes) if bytes.len() > shared.config.max_body_size => {
                Err(Error::PayloadTooLarge {
                    limit: shared.config.max_body_size,
                    actual: bytes.len(),
                })
            }
            _ => RequestContext::new(method, uri, &shared.config.base_path, headers, body),
        };

        process(shared, request, &request_id).await
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}

async fn handle_request(mut req: Request<Incoming>, shared: &Shared) -> Response {
    let request_id = ensure_request_id(req.headers_mut());
    let request = RequestContext::from_hyper_with_limit(
        req,
        &shared.config.base_path,
        shared.config.max_body_size,
    )
    .await;
    process(shared, request, &request_id).await
}

/// Core request processing logic (network agnostic)
async fn process(shared: &Shared, request: Result<RequestContext>, request_id: &str) -> Response {
    let formatter = shared.formatter.as_ref();

    let result = match request {
        Ok(request) => match shared.dispatcher.run(&request).await {
            Ok(Some(reply)) => Ok(formatter.ok(reply)),
            Ok(None) if shared.config.strict_routing => Err(Error::RouteNotFound {
                method: request.method().to_string(),
                path: request.path().to_string(),
            }),
            Ok(None) => Ok(Response::empty()),
            Err(err) => Err(err),
        },
        Err(err) => Err(err),
    };

    let mut response = result.unwrap_or_else(|err| {
        if err.kind().is_expected() {
            debug!(request_id = %request_id, error = %err, "Request rejected");
        } else {
            error!(request_id = %request_id, error = %err, "Request failed");
        }
        formatter.error(&err)
    });

    response.set_header(REQUEST_ID, request_id);
    response
}

/// Reuse the caller's request id or assign a new one
fn ensure_request_id(headers: &mut HeaderMap) -> String {
    if let Some(id) = headers.get(REQUEST_ID).and_then(|v| v.to_str().ok()) {
        return id.to_string();
    }
    let id = generate_request_id();
    if let Ok(value) = HeaderValue::from_str(&id) {
        headers.insert(REQUEST_ID, value);
    }
    id
}

static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(1);

fn generate_request_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let counter = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{:x}", now.as_nanos(), counter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Controller;
    use crate::error::ErrorKind;
    use crate::middleware::{BoxFuture, Context};
    use crate::reply::Reply;
    use crate::router::{Method, RouteRegistry};
    use crate::value::Params;
    use serde_json::json;

    #[test]
    fn test_accept_backoff() {
        use std::io::{Error as IoError, ErrorKind as Io};
        assert_eq!(accept_backoff(&IoError::from(Io::ConnectionAborted)), None);
        assert_eq!(accept_backoff(&IoError::from(Io::ConnectionReset)), None);
        assert_eq!(
            accept_backoff(&IoError::other("too many open files")),
            Some(ACCEPT_BACKOFF)
        );
    }

    struct Plain;

    impl ResponseFormatter for Plain {
        fn ok(&self, reply: Reply) -> Response {
            let body = reply.data.unwrap_or_default().to_string();
            Response::json(body).with_status(reply.status)
        }

        fn error(&self, err: &Error) -> Response {
            let status = match err.kind() {
                ErrorKind::NotFound => 404,
                ErrorKind::BadRequest => 400,
                ErrorKind::PayloadTooLarge => 413,
                _ => 500,
            };
            Response::json(json!({ "error": err.to_string() }).to_string()).with_status(status)
        }
    }

    struct Echo;

    impl Controller for Echo {
        fn name(&self) -> &'static str {
            "EchoController"
        }

        fn actions(&self) -> &'static [&'static str] {
            &["echo"]
        }

        fn call<'a>(
            &'a self,
            _action: &'a str,
            params: Params,
            _context: Option<Context>,
        ) -> Option<BoxFuture<'a, Result<Reply>>> {
            Some(Box::pin(async move {
                Ok(Reply::data(serde_json::to_value(&params)?))
            }))
        }
    }

    fn server(strict_routing: bool) -> Server {
        let mut routes = RouteRegistry::new();
        routes
            .register(Method::Post, "api/echo/{id}", "EchoController@echo", None)
            .unwrap();
        let dispatcher = Dispatcher::new(routes).with_controller(Echo);
        let config = ServerConfig {
            base_path: "/FlipMeet/".to_string(),
            max_body_size: 64,
            strict_routing,
            ..ServerConfig::default()
        };
        Server::new(config, dispatcher, Plain)
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.address.port(), 8000);
        assert_eq!(config.base_path, "/");
        assert!(config.keep_alive);
        assert!(!config.strict_routing);
    }

    #[tokio::test]
    async fn test_handle_dispatches() {
        let resp = server(false)
            .handle(
                "POST",
                "/FlipMeet/api/echo/3?x=1",
                HeaderMap::new(),
                Some(br#"{"name":"Ana"}"#),
            )
            .await;
        assert_eq!(resp.status, 200);
        let body: serde_json::Value = serde_json::from_str(&resp.body).unwrap();
        assert_eq!(body, json!({ "id": "3", "name": "Ana" }));
        assert!(resp.header(REQUEST_ID).is_some());
    }

    #[tokio::test]
    async fn test_unmatched_route_is_empty() {
        let resp = server(false)
            .handle("GET", "/FlipMeet/api/nowhere", HeaderMap::new(), None)
            .await;
        assert_eq!(resp.status, 200);
        assert!(resp.body.is_empty());
    }

    #[tokio::test]
    async fn test_strict_routing_not_found() {
        let resp = server(true)
            .handle("GET", "/FlipMeet/api/nowhere", HeaderMap::new(), None)
            .await;
        assert_eq!(resp.status, 404);
    }

    #[tokio::test]
    async fn test_payload_too_large() {
        let body = vec![b' '; 65];
        let resp = server(false)
            .handle("POST", "/FlipMeet/api/echo/1", HeaderMap::new(), Some(body.as_slice()))
            .await;
        assert_eq!(resp.status, 413);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let resp = server(false)
            .handle("POST", "/FlipMeet/api/echo/1", HeaderMap::new(), Some(b"[1,2]"))
            .await;
        assert_eq!(resp.status, 400);
    }

    #[tokio::test]
    async fn test_request_id_is_preserved() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID, HeaderValue::from_static("abc-123"));
        let resp = server(false)
            .handle("GET", "/FlipMeet/api/nowhere", headers, None)
            .await;
        assert_eq!(resp.header(REQUEST_ID), Some("abc-123"));
    }

    #[test]
    fn test_generate_request_id_unique() {
        assert_ne!(generate_request_id(), generate_request_id());
    }
}
