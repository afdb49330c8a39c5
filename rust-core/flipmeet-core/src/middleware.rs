//! # Middleware System
//!
//! Continuation-passing guards that run before a handler.
//!
//! A middleware receives the request and a [`Continuation`] standing for the
//! rest of the pipeline. It either calls `next.run(context)` to proceed,
//! optionally handing derived data (an authenticated identity) to the handler,
//! or returns an error without calling it, in which case the handler never runs.
//!
//! ## Design Principles (SOLID)
//!
//! - **S**: Each middleware has a single responsibility
//! - **O**: Extensible via Middleware trait
//! - **D**: Dispatcher depends on abstract trait, not concrete implementations

use crate::error::Result;
use crate::reply::Reply;
use crate::request::RequestContext;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// A boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Data a middleware hands forward to the handler
pub type Context = serde_json::Value;

/// Terminal step of a pipeline: the bound handler call
type Terminal<'a> = Box<dyn FnOnce(Option<Context>) -> BoxFuture<'a, Result<Reply>> + Send + 'a>;

/// Middleware trait for guarding handlers
pub trait Middleware: Send + Sync {
    /// Middleware name for logging
    fn name(&self) -> &'static str;

    /// Run this layer
    ///
    /// Call `next.run(..)` at most once to proceed; return an error instead to
    /// short-circuit.
    fn handle<'a>(
        &'a self,
        request: &'a RequestContext,
        next: Continuation<'a>,
    ) -> BoxFuture<'a, Result<Reply>>;
}

/// The rest of the request pipeline
///
/// Consumed by [`Continuation::run`], so it can be invoked only once.
pub struct Continuation<'a> {
    inner: Inner<'a>,
    /// Context handed down by an outer layer
    carried: Option<Context>,
}

enum Inner<'a> {
    /// Another middleware still has to run
    Layer {
        middleware: &'a dyn Middleware,
        request: &'a RequestContext,
        next: Box<Continuation<'a>>,
    },
    /// End of chain: invoke the handler
    Handler(Terminal<'a>),
}

impl<'a> Continuation<'a> {
    /// Continuation that invokes a handler with the final context
    pub fn handler<F>(f: F) -> Self
    where
        F: FnOnce(Option<Context>) -> BoxFuture<'a, Result<Reply>> + Send + 'a,
    {
        Self {
            inner: Inner::Handler(Box::new(f)),
            carried: None,
        }
    }

    /// Wrap `next` so `middleware` runs first
    #[must_use]
    pub fn layer(
        middleware: &'a dyn Middleware,
        request: &'a RequestContext,
        next: Self,
    ) -> Self {
        Self {
            inner: Inner::Layer {
                middleware,
                request,
                next: Box::new(next),
            },
            carried: None,
        }
    }

    /// Proceed with an optional context
    ///
    /// `None` keeps whatever context an outer layer already supplied.
    pub fn run(self, context: Option<Context>) -> BoxFuture<'a, Result<Reply>> {
        let context = context.or(self.carried);
        match self.inner {
            Inner::Layer {
                middleware,
                request,
                next,
            } => {
                let mut next = *next;
                next.carried = context;
                middleware.handle(request, next)
            }
            Inner::Handler(handler) => handler(context),
        }
    }
}

/// Ordered list of middleware layers
///
/// The first layer added is the outermost: it runs first and wraps the rest.
#[derive(Default, Clone)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    /// Create a new empty middleware chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a middleware to the chain
    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Arc::new(middleware));
    }

    /// Add an already shared middleware
    pub fn add_shared(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    /// Wrap `terminal` in every layer, first-added outermost
    #[must_use]
    pub fn wrap<'a>(
        &'a self,
        request: &'a RequestContext,
        terminal: Continuation<'a>,
    ) -> Continuation<'a> {
        self.middlewares
            .iter()
            .rev()
            .fold(terminal, |next, mw| {
                Continuation::layer(mw.as_ref(), request, next)
            })
    }

    /// Run the whole chain with no initial context
    pub fn run<'a>(
        &'a self,
        request: &'a RequestContext,
        terminal: Continuation<'a>,
    ) -> BoxFuture<'a, Result<Reply>> {
        self.wrap(request, terminal).run(None)
    }

    /// Layer names in invocation order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(|mw| mw.name()).collect()
    }

    /// Get the number of middlewares
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Check if chain is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

/// Logging middleware - logs requests in structured JSON format
#[derive(Default)]
pub struct LoggingMiddleware {
    log_headers: bool,
}

impl LoggingMiddleware {
    /// Create a new logging middleware
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable header logging
    #[must_use]
    pub const fn with_headers(mut self) -> Self {
        self.log_headers = true;
        self
    }
}

impl Middleware for LoggingMiddleware {
    fn name(&self) -> &'static str {
        "LoggingMiddleware"
    }

    fn handle<'a>(
        &'a self,
        request: &'a RequestContext,
        next: Continuation<'a>,
    ) -> BoxFuture<'a, Result<Reply>> {
        Box::pin(async move {
            let request_id = request.header("x-request-id").unwrap_or("-");
            if self.log_headers {
                info!(
                    method = %request.method(),
                    path = %request.path(),
                    request_id = %request_id,
                    headers = ?request.headers(),
                    "Request received"
                );
            } else {
                info!(
                    method = %request.method(),
                    path = %request.path(),
                    request_id = %request_id,
                    "Request received"
                );
            }

            let start = Instant::now();
            let result = next.run(None).await;
            let duration_ms = start.elapsed().as_millis();

            match &result {
                Ok(reply) => info!(
                    method = %request.method(),
                    path = %request.path(),
                    status = reply.status,
                    duration_ms = %duration_ms,
                    request_id = %request_id,
                    "Response sent"
                ),
                Err(err) => warn!(
                    method = %request.method(),
                    path = %request.path(),
                    error = %err,
                    duration_ms = %duration_ms,
                    request_id = %request_id,
                    "Request failed"
                ),
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use hyper::HeaderMap;
    use serde_json::json;
    use std::sync::Mutex;

    fn request() -> RequestContext {
        RequestContext::new("GET", "/api/users/1", "/", HeaderMap::new(), None).unwrap()
    }

    fn echo_handler<'a>() -> Continuation<'a> {
        Continuation::handler(|context| {
            Box::pin(async move { Ok(Reply::data(json!({ "context": context }))) })
        })
    }

    /// Records its name, then proceeds with an optional context
    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        context: Option<Context>,
    }

    impl Middleware for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn handle<'a>(
            &'a self,
            _request: &'a RequestContext,
            next: Continuation<'a>,
        ) -> BoxFuture<'a, Result<Reply>> {
            self.log.lock().unwrap().push(self.name);
            next.run(self.context.clone())
        }
    }

    struct Deny;

    impl Middleware for Deny {
        fn name(&self) -> &'static str {
            "Deny"
        }

        fn handle<'a>(
            &'a self,
            _request: &'a RequestContext,
            _next: Continuation<'a>,
        ) -> BoxFuture<'a, Result<Reply>> {
            Box::pin(async { Err(Error::unauthorized("no token")) })
        }
    }

    #[tokio::test]
    async fn test_empty_chain_calls_handler_with_no_context() {
        let chain = MiddlewareChain::new();
        let req = request();
        let reply = chain.run(&req, echo_handler()).await.unwrap();
        assert_eq!(reply.data, Some(json!({ "context": null })));
    }

    #[tokio::test]
    async fn test_layers_run_first_to_last() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = MiddlewareChain::new();
        for name in ["outer", "middle", "inner"] {
            chain.add(Recorder {
                name,
                log: log.clone(),
                context: None,
            });
        }

        let req = request();
        chain.run(&req, echo_handler()).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["outer", "middle", "inner"]);
        assert_eq!(chain.names(), vec!["outer", "middle", "inner"]);
    }

    #[tokio::test]
    async fn test_context_reaches_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = MiddlewareChain::new();
        chain.add(Recorder {
            name: "auth",
            log: log.clone(),
            context: Some(json!({ "email": "ana@example.com" })),
        });
        chain.add(Recorder {
            name: "passthrough",
            log,
            context: None,
        });

        let req = request();
        let reply = chain.run(&req, echo_handler()).await.unwrap();
        assert_eq!(
            reply.data,
            Some(json!({ "context": { "email": "ana@example.com" } }))
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_handler() {
        let called = Arc::new(Mutex::new(false));
        let flag = called.clone();
        let terminal = Continuation::handler(move |_| {
            Box::pin(async move {
                *flag.lock().unwrap() = true;
                Ok(Reply::ack("handled"))
            })
        });

        let mut chain = MiddlewareChain::new();
        chain.add(Deny);
        let req = request();
        let result = chain.run(&req, terminal).await;

        assert!(matches!(result, Err(Error::Authorization { .. })));
        assert!(!*called.lock().unwrap());
    }

    #[tokio::test]
    async fn test_logging_middleware_passes_through() {
        let mut chain = MiddlewareChain::new();
        chain.add(LoggingMiddleware::new().with_headers());
        let req = request();
        let reply = chain.run(&req, echo_handler()).await.unwrap();
        assert_eq!(reply.status, 200);
    }

    #[test]
    fn test_middleware_chain_add() {
        let mut chain = MiddlewareChain::new();
        assert!(chain.is_empty());
        chain.add(LoggingMiddleware::new());
        chain.add(Deny);

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.names(), vec!["LoggingMiddleware", "Deny"]);
    }
}
