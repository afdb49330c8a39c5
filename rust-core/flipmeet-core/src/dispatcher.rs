//! # Dispatcher
//!
//! Resolves a request to a controller action and runs it behind its
//! middleware.
//!
//! Every collaborator is injected: the route table, controllers keyed by
//! name, middleware keyed by id, and global layers. A request that matches
//! no route is a silent no-op: `run` returns `Ok(None)` and the server
//! decides what to send.

use crate::error::{Error, Result};
use crate::middleware::{BoxFuture, Context, Continuation, Middleware, MiddlewareChain};
use crate::reply::Reply;
use crate::request::RequestContext;
use crate::router::{MatchResult, RouteRegistry};
use crate::value::Params;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A named group of actions
pub trait Controller: Send + Sync {
    /// Name used in handler ids, as in `UsersController@get`
    fn name(&self) -> &'static str;

    /// Actions this controller answers
    fn actions(&self) -> &'static [&'static str];

    /// Start an action
    ///
    /// `params` holds URL parameters overlaid by body parameters; `context`
    /// is whatever the innermost middleware handed forward. Returns `None`
    /// for an unknown action.
    fn call<'a>(
        &'a self,
        action: &'a str,
        params: Params,
        context: Option<Context>,
    ) -> Option<BoxFuture<'a, Result<Reply>>>;
}

/// Request dispatcher
#[derive(Clone)]
pub struct Dispatcher {
    routes: Arc<RouteRegistry>,
    controllers: HashMap<String, Arc<dyn Controller>>,
    middlewares: HashMap<String, Arc<dyn Middleware>>,
    global: MiddlewareChain,
}

impl Dispatcher {
    /// Dispatcher over a populated route table
    #[must_use]
    pub fn new(routes: RouteRegistry) -> Self {
        Self {
            routes: Arc::new(routes),
            controllers: HashMap::new(),
            middlewares: HashMap::new(),
            global: MiddlewareChain::new(),
        }
    }

    /// Register a controller under its own name
    #[must_use]
    pub fn with_controller<C: Controller + 'static>(self, controller: C) -> Self {
        self.with_shared_controller(Arc::new(controller))
    }

    /// Register an already shared controller
    #[must_use]
    pub fn with_shared_controller(mut self, controller: Arc<dyn Controller>) -> Self {
        self.controllers
            .insert(controller.name().to_string(), controller);
        self
    }

    /// Register a middleware routes can name by `id`
    #[must_use]
    pub fn with_middleware<M: Middleware + 'static>(mut self, id: &str, middleware: M) -> Self {
        self.middlewares
            .insert(id.to_string(), Arc::new(middleware));
        self
    }

    /// Add a layer that wraps every matched route
    ///
    /// Global layers run outside any route middleware, first added first.
    #[must_use]
    pub fn with_global<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.global.add(middleware);
        self
    }

    /// The route table
    #[must_use]
    pub fn routes(&self) -> &RouteRegistry {
        &self.routes
    }

    /// Check that every route resolves
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` naming the first route whose controller,
    /// action or middleware is missing.
    pub fn validate(&self) -> Result<()> {
        for route in self.routes.all() {
            let handler = route.handler();
            let controller = self.controller(handler.controller())?;
            if !controller.actions().contains(&handler.action()) {
                return Err(Error::configuration(format!(
                    "{} {}: unknown action {handler}",
                    route.method(),
                    route.pattern()
                )));
            }
            if let Some(id) = route.middleware() {
                self.middleware(id)?;
            }
        }
        Ok(())
    }

    /// Dispatch one request
    ///
    /// Returns `Ok(None)` when no route matches.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` when the matched route names a missing
    /// controller, action or middleware, and otherwise whatever a middleware
    /// or the action raised.
    pub async fn run(&self, request: &RequestContext) -> Result<Option<Reply>> {
        let MatchResult { route, params } =
            match self.routes.match_route(request.method(), request.path()) {
                Ok(matched) => matched,
                Err(Error::RouteNotFound { method, path }) => {
                    debug!(method = %method, path = %path, "No route matched");
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };

        let handler = route.handler();
        let controller = self.controller(handler.controller())?;
        let action = handler.action();
        if !controller.actions().contains(&action) {
            return Err(Error::configuration(format!("unknown action {handler}")));
        }
        let route_layer = route.middleware().map(|id| self.middleware(id)).transpose()?;

        debug!(handler = %handler, params = params.len(), "Route matched");

        let params = request.merged_params(params);
        let missing = handler.to_string();
        let terminal = Continuation::handler(move |context| {
            match controller.call(action, params, context) {
                Some(future) => future,
                None => Box::pin(async move {
                    Err(Error::configuration(format!("unknown action {missing}")))
                }),
            }
        });

        let continuation = match route_layer {
            Some(mw) => Continuation::layer(mw, request, terminal),
            None => terminal,
        };
        self.global.run(request, continuation).await.map(Some)
    }

    fn controller(&self, name: &str) -> Result<&dyn Controller> {
        self.controllers
            .get(name)
            .map(|c| &**c)
            .ok_or_else(|| Error::configuration(format!("unknown controller {name}")))
    }

    fn middleware(&self, id: &str) -> Result<&dyn Middleware> {
        self.middlewares
            .get(id)
            .map(|c| &**c)
            .ok_or_else(|| Error::configuration(format!("unknown middleware {id}")))
    }
}
