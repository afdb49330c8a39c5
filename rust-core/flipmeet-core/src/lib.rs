//! # FlipMeet Core
//!
//! Runtime library for the FlipMeet backend.
//! Provides routing, middleware dispatch, active-record models, validation
//! and an HTTP host.
//!
//! ## Architecture
//!
//! A request flows `Server` → `RequestContext` → `Dispatcher` →
//! middleware layers → controller action → `Reply` → `ResponseFormatter`.
//! Every collaborator (routes, controllers, middleware, database, formatter)
//! is constructed at bootstrap and injected; nothing is global.
//!
//! ## Modules
//!
//! - `server` - HTTP server built on Hyper
//! - `router` - Verb-keyed route table with first-match-wins lookup
//! - `route` - Route patterns, `{name}` binders and handler ids
//! - `request` - Parsed request context
//! - `dispatcher` - Controller registry and request dispatch
//! - `middleware` - Continuation-passing middleware chain
//! - `reply` - Handler replies, wire responses and the formatter seam
//! - `json` - High-performance JSON parsing with simd-json
//! - `validation` - Rule-string validator with structured errors
//! - `model` - Metadata-driven CRUD over entity types
//! - `database` - SQLx database connectivity (SQLite, PostgreSQL)
//! - `value` - Scalar values shared by params, rows and entities
//! - `error` - Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod database;
pub mod dispatcher;
pub mod error;
pub mod json;
pub mod middleware;
pub mod model;
pub mod reply;
pub mod request;
pub mod route;
pub mod router;
pub mod server;
pub mod validation;
pub mod value;

pub use database::{Database, DatabaseConfig, Dialect};
pub use dispatcher::{Controller, Dispatcher};
pub use error::{Error, ErrorKind, Result};
pub use json::{parse_body_params, parse_json_bytes};
pub use middleware::{BoxFuture, Context, Continuation, LoggingMiddleware, Middleware, MiddlewareChain};
pub use model::{Entity, EntityMeta, Hydration, Model, Setter};
pub use reply::{Reply, Response, ResponseFormatter};
pub use request::RequestContext;
pub use route::{HandlerId, Route, UrlParams};
pub use router::{MatchResult, Method, RouteRegistry};
pub use server::{Server, ServerConfig};
pub use validation::{FieldError, RuleSet, ValidationCode, ValidationErrors, Validator};
pub use value::{Params, Row, Value};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, "0.1.1");
    }
}
