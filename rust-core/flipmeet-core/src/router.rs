//! # Route Registry
//!
//! Ordered, per-verb route table with `{name}` segment binders.
//!
//! ## Features
//!
//! - O(1) lookup for fully literal patterns
//! - Parameter extraction (`api/users/{id}`)
//! - First registered match wins; no specificity ranking
//!
//! ## SOLID Principles
//!
//! - **S**: Registry only handles registration and matching
//! - **O**: Segment rules live in `route`, not here
//! - **D**: Dispatcher depends on `MatchResult`, not on storage layout

use crate::error::{Error, Result};
use crate::route::{HandlerId, Route, UrlParams};
use std::collections::HashMap;
use std::str::FromStr;

/// HTTP methods supported by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// HTTP GET
    Get,
    /// HTTP POST
    Post,
    /// HTTP PUT
    Put,
    /// HTTP DELETE
    Delete,
    /// HTTP PATCH
    Patch,
    /// HTTP HEAD
    Head,
    /// HTTP OPTIONS
    Options,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Patch => write!(f, "PATCH"),
            Self::Head => write!(f, "HEAD"),
            Self::Options => write!(f, "OPTIONS"),
        }
    }
}

impl FromStr for Method {
    type Err = Error;

    /// Parse a transport method, case-insensitively
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(Error::UnsupportedMethod {
                method: s.to_string(),
            }),
        }
    }
}

/// Matched route with extracted parameters
#[derive(Debug)]
pub struct MatchResult<'r> {
    /// The route that matched
    pub route: &'r Route,
    /// Parameters bound from URL segments
    pub params: UrlParams,
}

impl MatchResult<'_> {
    /// Handler of the matched route
    #[must_use]
    pub const fn handler(&self) -> &HandlerId {
        self.route.handler()
    }

    /// Middleware id of the matched route
    #[must_use]
    pub fn middleware(&self) -> Option<&str> {
        self.route.middleware()
    }
}

/// Per-method storage for routes
#[derive(Debug, Clone, Default)]
struct MethodRoutes {
    /// Every route in registration order
    routes: Vec<Route>,
    /// Literal pattern to index of its first registration
    literal: HashMap<String, usize>,
    /// Indices of parameterized routes, in registration order
    parameterized: Vec<usize>,
}

/// Route table keyed by verb
///
/// Populated once at bootstrap and shared read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    method_routes: HashMap<Method, MethodRoutes>,
}

impl RouteRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route
    ///
    /// Appends; nothing is de-duplicated. For a literal pattern registered
    /// twice the first registration answers lookups.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method
    /// * `pattern` - Path pattern without leading slash (e.g. `api/users/{id}`)
    /// * `handler` - Handler id, `Controller@action`
    /// * `middleware` - Optional middleware id
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the handler id is malformed
    pub fn register(
        &mut self,
        method: Method,
        pattern: &str,
        handler: &str,
        middleware: Option<&str>,
    ) -> Result<&Route> {
        let route = Route::new(method, pattern, handler, middleware)?;
        let entry = self.method_routes.entry(method).or_default();
        let index = entry.routes.len();

        if route.is_literal() {
            entry.literal.entry(pattern.to_string()).or_insert(index);
        } else {
            entry.parameterized.push(index);
        }
        entry.routes.push(route);

        Ok(&entry.routes[index])
    }

    /// Match a request path against registered routes
    ///
    /// Literal patterns are tried first by exact lookup, then parameterized
    /// patterns in registration order. The first that binds every segment wins.
    ///
    /// # Errors
    ///
    /// Returns `Error::RouteNotFound` if no route matches
    pub fn match_route(&self, method: Method, path: &str) -> Result<MatchResult<'_>> {
        let not_found = || Error::RouteNotFound {
            method: method.to_string(),
            path: path.to_string(),
        };

        let method_routes = self.method_routes.get(&method).ok_or_else(not_found)?;

        if let Some(&index) = method_routes.literal.get(path) {
            return Ok(MatchResult {
                route: &method_routes.routes[index],
                params: UrlParams::new(),
            });
        }

        method_routes
            .parameterized
            .iter()
            .map(|&index| &method_routes.routes[index])
            .find_map(|route| route.bind(path).map(|params| MatchResult { route, params }))
            .ok_or_else(not_found)
    }

    /// Routes registered for a verb, in registration order
    pub fn routes(&self, method: Method) -> impl Iterator<Item = &Route> {
        self.method_routes
            .get(&method)
            .into_iter()
            .flat_map(|m| m.routes.iter())
    }

    /// Every registered route across all verbs
    pub fn all(&self) -> impl Iterator<Item = &Route> {
        self.method_routes.values().flat_map(|m| m.routes.iter())
    }

    /// Total number of registered routes
    #[must_use]
    pub fn len(&self) -> usize {
        self.method_routes.values().map(|m| m.routes.len()).sum()
    }

    /// Check if nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convenience method to add a GET route
    pub fn get(&mut self, pattern: &str, handler: &str) -> Result<&Route> {
        self.register(Method::Get, pattern, handler, None)
    }

    /// Convenience method to add a POST route
    pub fn post(&mut self, pattern: &str, handler: &str) -> Result<&Route> {
        self.register(Method::Post, pattern, handler, None)
    }

    /// Convenience method to add a PUT route
    pub fn put(&mut self, pattern: &str, handler: &str) -> Result<&Route> {
        self.register(Method::Put, pattern, handler, None)
    }

    /// Convenience method to add a DELETE route
    pub fn delete(&mut self, pattern: &str, handler: &str) -> Result<&Route> {
        self.register(Method::Delete, pattern, handler, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_routing() {
        let mut registry = RouteRegistry::new();
        registry.post("api/login", "LogController@login").unwrap();
        registry.get("api/posts", "PostsController@getAll").unwrap();
        registry.post("api/posts", "PostsController@add").unwrap();

        let m = registry.match_route(Method::Post, "api/login").unwrap();
        assert_eq!(m.handler().to_string(), "LogController@login");
        assert!(m.params.is_empty());

        let m = registry.match_route(Method::Get, "api/posts").unwrap();
        assert_eq!(m.handler().action(), "getAll");

        let m = registry.match_route(Method::Post, "api/posts").unwrap();
        assert_eq!(m.handler().action(), "add");
    }

    #[test]
    fn test_path_parameters() {
        let mut registry = RouteRegistry::new();
        registry
            .get("api/posts/{id}/comments", "PostsController@getComments")
            .unwrap();

        let m = registry
            .match_route(Method::Get, "api/posts/7/comments")
            .unwrap();
        assert_eq!(m.params.get("id").map(String::as_str), Some("7"));
        assert_eq!(m.params.len(), 1);
    }

    #[test]
    fn test_multiple_parameters() {
        let mut registry = RouteRegistry::new();
        registry
            .get("api/users/{user}/posts/{post}", "PostsController@get")
            .unwrap();

        let m = registry
            .match_route(Method::Get, "api/users/456/posts/789")
            .unwrap();
        assert_eq!(m.params.get("user").map(String::as_str), Some("456"));
        assert_eq!(m.params.get("post").map(String::as_str), Some("789"));
    }

    #[test]
    fn test_segment_count_must_match() {
        let mut registry = RouteRegistry::new();
        registry.get("api/posts/{id}", "PostsController@get").unwrap();

        for path in ["api/posts", "api/posts/1/2", "api", "", "api/posts/1/comments"] {
            assert!(registry.match_route(Method::Get, path).is_err(), "{path}");
        }
    }

    #[test]
    fn test_first_registered_wins() {
        let mut registry = RouteRegistry::new();
        registry.get("api/{kind}/latest", "FeedController@byKind").unwrap();
        registry.get("api/posts/{id}", "PostsController@get").unwrap();

        let m = registry.match_route(Method::Get, "api/posts/latest").unwrap();
        assert_eq!(m.handler().to_string(), "FeedController@byKind");
        assert_eq!(m.params.get("kind").map(String::as_str), Some("posts"));
    }

    #[test]
    fn test_literal_checked_before_parameterized() {
        let mut registry = RouteRegistry::new();
        registry.get("api/posts/{id}", "PostsController@get").unwrap();
        registry.get("api/posts/latest", "PostsController@latest").unwrap();

        let m = registry.match_route(Method::Get, "api/posts/latest").unwrap();
        assert_eq!(m.handler().action(), "latest");
    }

    #[test]
    fn test_duplicate_registration_kept() {
        let mut registry = RouteRegistry::new();
        registry.get("api/posts", "PostsController@getAll").unwrap();
        registry.get("api/posts", "OtherController@getAll").unwrap();

        assert_eq!(registry.routes(Method::Get).count(), 2);
        let m = registry.match_route(Method::Get, "api/posts").unwrap();
        assert_eq!(m.handler().controller(), "PostsController");
    }

    #[test]
    fn test_route_not_found() {
        let registry = RouteRegistry::new();
        let result = registry.match_route(Method::Get, "api/nonexistent");
        assert!(matches!(result, Err(Error::RouteNotFound { .. })));
    }

    #[test]
    fn test_method_not_registered() {
        let mut registry = RouteRegistry::new();
        registry.get("api/users/{id}", "UsersController@get").unwrap();

        let result = registry.match_route(Method::Post, "api/users/1");
        assert!(result.is_err());
    }

    #[test]
    fn test_middleware_carried_by_match() {
        let mut registry = RouteRegistry::new();
        registry
            .register(Method::Put, "api/users/{id}", "UsersController@edit", Some("auth"))
            .unwrap();

        let m = registry.match_route(Method::Put, "api/users/3").unwrap();
        assert_eq!(m.middleware(), Some("auth"));
    }

    #[test]
    fn test_malformed_handler_rejected() {
        let mut registry = RouteRegistry::new();
        let result = registry.get("api/posts", "PostsController");
        assert!(matches!(result, Err(Error::Configuration { .. })));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("Put".parse::<Method>().unwrap(), Method::Put);
        assert!(matches!(
            "TRACE".parse::<Method>(),
            Err(Error::UnsupportedMethod { .. })
        ));
    }
}
