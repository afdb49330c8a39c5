//! Route table, in registration order.

use crate::app::AUTH;
use flipmeet_core::{Method, Result, RouteRegistry};

/// `(verb, pattern, handler, middleware)`
pub const ROUTES: &[(Method, &str, &str, Option<&str>)] = &[
    (Method::Post, "api/login", "LogController@login", None),
    (Method::Get, "api/users/{id}", "UsersController@get", Some(AUTH)),
    (Method::Post, "api/users", "UsersController@add", None),
    (Method::Put, "api/users/{id}", "UsersController@edit", Some(AUTH)),
    (Method::Get, "api/posts", "PostsController@getAll", None),
    (Method::Get, "api/posts/{id}", "PostsController@get", None),
    (Method::Get, "api/posts/{id}/comments", "PostsController@getComments", None),
    (Method::Post, "api/posts", "PostsController@add", Some(AUTH)),
    (Method::Post, "api/comments", "CommentsController@add", Some(AUTH)),
    (Method::Get, "api/interests", "InterestsController@getAll", None),
    (Method::Get, "api/categories", "CategoriesController@getAll", None),
];

/// Build the registry from [`ROUTES`]
///
/// # Errors
///
/// Returns `Error::Configuration` for a malformed handler id.
pub fn routes() -> Result<RouteRegistry> {
    let mut registry = RouteRegistry::new();
    for &(method, pattern, handler, middleware) in ROUTES {
        registry.register(method, pattern, handler, middleware)?;
    }
    Ok(registry)
}
