//! Route guard requiring a valid session token.

use super::TokenService;
use flipmeet_core::{BoxFuture, Continuation, Error, Middleware, Reply, RequestContext, Result};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

/// Header carrying the session token
pub const TOKEN_HEADER: &str = "x-token";

/// Admits requests with a valid token and hands `{"email": ..}` forward
#[derive(Debug, Clone)]
pub struct AuthMiddleware {
    tokens: Arc<TokenService>,
}

impl AuthMiddleware {
    /// Guard backed by a token service
    #[must_use]
    pub const fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

/// Token from `X-Token`, falling back to `Authorization: Bearer`
fn extract_token(request: &RequestContext) -> Option<&str> {
    request
        .header(TOKEN_HEADER)
        .or_else(|| {
            request
                .header("authorization")
                .and_then(|h| h.strip_prefix("Bearer "))
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl Middleware for AuthMiddleware {
    fn name(&self) -> &'static str {
        "AuthMiddleware"
    }

    fn handle<'a>(
        &'a self,
        request: &'a RequestContext,
        next: Continuation<'a>,
    ) -> BoxFuture<'a, Result<Reply>> {
        let verified = extract_token(request)
            .ok_or_else(|| Error::unauthorized("You must log in to perform this action."))
            .and_then(|token| self.tokens.verify(token));

        match verified {
            Ok(claims) => next.run(Some(json!({ "email": claims.email }))),
            Err(err) => {
                warn!(path = %request.path(), "Rejected unauthenticated request");
                Box::pin(async move { Err(err) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use flipmeet_core::MiddlewareChain;
    use hyper::header::HeaderValue;
    use hyper::HeaderMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn tokens() -> Arc<TokenService> {
        Arc::new(TokenService::new(&AuthConfig::new("s3cret")))
    }

    fn request(header: Option<(&'static str, String)>) -> RequestContext {
        let mut headers = HeaderMap::new();
        if let Some((name, value)) = header {
            headers.insert(name, HeaderValue::from_str(&value).unwrap());
        }
        RequestContext::new("GET", "/api/users/1", "/", headers, None).unwrap()
    }

    async fn run(guard: AuthMiddleware, req: &RequestContext, called: Arc<AtomicBool>) -> Result<Reply> {
        let mut chain = MiddlewareChain::new();
        chain.add(guard);
        let terminal = Continuation::handler(move |context| {
            Box::pin(async move {
                called.store(true, Ordering::SeqCst);
                Ok(Reply::data(json!({ "context": context })))
            })
        });
        chain.run(req, terminal).await
    }

    #[tokio::test]
    async fn test_missing_token_short_circuits() {
        let called = Arc::new(AtomicBool::new(false));
        let req = request(None);
        let result = run(AuthMiddleware::new(tokens()), &req, called.clone()).await;
        assert!(matches!(result, Err(Error::Authorization { .. })));
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_invalid_token_short_circuits() {
        let called = Arc::new(AtomicBool::new(false));
        let req = request(Some((TOKEN_HEADER, "forged".to_string())));
        let result = run(AuthMiddleware::new(tokens()), &req, called.clone()).await;
        assert!(result.is_err());
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_x_token_passes_email() {
        let tokens = tokens();
        let token = tokens.issue("ana@example.com").unwrap();
        let called = Arc::new(AtomicBool::new(false));
        let req = request(Some((TOKEN_HEADER, token)));

        let reply = run(AuthMiddleware::new(tokens), &req, called.clone()).await.unwrap();
        assert!(called.load(Ordering::SeqCst));
        assert_eq!(
            reply.data,
            Some(json!({ "context": { "email": "ana@example.com" } }))
        );
    }

    #[tokio::test]
    async fn test_bearer_token_accepted() {
        let tokens = tokens();
        let token = tokens.issue("ana@example.com").unwrap();
        let req = request(Some(("authorization", format!("Bearer {token}"))));

        let result = run(AuthMiddleware::new(tokens), &req, Arc::new(AtomicBool::new(false))).await;
        assert!(result.is_ok());
    }
}
