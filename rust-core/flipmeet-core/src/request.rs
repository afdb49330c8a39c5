//! # Request Context
//!
//! One parsed incoming call: verb, relative path, body parameters, headers.
//!
//! ## Design Principles (SOLID)
//!
//! - **S**: Request only handles request data, not response
//! - **O**: Extensible via new methods without breaking changes
//! - **D**: Handlers never see hyper's request type

use crate::error::{Error, Result};
use crate::json::parse_body_params;
use crate::route::UrlParams;
use crate::router::Method;
use crate::value::{Params, Value};
use http_body_util::BodyExt;
use hyper::body::Bytes;
use hyper::{HeaderMap, Request};

/// Immutable view of one incoming call
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    path: String,
    body_params: Option<Params>,
    headers: HeaderMap,
}

impl RequestContext {
    /// Build a context from transport pieces
    ///
    /// The query string is dropped, then `base_path` is stripped from the
    /// front of the absolute path. A path outside the base is kept as is.
    /// For GET the body is ignored.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedMethod` for an unknown verb and
    /// `Error::MalformedBody` when a non-GET payload is not a flat object.
    pub fn new(
        method: &str,
        absolute_path: &str,
        base_path: &str,
        headers: HeaderMap,
        body: Option<&[u8]>,
    ) -> Result<Self> {
        let method: Method = method.parse()?;
        let path = relative_path(absolute_path, base_path).to_string();

        let body_params = match (method, body) {
            (Method::Get, _) | (_, None) => None,
            (_, Some(bytes)) => parse_body_params(bytes)?,
        };

        Ok(Self {
            method,
            path,
            body_params,
            headers,
        })
    }

    /// Create from hyper request with body size limit
    ///
    /// # Errors
    ///
    /// Returns `Error::PayloadTooLarge` over the limit, `Error::Http` if the
    /// body stream fails, and the errors of [`RequestContext::new`].
    pub async fn from_hyper_with_limit(
        req: Request<hyper::body::Incoming>,
        base_path: &str,
        max_body_size: usize,
    ) -> Result<Self> {
        let (parts, body) = req.into_parts();

        if let Some(content_len) = parts
            .headers
            .get(hyper::header::CONTENT_LENGTH)
            .and_then(|len| len.to_str().ok())
            .and_then(|len| len.parse::<usize>().ok())
        {
            if content_len > max_body_size {
                return Err(Error::PayloadTooLarge {
                    limit: max_body_size,
                    actual: content_len,
                });
            }
        }

        let bytes: Bytes = body.collect().await?.to_bytes();
        if bytes.len() > max_body_size {
            return Err(Error::PayloadTooLarge {
                limit: max_body_size,
                actual: bytes.len(),
            });
        }

        Self::new(
            parts.method.as_str(),
            parts.uri.path(),
            base_path,
            parts.headers,
            Some(bytes.as_ref()),
        )
    }

    /// Upper-cased verb
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Path relative to the public base
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Decoded body fields, absent for GET and for empty payloads
    #[must_use]
    pub const fn body_params(&self) -> Option<&Params> {
        self.body_params.as_ref()
    }

    /// Get a header value by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All request headers
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// URL parameters overlaid with this request's body parameters
    #[must_use]
    pub fn merged_params(&self, url_params: UrlParams) -> Params {
        merge_params(url_params, self.body_params.as_ref())
    }
}

/// Overlay body parameters on URL parameters; body values win
#[must_use]
pub fn merge_params(url_params: UrlParams, body_params: Option<&Params>) -> Params {
    let mut merged: Params = url_params
        .into_iter()
        .map(|(k, v)| (k, Value::Text(v)))
        .collect();
    if let Some(body) = body_params {
        merged.extend(body.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merged
}

/// Strip the query string and the public base prefix
fn relative_path<'a>(absolute: &'a str, base: &str) -> &'a str {
    let path = absolute.split_once('?').map_or(absolute, |(p, _)| p);
    path.strip_prefix(base).unwrap_or(path)
}
