//! # Replies and Responses
//!
//! `Reply` is what a handler returns; `Response` is what goes on the wire.
//! A [`ResponseFormatter`] sits between them and owns the envelope shape.

use crate::error::Error;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::StatusCode;
use std::collections::HashMap;

/// Successful handler result
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// HTTP status code
    pub status: u16,
    /// Human-readable message
    pub message: Option<String>,
    /// Payload
    pub data: Option<serde_json::Value>,
}

impl Reply {
    /// 200 carrying a payload
    #[must_use]
    pub fn data(data: serde_json::Value) -> Self {
        Self {
            status: 200,
            message: None,
            data: Some(data),
        }
    }

    /// 200 carrying only a message
    #[must_use]
    pub fn ack(message: impl Into<String>) -> Self {
        Self {
            status: 200,
            message: Some(message.into()),
            data: None,
        }
    }

    /// 201 for a newly stored resource
    #[must_use]
    pub fn created(message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            status: 201,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    /// Set status code
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Set message
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Turns replies and errors into wire responses
pub trait ResponseFormatter: Send + Sync {
    /// Render a successful reply
    fn ok(&self, reply: Reply) -> Response;

    /// Render an error raised anywhere below the server
    fn error(&self, err: &Error) -> Response;
}

/// HTTP Response ready to be written
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
    /// Content type
    pub content_type: String,
    /// Response headers
    pub headers: HashMap<String, String>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            body: String::new(),
            content_type: "application/json".to_string(),
            headers: HashMap::new(),
        }
    }
}

impl Response {
    /// Create a JSON response
    #[must_use]
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    /// Create a text response
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: "text/plain".to_string(),
            ..Self::default()
        }
    }

    /// Empty 200, used for requests no route answered
    #[must_use]
    pub fn empty() -> Self {
        Self::text("")
    }

    /// Set status code
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Set header
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.set_header(key, value);
        self
    }

    /// Set or override a header
    pub fn set_header(&mut self, key: &str, value: &str) {
        if key.eq_ignore_ascii_case("content-type") {
            self.content_type = value.to_string();
        } else {
            self.headers.insert(key.to_ascii_lowercase(), value.to_string());
        }
    }

    /// Get a header value
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        if key.eq_ignore_ascii_case("content-type") {
            return Some(&self.content_type);
        }
        self.headers
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Convert to hyper Response
    pub(crate) fn into_hyper(self) -> hyper::Response<Full<Bytes>> {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut builder = hyper::Response::builder()
            .status(status)
            .header("Content-Type", &self.content_type);
        for (k, v) in &self.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }

        builder
            .body(Full::new(Bytes::from(self.body)))
            .unwrap_or_else(|_| {
                let mut fallback = hyper::Response::new(Full::new(Bytes::from_static(
                    b"Internal Server Error",
                )));
                *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                fallback
            })
    }
}
