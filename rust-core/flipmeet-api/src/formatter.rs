//! JSON response envelope.
//!
//! Every answer, success or failure, has the shape
//! `{statusCode, statusText, title?, message?, validationErrors?, data?}`.

use flipmeet_core::{Error, ErrorKind, Reply, Response, ResponseFormatter};
use hyper::StatusCode;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::error;

const DATA_ACCESS_MESSAGE: &str =
    "A problem was detected while accessing the database. Please try again.";
const INTERNAL_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Wire shape of every response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    status_code: u16,
    status_text: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    validation_errors: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

impl Envelope {
    fn new(status_code: u16) -> Self {
        let status_text = StatusCode::from_u16(status_code)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown");
        Self {
            status_code,
            status_text,
            title: None,
            message: None,
            validation_errors: BTreeMap::new(),
            data: None,
        }
    }

    fn into_response(self) -> Response {
        let status = self.status_code;
        match serde_json::to_string(&self) {
            Ok(body) => Response::json(body).with_status(status),
            Err(err) => {
                error!(error = %err, "Failed to serialize envelope");
                Response::json(r#"{"statusCode":500,"statusText":"Internal Server Error"}"#)
                    .with_status(500)
            }
        }
    }
}

/// Renders replies and errors as [`Envelope`] JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeFormatter;

/// HTTP status for an error kind
#[must_use]
pub const fn status_for(kind: ErrorKind) -> u16 {
    match kind {
        ErrorKind::Validation => 422,
        ErrorKind::NotFound => 404,
        ErrorKind::AccessDenied => 401,
        ErrorKind::Conflict => 409,
        ErrorKind::BadRequest => 400,
        ErrorKind::MethodNotAllowed => 405,
        ErrorKind::PayloadTooLarge => 413,
        ErrorKind::DataAccess
        | ErrorKind::Configuration
        | ErrorKind::PropertyAccess
        | ErrorKind::Transport => 500,
    }
}

impl ResponseFormatter for EnvelopeFormatter {
    fn ok(&self, reply: Reply) -> Response {
        let mut envelope = Envelope::new(reply.status);
        envelope.message = reply.message;
        envelope.data = reply.data;
        envelope.into_response()
    }

    fn error(&self, err: &Error) -> Response {
        let mut envelope = Envelope::new(status_for(err.kind()));
        match err {
            Error::Validation(errors) => {
                envelope.title = Some("Invalid data".to_string());
                envelope.message = Some("Please check the submitted fields.".to_string());
                envelope.validation_errors = errors.to_map();
            }
            Error::Authorization { message } => {
                envelope.title = Some("Not authorized".to_string());
                envelope.message = Some(message.clone());
            }
            Error::Conflict { message } => {
                envelope.message = Some(message.clone());
            }
            Error::DataAccess { .. } => {
                envelope.message = Some(DATA_ACCESS_MESSAGE.to_string());
            }
            other if other.kind().is_expected() => {
                envelope.message = Some(other.to_string());
            }
            _ => {
                envelope.message = Some(INTERNAL_MESSAGE.to_string());
            }
        }
        envelope.into_response()
    }
}
