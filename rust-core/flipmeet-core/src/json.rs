//! # JSON Body Parsing
//!
//! Request payload decoding using simd-json.
//!
//! ## Design Principles (SOLID)
//!
//! - **S**: Only turns payload bytes into flat parameter maps
//! - **D**: Depends on serde abstractions, not concrete parsers

use crate::error::{Error, Result};
use crate::value::{Params, Value};
use serde::de::DeserializeOwned;

/// Parse JSON bytes to a typed value using simd-json
///
/// simd-json parses in place, so the input is copied once.
///
/// # Errors
///
/// Returns `Error::MalformedBody` if parsing fails
pub fn parse_json_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut buffer = bytes.to_vec();
    simd_json::from_slice(&mut buffer).map_err(|e| Error::MalformedBody {
        reason: format!("Parse error: {e}"),
    })
}

/// Decode a request payload into flat body parameters
///
/// Returns `None` for an empty payload, a whitespace-only payload, or a JSON
/// `null`. Anything else must be an object whose values are all scalars.
///
/// # Errors
///
/// Returns `Error::MalformedBody` for invalid JSON, non-object documents, and
/// nested values.
pub fn parse_body_params(bytes: &[u8]) -> Result<Option<Params>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    match parse_json_bytes::<serde_json::Value>(bytes)? {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(key, value)| Value::from_json(&key, value).map(|v| (key, v)))
            .collect::<Result<Params>>()
            .map(Some),
        other => Err(Error::MalformedBody {
            reason: format!("expected a JSON object, found {}", json_type_name(&other)),
        }),
    }
}

const fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
