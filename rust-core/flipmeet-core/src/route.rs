//! # Route Metadata
//!
//! Single-responsibility module for route information.
//!
//! ## Design Principles
//!
//! - **S**: `Route` only holds one registered route definition
//! - **O**: Extensible via additional fields without breaking changes
//! - **D**: Decoupled from `RouteRegistry` lookup details

use crate::error::{Error, Result};
use crate::router::Method;
use std::collections::BTreeMap;
use std::fmt;

/// Parameters bound from URL segments, name to raw segment text
pub type UrlParams = BTreeMap<String, String>;

/// One `/`-delimited piece of a route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the path segment byte for byte
    Literal(String),
    /// `{name}`: matches any path segment and captures it
    Param(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => Self::Param(name.to_string()),
            None => Self::Literal(raw.to_string()),
        }
    }
}

/// Handler identifier of the shape `Controller@action`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerId {
    controller: String,
    action: String,
}

impl HandlerId {
    /// Parse `Name@method`
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` unless the id is two non-empty names
    /// joined by a single `@`.
    pub fn parse(id: &str) -> Result<Self> {
        match id.split_once('@') {
            Some((controller, action))
                if !controller.is_empty() && !action.is_empty() && !action.contains('@') =>
            {
                Ok(Self {
                    controller: controller.to_string(),
                    action: action.to_string(),
                })
            }
            _ => Err(Error::configuration(format!(
                "handler id '{id}' must have the shape Controller@action"
            ))),
        }
    }

    /// Controller name
    #[must_use]
    pub fn controller(&self) -> &str {
        &self.controller
    }

    /// Action name
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.controller, self.action)
    }
}

/// A registered route
#[derive(Debug, Clone)]
pub struct Route {
    method: Method,
    pattern: String,
    segments: Vec<Segment>,
    handler: HandlerId,
    middleware: Option<String>,
}

impl Route {
    /// Build a route from its registration arguments
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for a malformed handler id.
    pub fn new(
        method: Method,
        pattern: &str,
        handler: &str,
        middleware: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            method,
            pattern: pattern.to_string(),
            segments: pattern.split('/').map(Segment::parse).collect(),
            handler: HandlerId::parse(handler)?,
            middleware: middleware.map(str::to_string),
        })
    }

    /// Registered verb
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Pattern as registered
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Resolved handler
    #[must_use]
    pub const fn handler(&self) -> &HandlerId {
        &self.handler
    }

    /// Middleware id, if any
    #[must_use]
    pub fn middleware(&self) -> Option<&str> {
        self.middleware.as_deref()
    }

    /// True when no segment is a parameter binder
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Match a path segment by segment, binding parameters
    ///
    /// Segment counts must be equal; literals compare verbatim.
    #[must_use]
    pub fn bind(&self, path: &str) -> Option<UrlParams> {
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = UrlParams::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), decode_segment(part));
                }
            }
        }
        Some(params)
    }
}

/// Percent-decode a bound segment; invalid UTF-8 keeps the raw text
fn decode_segment(part: &str) -> String {
    urlencoding::decode(part).map_or_else(|_| part.to_string(), |decoded| decoded.into_owned())
}
