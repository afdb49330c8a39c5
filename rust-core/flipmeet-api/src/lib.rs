//! # FlipMeet API
//!
//! The social-posting application on top of `flipmeet-core`: entities,
//! controllers, token authentication, the JSON envelope, the route table and
//! bootstrap.
//!
//! ## Modules
//!
//! - `app` - Builds and wires every collaborator
//! - `auth` - Tokens, password digests and the route guard
//! - `config` - Environment configuration
//! - `controllers` - Route handlers
//! - `formatter` - Response envelope
//! - `models` - Entity definitions
//! - `routes` - Route table

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod app;
pub mod auth;
pub mod config;
pub mod controllers;
pub mod formatter;
pub mod models;
pub mod routes;

pub use app::App;
pub use config::{AppConfig, AuthConfig};
pub use formatter::EnvelopeFormatter;
