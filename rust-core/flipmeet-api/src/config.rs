//! Process configuration loaded from `FLIPMEET_*` environment variables.

use crate::auth::password::{DEFAULT_COST, MAX_COST, MIN_COST};
use flipmeet_core::{DatabaseConfig, Error, Result, ServerConfig};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Issuer stamped into and required from every token
pub const DEFAULT_ISSUER: &str = "http://localhost/FlipMeet";

/// Token signing settings
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 shared secret
    pub secret: String,
    /// Token issuer
    pub issuer: String,
    /// Token lifetime
    pub token_ttl: Duration,
    /// bcrypt work factor for stored passwords
    pub password_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: DEFAULT_ISSUER.to_string(),
            token_ttl: Duration::from_secs(24 * 60 * 60),
            password_cost: DEFAULT_COST,
        }
    }
}

impl AuthConfig {
    /// Settings with the given secret and default issuer and lifetime
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Self::default()
        }
    }
}

/// Everything the process needs to boot
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// HTTP host settings
    pub server: ServerConfig,
    /// Storage settings
    pub database: DatabaseConfig,
    /// Token settings
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for an unreadable `.env` file, an
    /// unparseable variable, or an empty token secret.
    pub fn from_env() -> Result<Self> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                return Err(Error::configuration(format!("failed to load .env: {err}")));
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for an unparseable value or an empty
    /// token secret.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let server = &mut config.server;

        if let Some(raw) = lookup("FLIPMEET_ADDRESS") {
            server.address = parse::<SocketAddr>("FLIPMEET_ADDRESS", &raw)?;
        }
        if let Some(raw) = lookup("FLIPMEET_BASE_PATH") {
            server.base_path = normalize_base_path(&raw);
        }
        if let Some(raw) = lookup("FLIPMEET_MAX_BODY_SIZE") {
            server.max_body_size = parse("FLIPMEET_MAX_BODY_SIZE", &raw)?;
        }
        if let Some(raw) = lookup("FLIPMEET_SHUTDOWN_TIMEOUT_SECS") {
            server.shutdown_timeout =
                Duration::from_secs(parse("FLIPMEET_SHUTDOWN_TIMEOUT_SECS", &raw)?);
        }
        if let Some(raw) = lookup("FLIPMEET_STRICT_ROUTING") {
            server.strict_routing = parse_flag("FLIPMEET_STRICT_ROUTING", &raw)?;
        }

        if let Some(raw) = lookup("FLIPMEET_DATABASE_URL") {
            config.database.url = raw;
        }
        if let Some(raw) = lookup("FLIPMEET_DATABASE_MAX_CONNECTIONS") {
            config.database.max_connections = parse("FLIPMEET_DATABASE_MAX_CONNECTIONS", &raw)?;
        }

        if let Some(raw) = lookup("FLIPMEET_JWT_SECRET") {
            config.auth.secret = raw;
        }
        if let Some(raw) = lookup("FLIPMEET_JWT_ISSUER") {
            config.auth.issuer = raw;
        }
        if let Some(raw) = lookup("FLIPMEET_TOKEN_TTL_SECS") {
            config.auth.token_ttl = Duration::from_secs(parse("FLIPMEET_TOKEN_TTL_SECS", &raw)?);
        }
        if let Some(raw) = lookup("FLIPMEET_PASSWORD_COST") {
            config.auth.password_cost = parse("FLIPMEET_PASSWORD_COST", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the process cannot run with
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for an empty token secret, a password
    /// cost bcrypt does not accept, or a zero connection limit.
    pub fn validate(&self) -> Result<()> {
        if self.auth.secret.trim().is_empty() {
            return Err(Error::configuration("FLIPMEET_JWT_SECRET must not be empty"));
        }
        if !(MIN_COST..=MAX_COST).contains(&self.auth.password_cost) {
            return Err(Error::configuration(format!(
                "FLIPMEET_PASSWORD_COST must be between {MIN_COST} and {MAX_COST}"
            )));
        }
        if self.database.max_connections == 0 {
            return Err(Error::configuration(
                "FLIPMEET_DATABASE_MAX_CONNECTIONS must be at least 1",
            ));
        }
        Ok(())
    }
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::configuration(format!("{key}: cannot parse '{raw}'")))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(Error::configuration(format!("{key}: cannot parse '{raw}'"))),
    }
}

/// Base path always starts and ends with `/`
fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_secret() {
        let config = AppConfig::from_lookup(lookup(&[("FLIPMEET_JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.server.address.port(), 8000);
        assert_eq!(config.server.base_path, "/");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.database.max_connections, 1);
        assert_eq!(config.auth.issuer, DEFAULT_ISSUER);
        assert_eq!(config.auth.password_cost, DEFAULT_COST);
    }

    #[test]
    fn test_password_cost_bounds() {
        let config = AppConfig::from_lookup(lookup(&[
            ("FLIPMEET_JWT_SECRET", "s3cret"),
            ("FLIPMEET_PASSWORD_COST", "4"),
        ]))
        .unwrap();
        assert_eq!(config.auth.password_cost, 4);

        let result = AppConfig::from_lookup(lookup(&[
            ("FLIPMEET_JWT_SECRET", "s3cret"),
            ("FLIPMEET_PASSWORD_COST", "3"),
        ]));
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("FLIPMEET_JWT_SECRET", "s3cret"),
            ("FLIPMEET_ADDRESS", "0.0.0.0:9090"),
            ("FLIPMEET_BASE_PATH", "FlipMeet"),
            ("FLIPMEET_MAX_BODY_SIZE", "2048"),
            ("FLIPMEET_STRICT_ROUTING", "true"),
            ("FLIPMEET_DATABASE_URL", "sqlite://flipmeet.db"),
            ("FLIPMEET_TOKEN_TTL_SECS", "60"),
        ]))
        .unwrap();

        assert_eq!(config.server.address.port(), 9090);
        assert_eq!(config.server.base_path, "/FlipMeet/");
        assert_eq!(config.server.max_body_size, 2048);
        assert!(config.server.strict_routing);
        assert_eq!(config.database.url, "sqlite://flipmeet.db");
        assert_eq!(config.auth.token_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_empty_secret_rejected() {
        let result = AppConfig::from_lookup(lookup(&[]));
        assert!(matches!(result, Err(Error::Configuration { .. })));

        let result = AppConfig::from_lookup(lookup(&[("FLIPMEET_JWT_SECRET", "  ")]));
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_unparseable_value_rejected() {
        let result = AppConfig::from_lookup(lookup(&[
            ("FLIPMEET_JWT_SECRET", "s3cret"),
            ("FLIPMEET_MAX_BODY_SIZE", "lots"),
        ]));
        assert!(matches!(result, Err(Error::Configuration { .. })));

        let result = AppConfig::from_lookup(lookup(&[
            ("FLIPMEET_JWT_SECRET", "s3cret"),
            ("FLIPMEET_STRICT_ROUTING", "maybe"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_normalize_base_path() {
        assert_eq!(normalize_base_path(""), "/");
        assert_eq!(normalize_base_path("/"), "/");
        assert_eq!(normalize_base_path("/FlipMeet"), "/FlipMeet/");
    }
}
