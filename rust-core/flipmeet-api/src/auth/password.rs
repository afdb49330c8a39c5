//! bcrypt password digests in the modular crypt format (`$2b$<cost>$...`).
//!
//! Digests written as `$2y$` by other bcrypt implementations verify too.
//! Hashing is CPU-bound, so the async entry points run it on the blocking
//! pool.

use flipmeet_core::{Error, Result};
use tracing::debug;

/// Lowest cost bcrypt accepts
pub const MIN_COST: u32 = 4;

/// Highest cost bcrypt accepts
pub const MAX_COST: u32 = 31;

/// Default work factor
pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

/// Hash a plain password with a fresh salt
///
/// # Errors
///
/// Returns `Error::Configuration` for a cost outside `MIN_COST..=MAX_COST`.
pub fn hash_password(plain: &str, cost: u32) -> Result<String> {
    bcrypt::hash(plain, cost)
        .map_err(|e| Error::configuration(format!("password hashing failed: {e}")))
}

/// Check a plain password against a stored digest
///
/// Malformed stored values never verify.
#[must_use]
pub fn verify_password(plain: &str, stored: &str) -> bool {
    bcrypt::verify(plain, stored).unwrap_or_else(|e| {
        debug!(error = %e, "Stored password digest rejected");
        false
    })
}

/// Password hashing with a fixed work factor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl PasswordHasher {
    /// Hasher with the given bcrypt cost
    #[must_use]
    pub const fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Configured work factor
    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }

    /// [`hash_password`] on the blocking pool
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for an invalid cost or a lost worker.
    pub async fn hash(&self, plain: String) -> Result<String> {
        let cost = self.cost;
        tokio::task::spawn_blocking(move || hash_password(&plain, cost))
            .await
            .map_err(|e| Error::configuration(format!("password worker failed: {e}")))?
    }

    /// [`verify_password`] on the blocking pool; a lost worker never verifies
    pub async fn verify(&self, plain: String, stored: String) -> bool {
        tokio::task::spawn_blocking(move || verify_password(&plain, &stored))
            .await
            .unwrap_or(false)
    }
}
