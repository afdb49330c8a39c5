//! Token issuance, password hashing and the route guard.

mod middleware;
pub mod password;
mod token;

pub use middleware::{AuthMiddleware, TOKEN_HEADER};
pub use password::{hash_password, verify_password, PasswordHasher};
pub use token::{Claims, TokenService};
