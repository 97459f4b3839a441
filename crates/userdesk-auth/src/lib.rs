//! Userdesk authentication and authorization
//!
//! Password hashing, JWT access/refresh tokens, the login and refresh
//! flows, and the request guard that turns a bearer token into an account.

pub mod error;
pub mod flow;
pub mod guard;
pub mod jwt;
pub mod password;

pub use error::AuthError;
pub use flow::{Authenticator, TokenPair};
pub use guard::{AuthGuard, bearer_token, ensure_admin, ensure_owner_or_admin};
pub use jwt::{Claims, TokenManager, TokenType};
pub use password::{hash_password, verify_password};
