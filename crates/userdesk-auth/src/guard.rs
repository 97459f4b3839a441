//! Request authorization
//!
//! Resolves a bearer token to a live account and checks role and ownership.

use std::sync::Arc;

use tracing::debug;
use userdesk_db::{Database, User};

use crate::error::AuthError;
use crate::jwt::{TokenManager, TokenType};

/// Extract the token from an `Authorization` header value
///
/// The scheme name is matched case-insensitively.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingAuthHeader)?;
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or(AuthError::InvalidAuthHeader)?;

    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token)
}

#[derive(Clone)]
pub struct AuthGuard {
    db: Database,
    tokens: Arc<TokenManager>,
}

impl AuthGuard {
    pub fn new(db: Database, tokens: Arc<TokenManager>) -> Self {
        Self { db, tokens }
    }

    /// Resolve the caller behind an `Authorization` header
    ///
    /// The account is re-read on every call, so deactivation and role
    /// changes take effect on the next request.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<User, AuthError> {
        let token = bearer_token(header)?;
        let claims = self.tokens.decode(token, TokenType::Access)?;

        let user = self
            .db
            .get_user_by_id(claims.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !user.is_active {
            return Err(AuthError::InactiveUser);
        }

        debug!("Authenticated user: {} ({})", user.username, user.role.role_name);
        Ok(user)
    }

    /// Resolve the caller and require an administrative role
    pub async fn authenticate_admin(&self, header: Option<&str>) -> Result<User, AuthError> {
        let user = self.authenticate(header).await?;
        ensure_admin(&user)?;
        Ok(user)
    }
}

pub fn ensure_admin(user: &User) -> Result<(), AuthError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AuthError::InsufficientPrivileges)
    }
}

/// Allow the account itself or an administrator
pub fn ensure_owner_or_admin(user: &User, target_id: i64) -> Result<(), AuthError> {
    if user.id == target_id || user.is_admin() {
        Ok(())
    } else {
        Err(AuthError::NotOwner)
    }
}
