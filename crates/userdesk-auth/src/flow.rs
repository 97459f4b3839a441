//! Login and token refresh

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use userdesk_db::Database;

use crate::error::AuthError;
use crate::jwt::{TokenManager, TokenType};
use crate::password::{verify_dummy, verify_password};

/// Access/refresh token pair handed to the client
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

/// Authentication flow: credential check and token issuance
///
/// Neither operation writes to the database.
#[derive(Clone)]
pub struct Authenticator {
    db: Database,
    tokens: Arc<TokenManager>,
}

impl Authenticator {
    pub fn new(db: Database, tokens: Arc<TokenManager>) -> Self {
        Self { db, tokens }
    }

    /// Exchange email and password for a token pair
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        debug!("Login attempt for {}", email);

        let user = self.db.get_user_by_email(email).await?;

        // Unknown email and wrong password must look identical to the caller,
        // including in how long they take.
        let password_valid = match &user {
            Some(u) => verify_password(password, &u.password_hash),
            None => verify_dummy(password),
        };

        let user = match (user, password_valid) {
            (Some(u), true) => u,
            _ => {
                metrics::counter!("userdesk_logins_total", "outcome" => "rejected").increment(1);
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !user.is_active {
            metrics::counter!("userdesk_logins_total", "outcome" => "inactive").increment(1);
            return Err(AuthError::InactiveUser);
        }

        let pair = self.issue_pair(user.id, &user.username)?;

        metrics::counter!("userdesk_logins_total", "outcome" => "success").increment(1);
        info!("User {} logged in", user.username);
        Ok(pair)
    }

    /// Exchange a refresh token for a fresh token pair
    ///
    /// Both tokens are rotated; the presented refresh token is not reused.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self
            .tokens
            .decode(refresh_token, TokenType::Refresh)
            .map_err(|e| {
                debug!("Refresh rejected: {}", e);
                metrics::counter!("userdesk_token_refresh_total", "outcome" => "rejected")
                    .increment(1);
                AuthError::InvalidRefreshToken
            })?;

        let user = match self.db.get_user_by_id(claims.user_id).await? {
            Some(u) if u.is_active => u,
            _ => {
                metrics::counter!("userdesk_token_refresh_total", "outcome" => "rejected")
                    .increment(1);
                return Err(AuthError::UserNotFoundOrInactive);
            }
        };

        let pair = self.issue_pair(user.id, &user.username)?;

        metrics::counter!("userdesk_token_refresh_total", "outcome" => "success").increment(1);
        debug!("Refreshed tokens for user {}", user.username);
        Ok(pair)
    }

    fn issue_pair(&self, user_id: i64, username: &str) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.tokens.issue_access(user_id, username)?,
            refresh_token: self.tokens.issue_refresh(user_id)?,
            token_type: "bearer".to_string(),
        })
    }
}
