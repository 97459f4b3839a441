//! JWT token management

use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AuthError;

/// Default lifetime of an access token
pub const DEFAULT_ACCESS_TTL_MINUTES: i64 = 30;
/// Default lifetime of a refresh token
pub const DEFAULT_REFRESH_TTL_DAYS: i64 = 7;

/// Token type discriminator carried in the `type` claim
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub user_id: i64,
    /// Username, only present on access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// Issues and validates HS256-signed access and refresh tokens
#[derive(Clone)]
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenManager {
    /// Create a new token manager
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Create a token manager with the default lifetimes
    pub fn with_default_ttls(secret: &str) -> Self {
        Self::new(
            secret,
            Duration::minutes(DEFAULT_ACCESS_TTL_MINUTES),
            Duration::days(DEFAULT_REFRESH_TTL_DAYS),
        )
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Sign a token of the given type that expires `ttl` from now
    pub fn issue(
        &self,
        user_id: i64,
        username: Option<&str>,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + ttl;

        let claims = Claims {
            user_id,
            username: username.map(str::to_string),
            token_type,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        debug!("Issuing {} token for user {}", token_type, user_id);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(AuthError::Jwt)
    }

    /// Issue an access token carrying the username
    pub fn issue_access(&self, user_id: i64, username: &str) -> Result<String, AuthError> {
        self.issue(user_id, Some(username), TokenType::Access, self.access_ttl)
    }

    /// Issue a refresh token
    pub fn issue_refresh(&self, user_id: i64) -> Result<String, AuthError> {
        self.issue(user_id, None, TokenType::Refresh, self.refresh_ttl)
    }

    /// Validate a token and return its claims
    ///
    /// Fails when the signature or structure is bad, when the token is past
    /// `exp` (no leeway), or when its type is not `expected`.
    pub fn decode(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            let err = match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::InvalidToken,
            };
            debug!("Rejected {} token: {} ({})", expected, err, e);
            err
        })?;

        let claims = token_data.claims;
        if claims.token_type != expected {
            debug!("Rejected token: expected {}, got {}", expected, claims.token_type);
            return Err(AuthError::WrongTokenType {
                expected,
                actual: claims.token_type,
            });
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> TokenManager {
        TokenManager::with_default_ttls("test-secret-key")
    }

    #[test]
    fn test_access_token_round_trip() {
        let manager = manager();

        let token = manager.issue_access(1, "testuser").unwrap();
        let claims = manager.decode(&token, TokenType::Access).unwrap();

        assert_eq!(claims.user_id, 1);
        assert_eq!(claims.username.as_deref(), Some("testuser"));
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp - claims.iat, DEFAULT_ACCESS_TTL_MINUTES * 60);
    }

    #[test]
    fn test_refresh_token_has_no_username() {
        let manager = manager();

        let token = manager.issue_refresh(42).unwrap();
        let claims = manager.decode(&token, TokenType::Refresh).unwrap();

        assert_eq!(claims.user_id, 42);
        assert!(claims.username.is_none());
        assert_eq!(claims.exp - claims.iat, DEFAULT_REFRESH_TTL_DAYS * 24 * 3600);
    }

    #[test]
    fn test_type_is_checked() {
        let manager = manager();

        let access = manager.issue_access(1, "testuser").unwrap();
        let refresh = manager.issue_refresh(1).unwrap();

        assert!(matches!(
            manager.decode(&access, TokenType::Refresh),
            Err(AuthError::WrongTokenType { .. })
        ));
        assert!(matches!(
            manager.decode(&refresh, TokenType::Access),
            Err(AuthError::WrongTokenType { .. })
        ));
    }

    #[test]
    fn test_expired_token() {
        let manager = manager();

        let token = manager
            .issue(1, None, TokenType::Refresh, Duration::seconds(-5))
            .unwrap();
        assert!(matches!(
            manager.decode(&token, TokenType::Refresh),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_wrong_secret() {
        let token = manager().issue_access(1, "testuser").unwrap();
        let other = TokenManager::with_default_ttls("another-secret");

        assert!(matches!(
            other.decode(&token, TokenType::Access),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_invalid_token() {
        let manager = manager();

        let result = manager.decode("invalid-token", TokenType::Access);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_token_without_subject_is_rejected() {
        let manager = manager();
        let exp = (Utc::now() + Duration::minutes(5)).timestamp();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({ "type": "refresh", "exp": exp, "iat": exp - 300 }),
            &EncodingKey::from_secret(b"test-secret-key"),
        )
        .unwrap();

        assert!(matches!(
            manager.decode(&token, TokenType::Refresh),
            Err(AuthError::InvalidToken)
        ));
    }
}
