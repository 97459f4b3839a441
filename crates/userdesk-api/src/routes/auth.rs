//! Authentication extractors and routes

use axum::{
    Json, Router,
    extract::{FromRef, FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts},
    routing::post,
};
use userdesk_auth::{TokenPair, ensure_admin};
use userdesk_db::User;

use crate::error::ApiError;
use crate::state::AppState;

use super::extract::ApiJson;
use super::types::{LoginRequest, RefreshRequest};

// ==================== Auth Extractors ====================

/// Extractor for an authenticated, active user
pub struct RequireAuth(pub User);

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let user = app_state.guard.authenticate(auth_header).await?;
        Ok(RequireAuth(user))
    }
}

/// Extractor for an authenticated administrator
pub struct RequireAdmin(pub User);

impl<S> FromRequestParts<S> for RequireAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        ensure_admin(&user)?;
        Ok(RequireAdmin(user))
    }
}

// ==================== Auth Routes ====================

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let pair = state
        .authenticator
        .login(&request.email, &request.password)
        .await?;
    Ok(Json(pair))
}

/// POST /api/auth/refresh
async fn refresh(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let pair = state.authenticator.refresh(&request.refresh_token).await?;
    Ok(Json(pair))
}

/// Create auth routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}
