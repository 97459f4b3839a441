//! User management routes

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::get,
};
use tracing::{debug, info};
use userdesk_auth::{ensure_admin, ensure_owner_or_admin, hash_password};
use userdesk_db::{DEFAULT_ROLE_ID, NewUser, UpdateUser, normalize_email};

use crate::error::ApiError;
use crate::state::AppState;

use super::auth::{RequireAdmin, RequireAuth};
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::types::{CreateUserRequest, ListUsersQuery, UpdateUserRequest, UserResponse};
use super::validation::{validate_create, validate_update};

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

// ==================== User Routes ====================

/// POST /api/users
///
/// Open registration. Requesting a role other than the default one requires
/// an administrator's token.
async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_create(&request)?;

    let role_id = request.role_id.unwrap_or(DEFAULT_ROLE_ID);
    if role_id != DEFAULT_ROLE_ID {
        let auth_header = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok());
        state.guard.authenticate_admin(auth_header).await?;
    }

    debug!("Registering user: {}", request.username);

    if state.db.email_exists(&request.email).await? {
        return Err(ApiError::BadRequest("Email already registered".to_string()));
    }
    if state.db.username_exists(&request.username).await? {
        return Err(ApiError::BadRequest("Username already taken".to_string()));
    }

    let password_hash = hash_password(&request.password)?;

    // The unique constraints still decide a race between two registrations
    let user = state
        .db
        .insert_user(NewUser {
            email: request.email,
            username: request.username,
            password_hash,
            first_name: request.first_name,
            middle_name: request.middle_name,
            last_name: request.last_name,
            phone_number: request.phone_number,
            phone_number2: request.phone_number2,
            role_id,
            is_active: true,
        })
        .await?;

    metrics::counter!("userdesk_users_created_total").increment(1);
    info!("Created user: {} ({})", user.username, user.id);

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /api/users/me
async fn get_me(RequireAuth(user): RequireAuth) -> Json<UserResponse> {
    Json(user.into())
}

/// GET /api/users/{id}
async fn get_user(
    _auth: RequireAuth,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .db
        .get_user_by_id(id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(user.into()))
}

/// GET /api/users (Admin only)
async fn list_users(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListUsersQuery>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let skip = query.skip.unwrap_or(0);
    if skip < 0 {
        return Err(ApiError::BadRequest("skip must not be negative".to_string()));
    }

    let limit = query.limit.unwrap_or(state.pagination.default_page_size);
    if limit < 0 {
        return Err(ApiError::BadRequest("limit must not be negative".to_string()));
    }
    let limit = limit.min(state.pagination.max_page_size);

    let users = state.db.list_users(skip, limit).await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// PATCH /api/users/{id}
///
/// The account itself or an administrator; role and activation changes are
/// administrator-only.
async fn update_user(
    RequireAuth(actor): RequireAuth,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    ensure_owner_or_admin(&actor, id)?;
    if request.changes_privileges() {
        ensure_admin(&actor)?;
    }
    validate_update(&request)?;

    debug!("Updating user: {}", id);

    let current = state
        .db
        .get_user_by_id(id)
        .await?
        .ok_or_else(user_not_found)?;

    if let Some(email) = &request.email {
        if normalize_email(email) != current.email && state.db.email_exists(email).await? {
            return Err(ApiError::BadRequest("Email already registered".to_string()));
        }
    }
    if let Some(username) = &request.username {
        if !username.eq_ignore_ascii_case(&current.username)
            && state.db.username_exists(username).await?
        {
            return Err(ApiError::BadRequest("Username already taken".to_string()));
        }
    }

    let password_hash = match &request.password {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };

    let user = state
        .db
        .update_user(
            id,
            UpdateUser {
                email: request.email,
                username: request.username,
                password_hash,
                first_name: request.first_name,
                middle_name: request.middle_name,
                last_name: request.last_name,
                phone_number: request.phone_number,
                phone_number2: request.phone_number2,
                role_id: request.role_id,
                is_active: request.is_active,
            },
        )
        .await?
        .ok_or_else(user_not_found)?;

    info!("Updated user: {} by {}", user.username, actor.username);

    Ok(Json(user.into()))
}

/// DELETE /api/users/{id} (Admin only)
async fn delete_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    debug!("Deleting user: {}", id);

    if state.db.delete_user(id).await? {
        info!("Deleted user {} by {}", id, admin.username);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(user_not_found())
    }
}

/// Create user routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/me", get(get_me))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
}
