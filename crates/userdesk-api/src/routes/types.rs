//! Request/Response DTOs

use serde::{Deserialize, Deserializer, Serialize};
use userdesk_db::{Role, User};

// ==================== Auth Types ====================

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Refresh request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

// ==================== User Types ====================

/// Registration request
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub phone_number: String,
    #[serde(default)]
    pub phone_number2: Option<String>,
    #[serde(default)]
    pub role_id: Option<i64>,
}

/// Partial profile update
///
/// `middle_name` and `phone_number2` distinguish an absent key (leave as is)
/// from an explicit `null` (clear the value).
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub middle_name: Option<Option<String>>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone_number2: Option<Option<String>>,
    pub role_id: Option<i64>,
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    /// Whether the request touches fields only an administrator may change
    pub fn changes_privileges(&self) -> bool {
        self.role_id.is_some() || self.is_active.is_some()
    }
}

fn nullable<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// `skip`/`limit` query for the user list
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub id: i64,
    pub role_name: String,
    pub description: Option<String>,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        Self {
            id: role.id,
            role_name: role.role_name,
            description: role.description,
        }
    }
}

/// User response (without password)
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub uuid: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub phone_number: String,
    pub phone_number2: Option<String>,
    pub is_active: bool,
    pub role: RoleResponse,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            uuid: user.uuid,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            middle_name: user.middle_name,
            last_name: user.last_name,
            phone_number: user.phone_number,
            phone_number2: user.phone_number2,
            is_active: user.is_active,
            role: user.role.into(),
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_distinguishes_null_from_absent() {
        let absent: UpdateUserRequest = serde_json::from_str(r#"{"first_name":"Bob"}"#).unwrap();
        assert_eq!(absent.middle_name, None);
        assert_eq!(absent.first_name.as_deref(), Some("Bob"));

        let cleared: UpdateUserRequest =
            serde_json::from_str(r#"{"middle_name":null,"phone_number2":"01234567890"}"#).unwrap();
        assert_eq!(cleared.middle_name, Some(None));
        assert_eq!(cleared.phone_number2, Some(Some("01234567890".to_string())));
    }

    #[test]
    fn test_privilege_fields() {
        let request: UpdateUserRequest = serde_json::from_str(r#"{"is_active":false}"#).unwrap();
        assert!(request.changes_privileges());
        assert!(!UpdateUserRequest::default().changes_privileges());
    }
}
