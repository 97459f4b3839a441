//! Database models

use crate::utils::parse_datetime_or_now;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;

/// Id of the role seeded for ordinary accounts
pub const DEFAULT_ROLE_ID: i64 = 1;
/// Id of the role seeded for administrators
pub const ADMIN_ROLE_ID: i64 = 2;

/// Capability class of a role
///
/// Authorization decisions are made on this enum rather than on the raw
/// role name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleKind {
    Admin,
    User,
    /// A role managed outside the seeded set; carries no privileges.
    Other,
}

impl RoleKind {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "admin" => RoleKind::Admin,
            "user" => RoleKind::User,
            _ => RoleKind::Other,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, RoleKind::Admin)
    }
}

/// Role model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    pub id: i64,
    pub role_name: String,
    pub description: Option<String>,
}

impl Role {
    pub fn kind(&self) -> RoleKind {
        RoleKind::from_name(&self.role_name)
    }
}

/// User model
///
/// The role is always loaded together with the user row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub uuid: String,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub phone_number: String,
    pub phone_number2: Option<String>,
    pub is_active: bool,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.kind().is_admin()
    }
}

/// New user (for insertion)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub phone_number: String,
    pub phone_number2: Option<String>,
    pub role_id: i64,
    pub is_active: bool,
}

/// Update user (for partial updates)
///
/// `None` leaves a column untouched. For nullable columns the inner option
/// distinguishes "set to NULL" from "set to a value".
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<Option<String>>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub phone_number2: Option<Option<String>>,
    pub role_id: Option<i64>,
    pub is_active: Option<bool>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.username.is_none()
            && self.password_hash.is_none()
            && self.first_name.is_none()
            && self.middle_name.is_none()
            && self.last_name.is_none()
            && self.phone_number.is_none()
            && self.phone_number2.is_none()
            && self.role_id.is_none()
            && self.is_active.is_none()
    }
}

// ==================== TryFrom Implementations ====================

impl TryFrom<&sqlx::sqlite::SqliteRow> for Role {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(Role {
            id: row.try_get("id")?,
            role_name: row.try_get("role_name")?,
            description: row.try_get("description")?,
        })
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for User {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.try_get("id")?,
            uuid: row.try_get("uuid")?,
            email: row.try_get("email")?,
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
            first_name: row.try_get("first_name")?,
            middle_name: row.try_get("middle_name")?,
            last_name: row.try_get("last_name")?,
            phone_number: row.try_get("phone_number")?,
            phone_number2: row.try_get("phone_number2")?,
            is_active: row.try_get("is_active")?,
            role: Role {
                id: row.try_get("role_id")?,
                role_name: row.try_get("role_name")?,
                description: row.try_get("role_description")?,
            },
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("updated_at")?),
        })
    }
}
