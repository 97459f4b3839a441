//! User operations

use chrono::Utc;
use sqlx::{Row, Sqlite};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{NewUser, UpdateUser, User};
use crate::repository::Database;
use crate::utils::normalize_email;

/// Expands to the user SELECT (role joined) followed by the given clause.
macro_rules! select_user {
    ($tail:literal) => {
        concat!(
            r#"
            SELECT u.id, u.uuid, u.email, u.username, u.password_hash,
                   u.first_name, u.middle_name, u.last_name,
                   u.phone_number, u.phone_number2, u.is_active,
                   u.created_at, u.updated_at,
                   r.id AS role_id, r.role_name, r.description AS role_description
            FROM users u
            JOIN roles r ON r.id = u.role_id
            "#,
            $tail
        )
    };
}

/// Load a user by id on any executor (pool or open transaction)
async fn fetch_user<'e, E>(executor: E, id: i64) -> Result<Option<User>, DbError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(select_user!("WHERE u.id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await?;

    result.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
}

/// Map a failed write on the users table to a caller-facing error
fn user_write_error(err: sqlx::Error) -> DbError {
    if let sqlx::Error::Database(db_err) = &err {
        let message = db_err.message();
        if db_err.is_unique_violation() {
            if message.contains("users.email") {
                return DbError::Conflict("Email already registered".to_string());
            }
            if message.contains("users.username") {
                return DbError::Conflict("Username already taken".to_string());
            }
        }
        if db_err.is_foreign_key_violation() {
            return DbError::InvalidReference("Role does not exist".to_string());
        }
    }
    DbError::from_write(err, "User")
}

impl Database {
    // ==================== User Operations ====================

    /// Insert a new user
    ///
    /// Callers are expected to pre-check `email_exists` / `username_exists`
    /// for a friendly message; the UNIQUE constraints stay authoritative and
    /// a lost race surfaces as `DbError::Conflict`.
    pub async fn insert_user(&self, user: NewUser) -> Result<User, DbError> {
        let now = Utc::now();
        let uuid = Uuid::new_v4().to_string();
        let email = normalize_email(&user.email);

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (uuid, email, username, password_hash, first_name, middle_name,
                               last_name, phone_number, phone_number2, is_active, role_id,
                               created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&uuid)
        .bind(&email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.middle_name)
        .bind(&user.last_name)
        .bind(&user.phone_number)
        .bind(&user.phone_number2)
        .bind(user.is_active)
        .bind(user.role_id)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .fetch_one(&mut *tx)
        .await
        .map_err(user_write_error)?;

        let id: i64 = result.get("id");

        let created = fetch_user(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("User: {}", id)))?;

        tx.commit().await?;

        debug!("Inserted user {} ({})", created.username, created.id);
        Ok(created)
    }

    /// Get a user by ID
    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, DbError> {
        fetch_user(&self.pool, id).await
    }

    /// Get a user by email (case-insensitive)
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let result = sqlx::query(select_user!("WHERE u.email = ?"))
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Get a user by username (case-insensitive)
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        let result = sqlx::query(select_user!("WHERE u.username = ?"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Check if an email is already registered
    pub async fn email_exists(&self, email: &str) -> Result<bool, DbError> {
        let result = sqlx::query("SELECT id FROM users WHERE email = ?")
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;
        Ok(result.is_some())
    }

    /// Check if a username is already taken
    pub async fn username_exists(&self, username: &str) -> Result<bool, DbError> {
        let result = sqlx::query("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(result.is_some())
    }

    /// List users ordered by id
    pub async fn list_users(&self, skip: i64, limit: i64) -> Result<Vec<User>, DbError> {
        let rows = sqlx::query(select_user!("ORDER BY u.id LIMIT ? OFFSET ?"))
            .bind(limit)
            .bind(skip)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| User::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Apply a partial update
    ///
    /// Returns `Ok(None)` when no user has the given id. The whole update runs
    /// in one transaction, so a constraint failure leaves the row untouched.
    pub async fn update_user(&self, id: i64, update: UpdateUser) -> Result<Option<User>, DbError> {
        if update.is_empty() {
            return self.get_user_by_id(id).await;
        }

        let now = Utc::now();

        // Build dynamic update query
        let mut updates = vec!["updated_at = ?"];

        if update.email.is_some() {
            updates.push("email = ?");
        }
        if update.username.is_some() {
            updates.push("username = ?");
        }
        if update.password_hash.is_some() {
            updates.push("password_hash = ?");
        }
        if update.first_name.is_some() {
            updates.push("first_name = ?");
        }
        if update.middle_name.is_some() {
            updates.push("middle_name = ?");
        }
        if update.last_name.is_some() {
            updates.push("last_name = ?");
        }
        if update.phone_number.is_some() {
            updates.push("phone_number = ?");
        }
        if update.phone_number2.is_some() {
            updates.push("phone_number2 = ?");
        }
        if update.role_id.is_some() {
            updates.push("role_id = ?");
        }
        if update.is_active.is_some() {
            updates.push("is_active = ?");
        }

        let sql = format!("UPDATE users SET {} WHERE id = ?", updates.join(", "));
        let mut query = sqlx::query(&sql);

        // Bind updated_at first
        query = query.bind(now.to_rfc3339());

        // Bind optional fields in the same order as updates
        if let Some(ref v) = update.email {
            query = query.bind(normalize_email(v));
        }
        if let Some(ref v) = update.username {
            query = query.bind(v.clone());
        }
        if let Some(ref v) = update.password_hash {
            query = query.bind(v.clone());
        }
        if let Some(ref v) = update.first_name {
            query = query.bind(v.clone());
        }
        if let Some(ref v) = update.middle_name {
            query = query.bind(v.clone());
        }
        if let Some(ref v) = update.last_name {
            query = query.bind(v.clone());
        }
        if let Some(ref v) = update.phone_number {
            query = query.bind(v.clone());
        }
        if let Some(ref v) = update.phone_number2 {
            query = query.bind(v.clone());
        }
        if let Some(v) = update.role_id {
            query = query.bind(v);
        }
        if let Some(v) = update.is_active {
            query = query.bind(v);
        }

        // Bind the id
        query = query.bind(id);

        let mut tx = self.pool.begin().await?;

        let result = query.execute(&mut *tx).await.map_err(user_write_error)?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let updated = fetch_user(&mut *tx, id).await?;
        tx.commit().await?;

        debug!("Updated user {}", id);
        Ok(updated)
    }

    /// Delete a user
    pub async fn delete_user(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count all users
    pub async fn count_users(&self) -> Result<i64, DbError> {
        let result = sqlx::query("SELECT COUNT(*) as count FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(result.get("count"))
    }

    /// Check if any active user holds the admin role
    pub async fn has_admin(&self) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            SELECT COUNT(*) as count
            FROM users u
            JOIN roles r ON r.id = u.role_id
            WHERE r.role_name = 'admin' AND u.is_active = 1
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        let count: i64 = result.get("count");
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ADMIN_ROLE_ID, DEFAULT_ROLE_ID};

    fn new_user(email: &str, username: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            username: username.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            first_name: "Test".to_string(),
            middle_name: None,
            last_name: "User".to_string(),
            phone_number: "01234567890".to_string(),
            phone_number2: None,
            role_id: DEFAULT_ROLE_ID,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = Database::in_memory().await.unwrap();

        let user = db.insert_user(new_user("Alice@Example.com", "alice")).await.unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.role.role_name, "user");
        assert!(user.is_active);
        assert!(Uuid::parse_str(&user.uuid).is_ok());

        let by_id = db.get_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");

        let by_email = db.get_user_by_email("ALICE@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);

        let by_username = db.get_user_by_username("Alice").await.unwrap().unwrap();
        assert_eq!(by_username.id, user.id);

        assert!(db.get_user_by_id(user.id + 1).await.unwrap().is_none());
        assert!(db.get_user_by_email("bob@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exists_checks_are_case_insensitive() {
        let db = Database::in_memory().await.unwrap();
        db.insert_user(new_user("a@x.com", "alice")).await.unwrap();

        assert!(db.email_exists("A@X.COM").await.unwrap());
        assert!(db.username_exists("ALICE").await.unwrap());
        assert!(!db.email_exists("b@x.com").await.unwrap());
        assert!(!db.username_exists("bob").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_conflict() {
        let db = Database::in_memory().await.unwrap();
        db.insert_user(new_user("a@x.com", "alice")).await.unwrap();

        let err = db.insert_user(new_user("A@x.com", "alice2")).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(ref m) if m == "Email already registered"));

        let err = db.insert_user(new_user("b@x.com", "ALICE")).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(ref m) if m == "Username already taken"));

        assert_eq!(db.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_with_unknown_role_is_rejected() {
        let db = Database::in_memory().await.unwrap();

        let mut user = new_user("a@x.com", "alice");
        user.role_id = 42;
        let err = db.insert_user(user).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidReference(_)));
        assert_eq!(db.count_users().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_keep_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("race.db").display());
        let db = Database::new(&url).await.unwrap();

        let attempts = (0..8).map(|i| {
            let db = db.clone();
            async move { db.insert_user(new_user("race@x.com", &format!("racer{}", i))).await }
        });
        let results = futures::future::join_all(attempts).await;

        let created = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(e) if e.is_conflict()))
            .count();

        assert_eq!(created, 1);
        assert_eq!(conflicts, 7);
        assert_eq!(db.count_users().await.unwrap(), 1);
        db.close().await;
    }

    #[tokio::test]
    async fn test_partial_update() {
        let db = Database::in_memory().await.unwrap();
        let mut seed = new_user("a@x.com", "alice");
        seed.middle_name = Some("Marie".to_string());
        let user = db.insert_user(seed).await.unwrap();

        let updated = db
            .update_user(
                user.id,
                UpdateUser {
                    first_name: Some("Alicia".to_string()),
                    middle_name: Some(None),
                    email: Some("NEW@x.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.first_name, "Alicia");
        assert_eq!(updated.middle_name, None);
        assert_eq!(updated.email, "new@x.com");
        assert_eq!(updated.last_name, "User");
        assert_eq!(updated.uuid, user.uuid);
        assert!(updated.updated_at >= user.updated_at);
    }

    #[tokio::test]
    async fn test_update_replaces_password_hash_and_role() {
        let db = Database::in_memory().await.unwrap();
        let user = db.insert_user(new_user("a@x.com", "alice")).await.unwrap();

        let updated = db
            .update_user(
                user.id,
                UpdateUser {
                    password_hash: Some("$argon2id$other".to_string()),
                    role_id: Some(ADMIN_ROLE_ID),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.password_hash, "$argon2id$other");
        assert!(updated.is_admin());
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let db = Database::in_memory().await.unwrap();

        let result = db
            .update_user(
                99,
                UpdateUser {
                    first_name: Some("Ghost".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_update_conflict_rolls_back() {
        let db = Database::in_memory().await.unwrap();
        db.insert_user(new_user("a@x.com", "alice")).await.unwrap();
        let bob = db.insert_user(new_user("b@x.com", "bob")).await.unwrap();

        let err = db
            .update_user(
                bob.id,
                UpdateUser {
                    first_name: Some("Robert".to_string()),
                    username: Some("alice".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let bob = db.get_user_by_id(bob.id).await.unwrap().unwrap();
        assert_eq!(bob.first_name, "Test");
        assert_eq!(bob.username, "bob");
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let db = Database::in_memory().await.unwrap();
        for i in 0..5 {
            db.insert_user(new_user(&format!("u{}@x.com", i), &format!("user{}", i)))
                .await
                .unwrap();
        }

        let page = db.list_users(1, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].username, "user1");
        assert_eq!(page[1].username, "user2");

        let first_id = db.list_users(0, 1).await.unwrap()[0].id;
        assert!(db.delete_user(first_id).await.unwrap());
        assert!(!db.delete_user(first_id).await.unwrap());
        assert_eq!(db.count_users().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_has_admin() {
        let db = Database::in_memory().await.unwrap();
        assert!(!db.has_admin().await.unwrap());

        let mut admin = new_user("root@x.com", "root");
        admin.role_id = ADMIN_ROLE_ID;
        db.insert_user(admin).await.unwrap();

        assert!(db.has_admin().await.unwrap());
    }
}
