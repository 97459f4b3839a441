//! Input validation for user payloads

use crate::error::ApiError;

use super::types::{CreateUserRequest, UpdateUserRequest};

const MIN_USERNAME_LENGTH: usize = 3;
/// Registration is stricter than later renames
const MAX_USERNAME_LENGTH_CREATE: usize = 50;
const MAX_USERNAME_LENGTH_UPDATE: usize = 100;
const MIN_NAME_LENGTH: usize = 2;
const MAX_NAME_LENGTH: usize = 100;
const MIN_PHONE_LENGTH: usize = 11;
const MAX_PHONE_LENGTH: usize = 20;
const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 100;

fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), ApiError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ApiError::BadRequest(format!(
            "{} must be between {} and {} characters",
            field, min, max
        )));
    }
    Ok(())
}

/// Validate email shape: one `@`, a local part, and a dotted domain
pub fn validate_email(email: &str) -> Result<(), ApiError> {
    let invalid = || ApiError::BadRequest("Invalid email address".to_string());

    let email = email.trim();
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;

    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(())
}

fn validate_username(username: &str, max: usize) -> Result<(), ApiError> {
    check_length("Username", username, MIN_USERNAME_LENGTH, max)?;
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(ApiError::BadRequest(
            "Username can only contain letters, digits, underscores, hyphens and dots".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    check_length("Password", password, MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH)
}

fn validate_name(field: &str, value: &str) -> Result<(), ApiError> {
    check_length(field, value, MIN_NAME_LENGTH, MAX_NAME_LENGTH)
}

fn validate_middle_name(value: &str) -> Result<(), ApiError> {
    check_length("Middle name", value, 0, MAX_NAME_LENGTH)
}

fn validate_phone(field: &str, value: &str) -> Result<(), ApiError> {
    check_length(field, value, MIN_PHONE_LENGTH, MAX_PHONE_LENGTH)
}

pub fn validate_create(request: &CreateUserRequest) -> Result<(), ApiError> {
    validate_email(&request.email)?;
    validate_username(&request.username, MAX_USERNAME_LENGTH_CREATE)?;
    validate_password(&request.password)?;
    validate_name("First name", &request.first_name)?;
    validate_name("Last name", &request.last_name)?;
    if let Some(middle) = &request.middle_name {
        validate_middle_name(middle)?;
    }
    validate_phone("Phone number", &request.phone_number)?;
    if let Some(phone) = &request.phone_number2 {
        validate_phone("Secondary phone number", phone)?;
    }
    Ok(())
}

pub fn validate_update(request: &UpdateUserRequest) -> Result<(), ApiError> {
    if let Some(email) = &request.email {
        validate_email(email)?;
    }
    if let Some(username) = &request.username {
        validate_username(username, MAX_USERNAME_LENGTH_UPDATE)?;
    }
    if let Some(password) = &request.password {
        validate_password(password)?;
    }
    if let Some(first) = &request.first_name {
        validate_name("First name", first)?;
    }
    if let Some(last) = &request.last_name {
        validate_name("Last name", last)?;
    }
    if let Some(Some(middle)) = &request.middle_name {
        validate_middle_name(middle)?;
    }
    if let Some(phone) = &request.phone_number {
        validate_phone("Phone number", phone)?;
    }
    if let Some(Some(phone)) = &request.phone_number2 {
        validate_phone("Secondary phone number", phone)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request() -> CreateUserRequest {
        CreateUserRequest {
            email: "alice@example.com".to_string(),
            username: "alice.smith".to_string(),
            password: "password123".to_string(),
            first_name: "Alice".to_string(),
            middle_name: None,
            last_name: "Smith".to_string(),
            phone_number: "01234567890".to_string(),
            phone_number2: None,
            role_id: None,
        }
    }

    #[test]
    fn test_email() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email(" A@Example.co.uk ").is_ok());

        for bad in ["", "ax.com", "@x.com", "a@x", "a@@x.com", "a@x..com", "a b@x.com"] {
            assert!(validate_email(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("abc", MAX_USERNAME_LENGTH_CREATE).is_ok());
        assert!(validate_username("a-b_c.d", MAX_USERNAME_LENGTH_CREATE).is_ok());
        assert!(validate_username("ab", MAX_USERNAME_LENGTH_CREATE).is_err());
        assert!(validate_username("bad name", MAX_USERNAME_LENGTH_CREATE).is_err());

        let long = "a".repeat(60);
        assert!(validate_username(&long, MAX_USERNAME_LENGTH_CREATE).is_err());
        assert!(validate_username(&long, MAX_USERNAME_LENGTH_UPDATE).is_ok());
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("exactly8").is_ok());
        assert!(validate_password(&"p".repeat(101)).is_err());
    }

    #[test]
    fn test_create_request() {
        assert!(validate_create(&create_request()).is_ok());

        let mut request = create_request();
        request.phone_number = "12345".to_string();
        assert!(validate_create(&request).is_err());

        let mut request = create_request();
        request.first_name = "A".to_string();
        assert!(validate_create(&request).is_err());

        let mut request = create_request();
        request.phone_number2 = Some("0987654321012".to_string());
        assert!(validate_create(&request).is_ok());
    }

    #[test]
    fn test_update_request() {
        assert!(validate_update(&UpdateUserRequest::default()).is_ok());

        let request = UpdateUserRequest {
            middle_name: Some(None),
            phone_number2: Some(None),
            ..Default::default()
        };
        assert!(validate_update(&request).is_ok());

        let request = UpdateUserRequest {
            email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        assert!(validate_update(&request).is_err());
    }
}
