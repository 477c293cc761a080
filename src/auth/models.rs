// Authentication data models and DTOs

use std::{borrow::Cow, sync::OnceLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::auth::password::Password;

/// User identity record as held by the user directory
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: Password,
    pub bio: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user that has not been stored yet; the directory assigns id and timestamps
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: Password,
    pub bio: String,
}

/// Caller identity resolved by the authentication middleware.
///
/// `Anonymous` is the sentinel for "no authenticated caller" and carries no
/// database identity.
#[derive(Debug, Clone)]
pub enum Identity {
    Anonymous,
    User(User),
}

impl Identity {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Anonymous => None,
            Identity::User(user) => Some(user),
        }
    }
}

/// User response model (excludes the password hash)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "jdoe@example.com")]
    pub email: String,
    #[schema(example = "Marathon training, week 6")]
    pub bio: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            bio: user.bio,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Envelope for user payloads: `{"user": {...}}`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserEnvelope {
    pub user: UserResponse,
}

/// Registration request DTO
///
/// Validation here is a shape precondition only; uniqueness is decided by
/// the user directory.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(custom = "validate_username")]
    #[schema(example = "jdoe")]
    pub username: String,
    #[validate(custom = "validate_email")]
    #[schema(example = "jdoe@example.com")]
    pub email: String,
    #[validate(custom = "validate_password")]
    #[schema(example = "correct horse battery staple")]
    pub password: String,
    #[serde(default)]
    pub bio: String,
}

pub const MAX_USERNAME_LEN: usize = 50;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is a valid regex"))
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(field_error("required", "username is required"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(field_error("length", "username cannot be greater than 50 characters"));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(field_error("required", "email is required"));
    }
    if !email_regex().is_match(email) {
        return Err(field_error("email", "invalid email format"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(field_error("required", "password is required"));
    }
    Ok(())
}

/// Login request DTO
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "correct horse battery staple")]
    pub password: String,
}

/// Response for a freshly minted authentication token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub auth_token: String,
}
