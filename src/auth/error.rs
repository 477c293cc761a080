// Authentication and authorization error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, error, warn};

/// Every failure the authentication core can produce.
///
/// Component operations return these typed variants; the HTTP layer maps each
/// to exactly one status code and a deliberately coarse client message.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    // Input shape errors
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid request payload: {0}")]
    InvalidPayload(String),

    // Credential and token errors
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("malformed authorization header")]
    MalformedAuthorizationHeader,
    #[error("token lookup failed: {0}")]
    TokenLookup(String),
    #[error("token expired or invalid")]
    InvalidOrExpiredToken,
    #[error("login required")]
    LoginRequired,

    #[error("username or email already exists")]
    Conflict,

    // Internal failures
    #[error("password hashing error: {0}")]
    PasswordHash(String),
    #[error("directory error: {0}")]
    Directory(String),
    /// The identity extractor ran on a route that never passed through
    /// the authentication middleware.
    #[error("no identity attached to request")]
    MissingIdentity,
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) | AuthError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::MalformedAuthorizationHeader
            | AuthError::TokenLookup(_)
            | AuthError::InvalidOrExpiredToken
            | AuthError::LoginRequired => StatusCode::UNAUTHORIZED,
            AuthError::Conflict => StatusCode::CONFLICT,
            AuthError::PasswordHash(_) | AuthError::Directory(_) | AuthError::MissingIdentity => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message that is safe to send to clients.
    ///
    /// Never reveals whether a username exists, whether a token existed or
    /// expired, or any internal detail.
    pub fn error_message(&self) -> String {
        match self {
            AuthError::Validation(msg) => msg.clone(),
            AuthError::InvalidPayload(_) => "invalid request payload".to_string(),
            AuthError::InvalidCredentials => "invalid credentials".to_string(),
            AuthError::MalformedAuthorizationHeader => "invalid authorization header".to_string(),
            AuthError::TokenLookup(_) => "invalid token".to_string(),
            AuthError::InvalidOrExpiredToken => "token expired or invalid".to_string(),
            AuthError::LoginRequired => "you must be logged in".to_string(),
            AuthError::Conflict => "username or email already exists".to_string(),
            AuthError::PasswordHash(_) | AuthError::Directory(_) | AuthError::MissingIdentity => {
                "internal server error".to_string()
            }
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Directory(err.to_string())
    }
}

/// Order in which registration fields are checked; the first failing one is reported
const FIELD_ORDER: [&str; 3] = ["username", "email", "password"];

impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| {
            let rank = FIELD_ORDER.iter().position(|f| f == field).unwrap_or(FIELD_ORDER.len());
            (rank, *field)
        });

        let message = fields
            .into_iter()
            .flat_map(|(_, errs)| errs.iter())
            .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| "invalid input".to_string());

        AuthError::Validation(message)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            AuthError::Validation(_) | AuthError::InvalidPayload(_) => {
                debug!("Rejected request input: {}", self)
            }
            AuthError::Conflict => warn!("Registration conflict: {}", self),
            AuthError::InvalidCredentials
            | AuthError::MalformedAuthorizationHeader
            | AuthError::TokenLookup(_)
            | AuthError::InvalidOrExpiredToken
            | AuthError::LoginRequired => debug!("Auth rejection: {}", self),
            AuthError::PasswordHash(_) | AuthError::Directory(_) | AuthError::MissingIdentity => {
                error!("Internal auth failure: {}", self)
            }
        }

        let body = Json(json!({
            "error": self.error_message(),
        }));

        (self.status_code(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_errors_hide_details() {
        let err = AuthError::Directory("connection refused on 10.0.0.4".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_message(), "internal server error");

        let err = AuthError::TokenLookup("relation tokens does not exist".to_string());
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.error_message(), "invalid token");
    }

    #[test]
    fn test_validation_reports_fields_in_form_order() {
        use validator::ValidationError;

        let mut errors = validator::ValidationErrors::new();
        let mut email = ValidationError::new("email");
        email.message = Some("invalid email format".into());
        let mut username = ValidationError::new("required");
        username.message = Some("username is required".into());
        errors.add("email", email);
        errors.add("username", username);

        let err: AuthError = errors.into();
        assert_eq!(err.error_message(), "username is required");
    }

    #[test]
    fn test_sqlx_errors_become_directory_errors() {
        let err: AuthError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AuthError::Directory(_)));
    }
}
