// HTTP handlers for authentication endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use tracing::debug;

use crate::auth::{
    error::AuthError,
    middleware::AuthenticatedUser,
    models::{LoginRequest, RegisterRequest, TokenResponse, UserEnvelope},
    service::AuthService,
};

/// Maps a JSON rejection to a 400. Only the status is kept: serde's error
/// text can echo body values, passwords included.
fn rejection_to_error(rejection: JsonRejection) -> AuthError {
    AuthError::InvalidPayload(format!("json rejection with status {}", rejection.status()))
}

/// Register a new user
/// POST /users
#[utoipa::path(
    post,
    path = "/users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = UserEnvelope),
        (status = 400, description = "Invalid input", body = String, example = json!({"error": "invalid email format"})),
        (status = 409, description = "Duplicate username or email", body = String, example = json!({"error": "username or email already exists"})),
        (status = 500, description = "Internal server error", body = String, example = json!({"error": "internal server error"}))
    ),
    tag = "users"
)]
pub async fn register_handler(
    State(auth): State<AuthService>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserEnvelope>), AuthError> {
    let Json(request) = payload.map_err(rejection_to_error)?;
    debug!("Registering user: {}", request.username);

    let user = auth.register_user(request).await?;

    Ok((StatusCode::CREATED, Json(UserEnvelope { user: user.into() })))
}

/// Exchange credentials for an authentication token
/// POST /tokens/authentication
#[utoipa::path(
    post,
    path = "/tokens/authentication",
    request_body = LoginRequest,
    responses(
        (status = 201, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Malformed request body", body = String, example = json!({"error": "invalid request payload"})),
        (status = 401, description = "Invalid credentials", body = String, example = json!({"error": "invalid credentials"})),
        (status = 500, description = "Internal server error", body = String, example = json!({"error": "internal server error"}))
    ),
    tag = "tokens"
)]
pub async fn create_token_handler(
    State(auth): State<AuthService>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TokenResponse>), AuthError> {
    let Json(request) = payload.map_err(rejection_to_error)?;

    let token = auth.login(&request.username, &request.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            auth_token: token.into_plaintext(),
        }),
    ))
}

/// Current user information (protected endpoint)
/// GET /users/me
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "The authenticated user", body = UserEnvelope),
        (status = 401, description = "Missing, malformed, expired or unknown token", body = String, example = json!({"error": "you must be logged in"}))
    ),
    security(("bearer_token" = [])),
    tag = "users"
)]
pub async fn me_handler(AuthenticatedUser(user): AuthenticatedUser) -> Json<UserEnvelope> {
    Json(UserEnvelope { user: user.into() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejection_detail_does_not_echo_body() {
        use axum::{body::Body, extract::FromRequest, http::Request};

        let request = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"username": "alice", "password": 12345678}"#))
            .unwrap();
        let rejection = Json::<LoginRequest>::from_request(request, &()).await.unwrap_err();

        match rejection_to_error(rejection) {
            AuthError::InvalidPayload(detail) => assert!(!detail.contains("12345678")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
