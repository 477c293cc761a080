// Authentication middleware for protected routes

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, warn};

use crate::auth::{
    error::AuthError,
    models::{Identity, User},
    service::AuthService,
    token::Scope,
};

/// Split an `Authorization` value of the exact form `Bearer <token>`.
///
/// Exactly two space-separated parts, the first literally `Bearer`.
pub fn parse_bearer(value: &str) -> Result<&str, AuthError> {
    let parts: Vec<&str> = value.split(' ').collect();
    match parts.as_slice() {
        ["Bearer", token] => Ok(*token),
        _ => Err(AuthError::MalformedAuthorizationHeader),
    }
}

/// Resolve the caller identity from request headers.
///
/// No header resolves to [`Identity::Anonymous`]; a present header must be a
/// well-formed bearer token that resolves to a live authentication token.
pub async fn resolve_identity(auth: &AuthService, headers: &HeaderMap) -> Result<Identity, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(Identity::Anonymous);
    };

    let value = value
        .to_str()
        .map_err(|_| AuthError::MalformedAuthorizationHeader)?;
    let token = parse_bearer(value)?;

    match auth.lookup(Scope::Authentication, token).await {
        Ok(Some(user)) => Ok(Identity::User(user)),
        Ok(None) => Err(AuthError::InvalidOrExpiredToken),
        Err(e) => Err(AuthError::TokenLookup(e.to_string())),
    }
}

fn add_vary(headers: &mut HeaderMap) {
    headers.append(header::VARY, HeaderValue::from_static("Authorization"));
}

/// Per-request authentication: attaches an [`Identity`] to the request
/// extensions or rejects with 401. Every response, rejections included,
/// carries `Vary: Authorization`.
pub async fn authenticate(
    State(auth): State<AuthService>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let identity = match resolve_identity(&auth, request.headers()).await {
        Ok(identity) => identity,
        Err(err) => {
            warn!("Authentication rejected for {}: {}", path, err);
            let mut response = err.into_response();
            add_vary(response.headers_mut());
            return response;
        }
    };

    match identity.user() {
        Some(user) => debug!("Authenticated user id={} for {}", user.id, path),
        None => debug!("Anonymous request for {}", path),
    }

    request.extensions_mut().insert(identity);
    let mut response = next.run(request).await;
    add_vary(response.headers_mut());
    response
}

/// Gate that rejects anonymous callers. Must be mounted behind
/// [`authenticate`]; a missing identity is reported as an internal error.
pub async fn require_user(request: Request, next: Next) -> Result<Response, AuthError> {
    let identity = request.extensions().get::<Identity>().ok_or_else(|| {
        error!(
            "require_user reached without an identity for {}; authenticate layer missing",
            request.uri().path()
        );
        AuthError::MissingIdentity
    })?;

    if identity.is_anonymous() {
        return Err(AuthError::LoginRequired);
    }

    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Identity>().cloned().ok_or_else(|| {
            error!("Identity extractor used on {} without authenticate layer", parts.uri.path());
            AuthError::MissingIdentity
        })
    }
}

/// Authenticated user extractor for protected handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Identity::from_request_parts(parts, state).await? {
            Identity::User(user) => Ok(AuthenticatedUser(user)),
            Identity::Anonymous => Err(AuthError::LoginRequired),
        }
    }
}
