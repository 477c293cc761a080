pub mod auth;
pub mod config;
pub mod db;

use std::{sync::Arc, time::Duration};

use axum::{
    extract::FromRef,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::{cors::{Any, CorsLayer}, timeout::TimeoutLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use auth::{
    authenticate, create_token_handler, me_handler, register_handler, require_user, AuthService,
    LoginRequest, PasswordHasher, PgTokenDirectory, PgUserDirectory, RegisterRequest,
    TokenResponse, UserEnvelope, UserResponse,
};
use config::Config;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::handlers::register_handler,
        auth::handlers::create_token_handler,
        auth::handlers::me_handler,
    ),
    components(
        schemas(RegisterRequest, LoginRequest, TokenResponse, UserEnvelope, UserResponse)
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "users", description = "User registration and profile"),
        (name = "tokens", description = "Authentication token issuance")
    ),
    info(
        title = "Gatekeeper API",
        version = "1.0.0",
        description = "User registration, bearer-token authentication and request authorization"
    )
)]
pub struct ApiDoc;

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_token",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
}

impl AppState {
    /// Wire the Postgres directories into an [`AuthService`] configured from `config`
    pub fn from_pool(pool: db::DbPool, config: &Config) -> Result<Self, auth::AuthError> {
        let hasher = PasswordHasher::new(config.hashing_cost)?;
        let auth = AuthService::new(
            Arc::new(PgUserDirectory::new(pool.clone())),
            Arc::new(PgTokenDirectory::new(pool)),
            hasher,
            config.token_ttl,
        );
        Ok(Self { auth })
    }
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Handler for GET /health
async fn health_check() -> &'static str {
    "Status is available\n"
}

/// Creates and configures the application router
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    // Routes that need an identity. `authenticate` wraps every route in this
    // group, so `require_user` always finds an identity attached.
    let authenticated = Router::new()
        .route("/users/me", get(me_handler).route_layer(from_fn(require_user)))
        .route_layer(from_fn_with_state(state.auth.clone(), authenticate));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health_check))
        .route("/users", post(register_handler))
        .route("/tokens/authentication", post(create_token_handler))
        .merge(authenticated)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests;
