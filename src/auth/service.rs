// Authentication service - business logic layer

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};
use validator::Validate;

use crate::auth::{
    error::AuthError,
    models::{NewUser, RegisterRequest, User},
    password::{Password, PasswordHasher},
    repository::{TokenDirectory, UserDirectory},
    token::{token_hash, Scope, Token},
};

/// Default lifetime of an authentication token
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// Plaintext behind the decoy hash verified for unknown usernames
const DECOY_PASSWORD: &str = "decoy-password-for-unknown-users";

/// Authentication service coordinating registration, login and token lookup
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserDirectory>,
    tokens: Arc<dyn TokenDirectory>,
    hasher: PasswordHasher,
    token_ttl: Duration,
    decoy: Password,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(
        users: Arc<dyn UserDirectory>,
        tokens: Arc<dyn TokenDirectory>,
        hasher: PasswordHasher,
        token_ttl: Duration,
    ) -> Self {
        // Hashed with the configured cost so an unknown username costs as much
        // as a wrong password
        let mut decoy = Password::default();
        if let Err(e) = decoy.set(DECOY_PASSWORD, &hasher) {
            warn!("Could not prepare decoy password hash: {}", e);
        }

        Self {
            users,
            tokens,
            hasher,
            token_ttl,
            decoy,
        }
    }

    /// Run a password verification whose result is discarded
    fn verify_decoy(&self, password: &str) {
        let _ = self.decoy.matches(password);
    }

    /// Register a new user.
    ///
    /// Input shape is checked before anything else; a rejected request never
    /// reaches the directory.
    pub async fn register_user(&self, request: RegisterRequest) -> Result<User, AuthError> {
        request.validate()?;

        let mut password = Password::default();
        password.set(&request.password, &self.hasher)?;

        let user = self
            .users
            .insert(NewUser {
                username: request.username,
                email: request.email,
                password,
                bio: request.bio,
            })
            .await?;

        info!("Registered user id={}", user.id);
        Ok(user)
    }

    /// Verify credentials and mint an authentication token.
    ///
    /// Unknown usernames, failed lookups and wrong passwords all surface as
    /// `InvalidCredentials`; the real cause is only logged.
    pub async fn login(&self, username: &str, password: &str) -> Result<Token, AuthError> {
        let user = match self.users.find_by_username(username).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!("Login attempt for unknown username");
                self.verify_decoy(password);
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                error!("User lookup failed during login: {}", e);
                self.verify_decoy(password);
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !user.password.matches(password)? {
            warn!("Password mismatch for user id={}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.create_token(user.id, self.token_ttl, Scope::Authentication).await?;
        info!("Issued {} token for user id={}", Scope::Authentication, user.id);
        Ok(token)
    }

    /// Mint a token and persist its record
    pub async fn create_token(
        &self,
        user_id: i64,
        ttl: Duration,
        scope: Scope,
    ) -> Result<Token, AuthError> {
        let token = Token::generate(user_id, ttl, scope);
        self.tokens.insert(token.record()).await?;
        Ok(token)
    }

    /// Resolve the user owning a valid, unexpired token of `scope`
    pub async fn lookup(&self, scope: Scope, plaintext: &str) -> Result<Option<User>, AuthError> {
        self.lookup_at(scope, plaintext, Utc::now()).await
    }

    /// [`AuthService::lookup`] evaluated at an explicit instant
    pub async fn lookup_at(
        &self,
        scope: Scope,
        plaintext: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AuthError> {
        let Some(hash) = token_hash(plaintext) else {
            return Ok(None);
        };

        self.tokens.find_user(&hash, scope, now).await
    }
}
