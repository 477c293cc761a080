// In-memory user and token directories

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::auth::{
    error::AuthError,
    models::{NewUser, User},
    repository::{TokenDirectory, UserDirectory},
    token::{Scope, TokenRecord},
};

#[derive(Default)]
struct Store {
    next_id: i64,
    users: Vec<User>,
    tokens: Vec<TokenRecord>,
}

/// A single in-process store implementing both directories with the same
/// conflict / not-found signalling as the Postgres implementations.
/// Cloning shares the underlying store.
#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    store: Arc<RwLock<Store>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.store.read().await.users.len()
    }

    pub async fn token_count(&self) -> usize {
        self.store.read().await.tokens.len()
    }

    /// Snapshot of the stored token records
    pub async fn token_records(&self) -> Vec<TokenRecord> {
        self.store.read().await.tokens.clone()
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn insert(&self, user: NewUser) -> Result<User, AuthError> {
        if user.password.hash().is_none() {
            return Err(AuthError::PasswordHash("no password hash set".to_string()));
        }

        // Write lock held across check and insert so uniqueness is atomic
        let mut store = self.store.write().await;
        let taken = store
            .users
            .iter()
            .any(|u| u.username == user.username || u.email == user.email);
        if taken {
            return Err(AuthError::Conflict);
        }

        store.next_id += 1;
        let now = Utc::now();
        let created = User {
            id: store.next_id,
            username: user.username,
            email: user.email,
            password: user.password,
            bio: user.bio,
            created_at: now,
            updated_at: now,
        };
        store.users.push(created.clone());

        Ok(created)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        let store = self.store.read().await;
        Ok(store.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AuthError> {
        let store = self.store.read().await;
        Ok(store.users.iter().find(|u| u.id == id).cloned())
    }
}

#[async_trait]
impl TokenDirectory for InMemoryDirectory {
    async fn insert(&self, record: &TokenRecord) -> Result<(), AuthError> {
        let mut store = self.store.write().await;
        if !store.users.iter().any(|u| u.id == record.user_id) {
            return Err(AuthError::Directory(format!(
                "token references unknown user {}",
                record.user_id
            )));
        }
        store.tokens.push(record.clone());
        Ok(())
    }

    async fn find_user(
        &self,
        hash: &[u8],
        scope: Scope,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AuthError> {
        let store = self.store.read().await;
        let user = store
            .tokens
            .iter()
            .find(|t| t.hash == hash && t.scope == scope && t.expiry > now)
            .and_then(|t| store.users.iter().find(|u| u.id == t.user_id))
            .cloned();

        Ok(user)
    }
}
