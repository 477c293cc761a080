// Password hashing and verification

use std::fmt;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::auth::error::AuthError;

/// Argon2id cost parameters, injected from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingCost {
    /// Memory cost in KiB
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingCost {
    /// OWASP minimum recommendation for argon2id: 19 MiB, 2 passes, 1 lane
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Password hasher using Argon2id with a random salt per hash
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// Create a hasher with the given cost. Fails if the parameters are out of
    /// argon2's accepted range.
    pub fn new(cost: HashingCost) -> Result<Self, AuthError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| AuthError::PasswordHash(format!("invalid argon2 parameters: {}", e)))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext password into a PHC string (algorithm, params and salt embedded)
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::PasswordHash(e.to_string()))
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

/// Password value object: holds only the hash, never the plaintext
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Password {
    hash: Option<String>,
}

impl Password {
    /// Wrap a hash loaded from storage
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self {
            hash: Some(hash.into()),
        }
    }

    /// Stored PHC hash, if one has been set
    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    /// Hash `plaintext` and store the result, replacing any previous hash
    pub fn set(&mut self, plaintext: &str, hasher: &PasswordHasher) -> Result<(), AuthError> {
        self.hash = Some(hasher.hash(plaintext)?);
        Ok(())
    }

    /// Check `plaintext` against the stored hash.
    ///
    /// `Ok(false)` is a definite mismatch. An error means the comparison itself
    /// could not run (no hash set, or the stored hash is malformed). The cost
    /// parameters come from the stored hash, and argon2's own comparison is
    /// used for the final check.
    pub fn matches(&self, plaintext: &str) -> Result<bool, AuthError> {
        let stored = self
            .hash
            .as_deref()
            .ok_or_else(|| AuthError::PasswordHash("no password hash set".to_string()))?;

        let parsed = PasswordHash::new(stored)
            .map_err(|e| AuthError::PasswordHash(format!("malformed stored hash: {}", e)))?;

        match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::PasswordHash(e.to_string())),
        }
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Password")
            .field("hash", &self.hash.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
