// Opaque token generation and the plaintext -> lookup key codec

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random bytes behind every token (256 bits of entropy)
pub const TOKEN_BYTES: usize = 32;

/// Purpose a token may be used for. A token only ever resolves under the
/// scope it was minted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Bearer tokens presented in the `Authorization` header
    Authentication,
    /// Account activation links; no endpoint mints these yet
    Activation,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Authentication => "authentication",
            Scope::Activation => "activation",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The persisted form of a token. Holds the digest only, never the plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub hash: Vec<u8>,
    pub user_id: i64,
    pub expiry: DateTime<Utc>,
    pub scope: Scope,
}

/// A freshly minted token.
///
/// The plaintext is handed out once through [`Token::into_plaintext`]; only
/// [`Token::record`] is ever given to a directory.
pub struct Token {
    plaintext: String,
    record: TokenRecord,
}

impl Token {
    /// Mint a token for `user_id` valid for `ttl` from now
    pub fn generate(user_id: i64, ttl: Duration, scope: Scope) -> Self {
        Self::generate_at(user_id, ttl, scope, Utc::now())
    }

    /// Mint a token whose expiry is computed from an explicit `now`
    pub fn generate_at(user_id: i64, ttl: Duration, scope: Scope, now: DateTime<Utc>) -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);

        Self {
            plaintext: hex::encode(bytes),
            record: TokenRecord {
                hash: digest(&bytes),
                user_id,
                expiry: now + ttl,
                scope,
            },
        }
    }

    pub fn record(&self) -> &TokenRecord {
        &self.record
    }

    pub fn expiry(&self) -> DateTime<Utc> {
        self.record.expiry
    }

    /// Consume the token, yielding the plaintext for the single response that returns it
    pub fn into_plaintext(self) -> String {
        self.plaintext
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("plaintext", &"<redacted>")
            .field("record", &self.record)
            .finish()
    }
}

/// Derive the lookup key for a presented plaintext.
///
/// Returns `None` when the plaintext cannot be a token we issued (not hex, or
/// wrong length); callers treat that exactly like an unknown token.
pub fn token_hash(plaintext: &str) -> Option<Vec<u8>> {
    let bytes = hex::decode(plaintext).ok()?;
    if bytes.len() != TOKEN_BYTES {
        return None;
    }
    Some(digest(&bytes))
}

fn digest(bytes: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().to_vec()
}
