// Authentication module
// Password hashing, opaque bearer tokens, and the per-request identity middleware

pub mod error;
pub mod handlers;
pub mod memory;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod token;

// Re-export commonly used types
pub use error::AuthError;
pub use handlers::{create_token_handler, me_handler, register_handler};
pub use memory::InMemoryDirectory;
pub use middleware::{authenticate, require_user, AuthenticatedUser};
pub use models::{Identity, LoginRequest, RegisterRequest, TokenResponse, User, UserEnvelope, UserResponse};
pub use password::{HashingCost, Password, PasswordHasher};
pub use repository::{PgTokenDirectory, PgUserDirectory, TokenDirectory, UserDirectory};
pub use service::AuthService;
pub use token::{Scope, Token};
