//! Authentication module for Inkwell

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;
pub mod sessions;

pub use jwt::{Claims, Identity, JwtManager, TokenType, ACCESS_TOKEN_TTL_MINUTES};
pub use middleware::{authorize, require_auth, AuthOutcome, AuthState, AuthUser};
pub use password::{hash_password, verify_password};
pub use service::{LoginResponse, SessionService};
pub use sessions::{MemoryTokenStore, PgTokenStore, RefreshTokenRecord, RefreshTokenStore};
