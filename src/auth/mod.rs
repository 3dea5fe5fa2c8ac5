// src/auth/mod.rs
//! Authentication service: credential registration, login and token verification.

pub mod credentials;
pub mod handlers;
pub mod token;

pub use credentials::{CredentialStore, PgUserRepository, UserRepository};
pub use handlers::AuthState;
pub use token::{Claims, JwtCodec, TokenCodec, TokenConfig};
