//! Authentication module
//!
//! - JWT signing and validation for access and refresh tokens
//! - Password hashing with Argon2
//! - Token lifecycle backed by the token store
//! - Request gate for protected routes
//! - Authentication service for the user endpoints

pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod tokens;

pub use jwt::{Claims, JwtConfig, JwtError};
pub use middleware::{auth_middleware, AuthenticatedUser, AUTH_TOKEN_HEADER, REFRESH_TOKEN_HEADER};
pub use models::{
    Credentials, LoginRequest, RefreshResponse, RegisterRequest, RegisterResponse, Registration,
    TokenPair,
};
pub use password::{hash_password, verify_password, PasswordConfig};
pub use service::AuthService;
pub use tokens::TokenService;
