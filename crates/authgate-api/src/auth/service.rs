//! Authentication service layer
//!
//! Business logic for registration, login, token refresh and logout.
//! Password hashing runs on the blocking thread pool; token work is
//! delegated to [`TokenService`].

use super::models::{Credentials, LoginRequest, RegisterRequest, Registration, TokenPair};
use super::password::{hash_password_with_config, verify_password, PasswordConfig};
use super::tokens::TokenService;
use crate::error::AppError;
use authgate_store::{CredentialStore, NewUser};
use std::sync::Arc;
use tracing::{info, warn};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn CredentialStore>,
    tokens: TokenService,
    password: PasswordConfig,
}

impl AuthService {
    pub fn new(users: Arc<dyn CredentialStore>, tokens: TokenService, password: PasswordConfig) -> Self {
        Self {
            users,
            tokens,
            password,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Register a new user and return its id
    pub async fn register(&self, request: RegisterRequest) -> Result<String, AppError> {
        let registration = Registration::new(request)?;

        // Fast path; the store still enforces uniqueness on insert
        if self.users.find_by_email(&registration.email).await?.is_some() {
            return Err(AppError::DuplicateEmail);
        }

        let config = self.password.clone();
        let password = registration.password;
        let password_hash =
            tokio::task::spawn_blocking(move || hash_password_with_config(&password, &config))
                .await?
                .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))?;

        let user = self
            .users
            .create(NewUser {
                name: registration.name,
                email: registration.email,
                password_hash,
            })
            .await?;

        info!(user_id = %user.id, "user registered");
        Ok(user.id)
    }

    /// Check credentials and issue a token pair
    pub async fn login(&self, request: LoginRequest) -> Result<TokenPair, AppError> {
        let credentials = Credentials::new(request)?;

        let user = self
            .users
            .find_by_email(&credentials.email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let password = credentials.password;
        let hash = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await?
            .map_err(|e| AppError::Internal(format!("Failed to verify password: {e}")))?;

        if !valid {
            warn!(user_id = %user.id, "login with wrong password");
            return Err(AppError::WrongCredentials);
        }

        let pair = self.tokens.issue_pair(&user.id).await?;

        info!(user_id = %user.id, "user logged in");
        Ok(pair)
    }

    /// Exchange a refresh token for a new access token
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<String, AppError> {
        self.tokens.rotate_access_token(refresh_token).await
    }

    /// Revoke every token of the refresh token's owner
    pub async fn logout(&self, refresh_token: Option<&str>) -> Result<u64, AppError> {
        self.tokens.revoke_all(refresh_token).await
    }
}
